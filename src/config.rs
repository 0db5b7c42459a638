use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SEED_ARTICLES: usize = 50;
pub const DEFAULT_ADMIN_PASSWORD: &str = "janethedev";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` via dotenv).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Fixes the generated dataset when set.
    pub seed: Option<u64>,
    pub seed_articles: usize,
    pub admin_password: String,
    pub upload_dir: PathBuf,
    /// Guard every admin route behind a live session.
    pub require_auth: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            seed: None,
            seed_articles: DEFAULT_SEED_ARTICLES,
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            require_auth: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(seed) = lookup("SEED") {
            config.seed = Some(parse("SEED", seed)?);
        }
        if let Some(count) = lookup("SEED_ARTICLES") {
            config.seed_articles = parse("SEED_ARTICLES", count)?;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD") {
            config.admin_password = password;
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("REQUIRE_AUTH") {
            config.require_auth = parse_flag("REQUIRE_AUTH", flag)?;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}
