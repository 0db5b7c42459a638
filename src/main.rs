use blog_admin::{app, config::Config, seed::seed_store, AppState};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    println!("🌟 blog admin api 🌟");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format!(
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::debug!(
        "seed: {:?}, articles: {}, uploads: {:?}",
        config.seed,
        config.seed_articles,
        &config.upload_dir
    );
    if config.require_auth {
        tracing::info!("admin routes require a session");
    }

    let store = seed_store(&config);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    let router = app(AppState::new(store, config));

    println!("🚀 Server started");
    tracing::debug!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
