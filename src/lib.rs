use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

pub mod articles;
pub mod auth;
pub mod categories;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod models;
pub mod seed;
pub mod store;
pub mod tags;
pub mod upload;
pub mod users;

use config::Config;
use store::SharedStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: store::Store, config: Config) -> Self {
        Self {
            store: store.into_shared(),
            config: Arc::new(config),
        }
    }
}

/// Full API router: admin resources (optionally session-guarded), auth and
/// user settings, health, and the upload directory.
pub fn app(state: AppState) -> Router {
    let admin = Router::new()
        .merge(articles::routes())
        .merge(categories::routes())
        .merge(tags::routes())
        .merge(dashboard::routes())
        .merge(upload::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session));

    Router::new()
        .route("/api/healthcheck", get(health::health_check_handler))
        .merge(auth::routes())
        .merge(users::routes())
        .merge(admin)
        .nest_service(upload::UPLOAD_ROUTE, ServeDir::new(&state.config.upload_dir))
        .fallback(error::route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub fn generate_truncated_uuid() -> String {
    let uuid = Uuid::new_v4();
    let hex = uuid.as_simple().to_string();
    hex[..24].to_string()
}
