use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::AppState;

pub async fn health_check_handler(State(state): State<AppState>) -> impl IntoResponse {
    tracing::trace!("health_check started");
    let store = state.store.read().await;

    let drift = store.verify_counts();
    if !drift.is_empty() {
        tracing::warn!("article counters out of sync: {:?}", &drift);
    }

    Json(json!({
        "status": "ok",
        "articles": store.articles.len(),
        "categories": store.categories.len(),
        "tags": store.tags.len(),
        "users": store.users.len(),
        "countersConsistent": drift.is_empty(),
    }))
}
