pub mod admin;
pub mod agents;
pub mod conversation;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/agents", get(agents::list_agents))
        .route("/conversation/next", post(conversation::legacy_next))
        .route("/v2/conversation/next", post(conversation::next))
        .route("/api/conversations/:id", get(conversation::get_conversation))
        .route("/api/admin/metrics", get(admin::get_metrics))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("route".to_string())
}
