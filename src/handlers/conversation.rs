use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::db::queries::{self, StoredConversation};
use crate::errors::AppError;
use crate::models::{TurnRequest, TurnResponse};
use crate::services::conversation;
use crate::state::AppState;

// POST /v2/conversation/next
pub async fn next(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let request = with_conversation_id(request);

    if state.config.kill_switch {
        tracing::warn!(
            conversation_id = %request.conversation_id,
            "kill switch active, routing v2 turn to legacy path"
        );
        return conversation::process_legacy_turn(&state, request)
            .await
            .map(Json);
    }

    conversation::process_turn(&state, request).await.map(Json)
}

// POST /conversation/next
pub async fn legacy_next(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let request = with_conversation_id(request);
    conversation::process_legacy_turn(&state, request)
        .await
        .map(Json)
}

// GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StoredConversation>, AppError> {
    let stored = {
        let db = state
            .lock_db()
            .map_err(|e| AppError::Config(e.to_string()))?;
        queries::get_conversation(&db, &id)?
    };
    stored
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("conversation {id}")))
}

fn with_conversation_id(mut request: TurnRequest) -> TurnRequest {
    if request.conversation_id.trim().is_empty() {
        request.conversation_id = uuid::Uuid::new_v4().to_string();
    }
    request
}
