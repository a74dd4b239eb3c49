use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::models::{AgentMeta, SlotSpec};
use crate::state::AppState;

#[derive(Serialize)]
pub struct AgentSummary {
    agent_type: String,
    #[serde(flatten)]
    meta: AgentMeta,
    slots: Vec<SlotSpec>,
}

// GET /api/agents
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Vec<AgentSummary>> {
    let agents = state
        .catalog
        .list()
        .into_iter()
        .map(|agent| AgentSummary {
            agent_type: agent.agent_type.clone(),
            meta: agent.meta(),
            slots: agent.slots.clone(),
        })
        .collect();
    Json(agents)
}
