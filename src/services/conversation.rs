use std::future::Future;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::db::queries;
use crate::engine::extract::ExtractionResult;
use crate::engine::planner::{build_confirmation_card, build_question, PlannerResult};
use crate::engine::sanitize::{sanitize, LEGACY_ENGINE_VERSION};
use crate::engine::slots::{filled_count, merge, missing_required, next_missing_required};
use crate::errors::AppError;
use crate::models::{
    AgentDefinition, Confidence, DebugPayload, LegacyResponse, NextStep, SlotStore, TurnRequest,
    TurnResponse,
};
use crate::state::AppState;

pub const ENGINE_VERSION: &str = "v2";
pub const MODEL_DETERMINISTIC: &str = "deterministic";
pub const MODEL_FALLBACK: &str = "fallback";

/// One turn on the planner path. The only caller-visible error is an
/// unknown agent type; every other failure becomes a fallback question.
pub async fn process_turn(
    state: &Arc<AppState>,
    request: TurnRequest,
) -> Result<TurnResponse, AppError> {
    let agent = state.catalog.get(&request.agent_type)?;
    let response = with_idempotency(state, &request, || planner_turn(state, agent, &request)).await;
    Ok(response)
}

async fn planner_turn(
    state: &AppState,
    agent: &AgentDefinition,
    request: &TurnRequest,
) -> TurnResponse {
    let today = request
        .local_date
        .unwrap_or_else(|| Local::now().date_naive());

    // Whatever the orchestrator knows so far, kept for the fallback path.
    let mut known = request.slots.clone();
    let response = match run_turn(state, agent, request, today, &mut known).await {
        Ok(response) => {
            state
                .metrics
                .record_turn(response.ai_call_made, response.action(), false);
            response
        }
        Err(e) => {
            tracing::error!(
                error = ?e,
                conversation_id = %request.conversation_id,
                agent_type = %agent.agent_type,
                "turn failed, using fallback"
            );
            let response = fallback_response(agent, &known, ENGINE_VERSION);
            state.metrics.record_turn(false, response.action(), true);
            response
        }
    };

    log_turn(request, &response);
    response
}

async fn run_turn(
    state: &AppState,
    agent: &AgentDefinition,
    request: &TurnRequest,
    today: NaiveDate,
    known: &mut SlotStore,
) -> anyhow::Result<TurnResponse> {
    *known = load_merged(state, request)?;
    let hint = request.current_slot.as_deref();

    let extraction = match request.client_action() {
        // CONFIRM/REJECT never touch extraction.
        Some(_) => None,
        None => {
            let extraction = state
                .extractor
                .extract(agent, &request.user_message, hint, known, today)
                .await;
            *known = merge(known, &extraction.values());
            Some(extraction)
        }
    };

    let result = state.planner.decide(
        agent,
        known,
        request.client_action(),
        &request.user_message,
        hint,
    );

    save_slots(state, request, known)?;

    Ok(build_response(
        agent,
        result,
        known.clone(),
        extraction.as_ref(),
        request.debug,
    ))
}

/// Legacy free-form path. Same boundary rules as `process_turn`, but the
/// response comes from the generator and is repaired by the sanitizer.
pub async fn process_legacy_turn(
    state: &Arc<AppState>,
    request: TurnRequest,
) -> Result<TurnResponse, AppError> {
    let agent = state.catalog.get(&request.agent_type)?;
    let response = with_idempotency(state, &request, || legacy_turn(state, agent, &request)).await;
    Ok(response)
}

async fn legacy_turn(
    state: &AppState,
    agent: &AgentDefinition,
    request: &TurnRequest,
) -> TurnResponse {
    let mut known = request.slots.clone();
    let response = match run_legacy_turn(state, agent, request, &mut known).await {
        Ok(response) => {
            state
                .metrics
                .record_turn(response.ai_call_made, response.action(), false);
            response
        }
        Err(e) => {
            tracing::error!(
                error = ?e,
                conversation_id = %request.conversation_id,
                agent_type = %agent.agent_type,
                "legacy turn failed, using fallback"
            );
            let response = fallback_response(agent, &known, LEGACY_ENGINE_VERSION);
            state.metrics.record_turn(false, response.action(), true);
            response
        }
    };

    log_turn(request, &response);
    response
}

async fn run_legacy_turn(
    state: &AppState,
    agent: &AgentDefinition,
    request: &TurnRequest,
    known: &mut SlotStore,
) -> anyhow::Result<TurnResponse> {
    *known = load_merged(state, request)?;

    let response = match (request.client_action(), &state.legacy) {
        (Some(action), _) => {
            let result = state.planner.decide(
                agent,
                known,
                Some(action),
                &request.user_message,
                request.current_slot.as_deref(),
            );
            TurnResponse {
                engine_version: LEGACY_ENGINE_VERSION.to_string(),
                ..build_response(agent, result, known.clone(), None, false)
            }
        }
        (None, Some(generator)) => {
            let raw = generator
                .generate(
                    agent,
                    known,
                    &request.user_message,
                    request.current_slot.as_deref(),
                )
                .await;
            sanitize(raw, known, agent)
        }
        (None, None) => {
            let raw = LegacyResponse {
                ai_call_made: false,
                ..LegacyResponse::empty(MODEL_DETERMINISTIC)
            };
            sanitize(raw, known, agent)
        }
    };

    *known = response.slots.clone();
    save_slots(state, request, known)?;
    Ok(response)
}

/// Runs `turn` at most once per live idempotency token. A duplicate that
/// arrives while the first is still running waits for its response.
async fn with_idempotency<F, Fut>(
    state: &AppState,
    request: &TurnRequest,
    turn: F,
) -> TurnResponse
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = TurnResponse>,
{
    let Some(key) = request.idempotency_key.as_deref().filter(|k| !k.is_empty()) else {
        return turn().await;
    };

    let (response, fresh) = state.idempotency.get_or_run(key, turn).await;
    if !fresh {
        state.metrics.record_idempotency_hit();
        tracing::info!(
            conversation_id = %request.conversation_id,
            idempotency_key = key,
            "idempotency hit"
        );
    }
    response
}

fn log_turn(request: &TurnRequest, response: &TurnResponse) {
    tracing::info!(
        conversation_id = %request.conversation_id,
        agent_type = %request.agent_type,
        action = response.action().as_str(),
        question_slot = response.step.question_slot().unwrap_or("-"),
        slots_filled = filled_count(&response.slots),
        assisted = response.ai_call_made,
        engine = %response.engine_version,
        "turn complete"
    );
}

/// Stored slots overlaid with the caller's view; the caller wins.
fn load_merged(state: &AppState, request: &TurnRequest) -> anyhow::Result<SlotStore> {
    let stored = {
        let db = state.lock_db()?;
        queries::get_slots(&db, &request.conversation_id)?
    };
    Ok(merge(&stored, &request.slots))
}

fn save_slots(state: &AppState, request: &TurnRequest, slots: &SlotStore) -> anyhow::Result<()> {
    let db = state.lock_db()?;
    queries::save_slots(&db, &request.conversation_id, &request.agent_type, slots)
}

fn build_response(
    agent: &AgentDefinition,
    result: PlannerResult,
    slots: SlotStore,
    extraction: Option<&ExtractionResult>,
    debug: bool,
) -> TurnResponse {
    let assisted = extraction.is_some_and(|e| e.assisted_used);
    let confidence = match extraction {
        Some(e) if e.assisted_used => e.confidence,
        _ => Confidence::High,
    };
    let ai_model = extraction
        .and_then(|e| e.model.clone())
        .unwrap_or_else(|| MODEL_DETERMINISTIC.to_string());

    let debug = debug.then(|| DebugPayload {
        planner_action: result.step.action(),
        planner_question_slot: result.step.question_slot().map(str::to_string),
        extraction_assisted: assisted,
        extracted: extraction.map(ExtractionResult::values).unwrap_or_default(),
        merged_slots: slots.clone(),
        missing_required_slots: missing_required(agent, &slots),
    });

    TurnResponse {
        assistant_message: result.assistant_message,
        step: result.step,
        slots,
        confidence,
        ai_call_made: assisted,
        ai_model,
        engine_version: ENGINE_VERSION.to_string(),
        agent_meta: Some(agent.meta()),
        debug,
    }
}

/// Deterministic answer built only from slots already in hand.
pub fn fallback_response(
    agent: &AgentDefinition,
    slots: &SlotStore,
    engine_version: &str,
) -> TurnResponse {
    let (assistant_message, step) = match next_missing_required(agent, slots) {
        Some(slot) => (
            format!("I need a bit more information. {}", slot.prompt),
            NextStep::AskQuestion {
                question: Some(build_question(slot)),
            },
        ),
        None => (
            "Let me confirm the details:".to_string(),
            NextStep::Confirm {
                confirmation_card: build_confirmation_card(agent, slots),
            },
        ),
    };

    TurnResponse {
        assistant_message,
        step,
        slots: slots.clone(),
        confidence: Confidence::Low,
        ai_call_made: false,
        ai_model: MODEL_FALLBACK.to_string(),
        engine_version: engine_version.to_string(),
        agent_meta: Some(agent.meta()),
        debug: None,
    }
}
