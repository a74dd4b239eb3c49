//! Repairs whole-response objects from the free-form generator so they obey
//! the same invariants the planner guarantees by construction.

use serde_json::Value;

use crate::engine::planner::build_question;
use crate::engine::slots::{merge, next_missing_required};
use crate::models::{AgentDefinition, LegacyResponse, NextAction, NextStep, SlotStore, TurnResponse};

pub const FALLBACK_MESSAGE: &str = "I need a bit more information to continue.";
pub const LEGACY_ENGINE_VERSION: &str = "v1";

/// Generic keys some models use instead of the slot name they were asked for.
pub const GENERIC_SLOT_KEYS: &[&str] = &["slot", "value", "answer", "response", "data", "input"];

/// Never fails. The returned `slots` are always the full merged store.
pub fn sanitize(
    response: LegacyResponse,
    slots: &SlotStore,
    agent: &AgentDefinition,
) -> TurnResponse {
    let extracted = response.extracted_data.unwrap_or_default();
    let merged = merge(slots, &extracted);

    let mut warnings: Vec<&'static str> = Vec::new();
    let mut repairs: Vec<&'static str> = Vec::new();
    let mut message = response.assistant_message;

    let action = response.next_action.unwrap_or_else(|| {
        warnings.push("next_action_missing");
        NextAction::AskQuestion
    });

    let step = match action {
        NextAction::Lookup => match response.lookup_params {
            Some(lookup_params) => {
                if response.question.is_some() {
                    warnings.push("LOOKUP_has_conflicting_question");
                    repairs.push("dropped_question_for_LOOKUP");
                }
                NextStep::Lookup { lookup_params }
            }
            None => {
                warnings.push("LOOKUP_missing_lookup_params");
                repairs.push("downgraded_to_ASK_QUESTION");
                downgrade(agent, &merged, &mut message, &mut repairs)
            }
        },
        NextAction::Confirm => match response.confirmation_card {
            Some(confirmation_card) => {
                if response.question.is_some() {
                    warnings.push("CONFIRM_has_conflicting_question");
                    repairs.push("dropped_question_for_CONFIRM");
                }
                NextStep::Confirm { confirmation_card }
            }
            None => {
                warnings.push("CONFIRM_missing_confirmation_card");
                repairs.push("downgraded_to_ASK_QUESTION");
                downgrade(agent, &merged, &mut message, &mut repairs)
            }
        },
        NextAction::AskQuestion => match response.question {
            Some(question) => NextStep::AskQuestion {
                question: Some(question),
            },
            None => {
                warnings.push("ASK_QUESTION_missing_question");
                // With nothing missing, free-form input is a valid end state.
                let question = next_missing_required(agent, &merged).map(|slot| {
                    repairs.push("generated_question_for_missing_slot");
                    build_question(slot)
                });
                NextStep::AskQuestion { question }
            }
        },
        NextAction::Complete => NextStep::Complete,
    };

    if message.trim().is_empty() {
        warnings.push("assistant_message_empty");
        message = match step.question() {
            Some(question) if !question.prompt.trim().is_empty() => {
                repairs.push("assistant_message_from_question");
                question.prompt.clone()
            }
            _ => {
                repairs.push("assistant_message_set_fallback");
                FALLBACK_MESSAGE.to_string()
            }
        };
    }

    if !warnings.is_empty() {
        tracing::warn!(
            agent = %agent.agent_type,
            ?warnings,
            ?repairs,
            "legacy response sanitized"
        );
    }

    TurnResponse {
        assistant_message: message,
        step,
        slots: merged,
        confidence: response.confidence,
        ai_call_made: response.ai_call_made,
        ai_model: response.ai_model,
        engine_version: LEGACY_ENGINE_VERSION.to_string(),
        agent_meta: Some(agent.meta()),
        debug: None,
    }
}

/// ASK_QUESTION for the next missing slot under the merged store, or no
/// question at all when nothing is missing.
fn downgrade(
    agent: &AgentDefinition,
    merged: &SlotStore,
    message: &mut String,
    repairs: &mut Vec<&'static str>,
) -> NextStep {
    match next_missing_required(agent, merged) {
        Some(slot) => {
            repairs.push("generated_question_for_missing_slot");
            *message = slot.prompt.clone();
            NextStep::AskQuestion {
                question: Some(build_question(slot)),
            }
        }
        // The model's own message stands; an empty one gets the fallback later.
        None => NextStep::AskQuestion { question: None },
    }
}

/// Compatibility shim for model output: keeps declared slots, remaps generic
/// keys onto the slot that was last asked, and drops everything else along
/// with null or empty values.
pub fn repair_extracted_keys(
    raw: SlotStore,
    agent: &AgentDefinition,
    last_asked: Option<&str>,
) -> SlotStore {
    let target = last_asked.filter(|name| agent.has_slot(name));
    let mut repaired = SlotStore::new();

    for (key, value) in raw {
        let empty = match &value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if empty {
            continue;
        }

        if agent.has_slot(&key) {
            repaired.insert(key, value);
        } else if GENERIC_SLOT_KEYS.contains(&key.as_str()) {
            match target {
                Some(slot) => {
                    tracing::warn!(agent = %agent.agent_type, from = %key, to = %slot, "extracted key repaired");
                    repaired.insert(slot.to_string(), value);
                }
                None => {
                    tracing::warn!(agent = %agent.agent_type, key = %key, "generic extracted key with no repair target");
                }
            }
        } else {
            tracing::info!(agent = %agent.agent_type, key = %key, "extracted key dropped");
        }
    }

    repaired
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::agents::AgentCatalog;
    use crate::models::{Confidence, ConfirmationCard, LookupParams, Question, ValueType};

    fn card() -> ConfirmationCard {
        ConfirmationCard {
            title: "Call In Sick".to_string(),
            lines: vec!["Calling: Woolworths".to_string()],
            confirm_label: "Yes".to_string(),
            reject_label: "No".to_string(),
            card_id: "deadbeef".to_string(),
        }
    }

    fn stray_question() -> Question {
        Question {
            slot_name: Some("caller_name".to_string()),
            value_type: ValueType::Text,
            prompt: "Your name?".to_string(),
            quick_replies: None,
            optional: false,
        }
    }

    fn legacy(action: Option<NextAction>) -> LegacyResponse {
        LegacyResponse {
            next_action: action,
            ..LegacyResponse::empty("gpt-4o-mini")
        }
    }

    #[test]
    fn test_confirm_without_card_downgrades_to_first_required() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("SICK_CALLER").unwrap();

        let out = sanitize(legacy(Some(NextAction::Confirm)), &SlotStore::new(), agent);

        assert_eq!(out.action(), NextAction::AskQuestion);
        assert_eq!(out.step.question_slot(), Some("employer_name"));
        assert_eq!(out.assistant_message, agent.slots[0].prompt);
        assert_eq!(out.engine_version, "v1");
    }

    #[test]
    fn test_downgrade_uses_merged_not_stale_store() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("SICK_CALLER").unwrap();
        let mut response = legacy(Some(NextAction::Confirm));
        let mut extracted = SlotStore::new();
        extracted.insert("employer_name".to_string(), json!("Woolworths"));
        response.extracted_data = Some(extracted);

        let mut existing = SlotStore::new();
        existing.insert("caller_name".to_string(), json!("Sam"));

        let out = sanitize(response, &existing, agent);

        assert_eq!(out.step.question_slot(), Some("employer_phone"));
        assert_eq!(out.slots.get("employer_name"), Some(&json!("Woolworths")));
        assert_eq!(out.slots.get("caller_name"), Some(&json!("Sam")));
    }

    #[test]
    fn test_lookup_without_params_downgrades() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("STOCK_CHECKER").unwrap();
        let out = sanitize(legacy(Some(NextAction::Lookup)), &SlotStore::new(), agent);
        assert_eq!(out.step.question_slot(), Some("retailer_name"));
    }

    #[test]
    fn test_confirm_without_card_and_nothing_missing_keeps_message() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("STOCK_CHECKER").unwrap();
        let slots: SlotStore = [
            ("retailer_name", json!("JB Hi-Fi")),
            ("product_name", json!("PS5")),
            ("quantity", json!(1)),
            ("store_location", json!("Carlton")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let mut response = legacy(Some(NextAction::Confirm));
        response.assistant_message = "Shall I ring JB Hi-Fi?".to_string();
        let out = sanitize(response, &slots, agent);
        assert_eq!(out.step, NextStep::AskQuestion { question: None });
        assert_eq!(out.assistant_message, "Shall I ring JB Hi-Fi?");

        let out = sanitize(legacy(Some(NextAction::Lookup)), &slots, agent);
        assert_eq!(out.assistant_message, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_conflicting_question_dropped() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("SICK_CALLER").unwrap();

        let mut response = legacy(Some(NextAction::Confirm));
        response.assistant_message = "Please confirm".to_string();
        response.confirmation_card = Some(card());
        response.question = Some(stray_question());
        let out = sanitize(response, &SlotStore::new(), agent);
        assert_eq!(
            out.step,
            NextStep::Confirm {
                confirmation_card: card()
            }
        );
        assert_eq!(out.assistant_message, "Please confirm");

        let mut response = legacy(Some(NextAction::Lookup));
        response.lookup_params = Some(LookupParams {
            query: "Woolworths".to_string(),
            area: "Richmond".to_string(),
            country: "AU".to_string(),
        });
        response.question = Some(stray_question());
        let out = sanitize(response, &SlotStore::new(), agent);
        assert_eq!(out.action(), NextAction::Lookup);
        assert!(out.step.question().is_none());
        assert_eq!(out.assistant_message, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_ask_question_without_question_synthesizes_one() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("SICK_CALLER").unwrap();
        let out = sanitize(legacy(Some(NextAction::AskQuestion)), &SlotStore::new(), agent);
        assert_eq!(out.step.question_slot(), Some("employer_name"));
        assert_eq!(out.assistant_message, agent.slots[0].prompt);
    }

    #[test]
    fn test_ask_question_with_nothing_missing_stays_freeform() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("STOCK_CHECKER").unwrap();
        let slots: SlotStore = [
            ("retailer_name", json!("JB Hi-Fi")),
            ("product_name", json!("PS5")),
            ("quantity", json!(1)),
            ("store_location", json!("Carlton")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let out = sanitize(legacy(Some(NextAction::AskQuestion)), &slots, agent);
        assert_eq!(out.step, NextStep::AskQuestion { question: None });
        assert_eq!(out.assistant_message, FALLBACK_MESSAGE);
        assert_eq!(out.slots, slots);
    }

    #[test]
    fn test_confidence_and_model_pass_through() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("SICK_CALLER").unwrap();
        let mut response = legacy(Some(NextAction::Complete));
        response.assistant_message = "Calling now".to_string();
        response.confidence = Confidence::High;
        let out = sanitize(response, &SlotStore::new(), agent);
        assert_eq!(out.step, NextStep::Complete);
        assert_eq!(out.confidence, Confidence::High);
        assert_eq!(out.ai_model, "gpt-4o-mini");
    }

    #[test]
    fn test_repair_generic_keys_onto_last_asked_slot() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("SICK_CALLER").unwrap();
        let mut raw = SlotStore::new();
        raw.insert("answer".to_string(), json!("Sam Lee"));
        raw.insert("employer_name".to_string(), json!("Woolworths"));
        raw.insert("mood".to_string(), json!("tired"));
        raw.insert("note_for_team".to_string(), json!(""));

        let repaired = repair_extracted_keys(raw.clone(), agent, Some("caller_name"));
        assert_eq!(repaired.get("caller_name"), Some(&json!("Sam Lee")));
        assert_eq!(repaired.get("employer_name"), Some(&json!("Woolworths")));
        assert_eq!(repaired.len(), 2);

        let no_target = repair_extracted_keys(raw, agent, Some("not_a_slot"));
        assert_eq!(no_target.len(), 1);
        assert!(no_target.contains_key("employer_name"));
    }
}
