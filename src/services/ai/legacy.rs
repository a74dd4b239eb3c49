//! Free-form response generation for the legacy endpoint. The model writes
//! the whole response object; everything it returns is parsed leniently and
//! handed to the sanitizer.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::engine::planner::{build_question, card_id, CONFIRM_LABEL, REJECT_LABEL};
use crate::engine::sanitize::repair_extracted_keys;
use crate::engine::slots::{merge, next_missing_required};
use crate::models::{
    AgentDefinition, Choice, Confidence, ConfirmationCard, LegacyResponse, LookupParams,
    NextAction, Question, SlotStore, ValueType,
};
use crate::services::ai::{parse_json_object, LlmProvider, Message};

/// Keys that mark a proper response object rather than bare slot values.
const RESPONSE_KEYS: &[&str] = &[
    "assistant_message",
    "assistantMessage",
    "next_action",
    "nextAction",
    "question",
    "extracted_data",
    "extractedData",
    "confidence",
    "confirmation_card",
    "confirmationCard",
    "lookup_params",
    "placeSearchParams",
];

pub struct LegacyGenerator {
    llm: Arc<dyn LlmProvider>,
    country: String,
}

impl LegacyGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, country: &str) -> Self {
        Self {
            llm,
            country: country.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Never fails; provider errors and unusable output yield an empty
    /// response for the sanitizer to repair.
    pub async fn generate(
        &self,
        agent: &AgentDefinition,
        slots: &SlotStore,
        utterance: &str,
        last_asked: Option<&str>,
    ) -> LegacyResponse {
        let system = build_system_prompt(agent, slots, last_asked);
        let content = match self.llm.chat(&system, &[Message::user(utterance)]).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, agent = %agent.agent_type, "legacy generation failed");
                return LegacyResponse::empty(self.model());
            }
        };
        parse_response(&content, agent, slots, last_asked, self.model(), &self.country)
    }
}

fn build_system_prompt(
    agent: &AgentDefinition,
    slots: &SlotStore,
    last_asked: Option<&str>,
) -> String {
    let slot_lines: Vec<String> = agent
        .slots
        .iter()
        .map(|slot| {
            let mut line = format!(
                "- {} ({}{}): {}",
                slot.name,
                slot.value_type.as_str(),
                if slot.required { ", required" } else { "" },
                slot.prompt
            );
            if !slot.choices.is_empty() {
                let values: Vec<&str> = slot.choices.iter().map(|c| c.value.as_str()).collect();
                line.push_str(&format!(" [allowed values: {}]", values.join(", ")));
            }
            line
        })
        .collect();
    let known = serde_json::to_string(slots).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"You are helping a user prepare a phone call: {title} ({description}).

Collect these slots, asking for one at a time in order:
{slots}

Slots collected so far: {known}
Last question asked about: {last}

Return ONLY a JSON object with this structure:
{{
  "assistant_message": "non-empty message to the user",
  "next_action": "ASK_QUESTION | CONFIRM | LOOKUP | COMPLETE",
  "question": {{"slot_name": "slot", "value_type": "TEXT", "prompt": "question text"}},
  "extracted_data": {{"slot_name": "value"}},
  "confidence": "LOW | MEDIUM | HIGH",
  "confirmation_card": {{"title": "...", "lines": ["..."]}},
  "lookup_params": {{"query": "...", "area": "..."}}
}}

Use CONFIRM only once every required slot is collected. Include only the
payload that matches next_action."#,
        title = agent.title,
        description = agent.description,
        slots = slot_lines.join("\n"),
        known = known,
        last = last_asked.unwrap_or("none"),
    )
}

fn parse_response(
    content: &str,
    agent: &AgentDefinition,
    slots: &SlotStore,
    last_asked: Option<&str>,
    model: &str,
    country: &str,
) -> LegacyResponse {
    let Some(data) = parse_json_object(content) else {
        tracing::warn!(agent = %agent.agent_type, "legacy model output was not JSON");
        return LegacyResponse::empty(model);
    };

    if let Some(response) = slot_only_response(&data, agent, slots, model) {
        return response;
    }

    let extracted = field(&data, &["extracted_data", "extractedData"])
        .and_then(Value::as_object)
        .map(|raw| repair_extracted_keys(raw.clone().into_iter().collect(), agent, last_asked))
        .filter(|repaired| !repaired.is_empty());

    LegacyResponse {
        assistant_message: string_field(&data, &["assistant_message", "assistantMessage"])
            .unwrap_or_default(),
        next_action: string_field(&data, &["next_action", "nextAction"])
            .and_then(|s| NextAction::parse(&s)),
        question: field(&data, &["question"])
            .and_then(Value::as_object)
            .and_then(parse_question),
        extracted_data: extracted,
        confidence: string_field(&data, &["confidence"])
            .map(|s| Confidence::parse(&s))
            .unwrap_or(Confidence::Medium),
        confirmation_card: field(&data, &["confirmation_card", "confirmationCard"])
            .and_then(Value::as_object)
            .map(parse_card),
        lookup_params: field(&data, &["lookup_params", "placeSearchParams"])
            .and_then(Value::as_object)
            .map(|p| LookupParams {
                query: string_field(p, &["query"]).unwrap_or_default(),
                area: string_field(p, &["area"]).unwrap_or_default(),
                country: string_field(p, &["country"]).unwrap_or_else(|| country.to_string()),
            }),
        ai_call_made: true,
        ai_model: model.to_string(),
    }
}

/// Some models answer with nothing but slot values. Treat new values as the
/// extraction and ask for whatever is still missing. Echoes of already known
/// values fall through to the generic path.
fn slot_only_response(
    data: &Map<String, Value>,
    agent: &AgentDefinition,
    slots: &SlotStore,
    model: &str,
) -> Option<LegacyResponse> {
    if data.keys().any(|k| RESPONSE_KEYS.contains(&k.as_str())) {
        return None;
    }
    if !data.keys().any(|k| agent.has_slot(k)) {
        return None;
    }

    let declared: SlotStore = data
        .iter()
        .filter(|(k, _)| agent.has_slot(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let new_slots: SlotStore = repair_extracted_keys(declared, agent, None)
        .into_iter()
        .filter(|(k, v)| slots.get(k) != Some(v))
        .collect();

    if new_slots.is_empty() {
        tracing::info!(agent = %agent.agent_type, "model echoed known slots only");
        return None;
    }
    tracing::info!(
        agent = %agent.agent_type,
        new_slots = ?new_slots.keys().collect::<Vec<_>>(),
        "slot-only model response"
    );

    let merged = merge(slots, &new_slots);
    let (assistant_message, question) = match next_missing_required(agent, &merged) {
        Some(slot) => (format!("Got it. {}", slot.prompt), Some(build_question(slot))),
        None => ("I have all the information I need.".to_string(), None),
    };

    Some(LegacyResponse {
        assistant_message,
        next_action: Some(NextAction::AskQuestion),
        question,
        extracted_data: Some(new_slots),
        confidence: Confidence::High,
        confirmation_card: None,
        lookup_params: None,
        ai_call_made: true,
        ai_model: model.to_string(),
    })
}

fn field<'a>(data: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| data.get(*k)).filter(|v| !v.is_null())
}

fn string_field(data: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(data, keys).and_then(Value::as_str).map(str::to_string)
}

fn parse_question(q: &Map<String, Value>) -> Option<Question> {
    let prompt = string_field(q, &["prompt", "text"])?;
    let quick_replies = field(q, &["quick_replies", "choices"])
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|c| {
                    let label = string_field(c, &["label"])?;
                    let value = string_field(c, &["value"]).unwrap_or_else(|| label.clone());
                    Some(Choice { label, value })
                })
                .collect::<Vec<_>>()
        })
        .filter(|choices| !choices.is_empty());

    Some(Question {
        slot_name: string_field(q, &["slot_name", "field"]),
        value_type: string_field(q, &["value_type", "inputType"])
            .map(|s| ValueType::parse(&s))
            .unwrap_or(ValueType::Text),
        prompt,
        quick_replies,
        optional: field(q, &["optional"])
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn parse_card(card: &Map<String, Value>) -> ConfirmationCard {
    let title = string_field(card, &["title"]).unwrap_or_else(|| "Confirmation".to_string());
    let lines: Vec<String> = field(card, &["lines"])
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    ConfirmationCard {
        card_id: card_id(&title, &lines),
        confirm_label: string_field(card, &["confirm_label", "confirmLabel"])
            .unwrap_or_else(|| CONFIRM_LABEL.to_string()),
        reject_label: string_field(card, &["reject_label", "rejectLabel"])
            .unwrap_or_else(|| REJECT_LABEL.to_string()),
        title,
        lines,
    }
}
