use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::extract::{AssistedExtraction, AssistedRequest};
use crate::models::SlotStore;
use crate::services::ai::{parse_json_object, LlmProvider, Message};

const SYSTEM_PROMPT: &str =
    "You are a slot extraction assistant. Output ONLY valid JSON, nothing else.";

/// Assisted extraction backed by a chat model. The model is used strictly as
/// a parser: it never decides what to ask next.
pub struct LlmExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AssistedExtraction for LlmExtractor {
    fn model(&self) -> &str {
        self.llm.model()
    }

    async fn extract(&self, request: AssistedRequest<'_>) -> anyhow::Result<SlotStore> {
        let prompt = build_prompt(&request);
        let response = self.llm.chat(SYSTEM_PROMPT, &[Message::user(&prompt)]).await?;
        tracing::debug!(response = %response, "extraction model response");
        parse_extraction(&response)
    }
}

pub fn build_prompt(request: &AssistedRequest<'_>) -> String {
    let slot_lines: Vec<String> = request
        .agent
        .slots
        .iter()
        .map(|slot| {
            let mut line = format!("- {} ({})", slot.name, slot.value_type.as_str());
            if !slot.choices.is_empty() {
                let allowed: Vec<String> =
                    slot.choices.iter().map(|c| format!("\"{}\"", c.value)).collect();
                line.push_str(&format!(" [allowed values: {}]", allowed.join(", ")));
            }
            line
        })
        .collect();

    let existing = serde_json::to_string(request.existing).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"Extract slot values from the user message.

SLOTS TO EXTRACT:
{slots}

CURRENT SLOT BEING ASKED: {current}

EXISTING SLOTS: {existing}

USER MESSAGE: "{utterance}"

INSTRUCTIONS:
1. Extract ONLY the slots that have values in the user message
2. Use the EXACT slot names listed above
3. For CHOICE slots, use ONLY the allowed values
4. For DATE, use ISO format (YYYY-MM-DD)
5. For TIME, use 24-hour format (HH:MM)
6. For PHONE, use E.164 format if possible (+61...)
7. Do NOT include slots that aren't mentioned
8. Do NOT make up values
9. Do NOT ask questions or provide any other text

OUTPUT FORMAT (JSON only, no other text):
{{"extracted_data": {{"slot_name": "value"}}}}

If no slots can be extracted, return:
{{"extracted_data": {{}}}}"#,
        slots = slot_lines.join("\n"),
        current = request.hint_slot.unwrap_or("none"),
        existing = existing,
        utterance = request.utterance,
    )
}

/// Accepts `{"extracted_data": {...}}`, the camel-cased variant, or a bare
/// object of slot values.
fn parse_extraction(response: &str) -> anyhow::Result<SlotStore> {
    let mut object = parse_json_object(response)
        .ok_or_else(|| anyhow::anyhow!("extraction response was not a JSON object"))?;

    let inner = object
        .remove("extracted_data")
        .or_else(|| object.remove("extractedData"));

    let map = match inner {
        Some(Value::Object(map)) => map,
        Some(Value::Null) => return Ok(SlotStore::new()),
        Some(other) => anyhow::bail!("extracted_data was not an object: {other}"),
        None => object,
    };

    Ok(map.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::agents::AgentCatalog;

    #[test]
    fn test_prompt_lists_slots_and_allowed_values() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("SICK_CALLER").unwrap();
        let existing = SlotStore::new();
        let request = AssistedRequest {
            agent,
            utterance: "I'm crook, shift at 9",
            hint_slot: Some("reason_category"),
            existing: &existing,
        };

        let prompt = build_prompt(&request);
        assert!(prompt.contains("- employer_phone (PHONE)"));
        assert!(prompt.contains(r#"[allowed values: "SICK", "CARER", "MENTAL_HEALTH", "MEDICAL_APPOINTMENT"]"#));
        assert!(prompt.contains("CURRENT SLOT BEING ASKED: reason_category"));
        assert!(prompt.contains(r#"USER MESSAGE: "I'm crook, shift at 9""#));
    }

    #[test]
    fn test_parse_wrapped_and_bare_objects() {
        let wrapped = parse_extraction(r#"{"extracted_data":{"quantity":2}}"#).unwrap();
        assert_eq!(wrapped.get("quantity"), Some(&json!(2)));

        let camel = parse_extraction(r#"{"extractedData":{"brand":"Sony"}}"#).unwrap();
        assert_eq!(camel.get("brand"), Some(&json!("Sony")));

        let bare = parse_extraction("```json\n{\"product_name\":\"PS5\"}\n```").unwrap();
        assert_eq!(bare.get("product_name"), Some(&json!("PS5")));
    }

    #[test]
    fn test_parse_failure_is_an_error() {
        assert!(parse_extraction("no json here").is_err());
        assert!(parse_extraction(r#"{"extracted_data":"Sam"}"#).is_err());
    }
}
