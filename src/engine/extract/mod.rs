pub mod deterministic;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{AgentDefinition, Confidence, Provenance, SlotStore, ValueType};

pub use deterministic::ParseContext;

/// What the assisted tier gets to see for one utterance.
#[derive(Debug, Clone, Copy)]
pub struct AssistedRequest<'a> {
    pub agent: &'a AgentDefinition,
    pub utterance: &'a str,
    pub hint_slot: Option<&'a str>,
    /// Context only; values here must not be re-extracted.
    pub existing: &'a SlotStore,
}

/// External natural-language extraction. Implementations may return any
/// keys at all; the extraction layer filters them against the agent.
#[async_trait]
pub trait AssistedExtraction: Send + Sync {
    fn model(&self) -> &str;

    async fn extract(&self, request: AssistedRequest<'_>) -> anyhow::Result<SlotStore>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedValue {
    pub value: Value,
    pub provenance: Provenance,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub new_slots: BTreeMap<String, ExtractedValue>,
    pub provenance: Provenance,
    pub confidence: Confidence,
    /// Whether the assisted tier was invoked, successfully or not.
    pub assisted_used: bool,
    pub model: Option<String>,
}

impl ExtractionResult {
    fn empty(provenance: Provenance, confidence: Confidence) -> Self {
        Self {
            new_slots: BTreeMap::new(),
            provenance,
            confidence,
            assisted_used: false,
            model: None,
        }
    }

    fn tagged(values: SlotStore, provenance: Provenance, confidence: Confidence) -> Self {
        let new_slots = values
            .into_iter()
            .map(|(name, value)| {
                (
                    name,
                    ExtractedValue {
                        value,
                        provenance,
                        confidence,
                    },
                )
            })
            .collect();
        Self {
            new_slots,
            ..Self::empty(provenance, confidence)
        }
    }

    /// Plain slot map ready to merge into the store.
    pub fn values(&self) -> SlotStore {
        self.new_slots
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }
}

/// Two-tier extraction: type-specific parsing of an answer to the last
/// question, falling back to the assisted capability.
pub struct Extractor {
    assisted: Option<Arc<dyn AssistedExtraction>>,
    timeout: Duration,
    calling_code: String,
}

impl Extractor {
    pub fn new(
        assisted: Option<Arc<dyn AssistedExtraction>>,
        timeout: Duration,
        calling_code: &str,
    ) -> Self {
        Self {
            assisted,
            timeout,
            calling_code: calling_code.to_string(),
        }
    }

    /// Never fails: assisted errors, timeouts and junk output all become an
    /// empty LOW-confidence result.
    pub async fn extract(
        &self,
        agent: &AgentDefinition,
        utterance: &str,
        hint_slot: Option<&str>,
        existing: &SlotStore,
        today: NaiveDate,
    ) -> ExtractionResult {
        if utterance.trim().is_empty() {
            return ExtractionResult::empty(Provenance::Deterministic, Confidence::High);
        }

        if let Some(slot) = hint_slot.and_then(|name| agent.slot(name)) {
            let ctx = ParseContext::new(today, &self.calling_code);
            if let Some(value) = deterministic::extract_value(slot, utterance, &ctx) {
                tracing::info!(slot = %slot.name, value = %value, "deterministic extraction");
                let mut values = SlotStore::new();
                values.insert(slot.name.clone(), value);
                return ExtractionResult::tagged(values, Provenance::Deterministic, Confidence::High);
            }
        }

        let Some(assisted) = &self.assisted else {
            return ExtractionResult::empty(Provenance::Deterministic, Confidence::Low);
        };

        let request = AssistedRequest {
            agent,
            utterance,
            hint_slot,
            existing,
        };

        let outcome = tokio::time::timeout(self.timeout, assisted.extract(request)).await;
        let mut result = match outcome {
            Ok(Ok(raw)) => {
                let values = filter_declared(agent, raw);
                tracing::info!(
                    agent = %agent.agent_type,
                    slots = ?values.keys().collect::<Vec<_>>(),
                    "assisted extraction"
                );
                ExtractionResult::tagged(values, Provenance::Assisted, Confidence::Medium)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, agent = %agent.agent_type, "assisted extraction failed");
                ExtractionResult::empty(Provenance::Assisted, Confidence::Low)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    agent = %agent.agent_type,
                    "assisted extraction timed out"
                );
                ExtractionResult::empty(Provenance::Assisted, Confidence::Low)
            }
        };
        result.assisted_used = true;
        result.model = Some(assisted.model().to_string());
        result
    }
}

/// Keep only declared slot names with non-empty values; CHOICE values must
/// resolve to one of the slot's legal values.
pub fn filter_declared(agent: &AgentDefinition, raw: SlotStore) -> SlotStore {
    raw.into_iter()
        .filter_map(|(name, value)| {
            let Some(slot) = agent.slot(&name) else {
                tracing::info!(key = %name, agent = %agent.agent_type, "dropping undeclared slot");
                return None;
            };
            match &value {
                Value::Null => None,
                Value::String(s) if s.trim().is_empty() => None,
                Value::String(s) if slot.value_type == ValueType::Choice => {
                    deterministic::extract_choice(s, slot).map(|v| (name, Value::String(v)))
                }
                _ if slot.value_type == ValueType::Choice => None,
                _ => Some((name, value)),
            }
        })
        .collect()
}
