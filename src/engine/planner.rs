//! Deterministic conversation planner.
//!
//! `Planner::decide` is a pure function of its arguments: no I/O, no clock,
//! no randomness. Every input maps to exactly one `NextStep`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::engine::slots::{is_filled, next_missing_required};
use crate::models::{
    AgentDefinition, ClientAction, ConfirmationCard, LookupParams, NextStep, Question, SlotSpec,
    SlotStore, ValueType,
};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("valid regex"));

pub const NOT_PROVIDED: &str = "(not provided)";
pub const CONFIRM_LABEL: &str = "Yes, that's correct";
pub const REJECT_LABEL: &str = "No, let me change something";
pub const OPEN_QUESTION: &str = "What would you like to change?";

/// Phrases that, while we are asking for a phone number, mean "I don't
/// know it, look it up".
pub const DEFAULT_LOOKUP_PHRASES: &[&str] = &[
    "don't know",
    "dont know",
    "not sure",
    "find it",
    "look it up",
    "search for it",
    "i don't have",
    "i dont have",
    "can you find",
    "help me find",
    "find the number",
    "look up the number",
    "search",
    "find",
];

#[derive(Debug, Clone)]
pub struct LookupLexicon {
    phrases: Vec<String>,
}

impl LookupLexicon {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Case-insensitive substring match against the phrase list.
    pub fn matches(&self, utterance: &str) -> bool {
        let lower = utterance.to_lowercase();
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
    }
}

impl Default for LookupLexicon {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_PHRASES)
    }
}

/// Placeholders used when an agent's lookup slots are still empty.
#[derive(Debug, Clone)]
pub struct LookupDefaults {
    pub query: String,
    pub area: String,
    pub country: String,
}

impl Default for LookupDefaults {
    fn default() -> Self {
        Self {
            query: "business".to_string(),
            area: "Australia".to_string(),
            country: "AU".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerResult {
    /// Never empty.
    pub assistant_message: String,
    pub step: NextStep,
}

#[derive(Debug, Clone, Default)]
pub struct Planner {
    lexicon: LookupLexicon,
    defaults: LookupDefaults,
}

impl Planner {
    pub fn new(lexicon: LookupLexicon, defaults: LookupDefaults) -> Self {
        Self { lexicon, defaults }
    }

    /// Rules, first match wins:
    /// 1. client CONFIRM → COMPLETE
    /// 2. client REJECT → ask the next missing slot, or the open question
    /// 3. asking for a PHONE slot and the user wants it looked up → LOOKUP
    /// 4. a required slot is missing → ask for it
    /// 5. otherwise → CONFIRM with a rendered card
    pub fn decide(
        &self,
        agent: &AgentDefinition,
        slots: &SlotStore,
        client_action: Option<ClientAction>,
        utterance: &str,
        hint_slot: Option<&str>,
    ) -> PlannerResult {
        match client_action {
            Some(ClientAction::Confirm) => {
                tracing::debug!(agent = %agent.agent_type, "client confirmed, completing");
                return PlannerResult {
                    assistant_message: "Great! I'll place the call now.".to_string(),
                    step: NextStep::Complete,
                };
            }
            Some(ClientAction::Reject) => {
                return match next_missing_required(agent, slots) {
                    Some(slot) => PlannerResult {
                        assistant_message: format!("No problem! {}", slot.prompt),
                        step: NextStep::AskQuestion {
                            question: Some(build_question(slot)),
                        },
                    },
                    None => PlannerResult {
                        assistant_message: OPEN_QUESTION.to_string(),
                        step: NextStep::AskQuestion {
                            question: Some(open_question()),
                        },
                    },
                };
            }
            None => {}
        }

        let asking_phone = hint_slot
            .and_then(|name| agent.slot(name))
            .is_some_and(|slot| slot.value_type == ValueType::Phone);
        if asking_phone && self.lexicon.matches(utterance) {
            tracing::debug!(agent = %agent.agent_type, "lookup requested for phone slot");
            return PlannerResult {
                assistant_message: "I'll help you find the number.".to_string(),
                step: NextStep::Lookup {
                    lookup_params: self.lookup_params(agent, slots),
                },
            };
        }

        match next_missing_required(agent, slots) {
            Some(slot) => PlannerResult {
                assistant_message: slot.prompt.clone(),
                step: NextStep::AskQuestion {
                    question: Some(build_question(slot)),
                },
            },
            None => PlannerResult {
                assistant_message: "Let me confirm the details:".to_string(),
                step: NextStep::Confirm {
                    confirmation_card: build_confirmation_card(agent, slots),
                },
            },
        }
    }

    pub fn lookup_params(&self, agent: &AgentDefinition, slots: &SlotStore) -> LookupParams {
        let pick = |slot: Option<&String>, default: &str| {
            slot.filter(|name| is_filled(slots, name))
                .and_then(|name| slots.get(name))
                .map(display_value)
                .unwrap_or_else(|| default.to_string())
        };

        LookupParams {
            query: pick(agent.lookup_query_slot.as_ref(), &self.defaults.query),
            area: pick(agent.lookup_area_slot.as_ref(), &self.defaults.area),
            country: self.defaults.country.clone(),
        }
    }
}

pub fn build_question(slot: &SlotSpec) -> Question {
    Question {
        slot_name: Some(slot.name.clone()),
        value_type: slot.value_type,
        prompt: slot.prompt.clone(),
        quick_replies: slot.quick_replies(),
        optional: false,
    }
}

/// Free-form question not bound to any slot.
pub fn open_question() -> Question {
    Question {
        slot_name: None,
        value_type: ValueType::Text,
        prompt: OPEN_QUESTION.to_string(),
        quick_replies: None,
        optional: false,
    }
}

pub fn build_confirmation_card(agent: &AgentDefinition, slots: &SlotStore) -> ConfirmationCard {
    let lines: Vec<String> = agent
        .confirmation
        .lines
        .iter()
        .map(|template| render_line(template, agent, slots))
        .collect();

    ConfirmationCard {
        card_id: card_id(&agent.confirmation.title, &lines),
        title: agent.confirmation.title.clone(),
        lines,
        confirm_label: CONFIRM_LABEL.to_string(),
        reject_label: REJECT_LABEL.to_string(),
    }
}

fn render_line(template: &str, agent: &AgentDefinition, slots: &SlotStore) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            if !is_filled(slots, name) {
                return NOT_PROVIDED.to_string();
            }
            let raw = slots.get(name).map(display_value).unwrap_or_default();
            match agent.slot(name) {
                Some(spec) => spec.display_value(&raw),
                None => raw,
            }
        })
        .into_owned()
}

/// Content fingerprint for client-side UI keying. Not a security token.
pub fn card_id(title: &str, lines: &[String]) -> String {
    let mut content = title.to_string();
    for line in lines {
        content.push('|');
        content.push_str(line);
    }
    let digest = Sha1::digest(content.as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Null => NOT_PROVIDED.to_string(),
        other => other.to_string(),
    }
}
