use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::agent::AgentMeta;
use super::slot::{QuickReply, SlotStore, ValueType};

/// Terminal actions a client can send instead of free text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientAction {
    Confirm,
    Reject,
}

impl ClientAction {
    /// Anything other than CONFIRM/REJECT is treated as no action.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONFIRM" => Some(ClientAction::Confirm),
            "REJECT" => Some(ClientAction::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Confidence::High,
            "LOW" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Deterministic,
    Assisted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    AskQuestion,
    Confirm,
    Complete,
    Lookup,
}

impl NextAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextAction::AskQuestion => "ASK_QUESTION",
            NextAction::Confirm => "CONFIRM",
            NextAction::Complete => "COMPLETE",
            NextAction::Lookup => "LOOKUP",
        }
    }

    /// Lenient parse of externally produced action tags. Older clients call
    /// the lookup step FIND_PLACE.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASK_QUESTION" => Some(NextAction::AskQuestion),
            "CONFIRM" => Some(NextAction::Confirm),
            "COMPLETE" => Some(NextAction::Complete),
            "LOOKUP" | "FIND_PLACE" => Some(NextAction::Lookup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// Absent for the open "what would you like to change?" question.
    pub slot_name: Option<String>,
    pub value_type: ValueType,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_replies: Option<Vec<QuickReply>>,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmationCard {
    pub title: String,
    pub lines: Vec<String>,
    pub confirm_label: String,
    pub reject_label: String,
    pub card_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupParams {
    pub query: String,
    pub area: String,
    pub country: String,
}

/// The single next action together with the only payload it may carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "next_action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextStep {
    AskQuestion { question: Option<Question> },
    Confirm { confirmation_card: ConfirmationCard },
    Lookup { lookup_params: LookupParams },
    Complete,
}

impl NextStep {
    pub fn action(&self) -> NextAction {
        match self {
            NextStep::AskQuestion { .. } => NextAction::AskQuestion,
            NextStep::Confirm { .. } => NextAction::Confirm,
            NextStep::Lookup { .. } => NextAction::Lookup,
            NextStep::Complete => NextAction::Complete,
        }
    }

    pub fn question(&self) -> Option<&Question> {
        match self {
            NextStep::AskQuestion { question } => question.as_ref(),
            _ => None,
        }
    }

    pub fn question_slot(&self) -> Option<&str> {
        self.question().and_then(|q| q.slot_name.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub conversation_id: String,
    pub agent_type: String,
    #[serde(default)]
    pub user_message: String,
    #[serde(default)]
    pub slots: SlotStore,
    /// Slot the previous question targeted.
    #[serde(default, alias = "current_question_slot_name")]
    pub current_slot: Option<String>,
    #[serde(default)]
    pub client_action: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub debug: bool,
    /// Caller's local date for resolving "today"/"tomorrow".
    #[serde(default)]
    pub local_date: Option<NaiveDate>,
}

impl TurnRequest {
    pub fn new(conversation_id: &str, agent_type: &str, user_message: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            agent_type: agent_type.to_string(),
            user_message: user_message.to_string(),
            slots: SlotStore::new(),
            current_slot: None,
            client_action: None,
            idempotency_key: None,
            debug: false,
            local_date: None,
        }
    }

    pub fn client_action(&self) -> Option<ClientAction> {
        self.client_action.as_deref().and_then(ClientAction::parse)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebugPayload {
    pub planner_action: NextAction,
    pub planner_question_slot: Option<String>,
    pub extraction_assisted: bool,
    pub extracted: SlotStore,
    pub merged_slots: SlotStore,
    pub missing_required_slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnResponse {
    pub assistant_message: String,
    #[serde(flatten)]
    pub step: NextStep,
    /// Full merged slot store, never only the newly extracted subset.
    pub slots: SlotStore,
    pub confidence: Confidence,
    pub ai_call_made: bool,
    pub ai_model: String,
    pub engine_version: String,
    pub agent_meta: Option<AgentMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugPayload>,
}

impl TurnResponse {
    pub fn action(&self) -> NextAction {
        self.step.action()
    }
}
