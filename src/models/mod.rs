pub mod agent;
pub mod conversation;
pub mod legacy;
pub mod slot;

pub use agent::{AgentDefinition, AgentMeta, ConfirmationTemplate, PhoneSource};
pub use conversation::{
    ClientAction, Confidence, ConfirmationCard, DebugPayload, LookupParams, NextAction, NextStep,
    Provenance, Question, TurnRequest, TurnResponse,
};
pub use legacy::LegacyResponse;
pub use slot::{Choice, QuickReply, SlotSpec, SlotStore, ValueType};
