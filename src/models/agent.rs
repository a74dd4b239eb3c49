use serde::{Deserialize, Serialize};

use super::slot::{SlotSpec, ValueType};

/// Where the number to dial comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhoneSource {
    FromLookup,
    FromSlot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationTemplate {
    pub title: String,
    /// Lines with `{slot_name}` placeholders.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub agent_type: String,
    pub title: String,
    pub description: String,
    /// Declaration order is collection priority.
    pub slots: Vec<SlotSpec>,
    pub confirmation: ConfirmationTemplate,
    pub phone_source: PhoneSource,
    pub direct_phone_slot: Option<String>,
    pub lookup_query_slot: Option<String>,
    pub lookup_area_slot: Option<String>,
}

impl AgentDefinition {
    pub fn slot(&self, name: &str) -> Option<&SlotSpec> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    pub fn required_slots(&self) -> impl Iterator<Item = &SlotSpec> {
        self.slots.iter().filter(|s| s.required)
    }

    pub fn phone_slots(&self) -> impl Iterator<Item = &SlotSpec> {
        self.slots
            .iter()
            .filter(|s| s.value_type == ValueType::Phone)
    }

    pub fn meta(&self) -> AgentMeta {
        AgentMeta {
            phone_source: self.phone_source,
            direct_phone_slot: self.direct_phone_slot.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

/// Agent metadata echoed on every response so clients can route the
/// phone step without knowing agent specifics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMeta {
    pub phone_source: PhoneSource,
    pub direct_phone_slot: Option<String>,
    pub title: String,
    pub description: String,
}
