pub mod builtin;

use std::collections::{HashMap, HashSet};

use crate::models::{AgentDefinition, PhoneSource, ValueType};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CatalogError {
    #[error("unknown agent type: {0}")]
    UnknownAgent(String),

    #[error("duplicate agent type: {0}")]
    DuplicateAgent(String),

    #[error("agent {agent}: duplicate slot name {slot}")]
    DuplicateSlot { agent: String, slot: String },

    #[error("agent {agent}: slot {slot} must declare choices iff it is a CHOICE slot")]
    ChoiceMismatch { agent: String, slot: String },

    #[error("agent {agent}: {reason}")]
    InvalidPhoneSource { agent: String, reason: String },
}

/// Closed, immutable registry of agent definitions. Built once at startup
/// and shared read-only.
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: HashMap<String, AgentDefinition>,
    order: Vec<String>,
}

impl AgentCatalog {
    pub fn new(definitions: Vec<AgentDefinition>) -> Result<Self, CatalogError> {
        let mut agents = HashMap::new();
        let mut order = Vec::new();

        for def in definitions {
            validate(&def)?;
            if agents.contains_key(&def.agent_type) {
                return Err(CatalogError::DuplicateAgent(def.agent_type));
            }
            order.push(def.agent_type.clone());
            agents.insert(def.agent_type.clone(), def);
        }

        Ok(Self { agents, order })
    }

    /// Catalog with the agents this service ships with.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin::definitions())
    }

    pub fn get(&self, agent_type: &str) -> Result<&AgentDefinition, CatalogError> {
        self.agents
            .get(agent_type)
            .ok_or_else(|| CatalogError::UnknownAgent(agent_type.to_string()))
    }

    /// Agents in registration order.
    pub fn list(&self) -> Vec<&AgentDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.agents.get(name))
            .collect()
    }
}

fn validate(def: &AgentDefinition) -> Result<(), CatalogError> {
    let agent = def.agent_type.clone();

    let mut seen = HashSet::new();
    for slot in &def.slots {
        if !seen.insert(slot.name.as_str()) {
            return Err(CatalogError::DuplicateSlot {
                agent,
                slot: slot.name.clone(),
            });
        }
        let is_choice = slot.value_type == ValueType::Choice;
        if is_choice == slot.choices.is_empty() {
            return Err(CatalogError::ChoiceMismatch {
                agent,
                slot: slot.name.clone(),
            });
        }
    }

    let phone_error = |reason: String| CatalogError::InvalidPhoneSource {
        agent: def.agent_type.clone(),
        reason,
    };

    match def.phone_source {
        PhoneSource::FromSlot => {
            let phone_slots = def.phone_slots().count();
            if phone_slots != 1 {
                return Err(phone_error(format!(
                    "FROM_SLOT needs exactly one PHONE slot, found {phone_slots}"
                )));
            }
            let Some(name) = def.direct_phone_slot.as_deref() else {
                return Err(phone_error("FROM_SLOT requires a direct phone slot".into()));
            };
            match def.slot(name) {
                Some(slot) if slot.value_type == ValueType::Phone => {}
                Some(_) => return Err(phone_error(format!("slot {name} is not a PHONE slot"))),
                None => return Err(phone_error(format!("phone slot {name} does not exist"))),
            }
        }
        PhoneSource::FromLookup => match def.lookup_query_slot.as_deref() {
            Some(name) if def.has_slot(name) => {}
            Some(name) => return Err(phone_error(format!("lookup query slot {name} does not exist"))),
            None => return Err(phone_error("FROM_LOOKUP requires a lookup query slot".into())),
        },
    }

    for name in [&def.lookup_query_slot, &def.lookup_area_slot].into_iter().flatten() {
        if !def.has_slot(name) {
            return Err(phone_error(format!("lookup slot {name} does not exist")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfirmationTemplate, SlotSpec};

    fn minimal(agent_type: &str) -> AgentDefinition {
        AgentDefinition {
            agent_type: agent_type.to_string(),
            title: "Test".to_string(),
            description: String::new(),
            slots: vec![SlotSpec::required("business", ValueType::Text, "Which business?", "")],
            confirmation: ConfirmationTemplate {
                title: "Test".to_string(),
                lines: vec!["Business: {business}".to_string()],
            },
            phone_source: PhoneSource::FromLookup,
            direct_phone_slot: None,
            lookup_query_slot: Some("business".to_string()),
            lookup_area_slot: None,
        }
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = AgentCatalog::builtin().unwrap();
        let names: Vec<_> = catalog.list().iter().map(|a| a.agent_type.clone()).collect();
        assert_eq!(
            names,
            vec![
                "SICK_CALLER",
                "STOCK_CHECKER",
                "RESTAURANT_RESERVATION",
                "CANCEL_APPOINTMENT"
            ]
        );
    }

    #[test]
    fn test_unknown_agent() {
        let catalog = AgentCatalog::builtin().unwrap();
        assert_eq!(
            catalog.get("PIZZA_ORDER").unwrap_err(),
            CatalogError::UnknownAgent("PIZZA_ORDER".to_string())
        );
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let err = AgentCatalog::new(vec![minimal("A"), minimal("A")]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateAgent("A".to_string()));
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let mut def = minimal("A");
        def.slots.push(SlotSpec::optional("business", ValueType::Text, "Again?", ""));
        assert!(matches!(
            AgentCatalog::new(vec![def]),
            Err(CatalogError::DuplicateSlot { .. })
        ));
    }

    #[test]
    fn test_choice_slot_without_choices_rejected() {
        let mut def = minimal("A");
        def.slots.push(SlotSpec::required("reason", ValueType::Choice, "Why?", ""));
        assert!(matches!(
            AgentCatalog::new(vec![def]),
            Err(CatalogError::ChoiceMismatch { .. })
        ));
    }

    #[test]
    fn test_from_slot_requires_phone_slot() {
        let mut def = minimal("A");
        def.phone_source = PhoneSource::FromSlot;
        def.direct_phone_slot = Some("business".to_string());
        assert!(matches!(
            AgentCatalog::new(vec![def]),
            Err(CatalogError::InvalidPhoneSource { .. })
        ));
    }

    #[test]
    fn test_from_lookup_requires_existing_query_slot() {
        let mut def = minimal("A");
        def.lookup_query_slot = Some("missing".to_string());
        assert!(matches!(
            AgentCatalog::new(vec![def]),
            Err(CatalogError::InvalidPhoneSource { .. })
        ));
    }

    #[test]
    fn test_from_slot_requires_exactly_one_phone_slot() {
        let mut def = minimal("A");
        def.slots.push(SlotSpec::required("office_phone", ValueType::Phone, "Office?", ""));
        def.slots.push(SlotSpec::optional("mobile", ValueType::Phone, "Mobile?", ""));
        def.phone_source = PhoneSource::FromSlot;
        def.direct_phone_slot = Some("office_phone".to_string());

        let err = AgentCatalog::new(vec![def.clone()]).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPhoneSource { reason, .. } if reason.contains("found 2")));

        def.slots.retain(|s| s.name != "mobile");
        assert!(AgentCatalog::new(vec![def]).is_ok());
    }
}
