use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Collected answers for one conversation, keyed by slot name.
///
/// Ordered so that serialised responses are byte-stable across calls.
pub type SlotStore = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Text,
    Phone,
    Date,
    Time,
    Number,
    Choice,
    YesNo,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Text => "TEXT",
            ValueType::Phone => "PHONE",
            ValueType::Date => "DATE",
            ValueType::Time => "TIME",
            ValueType::Number => "NUMBER",
            ValueType::Choice => "CHOICE",
            ValueType::YesNo => "YES_NO",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "PHONE" => ValueType::Phone,
            "DATE" => ValueType::Date,
            "TIME" => ValueType::Time,
            "NUMBER" => ValueType::Number,
            "CHOICE" => ValueType::Choice,
            "YES_NO" | "BOOLEAN" => ValueType::YesNo,
            _ => ValueType::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// UI chip offered alongside a question.
pub type QuickReply = Choice;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSpec {
    pub name: String,
    pub required: bool,
    pub value_type: ValueType,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub description: String,
}

impl SlotSpec {
    pub fn required(name: &str, value_type: ValueType, prompt: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
            value_type,
            prompt: prompt.to_string(),
            choices: Vec::new(),
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, value_type: ValueType, prompt: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, value_type, prompt, description)
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    /// Chips to show with a question for this slot. YES_NO always offers
    /// exactly Yes/No; CHOICE offers its declared options in order.
    pub fn quick_replies(&self) -> Option<Vec<QuickReply>> {
        match self.value_type {
            ValueType::Choice if !self.choices.is_empty() => Some(self.choices.clone()),
            ValueType::YesNo => Some(vec![Choice::new("Yes", "YES"), Choice::new("No", "NO")]),
            _ => None,
        }
    }

    /// Human label for a stored value, used when rendering confirmation cards.
    pub fn display_value(&self, value: &str) -> String {
        if self.value_type == ValueType::Choice {
            if let Some(choice) = self.choices.iter().find(|c| c.value == value) {
                return choice.label.clone();
            }
        }
        value.to_string()
    }
}
