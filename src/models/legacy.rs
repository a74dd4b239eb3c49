use super::conversation::{Confidence, ConfirmationCard, LookupParams, NextAction, Question};
use super::slot::SlotStore;

/// Whole-response object produced by the free-form generator. Nothing here
/// is trusted: any combination of fields may be missing or contradictory
/// until it has been through the sanitizer.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyResponse {
    pub assistant_message: String,
    pub next_action: Option<NextAction>,
    pub question: Option<Question>,
    pub extracted_data: Option<SlotStore>,
    pub confidence: Confidence,
    pub confirmation_card: Option<ConfirmationCard>,
    pub lookup_params: Option<LookupParams>,
    pub ai_call_made: bool,
    pub ai_model: String,
}

impl LegacyResponse {
    pub fn empty(ai_model: &str) -> Self {
        Self {
            assistant_message: String::new(),
            next_action: None,
            question: None,
            extracted_data: None,
            confidence: Confidence::Low,
            confirmation_card: None,
            lookup_params: None,
            ai_call_made: true,
            ai_model: ai_model.to_string(),
        }
    }
}
