use crate::models::{
    AgentDefinition, Choice, ConfirmationTemplate, PhoneSource, SlotSpec, ValueType,
};

pub fn definitions() -> Vec<AgentDefinition> {
    vec![
        sick_caller(),
        stock_checker(),
        restaurant_reservation(),
        cancel_appointment(),
    ]
}

fn confirmation(title: &str, lines: &[&str]) -> ConfirmationTemplate {
    ConfirmationTemplate {
        title: title.to_string(),
        lines: lines.iter().map(|l| l.to_string()).collect(),
    }
}

fn sick_caller() -> AgentDefinition {
    AgentDefinition {
        agent_type: "SICK_CALLER".to_string(),
        title: "Call in Sick".to_string(),
        description: "Notify your workplace that you are unwell".to_string(),
        slots: vec![
            SlotSpec::required(
                "employer_name",
                ValueType::Text,
                "Who should I call to notify? (e.g., your manager's name or company name)",
                "Name of employer/manager to call",
            ),
            SlotSpec::required(
                "employer_phone",
                ValueType::Phone,
                "What's their phone number?",
                "Phone number to call",
            ),
            SlotSpec::required(
                "caller_name",
                ValueType::Text,
                "What name should I give them? (your name)",
                "User's name to provide",
            ),
            SlotSpec::required(
                "shift_date",
                ValueType::Date,
                "When is your shift?",
                "Date of the shift being missed",
            ),
            SlotSpec::required(
                "shift_start_time",
                ValueType::Time,
                "What time does your shift start?",
                "Start time of the shift",
            ),
            SlotSpec::required(
                "reason_category",
                ValueType::Choice,
                "What's the reason for calling in?",
                "Reason category for absence",
            )
            .with_choices(vec![
                Choice::new("I'm sick", "SICK"),
                Choice::new("Caring for someone", "CARER"),
                Choice::new("Mental health day", "MENTAL_HEALTH"),
                Choice::new("Medical appointment", "MEDICAL_APPOINTMENT"),
            ]),
            SlotSpec::optional(
                "expected_return_date",
                ValueType::Date,
                "When do you expect to return? (optional)",
                "Expected return date",
            ),
            SlotSpec::optional(
                "note_for_team",
                ValueType::Text,
                "Any message for your team? (optional)",
                "Additional note",
            ),
        ],
        confirmation: confirmation(
            "Call In Sick",
            &[
                "Calling: {employer_name}",
                "Phone: {employer_phone}",
                "Your name: {caller_name}",
                "Shift: {shift_date} at {shift_start_time}",
                "Reason: {reason_category}",
            ],
        ),
        phone_source: PhoneSource::FromSlot,
        direct_phone_slot: Some("employer_phone".to_string()),
        // Used when the caller asks us to look the employer's number up.
        lookup_query_slot: Some("employer_name".to_string()),
        lookup_area_slot: None,
    }
}

fn stock_checker() -> AgentDefinition {
    AgentDefinition {
        agent_type: "STOCK_CHECKER".to_string(),
        title: "Stock Check".to_string(),
        description: "Check product availability at retailers".to_string(),
        slots: vec![
            SlotSpec::required(
                "retailer_name",
                ValueType::Text,
                "Which retailer should I call?",
                "Name of the retailer",
            ),
            SlotSpec::required(
                "product_name",
                ValueType::Text,
                "What product are you looking for?",
                "Product to check availability",
            ),
            SlotSpec::required(
                "quantity",
                ValueType::Number,
                "How many do you need?",
                "Quantity needed",
            ),
            SlotSpec::required(
                "store_location",
                ValueType::Text,
                "Which suburb or area should I search in?",
                "Location for store search",
            ),
            SlotSpec::optional(
                "brand",
                ValueType::Text,
                "Any specific brand? (optional)",
                "Brand preference",
            ),
            SlotSpec::optional(
                "model",
                ValueType::Text,
                "Any specific model? (optional)",
                "Model number or name",
            ),
            SlotSpec::optional(
                "variant",
                ValueType::Text,
                "Any specific variant (size, color)? (optional)",
                "Variant details",
            ),
        ],
        confirmation: confirmation(
            "Check Stock",
            &[
                "Retailer: {retailer_name}",
                "Product: {product_name}",
                "Quantity: {quantity}",
                "Location: {store_location}",
            ],
        ),
        phone_source: PhoneSource::FromLookup,
        direct_phone_slot: None,
        lookup_query_slot: Some("retailer_name".to_string()),
        lookup_area_slot: Some("store_location".to_string()),
    }
}

fn restaurant_reservation() -> AgentDefinition {
    AgentDefinition {
        agent_type: "RESTAURANT_RESERVATION".to_string(),
        title: "Book Restaurant".to_string(),
        description: "Book a table at a restaurant".to_string(),
        slots: vec![
            SlotSpec::required(
                "restaurant_name",
                ValueType::Text,
                "Which restaurant would you like to book?",
                "Name of the restaurant",
            ),
            SlotSpec::required(
                "party_size",
                ValueType::Number,
                "How many people?",
                "Number of guests",
            ),
            SlotSpec::required(
                "date",
                ValueType::Date,
                "What date would you like to book for?",
                "Reservation date",
            ),
            SlotSpec::required(
                "time",
                ValueType::Time,
                "What time would you prefer?",
                "Reservation time",
            ),
            SlotSpec::optional(
                "suburb_or_area",
                ValueType::Text,
                "Which suburb or area? (optional if restaurant name is unique)",
                "Location area",
            ),
            SlotSpec::optional(
                "share_contact",
                ValueType::YesNo,
                "Should I share your contact details with the restaurant?",
                "Whether to share contact info",
            ),
        ],
        confirmation: confirmation(
            "Book Restaurant",
            &[
                "Restaurant: {restaurant_name}",
                "Party size: {party_size} people",
                "Date: {date}",
                "Time: {time}",
            ],
        ),
        phone_source: PhoneSource::FromLookup,
        direct_phone_slot: None,
        lookup_query_slot: Some("restaurant_name".to_string()),
        lookup_area_slot: Some("suburb_or_area".to_string()),
    }
}

fn cancel_appointment() -> AgentDefinition {
    AgentDefinition {
        agent_type: "CANCEL_APPOINTMENT".to_string(),
        title: "Cancel Appointment".to_string(),
        description: "Cancel an existing booking".to_string(),
        slots: vec![
            SlotSpec::required(
                "business_name",
                ValueType::Text,
                "What's the name of the business where you have the appointment?",
                "Business name",
            ),
            SlotSpec::required(
                "appointment_day",
                ValueType::Date,
                "What day is your appointment?",
                "Appointment date",
            ),
            SlotSpec::required(
                "appointment_time",
                ValueType::Time,
                "What time is the appointment?",
                "Appointment time",
            ),
            SlotSpec::required(
                "customer_name",
                ValueType::Text,
                "What name is the booking under?",
                "Name on the booking",
            ),
            SlotSpec::optional(
                "business_location",
                ValueType::Text,
                "Which location/branch? (optional if only one location)",
                "Business location",
            ),
            SlotSpec::optional(
                "cancel_reason",
                ValueType::Text,
                "Any reason to provide? (optional)",
                "Cancellation reason",
            ),
            SlotSpec::optional(
                "reschedule_intent",
                ValueType::YesNo,
                "Would you like to reschedule?",
                "Whether to ask about rescheduling",
            ),
        ],
        confirmation: confirmation(
            "Cancel Appointment",
            &[
                "Business: {business_name}",
                "Appointment: {appointment_day} at {appointment_time}",
                "Name on booking: {customer_name}",
            ],
        ),
        phone_source: PhoneSource::FromLookup,
        direct_phone_slot: None,
        lookup_query_slot: Some("business_name".to_string()),
        lookup_area_slot: Some("business_location".to_string()),
    }
}
