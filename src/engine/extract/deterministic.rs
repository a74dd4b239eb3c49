//! Fixed, type-specific parsers for an answer to a known question.
//!
//! Every parser returns `None` rather than guessing; the caller then falls
//! through to the assisted tier.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::{SlotSpec, ValueType};

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static BARE_HOUR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s*(am|pm)?$").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

const NEGATIVE_WORDS: &[&str] = &["no", "nope", "nah", "not", "don't", "dont", "n", "never"];
const AFFIRMATIVE_WORDS: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "yup",
    "sure",
    "ok",
    "okay",
    "absolutely",
    "definitely",
    "please",
    "correct",
    "y",
];

const NUMBER_WORDS: &[(&str, i64)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Tried with the current year appended.
const YEARLESS_DATE_FORMATS: &[&str] = &["%d %B", "%d %b", "%B %d", "%b %d"];

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

/// Inputs a parser may depend on besides the utterance itself.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Caller's local date; pins relative terms like "tomorrow".
    pub today: NaiveDate,
    /// Calling code used to qualify national numbers, without the `+`.
    pub calling_code: String,
}

impl ParseContext {
    pub fn new(today: NaiveDate, calling_code: &str) -> Self {
        Self {
            today,
            calling_code: calling_code.trim_start_matches('+').to_string(),
        }
    }
}

/// Parse `utterance` as an answer for `slot`.
pub fn extract_value(slot: &SlotSpec, utterance: &str, ctx: &ParseContext) -> Option<Value> {
    let trimmed = utterance.trim();
    if trimmed.is_empty() {
        return None;
    }

    match slot.value_type {
        ValueType::Choice => extract_choice(trimmed, slot).map(Value::String),
        ValueType::YesNo => extract_yes_no(trimmed).map(|v| Value::String(v.to_string())),
        ValueType::Phone => normalize_phone(trimmed, &ctx.calling_code).map(Value::String),
        ValueType::Date => parse_date(trimmed, ctx.today)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        ValueType::Time => parse_time(trimmed).map(|t| Value::String(t.format("%H:%M").to_string())),
        ValueType::Number => parse_number(trimmed).map(Value::from),
        ValueType::Text => Some(Value::String(trimmed.to_string())),
    }
}

/// Exact value, then exact label, then label/utterance containment. Each
/// pass walks the choices in declared order.
pub fn extract_choice(utterance: &str, slot: &SlotSpec) -> Option<String> {
    let message = utterance.trim().to_lowercase();
    if message.is_empty() {
        return None;
    }

    if let Some(c) = slot
        .choices
        .iter()
        .find(|c| c.value.to_lowercase() == message)
    {
        return Some(c.value.clone());
    }

    if let Some(c) = slot
        .choices
        .iter()
        .find(|c| c.label.to_lowercase() == message)
    {
        return Some(c.value.clone());
    }

    slot.choices
        .iter()
        .find(|c| {
            let label = c.label.to_lowercase();
            let core = label.replace("i'm ", "").replace("i am ", "");
            // Very short replies like "n" would otherwise match most labels.
            message.contains(&core) || (message.len() >= 3 && label.contains(&message))
        })
        .map(|c| c.value.clone())
}

/// Whole-word match; negatives are checked first so "not really, yes" is a no.
pub fn extract_yes_no(utterance: &str) -> Option<&'static str> {
    let lower = utterance.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.iter().any(|t| NEGATIVE_WORDS.contains(t)) {
        return Some("NO");
    }
    if tokens.iter().any(|t| AFFIRMATIVE_WORDS.contains(t)) {
        return Some("YES");
    }
    None
}

/// Normalise to E.164. Returns `None` unless the result is a plausible
/// E.164 number.
pub fn normalize_phone(raw: &str, calling_code: &str) -> Option<String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return None;
    }

    // Reject utterances that merely contain a number among words.
    let letters = trimmed.chars().filter(|c| c.is_alphabetic()).count();
    if letters > 3 {
        return None;
    }

    let candidate = if has_plus {
        format!("+{digits}")
    } else if digits.len() == 10 && digits.starts_with('0') {
        format!("+{calling_code}{}", &digits[1..])
    } else if digits.len() == 9 && !digits.starts_with('0') && calling_code == "61" {
        format!("+{calling_code}{digits}")
    } else if digits.starts_with(calling_code) && digits.len() == calling_code.len() + 9 {
        format!("+{digits}")
    } else if digits.len() >= 10 && ["1", "44", "61"].iter().any(|cc| digits.starts_with(cc)) {
        format!("+{digits}")
    } else {
        return None;
    };

    is_valid_e164(&candidate).then_some(candidate)
}

pub fn is_valid_e164(number: &str) -> bool {
    let Some(rest) = number.strip_prefix('+') else {
        return false;
    };
    (8..=15).contains(&rest.len())
        && rest.chars().all(|c| c.is_ascii_digit())
        && !rest.starts_with('0')
}

pub fn parse_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();

    match lower.as_str() {
        "today" | "now" | "tonight" => return Some(today),
        "tomorrow" | "tmrw" | "tmr" => return Some(today + Duration::days(1)),
        _ => {}
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            // "%Y" happily reads "26" as year 26; leave that to the "%y" formats.
            if date.year() >= 1000 {
                return Some(date);
            }
        }
    }

    let with_year = format!("{trimmed} {}", today.year());
    YEARLESS_DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&with_year, &format!("{fmt} %Y")).ok()
    })
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let lower = raw.trim().to_lowercase();
    let normalized = lower
        .replace("a.m.", "am")
        .replace("p.m.", "pm")
        .replace('.', ":")
        .replace("am", " am")
        .replace("pm", " pm");
    let normalized = WHITESPACE.replace_all(&normalized, " ").trim().to_string();

    for fmt in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(&normalized, fmt) {
            return Some(time);
        }
    }

    let caps = BARE_HOUR.captures(&normalized)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2).map(|m| m.as_str()) {
        Some(_) if hour == 0 || hour > 12 => return None,
        Some("pm") if hour < 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }
    NaiveTime::from_hms_opt(hour, 0, 0)
}

pub fn parse_number(raw: &str) -> Option<i64> {
    let lower = raw.trim().to_lowercase();
    if let Some((_, n)) = NUMBER_WORDS.iter().find(|(word, _)| *word == lower) {
        return Some(*n);
    }
    DIGIT_RUN
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::Choice;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn ctx() -> ParseContext {
        ParseContext::new(today(), "61")
    }

    fn reason_slot() -> SlotSpec {
        SlotSpec::required("reason_category", ValueType::Choice, "Why?", "").with_choices(vec![
            Choice::new("I'm sick", "SICK"),
            Choice::new("Caring for someone", "CARER"),
            Choice::new("Mental health day", "MENTAL_HEALTH"),
            Choice::new("Medical appointment", "MEDICAL_APPOINTMENT"),
        ])
    }

    #[test]
    fn test_choice_exact_value() {
        assert_eq!(extract_choice("SICK", &reason_slot()), Some("SICK".to_string()));
        assert_eq!(extract_choice("carer", &reason_slot()), Some("CARER".to_string()));
    }

    #[test]
    fn test_choice_label_and_substring() {
        assert_eq!(
            extract_choice("Medical Appointment", &reason_slot()),
            Some("MEDICAL_APPOINTMENT".to_string())
        );
        assert_eq!(
            extract_choice("honestly I'm feeling sick today", &reason_slot()),
            Some("SICK".to_string())
        );
        assert_eq!(
            extract_choice("mental health", &reason_slot()),
            Some("MENTAL_HEALTH".to_string())
        );
        assert_eq!(extract_choice("skiing", &reason_slot()), None);
    }

    #[test]
    fn test_yes_no_negative_first() {
        assert_eq!(extract_yes_no("Yes please"), Some("YES"));
        assert_eq!(extract_yes_no("nope"), Some("NO"));
        assert_eq!(extract_yes_no("yes, actually no"), Some("NO"));
        assert_eq!(extract_yes_no("don't share it"), Some("NO"));
        assert_eq!(extract_yes_no("yesterday"), None);
        assert_eq!(extract_yes_no("maybe"), None);
    }

    #[test]
    fn test_phone_normalisation() {
        assert_eq!(normalize_phone("0412 345 678", "61"), Some("+61412345678".to_string()));
        assert_eq!(normalize_phone("412345678", "61"), Some("+61412345678".to_string()));
        assert_eq!(normalize_phone("61412345678", "61"), Some("+61412345678".to_string()));
        assert_eq!(normalize_phone("+1 (415) 555-0100", "61"), Some("+14155550100".to_string()));
        assert_eq!(normalize_phone("(03) 9876 5432", "61"), Some("+61398765432".to_string()));
    }

    #[test]
    fn test_phone_rejects_non_numbers() {
        assert_eq!(normalize_phone("I don't know the number", "61"), None);
        assert_eq!(normalize_phone("12345", "61"), None);
        assert_eq!(normalize_phone("call me at 5 after lunch", "61"), None);
    }

    #[test]
    fn test_relative_dates_use_injected_today() {
        assert_eq!(parse_date("today", today()), Some(today()));
        assert_eq!(
            parse_date("Tomorrow", today()),
            NaiveDate::from_ymd_opt(2026, 3, 11)
        );
    }

    #[test]
    fn test_calendar_formats() {
        let feb1 = NaiveDate::from_ymd_opt(2026, 2, 1);
        assert_eq!(parse_date("2026-02-01", today()), feb1);
        assert_eq!(parse_date("01/02/2026", today()), feb1);
        assert_eq!(parse_date("01/02/26", today()), feb1);
        assert_eq!(parse_date("February 1, 2026", today()), feb1);
        assert_eq!(parse_date("1 Feb 2026", today()), feb1);
        assert_eq!(parse_date("not a date", today()), None);
    }

    #[test]
    fn test_date_without_year_assumes_current_year() {
        assert_eq!(
            parse_date("14 July", today()),
            NaiveDate::from_ymd_opt(2026, 7, 14)
        );
    }

    #[test]
    fn test_time_formats() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0);
        assert_eq!(parse_time("14:00"), t(14, 0));
        assert_eq!(parse_time("2:30 PM"), t(14, 30));
        assert_eq!(parse_time("9.15am"), t(9, 15));
        assert_eq!(parse_time("2pm"), t(14, 0));
        assert_eq!(parse_time("7 p.m."), t(19, 0));
        assert_eq!(parse_time("12pm"), t(12, 0));
        assert_eq!(parse_time("12am"), t(0, 0));
        assert_eq!(parse_time("lunchtime"), None);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_number("four"), Some(4));
        assert_eq!(parse_number("Zero"), Some(0));
        assert_eq!(parse_number("a table for 6 please"), Some(6));
        assert_eq!(parse_number("lots"), None);
    }

    #[test]
    fn test_extract_value_by_type() {
        let text = SlotSpec::required("name", ValueType::Text, "Name?", "");
        assert_eq!(extract_value(&text, "  Sam  ", &ctx()), Some(json!("Sam")));
        assert_eq!(extract_value(&text, "   ", &ctx()), None);

        let qty = SlotSpec::required("quantity", ValueType::Number, "How many?", "");
        assert_eq!(extract_value(&qty, "zero", &ctx()), Some(json!(0)));

        let date = SlotSpec::required("date", ValueType::Date, "When?", "");
        assert_eq!(extract_value(&date, "tomorrow", &ctx()), Some(json!("2026-03-11")));

        let time = SlotSpec::required("time", ValueType::Time, "What time?", "");
        assert_eq!(extract_value(&time, "7pm", &ctx()), Some(json!("19:00")));
    }
}
