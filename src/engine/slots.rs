use serde_json::Value;

use crate::models::{AgentDefinition, SlotSpec, SlotStore};

/// A slot is filled when present, non-null and, for strings, non-blank.
/// `0` and `false` both count as answers.
pub fn is_filled(store: &SlotStore, slot_name: &str) -> bool {
    match store.get(slot_name) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// First required slot in declaration order that is not yet filled.
pub fn next_missing_required<'a>(
    agent: &'a AgentDefinition,
    store: &SlotStore,
) -> Option<&'a SlotSpec> {
    agent
        .required_slots()
        .find(|slot| !is_filled(store, &slot.name))
}

pub fn missing_required(agent: &AgentDefinition, store: &SlotStore) -> Vec<String> {
    agent
        .required_slots()
        .filter(|slot| !is_filled(store, &slot.name))
        .map(|slot| slot.name.clone())
        .collect()
}

pub fn filled_count(store: &SlotStore) -> usize {
    store.keys().filter(|k| is_filled(store, k)).count()
}

/// Shallow union; `new` wins on key collision. Nothing present in either
/// input is ever dropped.
pub fn merge(existing: &SlotStore, new: &SlotStore) -> SlotStore {
    let mut merged = existing.clone();
    for (key, value) in new {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::agents::AgentCatalog;

    fn store(pairs: &[(&str, Value)]) -> SlotStore {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_is_filled_rules() {
        let s = store(&[
            ("blank", json!("   ")),
            ("null", Value::Null),
            ("zero", json!(0)),
            ("no", json!(false)),
            ("name", json!("Bunnings")),
        ]);
        assert!(!is_filled(&s, "blank"));
        assert!(!is_filled(&s, "null"));
        assert!(!is_filled(&s, "absent"));
        assert!(is_filled(&s, "zero"));
        assert!(is_filled(&s, "no"));
        assert!(is_filled(&s, "name"));
    }

    #[test]
    fn test_next_missing_required_follows_declaration_order() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("SICK_CALLER").unwrap();

        let empty = SlotStore::new();
        assert_eq!(next_missing_required(agent, &empty).unwrap().name, "employer_name");

        let partial = store(&[
            ("employer_name", json!("Woolworths")),
            ("caller_name", json!("Sam")),
        ]);
        assert_eq!(next_missing_required(agent, &partial).unwrap().name, "employer_phone");
        assert_eq!(
            missing_required(agent, &partial),
            vec![
                "employer_phone",
                "shift_date",
                "shift_start_time",
                "reason_category"
            ]
        );
    }

    #[test]
    fn test_optional_slots_never_required() {
        let catalog = AgentCatalog::builtin().unwrap();
        let agent = catalog.get("STOCK_CHECKER").unwrap();
        let full = store(&[
            ("retailer_name", json!("JB Hi-Fi")),
            ("product_name", json!("headphones")),
            ("quantity", json!(0)),
            ("store_location", json!("Richmond")),
        ]);
        assert!(next_missing_required(agent, &full).is_none());
    }

    #[test]
    fn test_merge_new_wins_and_keeps_everything() {
        let existing = store(&[("a", json!("1")), ("b", json!("2"))]);
        let new = store(&[("b", json!("3")), ("c", json!("4"))]);
        let merged = merge(&existing, &new);
        assert_eq!(merged, store(&[("a", json!("1")), ("b", json!("3")), ("c", json!("4"))]));
    }
}
