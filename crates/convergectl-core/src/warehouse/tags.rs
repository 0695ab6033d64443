//! Tag reconciliation helpers
//!
//! Tags are a flat string map on every kind that carries them. Reconciling
//! them is a set difference against the observed tags, applied as one
//! compound-verb sub-step.

use serde_json::{Map, Value, json};

/// Compute the tag mutation that turns `observed` into `desired`.
///
/// Returns `None` when the observed tags already match, so callers can skip
/// the sub-step entirely. Non-object values are treated as empty maps.
#[must_use]
pub fn diff_tags(desired: Option<&Value>, observed: Option<&Value>) -> Option<Value> {
    let desired = desired.and_then(Value::as_object);
    let desired = desired?;
    let empty = Map::new();
    let observed = observed.and_then(Value::as_object).unwrap_or(&empty);

    let mut add = Map::new();
    for (key, value) in desired {
        if observed.get(key) != Some(value) {
            add.insert(key.clone(), value.clone());
        }
    }

    let mut remove: Vec<Value> = observed
        .keys()
        .filter(|key| !desired.contains_key(*key))
        .map(|key| Value::String(key.clone()))
        .collect();
    remove.sort_by(|a, b| a.as_str().cmp(&b.as_str()));

    if add.is_empty() && remove.is_empty() {
        return None;
    }
    Some(json!({ "add": add, "remove": remove }))
}
