//! Desired and observed state documents
//!
//! A desired state document is the caller's target configuration; an
//! observed state document is the last-known actual configuration fetched
//! from the remote service, with a distinguished status field. Observed
//! state is never edited in place by the engine, only replaced wholesale by
//! a fresh read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name under which a resource's lifecycle status is reported.
pub const STATUS_FIELD: &str = "status";

/// An ordered field-name to value mapping.
///
/// Unset fields mean "no opinion" on update but "use the default" on
/// create, so absence is meaningful and distinct from `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDocument(Map<String, Value>);

impl StateDocument {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String view of a field, for identity and status style fields.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for StateDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Last-known actual state of a remote resource.
///
/// Produced exclusively by a service adapter's read path. The status field
/// is pulled out of the document so state checks never depend on document
/// layout; the pagination cursor is set only when this document represents
/// one page of a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedState {
    pub document: StateDocument,
    /// Lifecycle status string, e.g. `creating`, `available`, `failed`.
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ObservedState {
    /// Wrap a parsed document, extracting the status field.
    #[must_use]
    pub fn from_document(mut document: StateDocument) -> Self {
        let status = document
            .remove(STATUS_FIELD)
            .and_then(|v| v.as_str().map(str::to_string));
        Self {
            document,
            status,
            cursor: None,
        }
    }

    /// Normalized output form: the document with the status folded back in.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.document.as_map().clone();
        if let Some(status) = &self.status {
            map.insert(STATUS_FIELD.to_string(), Value::String(status.clone()));
        }
        Value::Object(map)
    }
}

/// One page of a list result: identity-only projections plus the cursor
/// addressing the next page, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub resources: Vec<StateDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}
