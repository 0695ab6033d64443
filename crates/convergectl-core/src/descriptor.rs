//! Static per-kind resource metadata
//!
//! A descriptor is pure data: identity addressing, validation field sets,
//! and the lifecycle state sets the stabilizer polls against. One `'static`
//! descriptor exists per resource kind and is freely shared.

use crate::document::StateDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Kind name, e.g. `cluster`.
    pub kind: &'static str,
    /// Field holding the resource's primary key.
    pub identity_field: &'static str,
    /// Field carrying a pending rename, for kinds that support one.
    pub rename_field: Option<&'static str>,
    /// Fields that must be present in a desired document on create.
    pub required_fields: &'static [&'static str],
    /// Fields that, when present on update, must equal the observed value.
    pub immutable_fields: &'static [&'static str],
    /// Status values considered stable and ready.
    pub success_states: &'static [&'static str],
    /// Status values from which no further polling should occur.
    pub failure_states: &'static [&'static str],
    /// Maximum length of a generated identity for this kind.
    pub max_identity_len: usize,
}

impl ResourceDescriptor {
    /// Primary key carried by a state document, if any.
    #[must_use]
    pub fn identity<'a>(&self, doc: &'a StateDocument) -> Option<&'a str> {
        doc.get_str(self.identity_field)
    }

    /// Pending new identity carried by a desired document, if any.
    #[must_use]
    pub fn pending_rename<'a>(&self, doc: &'a StateDocument) -> Option<&'a str> {
        self.rename_field.and_then(|field| doc.get_str(field))
    }

    #[must_use]
    pub fn is_success_state(&self, status: &str) -> bool {
        self.success_states
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status))
    }

    #[must_use]
    pub fn is_failure_state(&self, status: &str) -> bool {
        self.failure_states
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status))
    }

    /// Kinds with no success states have no observable transient state and
    /// skip stabilization entirely.
    #[must_use]
    pub fn has_transient_state(&self) -> bool {
        !self.success_states.is_empty()
    }
}
