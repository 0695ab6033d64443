//! Unified error handling for the reconciliation engine
//!
//! Remote failures are classified exactly once, at the point the adapter
//! surfaces them, into the [`ErrorKind`] taxonomy. The engine performs no
//! retries of its own beyond the stabilizer's polling; a `Throttled` kind is
//! surfaced to the host, which owns any backoff-and-retry policy.
//!
//! # Example
//!
//! ```rust
//! use convergectl_core::{EngineError, ErrorKind};
//!
//! fn handle_error(err: EngineError) {
//!     if err.is_not_found() {
//!         println!("Resource not found");
//!     } else if err.is_retryable() {
//!         println!("Temporary error, can retry");
//!     }
//! }
//!
//! let err = EngineError::remote(ErrorKind::NotFound, "cluster 'prod' not found", Some("prod"));
//! assert!(err.is_not_found());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::ObservedState;

/// Classification of every failure the engine can report.
///
/// The mapping from remote error conditions to a kind is the service
/// adapter's job and must be total; `Unclassified` is the explicit fallback
/// for vendor errors the adapter's mapping does not cover yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    /// Malformed input or an illegal state transition.
    InvalidRequest,
    /// Remote resource is in an incompatible transient state.
    Conflict,
    ServiceLimitExceeded,
    Throttled,
    InvalidCredentials,
    /// Polling budget exhausted without reaching a target state.
    NotStabilized,
    /// Remote error that classified cleanly as a generic service failure.
    GeneralServiceFailure,
    /// Remote error the adapter could not map; indicates the classify
    /// mapping is incomplete and is always logged with full detail.
    Unclassified,
}

impl ErrorKind {
    /// Stable code string used in external responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::ServiceLimitExceeded => "ServiceLimitExceeded",
            ErrorKind::Throttled => "Throttled",
            ErrorKind::InvalidCredentials => "InvalidCredentials",
            ErrorKind::NotStabilized => "NotStabilized",
            ErrorKind::GeneralServiceFailure => "GeneralServiceFailure",
            ErrorKind::Unclassified => "Unclassified",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error type for all engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Classified failure from the remote service.
    #[error("{kind}: {message}")]
    Remote {
        kind: ErrorKind,
        message: String,
        /// Resource identity the call addressed, when known.
        identity: Option<String>,
    },

    /// Pre-flight validation failure; no remote call was made.
    #[error("validation error: {0}")]
    Validation(String),

    /// Stabilization budget exhausted without reaching a target state.
    #[error("did not stabilize after {attempts} read attempts")]
    NotStabilized {
        attempts: u32,
        /// Last state observed before giving up, so callers can tell
        /// "never started" from "stuck partway".
        last_observed: Option<Box<ObservedState>>,
    },

    /// The resource entered a terminal failure state while stabilizing.
    #[error("'{identity}' entered terminal state '{status}'")]
    TerminalState { identity: String, status: String },

    /// Configuration error (client construction, profiles).
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Build a classified remote failure.
    pub fn remote(
        kind: ErrorKind,
        message: impl Into<String>,
        identity: Option<&str>,
    ) -> Self {
        EngineError::Remote {
            kind,
            message: message.into(),
            identity: identity.map(str::to_string),
        }
    }

    /// The taxonomy kind this error reports to the host.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Remote { kind, .. } => *kind,
            EngineError::Validation(_) | EngineError::Config(_) => ErrorKind::InvalidRequest,
            EngineError::NotStabilized { .. } => ErrorKind::NotStabilized,
            EngineError::TerminalState { .. } => ErrorKind::GeneralServiceFailure,
        }
    }

    /// Resource identity the failure concerns, when known.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        match self {
            EngineError::Remote { identity, .. } => identity.as_deref(),
            EngineError::TerminalState { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true if the remote resource already exists.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    /// Returns true for rate limiting failures.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.kind() == ErrorKind::Throttled
    }

    /// Returns true for authentication/authorization failures.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::InvalidCredentials
    }

    /// Returns true if the whole operation is potentially retryable by the
    /// host. Validation failures and immutable-field violations never are.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Throttled
                | ErrorKind::Conflict
                | ErrorKind::NotStabilized
                | ErrorKind::GeneralServiceFailure
        )
    }

    /// Last observed state attached to a stabilization timeout.
    #[must_use]
    pub fn last_observed(&self) -> Option<&ObservedState> {
        match self {
            EngineError::NotStabilized { last_observed, .. } => {
                last_observed.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_kind_and_identity() {
        let err = EngineError::remote(
            ErrorKind::NotFound,
            "cluster 'analytics' not found",
            Some("analytics"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.identity(), Some("analytics"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_maps_to_invalid_request() {
        let err = EngineError::Validation("missing field 'node_type'".to_string());
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(!err.is_retryable());
        assert!(err.identity().is_none());
    }

    #[test]
    fn test_not_stabilized_is_retryable() {
        let err = EngineError::NotStabilized {
            attempts: 30,
            last_observed: None,
        };
        assert_eq!(err.kind(), ErrorKind::NotStabilized);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_terminal_state_reports_identity() {
        let err = EngineError::TerminalState {
            identity: "etl-main".to_string(),
            status: "failed".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::GeneralServiceFailure);
        assert_eq!(err.identity(), Some("etl-main"));
    }

    #[test]
    fn test_throttled_is_retryable() {
        let err = EngineError::remote(ErrorKind::Throttled, "slow down", None);
        assert!(err.is_throttled());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_kind_codes_are_stable() {
        assert_eq!(ErrorKind::NotFound.code(), "NotFound");
        assert_eq!(ErrorKind::ServiceLimitExceeded.code(), "ServiceLimitExceeded");
        assert_eq!(ErrorKind::Unclassified.to_string(), "Unclassified");
    }
}
