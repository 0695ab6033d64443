//! Outcome reporting
//!
//! Terminal reconciler state is mapped here into the external response
//! contract: a success carrying the full observed document, a failure
//! carrying a taxonomy code and message, or an in-progress response carrying
//! a retry delay plus the serialized operation context so the next
//! invocation resumes polling instead of re-applying.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::OperationContext;
use crate::document::ObservedState;
use crate::error::{EngineError, Result};

/// Result of one reconciliation run.
#[derive(Debug)]
pub enum Outcome {
    /// The verb completed. Delete completes with no document.
    Succeeded { observed: Option<ObservedState> },
    /// The verb failed terminally; no retries were attempted beyond the
    /// stabilizer's own polling.
    Failed { error: EngineError },
    /// The verb is suspended at a poll delay; redrive with the context
    /// after `retry_after`.
    InProgress {
        context: OperationContext,
        retry_after: Duration,
    },
}

/// External response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Success,
    Failed,
    InProgress,
}

/// The wire form handed back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub status: ReportStatus,
    /// Full observed state document on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
    /// Taxonomy code on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Resource identity the failure concerns, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Last state observed before a stabilization timeout, so callers can
    /// distinguish "never started" from "stuck partway".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_observed: Option<Value>,
    /// Delay before the host should redrive an in-progress operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    /// Serialized operation context for redriving.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<OperationContext>,
}

impl Outcome {
    #[must_use]
    pub fn from_result(result: Result<Option<ObservedState>>) -> Self {
        match result {
            Ok(observed) => Outcome::Succeeded { observed },
            Err(error) => Outcome::Failed { error },
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Outcome::InProgress { .. })
    }

    /// Map this outcome into the external response contract.
    #[must_use]
    pub fn report(&self) -> Report {
        match self {
            Outcome::Succeeded { observed } => Report {
                status: ReportStatus::Success,
                resource: observed.as_ref().map(ObservedState::to_value),
                error_code: None,
                message: None,
                identity: None,
                last_observed: None,
                retry_after_seconds: None,
                context: None,
            },
            Outcome::Failed { error } => Report {
                status: ReportStatus::Failed,
                resource: None,
                error_code: Some(error.kind().code().to_string()),
                message: Some(error.to_string()),
                identity: error.identity().map(str::to_string),
                last_observed: error.last_observed().map(ObservedState::to_value),
                retry_after_seconds: None,
                context: None,
            },
            Outcome::InProgress {
                context,
                retry_after,
            } => Report {
                status: ReportStatus::InProgress,
                resource: None,
                error_code: None,
                message: None,
                identity: Some(context.identity.clone()),
                last_observed: None,
                retry_after_seconds: Some(retry_after.as_secs()),
                context: Some(context.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::RemoteOperation;
    use crate::document::StateDocument;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn observed(value: Value) -> ObservedState {
        let doc: StateDocument = serde_json::from_value(value).unwrap();
        ObservedState::from_document(doc)
    }

    #[test]
    fn test_success_report_carries_resource() {
        let outcome = Outcome::Succeeded {
            observed: Some(observed(json!({"cluster_name": "etl", "status": "available"}))),
        };
        let report = outcome.report();
        assert_eq!(report.status, ReportStatus::Success);
        assert_eq!(
            report.resource,
            Some(json!({"cluster_name": "etl", "status": "available"}))
        );
        assert!(report.error_code.is_none());
    }

    #[test]
    fn test_delete_success_has_no_resource() {
        let report = Outcome::Succeeded { observed: None }.report();
        assert_eq!(report.status, ReportStatus::Success);
        assert!(report.resource.is_none());
    }

    #[test]
    fn test_failure_report_carries_code_and_identity() {
        let outcome = Outcome::Failed {
            error: EngineError::remote(ErrorKind::Conflict, "cluster is resizing", Some("etl")),
        };
        let report = outcome.report();
        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(report.error_code.as_deref(), Some("Conflict"));
        assert_eq!(report.identity.as_deref(), Some("etl"));
        assert_eq!(report.message.as_deref(), Some("Conflict: cluster is resizing"));
    }

    #[test]
    fn test_not_stabilized_report_includes_last_observed() {
        let outcome = Outcome::Failed {
            error: EngineError::NotStabilized {
                attempts: 12,
                last_observed: Some(Box::new(observed(
                    json!({"cluster_name": "etl", "status": "modifying"}),
                ))),
            },
        };
        let report = outcome.report();
        assert_eq!(report.error_code.as_deref(), Some("NotStabilized"));
        assert_eq!(
            report.last_observed,
            Some(json!({"cluster_name": "etl", "status": "modifying"}))
        );
    }

    #[test]
    fn test_in_progress_report_serializes_context() {
        let context = OperationContext::start(RemoteOperation::Create, "etl");
        let outcome = Outcome::InProgress {
            context: context.clone(),
            retry_after: Duration::from_secs(10),
        };
        let report = outcome.report();
        assert_eq!(report.status, ReportStatus::InProgress);
        assert_eq!(report.retry_after_seconds, Some(10));
        assert_eq!(report.context, Some(context));

        let wire = serde_json::to_value(&report).unwrap();
        assert_eq!(wire["status"], json!("IN_PROGRESS"));
    }
}
