//! Per-invocation operation context
//!
//! The context threads progress through a possibly multi-step verb: which
//! sub-step is executing, whether its mutation has been applied, and how
//! many stabilization reads have been consumed. It is owned by one
//! reconciliation at a time, passed by value, and serializable so a host
//! can persist it between redrive invocations; polling may span many
//! separate invocations, so nothing here assumes process-lifetime memory.

use serde::{Deserialize, Serialize};

use crate::adapter::RemoteOperation;
use crate::error::{EngineError, Result};

/// Current context schema version. Bumped when the layout changes so a host
/// replaying stale state fails loudly instead of resuming wrong.
pub const CONTEXT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
    pub version: u32,
    /// Verb this context belongs to; a resume with a different verb is
    /// rejected rather than silently restarted.
    pub verb: RemoteOperation,
    /// Identity currently addressing the remote resource. Switches to the
    /// new identity once a pending rename is observed to have completed.
    pub identity: String,
    /// Index of the sub-step currently executing.
    #[serde(default)]
    pub step: usize,
    /// Whether the current sub-step's mutation has been applied.
    #[serde(default)]
    pub applied: bool,
    /// Stabilization read attempts consumed by the current sub-step.
    #[serde(default)]
    pub poll_attempts: u32,
    /// Labels of sub-steps already completed, for logging and diagnostics.
    #[serde(default)]
    pub completed: Vec<String>,
}

impl OperationContext {
    #[must_use]
    pub fn start(verb: RemoteOperation, identity: impl Into<String>) -> Self {
        Self {
            version: CONTEXT_VERSION,
            verb,
            identity: identity.into(),
            step: 0,
            applied: false,
            poll_attempts: 0,
            completed: Vec::new(),
        }
    }

    /// Record the current sub-step as done and move to the next one.
    pub(crate) fn advance(&mut self, label: &str) {
        self.completed.push(label.to_string());
        self.step += 1;
        self.applied = false;
        self.poll_attempts = 0;
    }

    /// Deserialize a context previously handed to the host, checking the
    /// schema version.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let ctx: OperationContext = serde_json::from_value(value)
            .map_err(|e| EngineError::Validation(format!("invalid operation context: {e}")))?;
        if ctx.version != CONTEXT_VERSION {
            return Err(EngineError::Validation(format!(
                "operation context version {} is not supported (expected {})",
                ctx.version, CONTEXT_VERSION
            )));
        }
        Ok(ctx)
    }

    /// Like [`Self::from_value`], additionally checking the expected verb.
    pub fn resume(value: serde_json::Value, verb: RemoteOperation) -> Result<Self> {
        let ctx = Self::from_value(value)?;
        if ctx.verb != verb {
            return Err(EngineError::Validation(format!(
                "operation context belongs to a '{}' operation, not '{}'",
                ctx.verb, verb
            )));
        }
        Ok(ctx)
    }
}
