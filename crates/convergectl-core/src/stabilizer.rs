//! Stabilization polling
//!
//! After a mutation, most kinds pass through a transient state (`creating`,
//! `modifying`, `deleting`) before settling. The stabilizer polls the
//! adapter's read path until the status lands in a target set, the resource
//! enters a terminal failure state, or the attempt budget runs out.
//!
//! [`poll_once`] is the primitive: one read, one classification, attempt
//! accounting in the operation context. A host that cannot block redrives
//! `poll_once` across invocations; [`stabilize`] is the in-process blocking
//! loop built on top of it for hosts that tolerate long-lived calls.

use std::time::Duration;

use crate::adapter::{ServiceAdapter, read_observed};
use crate::context::OperationContext;
use crate::document::{ObservedState, StateDocument};
use crate::error::{EngineError, Result};
use crate::progress::{ProgressCallback, ProgressEvent, emit};

/// Polling configuration. Delay and budget are never hardcoded; a
/// zero-delay configuration is valid and keeps unit tests deterministic
/// without real waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizeConfig {
    /// Delay between polls.
    pub interval: Duration,
    /// Maximum number of read attempts before giving up.
    pub max_attempts: u32,
}

impl StabilizeConfig {
    #[must_use]
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Zero-delay configuration for test doubles.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(Duration::ZERO, max_attempts)
    }
}

impl Default for StabilizeConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), 60)
    }
}

/// What the stabilizer is waiting for.
#[derive(Debug, Clone, Copy)]
pub enum StabilizeTarget<'a> {
    /// Wait until the status lands in one of these states.
    States(&'a [&'a str]),
    /// Wait until the resource no longer exists (delete draining).
    Gone,
}

/// Result of a single poll.
#[derive(Debug)]
pub enum PollOutcome {
    /// A target state was reached.
    Ready(ObservedState),
    /// The resource is confirmed gone.
    Gone,
    /// Still transient; poll again after the configured delay.
    Pending { last_status: Option<String> },
}

/// Perform one stabilization read against the context's current identity.
///
/// Consumes exactly one attempt from the context's budget per call. When the
/// read reports not-found and the desired document carries a pending rename,
/// the read is retried by the new identity exactly once before the failure
/// stands; a successful retry switches the context's identity permanently.
pub async fn poll_once<A: ServiceAdapter + ?Sized>(
    adapter: &A,
    desired: Option<&StateDocument>,
    target: StabilizeTarget<'_>,
    failure_states: &[&str],
    config: &StabilizeConfig,
    ctx: &mut OperationContext,
) -> Result<PollOutcome> {
    if ctx.poll_attempts >= config.max_attempts {
        return Err(EngineError::NotStabilized {
            attempts: ctx.poll_attempts,
            last_observed: None,
        });
    }
    ctx.poll_attempts += 1;

    let observed = match read_observed(adapter, &ctx.identity).await {
        Ok(observed) => observed,
        Err(err) if err.is_not_found() => {
            if matches!(target, StabilizeTarget::Gone) {
                return Ok(PollOutcome::Gone);
            }
            let pending = desired
                .and_then(|d| adapter.descriptor().pending_rename(d))
                .filter(|new_id| *new_id != ctx.identity);
            match pending {
                Some(new_identity) => {
                    tracing::debug!(
                        kind = adapter.descriptor().kind,
                        old = %ctx.identity,
                        new = new_identity,
                        "read by current identity returned not-found; retrying pending rename"
                    );
                    let observed = read_observed(adapter, new_identity).await?;
                    ctx.identity = new_identity.to_string();
                    observed
                }
                None => return Err(err),
            }
        }
        Err(err) => return Err(err),
    };

    let status = observed.status.clone();
    if let Some(status) = status.as_deref() {
        if failure_states.iter().any(|s| s.eq_ignore_ascii_case(status)) {
            return Err(EngineError::TerminalState {
                identity: ctx.identity.clone(),
                status: status.to_string(),
            });
        }
        if let StabilizeTarget::States(targets) = target
            && targets.iter().any(|s| s.eq_ignore_ascii_case(status))
        {
            return Ok(PollOutcome::Ready(observed));
        }
    }

    if ctx.poll_attempts >= config.max_attempts {
        return Err(EngineError::NotStabilized {
            attempts: ctx.poll_attempts,
            last_observed: Some(Box::new(observed)),
        });
    }
    Ok(PollOutcome::Pending {
        last_status: status,
    })
}

/// Poll until a target state is reached, blocking in process between polls.
///
/// Returns the settled document, or `None` when waiting for a delete to
/// drain. Suitable for hosts that tolerate long-lived synchronous calls;
/// other hosts drive [`poll_once`] themselves and persist the context
/// between invocations.
pub async fn stabilize<A: ServiceAdapter + ?Sized>(
    adapter: &A,
    desired: Option<&StateDocument>,
    target: StabilizeTarget<'_>,
    failure_states: &[&str],
    config: &StabilizeConfig,
    ctx: &mut OperationContext,
    on_progress: &Option<ProgressCallback>,
) -> Result<Option<ObservedState>> {
    emit(
        on_progress,
        ProgressEvent::Started {
            kind: adapter.descriptor().kind.to_string(),
            identity: ctx.identity.clone(),
        },
    );

    loop {
        match poll_once(adapter, desired, target, failure_states, config, ctx).await {
            Ok(PollOutcome::Ready(observed)) => {
                emit(
                    on_progress,
                    ProgressEvent::Stabilized {
                        identity: ctx.identity.clone(),
                        status: observed.status.clone().unwrap_or_default(),
                    },
                );
                return Ok(Some(observed));
            }
            Ok(PollOutcome::Gone) => {
                emit(
                    on_progress,
                    ProgressEvent::Stabilized {
                        identity: ctx.identity.clone(),
                        status: "deleted".to_string(),
                    },
                );
                return Ok(None);
            }
            Ok(PollOutcome::Pending { last_status }) => {
                emit(
                    on_progress,
                    ProgressEvent::Polling {
                        identity: ctx.identity.clone(),
                        status: last_status.unwrap_or_else(|| "unknown".to_string()),
                        attempt: ctx.poll_attempts,
                    },
                );
                tokio::time::sleep(config.interval).await;
            }
            Err(err) => {
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        identity: ctx.identity.clone(),
                        error: err.to_string(),
                    },
                );
                return Err(err);
            }
        }
    }
}
