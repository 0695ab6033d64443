//! Progress reporting for stabilization
//!
//! Stabilization can run for minutes, so the engine emits progress events
//! through an optional callback. A CLI host can drive a spinner from these;
//! a headless host can ignore them.

/// Progress events emitted while a resource stabilizes.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Stabilization has begun for a resource.
    Started { kind: String, identity: String },
    /// One polling read completed with the given status.
    Polling {
        identity: String,
        status: String,
        attempt: u32,
    },
    /// The resource reached a target state (or was confirmed gone).
    Stabilized { identity: String, status: String },
    /// Stabilization ended in failure.
    Failed { identity: String, error: String },
}

/// Callback type for progress updates.
///
/// A CLI can use this to update spinners; headless hosts typically pass
/// `None`.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Helper to emit progress events.
pub(crate) fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
