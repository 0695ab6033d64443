//! Service adapter contract
//!
//! One adapter exists per resource kind. It translates state documents into
//! remote requests, performs the network call, parses responses back into
//! observed state, and classifies every remote error into the engine's
//! taxonomy. The reconciler and stabilizer are generic over this trait and
//! never see vendor shapes directly.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::ResourceDescriptor;
use crate::document::{ListPage, ObservedState, StateDocument};
use crate::error::{EngineError, ErrorKind, Result};

/// The verb a remote request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteOperation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl std::fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemoteOperation::Create => "create",
            RemoteOperation::Read => "read",
            RemoteOperation::Update => "update",
            RemoteOperation::Delete => "delete",
            RemoteOperation::List => "list",
        };
        f.write_str(s)
    }
}

/// A fully built request for the remote service.
///
/// `target` is the adapter's own addressing (typically a REST path); the
/// engine treats it as opaque and only logs it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub operation: RemoteOperation,
    pub target: String,
    pub payload: Value,
}

impl RemoteRequest {
    pub fn new(operation: RemoteOperation, target: impl Into<String>, payload: Value) -> Self {
        Self {
            operation,
            target: target.into(),
            payload,
        }
    }
}

/// Raw response from the remote service.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub payload: Value,
}

impl RemoteResponse {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }
}

/// An error condition reported by the remote service or the transport.
///
/// Carries the vendor's error code and HTTP status when known; the adapter's
/// [`ServiceAdapter::classify`] turns this into an [`ErrorKind`].
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RemoteError {
    pub code: Option<String>,
    pub message: String,
    pub status: Option<u16>,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Transport-level failure with no vendor code attached.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            status: None,
        }
    }
}

/// One apply unit of a (possibly compound) update.
///
/// Steps run strictly in order; a failed step halts the chain and earlier
/// steps are not rolled back.
#[derive(Debug, Clone)]
pub struct UpdateStep {
    /// Short label recorded in the operation context, e.g. `cluster`, `tags`.
    pub label: &'static str,
    pub request: RemoteRequest,
    /// Whether this step leaves the resource in a transient state that must
    /// settle before the next step runs.
    pub stabilize: bool,
}

/// Per-kind translation and transport for one resource kind.
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    /// Static metadata for this kind.
    fn descriptor(&self) -> &ResourceDescriptor;

    fn build_create(&self, desired: &StateDocument) -> Result<RemoteRequest>;

    fn build_read(&self, identity: &str) -> RemoteRequest;

    /// Ordered apply steps for an update. An empty vec means the desired
    /// state already matches and there is nothing to apply.
    fn build_update(
        &self,
        desired: &StateDocument,
        observed: &ObservedState,
    ) -> Result<Vec<UpdateStep>>;

    fn build_delete(&self, identity: &str) -> RemoteRequest;

    fn build_list(&self, cursor: Option<&str>) -> RemoteRequest;

    /// Perform the network call.
    async fn invoke(&self, request: RemoteRequest) -> std::result::Result<RemoteResponse, RemoteError>;

    /// Parse a read response into observed state.
    ///
    /// A response with zero records must surface as a not-found error, never
    /// as an empty-but-successful document.
    fn parse(&self, response: RemoteResponse) -> std::result::Result<ObservedState, RemoteError>;

    /// Parse a list response into identity-only projections plus cursor.
    /// An empty page is a valid result here, unlike [`Self::parse`].
    fn parse_list(&self, response: RemoteResponse) -> std::result::Result<ListPage, RemoteError>;

    /// Total mapping from remote errors to the taxonomy.
    fn classify(&self, error: &RemoteError) -> ErrorKind;
}

/// Classify a remote error through the adapter, logging unclassified ones
/// with full vendor detail since they indicate an incomplete mapping.
pub(crate) fn classify_remote<A: ServiceAdapter + ?Sized>(
    adapter: &A,
    error: RemoteError,
    identity: Option<&str>,
) -> EngineError {
    let kind = adapter.classify(&error);
    if kind == ErrorKind::Unclassified {
        tracing::warn!(
            kind = adapter.descriptor().kind,
            code = ?error.code,
            http_status = ?error.status,
            message = %error.message,
            "unclassified remote error; classify mapping is incomplete"
        );
    }
    EngineError::remote(kind, error.message, identity)
}

/// Build, invoke and parse a read, classifying any failure.
pub(crate) async fn read_observed<A: ServiceAdapter + ?Sized>(
    adapter: &A,
    identity: &str,
) -> Result<ObservedState> {
    let request = adapter.build_read(identity);
    tracing::debug!(kind = adapter.descriptor().kind, identity, target = %request.target, "read");
    let response = adapter
        .invoke(request)
        .await
        .map_err(|e| classify_remote(adapter, e, Some(identity)))?;
    adapter
        .parse(response)
        .map_err(|e| classify_remote(adapter, e, Some(identity)))
}
