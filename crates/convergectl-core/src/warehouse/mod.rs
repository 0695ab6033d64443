//! Warehouse control-plane integration
//!
//! The REST client for the warehouse control-plane API plus the service
//! adapters for the resource kinds it manages. Each adapter owns the full
//! translation for its kind: request building, response parsing, and the
//! error-code classification table.

pub mod client;
pub mod cluster;
pub mod parameter_group;
pub mod tags;

pub use client::Client;
pub use cluster::{CLUSTER, ClusterAdapter};
pub use parameter_group::{PARAMETER_GROUP, ParameterGroupAdapter};
pub use tags::diff_tags;

use crate::adapter::RemoteError;
use crate::error::ErrorKind;

/// Fallback classification by HTTP status for errors without a vendor code.
pub(crate) fn classify_http(error: &RemoteError) -> ErrorKind {
    match error.status {
        Some(404) => ErrorKind::NotFound,
        Some(400) => ErrorKind::InvalidRequest,
        Some(401) | Some(403) => ErrorKind::InvalidCredentials,
        Some(409) => ErrorKind::Conflict,
        Some(429) => ErrorKind::Throttled,
        Some(status) if status >= 500 => ErrorKind::GeneralServiceFailure,
        Some(_) => ErrorKind::Unclassified,
        // Transport failures never reached the service.
        None => ErrorKind::GeneralServiceFailure,
    }
}
