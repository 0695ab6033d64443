//! Cluster resource kind
//!
//! The full-featured kind: clusters pass through transient states on every
//! mutation, support an in-place rename, and reconcile tags as a second
//! update sub-step after the primary modification settles.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::client::Client;
use super::tags::diff_tags;
use crate::adapter::{
    RemoteError, RemoteOperation, RemoteRequest, RemoteResponse, ServiceAdapter, UpdateStep,
};
use crate::descriptor::ResourceDescriptor;
use crate::document::{ListPage, ObservedState, StateDocument};
use crate::error::{ErrorKind, Result};

/// Static metadata for the cluster kind.
pub const CLUSTER: ResourceDescriptor = ResourceDescriptor {
    kind: "cluster",
    identity_field: "cluster_name",
    rename_field: Some("new_cluster_name"),
    required_fields: &["cluster_name", "node_type"],
    immutable_fields: &["engine", "subnet_group"],
    success_states: &["available"],
    failure_states: &["failed", "incompatible-network"],
    max_identity_len: 63,
};

/// Service adapter for clusters.
#[derive(Debug, Clone)]
pub struct ClusterAdapter {
    client: Client,
}

impl ClusterAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceAdapter for ClusterAdapter {
    fn descriptor(&self) -> &ResourceDescriptor {
        &CLUSTER
    }

    fn build_create(&self, desired: &StateDocument) -> Result<RemoteRequest> {
        let mut payload = desired.as_map().clone();
        // A rename makes no sense on create; the control plane rejects it.
        payload.remove("new_cluster_name");
        Ok(RemoteRequest::new(
            RemoteOperation::Create,
            "clusters",
            Value::Object(payload),
        ))
    }

    fn build_read(&self, identity: &str) -> RemoteRequest {
        RemoteRequest::new(
            RemoteOperation::Read,
            format!("clusters/{identity}"),
            Value::Null,
        )
    }

    fn build_update(
        &self,
        desired: &StateDocument,
        observed: &ObservedState,
    ) -> Result<Vec<UpdateStep>> {
        let current = CLUSTER
            .identity(&observed.document)
            .or_else(|| CLUSTER.identity(desired))
            .unwrap_or_default()
            .to_string();
        // The tags sub-step runs after the primary step settles, so a
        // pending rename has completed by then and the new name addresses
        // the resource.
        let final_identity = CLUSTER
            .pending_rename(desired)
            .unwrap_or(current.as_str())
            .to_string();

        let mut changes = Map::new();
        for (field, value) in desired.fields() {
            if field == CLUSTER.identity_field || field == "tags" {
                continue;
            }
            if field == "new_cluster_name" {
                if *value != Value::String(current.clone()) {
                    changes.insert(field.clone(), value.clone());
                }
                continue;
            }
            if observed.document.get(field) != Some(value) {
                changes.insert(field.clone(), value.clone());
            }
        }

        let mut steps = Vec::new();
        if !changes.is_empty() {
            steps.push(UpdateStep {
                label: "cluster",
                request: RemoteRequest::new(
                    RemoteOperation::Update,
                    format!("clusters/{current}"),
                    Value::Object(changes),
                ),
                stabilize: true,
            });
        }
        if let Some(diff) = diff_tags(desired.get("tags"), observed.document.get("tags")) {
            steps.push(UpdateStep {
                label: "tags",
                request: RemoteRequest::new(
                    RemoteOperation::Update,
                    format!("clusters/{final_identity}/tags"),
                    diff,
                ),
                stabilize: false,
            });
        }
        Ok(steps)
    }

    fn build_delete(&self, identity: &str) -> RemoteRequest {
        RemoteRequest::new(
            RemoteOperation::Delete,
            format!("clusters/{identity}"),
            Value::Null,
        )
    }

    fn build_list(&self, cursor: Option<&str>) -> RemoteRequest {
        let payload = match cursor {
            Some(cursor) => serde_json::json!({ "cursor": cursor }),
            None => Value::Null,
        };
        RemoteRequest::new(RemoteOperation::List, "clusters", payload)
    }

    async fn invoke(
        &self,
        request: RemoteRequest,
    ) -> std::result::Result<RemoteResponse, RemoteError> {
        self.client.dispatch(request).await
    }

    fn parse(&self, response: RemoteResponse) -> std::result::Result<ObservedState, RemoteError> {
        match response.payload.get("cluster") {
            Some(Value::Object(fields)) if !fields.is_empty() => Ok(
                ObservedState::from_document(StateDocument::from(fields.clone())),
            ),
            // Zero records is not-found, never an empty success.
            _ => Err(RemoteError::new(
                "ClusterNotFound",
                "read returned no cluster records",
            )),
        }
    }

    fn parse_list(&self, response: RemoteResponse) -> std::result::Result<ListPage, RemoteError> {
        let resources = response
            .payload
            .get("clusters")
            .and_then(Value::as_array)
            .map(|clusters| {
                clusters
                    .iter()
                    .filter_map(|c| c.get("cluster_name").and_then(Value::as_str))
                    .map(|name| {
                        let mut doc = StateDocument::new();
                        doc.set("cluster_name", Value::String(name.to_string()));
                        doc
                    })
                    .collect()
            })
            .unwrap_or_default();
        let next_cursor = response
            .payload
            .get("nextCursor")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(ListPage {
            resources,
            next_cursor,
        })
    }

    fn classify(&self, error: &RemoteError) -> ErrorKind {
        if let Some(code) = error.code.as_deref() {
            return match code {
                "ClusterNotFound" | "ResourceNotFound" => ErrorKind::NotFound,
                "ClusterAlreadyExists" => ErrorKind::AlreadyExists,
                "InvalidParameterValue" | "InvalidParameterCombination" | "ValidationError" => {
                    ErrorKind::InvalidRequest
                }
                "InvalidClusterState" | "ConflictingOperation" => ErrorKind::Conflict,
                "ClusterLimitExceeded" | "LimitExceeded" => ErrorKind::ServiceLimitExceeded,
                "Throttling" | "TooManyRequests" => ErrorKind::Throttled,
                "AccessDenied" | "InvalidApiKey" | "ExpiredApiKey" => {
                    ErrorKind::InvalidCredentials
                }
                "ServiceUnavailable" | "InternalError" => ErrorKind::GeneralServiceFailure,
                _ => ErrorKind::Unclassified,
            };
        }
        super::classify_http(error)
    }
}
