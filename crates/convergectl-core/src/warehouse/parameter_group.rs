//! Parameter group resource kind
//!
//! Parameter groups have no observable transient state: mutations take
//! effect synchronously, so the reconciler skips stabilization entirely and
//! goes straight to the final read-back.

use async_trait::async_trait;
use serde_json::Value;

use super::client::Client;
use super::tags::diff_tags;
use crate::adapter::{
    RemoteError, RemoteOperation, RemoteRequest, RemoteResponse, ServiceAdapter, UpdateStep,
};
use crate::descriptor::ResourceDescriptor;
use crate::document::{ListPage, ObservedState, StateDocument};
use crate::error::{ErrorKind, Result};

/// Static metadata for the parameter group kind.
pub const PARAMETER_GROUP: ResourceDescriptor = ResourceDescriptor {
    kind: "parameter-group",
    identity_field: "parameter_group_name",
    rename_field: None,
    required_fields: &["parameter_group_name", "family"],
    immutable_fields: &["family"],
    success_states: &[],
    failure_states: &[],
    max_identity_len: 255,
};

/// Service adapter for parameter groups.
#[derive(Debug, Clone)]
pub struct ParameterGroupAdapter {
    client: Client,
}

impl ParameterGroupAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceAdapter for ParameterGroupAdapter {
    fn descriptor(&self) -> &ResourceDescriptor {
        &PARAMETER_GROUP
    }

    fn build_create(&self, desired: &StateDocument) -> Result<RemoteRequest> {
        Ok(RemoteRequest::new(
            RemoteOperation::Create,
            "parameter-groups",
            desired.clone().into_value(),
        ))
    }

    fn build_read(&self, identity: &str) -> RemoteRequest {
        RemoteRequest::new(
            RemoteOperation::Read,
            format!("parameter-groups/{identity}"),
            Value::Null,
        )
    }

    fn build_update(
        &self,
        desired: &StateDocument,
        observed: &ObservedState,
    ) -> Result<Vec<UpdateStep>> {
        let identity = PARAMETER_GROUP
            .identity(&observed.document)
            .or_else(|| PARAMETER_GROUP.identity(desired))
            .unwrap_or_default()
            .to_string();

        let mut steps = Vec::new();
        if let Some(parameters) = desired.get("parameters")
            && observed.document.get("parameters") != Some(parameters)
        {
            steps.push(UpdateStep {
                label: "parameters",
                request: RemoteRequest::new(
                    RemoteOperation::Update,
                    format!("parameter-groups/{identity}"),
                    serde_json::json!({ "parameters": parameters }),
                ),
                stabilize: false,
            });
        }
        if let Some(diff) = diff_tags(desired.get("tags"), observed.document.get("tags")) {
            steps.push(UpdateStep {
                label: "tags",
                request: RemoteRequest::new(
                    RemoteOperation::Update,
                    format!("parameter-groups/{identity}/tags"),
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
            format!("parameter-groups/{identity}"),
            Value::Null,
        )
    }

    fn build_list(&self, cursor: Option<&str>) -> RemoteRequest {
        let payload = match cursor {
            Some(cursor) => serde_json::json!({ "cursor": cursor }),
            None => Value::Null,
        };
        RemoteRequest::new(RemoteOperation::List, "parameter-groups", payload)
    }

    async fn invoke(
        &self,
        request: RemoteRequest,
    ) -> std::result::Result<RemoteResponse, RemoteError> {
        self.client.dispatch(request).await
    }

    fn parse(&self, response: RemoteResponse) -> std::result::Result<ObservedState, RemoteError> {
        match response.payload.get("parameter_group") {
            Some(Value::Object(fields)) if !fields.is_empty() => Ok(
                ObservedState::from_document(StateDocument::from(fields.clone())),
            ),
            _ => Err(RemoteError::new(
                "ParameterGroupNotFound",
                "read returned no parameter group records",
            )),
        }
    }

    fn parse_list(&self, response: RemoteResponse) -> std::result::Result<ListPage, RemoteError> {
        let resources = response
            .payload
            .get("parameter_groups")
            .and_then(Value::as_array)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(|g| g.get("parameter_group_name").and_then(Value::as_str))
                    .map(|name| {
                        let mut doc = StateDocument::new();
                        doc.set("parameter_group_name", Value::String(name.to_string()));
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
                "ParameterGroupNotFound" | "ResourceNotFound" => ErrorKind::NotFound,
                "ParameterGroupAlreadyExists" => ErrorKind::AlreadyExists,
                "InvalidParameterValue" | "InvalidParameterGroupFamily" | "ValidationError" => {
                    ErrorKind::InvalidRequest
                }
                "ParameterGroupInUse" => ErrorKind::Conflict,
                "ParameterGroupLimitExceeded" | "LimitExceeded" => {
                    ErrorKind::ServiceLimitExceeded
                }
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter() -> ParameterGroupAdapter {
        let client = Client::builder()
            .base_url("https://wh.example.com/v1")
            .api_key("test-key")
            .build()
            .unwrap();
        ParameterGroupAdapter::new(client)
    }

    fn doc(value: Value) -> StateDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_kind_has_no_transient_state() {
        assert!(!PARAMETER_GROUP.has_transient_state());
    }

    #[test]
    fn test_build_update_parameters_and_tags_steps() {
        let desired = doc(json!({
            "parameter_group_name": "tuned",
            "family": "wh-2",
            "parameters": {"wlm_query_slots": "8"},
            "tags": {"team": "data"}
        }));
        let observed = ObservedState::from_document(doc(json!({
            "parameter_group_name": "tuned",
            "family": "wh-2",
            "parameters": {"wlm_query_slots": "4"}
        })));

        let steps = adapter().build_update(&desired, &observed).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].label, "parameters");
        assert!(!steps[0].stabilize);
        assert_eq!(steps[1].label, "tags");
        assert_eq!(steps[1].request.target, "parameter-groups/tuned/tags");
    }

    #[test]
    fn test_build_update_skips_unchanged_parameters() {
        let desired = doc(json!({
            "parameter_group_name": "tuned",
            "parameters": {"wlm_query_slots": "4"}
        }));
        let observed = ObservedState::from_document(doc(json!({
            "parameter_group_name": "tuned",
            "parameters": {"wlm_query_slots": "4"}
        })));
        assert!(adapter().build_update(&desired, &observed).unwrap().is_empty());
    }

    #[test]
    fn test_parse_empty_read_is_not_found() {
        let err = adapter()
            .parse(RemoteResponse::new(json!({"parameter_group": {}})))
            .unwrap_err();
        assert_eq!(err.code.as_deref(), Some("ParameterGroupNotFound"));
    }

    #[test]
    fn test_classify_in_use_is_conflict() {
        let err = RemoteError::new("ParameterGroupInUse", "group attached to a cluster");
        assert_eq!(adapter().classify(&err), ErrorKind::Conflict);
    }
}
