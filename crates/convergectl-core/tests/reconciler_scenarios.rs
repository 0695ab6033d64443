//! End-to-end reconciler scenarios against a scripted in-memory adapter.
//!
//! The scripted adapter pops pre-programmed invoke results per operation
//! class and records every call, so read/mutation counts can be asserted
//! exactly.

use std::collections::VecDeque;
use std::sync::Mutex;

use pretty_assertions::{assert_eq, assert_ne};
use serde_json::{Value, json};

use convergectl_core::adapter::{
    RemoteError, RemoteOperation, RemoteRequest, RemoteResponse, ServiceAdapter, UpdateStep,
};
use convergectl_core::warehouse::diff_tags;
use convergectl_core::{
    ErrorKind, ListPage, ObservedState, OperationContext, Outcome, Reconciler, ReportStatus,
    ResourceDescriptor, Result, StabilizeConfig, StateDocument,
};

const WIDGET: ResourceDescriptor = ResourceDescriptor {
    kind: "widget",
    identity_field: "widget_name",
    rename_field: Some("new_widget_name"),
    required_fields: &["widget_name", "size"],
    immutable_fields: &["region"],
    success_states: &["available"],
    failure_states: &["failed"],
    max_identity_len: 63,
};

const LABEL: ResourceDescriptor = ResourceDescriptor {
    kind: "label",
    identity_field: "label_name",
    rename_field: None,
    required_fields: &["label_name"],
    immutable_fields: &[],
    success_states: &[],
    failure_states: &[],
    max_identity_len: 255,
};

type InvokeResult = std::result::Result<RemoteResponse, RemoteError>;

/// Adapter scripted with per-class response queues.
struct ScriptedAdapter {
    descriptor: &'static ResourceDescriptor,
    reads: Mutex<VecDeque<InvokeResult>>,
    mutations: Mutex<VecDeque<InvokeResult>>,
    lists: Mutex<VecDeque<InvokeResult>>,
    read_log: Mutex<Vec<String>>,
    mutation_log: Mutex<Vec<RemoteRequest>>,
}

impl ScriptedAdapter {
    fn new(descriptor: &'static ResourceDescriptor) -> Self {
        Self {
            descriptor,
            reads: Mutex::new(VecDeque::new()),
            mutations: Mutex::new(VecDeque::new()),
            lists: Mutex::new(VecDeque::new()),
            read_log: Mutex::new(Vec::new()),
            mutation_log: Mutex::new(Vec::new()),
        }
    }

    fn script_reads(self, results: Vec<InvokeResult>) -> Self {
        *self.reads.lock().unwrap() = results.into();
        self
    }

    fn script_mutations(self, results: Vec<InvokeResult>) -> Self {
        *self.mutations.lock().unwrap() = results.into();
        self
    }

    fn script_lists(self, results: Vec<InvokeResult>) -> Self {
        *self.lists.lock().unwrap() = results.into();
        self
    }

    fn collection(&self) -> String {
        format!("{}s", self.descriptor.kind)
    }

    fn read_count(adapter: &Reconciler<ScriptedAdapter>) -> usize {
        adapter.adapter().read_log.lock().unwrap().len()
    }

    fn mutation_count(adapter: &Reconciler<ScriptedAdapter>) -> usize {
        adapter.adapter().mutation_log.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ServiceAdapter for ScriptedAdapter {
    fn descriptor(&self) -> &ResourceDescriptor {
        self.descriptor
    }

    fn build_create(&self, desired: &StateDocument) -> Result<RemoteRequest> {
        let mut payload = desired.as_map().clone();
        if let Some(rename) = self.descriptor.rename_field {
            payload.remove(rename);
        }
        Ok(RemoteRequest::new(
            RemoteOperation::Create,
            self.collection(),
            Value::Object(payload),
        ))
    }

    fn build_read(&self, identity: &str) -> RemoteRequest {
        RemoteRequest::new(
            RemoteOperation::Read,
            format!("{}/{identity}", self.collection()),
            Value::Null,
        )
    }

    fn build_update(
        &self,
        desired: &StateDocument,
        observed: &ObservedState,
    ) -> Result<Vec<UpdateStep>> {
        let current = self
            .descriptor
            .identity(&observed.document)
            .or_else(|| self.descriptor.identity(desired))
            .unwrap_or_default()
            .to_string();
        let final_identity = self
            .descriptor
            .pending_rename(desired)
            .unwrap_or(current.as_str())
            .to_string();

        let mut changes = serde_json::Map::new();
        for (field, value) in desired.fields() {
            if field == self.descriptor.identity_field || field == "tags" {
                continue;
            }
            if Some(field.as_str()) == self.descriptor.rename_field {
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
                label: "primary",
                request: RemoteRequest::new(
                    RemoteOperation::Update,
                    format!("{}/{current}", self.collection()),
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
                    format!("{}/{final_identity}/tags", self.collection()),
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
            format!("{}/{identity}", self.collection()),
            Value::Null,
        )
    }

    fn build_list(&self, cursor: Option<&str>) -> RemoteRequest {
        let payload = match cursor {
            Some(cursor) => json!({ "cursor": cursor }),
            None => Value::Null,
        };
        RemoteRequest::new(RemoteOperation::List, self.collection(), payload)
    }

    async fn invoke(&self, request: RemoteRequest) -> InvokeResult {
        match request.operation {
            RemoteOperation::Read => {
                self.read_log.lock().unwrap().push(request.target.clone());
                self.reads
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("unexpected read invocation")
            }
            RemoteOperation::List => self
                .lists
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected list invocation"),
            _ => {
                self.mutation_log.lock().unwrap().push(request.clone());
                self.mutations
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("unexpected mutation invocation")
            }
        }
    }

    fn parse(&self, response: RemoteResponse) -> std::result::Result<ObservedState, RemoteError> {
        match response.payload.get(self.descriptor.kind) {
            Some(Value::Object(fields)) if !fields.is_empty() => Ok(
                ObservedState::from_document(StateDocument::from(fields.clone())),
            ),
            _ => Err(RemoteError::new("NotFound", "read returned no records")),
        }
    }

    fn parse_list(&self, response: RemoteResponse) -> std::result::Result<ListPage, RemoteError> {
        let identity_field = self.descriptor.identity_field;
        let resources = response
            .payload
            .get(self.collection())
            .and_then(Value::as_array)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| r.get(identity_field).and_then(Value::as_str))
                    .map(|name| {
                        let mut doc = StateDocument::new();
                        doc.set(identity_field, Value::String(name.to_string()));
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
        match error.code.as_deref() {
            Some("NotFound") => ErrorKind::NotFound,
            Some("AlreadyExists") => ErrorKind::AlreadyExists,
            Some("Invalid") => ErrorKind::InvalidRequest,
            Some("Conflict") => ErrorKind::Conflict,
            Some("Throttling") => ErrorKind::Throttled,
            _ => ErrorKind::Unclassified,
        }
    }
}

fn doc(value: Value) -> StateDocument {
    serde_json::from_value(value).unwrap()
}

fn widget(name: &str, status: &str) -> InvokeResult {
    Ok(RemoteResponse::new(json!({
        "widget": {"widget_name": name, "size": 1, "status": status}
    })))
}

fn not_found() -> InvokeResult {
    Err(RemoteError::new("NotFound", "no such record"))
}

fn accepted() -> InvokeResult {
    Ok(RemoteResponse::new(Value::Null))
}

fn reconciler(adapter: ScriptedAdapter, max_attempts: u32) -> Reconciler<ScriptedAdapter> {
    Reconciler::with_config(adapter, StabilizeConfig::immediate(max_attempts))
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_stabilizes_and_reports_final_state() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![accepted()])
        .script_reads(vec![
            widget("w1", "creating"),
            widget("w1", "creating"),
            widget("w1", "available"),
        ]);
    let rec = reconciler(adapter, 10);

    let outcome = rec
        .create(&doc(json!({"widget_name": "w1", "size": 1})), None)
        .await;

    let report = outcome.report();
    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.resource.as_ref().unwrap()["status"], json!("available"));
    // Exactly three reads: two transient polls plus the confirming one.
    assert_eq!(ScriptedAdapter::read_count(&rec), 3);
    assert_eq!(ScriptedAdapter::mutation_count(&rec), 1);
}

#[tokio::test]
async fn create_treats_already_exists_as_success() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![Err(RemoteError::new("AlreadyExists", "duplicate name"))])
        .script_reads(vec![widget("w1", "available")]);
    let rec = reconciler(adapter, 10);

    let outcome = rec
        .create(&doc(json!({"widget_name": "w1", "size": 1})), None)
        .await;

    assert!(outcome.is_success());
    assert_eq!(ScriptedAdapter::read_count(&rec), 1);
}

#[tokio::test]
async fn create_with_missing_required_fields_never_calls_remote() {
    let adapter = ScriptedAdapter::new(&WIDGET);
    let rec = reconciler(adapter, 10);

    let outcome = rec.create(&doc(json!({"widget_name": "w1"})), None).await;

    let report = outcome.report();
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.error_code.as_deref(), Some("InvalidRequest"));
    assert!(report.message.unwrap().contains("size"));
    assert_eq!(ScriptedAdapter::mutation_count(&rec), 0);
    assert_eq!(ScriptedAdapter::read_count(&rec), 0);
}

#[tokio::test]
async fn create_of_kind_without_transient_state_skips_stabilization() {
    let adapter = ScriptedAdapter::new(&LABEL)
        .script_mutations(vec![accepted()])
        .script_reads(vec![Ok(RemoteResponse::new(
            json!({"label": {"label_name": "team"}}),
        ))]);
    let rec = reconciler(adapter, 10);

    let outcome = rec.create(&doc(json!({"label_name": "team"})), None).await;

    assert!(outcome.is_success());
    // One read only: the final read-back. No polling for flat kinds.
    assert_eq!(ScriptedAdapter::read_count(&rec), 1);
}

// ---------------------------------------------------------------------------
// Stabilizer termination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stabilization_budget_is_exact() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![accepted()])
        .script_reads(vec![
            widget("w1", "creating"),
            widget("w1", "creating"),
            widget("w1", "creating"),
            widget("w1", "creating"),
        ]);
    let rec = reconciler(adapter, 4);

    let outcome = rec
        .create(&doc(json!({"widget_name": "w1", "size": 1})), None)
        .await;

    let report = outcome.report();
    assert_eq!(report.error_code.as_deref(), Some("NotStabilized"));
    // The budget bounds reads exactly: no more, no fewer.
    assert_eq!(ScriptedAdapter::read_count(&rec), 4);
    // The last observed state is reported so callers can tell "stuck
    // partway" from "never started".
    assert_eq!(
        report.last_observed.as_ref().unwrap()["status"],
        json!("creating")
    );
}

#[tokio::test]
async fn terminal_failure_state_stops_polling() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![accepted()])
        .script_reads(vec![widget("w1", "creating"), widget("w1", "failed")]);
    let rec = reconciler(adapter, 10);

    let outcome = rec
        .create(&doc(json!({"widget_name": "w1", "size": 1})), None)
        .await;

    let report = outcome.report();
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.error_code.as_deref(), Some("GeneralServiceFailure"));
    assert_eq!(report.identity.as_deref(), Some("w1"));
    assert_eq!(ScriptedAdapter::read_count(&rec), 2);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

fn observed_widget(value: Value) -> ObservedState {
    ObservedState::from_document(doc(value))
}

#[tokio::test]
async fn compound_update_applies_primary_then_tags() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![accepted(), accepted()])
        .script_reads(vec![
            widget("w1", "modifying"),
            widget("w1", "available"),
            widget("w1", "available"),
        ]);
    let rec = reconciler(adapter, 10);

    let desired = doc(json!({
        "widget_name": "w1",
        "size": 2,
        "tags": {"team": "data"}
    }));
    let prior = observed_widget(json!({
        "widget_name": "w1",
        "size": 1,
        "status": "available"
    }));

    let outcome = rec.update(&desired, Some(prior), None).await;

    assert!(outcome.is_success());
    let mutations = rec.adapter().mutation_log.lock().unwrap().clone();
    assert_eq!(mutations.len(), 2);
    assert_eq!(mutations[0].target, "widgets/w1");
    assert_eq!(mutations[0].payload, json!({"size": 2}));
    assert_eq!(mutations[1].target, "widgets/w1/tags");
    // Two stabilization polls plus one read-back after the tags mutation.
    assert_eq!(ScriptedAdapter::read_count(&rec), 3);
}

#[tokio::test]
async fn failed_primary_step_short_circuits_tag_reconciliation() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![Err(RemoteError::new("Conflict", "widget is resizing"))]);
    let rec = reconciler(adapter, 10);

    let desired = doc(json!({
        "widget_name": "w1",
        "size": 2,
        "tags": {"team": "data"}
    }));
    let prior = observed_widget(json!({
        "widget_name": "w1",
        "size": 1,
        "status": "available"
    }));

    let outcome = rec.update(&desired, Some(prior), None).await;

    let report = outcome.report();
    assert_eq!(report.error_code.as_deref(), Some("Conflict"));
    // The tags sub-step never ran and nothing was rolled back.
    assert_eq!(ScriptedAdapter::mutation_count(&rec), 1);
    assert_eq!(ScriptedAdapter::read_count(&rec), 0);
}

#[tokio::test]
async fn update_with_nothing_to_apply_just_reads_back() {
    let adapter =
        ScriptedAdapter::new(&WIDGET).script_reads(vec![widget("w1", "available")]);
    let rec = reconciler(adapter, 10);

    let desired = doc(json!({"widget_name": "w1", "size": 1}));
    let prior = observed_widget(json!({
        "widget_name": "w1",
        "size": 1,
        "status": "available"
    }));

    let outcome = rec.update(&desired, Some(prior), None).await;

    assert!(outcome.is_success());
    assert_eq!(ScriptedAdapter::mutation_count(&rec), 0);
    assert_eq!(ScriptedAdapter::read_count(&rec), 1);
}

#[tokio::test]
async fn rename_is_retried_by_new_identity_while_stabilizing() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![accepted()])
        .script_reads(vec![not_found(), widget("w2", "available")]);
    let rec = reconciler(adapter, 10);

    let desired = doc(json!({
        "widget_name": "w1",
        "new_widget_name": "w2",
        "size": 1
    }));
    let prior = observed_widget(json!({
        "widget_name": "w1",
        "size": 1,
        "status": "available"
    }));

    let outcome = rec.update(&desired, Some(prior), None).await;

    let report = outcome.report();
    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(
        report.resource.as_ref().unwrap()["widget_name"],
        json!("w2")
    );
    let reads = rec.adapter().read_log.lock().unwrap().clone();
    assert_eq!(reads, vec!["widgets/w1".to_string(), "widgets/w2".to_string()]);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_of_absent_resource_is_idempotent_success() {
    let adapter = ScriptedAdapter::new(&WIDGET).script_mutations(vec![not_found()]);
    let rec = reconciler(adapter, 10);

    let outcome = rec.delete("w1", None).await;

    let report = outcome.report();
    assert_eq!(report.status, ReportStatus::Success);
    assert!(report.resource.is_none());
    // Zero stabilizer polls for an already-absent resource.
    assert_eq!(ScriptedAdapter::read_count(&rec), 0);
}

#[tokio::test]
async fn delete_drains_until_the_resource_is_gone() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![accepted()])
        .script_reads(vec![widget("w1", "deleting"), not_found()]);
    let rec = reconciler(adapter, 10);

    let outcome = rec.delete("w1", None).await;

    assert!(outcome.is_success());
    assert_eq!(ScriptedAdapter::read_count(&rec), 2);
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_pages_terminate_when_cursor_is_absent() {
    let adapter = ScriptedAdapter::new(&WIDGET).script_lists(vec![
        Ok(RemoteResponse::new(json!({
            "widgets": [{"widget_name": "w1"}, {"widget_name": "w2"}],
            "nextCursor": "m1"
        }))),
        Ok(RemoteResponse::new(json!({
            "widgets": [{"widget_name": "w3"}]
        }))),
    ]);
    let rec = reconciler(adapter, 10);

    let page1 = rec.list(None).await.unwrap();
    assert_eq!(page1.resources.len(), 2);
    assert_eq!(page1.next_cursor.as_deref(), Some("m1"));

    let page2 = rec.list(page1.next_cursor.as_deref()).await.unwrap();
    assert_eq!(page2.resources.len(), 1);
    assert_eq!(page2.resources[0].get_str("widget_name"), Some("w3"));
    assert!(page2.next_cursor.is_none());

    assert_ne!(page1.resources, page2.resources);
}

// ---------------------------------------------------------------------------
// Return-and-resume
// ---------------------------------------------------------------------------

#[tokio::test]
async fn detached_create_suspends_and_resumes_to_completion() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![accepted()])
        .script_reads(vec![widget("w1", "creating"), widget("w1", "available")]);
    let rec = reconciler(adapter, 10);
    let desired = doc(json!({"widget_name": "w1", "size": 1}));

    // Applying happens immediately; the engine suspends at the poll delay.
    let outcome = rec.begin_create(&desired).await;
    let Outcome::InProgress { context, .. } = outcome else {
        panic!("expected a suspended create");
    };
    assert!(context.applied);
    assert_eq!(ScriptedAdapter::read_count(&rec), 0);

    // Round-trip the context the way a host would persist it.
    let wire = serde_json::to_value(&context).unwrap();
    let restored = OperationContext::resume(wire, RemoteOperation::Create).unwrap();

    let outcome = rec.resume(Some(&desired), restored).await;
    let Outcome::InProgress { context, .. } = outcome else {
        panic!("expected the create to still be in flight");
    };
    assert_eq!(context.poll_attempts, 1);

    let outcome = rec.resume(Some(&desired), context).await;
    let report = outcome.report();
    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.resource.as_ref().unwrap()["status"], json!("available"));
    // No extra mutation was issued across the redrives.
    assert_eq!(ScriptedAdapter::mutation_count(&rec), 1);
}

#[tokio::test]
async fn detached_delete_suspends_then_confirms_gone() {
    let adapter = ScriptedAdapter::new(&WIDGET)
        .script_mutations(vec![accepted()])
        .script_reads(vec![not_found()]);
    let rec = reconciler(adapter, 10);

    let outcome = rec.begin_delete("w1").await;
    let Outcome::InProgress { context, .. } = outcome else {
        panic!("expected a suspended delete");
    };

    let outcome = rec.resume(None, context).await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn resume_with_exhausted_budget_fails_without_reading() {
    let adapter = ScriptedAdapter::new(&WIDGET);
    let rec = reconciler(adapter, 2);

    let mut context = OperationContext::start(RemoteOperation::Create, "w1");
    context.applied = true;
    context.poll_attempts = 2;

    let outcome = rec
        .resume(Some(&doc(json!({"widget_name": "w1", "size": 1}))), context)
        .await;

    let report = outcome.report();
    assert_eq!(report.error_code.as_deref(), Some("NotStabilized"));
    assert_eq!(ScriptedAdapter::read_count(&rec), 0);
}
