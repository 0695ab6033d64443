//! The reconciliation state machine
//!
//! One reconciler drives one verb end to end: validate the desired
//! document, apply the remote mutation, wait for the resource to settle,
//! then read back the authoritative state. The reconciler is generic over a
//! [`ServiceAdapter`] and holds no state of its own between runs; per-kind
//! behavior comes entirely from the adapter and its descriptor.
//!
//! Two execution models are supported:
//!
//! - the blocking verbs ([`Reconciler::create`], [`Reconciler::update`],
//!   [`Reconciler::delete`]) sleep in process between polls, for hosts that
//!   tolerate long-lived calls;
//! - the `begin_*`/[`Reconciler::resume`] pairs return an
//!   [`Outcome::InProgress`] carrying the operation context at every poll
//!   delay, for hosts that redrive the engine at their own cadence.
//!
//! Once a mutation has been invoked it cannot be aborted from inside the
//! engine; a host that stops redriving simply leaves the resource at its
//! current remote state.

use crate::adapter::{
    RemoteOperation, RemoteRequest, RemoteResponse, ServiceAdapter, classify_remote, read_observed,
};
use crate::context::OperationContext;
use crate::document::{ListPage, ObservedState, StateDocument};
use crate::error::{EngineError, Result};
use crate::outcome::Outcome;
use crate::progress::ProgressCallback;
use crate::stabilizer::{PollOutcome, StabilizeConfig, StabilizeTarget, poll_once, stabilize};

/// Drives one resource kind's verbs against its service adapter.
///
/// Cheap to construct; hosts reconciling many identities in parallel create
/// one reconciler per in-flight operation and share nothing but the
/// adapter's underlying client.
pub struct Reconciler<A: ServiceAdapter> {
    adapter: A,
    config: StabilizeConfig,
}

impl<A: ServiceAdapter> Reconciler<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            config: StabilizeConfig::default(),
        }
    }

    pub fn with_config(adapter: A, config: StabilizeConfig) -> Self {
        Self { adapter, config }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Create the resource and block until it stabilizes.
    pub async fn create(
        &self,
        desired: &StateDocument,
        on_progress: Option<ProgressCallback>,
    ) -> Outcome {
        Outcome::from_result(self.run_create(desired, on_progress).await)
    }

    /// Fetch the current observed state.
    pub async fn read(&self, identity: &str) -> Outcome {
        Outcome::from_result(read_observed(&self.adapter, identity).await.map(Some))
    }

    /// Apply the desired changes and block until every sub-step settles.
    ///
    /// `prior` is the observed state to diff against; when absent a fresh
    /// read is taken first.
    pub async fn update(
        &self,
        desired: &StateDocument,
        prior: Option<ObservedState>,
        on_progress: Option<ProgressCallback>,
    ) -> Outcome {
        Outcome::from_result(self.run_update(desired, prior, on_progress).await)
    }

    /// Delete the resource and block until it is gone.
    pub async fn delete(&self, identity: &str, on_progress: Option<ProgressCallback>) -> Outcome {
        Outcome::from_result(self.run_delete(identity, on_progress).await)
    }

    /// Fetch one page of identity-only projections.
    pub async fn list(&self, cursor: Option<&str>) -> Result<ListPage> {
        let request = self.adapter.build_list(cursor);
        tracing::debug!(
            kind = self.adapter.descriptor().kind,
            target = %request.target,
            "list"
        );
        let response = self
            .adapter
            .invoke(request)
            .await
            .map_err(|e| classify_remote(&self.adapter, e, None))?;
        self.adapter
            .parse_list(response)
            .map_err(|e| classify_remote(&self.adapter, e, None))
    }

    /// Start a create without blocking: apply the mutation and suspend at
    /// the first poll delay.
    pub async fn begin_create(&self, desired: &StateDocument) -> Outcome {
        let descriptor = self.adapter.descriptor();
        if let Err(error) = self.validate_create(desired) {
            return Outcome::Failed { error };
        }
        // Identity presence is checked by validate_create.
        let identity = descriptor.identity(desired).unwrap_or_default().to_string();
        let mut ctx = OperationContext::start(RemoteOperation::Create, identity);

        if let Err(error) = self.apply_create(desired, &ctx.identity).await {
            return Outcome::Failed { error };
        }
        ctx.applied = true;

        if descriptor.has_transient_state() {
            return Outcome::InProgress {
                context: ctx,
                retry_after: self.config.interval,
            };
        }
        Outcome::from_result(read_observed(&self.adapter, &ctx.identity).await.map(Some))
    }

    /// Start an update without blocking.
    pub async fn begin_update(&self, desired: &StateDocument) -> Outcome {
        let descriptor = self.adapter.descriptor();
        let Some(identity) = descriptor.identity(desired) else {
            return Outcome::Failed {
                error: EngineError::Validation(format!(
                    "desired document is missing identity field '{}'",
                    descriptor.identity_field
                )),
            };
        };
        let ctx = OperationContext::start(RemoteOperation::Update, identity);
        self.advance_update(desired, ctx).await
    }

    /// Start a delete without blocking.
    pub async fn begin_delete(&self, identity: &str) -> Outcome {
        let descriptor = self.adapter.descriptor();
        let mut ctx = OperationContext::start(RemoteOperation::Delete, identity);

        match self.apply(self.adapter.build_delete(identity), identity).await {
            Ok(_) => {}
            Err(error) if error.is_not_found() => {
                tracing::info!(
                    kind = descriptor.kind,
                    identity,
                    "delete: resource already absent, idempotent success"
                );
                return Outcome::Succeeded { observed: None };
            }
            Err(error) => return Outcome::Failed { error },
        }
        ctx.applied = true;

        if descriptor.has_transient_state() {
            return Outcome::InProgress {
                context: ctx,
                retry_after: self.config.interval,
            };
        }
        Outcome::Succeeded { observed: None }
    }

    /// Redrive a suspended operation from its serialized context.
    ///
    /// Performs one bounded unit of work (at most one poll plus the next
    /// sub-step's apply) and either completes or suspends again. `desired`
    /// is required for create and update resumes; delete needs only the
    /// context.
    pub async fn resume(&self, desired: Option<&StateDocument>, ctx: OperationContext) -> Outcome {
        match ctx.verb {
            RemoteOperation::Create => {
                let Some(desired) = desired else {
                    return Outcome::Failed {
                        error: EngineError::Validation(
                            "resuming a create requires the desired document".to_string(),
                        ),
                    };
                };
                self.resume_create(desired, ctx).await
            }
            RemoteOperation::Update => {
                let Some(desired) = desired else {
                    return Outcome::Failed {
                        error: EngineError::Validation(
                            "resuming an update requires the desired document".to_string(),
                        ),
                    };
                };
                self.advance_update(desired, ctx).await
            }
            RemoteOperation::Delete => self.resume_delete(ctx).await,
            verb => Outcome::Failed {
                error: EngineError::Validation(format!("verb '{verb}' cannot be resumed")),
            },
        }
    }

    async fn run_create(
        &self,
        desired: &StateDocument,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Option<ObservedState>> {
        let descriptor = self.adapter.descriptor();
        self.validate_create(desired)?;
        let identity = descriptor.identity(desired).unwrap_or_default().to_string();
        let mut ctx = OperationContext::start(RemoteOperation::Create, identity);

        self.apply_create(desired, &ctx.identity).await?;
        ctx.applied = true;

        // The stabilizer's last read is already authoritative and fresh, so
        // the final read-back reuses it; kinds that skip stabilization get a
        // dedicated read instead.
        if descriptor.has_transient_state()
            && let Some(observed) = stabilize(
                &self.adapter,
                Some(desired),
                StabilizeTarget::States(descriptor.success_states),
                descriptor.failure_states,
                &self.config,
                &mut ctx,
                &on_progress,
            )
            .await?
        {
            return Ok(Some(observed));
        }
        let observed = read_observed(&self.adapter, &ctx.identity).await?;
        Ok(Some(observed))
    }

    async fn run_update(
        &self,
        desired: &StateDocument,
        prior: Option<ObservedState>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Option<ObservedState>> {
        let descriptor = self.adapter.descriptor();
        let identity = descriptor.identity(desired).ok_or_else(|| {
            EngineError::Validation(format!(
                "desired document is missing identity field '{}'",
                descriptor.identity_field
            ))
        })?;

        let observed = match prior {
            Some(observed) => observed,
            None => read_observed(&self.adapter, identity).await?,
        };
        self.validate_update(desired, &observed)?;

        let steps = self.adapter.build_update(desired, &observed)?;
        let mut ctx = OperationContext::start(RemoteOperation::Update, identity);

        let mut last_settled: Option<ObservedState> = None;
        for step in steps {
            self.apply(step.request, &ctx.identity).await?;
            ctx.applied = true;
            last_settled = None;
            if step.stabilize && descriptor.has_transient_state() {
                last_settled = stabilize(
                    &self.adapter,
                    Some(desired),
                    StabilizeTarget::States(descriptor.success_states),
                    descriptor.failure_states,
                    &self.config,
                    &mut ctx,
                    &on_progress,
                )
                .await?;
            }
            ctx.advance(step.label);
        }

        // Reuse the last stabilization read unless a later sub-step mutated
        // the resource after it.
        let observed = match last_settled {
            Some(observed) => observed,
            None => read_observed(&self.adapter, &ctx.identity).await?,
        };
        Ok(Some(observed))
    }

    async fn run_delete(
        &self,
        identity: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Option<ObservedState>> {
        let descriptor = self.adapter.descriptor();
        let mut ctx = OperationContext::start(RemoteOperation::Delete, identity);

        match self.apply(self.adapter.build_delete(identity), identity).await {
            Ok(_) => {}
            Err(error) if error.is_not_found() => {
                tracing::info!(
                    kind = descriptor.kind,
                    identity,
                    "delete: resource already absent, idempotent success"
                );
                return Ok(None);
            }
            Err(error) => return Err(error),
        }
        ctx.applied = true;

        if descriptor.has_transient_state() {
            stabilize(
                &self.adapter,
                None,
                StabilizeTarget::Gone,
                descriptor.failure_states,
                &self.config,
                &mut ctx,
                &on_progress,
            )
            .await?;
        }
        Ok(None)
    }

    async fn resume_create(&self, desired: &StateDocument, mut ctx: OperationContext) -> Outcome {
        let descriptor = self.adapter.descriptor();
        if !ctx.applied {
            // The context was handed out before the mutation landed; this
            // does not happen with contexts produced by begin_create.
            if let Err(error) = self.apply_create(desired, &ctx.identity).await {
                return Outcome::Failed { error };
            }
            ctx.applied = true;
        }

        match poll_once(
            &self.adapter,
            Some(desired),
            StabilizeTarget::States(descriptor.success_states),
            descriptor.failure_states,
            &self.config,
            &mut ctx,
        )
        .await
        {
            Ok(PollOutcome::Ready(observed)) => Outcome::Succeeded {
                observed: Some(observed),
            },
            Ok(PollOutcome::Gone) => {
                Outcome::from_result(read_observed(&self.adapter, &ctx.identity).await.map(Some))
            }
            Ok(PollOutcome::Pending { .. }) => Outcome::InProgress {
                context: ctx,
                retry_after: self.config.interval,
            },
            Err(error) => Outcome::Failed { error },
        }
    }

    async fn resume_delete(&self, mut ctx: OperationContext) -> Outcome {
        let descriptor = self.adapter.descriptor();
        if !descriptor.has_transient_state() {
            return Outcome::Succeeded { observed: None };
        }
        match poll_once(
            &self.adapter,
            None,
            StabilizeTarget::Gone,
            descriptor.failure_states,
            &self.config,
            &mut ctx,
        )
        .await
        {
            Ok(PollOutcome::Gone) => Outcome::Succeeded { observed: None },
            Ok(PollOutcome::Ready(_)) | Ok(PollOutcome::Pending { .. }) => Outcome::InProgress {
                context: ctx,
                retry_after: self.config.interval,
            },
            Err(error) => Outcome::Failed { error },
        }
    }

    /// Walk the update's sub-step chain from wherever the context left off,
    /// suspending at the first poll delay. Sub-steps already recorded as
    /// completed are skipped, so the chain is stable across redrives even
    /// when the rebuilt step list shrinks behind an applied step.
    async fn advance_update(&self, desired: &StateDocument, mut ctx: OperationContext) -> Outcome {
        let descriptor = self.adapter.descriptor();
        let observed = match read_observed(&self.adapter, &ctx.identity).await {
            Ok(observed) => observed,
            Err(error) => return Outcome::Failed { error },
        };
        if let Err(error) = self.validate_update(desired, &observed) {
            return Outcome::Failed { error };
        }
        let steps = match self.adapter.build_update(desired, &observed) {
            Ok(steps) => steps,
            Err(error) => return Outcome::Failed { error },
        };

        let mut last_settled: Option<ObservedState> = None;
        for step in steps {
            if ctx.completed.iter().any(|label| label == step.label) {
                continue;
            }
            if !ctx.applied {
                if let Err(error) = self.apply(step.request.clone(), &ctx.identity).await {
                    return Outcome::Failed { error };
                }
                ctx.applied = true;
                last_settled = None;
                if step.stabilize && descriptor.has_transient_state() {
                    return Outcome::InProgress {
                        context: ctx,
                        retry_after: self.config.interval,
                    };
                }
                ctx.advance(step.label);
                continue;
            }
            // Applied on a previous invocation; one poll decides whether
            // this step has settled.
            match poll_once(
                &self.adapter,
                Some(desired),
                StabilizeTarget::States(descriptor.success_states),
                descriptor.failure_states,
                &self.config,
                &mut ctx,
            )
            .await
            {
                Ok(PollOutcome::Ready(settled)) => {
                    ctx.advance(step.label);
                    last_settled = Some(settled);
                }
                Ok(PollOutcome::Gone) => {
                    ctx.advance(step.label);
                }
                Ok(PollOutcome::Pending { .. }) => {
                    return Outcome::InProgress {
                        context: ctx,
                        retry_after: self.config.interval,
                    };
                }
                Err(error) => return Outcome::Failed { error },
            }
        }

        match last_settled {
            Some(observed) => Outcome::Succeeded {
                observed: Some(observed),
            },
            None => {
                Outcome::from_result(read_observed(&self.adapter, &ctx.identity).await.map(Some))
            }
        }
    }

    async fn apply_create(&self, desired: &StateDocument, identity: &str) -> Result<()> {
        let request = self.adapter.build_create(desired)?;
        match self.apply(request, identity).await {
            Ok(_) => Ok(()),
            Err(error) if error.is_already_exists() => {
                // Same generated identity means the earlier attempt already
                // made this resource; converge on it instead of failing.
                tracing::info!(
                    kind = self.adapter.descriptor().kind,
                    identity,
                    "create: resource already exists, idempotent success"
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    async fn apply(&self, request: RemoteRequest, identity: &str) -> Result<RemoteResponse> {
        tracing::debug!(
            kind = self.adapter.descriptor().kind,
            identity,
            operation = %request.operation,
            target = %request.target,
            "apply"
        );
        self.adapter
            .invoke(request)
            .await
            .map_err(|e| classify_remote(&self.adapter, e, Some(identity)))
    }

    fn validate_create(&self, desired: &StateDocument) -> Result<()> {
        let descriptor = self.adapter.descriptor();
        let mut missing: Vec<&str> = Vec::new();
        for field in descriptor.required_fields {
            if !desired.contains(field) {
                missing.push(field);
            }
        }
        if descriptor.identity(desired).is_none() && !missing.contains(&descriptor.identity_field) {
            missing.push(descriptor.identity_field);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(format!(
                "desired document is missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// Immutable fields present in the desired document must match the
    /// observed value exactly; otherwise the update fails before any remote
    /// mutation is attempted.
    fn validate_update(&self, desired: &StateDocument, observed: &ObservedState) -> Result<()> {
        let descriptor = self.adapter.descriptor();
        for field in descriptor.immutable_fields {
            if desired.contains(field) && desired.get(field) != observed.document.get(field) {
                return Err(EngineError::Validation(format!(
                    "field '{field}' is not updatable: it cannot be changed after creation"
                )));
            }
        }
        Ok(())
    }
}
