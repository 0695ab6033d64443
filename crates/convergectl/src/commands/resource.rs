//! Resource verb implementations, generic over the resource kind
//!
//! Every kind shares the same verb surface; the adapter injected by the
//! dispatcher decides translation, classification, and whether a verb
//! stabilizes.

use serde_json::Value;
use tracing::{debug, info};

use convergectl_core::{
    ListPage, OperationContext, Outcome, Reconciler, ServiceAdapter, StateDocument,
    generate_identity,
};

use super::async_utils::{progress_reporting, render_report, stabilize_config};
use crate::cli::{OutputFormat, ResourceCommands, WaitArgs};
use crate::commands::{machine_readable, renderer_format};
use crate::error::{ConvergeCtlError, Result as CliResult};
use crate::output::print_output;

/// Read JSON data from a string or, with an `@` prefix, from a file.
fn read_json_value(data: &str) -> CliResult<Value> {
    let json_str = if let Some(file_path) = data.strip_prefix('@') {
        std::fs::read_to_string(file_path).map_err(|e| ConvergeCtlError::InvalidInput {
            message: format!("Failed to read file {file_path}: {e}"),
        })?
    } else {
        data.to_string()
    };

    serde_json::from_str(&json_str).map_err(|e| ConvergeCtlError::InvalidInput {
        message: format!("Invalid JSON: {e}"),
    })
}

fn read_state_document(data: &str) -> CliResult<StateDocument> {
    let value = read_json_value(data)?;
    serde_json::from_value(value).map_err(|e| ConvergeCtlError::InvalidInput {
        message: format!("Desired state must be a JSON object: {e}"),
    })
}

/// Dispatch one resource verb against the given adapter.
pub async fn handle_resource_command<A: ServiceAdapter>(
    cmd: &ResourceCommands,
    adapter: A,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        ResourceCommands::Create {
            desired,
            logical_id,
            request_token,
            wait,
        } => {
            create(
                adapter,
                desired,
                logical_id.as_deref(),
                request_token.as_deref(),
                wait,
                output_format,
            )
            .await
        }
        ResourceCommands::Get { identity } => get(adapter, identity, output_format).await,
        ResourceCommands::Update { desired, wait } => {
            update(adapter, desired, wait, output_format).await
        }
        ResourceCommands::Delete { identity, wait } => {
            delete(adapter, identity, wait, output_format).await
        }
        ResourceCommands::List { cursor, all } => {
            list(adapter, cursor.as_deref(), *all, output_format).await
        }
    }
}

async fn create<A: ServiceAdapter>(
    adapter: A,
    desired: &str,
    logical_id: Option<&str>,
    request_token: Option<&str>,
    wait: &WaitArgs,
    output_format: OutputFormat,
) -> CliResult<()> {
    let mut desired = read_state_document(desired)?;
    let descriptor = adapter.descriptor();
    let kind = descriptor.kind;

    // Derive a name when the desired state omits one. The same logical id
    // and token always produce the same name, so a retried create converges
    // on the resource the first attempt made.
    if descriptor.identity(&desired).is_none()
        && let (Some(logical_id), Some(request_token)) = (logical_id, request_token)
    {
        let identity = generate_identity(logical_id, request_token, descriptor.max_identity_len);
        info!("Derived identity '{}' for {}", identity, kind);
        desired.set(descriptor.identity_field, Value::String(identity));
    }

    let reconciler = Reconciler::with_config(adapter, stabilize_config(wait));
    let outcome = if wait.wait {
        let (pb, callback) = progress_reporting(output_format);
        let outcome = reconciler.create(&desired, callback).await;
        if let Some(pb) = pb
            && !pb.is_finished()
        {
            pb.finish_and_clear();
        }
        outcome
    } else {
        reconciler.begin_create(&desired).await
    };
    render_report(outcome.report(), output_format, kind)
}

async fn get<A: ServiceAdapter>(
    adapter: A,
    identity: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let kind = adapter.descriptor().kind;
    debug!("Fetching {} '{}'", kind, identity);
    let reconciler = Reconciler::new(adapter);
    let outcome = reconciler.read(identity).await;
    render_report(outcome.report(), output_format, kind)
}

async fn update<A: ServiceAdapter>(
    adapter: A,
    desired: &str,
    wait: &WaitArgs,
    output_format: OutputFormat,
) -> CliResult<()> {
    let desired = read_state_document(desired)?;
    let kind = adapter.descriptor().kind;

    let reconciler = Reconciler::with_config(adapter, stabilize_config(wait));
    let outcome = if wait.wait {
        let (pb, callback) = progress_reporting(output_format);
        let outcome = reconciler.update(&desired, None, callback).await;
        if let Some(pb) = pb
            && !pb.is_finished()
        {
            pb.finish_and_clear();
        }
        outcome
    } else {
        reconciler.begin_update(&desired).await
    };
    render_report(outcome.report(), output_format, kind)
}

async fn delete<A: ServiceAdapter>(
    adapter: A,
    identity: &str,
    wait: &WaitArgs,
    output_format: OutputFormat,
) -> CliResult<()> {
    let kind = adapter.descriptor().kind;

    let reconciler = Reconciler::with_config(adapter, stabilize_config(wait));
    let outcome = if wait.wait {
        let (pb, callback) = progress_reporting(output_format);
        let outcome = reconciler.delete(identity, callback).await;
        if let Some(pb) = pb
            && !pb.is_finished()
        {
            pb.finish_and_clear();
        }
        outcome
    } else {
        reconciler.begin_delete(identity).await
    };
    render_report(outcome.report(), output_format, kind)
}

async fn list<A: ServiceAdapter>(
    adapter: A,
    cursor: Option<&str>,
    all: bool,
    output_format: OutputFormat,
) -> CliResult<()> {
    let reconciler = Reconciler::new(adapter);

    let page = if all {
        let mut resources = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = reconciler.list(cursor.as_deref()).await?;
            resources.extend(page.resources);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        ListPage {
            resources,
            next_cursor: None,
        }
    } else {
        reconciler.list(cursor).await?
    };

    if machine_readable(output_format) {
        print_output(&page, renderer_format(output_format)).map_err(|e| {
            ConvergeCtlError::OutputError {
                message: e.to_string(),
            }
        })?;
    } else {
        print_output(&page.resources, renderer_format(output_format)).map_err(|e| {
            ConvergeCtlError::OutputError {
                message: e.to_string(),
            }
        })?;
        if let Some(next) = &page.next_cursor {
            println!("More results available: --cursor {next}");
        }
    }
    Ok(())
}

/// Redrive a suspended operation from its serialized context.
pub async fn handle_resume<A: ServiceAdapter>(
    adapter: A,
    context: &str,
    desired: Option<&str>,
    wait: &WaitArgs,
    output_format: OutputFormat,
) -> CliResult<()> {
    let kind = adapter.descriptor().kind;

    let value = read_json_value(context)?;
    // Accept either a bare context or a saved response carrying one.
    let context_value = match value.get("context") {
        Some(inner) => inner.clone(),
        None => value,
    };
    let mut context = OperationContext::from_value(context_value).map_err(ConvergeCtlError::from)?;
    let desired = desired.map(read_state_document).transpose()?;

    let reconciler = Reconciler::with_config(adapter, stabilize_config(wait));

    if !wait.wait {
        let outcome = reconciler.resume(desired.as_ref(), context).await;
        return render_report(outcome.report(), output_format, kind);
    }

    // Host-driven redrive loop: honor the engine's requested cadence until
    // the operation leaves the in-progress state.
    let (pb, _callback) = progress_reporting(output_format);
    loop {
        match reconciler.resume(desired.as_ref(), context).await {
            Outcome::InProgress {
                context: next,
                retry_after,
            } => {
                if let Some(pb) = &pb {
                    pb.set_message(format!(
                        "{kind} '{}' reconciling (attempt {})",
                        next.identity, next.poll_attempts
                    ));
                }
                context = next;
                tokio::time::sleep(retry_after).await;
            }
            outcome => {
                if let Some(pb) = pb
                    && !pb.is_finished()
                {
                    pb.finish_and_clear();
                }
                return render_report(outcome.report(), output_format, kind);
            }
        }
    }
}
