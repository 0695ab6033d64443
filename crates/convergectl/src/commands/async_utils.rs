//! Shared utilities for long-running reconciliations with --wait support
//!
//! Wires the engine's progress events into a CLI spinner and maps the
//! engine's report into per-format output.

use indicatif::{ProgressBar, ProgressStyle};

use convergectl_core::{ProgressCallback, ProgressEvent, Report, ReportStatus, StabilizeConfig};

use crate::cli::{OutputFormat, WaitArgs};
use crate::commands::{machine_readable, renderer_format};
use crate::error::{ConvergeCtlError, Result as CliResult};
use crate::output::print_output;

/// Translate the wait flags into the engine's polling configuration.
///
/// The attempt budget is the timeout divided by the interval, rounded up,
/// so `--wait-timeout 600 --wait-interval 10` allows 60 reads.
pub fn stabilize_config(args: &WaitArgs) -> StabilizeConfig {
    let interval = std::time::Duration::from_secs(args.wait_interval);
    let max_attempts = if args.wait_interval == 0 {
        args.wait_timeout.max(1)
    } else {
        args.wait_timeout.div_ceil(args.wait_interval).max(1)
    };
    StabilizeConfig::new(interval, max_attempts as u32)
}

/// Build a spinner-backed progress callback for interactive formats.
///
/// Machine-readable formats get no spinner so stdout stays parseable.
pub fn progress_reporting(
    output_format: OutputFormat,
) -> (Option<ProgressBar>, Option<ProgressCallback>) {
    if machine_readable(output_format) {
        return (None, None);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap(),
    );
    pb.set_message("Reconciling");

    let pb_clone = pb.clone();
    let callback = Some(Box::new(move |event: ProgressEvent| match event {
        ProgressEvent::Started { kind, identity } => {
            pb_clone.set_message(format!("Waiting for {kind} '{identity}'"));
        }
        ProgressEvent::Polling {
            identity,
            status,
            attempt,
        } => {
            pb_clone.set_message(format!("{identity}: {status} (attempt {attempt})"));
        }
        ProgressEvent::Stabilized { identity, status } => {
            pb_clone.finish_with_message(format!("{identity}: {status}"));
        }
        ProgressEvent::Failed { identity, error } => {
            pb_clone.finish_with_message(format!("{identity} failed: {error}"));
        }
    }) as ProgressCallback);

    (Some(pb), callback)
}

/// Print a reconciliation report in the requested format.
///
/// A failed report becomes an error so the process exits nonzero; the
/// machine-readable report is still printed first for scripting.
pub fn render_report(report: Report, output_format: OutputFormat, kind: &str) -> CliResult<()> {
    match report.status {
        ReportStatus::Success => {
            if machine_readable(output_format) {
                print_output(&report, renderer_format(output_format))
                    .map_err(|e| ConvergeCtlError::OutputError {
                        message: e.to_string(),
                    })?;
            } else if let Some(resource) = &report.resource {
                print_output(resource, renderer_format(output_format)).map_err(|e| {
                    ConvergeCtlError::OutputError {
                        message: e.to_string(),
                    }
                })?;
            } else {
                println!("{kind} reconciled successfully");
            }
            Ok(())
        }
        ReportStatus::InProgress => {
            if machine_readable(output_format) {
                print_output(&report, renderer_format(output_format)).map_err(|e| {
                    ConvergeCtlError::OutputError {
                        message: e.to_string(),
                    }
                })?;
                return Ok(());
            }
            let identity = report.identity.as_deref().unwrap_or("resource");
            println!("{kind} '{identity}' is still reconciling");
            if let Some(delay) = report.retry_after_seconds {
                println!("Check again in {delay} seconds.");
            }
            if let Some(context) = &report.context {
                let context_json =
                    serde_json::to_string(context).map_err(ConvergeCtlError::from)?;
                println!(
                    "To continue, run: convergectl resume --kind {kind} --context '{context_json}' --wait"
                );
            }
            Ok(())
        }
        ReportStatus::Failed => {
            if machine_readable(output_format) {
                print_output(&report, renderer_format(output_format)).map_err(|e| {
                    ConvergeCtlError::OutputError {
                        message: e.to_string(),
                    }
                })?;
            }
            Err(ConvergeCtlError::OperationFailed {
                code: report
                    .error_code
                    .unwrap_or_else(|| "GeneralServiceFailure".to_string()),
                message: report
                    .message
                    .unwrap_or_else(|| "reconciliation failed".to_string()),
            })
        }
    }
}
