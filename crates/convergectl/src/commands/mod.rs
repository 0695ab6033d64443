//! Command implementations

pub mod async_utils;
pub mod profile;
pub mod resource;

use crate::cli::OutputFormat;

/// Map the CLI-level format onto the output renderer. `Auto` renders
/// human-friendly tables and messages.
pub(crate) fn renderer_format(format: OutputFormat) -> crate::output::OutputFormat {
    match format {
        OutputFormat::Json => crate::output::OutputFormat::Json,
        OutputFormat::Yaml => crate::output::OutputFormat::Yaml,
        OutputFormat::Auto | OutputFormat::Table => crate::output::OutputFormat::Table,
    }
}

/// True when the user asked for a machine-readable format.
pub(crate) fn machine_readable(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json | OutputFormat::Yaml)
}
