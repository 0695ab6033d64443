//! Error types for convergectl
//!
//! Defines structured error types using thiserror for better error handling
//! and user experience.

use colored::Colorize;
use convergectl_core::EngineError;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: no profile configured
///
///   tip: create a profile:
///       convergectl profile set prod --api-url <url> --api-key <key>
/// ```
pub struct CliDiagnostic {
    message: String,
    tips: Vec<String>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    /// Add a tip line.
    pub fn tip(mut self, description: &str) -> Self {
        self.tips.push(description.to_string());
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for tip in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{tip}");
        }
    }
}

/// Main error type for the convergectl application
#[derive(Error, Debug)]
pub enum ConvergeCtlError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured. Use 'convergectl profile set' to configure a profile.")]
    NoProfileConfigured,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("{code}: {message}")]
    OperationFailed { code: String, message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for convergectl operations
pub type Result<T> = std::result::Result<T, ConvergeCtlError>;

impl ConvergeCtlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ConvergeCtlError::ProfileNotFound { name } => vec![
                "List available profiles: convergectl profile list".to_string(),
                format!("Create profile '{name}': convergectl profile set {name} --api-url <url> --api-key <key>"),
            ],
            ConvergeCtlError::NoProfileConfigured => vec![
                "Create a profile: convergectl profile set prod --api-url <url> --api-key <key>".to_string(),
                "View profile documentation: convergectl profile --help".to_string(),
            ],
            ConvergeCtlError::ConnectionError { message }
                if message.contains("certificate") || message.contains("SSL") =>
            {
                vec![
                    "Try --insecure on the profile for self-signed certificates".to_string(),
                    "Check that the control-plane URL is correct and reachable".to_string(),
                ]
            }
            ConvergeCtlError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the control-plane URL: convergectl profile show <profile>".to_string(),
            ],
            ConvergeCtlError::OperationFailed { code, .. } if code == "InvalidCredentials" => vec![
                "Check the profile's API key: convergectl profile show <profile>".to_string(),
            ],
            ConvergeCtlError::OperationFailed { code, .. } if code == "NotStabilized" => vec![
                "Raise the budget with --wait-timeout, or redrive with 'convergectl resume'"
                    .to_string(),
            ],
            ConvergeCtlError::InvalidInput { .. } => vec![
                "Check the command syntax: convergectl <command> --help".to_string(),
                "Verify the desired-state JSON is well formed".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{self}"));
        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion);
        }
        diag.print();
    }
}

impl From<EngineError> for ConvergeCtlError {
    fn from(err: EngineError) -> Self {
        match &err {
            EngineError::Validation(message) => ConvergeCtlError::InvalidInput {
                message: message.clone(),
            },
            EngineError::Config(message) => ConvergeCtlError::Configuration(message.clone()),
            _ => ConvergeCtlError::OperationFailed {
                code: err.kind().code().to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl From<convergectl_core::ConfigError> for ConvergeCtlError {
    fn from(err: convergectl_core::ConfigError) -> Self {
        use convergectl_core::ConfigError;
        match err {
            ConfigError::ProfileNotFound { name } => ConvergeCtlError::ProfileNotFound { name },
            ConfigError::NoProfileConfigured { .. } => ConvergeCtlError::NoProfileConfigured,
            other => ConvergeCtlError::Configuration(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConvergeCtlError {
    fn from(err: serde_json::Error) -> Self {
        ConvergeCtlError::OutputError {
            message: format!("JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for ConvergeCtlError {
    fn from(err: std::io::Error) -> Self {
        ConvergeCtlError::OutputError {
            message: format!("IO error: {err}"),
        }
    }
}

impl From<anyhow::Error> for ConvergeCtlError {
    fn from(err: anyhow::Error) -> Self {
        ConvergeCtlError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convergectl_core::ErrorKind;

    #[test]
    fn test_engine_validation_maps_to_invalid_input() {
        let err: ConvergeCtlError =
            EngineError::Validation("missing field".to_string()).into();
        assert!(matches!(err, ConvergeCtlError::InvalidInput { .. }));
    }

    #[test]
    fn test_engine_remote_maps_to_operation_failed() {
        let err: ConvergeCtlError =
            EngineError::remote(ErrorKind::Throttled, "slow down", Some("etl")).into();
        match err {
            ConvergeCtlError::OperationFailed { code, .. } => assert_eq!(code, "Throttled"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_stabilized_has_resume_suggestion() {
        let err = ConvergeCtlError::OperationFailed {
            code: "NotStabilized".to_string(),
            message: "gave up".to_string(),
        };
        assert!(err.suggestions().iter().any(|s| s.contains("resume")));
    }
}
