//! Connection management for warehouse control-plane clients

use crate::error::{ConvergeCtlError, Result as CliResult};
use convergectl_core::warehouse::Client;
use convergectl_core::{Config, EngineError};
use tracing::{debug, info, trace};

/// User agent string for convergectl HTTP requests
const CONVERGECTL_USER_AGENT: &str = concat!("convergectl/", env!("CARGO_PKG_VERSION"));

/// Connection manager for creating authenticated clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<std::path::PathBuf>,
}

impl ConnectionManager {
    /// Create a new connection manager with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<std::path::PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self) -> CliResult<()> {
        if let Some(ref path) = self.config_path {
            self.config.save_to_path(path)?;
        } else {
            self.config.save()?;
        }
        Ok(())
    }

    /// Create a control-plane client from profile credentials with
    /// environment variable override support.
    ///
    /// When --config-file is explicitly specified, environment variables are
    /// ignored to provide true configuration isolation. This allows testing
    /// with isolated configs and follows the principle of "explicit wins"
    /// (CLI args > env vars > defaults).
    pub fn create_client(&self, profile_name: Option<&str>) -> CliResult<Client> {
        debug!("Creating warehouse control-plane client");
        trace!("Profile name: {:?}", profile_name);

        let use_env_vars = self.config_path.is_none();
        if !use_env_vars {
            info!("--config-file specified explicitly, ignoring environment variables");
        }

        let env_api_url = if use_env_vars {
            std::env::var("CONVERGECTL_API_URL").ok()
        } else {
            None
        };
        let env_api_key = if use_env_vars {
            std::env::var("CONVERGECTL_API_KEY").ok()
        } else {
            None
        };
        let env_insecure = if use_env_vars {
            std::env::var("CONVERGECTL_INSECURE").ok()
        } else {
            None
        };

        if env_api_url.is_some() {
            debug!("Found CONVERGECTL_API_URL environment variable");
        }
        if env_api_key.is_some() {
            debug!("Found CONVERGECTL_API_KEY environment variable");
        }

        let (final_api_url, final_api_key, final_insecure) =
            if let (Some(url), Some(key)) = (&env_api_url, &env_api_key) {
                // Environment variables provide complete credentials
                info!("Using control-plane credentials from environment variables");
                let insecure = env_insecure
                    .as_ref()
                    .map(|s| s.to_lowercase() == "true" || s == "1")
                    .unwrap_or(false);
                (url.clone(), key.clone(), insecure)
            } else {
                let resolved_profile_name = self.config.resolve_profile(profile_name)?;
                info!("Using profile: {}", resolved_profile_name);

                let profile = self
                    .config
                    .profiles
                    .get(&resolved_profile_name)
                    .ok_or_else(|| ConvergeCtlError::ProfileNotFound {
                        name: resolved_profile_name.clone(),
                    })?;

                // Allow partial environment variable overrides
                let url = env_api_url.unwrap_or_else(|| profile.api_url.clone());
                let key = env_api_key.unwrap_or_else(|| profile.api_key.clone());
                let insecure = env_insecure
                    .as_ref()
                    .map(|s| s.to_lowercase() == "true" || s == "1")
                    .unwrap_or(profile.insecure);

                (url, key, insecure)
            };

        info!("Connecting to control plane: {}", final_api_url);
        trace!(
            "API key: {}...",
            &final_api_key[..final_api_key.len().min(8)]
        );

        let client = Client::builder()
            .base_url(final_api_url)
            .api_key(final_api_key)
            .user_agent(CONVERGECTL_USER_AGENT)
            .insecure(final_insecure)
            .build()
            .map_err(|e| match e {
                EngineError::Config(message) => ConvergeCtlError::ConnectionError { message },
                other => ConvergeCtlError::ConnectionError {
                    message: other.to_string(),
                },
            })?;

        debug!("Control-plane client created successfully");
        Ok(client)
    }
}
