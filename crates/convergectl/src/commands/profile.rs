//! Profile management command implementations

use serde_json::json;
use tracing::debug;

use convergectl_core::{Config, Profile};

use crate::cli::{OutputFormat, ProfileCommands};
use crate::commands::{machine_readable, renderer_format};
use crate::connection::ConnectionManager;
use crate::error::{ConvergeCtlError, Result as CliResult};
use crate::output::print_output;

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    match profile_cmd {
        ProfileCommands::List => handle_list(conn_mgr, output_format),
        ProfileCommands::Path => handle_path(conn_mgr),
        ProfileCommands::Show { name } => handle_show(conn_mgr, name, output_format),
        ProfileCommands::Set {
            name,
            api_url,
            api_key,
            insecure,
            default,
        } => handle_set(conn_mgr, name, api_url, api_key, *insecure, *default),
        ProfileCommands::Remove { name } => handle_remove(conn_mgr, name),
        ProfileCommands::Default { name } => handle_default(conn_mgr, name),
    }
}

/// Redact an API key down to a recognizable tail.
fn redact(api_key: &str) -> String {
    if api_key.starts_with("${") {
        // Environment references are not secrets; show them verbatim.
        return api_key.to_string();
    }
    let tail: String = api_key
        .chars()
        .rev()
        .take(4)
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    format!("****{tail}")
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    debug!("Listing profiles");
    let default = conn_mgr.config.default_profile.as_deref();
    let rows: Vec<serde_json::Value> = conn_mgr
        .config
        .list_profiles()
        .into_iter()
        .map(|(name, profile)| {
            json!({
                "name": name,
                "api_url": profile.api_url,
                "insecure": profile.insecure,
                "default": default == Some(name.as_str()),
            })
        })
        .collect();

    if rows.is_empty() && !machine_readable(output_format) {
        println!("No profiles configured. Use 'convergectl profile set' to create one.");
        return Ok(());
    }

    print_output(&rows, renderer_format(output_format)).map_err(|e| {
        ConvergeCtlError::OutputError {
            message: e.to_string(),
        }
    })
}

fn handle_path(conn_mgr: &ConnectionManager) -> CliResult<()> {
    match &conn_mgr.config_path {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", Config::config_path()?.display()),
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let profile = conn_mgr.config.profiles.get(name).ok_or_else(|| {
        ConvergeCtlError::ProfileNotFound {
            name: name.to_string(),
        }
    })?;

    let details = json!({
        "name": name,
        "api_url": profile.api_url,
        "api_key": redact(&profile.api_key),
        "insecure": profile.insecure,
        "default": conn_mgr.config.default_profile.as_deref() == Some(name),
    });
    print_output(&details, renderer_format(output_format)).map_err(|e| {
        ConvergeCtlError::OutputError {
            message: e.to_string(),
        }
    })
}

fn handle_set(
    conn_mgr: &ConnectionManager,
    name: &str,
    api_url: &str,
    api_key: &str,
    insecure: bool,
    default: bool,
) -> CliResult<()> {
    let mut conn_mgr = conn_mgr.clone();
    conn_mgr.config.set_profile(
        name.to_string(),
        Profile {
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            insecure,
        },
    );
    if default || conn_mgr.config.profiles.len() == 1 {
        conn_mgr.config.default_profile = Some(name.to_string());
    }
    conn_mgr.save_config()?;

    println!("Profile '{name}' saved");
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    let mut conn_mgr = conn_mgr.clone();
    if conn_mgr.config.remove_profile(name).is_none() {
        return Err(ConvergeCtlError::ProfileNotFound {
            name: name.to_string(),
        });
    }
    conn_mgr.save_config()?;

    println!("Profile '{name}' removed");
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    let mut conn_mgr = conn_mgr.clone();
    if !conn_mgr.config.profiles.contains_key(name) {
        return Err(ConvergeCtlError::ProfileNotFound {
            name: name.to_string(),
        });
    }
    conn_mgr.config.default_profile = Some(name.to_string());
    conn_mgr.save_config()?;

    println!("Default profile set to '{name}'");
    Ok(())
}
