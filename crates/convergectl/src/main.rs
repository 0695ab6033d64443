use anyhow::Result;
use clap::Parser;
use convergectl_core::Config;
use convergectl_core::warehouse::{ClusterAdapter, ParameterGroupAdapter};
use tracing::{debug, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands, ResourceKind};
use connection::ConnectionManager;
use error::ConvergeCtlError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    let conn_mgr = ConnectionManager::with_config_path(config, config_path);

    // Execute command
    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "convergectl=warn,convergectl_core=warn",
            1 => "convergectl=info,convergectl_core=info",
            2 => "convergectl=debug,convergectl_core=debug",
            _ => "convergectl=trace,convergectl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), ConvergeCtlError> {
    trace!("Executing command: {:?}", cli.command);

    match &cli.command {
        Commands::Version => {
            match cli.output {
                cli::OutputFormat::Json | cli::OutputFormat::Yaml => {
                    let output_data = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "name": env!("CARGO_PKG_NAME"),
                    });
                    print_version_data(cli.output, output_data)?;
                }
                _ => {
                    println!("convergectl {}", env!("CARGO_PKG_VERSION"));
                }
            }
            Ok(())
        }

        Commands::Profile(profile_cmd) => {
            debug!("Executing profile command");
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, cli.output).await
        }

        Commands::Cluster(cmd) => {
            info!("Executing cluster command");
            let client = conn_mgr.create_client(cli.profile.as_deref())?;
            commands::resource::handle_resource_command(cmd, ClusterAdapter::new(client), cli.output)
                .await
        }

        Commands::ParameterGroup(cmd) => {
            info!("Executing parameter-group command");
            let client = conn_mgr.create_client(cli.profile.as_deref())?;
            commands::resource::handle_resource_command(
                cmd,
                ParameterGroupAdapter::new(client),
                cli.output,
            )
            .await
        }

        Commands::Resume {
            kind,
            context,
            desired,
            wait,
        } => {
            info!("Resuming a suspended {:?} operation", kind);
            let client = conn_mgr.create_client(cli.profile.as_deref())?;
            match kind {
                ResourceKind::Cluster => {
                    commands::resource::handle_resume(
                        ClusterAdapter::new(client),
                        context,
                        desired.as_deref(),
                        wait,
                        cli.output,
                    )
                    .await
                }
                ResourceKind::ParameterGroup => {
                    commands::resource::handle_resume(
                        ParameterGroupAdapter::new(client),
                        context,
                        desired.as_deref(),
                        wait,
                        cli.output,
                    )
                    .await
                }
            }
        }
    }
}

fn print_version_data(
    format: cli::OutputFormat,
    data: serde_json::Value,
) -> Result<(), ConvergeCtlError> {
    let renderer = commands::renderer_format(format);
    output::print_output(&data, renderer).map_err(|e| ConvergeCtlError::OutputError {
        message: e.to_string(),
    })
}
