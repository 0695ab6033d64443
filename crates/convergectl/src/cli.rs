//! CLI structure and command definitions
//!
//! Defines the command-line interface using clap. Resource commands share
//! one verb set; the engine behind them decides per kind whether a verb
//! needs stabilization.

use clap::{Args, Parser, Subcommand};

/// Declarative reconciliation CLI for warehouse resources
#[derive(Parser, Debug)]
#[command(name = "convergectl")]
#[command(
    version,
    about = "Reconcile declared warehouse resources against the control plane"
)]
#[command(long_about = "
Reconcile declared warehouse resources against the control plane.

Each verb drives one reconciliation: validate the desired state, apply the
remote mutation, poll until the resource stabilizes, then read back the
authoritative state.

EXAMPLES:
    # Set up a profile
    convergectl profile set prod --api-url https://warehouse.example.com/v1 --api-key KEY

    # Create a cluster and wait for it to become available
    convergectl cluster create --desired @cluster.json --wait

    # Fire-and-suspend: returns a context to redrive later
    convergectl cluster create --desired @cluster.json
    convergectl resume --kind cluster --context @context.json --desired @cluster.json

    # List clusters page by page
    convergectl cluster list
    convergectl cluster list --cursor m1

For more help on a specific command, run:
    convergectl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "CONVERGECTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "CONVERGECTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Automatically choose format based on command and context
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

/// Resource kinds the CLI can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ResourceKind {
    Cluster,
    #[value(name = "parameter-group")]
    ParameterGroup,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Profile management for control-plane endpoints
    #[command(subcommand, visible_alias = "prof")]
    Profile(ProfileCommands),

    /// Manage warehouse clusters
    #[command(subcommand)]
    Cluster(ResourceCommands),

    /// Manage warehouse parameter groups
    #[command(subcommand, name = "parameter-group", visible_alias = "pg")]
    ParameterGroup(ResourceCommands),

    /// Redrive a suspended operation from its saved context
    #[command(after_help = "EXAMPLES:
    # Suspend a create, then poll it to completion at your own cadence
    convergectl cluster create --desired @cluster.json > out.json
    convergectl resume --kind cluster --context @out.json --desired @cluster.json
")]
    Resume {
        /// Resource kind the context belongs to
        #[arg(long, value_enum)]
        kind: ResourceKind,

        /// Operation context JSON (inline, @file, or a saved response
        /// containing a `context` field)
        #[arg(long)]
        context: String,

        /// Desired state JSON, inline or @file (required for create/update)
        #[arg(long)]
        desired: Option<String>,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Show version information
    #[command(visible_alias = "ver")]
    Version,
}

/// Common arguments for verbs that stabilize
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Wait in process for the operation to stabilize
    #[arg(long)]
    pub wait: bool,

    /// Maximum time to wait in seconds
    #[arg(long, default_value = "600", requires = "wait")]
    pub wait_timeout: u64,

    /// Polling interval in seconds
    #[arg(long, default_value = "10", requires = "wait")]
    pub wait_interval: u64,
}

/// Verbs shared by every resource kind
#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// Create a resource and reconcile it to a stable state
    #[command(after_help = "EXAMPLES:
    # Desired state from a file
    convergectl cluster create --desired @cluster.json --wait

    # Derive the resource name from a logical id and idempotency token
    convergectl cluster create --desired '{\"node_type\": \"dw.large\"}' \\
        --logical-id AnalyticsCluster --request-token 49fc01a2 --wait
")]
    Create {
        /// Desired state JSON, inline or @file
        #[arg(long)]
        desired: String,

        /// Logical id used to derive a name when the desired state omits one
        #[arg(long, requires = "request_token")]
        logical_id: Option<String>,

        /// Idempotency token paired with --logical-id; the same pair always
        /// derives the same name
        #[arg(long, requires = "logical_id")]
        request_token: Option<String>,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Fetch the current observed state of a resource
    #[command(visible_alias = "show")]
    Get {
        /// Resource identity
        identity: String,
    },

    /// Apply desired changes to an existing resource
    Update {
        /// Desired state JSON, inline or @file
        #[arg(long)]
        desired: String,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Delete a resource
    #[command(visible_alias = "rm")]
    Delete {
        /// Resource identity
        identity: String,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// List resources as identity-only projections
    #[command(visible_alias = "ls")]
    List {
        /// Page cursor from a previous call
        #[arg(long)]
        cursor: Option<String>,

        /// Follow cursors until the last page
        #[arg(long, conflicts_with = "cursor")]
        all: bool,
    },
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    #[command(visible_alias = "add")]
    #[command(after_help = "EXAMPLES:
    # Create a profile and make it the default
    convergectl profile set prod \\
        --api-url https://warehouse.example.com/v1 \\
        --api-key wh_k3y_f9yfxob26vx64hwddh8vm \\
        --default

    # Reference an environment variable instead of a literal key
    convergectl profile set staging \\
        --api-url https://staging.example.com/v1 \\
        --api-key '${CONVERGECTL_STAGING_KEY}'
")]
    Set {
        /// Profile name
        name: String,

        /// Base URL of the control-plane API
        #[arg(long)]
        api_url: String,

        /// API key for authentication (supports ${VAR} expansion)
        #[arg(long)]
        api_key: String,

        /// Skip TLS certificate verification (self-signed deployments)
        #[arg(long)]
        insecure: bool,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name to remove
        name: String,
    },

    /// Set the default profile
    Default {
        /// Profile name to make default
        name: String,
    },
}
