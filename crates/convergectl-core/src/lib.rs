//! # convergectl-core
//!
//! The desired-state reconciliation engine behind convergectl.
//!
//! Every resource kind is described by a static [`ResourceDescriptor`] and a
//! [`ServiceAdapter`] that translates between state documents and the
//! warehouse control-plane API. The generic [`Reconciler`] drives each verb
//! through the same chain (validate, apply, stabilize, read back) and the
//! [`Outcome`] maps into the external response contract via
//! [`Outcome::report`].
//!
//! ## Layers
//!
//! ```text
//! convergectl-core/
//! ├── descriptor   # static per-kind metadata
//! ├── adapter      # per-kind translation + transport contract
//! ├── stabilizer   # polling until a target state (or gone)
//! ├── reconciler   # the verb state machine, generic over adapters
//! ├── outcome      # external response mapping
//! ├── config       # TOML profiles for control-plane endpoints
//! └── warehouse    # REST client + the cluster/parameter-group adapters
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use convergectl_core::{Reconciler, StabilizeConfig};
//! use convergectl_core::warehouse::{Client, ClusterAdapter};
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .base_url("https://warehouse.example.com/v1")
//!     .api_key("...")
//!     .build()?;
//! let reconciler = Reconciler::with_config(
//!     ClusterAdapter::new(client),
//!     StabilizeConfig::new(Duration::from_secs(10), 60),
//! );
//!
//! let desired = serde_json::from_str(r#"{"cluster_name": "etl", "node_type": "dw.large"}"#)?;
//! let outcome = reconciler.create(&desired, None).await;
//! println!("{}", serde_json::to_string_pretty(&outcome.report())?);
//! ```

pub mod adapter;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod naming;
pub mod outcome;
pub mod progress;
pub mod reconciler;
pub mod stabilizer;
pub mod warehouse;

pub use adapter::{
    RemoteError, RemoteOperation, RemoteRequest, RemoteResponse, ServiceAdapter, UpdateStep,
};
pub use config::{Config, ConfigError, Profile};
pub use context::{CONTEXT_VERSION, OperationContext};
pub use descriptor::ResourceDescriptor;
pub use document::{ListPage, ObservedState, STATUS_FIELD, StateDocument};
pub use error::{EngineError, ErrorKind, Result};
pub use naming::generate_identity;
pub use outcome::{Outcome, Report, ReportStatus};
pub use progress::{ProgressCallback, ProgressEvent};
pub use reconciler::Reconciler;
pub use stabilizer::{PollOutcome, StabilizeConfig, StabilizeTarget, poll_once, stabilize};
