//! Configuration and profile management
//!
//! A reusable configuration system for naming warehouse control-plane
//! endpoints and their credentials.
//!
//! # Features
//!
//! - Multiple named profiles for different control-plane deployments
//! - Environment variable expansion in config files
//! - Platform-specific config file locations

#![allow(clippy::module_inception)]

pub mod config;
pub mod error;

pub use config::{Config, Profile};
pub use error::{ConfigError, Result};
