//! # Core Runtime Module
//!
//! Provides the runtime infrastructure every other crate leans on:
//! - Logging and tracing infrastructure
//! - Sync run configuration
//!
//! ## Overview
//!
//! This crate turns a TOML file or builder calls into a validated
//! [`SyncConfig`](config::SyncConfig) and sets up the `tracing` subscriber
//! before the first catalog call is made.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ElementEdit, FillRemoval, SyncConfig, SyncConfigBuilder, TextReplacement};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
