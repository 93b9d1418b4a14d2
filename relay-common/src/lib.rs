//! Relay Common - Shared configuration, errors, and logging for the chat relay.
//!
//! This crate provides:
//! - Configuration types and loading (file + environment)
//! - Error types and handling utilities
//! - Logging setup
//! - Small string utilities used when logging and reporting errors

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;

pub use config::{
    Config, ModelConfig, ObservabilityConfig, SecretsConfig, ServerConfig, SessionConfig,
};
pub use error::{Error, Result};

