//! Configuration management for the chat relay.
//!
//! The relay reads an optional JSON file at `~/.relay/config.json` (or the
//! path in `RELAY_CONFIG`) and then applies environment overrides.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `RELAY_HOST` → server.host
//! - `RELAY_PORT` → server.port
//! - `RELAY_DEBUG` → server.debug
//! - `RELAY_MODEL` → model.name
//! - `GEMINI_API_BASE` → model.api_base
//! - `RELAY_MODEL_TIMEOUT_SECS` → model.timeout_secs
//! - `RELAY_LOG_LEVEL` → observability.log_level
//! - `RELAY_LOG_FORMAT` → observability.log_format
//! - `GEMINI_API_KEY` → secrets.gemini_api_key

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the Gemini credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".relay"),
        |dirs| dirs.home_dir().join(".relay"),
    )
}

/// Get the configuration file path, honouring `RELAY_CONFIG`.
pub fn config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir().join("config.json"))
}

// ============================================================================
// Server
// ============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Debug mode raises the default log level to `debug`.
    #[serde(default = "default_true")]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: true,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    5002
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Model
// ============================================================================

/// External generation model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier sent to the provider
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Base URL of the Gemini REST API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Upper bound on a single generation call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model_name() -> String {
    "gemini-2.5-flash".into()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".into()
}

fn default_timeout_secs() -> u64 {
    60
}

// ============================================================================
// Session
// ============================================================================

/// Conversation history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of turns retained per session
    #[serde(default = "default_max_context")]
    pub max_context: usize,

    /// Session key used when a request carries no `session_id`
    #[serde(default = "default_session_id")]
    pub default_session_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_context: default_max_context(),
            default_session_id: default_session_id(),
        }
    }
}

fn default_max_context() -> usize {
    10
}

fn default_session_id() -> String {
    "default_session".into()
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    /// When unset, derived from `server.debug`.
    #[serde(default, alias = "level")]
    pub log_level: Option<String>,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            log_format: default_log_format(),
        }
    }
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Secrets
// ============================================================================

/// Credentials. `Debug` output never contains the key itself.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    #[serde(default)]
    pub gemini_api_key: Option<String>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure for the relay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) -> crate::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Numeric variables that do not parse are a configuration error.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("RELAY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("RELAY_PORT") {
            self.server.port = parse_var("RELAY_PORT", &port)?;
        }
        if let Some(debug) = lookup("RELAY_DEBUG") {
            self.server.debug = matches!(
                debug.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Some(model) = lookup("RELAY_MODEL") {
            self.model.name = model;
        }
        if let Some(base) = lookup("GEMINI_API_BASE") {
            self.model.api_base = base;
        }
        if let Some(secs) = lookup("RELAY_MODEL_TIMEOUT_SECS") {
            self.model.timeout_secs = parse_var("RELAY_MODEL_TIMEOUT_SECS", &secs)?;
        }

        if let Some(level) = lookup("RELAY_LOG_LEVEL") {
            self.observability.log_level = Some(level);
        }
        if let Some(format) = lookup("RELAY_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Some(key) = lookup(API_KEY_ENV) {
            self.secrets.gemini_api_key = Some(key);
        }
        Ok(())
    }

    /// The Gemini credential. Missing or blank is a fatal configuration error.
    pub fn require_api_key(&self) -> crate::Result<&str> {
        match self.secrets.gemini_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(crate::Error::Config(format!("{API_KEY_ENV} not set"))),
        }
    }

    /// Check value ranges that would make the relay unusable.
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.port == 0 {
            return Err(crate::Error::Config("server.port must be non-zero".into()));
        }
        if self.session.max_context == 0 {
            return Err(crate::Error::Config(
                "session.max_context must be at least 1".into(),
            ));
        }
        if self.model.timeout_secs == 0 {
            return Err(crate::Error::Config(
                "model.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Log level after applying the debug default.
    pub fn effective_log_level(&self) -> &str {
        match self.observability.log_level.as_deref() {
            Some(level) => level,
            None if self.server.debug => "debug",
            None => "info",
        }
    }

    /// Listener address as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> crate::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| crate::Error::Config(format!("invalid {name}: {value:?}")))
}
