//! # Relay Configuration System
//!
//! Typed configuration for the task dispatch subsystem. Every value has an
//! explicit default from [`crate::constants`], so an unconfigured process is
//! fully operational; files and environment variables override selectively.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relay_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let lock_ttl = manager.config().tasks.default_lock_ttl_seconds;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::system;

pub use loader::ConfigManager;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {message}")]
    LoadFailed { message: String },

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigurationError {
    /// Create a load failure
    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::LoadFailed {
            message: message.into(),
        }
    }

    /// Create an invalid-value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Namespace prefixed onto queue hook names
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Task dispatch and delivery settings
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Idempotency store settings
    #[serde(default)]
    pub idempotency: IdempotencyConfig,

    /// Cache backend settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Secret resolution settings
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Task dispatch and delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TasksConfig {
    /// Lock TTL applied when a task does not supply its own. Bounds how long
    /// a crashed executor blocks redelivery-driven re-execution; shorter than
    /// the real handler runtime risks double execution.
    #[serde(default = "default_lock_ttl")]
    pub default_lock_ttl_seconds: u64,
}

/// Idempotency store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdempotencyConfig {
    /// Prefix for lock and done entry keys
    #[serde(default = "default_idempotency_prefix")]
    pub key_prefix: String,
}

/// Cache backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL applied to cache entries stored without an explicit one
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_seconds: u64,
}

/// Secret resolution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Environment variable holding the task signing secret
    #[serde(default = "default_secret_env_var")]
    pub secret_env_var: String,
}

fn default_namespace() -> String {
    system::DEFAULT_NAMESPACE.to_string()
}

fn default_lock_ttl() -> u64 {
    system::DEFAULT_LOCK_TTL_SECONDS
}

fn default_idempotency_prefix() -> String {
    system::DEFAULT_IDEMPOTENCY_PREFIX.to_string()
}

fn default_cache_ttl() -> u64 {
    system::DEFAULT_CACHE_TTL_SECONDS
}

fn default_secret_env_var() -> String {
    system::DEFAULT_SECRET_ENV_VAR.to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            tasks: TasksConfig::default(),
            idempotency: IdempotencyConfig::default(),
            cache: CacheConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_lock_ttl_seconds: default_lock_ttl(),
        }
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_idempotency_prefix(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env_var: default_secret_env_var(),
        }
    }
}

impl RelayConfig {
    /// Validate invariants the type system cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespace.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "namespace",
                "must not be empty",
            ));
        }
        if !self
            .namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigurationError::invalid_value(
                "namespace",
                "must contain only ASCII alphanumerics and underscores",
            ));
        }
        if self.tasks.default_lock_ttl_seconds < system::MIN_TTL_SECONDS {
            return Err(ConfigurationError::invalid_value(
                "tasks.default_lock_ttl_seconds",
                format!("must be at least {}", system::MIN_TTL_SECONDS),
            ));
        }
        if self.idempotency.key_prefix.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "idempotency.key_prefix",
                "must not be empty",
            ));
        }
        Ok(())
    }
}
