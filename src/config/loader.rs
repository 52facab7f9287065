//! Configuration Loader
//!
//! Environment-aware configuration loading. A base file, an optional
//! per-environment overlay, and `RELAY__`-prefixed environment variables are
//! merged in that order, then validated. Every source is optional; with none
//! present the defaults from [`RelayConfig::default`] apply.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::{ConfigResult, ConfigurationError, RelayConfig};

/// Environment variable selecting the deployment environment
const ENV_VAR: &str = "RELAY_ENV";

/// Loaded configuration plus the context it was loaded in
pub struct ConfigManager {
    config: RelayConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection, reading
    /// `config/relay.toml` and `config/relay.<environment>.toml` when present
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(Path::new("config"))
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: &Path) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration with an explicit environment. Useful for tests that
    /// must not depend on process-global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: &Path,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let base: PathBuf = config_dir.join("relay");
        let overlay: PathBuf = config_dir.join(format!("relay.{environment}"));

        debug!(
            environment = %environment,
            directory = %config_dir.display(),
            "Loading relay configuration"
        );

        let config = config::Config::builder()
            .add_source(config::File::from(base).required(false))
            .add_source(config::File::from(overlay).required(false))
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_failed(e.to_string()))?;

        let config: RelayConfig = config
            .try_deserialize()
            .map_err(|e| ConfigurationError::load_failed(e.to_string()))?;

        config.validate()?;

        debug!(
            namespace = %config.namespace,
            lock_ttl = config.tasks.default_lock_ttl_seconds,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the environment this configuration was loaded for
    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn detect_environment() -> String {
        env::var(ENV_VAR).unwrap_or_else(|_| "development".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_missing_directory_uses_defaults() {
        let manager =
            ConfigManager::load_from_directory_with_env(Path::new("does/not/exist"), "test")
                .unwrap();
        assert_eq!(manager.config().namespace, "relay");
        assert_eq!(manager.environment(), "test");
    }
}
