//! # Secret Providers
//!
//! Process-wide signing secret resolution. The secret keys the HMAC that
//! binds a task's type to its payload on the wire; it is assumed stable for
//! the lifetime of in-flight signatures. Rotating the secret invalidates
//! unverified deliveries, which are then dropped and logged by the
//! dispatcher.

use thiserror::Error;

/// Errors from secret resolution
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Secret environment variable '{var}' is not set")]
    MissingEnvVar { var: String },

    #[error("Secret is empty")]
    Empty,
}

/// Source of the process-wide task signing secret
pub trait SecretProvider: Send + Sync {
    /// Resolve the current signing secret
    fn get_secret(&self) -> Result<String, SecretError>;
}

/// Secret provider backed by an environment variable
pub struct EnvSecretProvider {
    var_name: String,
}

impl EnvSecretProvider {
    /// Read the secret from the default `RELAY_TASK_SECRET` variable
    pub fn new() -> Self {
        Self::with_var(crate::constants::system::DEFAULT_SECRET_ENV_VAR)
    }

    /// Read the secret from a specific environment variable
    pub fn with_var(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

impl Default for EnvSecretProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretProvider for EnvSecretProvider {
    fn get_secret(&self) -> Result<String, SecretError> {
        let secret = std::env::var(&self.var_name).map_err(|_| SecretError::MissingEnvVar {
            var: self.var_name.clone(),
        })?;

        if secret.is_empty() {
            return Err(SecretError::Empty);
        }

        Ok(secret)
    }
}

/// Fixed secret provider for tests and embedded deployments
pub struct StaticSecretProvider {
    secret: String,
}

impl StaticSecretProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl SecretProvider for StaticSecretProvider {
    fn get_secret(&self) -> Result<String, SecretError> {
        if self.secret.is_empty() {
            return Err(SecretError::Empty);
        }
        Ok(self.secret.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider_returns_secret() {
        let provider = StaticSecretProvider::new("s3cr3t");
        assert_eq!(provider.get_secret().unwrap(), "s3cr3t");
    }

    #[test]
    fn test_static_provider_rejects_empty_secret() {
        let provider = StaticSecretProvider::new("");
        assert!(matches!(provider.get_secret(), Err(SecretError::Empty)));
    }

    #[test]
    fn test_env_provider_reports_missing_variable() {
        let provider = EnvSecretProvider::with_var("RELAY_TEST_SECRET_THAT_DOES_NOT_EXIST");
        assert!(matches!(
            provider.get_secret(),
            Err(SecretError::MissingEnvVar { .. })
        ));
    }
}
