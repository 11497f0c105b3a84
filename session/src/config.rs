//! Session configuration.
//!
//! Configuration values should be provided by the application, not hardcoded.
//! [`SessionConfig`] tunes the session core; [`ProviderConfig`] holds the
//! identity provider credentials read from the environment at startup.

use std::time::Duration;
use thiserror::Error;

/// Prefix of every provider environment variable.
pub const ENV_PREFIX: &str = "FOREVER_FITNESS_";

/// Session core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long `begin_sign_in()` waits for the provider to push the
    /// signed-in identity after the sign-in flow resolved.
    ///
    /// Default: 10 seconds
    pub sign_in_confirmation_timeout: Duration,

    /// Refuse sign-in while the snapshot carries a provider error.
    ///
    /// Default: true
    pub block_sign_in_on_error: bool,
}

impl SessionConfig {
    /// Create configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sign_in_confirmation_timeout: Duration::from_secs(10),
            block_sign_in_on_error: true,
        }
    }

    /// Set the sign-in confirmation timeout.
    #[must_use]
    pub const fn with_sign_in_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.sign_in_confirmation_timeout = timeout;
        self
    }

    /// Set whether a provider error blocks sign-in.
    #[must_use]
    pub const fn with_block_sign_in_on_error(mut self, block: bool) -> Self {
        self.block_sign_in_on_error = block;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is unset or blank.
    #[error("Environment variable not set: {0}")]
    Missing(String),

    /// Environment variable is set but unusable.
    #[error("Invalid value for {var}: {reason}")]
    Invalid {
        /// Variable name
        var: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Identity provider credentials.
///
/// Loaded from `FOREVER_FITNESS_*` environment variables:
///
/// | Field                 | Variable                                | Required |
/// |-----------------------|-----------------------------------------|----------|
/// | `api_key`             | `FOREVER_FITNESS_API_KEY`               | yes      |
/// | `auth_domain`         | `FOREVER_FITNESS_AUTH_DOMAIN`           | yes      |
/// | `project_id`          | `FOREVER_FITNESS_PROJECT_ID`            | yes      |
/// | `app_id`              | `FOREVER_FITNESS_APP_ID`                | yes      |
/// | `storage_bucket`      | `FOREVER_FITNESS_STORAGE_BUCKET`        | no       |
/// | `messaging_sender_id` | `FOREVER_FITNESS_MESSAGING_SENDER_ID`   | no       |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Public API key.
    pub api_key: String,

    /// Domain hosting the sign-in flow (e.g. `my-app.example.com`).
    pub auth_domain: String,

    /// Provider project id.
    pub project_id: String,

    /// Registered application id.
    pub app_id: String,

    /// Storage bucket for user uploads.
    pub storage_bucket: Option<String>,

    /// Messaging sender id.
    pub messaging_sender_id: Option<String>,
}

impl ProviderConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// `lookup` receives full variable names such as
    /// `FOREVER_FITNESS_API_KEY`. Blank values count as missing.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &str| {
            optional(name).ok_or_else(|| ConfigError::Missing(format!("{ENV_PREFIX}{name}")))
        };

        let config = Self {
            api_key: required("API_KEY")?,
            auth_domain: required("AUTH_DOMAIN")?,
            project_id: required("PROJECT_ID")?,
            app_id: required("APP_ID")?,
            storage_bucket: optional("STORAGE_BUCKET"),
            messaging_sender_id: optional("MESSAGING_SENDER_ID"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate field contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the auth domain is not a host name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.auth_domain.contains('.') || self.auth_domain.contains('/') {
            return Err(ConfigError::Invalid {
                var: format!("{ENV_PREFIX}AUTH_DOMAIN"),
                reason: format!("'{}' is not a host name", self.auth_domain),
            });
        }
        Ok(())
    }

    /// Startup availability flag for a load result.
    ///
    /// Logs why the provider is unavailable so the operator can fix the
    /// environment; the session itself only sees `false`.
    pub fn availability(result: &Result<Self, ConfigError>) -> bool {
        match result {
            Ok(config) => {
                tracing::info!(
                    project_id = %config.project_id,
                    auth_domain = %config.auth_domain,
                    "Identity provider configured"
                );
                true
            },
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Identity provider unavailable: environment variables are missing or invalid"
                );
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;

    fn complete_env() -> HashMap<String, String> {
        [
            ("FOREVER_FITNESS_API_KEY", "key-123"),
            ("FOREVER_FITNESS_AUTH_DOMAIN", "forever-fitness.example.com"),
            ("FOREVER_FITNESS_PROJECT_ID", "forever-fitness"),
            ("FOREVER_FITNESS_APP_ID", "1:42:web:abc"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn load(env: &HashMap<String, String>) -> Result<ProviderConfig, ConfigError> {
        ProviderConfig::from_lookup(|var| env.get(var).cloned())
    }

    #[test]
    fn session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.sign_in_confirmation_timeout, Duration::from_secs(10));
        assert!(config.block_sign_in_on_error);
    }

    #[test]
    fn session_config_builder_overrides() {
        let config = SessionConfig::new()
            .with_sign_in_confirmation_timeout(Duration::from_millis(250))
            .with_block_sign_in_on_error(false);
        assert_eq!(config.sign_in_confirmation_timeout, Duration::from_millis(250));
        assert!(!config.block_sign_in_on_error);
    }

    #[test]
    fn provider_config_loads_required_and_optional_values() {
        let mut env = complete_env();
        env.insert("FOREVER_FITNESS_STORAGE_BUCKET".to_string(), "bucket".to_string());

        let config = load(&env).unwrap();

        assert_eq!(config.api_key, "key-123");
        assert_eq!(config.storage_bucket.as_deref(), Some("bucket"));
        assert_eq!(config.messaging_sender_id, None);
        assert!(ProviderConfig::availability(&Ok(config)));
    }

    #[test]
    fn blank_required_value_is_missing() {
        let mut env = complete_env();
        env.insert("FOREVER_FITNESS_PROJECT_ID".to_string(), "   ".to_string());

        let result = load(&env);

        assert_eq!(
            result,
            Err(ConfigError::Missing("FOREVER_FITNESS_PROJECT_ID".to_string()))
        );
        assert!(!ProviderConfig::availability(&result));
    }

    #[test]
    fn auth_domain_must_look_like_a_host() {
        let mut env = complete_env();
        env.insert("FOREVER_FITNESS_AUTH_DOMAIN".to_string(), "localhost".to_string());

        assert!(matches!(load(&env), Err(ConfigError::Invalid { .. })));
    }
}
