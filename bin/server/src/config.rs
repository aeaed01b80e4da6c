//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Webhook client configuration.
    #[serde(default)]
    pub webhook: WebhookClientConfig,
}

/// Webhook-call related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookClientConfig {
    /// Bound on each outbound webhook call, in seconds.
    /// A hung webhook must not occupy a request handler indefinitely.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Maximum size of a single submitted file upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for WebhookClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_config_has_correct_defaults() {
        let config = WebhookClientConfig::default();
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn listen_addr_defaults_to_loopback() {
        assert_eq!(default_listen_addr(), "127.0.0.1:8080");
    }
}
