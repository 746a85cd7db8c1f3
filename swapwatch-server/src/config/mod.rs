//! Configuration module for swapwatch-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments, and
//! environment variables.  Webhook signing secrets and the upstream auth
//! token only ever enter the process through here.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{
    RoomsConfig, ServerConfig, SharedConfig, UpstreamConfig, WebhookConfig,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub upstream: Option<UpstreamConfig>,
    pub rooms: RoomsConfig,
}

impl LoadedConfig {
    /// Convert the reloadable sections into a [`SharedConfig`].
    ///
    /// The listen address and upstream target are fixed for the process
    /// lifetime and are not part of the shared state.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig {
            webhook: Arc::new(RwLock::new(self.webhook)),
            rooms: Arc::new(RwLock::new(self.rooms)),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.webhook.secrets.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one [webhook.secrets] provider entry is required".to_owned(),
        ));
    }
    for (provider, secret) in &config.webhook.secrets {
        if secret.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "webhook secret for provider {provider} is empty"
            )));
        }
    }
    if config.rooms.default_ttl_hours == 0 {
        return Err(ConfigError::ValidationError(
            "rooms.default_ttl_hours must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        webhook: WebhookConfig::new(file_config.webhook.secrets),
        upstream: file_config.upstream.map(|u| UpstreamConfig {
            filter_url: u.filter_url,
            auth_token: u.auth_token,
        }),
        rooms: RoomsConfig {
            default_ttl_hours: file_config.rooms.default_ttl_hours,
        },
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
