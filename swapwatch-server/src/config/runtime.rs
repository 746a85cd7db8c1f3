//! Runtime configuration shared across request handlers.
//!
//! Each section sits behind its own `Arc<RwLock<...>>` so a SIGHUP reload
//! can swap sections independently while requests are in flight.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

/// Server section as used at runtime.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Per-provider webhook signing secrets, as key material.
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    secrets: HashMap<String, Box<[u8]>>,
}

impl WebhookConfig {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self {
            secrets: secrets
                .into_iter()
                .map(|(provider, secret)| (provider, secret.into_bytes().into_boxed_slice()))
                .collect(),
        }
    }

    /// The signing key for a provider, or `None` for unknown providers.
    pub fn secret_for(&self, provider: &str) -> Option<&[u8]> {
        self.secrets.get(provider).map(|s| s.as_ref())
    }
}

/// Upstream filter-sync target.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub filter_url: Url,
    pub auth_token: Option<String>,
}

/// Room defaults.
#[derive(Debug, Clone)]
pub struct RoomsConfig {
    pub default_ttl_hours: u32,
}

/// All reloadable configuration sections.
#[derive(Clone)]
pub struct SharedConfig {
    pub webhook: Arc<RwLock<WebhookConfig>>,
    pub rooms: Arc<RwLock<RoomsConfig>>,
}
