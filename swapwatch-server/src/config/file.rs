//! TOML file configuration structures.
//!
//! These structs directly map to the `swapwatch-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub webhook: WebhookSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamSection>,
    #[serde(default)]
    pub rooms: RoomsSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Webhook ingress section: one HMAC signing secret per upstream provider.
///
/// The provider name is the `{provider}` path segment of
/// `POST /webhook/{provider}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSection {
    pub secrets: HashMap<String, String>,
}

/// Upstream filter synchronization.  Absent means no upstream filter is
/// maintained (every event is still routed locally).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSection {
    /// Full-replacement filter endpoint; the tracked address list is
    /// POSTed here on membership changes.
    pub filter_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

/// Room defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsSection {
    #[serde(default = "default_ttl_hours")]
    pub default_ttl_hours: u32,
}

impl Default for RoomsSection {
    fn default() -> Self {
        Self {
            default_ttl_hours: default_ttl_hours(),
        }
    }
}

fn default_ttl_hours() -> u32 {
    48
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[webhook.secrets]
alchemy = "whsec_abc123"
helius = "whsec_def456"

[upstream]
filter_url = "https://provider.example.com/v1/filter"
auth_token = "bearer-token"

[rooms]
default_ttl_hours = 24
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.webhook.secrets.len(), 2);
        assert_eq!(config.rooms.default_ttl_hours, 24);
        assert!(config.upstream.is_some());
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let toml_str = r#"
[webhook.secrets]
alchemy = "whsec_abc123"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.rooms.default_ttl_hours, 48);
        assert!(config.upstream.is_none());
    }
}
