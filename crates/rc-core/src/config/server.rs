//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};

/// Configuration for the relaycast server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// Root directory holding one `<session>/auth` directory per session
    pub sessions_dir: PathBuf,

    /// Delay between broadcast sends when the request does not carry one
    #[serde(with = "duration_millis")]
    pub default_delay: Duration,

    /// Pairing flow settings
    pub pairing: PairingConfig,

    /// Retention limits for logs, sessions and jobs
    pub retention: RetentionConfig,

    /// Messaging bridge the sessions connect through
    pub bridge: BridgeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let config_dir = super::default_config_dir();

        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            sessions_dir: config_dir.join("sessions"),
            default_delay: Duration::from_millis(2000),
            pairing: PairingConfig::default(),
            retention: RetentionConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Replace the port of `bind_address`, keeping the host part
    pub fn with_port(mut self, port: u16) -> Self {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        self.bind_address = format!("{}:{}", host, port);
        self
    }
}

/// Pairing flow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Wait after the connection opens before requesting a pairing code
    #[serde(with = "duration_millis")]
    pub settle_delay: Duration,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1500),
        }
    }
}

/// Bounds on in-memory state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Log entries kept per session; oldest are dropped first
    pub max_log_entries: usize,

    /// Sessions idle for longer than this are torn down
    #[serde(with = "duration_secs")]
    pub session_idle_ttl: Duration,

    /// How often the retention task runs
    #[serde(with = "duration_secs")]
    pub cleanup_interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_log_entries: 1000,
            session_idle_ttl: Duration::from_secs(6 * 60 * 60),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Messaging bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL of the protocol bridge
    pub url: String,

    /// Timeout for individual bridge requests (not the event stream)
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8787".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}
