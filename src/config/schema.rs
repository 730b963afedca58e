//! Configuration schema definitions.
//!
//! This module defines the settings of the control plane itself.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::registry::RegistryNode;

/// Root configuration for the control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Managed proxy: configuration file, checker and reload.
    pub haproxy: HaproxyConfig,

    /// Runtime API socket.
    pub runtime: RuntimeConfig,

    /// Audit log location.
    pub changelog: ChangeLogConfig,

    pub admin: AdminConfig,

    pub observability: ObservabilityConfig,

    /// Static node registry used by `sync`.
    pub registry: RegistryConfig,
}

/// Managed proxy settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HaproxyConfig {
    /// Live configuration file.
    pub config_path: PathBuf,

    /// Binary used for `-c -f` checks.
    pub binary: String,

    /// Directory for disposable validation files.
    pub scratch_dir: PathBuf,

    pub validate_timeout_secs: u64,

    /// Reload command as argv; run without a shell.
    pub reload_command: Vec<String>,

    pub reload_timeout_secs: u64,
}

impl HaproxyConfig {
    pub fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.validate_timeout_secs)
    }

    pub fn reload_timeout(&self) -> Duration {
        Duration::from_secs(self.reload_timeout_secs)
    }
}

impl Default for HaproxyConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("/etc/haproxy/haproxy.cfg"),
            binary: "haproxy".to_string(),
            scratch_dir: std::env::temp_dir(),
            validate_timeout_secs: 10,
            reload_command: vec!["/app/scripts/reload-haproxy.sh".to_string()],
            reload_timeout_secs: 30,
        }
    }
}

/// Runtime API connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// `unix:/path`, a bare path, or `tcp:host:port`.
    pub socket: String,

    /// Bound on connect + write + read, in seconds.
    pub timeout_secs: u64,
}

impl RuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            socket: "unix:/var/run/haproxy.sock".to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChangeLogConfig {
    pub path: PathBuf,
}

impl Default for ChangeLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/log/lb-reconciler/changes.jsonl"),
        }
    }
}

/// Default admin key; startup warns while it is in use.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Backend that registry nodes are added to.
    pub backend: String,

    pub nodes: Vec<RegistryNode>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: "ddc_nodes_http".to_string(),
            nodes: Vec::new(),
        }
    }
}
