//! Type definitions for server lifecycle management.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted server configuration (`.backend_config.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub reload: bool,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            workers: 2,
            reload: false,
            log_level: "info".to_string(),
        }
    }
}

/// Partial update to the server configuration; unset keys are preserved
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub workers: Option<usize>,
    pub reload: Option<bool>,
    pub log_level: Option<String>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.workers.is_none()
            && self.reload.is_none()
            && self.log_level.is_none()
    }
}

impl ServerConfig {
    /// Merge-updates this configuration from a patch
    pub fn merge(&mut self, patch: ConfigPatch) {
        if let Some(host) = patch.host {
            self.host = host;
        }
        if let Some(port) = patch.port {
            self.port = port;
        }
        if let Some(workers) = patch.workers {
            self.workers = workers;
        }
        if let Some(reload) = patch.reload {
            self.reload = reload;
        }
        if let Some(log_level) = patch.log_level {
            self.log_level = log_level;
        }
    }
}

/// Lifecycle states of the supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerHealth {
    Stopped,
    Starting,
    Running,
    Stopping,
    Unhealthy,
}

/// Snapshot returned by the status operation
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub running: bool,
    pub state: ServerHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_bytes: Option<u64>,
    pub port: u16,
}

impl StatusReport {
    pub fn stopped(port: u16) -> Self {
        Self {
            running: false,
            state: ServerHealth::Stopped,
            pid: None,
            uptime_secs: None,
            cpu_percent: None,
            rss_bytes: None,
            port,
        }
    }
}

/// Failures surfaced by lifecycle operations
#[derive(Debug)]
pub enum LifecycleError {
    /// Configured port is held by another process and `force` was not given
    PortInUse(u16),
    /// The supervised process did not bind its port within the timeout
    StartFailed(String),
    /// Filesystem problems around the pid/log/config files
    Io(std::io::Error),
    /// Anything else
    Other(String),
}

impl LifecycleError {
    /// Machine-readable kind, mirrored in CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PortInUse(_) => "PORT_IN_USE",
            Self::StartFailed(_) => "START_FAILED",
            Self::Io(_) => "IO",
            Self::Other(_) => "INTERNAL",
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortInUse(port) => write!(
                f,
                "port {} is already in use (re-run with --force to reclaim it)",
                port
            ),
            Self::StartFailed(msg) => write!(f, "server failed to start: {}", msg),
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LifecycleError {}

impl From<std::io::Error> for LifecycleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_preserves_unset_keys() {
        let mut config = ServerConfig::default();
        config.merge(ConfigPatch {
            port: Some(9000),
            ..Default::default()
        });
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.workers, 2);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = ServerConfig {
            host: "0.0.0.0".into(),
            port: 8123,
            workers: 4,
            reload: true,
            log_level: "debug".into(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(LifecycleError::PortInUse(8000).kind(), "PORT_IN_USE");
        assert_eq!(
            LifecycleError::StartFailed("timeout".into()).kind(),
            "START_FAILED"
        );
    }
}
