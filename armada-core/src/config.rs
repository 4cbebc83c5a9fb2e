use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Captain (control plane) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptainConfig {
    /// API listener address
    #[serde(default = "default_captain_addr")]
    pub listen_addr: SocketAddr,
}

/// Worker (data plane) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Base URL of the captain API
    #[serde(default = "default_captain_url")]
    pub captain_url: String,

    /// HTTP proxy listener address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// SOCKS5 listener address
    #[serde(default = "default_socks_addr")]
    pub socks_addr: SocketAddr,

    /// Number of worker threads (0 = one per core)
    #[serde(default)]
    pub workers: usize,

    /// Pool-catalog sync interval (seconds)
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Deadline for auth calls to the captain (milliseconds)
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_ms: u64,

    /// Upstream dial deadline (milliseconds)
    #[serde(default = "default_dial_timeout")]
    pub dial_timeout_ms: u64,

    /// Idle deadline while waiting for a request head (milliseconds)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_ms: u64,

    /// Sticky-session entry lifetime after last use (seconds)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Hard cap on sticky-session entries
    #[serde(default = "default_session_max")]
    pub session_max_entries: usize,
}

impl CaptainConfig {
    /// Load configuration from YAML file + environment variables.
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let config: Self = base_figment(config_path, "captain.yaml").extract()?;
        Ok(config)
    }
}

impl WorkerConfig {
    /// Load configuration from YAML file + environment variables.
    ///
    /// Besides `ARMADA_*`, the bare `CAPTAIN_URL`, `HTTP_PROXY_ADDR` and
    /// `SOCKS_PROXY_ADDR` variables override their fields directly.
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let mut config: Self = base_figment(config_path, "worker.yaml").extract()?;

        if let Ok(url) = std::env::var("CAPTAIN_URL") {
            config.captain_url = url;
        }
        if let Ok(addr) = std::env::var("HTTP_PROXY_ADDR") {
            config.http_addr = addr.parse()?;
        }
        if let Ok(addr) = std::env::var("SOCKS_PROXY_ADDR") {
            config.socks_addr = addr.parse()?;
        }

        Ok(config)
    }

    /// Worker thread count, resolving 0 to the core count.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

fn base_figment(config_path: Option<&str>, default_name: &str) -> Figment {
    let mut figment = Figment::new();

    if let Some(path) = config_path {
        figment = figment.merge(Yaml::file(path));
    } else {
        for default_path in &[
            default_name.to_string(),
            format!("/etc/armada/{default_name}"),
            format!("config/{default_name}"),
        ] {
            if std::path::Path::new(default_path).exists() {
                figment = figment.merge(Yaml::file(default_path));
                break;
            }
        }
    }

    // Environment variables override: ARMADA_HTTP_ADDR, etc.
    figment.merge(Env::prefixed("ARMADA_").split("__"))
}

// Default implementations

impl Default for CaptainConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_captain_addr(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            captain_url: default_captain_url(),
            http_addr: default_http_addr(),
            socks_addr: default_socks_addr(),
            workers: 0,
            sync_interval_secs: default_sync_interval(),
            auth_timeout_ms: default_auth_timeout(),
            dial_timeout_ms: default_dial_timeout(),
            idle_timeout_ms: default_idle_timeout(),
            session_ttl_secs: default_session_ttl(),
            session_max_entries: default_session_max(),
        }
    }
}

// Serde default functions

fn default_captain_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_captain_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_http_addr() -> SocketAddr {
    "0.0.0.0:8081".parse().unwrap()
}

fn default_socks_addr() -> SocketAddr {
    "0.0.0.0:1080".parse().unwrap()
}

fn default_sync_interval() -> u64 {
    30
}

fn default_auth_timeout() -> u64 {
    5000
}

fn default_dial_timeout() -> u64 {
    10_000
}

fn default_idle_timeout() -> u64 {
    60_000
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_session_max() -> usize {
    100_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_worker_config() {
        let cfg = WorkerConfig::default();
        assert_eq!(cfg.captain_url, "http://127.0.0.1:8080");
        assert_eq!(cfg.http_addr.port(), 8081);
        assert_eq!(cfg.socks_addr.port(), 1080);
        assert_eq!(cfg.sync_interval_secs, 30);
        assert_eq!(cfg.session_ttl_secs, 3600);
        assert_eq!(cfg.session_max_entries, 100_000);
    }

    #[test]
    fn test_default_captain_config() {
        let cfg = CaptainConfig::default();
        assert_eq!(cfg.listen_addr.port(), 8080);
    }

    #[test]
    fn test_effective_workers_auto_is_positive() {
        let cfg = WorkerConfig::default();
        assert!(cfg.effective_workers() >= 1);
    }

    #[test]
    fn test_effective_workers_explicit() {
        let cfg = WorkerConfig {
            workers: 3,
            ..Default::default()
        };
        assert_eq!(cfg.effective_workers(), 3);
    }

    #[test]
    fn test_deserialize_partial_yaml_fills_defaults() {
        let cfg: WorkerConfig =
            serde_json::from_str(r#"{"captain_url":"http://captain:9999"}"#).unwrap();
        assert_eq!(cfg.captain_url, "http://captain:9999");
        assert_eq!(cfg.http_addr.port(), 8081);
        assert_eq!(cfg.dial_timeout_ms, 10_000);
    }
}
