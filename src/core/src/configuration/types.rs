use serde::Deserialize;
use std::time::Duration;

/// UDP side receiving flow export datagrams.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub bind_address: String,
    pub port: u16,
    /// Capacity of the queue between the listener and the ingest pipeline
    pub channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0"),
            port: 3000,
            channel_capacity: 4096,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// REST endpoint of the router publishing the DNS cache and the DHCP leases.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub poll_interval_ms: u64,
    pub dns_cache_path: String,
    pub dhcp_leases_path: String,
}

impl RouterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn dns_cache_url(&self) -> String {
        join_url(&self.base_url, &self.dns_cache_path)
    }

    pub fn dhcp_leases_url(&self) -> String {
        join_url(&self.base_url, &self.dhcp_leases_path)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            poll_interval_ms: 5000,
            dns_cache_path: String::from("/rest/ip/dns/cache"),
            dhcp_leases_path: String::from("/rest/ip/dhcp-server/lease"),
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Bounds on everything kept in memory.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Maximum number of correlated sessions retained
    pub max_sessions: usize,
    /// Maximum number of forward 4-tuples tracked across all sessions
    pub max_connections: usize,
    /// Maximum number of raw flow records kept for `/flows`
    pub max_flows: usize,
    /// Per-observer queue length before messages start being dropped
    pub observer_buffer: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_sessions: 5000,
            max_connections: 65_536,
            max_flows: 1000,
            observer_buffer: 256,
        }
    }
}
