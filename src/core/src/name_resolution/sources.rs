use async_trait::async_trait;
use log::trace;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::types::{DhcpLease, DnsCacheEntry, HostEntry};
use crate::configuration::types::RouterConfig;
use crate::error_handling::types::PollError;

/// Authenticated JSON client for the router REST API.
pub struct RouterClient {
    http: reqwest::Client,
    username: String,
    password: String,
}

impl RouterClient {
    /// Requests time out after one poll interval.
    pub fn new(config: &RouterConfig) -> Result<Self, PollError> {
        let http = reqwest::Client::builder()
            .timeout(config.poll_interval())
            .build()
            .map_err(PollError::Request)?;
        Ok(Self {
            http,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PollError> {
        trace!("GET {}", url);
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| timeout_or(e, PollError::Request))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| timeout_or(e, PollError::Body))
    }
}

fn timeout_or(err: reqwest::Error, wrap: fn(reqwest::Error) -> PollError) -> PollError {
    if err.is_timeout() {
        PollError::Timeout
    } else {
        wrap(err)
    }
}

/// Something that can be asked for the current `(address, hostname)` pairs.
#[async_trait]
pub trait HostnameSource: Send + Sync + 'static {
    /// Display name for logs.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Vec<HostEntry>, PollError>;
}

/// The router's DNS cache, `A` records only.
pub struct DnsCacheSource {
    client: Arc<RouterClient>,
    url: String,
}

impl DnsCacheSource {
    pub fn new(client: Arc<RouterClient>, config: &RouterConfig) -> Self {
        Self {
            client,
            url: config.dns_cache_url(),
        }
    }
}

#[async_trait]
impl HostnameSource for DnsCacheSource {
    fn name(&self) -> &'static str {
        "dns-cache"
    }

    async fn fetch(&self) -> Result<Vec<HostEntry>, PollError> {
        let entries: Vec<DnsCacheEntry> = self.client.get_json(&self.url).await?;
        Ok(entries.iter().filter_map(DnsCacheEntry::host_entry).collect())
    }
}

/// The router's DHCP lease table, active leases with a hostname.
pub struct DhcpLeaseSource {
    client: Arc<RouterClient>,
    url: String,
}

impl DhcpLeaseSource {
    pub fn new(client: Arc<RouterClient>, config: &RouterConfig) -> Self {
        Self {
            client,
            url: config.dhcp_leases_url(),
        }
    }
}

#[async_trait]
impl HostnameSource for DhcpLeaseSource {
    fn name(&self) -> &'static str {
        "dhcp-leases"
    }

    async fn fetch(&self) -> Result<Vec<HostEntry>, PollError> {
        let leases: Vec<DhcpLease> = self.client.get_json(&self.url).await?;
        Ok(leases.iter().filter_map(DhcpLease::host_entry).collect())
    }
}
