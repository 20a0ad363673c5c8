use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostEntry {
    pub address: IpAddr,
    pub hostname: String,
}

impl HostEntry {
    pub fn new(address: IpAddr, hostname: impl Into<String>) -> Self {
        Self {
            address,
            hostname: hostname.into(),
        }
    }
}

/// One row of the router's DNS cache table.
#[derive(Debug, Clone, Deserialize)]
pub struct DnsCacheEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: String,
    #[serde(rename = "type", default)]
    pub record_type: String,
}

impl DnsCacheEntry {
    /// Only `A` records map an address to a name.
    pub fn host_entry(&self) -> Option<HostEntry> {
        if self.record_type != "A" || self.name.is_empty() {
            return None;
        }
        let address = self.data.trim().parse().ok()?;
        Some(HostEntry::new(address, self.name.clone()))
    }
}

/// One row of the router's DHCP lease table.
#[derive(Debug, Clone, Deserialize)]
pub struct DhcpLease {
    #[serde(rename = "active-address", default)]
    pub active_address: Option<String>,
    #[serde(rename = "host-name", default)]
    pub host_name: Option<String>,
}

impl DhcpLease {
    /// Leases without an active address or without a hostname carry nothing to resolve.
    pub fn host_entry(&self) -> Option<HostEntry> {
        let hostname = self.host_name.as_deref().filter(|h| !h.is_empty())?;
        let address = self.active_address.as_deref()?.trim().parse().ok()?;
        Some(HostEntry::new(address, hostname))
    }
}
