//! Backing storage for resolved hostnames.
//!
//! `NameResolutionCache` only talks to a `HostnameStore`, so the in-memory
//! map below can be swapped for another backend without touching callers.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{PoisonError, RwLock};

use super::types::HostEntry;

pub trait HostnameStore: Send + Sync {
    /// Looks up the hostname last stored for `address`.
    fn get(&self, address: &IpAddr) -> Option<String>;

    /// Stores `hostname` for `address`, overwriting unconditionally.
    ///
    /// Returns `true` when the stored value changed.
    fn put(&self, address: IpAddr, hostname: &str) -> bool;

    /// All entries, ordered by address.
    fn entries(&self) -> Vec<HostEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-mostly map: lookups happen per flow record, writes once per poll.
#[derive(Default)]
pub struct MemoryHostnameStore {
    hosts: RwLock<HashMap<IpAddr, String>>,
}

impl MemoryHostnameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostnameStore for MemoryHostnameStore {
    fn get(&self, address: &IpAddr) -> Option<String> {
        let hosts = self.hosts.read().unwrap_or_else(PoisonError::into_inner);
        hosts.get(address).cloned()
    }

    fn put(&self, address: IpAddr, hostname: &str) -> bool {
        let mut hosts = self.hosts.write().unwrap_or_else(PoisonError::into_inner);
        match hosts.get(&address) {
            Some(current) if current == hostname => false,
            _ => {
                hosts.insert(address, hostname.to_string());
                true
            }
        }
    }

    fn entries(&self) -> Vec<HostEntry> {
        let hosts = self.hosts.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<HostEntry> = hosts
            .iter()
            .map(|(address, hostname)| HostEntry::new(*address, hostname.clone()))
            .collect();
        entries.sort_by(|a, b| a.address.cmp(&b.address));
        entries
    }

    fn len(&self) -> usize {
        self.hosts.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
