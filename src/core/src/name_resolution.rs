//! Address to hostname resolution fed by the router.
//!
//! Components:
//! - `types`: host entries and the router's DNS cache / DHCP lease payloads.
//! - `store`: the `HostnameStore` trait and its in-memory implementation.
//! - `cache`: `NameResolutionCache`, the contract used by the rest of the service.
//! - `sources`: REST client and the two `HostnameSource` implementations.
//! - `poller`: timer-driven tasks merging a source into the cache.

pub mod cache;
pub mod poller;
pub mod sources;
pub mod store;
pub mod types;

pub use cache::{CacheNotifier, NameResolutionCache};
pub use poller::Poller;
pub use sources::{DhcpLeaseSource, DnsCacheSource, HostnameSource, RouterClient};
pub use store::{HostnameStore, MemoryHostnameStore};
pub use types::HostEntry;
