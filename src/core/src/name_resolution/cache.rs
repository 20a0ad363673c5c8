use log::debug;
use std::net::IpAddr;
use std::sync::Arc;

use super::store::HostnameStore;
use super::types::HostEntry;

/// Receives a notification every time a stored hostname actually changes.
pub trait CacheNotifier: Send + Sync {
    fn hostname_changed(&self, entry: &HostEntry);
}

/// Process-wide address to hostname mapping.
///
/// Last writer wins and entries never expire: an address that disappears from
/// the router keeps its last known name until something overwrites it.
pub struct NameResolutionCache {
    store: Arc<dyn HostnameStore>,
    notifier: Option<Arc<dyn CacheNotifier>>,
}

impl NameResolutionCache {
    pub fn new(store: Arc<dyn HostnameStore>) -> Self {
        Self {
            store,
            notifier: None,
        }
    }

    pub fn with_notifier(store: Arc<dyn HostnameStore>, notifier: Arc<dyn CacheNotifier>) -> Self {
        Self {
            store,
            notifier: Some(notifier),
        }
    }

    pub fn get(&self, address: &IpAddr) -> Option<String> {
        self.store.get(address)
    }

    /// Overwrites the hostname of `address`.
    ///
    /// The notifier only fires when the value differs from the stored one, so
    /// re-polling an unchanged table is silent.
    pub fn apply_update(&self, address: IpAddr, hostname: &str) -> bool {
        let changed = self.store.put(address, hostname);
        if changed {
            debug!("Hostname of {} is now {:?}", address, hostname);
            if let Some(ref notifier) = self.notifier {
                notifier.hostname_changed(&HostEntry::new(address, hostname));
            }
        }
        changed
    }

    /// Applies a batch in order and returns how many entries changed.
    pub fn apply_all(&self, entries: &[HostEntry]) -> usize {
        entries
            .iter()
            .filter(|entry| self.apply_update(entry.address, &entry.hostname))
            .count()
    }

    pub fn entries(&self) -> Vec<HostEntry> {
        self.store.entries()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_resolution::store::MemoryHostnameStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<HostEntry>>,
    }

    impl CacheNotifier for RecordingNotifier {
        fn hostname_changed(&self, entry: &HostEntry) {
            self.seen.lock().unwrap().push(entry.clone());
        }
    }

    fn cache_with_notifier() -> (NameResolutionCache, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let cache =
            NameResolutionCache::with_notifier(Arc::new(MemoryHostnameStore::new()), notifier.clone());
        (cache, notifier)
    }

    #[test]
    fn test_identical_update_notifies_once() {
        let (cache, notifier) = cache_with_notifier();
        let address: IpAddr = "10.0.0.5".parse().unwrap();

        cache.apply_update(address, "laptop");
        cache.apply_update(address, "laptop");

        assert_eq!(
            *notifier.seen.lock().unwrap(),
            vec![HostEntry::new(address, "laptop")]
        );
    }

    #[test]
    fn test_overwrite_notifies_again() {
        let (cache, notifier) = cache_with_notifier();
        let address: IpAddr = "10.0.0.5".parse().unwrap();

        cache.apply_update(address, "laptop");
        cache.apply_update(address, "laptop.lan");

        assert_eq!(cache.get(&address).as_deref(), Some("laptop.lan"));
        assert_eq!(notifier.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_apply_all_counts_changes() {
        let (cache, _) = cache_with_notifier();
        let batch = vec![
            HostEntry::new("10.0.0.1".parse().unwrap(), "a"),
            HostEntry::new("10.0.0.2".parse().unwrap(), "b"),
        ];

        assert_eq!(cache.apply_all(&batch), 2);
        assert_eq!(cache.apply_all(&batch), 0);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.entries(), batch);
    }

    #[test]
    fn test_unknown_address_is_absent() {
        let cache = NameResolutionCache::new(Arc::new(MemoryHostnameStore::new()));
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"192.0.2.1".parse().unwrap()), None);
    }
}
