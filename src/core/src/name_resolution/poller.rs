use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};

use super::cache::NameResolutionCache;
use super::sources::HostnameSource;
use crate::error_handling::types::PollError;

/// Result of one successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub received: usize,
    pub changed: usize,
}

/// Periodically merges one `HostnameSource` into the cache.
///
/// Each tick starts an independent poll; a slow answer does not delay the next
/// tick and never blocks another poller. Every poll is cut off after one
/// interval so at most a couple can be in flight. Whichever poll completes last
/// wins for a given address.
pub struct Poller<S: HostnameSource> {
    source: Arc<S>,
    cache: Arc<NameResolutionCache>,
    interval: Duration,
}

impl<S: HostnameSource> Poller<S> {
    pub fn new(source: S, cache: Arc<NameResolutionCache>, interval: Duration) -> Self {
        Self {
            source: Arc::new(source),
            cache,
            interval,
        }
    }

    /// Fetches once and applies the result. On failure the cache is left untouched.
    pub async fn poll_once(&self) -> Result<PollSummary, PollError> {
        let entries = time::timeout(self.interval, self.source.fetch())
            .await
            .map_err(|_| PollError::Timeout)??;
        let changed = self.cache.apply_all(&entries);
        Ok(PollSummary {
            received: entries.len(),
            changed,
        })
    }

    async fn poll_and_log(&self) {
        match self.poll_once().await {
            Ok(summary) => debug!(
                "{} poll: {} entries, {} changed",
                self.source.name(),
                summary.received,
                summary.changed
            ),
            Err(e) => warn!("{} poll failed: {}", self.source.name(), e),
        }
    }

    /// Runs until the returned handle is aborted. The first poll fires immediately.
    pub fn spawn(self) -> JoinHandle<()> {
        let poller = Arc::new(self);
        tokio::spawn(async move {
            info!(
                "Polling {} every {:?}",
                poller.source.name(),
                poller.interval
            );
            let mut ticker = time::interval(poller.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Owned here so in-flight polls are aborted together with the loop.
            let mut in_flight = JoinSet::new();
            loop {
                ticker.tick().await;
                while in_flight.try_join_next().is_some() {}
                let poller = Arc::clone(&poller);
                in_flight.spawn(async move { poller.poll_and_log().await });
            }
        })
    }
}
