use log::{debug, info};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

use super::types::{FlowRecord, ResolvedFlowRecord};
use super::window::FlowWindow;
use crate::distribution::hub::LiveDistributionHub;
use crate::name_resolution::cache::NameResolutionCache;
use crate::session_management::correlator::SessionCorrelator;
use crate::session_management::table::Correlation;

/// Path of every decoded record: enrich, correlate, publish.
///
/// Runs once per record on the arrival path without buffering. Hostnames are
/// taken from the cache as it is at that instant.
pub struct FlowIngestPipeline {
    cache: Arc<NameResolutionCache>,
    correlator: Arc<SessionCorrelator>,
    window: Arc<FlowWindow>,
    hub: Arc<LiveDistributionHub>,
}

impl FlowIngestPipeline {
    pub fn new(
        cache: Arc<NameResolutionCache>,
        correlator: Arc<SessionCorrelator>,
        window: Arc<FlowWindow>,
        hub: Arc<LiveDistributionHub>,
    ) -> Self {
        Self {
            cache,
            correlator,
            window,
            hub,
        }
    }

    /// Attaches the known hostnames; an unknown address resolves to `""`.
    pub fn ingest(&self, record: FlowRecord) -> ResolvedFlowRecord {
        let resolve = |addr: Option<std::net::IpAddr>| {
            addr.and_then(|a| self.cache.get(&a)).unwrap_or_default()
        };
        let source_host = resolve(record.source_addr);
        let dest_host = resolve(record.dest_addr);
        ResolvedFlowRecord {
            record,
            source_host,
            dest_host,
        }
    }

    /// Ingests one record and publishes the session it changed, if any.
    pub fn process(&self, record: FlowRecord) -> Correlation {
        let resolved = self.ingest(record);
        let correlation = self.correlator.correlate(&resolved);
        if let Some(session) = correlation.session() {
            self.window.push(resolved);
            self.hub.publish_session(session.clone());
        }
        correlation
    }

    /// Consumes records until every sender is gone.
    pub async fn run(self, mut records: Receiver<FlowRecord>) {
        info!("Flow ingest pipeline started");
        let mut processed: u64 = 0;
        let mut rejected: u64 = 0;
        while let Some(record) = records.recv().await {
            processed += 1;
            if self.process(record) == Correlation::Rejected {
                rejected += 1;
            }
            if processed % 10_000 == 0 {
                debug!(
                    "{} records processed, {} rejected, {} sessions",
                    processed,
                    rejected,
                    self.correlator.len()
                );
            }
        }
        info!("Flow ingest pipeline stopped after {} records", processed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::types::FeedEvent;
    use crate::name_resolution::store::MemoryHostnameStore;
    use tokio::sync::mpsc;

    struct Fixture {
        pipeline: FlowIngestPipeline,
        cache: Arc<NameResolutionCache>,
        correlator: Arc<SessionCorrelator>,
        window: Arc<FlowWindow>,
        hub: Arc<LiveDistributionHub>,
    }

    fn fixture() -> Fixture {
        let correlator = Arc::new(SessionCorrelator::new(100));
        let hub = Arc::new(LiveDistributionHub::new(correlator.clone(), 16));
        let cache = Arc::new(NameResolutionCache::with_notifier(
            Arc::new(MemoryHostnameStore::new()),
            hub.clone(),
        ));
        let window = Arc::new(FlowWindow::new(10));
        Fixture {
            pipeline: FlowIngestPipeline::new(
                cache.clone(),
                correlator.clone(),
                window.clone(),
                hub.clone(),
            ),
            cache,
            correlator,
            window,
            hub,
        }
    }

    fn record(src: &str, dst: &str, bytes: u64) -> FlowRecord {
        FlowRecord::new(src.parse().unwrap(), dst.parse().unwrap(), bytes)
    }

    #[test]
    fn test_ingest_resolves_known_source() {
        let f = fixture();
        f.cache.apply_update("10.0.0.5".parse().unwrap(), "laptop");

        let resolved = f.pipeline.ingest(record("10.0.0.5:4000", "8.8.8.8:443", 1));

        assert_eq!(resolved.source_host, "laptop");
        assert_eq!(resolved.dest_host, "");
    }

    #[test]
    fn test_later_cache_update_does_not_rewrite_sessions() {
        let f = fixture();
        f.pipeline.process(record("10.0.0.5:4000", "8.8.8.8:443", 1));
        f.cache.apply_update("10.0.0.5".parse().unwrap(), "laptop");
        f.pipeline.process(record("10.0.0.5:4000", "8.8.8.8:443", 1));

        let sessions = f.correlator.snapshot();
        assert_eq!(sessions[0].source_host, "");
        assert_eq!(f.window.snapshot()[0].source_host, "laptop");
    }

    #[test]
    fn test_process_publishes_every_counter_change() {
        let f = fixture();
        let mut observer = f.hub.subscribe();

        f.pipeline.process(record("10.0.0.5:4000", "8.8.8.8:443", 100));
        f.pipeline.process(record("10.0.0.5:4000", "8.8.8.8:443", 20));

        let Some(FeedEvent::SessionUpdate(first)) = observer.try_recv() else {
            panic!("missing first update");
        };
        let Some(FeedEvent::SessionUpdate(second)) = observer.try_recv() else {
            panic!("missing second update");
        };
        assert_eq!(first.upload_bytes, 100);
        assert_eq!(second.upload_bytes, 120);
    }

    #[test]
    fn test_rejected_record_is_not_published_or_kept() {
        let f = fixture();
        let mut observer = f.hub.subscribe();
        let mut broken = record("10.0.0.5:4000", "8.8.8.8:443", 100);
        broken.source_addr = None;

        assert_eq!(f.pipeline.process(broken), Correlation::Rejected);

        assert!(observer.try_recv().is_none());
        assert!(f.window.is_empty());
        assert!(f.correlator.is_empty());
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let f = fixture();
        let (tx, rx) = mpsc::channel(8);
        let correlator = f.correlator.clone();
        let task = tokio::spawn(f.pipeline.run(rx));

        tx.send(record("10.0.0.5:4000", "1.1.1.1:80", 10)).await.unwrap();
        tx.send(record("10.0.0.5:4001", "1.1.1.1:80", 5)).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let sessions = correlator.snapshot();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].upload_bytes, 15);
    }
}
