use std::sync::{Mutex, MutexGuard, PoisonError};

use super::session::Session;
use super::table::{Correlation, SessionTable};
use crate::flow::types::{ResolvedFlowRecord, SessionKey};

/// Thread-safe handle on the session table.
///
/// Every mutation goes through a single lock, so concurrent updates to the
/// same session are applied one after the other and none is lost.
pub struct SessionCorrelator {
    table: Mutex<SessionTable>,
}

impl SessionCorrelator {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            table: Mutex::new(SessionTable::new(max_sessions)),
        }
    }

    pub fn with_limits(max_sessions: usize, max_connections: usize) -> Self {
        Self {
            table: Mutex::new(
                SessionTable::new(max_sessions).with_max_connections(max_connections),
            ),
        }
    }

    fn table(&self) -> MutexGuard<'_, SessionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn correlate(&self, resolved: &ResolvedFlowRecord) -> Correlation {
        self.table().correlate(resolved)
    }

    /// Current sessions, newest first, never more than `max_sessions`.
    pub fn snapshot(&self) -> Vec<Session> {
        self.table().snapshot()
    }

    pub fn get(&self, key: &SessionKey) -> Option<Session> {
        self.table().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    pub fn max_sessions(&self) -> usize {
        self.table().max_sessions()
    }

    pub fn connection_count(&self) -> usize {
        self.table().connection_count()
    }

    pub fn max_connections(&self) -> usize {
        self.table().max_connections()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::types::FlowRecord;
    use std::sync::Arc;

    fn resolved(record: FlowRecord) -> ResolvedFlowRecord {
        ResolvedFlowRecord {
            record,
            source_host: String::new(),
            dest_host: String::new(),
        }
    }

    #[test]
    fn test_end_to_end_forward_and_reverse() {
        let correlator = SessionCorrelator::new(1000);
        let forward = FlowRecord::new(
            "10.0.0.5:4000".parse().unwrap(),
            "8.8.8.8:443".parse().unwrap(),
            100,
        )
        .with_nat("10.0.0.5:4000".parse().unwrap(), "8.8.8.8:443".parse().unwrap());
        let reverse = FlowRecord::new(
            "8.8.8.8:443".parse().unwrap(),
            "10.0.0.5:4000".parse().unwrap(),
            50,
        )
        .with_nat("8.8.8.8:443".parse().unwrap(), "10.0.0.5:4000".parse().unwrap());

        correlator.correlate(&resolved(forward));
        correlator.correlate(&resolved(reverse));

        let sessions = correlator.snapshot();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].key().to_string(), "10.0.0.5 -> 8.8.8.8:443");
        assert_eq!(sessions[0].upload_bytes, 100);
        assert_eq!(sessions[0].download_bytes, 50);
    }

    #[test]
    fn test_end_to_end_port_collapsing() {
        let correlator = SessionCorrelator::new(1000);

        correlator.correlate(&resolved(FlowRecord::new(
            "10.0.0.5:4000".parse().unwrap(),
            "1.1.1.1:80".parse().unwrap(),
            30,
        )));
        correlator.correlate(&resolved(FlowRecord::new(
            "10.0.0.5:4001".parse().unwrap(),
            "1.1.1.1:80".parse().unwrap(),
            12,
        )));

        let sessions = correlator.snapshot();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].key().to_string(), "10.0.0.5 -> 1.1.1.1:80");
        assert_eq!(sessions[0].upload_bytes, 42);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let correlator = Arc::new(SessionCorrelator::new(1000));
        let record = resolved(FlowRecord::new(
            "10.0.0.5:4000".parse().unwrap(),
            "8.8.8.8:443".parse().unwrap(),
            3,
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let correlator = Arc::clone(&correlator);
                let record = record.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        correlator.correlate(&record);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let key = record.record.forward_key().unwrap().session_key();
        assert_eq!(correlator.get(&key).unwrap().upload_bytes, 8 * 250 * 3);
        assert_eq!(correlator.len(), 1);
    }

    #[test]
    fn test_snapshot_is_bounded() {
        let correlator = SessionCorrelator::new(5);
        for i in 0..50u16 {
            correlator.correlate(&resolved(FlowRecord::new(
                "10.0.0.5:4000".parse().unwrap(),
                format!("1.1.1.1:{}", 1000 + i).parse().unwrap(),
                1,
            )));
        }

        assert_eq!(correlator.snapshot().len(), 5);
        assert_eq!(correlator.max_sessions(), 5);
    }
}
