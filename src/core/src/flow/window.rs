use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::types::ResolvedFlowRecord;

/// Bounded ring of the most recently ingested records, newest first.
///
/// Used for display only, correlation never reads from it.
pub struct FlowWindow {
    records: Mutex<VecDeque<ResolvedFlowRecord>>,
    capacity: usize,
}

impl FlowWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, record: ResolvedFlowRecord) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.push_front(record);
        records.truncate(self.capacity);
    }

    pub fn snapshot(&self) -> Vec<ResolvedFlowRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
