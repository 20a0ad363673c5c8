use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;

use super::Direction;
use crate::flow::types::{FlowRecord, ResolvedFlowRecord, SessionKey};

/// One row of the live view: every connection from `source_addr` to
/// `dest_addr:dest_port`, both directions merged.
///
/// `download_bytes == 0` only means no reply record has been matched yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub source_addr: IpAddr,
    pub dest_addr: IpAddr,
    pub dest_port: u16,
    pub protocol: u8,
    /// Hostnames as resolved when the session was opened, never refreshed
    pub source_host: String,
    pub dest_host: String,
    pub upload_bytes: u64,
    pub download_bytes: u64,
    pub upload_packets: u64,
    pub download_packets: u64,
    pub first_switched: u64,
    pub last_switched: u64,
    pub bidirectional: bool,
    /// Connections opened into this row, one per source port seen
    pub connections: usize,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    /// Empty counters, identity and hostnames taken from the opening record.
    pub fn open(key: SessionKey, resolved: &ResolvedFlowRecord) -> Self {
        Self {
            source_addr: key.source_addr,
            dest_addr: key.dest_addr,
            dest_port: key.dest_port,
            protocol: resolved.record.protocol,
            source_host: resolved.source_host.clone(),
            dest_host: resolved.dest_host.clone(),
            upload_bytes: 0,
            download_bytes: 0,
            upload_packets: 0,
            download_packets: 0,
            first_switched: resolved.record.first_switched,
            last_switched: resolved.record.last_switched,
            bidirectional: false,
            connections: 0,
            last_seen: Utc::now(),
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey {
            source_addr: self.source_addr,
            dest_addr: self.dest_addr,
            dest_port: self.dest_port,
        }
    }

    /// Adds the record's counters to one side and widens the switched range.
    ///
    /// Re-exports of long-lived connections are summed, never replaced.
    pub fn account(&mut self, direction: Direction, record: &FlowRecord) {
        match direction {
            Direction::Upload => {
                self.upload_bytes = self.upload_bytes.saturating_add(record.in_bytes);
                self.upload_packets = self.upload_packets.saturating_add(record.in_packets);
            }
            Direction::Download => {
                self.download_bytes = self.download_bytes.saturating_add(record.in_bytes);
                self.download_packets = self.download_packets.saturating_add(record.in_packets);
                self.bidirectional = true;
            }
        }
        self.first_switched = self.first_switched.min(record.first_switched);
        self.last_switched = self.last_switched.max(record.last_switched);
        self.last_seen = Utc::now();
    }

    pub fn total_bytes(&self) -> u64 {
        self.upload_bytes.saturating_add(self.download_bytes)
    }
}
