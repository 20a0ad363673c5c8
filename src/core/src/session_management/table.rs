use log::{debug, trace};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::session::Session;
use super::Direction;
use crate::flow::types::{FlowKey, ResolvedFlowRecord, SessionKey};

/// Outcome of feeding one record to the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Correlation {
    /// Counted on the forward side of the returned session.
    Upload(Session),
    /// Recognised as reply traffic of the returned session.
    Download(Session),
    /// Incomplete export, nothing was counted.
    Rejected,
}

impl Correlation {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Correlation::Upload(s) | Correlation::Download(s) => Some(s),
            Correlation::Rejected => None,
        }
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            Correlation::Upload(s) | Correlation::Download(s) => Some(s),
            Correlation::Rejected => None,
        }
    }
}

struct SessionEntry {
    session: Session,
    source_ports: BTreeSet<u16>,
}

/// Default bound on the number of tracked forward 4-tuples.
pub const DEFAULT_MAX_CONNECTIONS: usize = 65_536;

/// Session table with a fixed capacity.
///
/// Sessions accumulate for as long as they are retained. When opening a new
/// session would exceed `max_sessions`, the session created first is evicted
/// together with its connections; totals are never recomputed.
///
/// Connections are bounded separately by `max_connections`. Past that bound
/// the oldest connection is forgotten while its session stays; a later record
/// on that port reopens the connection and keeps adding to the same row.
pub struct SessionTable {
    /// Every known forward 4-tuple
    connections: HashSet<FlowKey>,
    /// Connections in opening order, oldest at the front. May hold keys that
    /// were already dropped with their session.
    connection_order: VecDeque<FlowKey>,
    sessions: HashMap<SessionKey, SessionEntry>,
    /// Session keys in creation order, oldest at the front
    arrival: VecDeque<SessionKey>,
    max_sessions: usize,
    max_connections: usize,
    evicted: u64,
}

impl SessionTable {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            connections: HashSet::new(),
            connection_order: VecDeque::new(),
            sessions: HashMap::new(),
            arrival: VecDeque::new(),
            max_sessions: max_sessions.max(1),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            evicted: 0,
        }
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Matches one record against the table and applies its counters.
    ///
    /// 1. A record whose exact 4-tuple is a known connection is upload.
    /// 2. Otherwise, if its NAT reverse key names a known connection other than
    ///    itself, it is download on that connection's session.
    /// 3. Otherwise it opens a connection (and possibly a session) and is upload.
    pub fn correlate(&mut self, resolved: &ResolvedFlowRecord) -> Correlation {
        let record = &resolved.record;
        let Some(forward) = record.forward_key() else {
            debug!(
                "Dropping incomplete flow record (source {:?}, destination {:?})",
                record.source_addr, record.dest_addr
            );
            return Correlation::Rejected;
        };

        if self.connections.contains(&forward) {
            return self.account(forward.session_key(), Direction::Upload, resolved);
        }

        if let Some(reverse) = record.nat_reverse_key() {
            // Without NAT the post-NAT fields mirror the originals, so a
            // record can only point back at itself when both ends are equal.
            if reverse != forward && self.connections.contains(&reverse) {
                trace!("{} matched as reply of {}", forward, reverse);
                return self.account(reverse.session_key(), Direction::Download, resolved);
            }
        }

        self.open_connection(forward, resolved);
        self.account(forward.session_key(), Direction::Upload, resolved)
    }

    fn account(
        &mut self,
        key: SessionKey,
        direction: Direction,
        resolved: &ResolvedFlowRecord,
    ) -> Correlation {
        let Some(entry) = self.sessions.get_mut(&key) else {
            debug!("Connection without session {}, record dropped", key);
            return Correlation::Rejected;
        };
        entry.session.account(direction, &resolved.record);
        let session = entry.session.clone();
        match direction {
            Direction::Upload => Correlation::Upload(session),
            Direction::Download => Correlation::Download(session),
        }
    }

    fn open_connection(&mut self, forward: FlowKey, resolved: &ResolvedFlowRecord) {
        let key = forward.session_key();
        if !self.sessions.contains_key(&key) {
            while self.sessions.len() >= self.max_sessions {
                if !self.evict_oldest() {
                    break;
                }
            }
            trace!("Opening session {}", key);
            self.sessions.insert(
                key,
                SessionEntry {
                    session: Session::open(key, resolved),
                    source_ports: BTreeSet::new(),
                },
            );
            self.arrival.push_back(key);
        }

        while self.connection_order.len() >= self.max_connections {
            if !self.forget_oldest_connection() {
                break;
            }
        }

        if let Some(entry) = self.sessions.get_mut(&key) {
            entry.source_ports.insert(forward.source_port);
            entry.session.connections += 1;
        }
        self.connections.insert(forward);
        self.connection_order.push_back(forward);
    }

    fn forget_oldest_connection(&mut self) -> bool {
        let Some(oldest) = self.connection_order.pop_front() else {
            return false;
        };
        if self.connections.remove(&oldest) {
            if let Some(entry) = self.sessions.get_mut(&oldest.session_key()) {
                entry.source_ports.remove(&oldest.source_port);
            }
            trace!("Forgot connection {}", oldest);
        }
        true
    }

    fn evict_oldest(&mut self) -> bool {
        let Some(key) = self.arrival.pop_front() else {
            return false;
        };
        if let Some(entry) = self.sessions.remove(&key) {
            for port in entry.source_ports {
                self.connections.remove(&key.connection(port));
            }
            self.evicted += 1;
            debug!("Evicted session {}", key);
        }
        true
    }

    /// Current sessions, most recently created first.
    pub fn snapshot(&self) -> Vec<Session> {
        self.arrival
            .iter()
            .rev()
            .filter_map(|key| self.sessions.get(key))
            .map(|entry| entry.session.clone())
            .collect()
    }

    pub fn get(&self, key: &SessionKey) -> Option<&Session> {
        self.sessions.get(key).map(|entry| &entry.session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}
