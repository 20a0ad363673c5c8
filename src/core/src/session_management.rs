//! Session correlation core.
//!
//! Unidirectional flow records are matched into bidirectional sessions here.
//! A record either extends the connection it reports (upload), is recognised
//! through its post-NAT fields as the reply of a known connection (download),
//! or opens a new connection. Connections sharing
//! `(source address -> destination address:port)` collapse into one session row.

/// Shared, lock-protected handle used by the rest of the service.
pub mod correlator;
/// Session rows and their counters.
pub mod session;
/// The matching algorithm and the bounded session table.
pub mod table;

pub use correlator::SessionCorrelator;
pub use session::Session;
pub use table::{Correlation, SessionTable};

/// Which side of a session a record is accounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Initiator towards the destination service.
    Upload,
    /// Reply traffic, recognised through the NAT reverse key.
    Download,
}
