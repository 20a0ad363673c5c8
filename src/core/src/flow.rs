//! Flow records and the path they take before correlation.
//!
//! - `types`: decoded records, resolved records and the correlation keys.
//! - `pipeline`: hostname enrichment and the ingest loop feeding the correlator.
//! - `window`: bounded ring of the most recent resolved records.

pub mod pipeline;
pub mod types;
pub mod window;

pub use pipeline::FlowIngestPipeline;
pub use types::{FlowKey, FlowRecord, ResolvedFlowRecord, SessionKey};
pub use window::FlowWindow;
