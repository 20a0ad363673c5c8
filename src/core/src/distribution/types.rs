use serde::Serialize;

use crate::name_resolution::types::HostEntry;
use crate::session_management::session::Session;

/// Message pushed to observers.
///
/// Serialized with a `type` tag next to the payload fields:
/// `{"type":"sessionUpdate","source_addr":...}` or
/// `{"type":"cacheUpdate","address":...,"hostname":...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    /// Full current state of a session after a counter change.
    #[serde(rename = "sessionUpdate")]
    SessionUpdate(Session),
    /// A hostname that actually changed in the cache.
    #[serde(rename = "cacheUpdate")]
    CacheUpdate(HostEntry),
}

impl FeedEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
