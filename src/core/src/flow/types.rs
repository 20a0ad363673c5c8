//! Unidirectional flow records as handed over by the decoder.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// One exporter's summary of a single direction of a connection.
///
/// Field names on the wire follow the NetFlow v9 / IPFIX element names used by
/// common exporters. Anything the decoder does not know about is kept in
/// `extra` and written back out untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowRecord {
    #[serde(rename = "ipv4_src_addr", default, deserialize_with = "optional_address")]
    pub source_addr: Option<IpAddr>,
    #[serde(rename = "l4_src_port", default)]
    pub source_port: u16,
    #[serde(rename = "ipv4_dst_addr", default, deserialize_with = "optional_address")]
    pub dest_addr: Option<IpAddr>,
    #[serde(rename = "l4_dst_port", default)]
    pub dest_port: u16,
    #[serde(default)]
    pub protocol: u8,
    #[serde(default)]
    pub in_bytes: u64,
    #[serde(rename = "in_pkts", default)]
    pub in_packets: u64,
    /// Exporter uptime counter, not wall-clock
    #[serde(default)]
    pub first_switched: u64,
    #[serde(default)]
    pub last_switched: u64,
    #[serde(
        rename = "postNATSourceIPv4Address",
        default,
        deserialize_with = "optional_address"
    )]
    pub nat_source_addr: Option<IpAddr>,
    #[serde(rename = "postNAPTSourceTransportPort", default)]
    pub nat_source_port: u16,
    #[serde(
        rename = "postNATDestinationIPv4Address",
        default,
        deserialize_with = "optional_address"
    )]
    pub nat_dest_addr: Option<IpAddr>,
    #[serde(rename = "postNAPTDestinationTransportPort", default)]
    pub nat_dest_port: u16,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Empty strings are how exporters say "no address".
fn optional_address<'de, D>(deserializer: D) -> Result<Option<IpAddr>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn usable(addr: Option<IpAddr>) -> Option<IpAddr> {
    addr.filter(|a| !a.is_unspecified())
}

impl FlowRecord {
    pub fn new(source: SocketAddr, dest: SocketAddr, in_bytes: u64) -> Self {
        Self {
            source_addr: Some(source.ip()),
            source_port: source.port(),
            dest_addr: Some(dest.ip()),
            dest_port: dest.port(),
            in_bytes,
            ..Default::default()
        }
    }

    pub fn with_nat(mut self, nat_source: SocketAddr, nat_dest: SocketAddr) -> Self {
        self.nat_source_addr = Some(nat_source.ip());
        self.nat_source_port = nat_source.port();
        self.nat_dest_addr = Some(nat_dest.ip());
        self.nat_dest_port = nat_dest.port();
        self
    }

    pub fn with_switched(mut self, first: u64, last: u64) -> Self {
        self.first_switched = first;
        self.last_switched = last;
        self
    }

    pub fn with_packets(mut self, packets: u64) -> Self {
        self.in_packets = packets;
        self
    }

    pub fn with_protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    /// Exact 4-tuple this record reports traffic for.
    ///
    /// `None` when the source address is missing or `0.0.0.0`, or when there is
    /// no destination: such records are incomplete exports.
    pub fn forward_key(&self) -> Option<FlowKey> {
        Some(FlowKey {
            source_addr: usable(self.source_addr)?,
            source_port: self.source_port,
            dest_addr: self.dest_addr?,
            dest_port: self.dest_port,
        })
    }

    /// Forward key of the opposite direction, derived from the post-NAT fields.
    pub fn nat_reverse_key(&self) -> Option<FlowKey> {
        Some(FlowKey {
            source_addr: usable(self.nat_dest_addr)?,
            source_port: self.nat_dest_port,
            dest_addr: usable(self.nat_source_addr)?,
            dest_port: self.nat_source_port,
        })
    }
}

/// A flow record enriched with the hostnames known when it arrived.
///
/// An empty hostname means the address was not resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFlowRecord {
    #[serde(flatten)]
    pub record: FlowRecord,
    pub source_host: String,
    pub dest_host: String,
}

/// `(sourceAddr:sourcePort -> destAddr:destPort)` of one unidirectional flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub source_addr: IpAddr,
    pub source_port: u16,
    pub dest_addr: IpAddr,
    pub dest_port: u16,
}

impl FlowKey {
    /// The session row this connection collapses into once the source port is dropped.
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            source_addr: self.source_addr,
            dest_addr: self.dest_addr,
            dest_port: self.dest_port,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            SocketAddr::new(self.source_addr, self.source_port),
            SocketAddr::new(self.dest_addr, self.dest_port)
        )
    }
}

/// `(sourceAddr -> destAddr:destPort)`, the identity of a session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionKey {
    pub source_addr: IpAddr,
    pub dest_addr: IpAddr,
    pub dest_port: u16,
}

impl SessionKey {
    pub fn connection(&self, source_port: u16) -> FlowKey {
        FlowKey {
            source_addr: self.source_addr,
            source_port,
            dest_addr: self.dest_addr,
            dest_port: self.dest_port,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.source_addr,
            SocketAddr::new(self.dest_addr, self.dest_port)
        )
    }
}
