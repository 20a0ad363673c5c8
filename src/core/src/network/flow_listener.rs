//! # Flow Listener Module
//!
//! Receives flow export datagrams over UDP and hands the decoded records to the
//! ingest pipeline through an async channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌────────────────────┐
//! │ Flow exporter   │───▶│ FlowListener     │───▶│ FlowIngestPipeline │
//! │ (UDP datagrams) │    │                  │    │ (via mpsc)         │
//! └─────────────────┘    │ - FlowDecoder    │    └────────────────────┘
//!                        └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use flowlens::network::{FlowListener, JsonFlowDecoder};
//! use flowlens::error_handling::types::NetworkError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), NetworkError> {
//!     let (tx, mut rx) = mpsc::channel(1024);
//!     let listener = FlowListener::bind("0.0.0.0", 3000, tx, Arc::new(JsonFlowDecoder::new())).await?;
//!
//!     tokio::spawn(async move { listener.start_listening().await });
//!
//!     while let Some(record) = rx.recv().await {
//!         println!("{:?}", record);
//!     }
//!     Ok(())
//! }
//! ```

use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::Sender;

use super::flow_decoder::FlowDecoder;
use crate::error_handling::types::NetworkError;
use crate::flow::types::FlowRecord;

/// Largest UDP payload an exporter can send.
const MAX_DATAGRAM: usize = 65_535;

/// UDP socket receiving flow exports.
///
/// `FlowListener` is responsible for:
/// - Owning the bound collector socket
/// - Decoding each datagram with the injected [`FlowDecoder`]
/// - Forwarding every decoded record to the ingest pipeline
///
/// A datagram that fails to decode is logged and dropped, the loop keeps going.
pub struct FlowListener {
    /// Bound collector socket
    socket: UdpSocket,

    /// Channel sender towards the ingest pipeline
    flow_tx: Sender<FlowRecord>,

    /// Wire format adapter
    decoder: Arc<dyn FlowDecoder>,
}

impl FlowListener {
    /// Binds the collector socket.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindError`] when the address is invalid, already
    /// in use or not permitted.
    pub async fn bind(
        address: &str,
        port: u16,
        flow_tx: Sender<FlowRecord>,
        decoder: Arc<dyn FlowDecoder>,
    ) -> Result<Self, NetworkError> {
        let socket = UdpSocket::bind((address, port))
            .await
            .map_err(NetworkError::BindError)?;
        Ok(Self {
            socket,
            flow_tx,
            decoder,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.socket.local_addr().map_err(NetworkError::SockError)
    }

    /// Receives datagrams until the pipeline goes away.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::SockError`] if reading from the socket fails
    /// - [`NetworkError::ChannelFailed`] once the pipeline has dropped its receiver
    pub async fn start_listening(&self) -> Result<(), NetworkError> {
        info!("Collecting flow exports on {}", self.local_addr()?);
        let mut buffer = vec![0u8; MAX_DATAGRAM];

        loop {
            let (n, peer) = self
                .socket
                .recv_from(&mut buffer)
                .await
                .map_err(NetworkError::SockError)?;
            self.handle_datagram(&buffer[..n], peer).await?;
        }
    }

    async fn handle_datagram(&self, packet: &[u8], peer: SocketAddr) -> Result<(), NetworkError> {
        let records = match self.decoder.decode(packet) {
            Ok(records) => records,
            Err(e) => {
                warn!("Dropping {} byte export from {}: {}", packet.len(), peer, e);
                return Ok(());
            }
        };
        debug!("{} flow records from {}", records.len(), peer);

        for record in records {
            self.flow_tx
                .send(record)
                .await
                .map_err(|_| NetworkError::ChannelFailed)?;
        }
        Ok(())
    }
}
