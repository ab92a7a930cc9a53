use crate::errors::TransportError;
use crate::transport::Peer;
use chrono::{DateTime, Utc};
use libgwp::{Packet, PayloadKind};
use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;

/// A decoded inbound packet, along with where it came from and when it arrived.
#[derive(Clone)]
pub struct Request {
    /// The endpoint the packet arrived on. Replies sent through it go back to the originator.
    pub peer: Arc<dyn Peer>,
    pub remote_addr: SocketAddr,
    pub packet: Packet,
    pub timestamp: DateTime<Utc>,
}

impl Request {
    /// Wrap a packet that was received just now.
    pub fn new(peer: Arc<dyn Peer>, remote_addr: SocketAddr, packet: Packet) -> Self {
        Self { peer, remote_addr, packet, timestamp: Utc::now() }
    }

    pub fn payload_kind(&self) -> Option<PayloadKind> {
        self.packet.payload_kind()
    }

    pub async fn reply(&self, packet: &Packet) -> Result<(), TransportError> {
        self.peer.send(packet).await
    }
}

impl Debug for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("remote_addr", &self.remote_addr)
            .field("packet", &self.packet)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
