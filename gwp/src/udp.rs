//! Plain UDP transport.
//!
//! One socket, one read loop. The same type serves as a listener (bound, receive only) and as a client connection
//! (connected to one remote address, receive and send).
//!
//! The read loop holds the only strong reference to the socket. Everything else, the connection itself and the reply
//! handles of its requests, holds a weak one, so the socket is released as soon as `close()` returns.

use crate::config::TransportConfig;
use crate::errors::TransportError;
use crate::request::Request;
use crate::transport::{
    check_written, resolve, unspecified_for, warn_oversize, Listener, Peer, ReadLoop, RequestSink, Requests,
};
use async_trait::async_trait;
use libgwp::Packet;
use log::*;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub struct UdpConnection {
    socket: Weak<UdpSocket>,
    local_addr: SocketAddr,
    remote_addr: Option<SocketAddr>,
    max_packet_size: usize,
    requests: Requests,
    read_loop: ReadLoop,
}

impl UdpConnection {
    /// Bind to `addr` and start receiving. `:port` binds to all interfaces.
    pub async fn listen(addr: &str, config: TransportConfig) -> Result<Self, TransportError> {
        let local = resolve(addr, "0.0.0.0").await?;
        let socket = UdpSocket::bind(local).await?;
        Self::start(socket, None, config)
    }

    /// Connect to the server at `addr` and start receiving its replies. `:port` means localhost.
    pub async fn dial(addr: &str, config: TransportConfig) -> Result<Self, TransportError> {
        let remote = resolve(addr, "127.0.0.1").await?;
        let socket = UdpSocket::bind(unspecified_for(&remote)).await?;
        socket.connect(remote).await?;
        Self::start(socket, Some(remote), config)
    }

    fn start(socket: UdpSocket, remote_addr: Option<SocketAddr>, config: TransportConfig) -> Result<Self, TransportError> {
        let local_addr = socket.local_addr()?;
        let socket = Arc::new(socket);
        let handle = Arc::downgrade(&socket);
        let (sender, requests) = Requests::channel(config.request_channel_len);
        let cancel = CancellationToken::new();
        let sink = RequestSink::new(sender, cancel.clone());
        let max_packet_size = config.max_packet_size;
        let task = read_loop(socket, remote_addr.is_some(), sink, cancel.clone(), config);
        let read_loop = ReadLoop::spawn(cancel, task);
        match remote_addr {
            Some(remote) => debug!("UDP connection {local_addr} -> {remote} started"),
            None => debug!("UDP listener on {local_addr} started"),
        }
        Ok(Self { socket: handle, local_addr, remote_addr, max_packet_size, requests, read_loop })
    }
}

#[async_trait]
impl Listener for UdpConnection {
    fn requests(&self) -> Requests {
        self.requests.clone()
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.read_loop.stop().await
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl Peer for UdpConnection {
    /// Send a packet to the connected server. Fails on a listener, since its socket has no default destination.
    async fn send(&self, packet: &Packet) -> Result<(), TransportError> {
        send_datagram(&self.socket, None, packet, self.max_packet_size).await
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

/// Reply handle for the sender of one datagram.
struct UdpPeer {
    socket: Weak<UdpSocket>,
    remote_addr: SocketAddr,
    connected: bool,
    max_packet_size: usize,
}

#[async_trait]
impl Peer for UdpPeer {
    async fn send(&self, packet: &Packet) -> Result<(), TransportError> {
        let target = if self.connected { None } else { Some(self.remote_addr) };
        send_datagram(&self.socket, target, packet, self.max_packet_size).await
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.remote_addr)
    }
}

async fn send_datagram(
    socket: &Weak<UdpSocket>,
    target: Option<SocketAddr>,
    packet: &Packet,
    max_packet_size: usize,
) -> Result<(), TransportError> {
    let socket = socket.upgrade().ok_or(TransportError::Closed)?;
    let buffer = libgwp::encode(packet)?;
    let written = match target {
        Some(addr) => {
            warn_oversize("outbound", &addr, buffer.len(), max_packet_size);
            socket.send_to(&buffer, addr).await?
        }
        None => {
            if let Ok(addr) = socket.peer_addr() {
                warn_oversize("outbound", &addr, buffer.len(), max_packet_size);
            }
            socket.send(&buffer).await?
        }
    };
    check_written(buffer.len(), written)
}

async fn read_loop(
    socket: Arc<UdpSocket>,
    connected: bool,
    mut sink: RequestSink,
    cancel: CancellationToken,
    config: TransportConfig,
) {
    let local_addr = socket.local_addr().map(|a| a.to_string()).unwrap_or_default();
    let read_timeout = config.read_timeout();
    let mut buffer = vec![0u8; config.read_buffer_size];
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let (n, remote_addr) = match timeout(read_timeout, socket.recv_from(&mut buffer)).await {
            // Deadline expired. Not an error, just a chance to notice cancellation.
            Err(_) => continue,
            Ok(Err(err)) => {
                warn!("UDP read error on {local_addr}: {err}");
                continue;
            }
            Ok(Ok(read)) => read,
        };
        warn_oversize("inbound", &remote_addr, n, config.max_packet_size);
        let packet = match libgwp::decode(&buffer[..n]) {
            Ok(packet) => packet,
            Err(err) => {
                warn!("Dropping datagram from {remote_addr} ({n} bytes): {err}");
                continue;
            }
        };
        trace!("UDP {local_addr} received {packet} from {remote_addr}");
        let max_packet_size = config.max_packet_size;
        let peer = Arc::new(UdpPeer { socket: Arc::downgrade(&socket), remote_addr, connected, max_packet_size });
        if !sink.push(Request::new(peer, remote_addr, packet)).await {
            break;
        }
    }
    drop(socket);
    debug!("UDP read loop on {local_addr} stopped, socket released");
}

#[cfg(test)]
mod test {
    use super::*;
    use libgwp::{Address, Data, Payload, PayloadKind};
    use std::time::Duration;

    fn config() -> TransportConfig {
        TransportConfig::default().with_read_timeout(Duration::from_millis(50)).with_request_channel_len(8)
    }

    async fn listener() -> UdpConnection {
        UdpConnection::listen("127.0.0.1:0", config()).await.expect("listener to bind")
    }

    #[tokio::test]
    async fn listener_receives_and_replies() {
        env_logger::try_init().ok();
        let server = listener().await;
        let client = UdpConnection::dial(&server.local_addr().to_string(), config()).await.unwrap();
        assert_eq!(client.peer_addr(), Some(server.local_addr()));

        let ping = Packet::new(Data { r#type: 1, id: 1, data: vec![1, 2, 3] }).with_id(10).with_from(Address::b32(5));
        client.send(&ping).await.unwrap();
        let request = server.requests().next().await.expect("a request");
        assert_eq!(request.packet, ping);
        assert_eq!(request.remote_addr.port(), client.local_addr().port());
        assert_eq!(request.peer.peer_addr(), Some(request.remote_addr));

        let pong = request.packet.response(Data { r#type: 1, id: 2, data: vec![] });
        request.reply(&pong).await.unwrap();
        let reply = client.requests().next().await.expect("a reply");
        assert_eq!(reply.packet.response_to, Some(10));
        assert_eq!(reply.payload_kind(), Some(PayloadKind::Data));

        client.close().await.unwrap();
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn garbage_and_oversize_datagrams() {
        env_logger::try_init().ok();
        let server = listener().await;
        let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        raw.connect(server.local_addr()).await.unwrap();
        // Undecodable, dropped
        raw.send(&[0x2a, 0x7f, 0x01]).await.unwrap();
        // Oversize, still delivered
        let big = Packet::new(Data { r#type: 1, id: 99, data: vec![7; 400] });
        assert!(big.is_oversize());
        raw.send(&libgwp::encode(&big).unwrap()).await.unwrap();

        let request = server.requests().next().await.expect("the oversize packet");
        match request.packet.payload {
            Some(Payload::Data(data)) => assert_eq!(data.id, 99),
            other => panic!("unexpected payload {other:?}"),
        }
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_terminates_requests() {
        let server = listener().await;
        let requests = server.requests();
        server.close().await.unwrap();
        assert!(requests.next().await.is_none());
        // Only the first close does anything
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn listener_cannot_send() {
        let server = listener().await;
        assert!(server.peer_addr().is_none());
        let err = server.send(&Packet::new(Data::default())).await;
        assert!(matches!(err, Err(TransportError::Io(_))));
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_does_not_hang_on_a_full_channel() {
        let server = UdpConnection::listen("127.0.0.1:0", config().with_request_channel_len(1)).await.unwrap();
        let client = UdpConnection::dial(&server.local_addr().to_string(), config()).await.unwrap();
        for id in 0..5 {
            client.send(&Packet::new(Data { id, ..Default::default() })).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::time::timeout(Duration::from_secs(2), server.close()).await.expect("close to finish").unwrap();
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_releases_the_port() {
        env_logger::try_init().ok();
        let server = listener().await;
        let addr = server.local_addr();
        server.close().await.unwrap();
        let rebound = UdpSocket::bind(addr).await.expect("the port to be free again");
        assert_eq!(rebound.local_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn sending_after_close_fails() {
        env_logger::try_init().ok();
        let server = listener().await;
        let client = UdpConnection::dial(&server.local_addr().to_string(), config()).await.unwrap();
        client.send(&Packet::new(Data { id: 1, ..Default::default() })).await.unwrap();
        let request = server.requests().next().await.expect("a request");

        client.close().await.unwrap();
        let err = client.send(&Packet::new(Data { id: 2, ..Default::default() })).await;
        assert!(matches!(err, Err(TransportError::Closed)));

        // Reply handles do not keep a closed listener's socket alive either
        server.close().await.unwrap();
        let err = request.reply(&request.packet.response(Data::default())).await;
        assert!(matches!(err, Err(TransportError::Closed)));
    }
}
