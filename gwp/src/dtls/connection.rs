use crate::config::TransportConfig;
use crate::dtls::DtlsConfig;
use crate::errors::TransportError;
use crate::request::Request;
use crate::transport::{
    check_written, resolve, unspecified_for, warn_oversize, Listener, Peer, ReadLoop, RequestSink, Requests,
};
use async_trait::async_trait;
use libgwp::Packet;
use log::*;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use webrtc_dtls::conn::DTLSConn;
use webrtc_util::conn::Conn;

/// One DTLS session, either dialed by us or accepted by a [`super::DtlsListener`].
pub struct DtlsConnection {
    session: Arc<Session>,
    local_addr: SocketAddr,
    requests: Requests,
    read_loop: ReadLoop,
}

impl DtlsConnection {
    /// Perform a DTLS handshake with the server at `addr` and start receiving. `:port` means localhost.
    pub async fn dial(addr: &str, dtls_config: DtlsConfig, config: TransportConfig) -> Result<Self, TransportError> {
        let remote = resolve(addr, "127.0.0.1").await?;
        let socket = UdpSocket::bind(unspecified_for(&remote)).await?;
        socket.connect(remote).await?;
        let socket: Arc<dyn Conn + Send + Sync> = Arc::new(socket);
        let conn = DTLSConn::new(socket, dtls_config, true, None).await?;
        debug!("DTLS handshake with {remote} complete");
        Self::start(Arc::new(conn), remote, config)
    }

    /// Start the read loop on an established session.
    pub(crate) fn start(
        conn: Arc<dyn Conn + Send + Sync>,
        remote_addr: SocketAddr,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let local_addr = conn.local_addr()?;
        let session = Arc::new(Session { conn, remote_addr, max_packet_size: config.max_packet_size });
        let (sender, requests) = Requests::channel(config.request_channel_len);
        let cancel = CancellationToken::new();
        let sink = RequestSink::new(sender, cancel.clone());
        let read_loop = ReadLoop::spawn(cancel.clone(), read_loop(session.clone(), sink, cancel, config));
        Ok(Self { session, local_addr, requests, read_loop })
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.session.remote_addr
    }
}

#[async_trait]
impl Listener for DtlsConnection {
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
impl Peer for DtlsConnection {
    async fn send(&self, packet: &Packet) -> Result<(), TransportError> {
        self.session.send(packet).await
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.session.remote_addr)
    }
}

/// The encrypted session itself. Requests read from it carry it as their reply handle.
struct Session {
    conn: Arc<dyn Conn + Send + Sync>,
    remote_addr: SocketAddr,
    max_packet_size: usize,
}

#[async_trait]
impl Peer for Session {
    async fn send(&self, packet: &Packet) -> Result<(), TransportError> {
        let buffer = libgwp::encode(packet)?;
        warn_oversize("outbound", &self.remote_addr, buffer.len(), self.max_packet_size);
        let written = self.conn.send(&buffer).await?;
        check_written(buffer.len(), written)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.remote_addr)
    }
}

/// The largest record the DTLS layer will hand us. The read buffer never goes below this.
const MAX_RECORD_SIZE: usize = 8192;

/// The session is over, either closed locally or by the peer's close_notify.
fn is_end_of_stream(err: &webrtc_util::Error) -> bool {
    matches!(
        err.downcast_ref::<webrtc_dtls::Error>(),
        Some(webrtc_dtls::Error::ErrConnClosed | webrtc_dtls::Error::ErrAlertFatalOrClose)
    )
}

/// A record did not fit the read buffer. The record is lost but the session is intact.
fn is_record_too_large(err: &webrtc_util::Error) -> bool {
    matches!(err.downcast_ref::<webrtc_dtls::Error>(), Some(webrtc_dtls::Error::ErrBufferTooSmall))
}

async fn read_loop(session: Arc<Session>, mut sink: RequestSink, cancel: CancellationToken, config: TransportConfig) {
    let remote_addr = session.remote_addr;
    let read_timeout = config.read_timeout();
    let mut buffer = vec![0u8; config.read_buffer_size.max(MAX_RECORD_SIZE)];
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let n = match timeout(read_timeout, session.conn.recv(&mut buffer)).await {
            Err(_) => continue,
            Ok(Ok(n)) => n,
            Ok(Err(err)) if is_end_of_stream(&err) => {
                debug!("DTLS session with {remote_addr} ended");
                break;
            }
            Ok(Err(err)) if is_record_too_large(&err) => {
                warn!("Dropping DTLS record from {remote_addr} larger than {} bytes", buffer.len());
                continue;
            }
            Ok(Err(err)) => {
                warn!("DTLS read error from {remote_addr}, ending session: {err}");
                break;
            }
        };
        warn_oversize("inbound", &remote_addr, n, config.max_packet_size);
        let packet = match libgwp::decode(&buffer[..n]) {
            Ok(packet) => packet,
            Err(err) => {
                warn!("Dropping DTLS record from {remote_addr} ({n} bytes): {err}");
                continue;
            }
        };
        trace!("DTLS received {packet} from {remote_addr}");
        let peer: Arc<dyn Peer> = session.clone();
        if !sink.push(Request::new(peer, remote_addr, packet)).await {
            break;
        }
    }
    if let Err(err) = session.conn.close().await {
        debug!("Closing DTLS session with {remote_addr}: {err}");
    }
    debug!("DTLS read loop for {remote_addr} stopped");
}
