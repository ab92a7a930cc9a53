use crate::config::TransportConfig;
use crate::dtls::{DtlsConfig, DtlsConnection};
use crate::errors::TransportError;
use crate::request::Request;
use crate::transport::{resolve, Listener, ReadLoop, RequestSink, Requests};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::FutureExt;
use log::*;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use webrtc_util::conn::Listener as SessionListener;

type PeerMap = Arc<RwLock<HashMap<SocketAddr, Arc<DtlsConnection>>>>;

/// Accepts DTLS sessions and merges the requests of all connected peers into one channel.
pub struct DtlsListener {
    local_addr: SocketAddr,
    listener: Arc<dyn SessionListener + Send + Sync>,
    requests: Requests,
    peers: PeerMap,
    accept_loop: ReadLoop,
    closed: AtomicBool,
}

impl DtlsListener {
    /// Listen for DTLS handshakes on `addr`. `:port` binds to all interfaces.
    pub async fn listen(addr: &str, dtls_config: DtlsConfig, config: TransportConfig) -> Result<Self, TransportError> {
        let local = resolve(addr, "0.0.0.0").await?;
        let listener = webrtc_dtls::listener::listen(local, dtls_config).await?;
        let local_addr = listener.addr().await?;
        let listener: Arc<dyn SessionListener + Send + Sync> = Arc::new(listener);
        let (sender, requests) = Requests::channel(config.request_channel_len);
        let peers = PeerMap::default();
        let cancel = CancellationToken::new();
        let task = accept_loop(listener.clone(), peers.clone(), sender, cancel.clone(), config);
        let accept_loop = ReadLoop::spawn(cancel, task);
        debug!("DTLS listener on {local_addr} started");
        Ok(Self { local_addr, listener, requests, peers, accept_loop, closed: AtomicBool::new(false) })
    }

    /// The number of peers with a live session.
    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }
}

#[async_trait]
impl Listener for DtlsListener {
    fn requests(&self) -> Requests {
        self.requests.clone()
    }

    /// Stop accepting, close the socket and every peer session, and wait for all of it to wind down.
    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.accept_loop.cancel();
        if let Err(err) = self.listener.close().await {
            warn!("Error closing DTLS listener on {}: {err}", self.local_addr);
        }
        // The accept loop closes the peer sessions on its way out
        self.accept_loop.stop().await
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

async fn accept_loop(
    listener: Arc<dyn SessionListener + Send + Sync>,
    peers: PeerMap,
    sender: mpsc::Sender<Request>,
    cancel: CancellationToken,
    config: TransportConfig,
) {
    let mut forwarders = JoinSet::new();
    loop {
        let accepted = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        // Reap forwarders of peers that have gone away
        while let Some(Some(_)) = forwarders.join_next().now_or_never() {}
        let (conn, remote_addr) = match accepted {
            Ok(accepted) => accepted,
            Err(webrtc_util::Error::ErrClosedListener | webrtc_util::Error::ErrClosedListenerAcceptCh) => {
                debug!("DTLS listener closed");
                break;
            }
            Err(err) => {
                warn!("DTLS accept failed: {err}");
                continue;
            }
        };
        let connection = match DtlsConnection::start(conn, remote_addr, config.clone()) {
            Ok(connection) => Arc::new(connection),
            Err(err) => {
                warn!("Could not start DTLS session with {remote_addr}: {err}");
                continue;
            }
        };
        info!("DTLS peer {remote_addr} connected");
        peers.write().await.insert(remote_addr, connection.clone());
        let peer_requests = connection.requests();
        let mut sink = RequestSink::new(sender.clone(), cancel.clone());
        let peers = peers.clone();
        forwarders.spawn(async move {
            while let Some(request) = peer_requests.next().await {
                if !sink.push(request).await {
                    break;
                }
            }
            peers.write().await.remove(&remote_addr);
            if let Err(err) = connection.close().await {
                warn!("Error closing DTLS session with {remote_addr}: {err}");
            }
            debug!("DTLS peer {remote_addr} removed");
        });
    }
    let remaining: Vec<_> = peers.read().await.values().cloned().collect();
    for peer in remaining {
        if let Err(err) = peer.close().await {
            warn!("Error closing DTLS session with {}: {err}", peer.remote_addr());
        }
    }
    // Closed sessions end their request streams, which ends the forwarders
    while forwarders.join_next().await.is_some() {}
    debug!("DTLS accept loop stopped");
}
