//! The capability set every transport exposes.
//!
//! - A [`Listener`] produces a sequence of inbound [`Request`]s and can be closed.
//! - A [`Peer`] can send packets to the remote end it represents.
//! - A [`Connection`] is both.
//!
//! Every transport runs one background read loop that pushes decoded requests onto a bounded channel. The read loop
//! is owned by a [`ReadLoop`], which [`Listener::close`] uses to cancel it and wait for it to finish.

use crate::errors::TransportError;
use crate::request::Request;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{SinkExt, Stream, StreamExt};
use libgwp::Packet;
use log::*;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Something packets can be sent to.
#[async_trait]
pub trait Peer: Send + Sync {
    /// Encode and write a single packet. Never retries.
    async fn send(&self, packet: &Packet) -> Result<(), TransportError>;

    /// The transport address of the remote end, if there is exactly one.
    fn peer_addr(&self) -> Option<SocketAddr>;
}

#[async_trait]
pub trait Listener: Send + Sync {
    /// The inbound requests. Every call returns a handle onto the same underlying channel.
    fn requests(&self) -> Requests;

    /// Stop the read loop and wait for it to exit. Only the first call does any work.
    async fn close(&self) -> Result<(), TransportError>;

    fn local_addr(&self) -> SocketAddr;
}

/// A transport endpoint that can also send packets to its peer.
pub trait Connection: Listener + Peer {}

impl<T: Listener + Peer + ?Sized> Connection for T {}

/// A lazy sequence of inbound requests.
///
/// Cloned handles share one channel, so each request is delivered to exactly one of them. Once the read loop that
/// feeds the channel has stopped and any buffered requests are consumed, [`Requests::next`] returns `None` forever.
#[derive(Clone)]
pub struct Requests {
    inner: Arc<Mutex<mpsc::Receiver<Request>>>,
}

impl Requests {
    pub(crate) fn channel(len: usize) -> (mpsc::Sender<Request>, Requests) {
        let (sender, receiver) = mpsc::channel(len);
        (sender, Requests { inner: Arc::new(Mutex::new(receiver)) })
    }

    pub async fn next(&self) -> Option<Request> {
        self.inner.lock().await.next().await
    }

    pub fn into_stream(self) -> impl Stream<Item = Request> {
        futures::stream::unfold(self, |requests| async move { requests.next().await.map(|r| (r, requests)) })
    }
}

/// The producing end of a request channel, as held by a read loop.
pub(crate) struct RequestSink {
    sender: mpsc::Sender<Request>,
    cancel: CancellationToken,
}

impl RequestSink {
    pub(crate) fn new(sender: mpsc::Sender<Request>, cancel: CancellationToken) -> Self {
        Self { sender, cancel }
    }

    /// Push a request, waiting for room in the channel. Returns `false` if the request could not be delivered,
    /// because the loop was cancelled while waiting or all consumers are gone.
    pub(crate) async fn push(&mut self, request: Request) -> bool {
        tokio::select! {
            res = self.sender.send(request) => res.is_ok(),
            _ = self.cancel.cancelled() => false,
        }
    }
}

/// A cancellable background task, and the barrier `close` waits on.
pub(crate) struct ReadLoop {
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReadLoop {
    pub(crate) fn spawn<F>(cancel: CancellationToken, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        Self { cancel, handle: Mutex::new(Some(handle)) }
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel the task and wait until it has returned. Concurrent callers wait for the first one to finish.
    pub(crate) async fn stop(&self) -> Result<(), TransportError> {
        self.cancel.cancel();
        let mut handle = self.handle.lock().await;
        if let Some(handle) = handle.take() {
            handle.await?;
        }
        Ok(())
    }
}

/// Resolve a `host:port` string. An empty host, as in `:7000`, means `default_host`.
pub(crate) async fn resolve(addr: &str, default_host: &str) -> Result<SocketAddr, TransportError> {
    let full = if addr.starts_with(':') { format!("{default_host}{addr}") } else { addr.to_string() };
    let mut addrs = tokio::net::lookup_host(full.as_str()).await?;
    addrs.next().ok_or_else(|| TransportError::AddressResolution(addr.to_string()))
}

/// The wildcard address of the same family as `remote`, with an ephemeral port.
pub(crate) fn unspecified_for(remote: &SocketAddr) -> SocketAddr {
    let ip = match remote {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, 0)
}

pub(crate) fn check_written(expected: usize, written: usize) -> Result<(), TransportError> {
    if written != expected {
        return Err(TransportError::ShortWrite { expected, written });
    }
    Ok(())
}

pub(crate) fn warn_oversize(direction: &str, addr: &SocketAddr, size: usize, max_packet_size: usize) {
    if size > max_packet_size {
        warn!("Oversize {direction} packet: addr={addr}, size={size}, max_packet_size={max_packet_size}");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::test_util::request_with;
    use libgwp::Data;
    use std::time::Duration;

    #[tokio::test]
    async fn requests_end_when_the_producer_is_gone() {
        let (sender, requests) = Requests::channel(4);
        let mut sink = RequestSink::new(sender, CancellationToken::new());
        assert!(sink.push(request_with(Data { id: 1, ..Default::default() })).await);
        assert!(sink.push(request_with(Data { id: 2, ..Default::default() })).await);
        drop(sink);
        let other = requests.clone();
        assert!(requests.next().await.is_some());
        assert!(other.next().await.is_some());
        assert!(requests.next().await.is_none());
        assert!(other.next().await.is_none());
    }

    #[tokio::test]
    async fn into_stream() {
        let (sender, requests) = Requests::channel(4);
        let mut sink = RequestSink::new(sender, CancellationToken::new());
        for id in 1..=3 {
            assert!(sink.push(request_with(Data { id, ..Default::default() })).await);
        }
        drop(sink);
        let ids: Vec<_> = requests
            .into_stream()
            .map(|r| match r.packet.payload {
                Some(libgwp::Payload::Data(data)) => data.id,
                _ => 0,
            })
            .collect()
            .await;
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn blocked_push_observes_cancellation() {
        let (sender, _requests) = Requests::channel(1);
        let cancel = CancellationToken::new();
        let mut sink = RequestSink::new(sender, cancel.clone());
        assert!(sink.push(request_with(Data::default())).await);
        let blocked = tokio::spawn(async move { sink.push(request_with(Data::default())).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        assert!(!blocked.await.unwrap());
    }

    #[tokio::test]
    async fn read_loop_stop_is_a_barrier() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let read_loop = ReadLoop::spawn(cancel, async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(());
        });
        read_loop.stop().await.unwrap();
        // The task finished before stop returned
        assert!(rx.await.is_ok());
        read_loop.stop().await.unwrap();
    }

    #[tokio::test]
    async fn resolves_empty_host() {
        let addr = resolve(":7000", "127.0.0.1").await.unwrap();
        assert_eq!(addr, "127.0.0.1:7000".parse().unwrap());
        assert_eq!(unspecified_for(&addr).port(), 0);
        assert!(unspecified_for(&addr).ip().is_unspecified());
    }
}
