//! Runs a handler over the requests of any number of listeners.

use crate::errors::ServerError;
use crate::handler::Handler;
use crate::transport::Listener;
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type ShutdownCallback = Box<dyn FnOnce() + Send>;

/// Glues listeners to a handler.
///
/// ```ignore
/// let server = Server::new().with_listener(udp).with_listener(dtls).with_handler(mux);
/// server.start()?;
/// // ...
/// server.shutdown().await?;
/// ```
///
/// Every request is handled on its own task, so a slow handler never holds up the listeners.
pub struct Server {
    listeners: Vec<Arc<dyn Listener>>,
    handler: Option<Arc<dyn Handler>>,
    done: CancellationToken,
    started: AtomicBool,
    shut_down: AtomicBool,
    shutdown_callbacks: Mutex<Vec<ShutdownCallback>>,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            handler: None,
            done: CancellationToken::new(),
            started: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            shutdown_callbacks: Mutex::new(Vec::new()),
            forwarders: Mutex::new(Vec::new()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener<L: Listener + 'static>(mut self, listener: Arc<L>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Set the handler for all requests. A later call replaces an earlier one.
    pub fn with_handler<H: Handler>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Register a function to run once the server has shut down. Callbacks run in registration order.
    pub fn on_shutdown<F: FnOnce() + Send + 'static>(self, callback: F) -> Self {
        lock(&self.shutdown_callbacks).push(Box::new(callback));
        self
    }

    pub fn listeners(&self) -> &[Arc<dyn Listener>] {
        &self.listeners
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shut_down.load(Ordering::SeqCst)
    }

    /// Start forwarding requests from every listener to the handler. Returns immediately.
    pub fn start(&self) -> Result<(), ServerError> {
        if self.started.load(Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }
        if self.listeners.is_empty() {
            return Err(ServerError::NoListeners);
        }
        let handler = self.handler.clone().ok_or(ServerError::NoHandler)?;
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ServerError::AlreadyShutDown);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }
        let mut forwarders = lock(&self.forwarders);
        for listener in &self.listeners {
            let task = forward(listener.clone(), handler.clone(), self.done.clone());
            forwarders.push(tokio::spawn(task));
        }
        info!("Server started with {} listener(s)", self.listeners.len());
        Ok(())
    }

    /// Close every listener, stop forwarding and run the shutdown callbacks.
    ///
    /// Requests already handed to the handler are not waited for. A listener that fails to close is logged and the
    /// shutdown carries on with the rest.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyShutDown);
        }
        debug!("Server shutting down");
        for listener in &self.listeners {
            if let Err(err) = listener.close().await {
                error!("Error closing listener on {}: {err}", listener.local_addr());
            }
        }
        self.done.cancel();
        let forwarders: Vec<_> = lock(&self.forwarders).drain(..).collect();
        for forwarder in forwarders {
            if let Err(err) = forwarder.await {
                warn!("Request forwarder ended abnormally: {err}");
            }
        }
        let callbacks: Vec<_> = lock(&self.shutdown_callbacks).drain(..).collect();
        for callback in callbacks {
            callback();
        }
        info!("Server shut down");
        Ok(())
    }
}

async fn forward(listener: Arc<dyn Listener>, handler: Arc<dyn Handler>, done: CancellationToken) {
    let local_addr = listener.local_addr();
    let requests = listener.requests();
    loop {
        let request = tokio::select! {
            biased;
            _ = done.cancelled() => break,
            request = requests.next() => request,
        };
        let Some(request) = request else {
            debug!("Listener on {local_addr} has no more requests");
            break;
        };
        let handler = handler.clone();
        tokio::spawn(async move {
            let remote_addr = request.remote_addr;
            if let Err(err) = handler.handle(request).await {
                warn!("Handler failed on request from {remote_addr}: {err}");
            }
        });
    }
    trace!("Request forwarder for {local_addr} stopped");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::TransportConfig;
    use crate::handler::handler_fn;
    use crate::request::Request;
    use crate::transport::Peer;
    use crate::udp::UdpConnection;
    use libgwp::{Data, Packet};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn noop() -> impl Handler {
        handler_fn(|_request: Request| async { Ok(()) })
    }

    async fn udp_listener() -> Arc<UdpConnection> {
        let config = TransportConfig::default().with_read_timeout(Duration::from_millis(50));
        Arc::new(UdpConnection::listen("127.0.0.1:0", config).await.unwrap())
    }

    #[tokio::test]
    async fn start_needs_listeners_and_a_handler() {
        let server = Server::new().with_handler(noop());
        assert_eq!(server.start(), Err(ServerError::NoListeners));

        let listener = udp_listener().await;
        let server = Server::new().with_listener(listener.clone());
        assert_eq!(server.start(), Err(ServerError::NoHandler));

        let server = Server::new().with_listener(listener).with_handler(noop());
        server.start().unwrap();
        assert!(server.is_running());
        assert_eq!(server.start(), Err(ServerError::AlreadyStarted));
        server.shutdown().await.unwrap();
        assert!(!server.is_running());
        assert_eq!(server.shutdown().await, Err(ServerError::AlreadyShutDown));
        assert_eq!(server.start(), Err(ServerError::AlreadyShutDown));
    }

    #[tokio::test]
    async fn callbacks_run_once_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (first, second) = (calls.clone(), calls.clone());
        let server = Server::new()
            .with_listener(udp_listener().await)
            .with_handler(noop())
            .on_shutdown(move || first.lock().unwrap().push(1))
            .on_shutdown(move || second.lock().unwrap().push(2));
        server.start().unwrap();
        server.shutdown().await.unwrap();
        assert!(server.shutdown().await.is_err());
        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn shutdown_without_start() {
        let listener = udp_listener().await;
        let requests = listener.requests();
        let server = Server::new().with_listener(listener).with_handler(noop());
        server.shutdown().await.unwrap();
        assert!(requests.next().await.is_none());
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_the_server() {
        env_logger::try_init().ok();
        let listener = udp_listener().await;
        let handled = Arc::new(AtomicUsize::new(0));
        let count = handled.clone();
        let handler = handler_fn(move |_request: Request| {
            let count = count.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("handler failure"))
            }
        });
        let server = Server::new().with_listener(listener.clone()).with_handler(handler);
        server.start().unwrap();

        let client = UdpConnection::dial(&listener.local_addr().to_string(), TransportConfig::default()).await.unwrap();
        for id in 1..=3 {
            client.send(&Packet::new(Data { id, ..Default::default() })).await.unwrap();
        }
        for _ in 0..100 {
            if handled.load(Ordering::SeqCst) == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(handled.load(Ordering::SeqCst), 3);
        server.shutdown().await.unwrap();
        client.close().await.unwrap();
    }
}
