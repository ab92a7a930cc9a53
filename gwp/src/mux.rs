//! Dispatch of requests to handlers by payload type.

use crate::errors::MuxError;
use crate::handler::Handler;
use crate::request::Request;
use async_trait::async_trait;
use libgwp::{PayloadKind, PayloadType};
use log::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Routes each request to the handler registered for its payload type.
///
/// Handlers are registered up front with [`Mux::add_handler`]. Once [`Mux::seal`] has been called, the table is
/// frozen and further registrations fail. Requests with a payload nobody registered for are logged and dropped.
#[derive(Default)]
pub struct Mux {
    sealed: AtomicBool,
    handlers: HashMap<PayloadKind, Arc<dyn Handler>>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for the payload type of `exemplar`. Anything that answers [`PayloadType::payload_kind`]
    /// works as an exemplar: a [`PayloadKind`], a message value such as `Data::default()`, or a packet carrying one.
    pub fn add_handler<P, H>(&mut self, exemplar: &P, handler: H) -> Result<(), MuxError>
    where
        P: PayloadType + ?Sized,
        H: Handler,
    {
        if self.is_sealed() {
            return Err(MuxError::Sealed);
        }
        let kind = exemplar.payload_kind().ok_or(MuxError::CannotResolveType)?;
        if self.handlers.contains_key(&kind) {
            return Err(MuxError::AlreadyDefined(kind));
        }
        debug!("Mux: handler registered for {kind}");
        self.handlers.insert(kind, Arc::new(handler));
        Ok(())
    }

    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    pub fn handles(&self, kind: PayloadKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

#[async_trait]
impl Handler for Mux {
    async fn handle(&self, request: Request) -> anyhow::Result<()> {
        let Some(kind) = request.payload_kind() else {
            trace!("Mux: ignoring packet without a payload from {}", request.remote_addr);
            return Ok(());
        };
        match self.handlers.get(&kind) {
            Some(handler) => handler.handle(request).await,
            None => {
                info!("Mux: unhandled request: {request:?}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::handler::handler_fn;
    use crate::request::test_util::{request_for, request_with};
    use libgwp::{Config, Data, Packet, PollConfig, Sample, Samples};
    use std::sync::atomic::AtomicUsize;

    fn counter(count: &Arc<AtomicUsize>) -> impl Handler {
        let count = count.clone();
        handler_fn(move |_request| {
            let count = count.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn dispatches_by_payload_type() {
        let data_count = Arc::new(AtomicUsize::new(0));
        let config_count = Arc::new(AtomicUsize::new(0));
        let mut mux = Mux::new();
        mux.add_handler(&Data::default(), counter(&data_count)).unwrap();
        mux.add_handler(&PayloadKind::Config, counter(&config_count)).unwrap();
        let err = mux.add_handler(&Packet::new(Data::default()), counter(&data_count)).unwrap_err();
        assert_eq!(err, MuxError::AlreadyDefined(PayloadKind::Data));
        mux.seal();

        mux.handle(request_with(Data::default())).await.unwrap();
        mux.handle(request_with(Data::default())).await.unwrap();
        mux.handle(request_with(Config::default())).await.unwrap();
        // Unhandled and empty packets are dropped without error
        mux.handle(request_with(Samples { samples: vec![Sample::default()] })).await.unwrap();
        mux.handle(request_for(Packet::default())).await.unwrap();

        assert_eq!(data_count.load(Ordering::SeqCst), 2);
        assert_eq!(config_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sealed_mux_rejects_handlers() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut mux = Mux::new();
        assert!(!mux.is_sealed());
        mux.seal();
        assert!(mux.is_sealed());
        let err = mux.add_handler(&PollConfig::default(), counter(&count)).unwrap_err();
        assert_eq!(err, MuxError::Sealed);
        assert!(!mux.handles(PayloadKind::PollConfig));
    }

    #[test]
    fn exemplar_without_a_payload() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut mux = Mux::new();
        let err = mux.add_handler(&Packet::default(), counter(&count)).unwrap_err();
        assert_eq!(err, MuxError::CannotResolveType);
        let none: Option<Data> = None;
        assert_eq!(mux.add_handler(&none, counter(&count)).unwrap_err(), MuxError::CannotResolveType);
    }

    #[tokio::test]
    async fn handler_errors_propagate() {
        let mut mux = Mux::new();
        mux.add_handler(&PayloadKind::Data, handler_fn(|_request| async { Err(anyhow::anyhow!("nope")) })).unwrap();
        let err = mux.handle(request_with(Data::default())).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
