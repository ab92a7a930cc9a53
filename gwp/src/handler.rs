use crate::request::Request;
use async_trait::async_trait;
use std::future::Future;

/// Processes one inbound request. Errors are reported by the caller and never end the server.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> anyhow::Result<()>;
}

/// Adapts an async closure into a [`Handler`].
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap `f` so it can be registered wherever a [`Handler`] is expected.
///
/// ```ignore
/// let handler = handler_fn(|request: Request| async move {
///     info!("Got {}", request.packet);
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle(&self, request: Request) -> anyhow::Result<()> {
        (self.f)(request).await
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for std::sync::Arc<H> {
    async fn handle(&self, request: Request) -> anyhow::Result<()> {
        (**self).handle(request).await
    }
}
