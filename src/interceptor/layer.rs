//! Tower middleware routing each request through its breaker.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{BoxError, Layer, Service};

use crate::interceptor::request::CallTarget;
use crate::registry::BreakerSet;

/// Wraps services with [`BreakerService`].
#[derive(Debug, Clone)]
pub struct BreakerLayer {
    set: Arc<BreakerSet>,
}

impl BreakerLayer {
    pub fn new(set: Arc<BreakerSet>) -> Self {
        Self { set }
    }
}

impl<S> Layer<S> for BreakerLayer {
    type Service = BreakerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BreakerService {
            inner,
            set: Arc::clone(&self.set),
        }
    }
}

/// Sheds requests whose breaker is open; reports every other outcome.
///
/// Shed requests fail with [`BreakerError::Open`](crate::BreakerError::Open)
/// and never reach the inner service.
#[derive(Debug, Clone)]
pub struct BreakerService<S> {
    inner: S,
    set: Arc<BreakerSet>,
}

impl<S, R> Service<R> for BreakerService<S>
where
    S: Service<R> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    R: CallTarget + Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: R) -> Self::Future {
        let breaker = self.set.resolve(request.method(), request.call_site());

        // The ready service goes with the call; a fresh clone waits for the next poll_ready.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move { breaker.call(move || inner.call(request)).await })
    }
}
