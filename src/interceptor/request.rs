//! Requests the interceptor knows how to route.

use crate::registry::CallSite;

/// A request that names the RPC method it invokes.
pub trait CallTarget {
    /// Full method name, e.g. `/pkg.Users/Get`.
    fn method(&self) -> &str;

    /// Per-call override routing this request to its own breaker.
    fn call_site(&self) -> Option<&CallSite> {
        None
    }
}

/// A plain RPC request: method name, optional call site and a body.
#[derive(Debug, Clone)]
pub struct RpcRequest<B> {
    method: String,
    call_site: Option<CallSite>,
    body: B,
}

impl<B> RpcRequest<B> {
    pub fn new(method: impl Into<String>, body: B) -> Self {
        Self {
            method: method.into(),
            call_site: None,
            body,
        }
    }

    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        self.call_site = Some(call_site);
        self
    }

    pub fn into_body(self) -> B {
        self.body
    }
}

impl<B> CallTarget for RpcRequest<B> {
    fn method(&self) -> &str {
        &self.method
    }

    fn call_site(&self) -> Option<&CallSite> {
        self.call_site.as_ref()
    }
}
