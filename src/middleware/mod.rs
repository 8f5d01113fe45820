//! Middleware layer.
//!
//! Middleware intercepts a request on its way to the handler and the
//! response on its way back. Each link receives the request together with a
//! [`Next`], decides whether and how to call it, and returns a response.
//!
//! ```rust
//! use backstop::middleware::{self, Next};
//! use backstop::{Chain, Request, Response};
//!
//! async fn timing(req: Request, next: Next) -> Response {
//!     let start = std::time::Instant::now();
//!     let res = next.run(req).await;
//!     tracing::debug!(elapsed = ?start.elapsed(), "request done");
//!     res
//! }
//!
//! # async fn hello(_: Request) -> Response { Response::text("hi") }
//! let app = Chain::new(hello).with(middleware::from_fn(timing));
//! ```
//!
//! Built-in middleware:
//! - [`Recovery`]: catches panics from the rest of the chain

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Response;

mod recovery;

pub use recovery::{
    DumpError, PanicLog, PanicReport, REDACTED, Recovery, SENSITIVE_HEADERS, TracingLog,
    dump_request, dump_request_safe, is_broken_pipe,
};

/// One link in a [`Chain`](crate::Chain).
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The rest of the chain, as seen from one link.
pub struct Next {
    layers: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(layers: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler) -> Self {
        Self { layers, index: 0, endpoint }
    }

    /// Runs the next link, or the handler once every link has run.
    pub fn run(mut self, req: Request) -> BoxFuture {
        match self.layers.get(self.index).cloned() {
            Some(layer) => {
                self.index += 1;
                layer.call(req, self)
            }
            None => self.endpoint.call(req),
        }
    }
}

/// Adapts an `async fn(Request, Next) -> Response` into a [`Middleware`].
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FromFn(f)
}

/// See [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self.0)(req, next))
    }
}
