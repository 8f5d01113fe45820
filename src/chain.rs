//! Linear request-handler chain.
//!
//! A list of middleware in front of one handler. Build it once at startup,
//! then call it per request or hand it to hyper via
//! [`Chain::into_service`].

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;

/// The application: middleware links in front of a terminal handler.
///
/// Links run in registration order: the first [`Chain::with`] call is the
/// outermost link. Register [`Recovery`](crate::Recovery) first, or right
/// behind an access log that reads [`Response::errors`](crate::Response::errors).
///
/// ```rust
/// use backstop::{Chain, Recovery, Request, Response};
///
/// async fn hello(_req: Request) -> Response {
///     Response::text("hello")
/// }
///
/// let app = Chain::new(hello).with(Recovery::new());
/// ```
#[derive(Clone)]
pub struct Chain {
    layers: Arc<[BoxedMiddleware]>,
    endpoint: BoxedHandler,
}

impl Chain {
    pub fn new(handler: impl Handler) -> Self {
        Self { layers: Arc::from(Vec::new()), endpoint: handler.into_boxed_handler() }
    }

    /// Appends a link behind those already registered. Returns `self` for chaining.
    pub fn with(mut self, layer: impl Middleware) -> Self {
        let mut layers = self.layers.to_vec();
        layers.push(Arc::new(layer));
        self.layers = layers.into();
        self
    }

    /// Runs one request through every link and the handler.
    pub fn call(&self, req: Request) -> BoxFuture {
        Next::new(Arc::clone(&self.layers), Arc::clone(&self.endpoint)).run(req)
    }
}
