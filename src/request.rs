//! Incoming HTTP request type.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;

use crate::error::BoxError;

/// Type-erased request body. Nothing in this crate ever polls it.
pub type Body = UnsyncBoxBody<Bytes, BoxError>;

/// Request line and headers.
#[derive(Clone, Debug, Default)]
pub struct Head {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

/// An incoming HTTP request.
///
/// The head sits behind an `Arc` so middleware can keep a snapshot of it
/// without copying; [`Request::headers_mut`] copies on write.
pub struct Request {
    head: Arc<Head>,
    body: Body,
}

impl Request {
    pub fn new(head: Head, body: Body) -> Self {
        Self { head: Arc::new(head), body }
    }

    /// Converts a request as handed over by hyper (or built with
    /// `http::Request::builder()`). The body is boxed, not read.
    pub fn from_http<B>(req: http::Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let head = Head {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
        };
        Self::new(head, body.map_err(Into::into).boxed_unsync())
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn version(&self) -> Version { self.head.version }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn head(&self) -> &Head { &self.head }

    /// Case-insensitive header lookup. Returns the first value, or `None`
    /// when it is absent or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers
            .get(name)
            .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut Arc::make_mut(&mut self.head).headers
    }

    pub fn body_mut(&mut self) -> &mut Body { &mut self.body }
    pub fn into_body(self) -> Body { self.body }

    pub(crate) fn shared_head(&self) -> Arc<Head> {
        Arc::clone(&self.head)
    }
}

impl<B> From<http::Request<B>> for Request
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn from(req: http::Request<B>) -> Self {
        Self::from_http(req)
    }
}
