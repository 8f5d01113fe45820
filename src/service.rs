//! Hyper integration.
//!
//! [`ChainService`] is what hyper's connection builders call once per
//! request. It owns no listener and no shutdown logic: bind, accept and
//! drain the way your server already does, and pass the service in.
//!
//! ```rust,no_run
//! use backstop::{Chain, Recovery, Request, Response};
//! use hyper_util::rt::{TokioExecutor, TokioIo};
//! use hyper_util::server::conn::auto::Builder;
//!
//! # async fn hello(_: Request) -> Response { Response::text("hi") }
//! # async fn run() -> std::io::Result<()> {
//! let svc = Chain::new(hello).with(Recovery::new()).into_service();
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! let (stream, _) = listener.accept().await?;
//! Builder::new(TokioExecutor::new())
//!     .serve_connection(TokioIo::new(stream), svc)
//!     .await
//!     .ok();
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::Service;

use crate::chain::Chain;
use crate::error::{Aborted, BoxError};
use crate::request::Request;

/// Future returned by [`ChainService::call`].
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<Full<Bytes>>, Aborted>> + Send + 'static>>;

/// A [`Chain`] as a hyper [`Service`].
///
/// An aborted response comes out as `Err(Aborted)`; hyper then closes the
/// connection without writing a status line.
#[derive(Clone)]
pub struct ChainService {
    chain: Arc<Chain>,
}

impl Chain {
    pub fn into_service(self) -> ChainService {
        ChainService { chain: Arc::new(self) }
    }
}

impl<B> Service<http::Request<B>> for ChainService
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Aborted;
    type Future = ServiceFuture;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let chain = Arc::clone(&self.chain);
        let req = Request::from_http(req);
        Box::pin(async move { chain.call(req).await.into_http() })
    }
}
