//! # backstop
//!
//! Panic recovery for hyper services. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! A panic anywhere behind [`Recovery`] never escapes to hyper. Instead:
//!
//! - **Operators** get one log entry with the elapsed time, the request
//!   line, the headers with secrets masked, the panic message, whether the
//!   client connection was already dead, and the stack trace of the panic.
//! - **Clients** get a fixed JSON 500 carrying their `X-Request-ID`, and
//!   nothing else. No message, no trace, no paths.
//! - **Dead connections** get nothing at all: when the fault says the peer
//!   hung up (`broken pipe`, `connection reset by peer`), no response is
//!   written and the fault is recorded on the [`Response`] for outer
//!   observers.
//!
//! The request body is never read.
//!
//! ## Quick start
//!
//! ```rust
//! use backstop::{Chain, Recovery, Request, Response};
//!
//! async fn get_order(req: Request) -> Response {
//!     let id: u32 = req.uri().path().trim_start_matches("/orders/").parse().unwrap();
//!     Response::json(format!(r#"{{"id":{id}}}"#).into_bytes())
//! }
//!
//! let app = Chain::new(get_order).with(Recovery::new());
//! // app.into_service() plugs into any hyper connection builder.
//! ```
//!
//! A request for `/orders/abc` panics in `parse().unwrap()`; the client sees
//!
//! ```text
//! HTTP/1.1 500 Internal Server Error
//! content-type: application/json
//!
//! {"error":"internal_error","message":"Something went wrong","requestId":""}
//! ```

mod chain;
mod error;
mod handler;
mod request;
mod response;
mod service;

pub mod middleware;

pub use chain::Chain;
pub use error::{Aborted, BoxError, Error, NetError};
pub use handler::{BoxFuture, Handler};
pub use middleware::{Middleware, Next, PanicLog, PanicReport, Recovery, TracingLog};
pub use request::{Body, Head, Request};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use service::{ChainService, ServiceFuture};
