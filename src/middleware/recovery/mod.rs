//! Panic recovery.
//!
//! [`Recovery`] wraps the rest of the chain. When nothing panics it returns
//! whatever the chain returned, untouched. When something does, it:
//!
//! 1. normalizes the payload into an [`Error`],
//! 2. checks whether the client connection is already dead ([`is_broken_pipe`]),
//! 3. dumps the request line and headers with secrets masked ([`dump_request_safe`]),
//! 4. logs one [`PanicReport`] through its [`PanicLog`],
//! 5. answers with a generic JSON 500, or aborts without writing anything
//!    when the connection is dead.
//!
//! The client never sees the panic message, the stack trace, or any header
//! value. The request body is never read.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use http::{Method, StatusCode, Uri};
use serde::Serialize;
use tracing::error;

use crate::error::Error;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::{Head, Request};
use crate::response::Response;

mod classify;
mod dump;
mod stack;

pub use classify::is_broken_pipe;
pub use dump::{DumpError, REDACTED, SENSITIVE_HEADERS, dump_request, dump_request_safe};

/// Correlation header echoed back in the error body.
const REQUEST_ID: &str = "x-request-id";

// ── Logging ──────────────────────────────────────────────────────────────────

/// Everything known about one recovered panic.
///
/// `Display` renders the single multi-line log entry:
///
/// ```text
/// [PANIC] 1.2ms | GET /users/42 | brokenPipe=false | err=boom
/// Request:
/// GET /users/42 HTTP/1.1
/// Host: example.com
/// Stack:
///    0: …
/// ```
#[derive(Debug, Clone)]
pub struct PanicReport {
    pub elapsed: Duration,
    pub method: Method,
    pub uri: Uri,
    pub broken_pipe: bool,
    pub error: Arc<Error>,
    /// Redacted request dump, or the reason it could not be built.
    pub request: String,
    pub stack: String,
}

impl fmt::Display for PanicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[PANIC] {:?} | {} {} | brokenPipe={} | err={}\nRequest:\n{}\nStack:\n{}",
            self.elapsed, self.method, self.uri, self.broken_pipe, self.error, self.request,
            self.stack,
        )
    }
}

/// Where [`Recovery`] sends its reports. Called once per recovered panic.
pub trait PanicLog: Send + Sync + 'static {
    fn log(&self, report: &PanicReport);
}

/// Logs reports as `tracing` errors at target `backstop::recovery`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl PanicLog for TracingLog {
    fn log(&self, report: &PanicReport) {
        error!(
            target: "backstop::recovery",
            method = %report.method,
            uri = %report.uri,
            broken_pipe = report.broken_pipe,
            "{report}"
        );
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Panic-recovery middleware. Register it as the outermost link.
///
/// ```rust
/// use backstop::{Chain, Recovery, Request, Response};
///
/// async fn handler(_req: Request) -> Response {
///     panic!("boom")
/// }
///
/// let app = Chain::new(handler).with(Recovery::new());
/// ```
#[derive(Clone)]
pub struct Recovery {
    log: Arc<dyn PanicLog>,
}

impl Recovery {
    /// Recovery that reports through [`TracingLog`].
    pub fn new() -> Self {
        Self::with_logger(TracingLog)
    }

    /// Recovery that reports through `log`.
    pub fn with_logger(log: impl PanicLog) -> Self {
        stack::install();
        Self { log: Arc::new(log) }
    }
}

impl Default for Recovery {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery").finish_non_exhaustive()
    }
}

impl Middleware for Recovery {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let log = Arc::clone(&self.log);
        Box::pin(async move {
            let start = Instant::now();
            let head = req.shared_head();

            // The async block keeps a panic raised while building the inner
            // future inside the guarded poll.
            match AssertUnwindSafe(async move { next.run(req).await }).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => recover(&*log, start, &head, payload),
            }
        })
    }
}

fn recover(
    log: &dyn PanicLog,
    start: Instant,
    head: &Head,
    payload: Box<dyn std::any::Any + Send>,
) -> Response {
    // Taken first: the dump runs behind its own `catch_unwind`, which would
    // overwrite the captured trace if it panicked.
    let stack = stack::take();
    let error = Arc::new(Error::from_panic(payload));
    let broken_pipe = is_broken_pipe(Some(&*error));

    let report = PanicReport {
        elapsed: start.elapsed(),
        method: head.method.clone(),
        uri: head.uri.clone(),
        broken_pipe,
        error: Arc::clone(&error),
        request: dump_request_safe(head),
        stack,
    };
    if panic::catch_unwind(AssertUnwindSafe(|| log.log(&report))).is_err() {
        error!(target: "backstop::recovery", "panic log failed while reporting: {}", report.error);
    }

    if broken_pipe {
        let mut res = Response::abort();
        res.push_error(error);
        return res;
    }

    let request_id = head
        .headers
        .get(REQUEST_ID)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default();
    internal_error(&request_id)
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'static str,
    #[serde(rename = "requestId")]
    request_id: &'a str,
}

fn internal_error(request_id: &str) -> Response {
    let body = ErrorBody {
        error: "internal_error",
        message: "Something went wrong",
        request_id,
    };
    match serde_json::to_vec(&body) {
        Ok(bytes) => Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .json(bytes),
        Err(_) => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
