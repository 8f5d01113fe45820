//! Minimal backstop example: a chain behind `Recovery`, served by hyper.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/ok
//!   curl -i http://localhost:3000/boom -H 'x-request-id: demo-1' -H 'authorization: Bearer s3cr3t'
//!   curl -i http://localhost:3000/hangup

use std::io;

use backstop::middleware::{self, Next};
use backstop::{Chain, NetError, Recovery, Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt::init();

    let app = Chain::new(route)
        .with(middleware::from_fn(access_log))
        .with(Recovery::new());
    let svc = app.into_service();

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!("listening on 0.0.0.0:3000");

    loop {
        let (stream, peer) = listener.accept().await?;
        let svc = svc.clone();
        tokio::spawn(async move {
            if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), svc)
                .await
            {
                error!(%peer, "connection error: {e}");
            }
        });
    }
}

// Outside Recovery: sees the 500s, and the faults recorded on aborted responses.
async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let res = next.run(req).await;
    if res.is_aborted() {
        let cause = res.errors().first().map(ToString::to_string).unwrap_or_default();
        info!(%method, %path, %cause, "request aborted");
    } else {
        info!(%method, %path, status = res.status_code().as_u16(), "request");
    }
    res
}

async fn route(req: Request) -> Response {
    match req.uri().path() {
        // GET /boom → panic with a plain message → JSON 500
        "/boom" => panic!("boom"),
        // GET /hangup → panic with a dead-connection error → nothing written
        "/hangup" => std::panic::panic_any(NetError::new(
            "write",
            io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
        )),
        _ => Response::text("ok"),
    }
}
