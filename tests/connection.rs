//! Wire-level behavior: what a real client sees over TCP.

use std::io;
use std::net::SocketAddr;

use backstop::{Chain, NetError, Recovery, Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn hello(_req: Request) -> Response {
    Response::text("hello")
}

async fn boom(_req: Request) -> Response {
    panic!("boom")
}

async fn hang_up(_req: Request) -> Response {
    std::panic::panic_any(NetError::new(
        "write",
        io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
    ))
}

/// Serves exactly one connection on an ephemeral port.
async fn serve_one(app: Chain) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let svc = app.into_service();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ = ConnBuilder::new(TokioExecutor::new())
            .serve_connection(TokioIo::new(stream), svc)
            .await;
    });
    addr
}

async fn send(addr: SocketAddr, head: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(head.as_bytes()).await.unwrap();

    let mut out = Vec::new();
    // A reset after an aborted exchange still means "nothing written".
    let _ = stream.read_to_end(&mut out).await;
    String::from_utf8(out).unwrap()
}

const GET: &str = "GET /things HTTP/1.1\r\nHost: test\r\nX-Request-ID: wire-1\r\nConnection: close\r\n\r\n";

#[tokio::test]
async fn normal_response_is_untouched() {
    let addr = serve_one(Chain::new(hello).with(Recovery::new())).await;
    let raw = send(addr, GET).await;

    assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(raw.ends_with("\r\n\r\nhello"));
}

#[tokio::test]
async fn panic_is_answered_with_json_500() {
    let addr = serve_one(Chain::new(boom).with(Recovery::new())).await;
    let raw = send(addr, GET).await;

    assert!(raw.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(raw.to_ascii_lowercase().contains("content-type: application/json\r\n"));
    assert!(raw.ends_with(
        r#"{"error":"internal_error","message":"Something went wrong","requestId":"wire-1"}"#
    ));
    assert!(!raw.contains("boom"));
}

#[tokio::test]
async fn dead_peer_gets_no_bytes() {
    let addr = serve_one(Chain::new(hang_up).with(Recovery::new())).await;
    let raw = send(addr, GET).await;

    assert!(raw.is_empty(), "unexpected bytes on aborted connection: {raw:?}");
}
