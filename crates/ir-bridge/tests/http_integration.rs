//! Integration tests for the HTTP front end over real TCP.
//!
//! The server runs through `serve_http` on an ephemeral loopback port.
//! Requests are written by hand as HTTP/1.1 with `Connection: close`, so
//! the whole response can be read to EOF.

use std::net::IpAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use ir_bridge::application::Registry;
use ir_bridge::infrastructure::controller::mock::MockController;
use ir_bridge::infrastructure::http::serve_http;
use ir_bridge::SERVER_IDENTITY;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const HOST: &str = "192.168.1.20";

async fn post(port: u16, path: &str, body: &[u8]) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
    let head = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await.expect("write head");
    stream.write_all(body).await.expect("write body");

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.expect("read response");
    String::from_utf8(response).expect("UTF-8 response")
}

#[tokio::test]
async fn test_http_server_end_to_end() {
    // Arrange
    let controller =
        MockController::new().with_device(HOST, IpAddr::from([192, 168, 1, 20]), [1, 2, 3, 4, 5, 6]);
    let registry = Registry::new(Arc::new(controller.clone()));
    registry.add_device(HOST, Some("tv"));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let running = Arc::new(AtomicBool::new(true));
    let server = tokio::spawn(serve_http(listener, Arc::new(registry), Arc::clone(&running)));

    // Act
    let sent = post(port, "/device/tv", b"JgAEABAgECANBQAA").await;
    let by_mac = post(port, "/device/01:02:03:04:05:06", b"0000 006D 0000 0001 0010 0020").await;
    let unknown = post(port, "/device/10.9.9.9", b"JgAEABAgECANBQAA").await;
    let empty = post(port, "/device/tv", b"").await;

    // Assert
    assert!(sent.starts_with("HTTP/1.1 204"), "{sent}");
    assert!(
        sent.to_ascii_lowercase()
            .contains(&format!("server: {}", SERVER_IDENTITY.to_ascii_lowercase())),
        "{sent}"
    );
    assert!(by_mac.starts_with("HTTP/1.1 204"), "{by_mac}");
    assert!(unknown.starts_with("HTTP/1.1 404"), "{unknown}");
    assert!(empty.starts_with("HTTP/1.1 400"), "{empty}");
    assert_eq!(controller.sent_packets(HOST).len(), 2);

    // Shutdown is graceful and prompt.
    running.store(false, Ordering::Relaxed);
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops after the flag is cleared")
        .expect("server task panicked")
        .expect("server returned an error");
}
