//! Integration tests for the LIRC front end over real TCP.
//!
//! A listener is bound on an ephemeral loopback port and served by
//! `serve_lirc`; the tests talk to it like `irsend` would.  Devices are
//! provided by the in-memory `MockController`.

use std::net::IpAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use ir_bridge::application::Registry;
use ir_bridge::infrastructure::controller::mock::MockController;
use ir_bridge::infrastructure::lirc::serve_lirc;
use ir_bridge::SERVER_IDENTITY;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const HOST: &str = "192.168.1.20";
const POWER: &[u8] = b"JgAEABAgECANBQAA";

struct Server {
    port: u16,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Server {
    async fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        self.task.await.expect("LIRC server task panicked");
    }
}

async fn start(registry: Registry) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let running = Arc::new(AtomicBool::new(true));
    let task = tokio::spawn(serve_lirc(
        listener,
        Arc::new(registry),
        None,
        Arc::clone(&running),
    ));
    Server {
        port,
        running,
        task,
    }
}

fn registry_with_tv() -> (Registry, MockController) {
    let controller =
        MockController::new().with_device(HOST, IpAddr::from([192, 168, 1, 20]), [1, 2, 3, 4, 5, 6]);
    let registry = Registry::new(Arc::new(controller.clone()));
    registry.add_device(HOST, Some("tv"));
    registry.set_command("power", POWER).expect("valid command");
    (registry, controller)
}

/// Sends one request and collects the reply up to and including `END`.
async fn request(stream: &mut BufReader<TcpStream>, line: &str) -> String {
    stream
        .get_mut()
        .write_all(format!("{line}\n").as_bytes())
        .await
        .expect("write request");

    let mut reply = String::new();
    loop {
        let mut reply_line = String::new();
        let read = stream.read_line(&mut reply_line).await.expect("read reply");
        assert!(read > 0, "server closed before END");
        reply.push_str(&reply_line);
        if reply_line == "END\n" {
            return reply;
        }
    }
}

async fn connect(server: &Server) -> BufReader<TcpStream> {
    BufReader::new(
        TcpStream::connect(("127.0.0.1", server.port))
            .await
            .expect("connect"),
    )
}

#[tokio::test]
async fn test_version_over_tcp() {
    // Arrange
    let (registry, _) = registry_with_tv();
    let server = start(registry).await;
    let mut client = connect(&server).await;

    // Act
    let reply = request(&mut client, "VERSION").await;

    // Assert
    assert_eq!(
        reply,
        format!("BEGIN\nVERSION\nSUCCESS\nDATA\n1\n{SERVER_IDENTITY}\nEND\n")
    );
    server.stop().await;
}

#[tokio::test]
async fn test_list_devices_and_commands() {
    let (registry, _) = registry_with_tv();
    let server = start(registry).await;
    let mut client = connect(&server).await;

    assert_eq!(
        request(&mut client, "LIST").await,
        format!("BEGIN\nLIST\nSUCCESS\nDATA\n1\n{HOST}\nEND\n")
    );
    assert_eq!(
        request(&mut client, "LIST tv").await,
        "BEGIN\nLIST tv\nSUCCESS\nDATA\n1\npower\nEND\n"
    );
    server.stop().await;
}

#[tokio::test]
async fn test_send_once_named_command_on_default_device() {
    // Arrange
    let (registry, controller) = registry_with_tv();
    let server = start(registry).await;
    let mut client = connect(&server).await;

    // Act
    let reply = request(&mut client, "SEND_ONCE default power").await;

    // Assert: exactly one packet, identical to the stored command
    assert_eq!(reply, "BEGIN\nSEND_ONCE default power\nSUCCESS\nEND\n");
    let sent = controller.sent_packets(HOST);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0],
        vec![0x26, 0x00, 0x04, 0x00, 0x10, 0x20, 0x10, 0x20, 0x0d, 0x05, 0x00, 0x00]
    );
    server.stop().await;
}

#[tokio::test]
async fn test_send_ccf_once_goes_to_default_device() {
    let (registry, controller) = registry_with_tv();
    let server = start(registry).await;
    let mut client = connect(&server).await;

    let reply = request(&mut client, "SEND_CCF_ONCE 0 0000 006D 0000 0001 0010 0020").await;

    assert_eq!(
        reply,
        "BEGIN\nSEND_CCF_ONCE 0 0000 006D 0000 0001 0010 0020\nSUCCESS\nEND\n"
    );
    assert_eq!(
        controller.sent_packets(HOST),
        vec![vec![0x26, 0x00, 0x02, 0x00, 0x0d, 0x1b, 0x0d, 0x05, 0x00, 0x00, 0x00, 0x00]]
    );
    server.stop().await;
}

#[tokio::test]
async fn test_errors_keep_the_session_open() {
    // Arrange
    let (registry, controller) = registry_with_tv();
    let server = start(registry).await;
    let mut client = connect(&server).await;

    // Act / Assert: unknown command, unknown device, bad code
    assert_eq!(
        request(&mut client, "SEND_START tv power").await,
        "BEGIN\nSEND_START tv power\nERROR\nEND\n"
    );
    assert_eq!(
        request(&mut client, "SEND_ONCE 10.9.9.9 power").await,
        "BEGIN\nSEND_ONCE 10.9.9.9 power\nERROR\nEND\n"
    );
    assert_eq!(
        request(&mut client, "SEND_ONCE tv volume_up").await,
        "BEGIN\nSEND_ONCE tv volume_up\nERROR\nEND\n"
    );

    // The same connection still answers.
    assert!(request(&mut client, "VERSION").await.contains("SUCCESS"));
    assert!(controller.sent_packets(HOST).is_empty());
    server.stop().await;
}

#[tokio::test]
async fn test_clients_are_served_concurrently() {
    let (registry, _) = registry_with_tv();
    let server = start(registry).await;

    // The first client stays connected and idle while the second is served.
    let _idle = connect(&server).await;
    let mut active = connect(&server).await;

    assert!(request(&mut active, "VERSION").await.starts_with("BEGIN\nVERSION\nSUCCESS\n"));
    server.stop().await;
}
