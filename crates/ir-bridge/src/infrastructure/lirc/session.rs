//! One LIRC client connection.
//!
//! ```text
//! AWAITING_LINE ──line──► PARSED ──handle_line──► REPLIED ──┐
//!      ▲                                                    │
//!      └────────────────────────────────────────────────────┘
//!
//! EOF, blank line, invalid UTF-8, over-long line, I/O error, idle timeout ──► CLOSED
//! ```

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::handle_line;
use crate::application::registry::Registry;

/// Longest accepted request line, newline included.
pub const MAX_LINE_LEN: usize = 64 * 1024;

async fn read_line<R>(mut reader: R, buf: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    reader.read_until(b'\n', buf).await
}

/// Serves requests on `stream` until the client goes away.
///
/// Each line is executed on the blocking pool, so a slow device never
/// stalls the runtime.  `idle_timeout` bounds how long we wait for the next
/// line; `None` waits forever.
///
/// # Errors
///
/// Returns the underlying I/O error when reading or writing fails.  Every
/// other way a session ends (EOF, blank line, bad UTF-8, over-long line,
/// idle timeout) is a normal close and returns `Ok(())`.
pub async fn serve_connection<S>(
    stream: S,
    registry: Arc<Registry>,
    idle_timeout: Option<Duration>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        // One byte past the cap tells an over-long line from one that fits.
        let line = (&mut stream).take(MAX_LINE_LEN as u64 + 1);
        let read = match idle_timeout {
            Some(limit) => match timeout(limit, read_line(line, &mut buf)).await {
                Ok(read) => read?,
                Err(_) => {
                    debug!("LIRC: idle for {limit:?}, closing");
                    return Ok(());
                }
            },
            None => read_line(line, &mut buf).await?,
        };
        if read == 0 {
            return Ok(());
        }
        if buf.len() > MAX_LINE_LEN {
            warn!("LIRC: request longer than {MAX_LINE_LEN} bytes, closing");
            return Ok(());
        }

        let Ok(text) = std::str::from_utf8(&buf) else {
            warn!("LIRC: request is not valid UTF-8, closing");
            return Ok(());
        };
        let line = text.trim().to_string();
        if line.is_empty() {
            return Ok(());
        }
        debug!("LIRC: {line}");

        let registry = Arc::clone(&registry);
        let reply = tokio::task::spawn_blocking(move || handle_line(&registry, &line))
            .await
            .map_err(io::Error::other)?;

        stream.write_all(reply.encode().as_bytes()).await?;
        stream.flush().await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::controller::mock::MockController;
    use crate::SERVER_IDENTITY;
    use tokio::io::AsyncReadExt;
    use tokio_test::io::Builder;

    fn empty_registry() -> Arc<Registry> {
        Arc::new(Registry::new(Arc::new(MockController::new())))
    }

    #[tokio::test]
    async fn test_version_reply_is_byte_exact() {
        // Arrange
        let expected = format!("BEGIN\nVERSION\nSUCCESS\nDATA\n1\n{SERVER_IDENTITY}\nEND\n");
        let stream = Builder::new()
            .read(b"VERSION\n")
            .write(expected.as_bytes())
            .build();

        // Act / Assert: the mock panics on any unexpected write
        serve_connection(stream, empty_registry(), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_request_line_is_trimmed_before_echo() {
        let stream = Builder::new()
            .read(b"  LIST \r\n")
            .write(b"BEGIN\nLIST\nSUCCESS\nEND\n")
            .build();

        serve_connection(stream, empty_registry(), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_several_requests_on_one_connection() {
        let stream = Builder::new()
            .read(b"BOGUS\n")
            .write(b"BEGIN\nBOGUS\nERROR\nEND\n")
            .read(b"LIST\n")
            .write(b"BEGIN\nLIST\nSUCCESS\nEND\n")
            .build();

        serve_connection(stream, empty_registry(), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_blank_line_closes_session() {
        // Arrange: the request after the blank line must never be answered
        let stream = Builder::new().read(b"\nVERSION\n").build();

        // Act / Assert
        serve_connection(stream, empty_registry(), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_utf8_closes_session() {
        let stream = Builder::new().read(b"LIST \xff\xfe\n").build();

        serve_connection(stream, empty_registry(), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_over_long_line_closes_session_without_reply() {
        // Arrange: a client that never sends a newline
        let (server, mut client) = tokio::io::duplex(2 * MAX_LINE_LEN);
        client.write_all(&vec![b'A'; MAX_LINE_LEN + 16]).await.unwrap();

        // Act
        let result = serve_connection(server, empty_registry(), None).await;

        // Assert: closed without answering
        assert!(result.is_ok());
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_line_at_the_cap_is_still_served() {
        // Arrange: "LIST" padded with spaces up to the cap, newline included
        let mut request = b"LIST".to_vec();
        request.resize(MAX_LINE_LEN - 1, b' ');
        request.push(b'\n');
        let (server, mut client) = tokio::io::duplex(2 * MAX_LINE_LEN);
        client.write_all(&request).await.unwrap();
        client.shutdown().await.unwrap();

        // Act
        serve_connection(server, empty_registry(), None).await.unwrap();

        // Assert
        let mut reply = Vec::new();
        client.read_to_end(&mut reply).await.unwrap();
        assert_eq!(reply, b"BEGIN\nLIST\nSUCCESS\nEND\n");
    }

    #[tokio::test]
    async fn test_idle_timeout_closes_session() {
        // Arrange: the client half stays open but silent
        let (server, mut client) = tokio::io::duplex(64);

        // Act
        let result = serve_connection(server, empty_registry(), Some(Duration::from_millis(50))).await;

        // Assert: server returned, so the client sees EOF
        assert!(result.is_ok());
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
