//! LIRC-compatible line protocol.
//!
//! Lets existing LIRC clients (`irsend`, home-automation plugins) drive the
//! bridge as if it were `lircd` listening on TCP.
//!
//! # Wire format (for beginners)
//!
//! The client sends one command per line.  The server answers every line
//! with a framed reply:
//!
//! ```text
//! client:  SEND_ONCE living-room power
//! server:  BEGIN
//!          SEND_ONCE living-room power      ← the request, echoed
//!          SUCCESS                          ← or ERROR
//!          DATA                             ← only when there are data lines
//!          2                                ← number of data lines
//!          ...
//!          END
//! ```
//!
//! # Supported commands
//!
//! | Command                                   | Reply data                 |
//! |-------------------------------------------|----------------------------|
//! | `VERSION`                                 | server identity            |
//! | `LIST`                                    | one host per device        |
//! | `LIST <remote>`                           | one name per command       |
//! | `SEND_ONCE <device> <command> [repeat]`   | none                       |
//! | `SEND_CCF_ONCE <repeat> <code>`           | none (uses `default`)      |
//!
//! Anything else is answered with `ERROR`.
//!
//! # Sub-modules
//!
//! - **`session`** – Reads lines from one client and writes replies.
//! - **`server`**  – TCP accept loop; one task per client.

pub mod server;
pub mod session;

use tracing::{debug, warn};

use crate::application::registry::{Registry, DEFAULT_ALIAS};
use crate::domain::BridgeError;
use crate::SERVER_IDENTITY;

pub use server::serve_lirc;
pub use session::serve_connection;

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Version,
    /// `LIST` with its optional remote name.
    List(Option<String>),
    SendOnce {
        device: String,
        command: String,
        repeat: Option<u32>,
    },
    SendCcfOnce {
        repeat: u32,
        code: String,
    },
    /// Unknown command or malformed arguments.
    Invalid,
}

impl Command {
    /// Parses a line that has already been trimmed.
    pub fn parse(line: &str) -> Self {
        let (name, args) = match line.split_once(' ') {
            Some((name, args)) => (name, Some(args.trim()).filter(|a| !a.is_empty())),
            None => (line, None),
        };

        match name {
            "VERSION" => Command::Version,
            "LIST" => Command::List(args.map(str::to_string)),
            "SEND_ONCE" => Self::parse_send_once(args.unwrap_or_default()),
            "SEND_CCF_ONCE" => Self::parse_send_ccf_once(args.unwrap_or_default()),
            _ => Command::Invalid,
        }
    }

    fn parse_send_once(args: &str) -> Self {
        let mut parts = args.split_whitespace();
        let (Some(device), Some(command)) = (parts.next(), parts.next()) else {
            return Command::Invalid;
        };
        let repeat = match parts.next().map(str::parse::<u32>) {
            None => None,
            Some(Ok(repeat)) => Some(repeat),
            Some(Err(_)) => return Command::Invalid,
        };
        Command::SendOnce {
            device: device.to_string(),
            command: command.to_string(),
            repeat,
        }
    }

    fn parse_send_ccf_once(args: &str) -> Self {
        let Some((repeat, code)) = args.split_once(' ') else {
            return Command::Invalid;
        };
        match repeat.parse::<u32>() {
            Ok(repeat) if !code.trim().is_empty() => Command::SendCcfOnce {
                repeat,
                code: code.to_string(),
            },
            _ => Command::Invalid,
        }
    }
}

/// A framed reply to one request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub line: String,
    pub success: bool,
    pub data: Vec<String>,
}

impl Reply {
    pub fn success(line: &str, data: Vec<String>) -> Self {
        Self {
            line: line.to_string(),
            success: true,
            data,
        }
    }

    pub fn error(line: &str) -> Self {
        Self {
            line: line.to_string(),
            success: false,
            data: Vec::new(),
        }
    }

    /// Wire form; every line ends with `\n`.  The `DATA` block is omitted
    /// when there are no data lines.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push_str("BEGIN\n");
        out.push_str(&self.line);
        out.push('\n');
        out.push_str(if self.success { "SUCCESS\n" } else { "ERROR\n" });
        if !self.data.is_empty() {
            out.push_str("DATA\n");
            out.push_str(&self.data.len().to_string());
            out.push('\n');
            for line in &self.data {
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("END\n");
        out
    }
}

/// Executes one trimmed request line.
///
/// Blocks while resolving devices and transmitting; call it from the
/// blocking pool.
///
/// `SEND_*` commands succeed whenever the code decoded and the device was
/// found, even if the device then could not be reached.
pub fn handle_line(registry: &Registry, line: &str) -> Reply {
    match Command::parse(line) {
        Command::Version => Reply::success(line, vec![SERVER_IDENTITY.to_string()]),
        Command::List(None) => Reply::success(
            line,
            registry
                .devices()
                .iter()
                .map(|device| device.host().to_string())
                .collect(),
        ),
        Command::List(Some(_)) => Reply::success(line, registry.command_names()),
        Command::SendOnce {
            device,
            command,
            repeat,
        } => send(registry, line, &device, command.as_bytes(), repeat),
        Command::SendCcfOnce { repeat, code } => {
            send(registry, line, DEFAULT_ALIAS, code.as_bytes(), Some(repeat))
        }
        Command::Invalid => {
            debug!("LIRC: invalid request {line:?}");
            Reply::error(line)
        }
    }
}

fn send(registry: &Registry, line: &str, id: &str, payload: &[u8], repeat: Option<u32>) -> Reply {
    match registry.transmit(id, payload, repeat) {
        Ok(()) => Reply::success(line, Vec::new()),
        Err(e @ BridgeError::ConnectionFailed(_)) => {
            warn!("LIRC: {line:?}: {e}");
            Reply::success(line, Vec::new())
        }
        Err(e) => {
            warn!("LIRC: {line:?}: {e}");
            Reply::error(line)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
