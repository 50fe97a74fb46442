//! The [`IrCode`] tagged union and payload classification.
//!
//! Front ends receive raw bytes (an HTTP body, an MQTT payload, a token from
//! a LIRC command line).  [`IrCode::classify`] decides once what those bytes
//! are; everything downstream matches on the variant instead of re-sniffing.

use crate::codec::{decode_multiply, CodecError};
use crate::packet::PacketType;

/// Texts shorter than this cannot be a Pronto or base64 packet.
pub const MIN_TEXT_CODE_LEN: usize = 5;

/// Prefix identifying a raw Pronto hex code.
pub const PRONTO_PREFIX: &str = "0000";

/// An IR code in one of its accepted representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrCode {
    /// A command name registered in the bridge's command table.
    Named(String),
    /// Whitespace-free Pronto hex text.
    Pronto(String),
    /// Whitespace-free base64 of a canonical packet.
    Base64(String),
    /// Raw canonical packet bytes.
    Binary(Vec<u8>),
}

impl IrCode {
    /// Classifies a raw payload, folding any `"N*"` multiplier into `repeat`.
    ///
    /// `is_command` reports whether a text is a registered command name;
    /// named commands are recognised before the minimum-length check so short
    /// names like `"tv"` work.
    ///
    /// Returns the classified code together with the (possibly updated) repeat
    /// count.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidCode`] when the payload is empty, is not
    /// UTF-8 text (and not binary), carries a zero multiplier, or is too short
    /// to be a code.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ir_core::IrCode;
    ///
    /// let (code, repeat) = IrCode::classify(b"2*power", None, |name| name == "power").unwrap();
    /// assert_eq!(code, IrCode::Named("power".to_string()));
    /// assert_eq!(repeat, Some(1));
    /// ```
    pub fn classify<F>(
        raw: &[u8],
        repeat: Option<u32>,
        is_command: F,
    ) -> Result<(IrCode, Option<u32>), CodecError>
    where
        F: Fn(&str) -> bool,
    {
        let first = match raw.first() {
            Some(&byte) => byte,
            None => return Err(CodecError::InvalidCode("empty code".to_string())),
        };

        if PacketType::is_tag(first) {
            return Ok((IrCode::Binary(raw.to_vec()), repeat));
        }

        let text = std::str::from_utf8(raw)
            .map_err(|_| CodecError::InvalidCode("code is neither text nor a packet".to_string()))?;
        let (text, repeat) = decode_multiply(text, repeat)?;

        if is_command(&text) {
            return Ok((IrCode::Named(text), repeat));
        }
        if text.len() < MIN_TEXT_CODE_LEN {
            return Err(CodecError::InvalidCode(format!("code too short: {text:?}")));
        }
        if text.starts_with(PRONTO_PREFIX) {
            Ok((IrCode::Pronto(text), repeat))
        } else {
            Ok((IrCode::Base64(text), repeat))
        }
    }

    /// Short label for log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            IrCode::Named(_) => "named",
            IrCode::Pronto(_) => "pronto",
            IrCode::Base64(_) => "base64",
            IrCode::Binary(_) => "binary",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
