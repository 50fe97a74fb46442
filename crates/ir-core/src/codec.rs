//! Decoding of [`IrCode`] values into canonical packets.
//!
//! ```text
//!  raw payload ──classify──► IrCode ──decode──► (CanonicalPacket, repeat byte)
//!                   │                   │
//!          "N*" folded into repeat      repeat override applied on a copy
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;
use tracing::trace;

use crate::code::IrCode;
use crate::packet::CanonicalPacket;
use crate::pronto::{decode_pronto, ProntoError};

/// Errors that can occur while turning a payload into a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The payload is malformed or not a recognised code representation.
    #[error("invalid code: {0}")]
    InvalidCode(String),

    /// The payload looked like Pronto hex but is structurally broken.
    #[error("invalid pronto code: {0}")]
    InvalidPronto(#[from] ProntoError),

    /// A named command reached the codec without being substituted first.
    #[error("command {0:?} must be resolved before decoding")]
    UnresolvedCommand(String),
}

/// Strips whitespace and folds a leading `"N*"` multiplier into `repeat`.
///
/// `"3*<code>"` means "send the code three times in total", so the repeat
/// count becomes `min(255, (repeat + 1) * 3 - 1)` with a missing `repeat`
/// treated as 0.  Text without a multiplier passes through unchanged (minus
/// whitespace) and `repeat` is returned as given.
///
/// # Errors
///
/// Returns [`CodecError::InvalidCode`] for a multiplier of zero.
///
/// # Example
///
/// ```rust
/// use ir_core::decode_multiply;
///
/// assert_eq!(decode_multiply("3*JgAE", None).unwrap(), ("JgAE".to_string(), Some(2)));
/// assert_eq!(decode_multiply("JgAE", Some(4)).unwrap(), ("JgAE".to_string(), Some(4)));
/// ```
pub fn decode_multiply(
    text: &str,
    repeat: Option<u32>,
) -> Result<(String, Option<u32>), CodecError> {
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    let Some((count, rest)) = text.split_once('*') else {
        return Ok((text, repeat));
    };
    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return Ok((text, repeat));
    }

    // Large multipliers saturate; the result is capped at 255 anyway.
    let count = count
        .bytes()
        .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d - b'0')));
    if count == 0 {
        return Err(CodecError::InvalidCode(
            "repeat multiplier must be at least 1".to_string(),
        ));
    }

    let base = u64::from(repeat.unwrap_or(0)) + 1;
    let folded = base.saturating_mul(count) - 1;
    Ok((rest.to_string(), Some(folded.min(255) as u32)))
}

/// Decodes an [`IrCode`] into a canonical packet.
///
/// When `repeat` is `Some`, the packet's repeat byte is multiplied on a
/// private copy: `byte[1] = min(255, (byte[1] + 1) * (repeat + 1) - 1)`.
///
/// Returns the packet and its final repeat byte.
///
/// # Errors
///
/// - [`CodecError::InvalidPronto`] for structurally broken Pronto codes.
/// - [`CodecError::InvalidCode`] for bad base64, unknown type tags, or
///   packets shorter than 6 bytes.
/// - [`CodecError::UnresolvedCommand`] for [`IrCode::Named`].
pub fn decode(code: &IrCode, repeat: Option<u32>) -> Result<(CanonicalPacket, u8), CodecError> {
    let bytes = match code {
        IrCode::Named(name) => return Err(CodecError::UnresolvedCommand(name.clone())),
        IrCode::Binary(bytes) => bytes.clone(),
        IrCode::Pronto(text) => decode_pronto(text)?,
        IrCode::Base64(text) => STANDARD
            .decode(text)
            .map_err(|e| CodecError::InvalidCode(format!("bad base64: {e}")))?,
    };

    let packet = CanonicalPacket::from_bytes(bytes)?;
    let packet = match repeat {
        Some(repeat) => packet.with_repeat(repeat),
        None => packet,
    };
    trace!(
        "decoded {} code: {} bytes, repeat byte {}",
        code.kind(),
        packet.len(),
        packet.repeat()
    );
    let repeat_byte = packet.repeat();
    Ok((packet, repeat_byte))
}

/// Classifies and decodes a payload that cannot refer to a named command.
///
/// # Errors
///
/// See [`IrCode::classify`] and [`decode`].
pub fn decode_text(raw: &[u8], repeat: Option<u32>) -> Result<(CanonicalPacket, u8), CodecError> {
    let (code, repeat) = IrCode::classify(raw, repeat, |_| false)?;
    decode(&code, repeat)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
