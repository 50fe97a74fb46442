//! Pronto hex → canonical packet conversion.
//!
//! A Pronto code is a sequence of 16-bit words written as 4 hex digits each:
//!
//! ```text
//! 0000 006D 0000 0022 00AC 00AC 0015 0040 ...
//! ^    ^    ^    ^    ^
//! |    |    |    |    └─ on/off durations in carrier ticks
//! |    |    |    └────── burst pairs in the repeat sequence
//! |    |    └─────────── burst pairs in the once sequence
//! |    └──────────────── carrier divisor (tick = divisor * 0.241246 µs)
//! └───────────────────── format: 0000 = raw, modulated
//! ```
//!
//! Each duration is converted to microseconds and then rescaled to the
//! packet's pulse unit of 8192/269 µs (≈ 30.45 µs).

use thiserror::Error;

use crate::packet::{padding_for, IR_TERMINATOR};

/// Pronto's fixed clock constant in microseconds per divisor step.
const PRONTO_CLOCK_US: f64 = 0.241246;

/// Numerator / denominator mapping microseconds to packet pulse units.
const PULSE_UNIT_NUM: u64 = 269;
const PULSE_UNIT_DEN: u64 = 8192;

/// Structural violations in a Pronto hex code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProntoError {
    /// The first word is not `0000` (only raw modulated codes are supported).
    #[error("pronto code must start with 0000")]
    InvalidHeader,

    /// Fewer than the four preamble words.
    #[error("pronto code is too short")]
    TooShort,

    /// The carrier divisor word is zero.
    #[error("pronto carrier frequency is zero")]
    InvalidFrequency,

    /// The number of duration words does not match the preamble pair counts.
    #[error("pronto preamble declares {expected} durations, found {actual}")]
    PreambleMismatch { expected: usize, actual: usize },

    /// A word contains characters that are not hex digits.
    #[error("pronto code contains non-hex digits")]
    InvalidDigits,

    /// A duration does not fit the packet's 16-bit wide-pulse encoding.
    #[error("pronto duration too long for the packet format")]
    PulseTooWide,
}

/// Converts a whitespace-free Pronto hex string into an IR packet.
///
/// The returned bytes start with `[0x26, 0x00]` (IR, no repeat) and are
/// padded so that `(len + 4) % 16 == 0`.
///
/// # Errors
///
/// Returns a [`ProntoError`] describing the first structural problem found.
///
/// # Example
///
/// ```rust
/// use ir_core::decode_pronto;
///
/// let packet = decode_pronto("0000006D0000000100100020").unwrap();
/// assert_eq!(packet[..8], [0x26, 0x00, 0x02, 0x00, 0x0d, 0x1b, 0x0d, 0x05]);
/// assert_eq!((packet.len() + 4) % 16, 0);
/// ```
pub fn decode_pronto(hex: &str) -> Result<Vec<u8>, ProntoError> {
    let words = parse_words(hex)?;

    if words.first().copied().unwrap_or(0) != 0 {
        return Err(ProntoError::InvalidHeader);
    }
    if words.len() < 4 {
        return Err(ProntoError::TooShort);
    }

    let expected = 2 * (usize::from(words[2]) + usize::from(words[3]));
    let actual = words.len() - 4;
    if actual != expected {
        return Err(ProntoError::PreambleMismatch { expected, actual });
    }

    if words[1] == 0 {
        return Err(ProntoError::InvalidFrequency);
    }
    let tick_us = f64::from(words[1]) * PRONTO_CLOCK_US;

    let mut pulses = Vec::with_capacity(actual);
    for &ticks in &words[4..] {
        // Half-to-even rounding keeps output identical to existing code tables.
        let micros = (f64::from(ticks) * tick_us).round_ties_even() as u64;
        let units = micros * PULSE_UNIT_NUM / PULSE_UNIT_DEN;
        push_pulse(&mut pulses, units)?;
    }

    let pulse_len = u16::try_from(pulses.len()).map_err(|_| ProntoError::PulseTooWide)?;

    let mut packet = Vec::with_capacity(pulses.len() + 24);
    packet.push(0x26); // IR
    packet.push(0x00); // repeat
    packet.extend_from_slice(&pulse_len.to_le_bytes());
    packet.extend_from_slice(&pulses);
    packet.extend_from_slice(&IR_TERMINATOR);
    packet.resize(packet.len() + padding_for(packet.len()), 0x00);
    Ok(packet)
}

/// Splits `hex` into 4-digit big-endian words; a trailing short chunk is
/// parsed as-is.
fn parse_words(hex: &str) -> Result<Vec<u16>, ProntoError> {
    if !hex.is_ascii() {
        return Err(ProntoError::InvalidDigits);
    }
    hex.as_bytes()
        .chunks(4)
        .map(|chunk| {
            // ASCII was checked above, so every chunk is valid UTF-8.
            let digits = std::str::from_utf8(chunk).map_err(|_| ProntoError::InvalidDigits)?;
            u16::from_str_radix(digits, 16).map_err(|_| ProntoError::InvalidDigits)
        })
        .collect()
}

fn push_pulse(out: &mut Vec<u8>, units: u64) -> Result<(), ProntoError> {
    if units < 256 {
        out.push(units as u8);
    } else {
        let wide = u16::try_from(units).map_err(|_| ProntoError::PulseTooWide)?;
        out.push(0x00);
        out.extend_from_slice(&wide.to_be_bytes());
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
