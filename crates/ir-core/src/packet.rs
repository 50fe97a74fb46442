//! Canonical binary packet understood by IR/RF blasters.
//!
//! Wire format:
//! ```text
//! [type:1][repeat:1][pulse_len:2 LE][pulses:N][0x0d 0x05][zero padding]
//! ```
//! Pulses are one byte each, or `0x00` followed by a big-endian `u16` for
//! pulses that do not fit in a byte.  The packet is padded so that, once the
//! device layer prepends its 4-byte header, the total is a multiple of the
//! 16-byte AES block size.

use crate::codec::CodecError;

/// Minimum length of a well-formed packet (type, repeat, length, terminator).
pub const MIN_PACKET_LEN: usize = 6;

/// Trailer written after the pulse stream of an IR packet.
pub const IR_TERMINATOR: [u8; 2] = [0x0d, 0x05];

/// Size of the header the device transport prepends before encryption.
pub const TRANSPORT_HEADER_LEN: usize = 4;

/// Encryption block size the packet is aligned to.
pub const BLOCK_SIZE: usize = 16;

/// Signal family encoded in byte 0 of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Infrared.
    Ir = 0x26,
    /// Radio, 433 MHz band.
    Rf433 = 0xb2,
    /// Radio, 315 MHz band.
    Rf315 = 0xd7,
}

impl TryFrom<u8> for PacketType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x26 => Ok(PacketType::Ir),
            0xb2 => Ok(PacketType::Rf433),
            0xd7 => Ok(PacketType::Rf315),
            _ => Err(()),
        }
    }
}

impl PacketType {
    /// Returns `true` if `byte` is one of the recognised type tags.
    pub fn is_tag(byte: u8) -> bool {
        PacketType::try_from(byte).is_ok()
    }
}

/// A validated canonical packet.
///
/// Construction always checks the type tag and minimum length, so holders of
/// a `CanonicalPacket` never need to re-validate.  The bytes are never
/// mutated in place: [`CanonicalPacket::with_repeat`] returns a copy, which
/// keeps packets cached in the command table canonical across reuse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalPacket(Vec<u8>);

impl CanonicalPacket {
    /// Validates `bytes` and wraps them.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidCode`] if the first byte is not a valid
    /// type tag or the packet is shorter than [`MIN_PACKET_LEN`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CodecError> {
        match bytes.first() {
            None => return Err(CodecError::InvalidCode("empty packet".to_string())),
            Some(&tag) if !PacketType::is_tag(tag) => {
                return Err(CodecError::InvalidCode(format!(
                    "unknown packet type 0x{tag:02x}"
                )))
            }
            Some(_) => {}
        }
        if bytes.len() < MIN_PACKET_LEN {
            return Err(CodecError::InvalidCode(format!(
                "packet too short: {} bytes",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Signal family of this packet.
    pub fn packet_type(&self) -> PacketType {
        // Validated in `from_bytes`.
        PacketType::try_from(self.0[0]).unwrap_or(PacketType::Ir)
    }

    /// The repeat byte.
    pub fn repeat(&self) -> u8 {
        self.0[1]
    }

    /// Returns a copy whose repeat byte is multiplied by `repeat + 1`.
    ///
    /// `byte[1] = min(255, (byte[1] + 1) * (repeat + 1) - 1)`
    pub fn with_repeat(&self, repeat: u32) -> Self {
        let mut bytes = self.0.clone();
        bytes[1] = fold_repeat(bytes[1], repeat);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Folds an extra repeat count into an existing repeat byte, saturating at 255.
pub fn fold_repeat(current: u8, repeat: u32) -> u8 {
    let total = (u64::from(current) + 1) * (u64::from(repeat) + 1) - 1;
    total.min(255) as u8
}

/// Number of zero bytes needed so that `len + TRANSPORT_HEADER_LEN` is a
/// multiple of [`BLOCK_SIZE`].
pub fn padding_for(len: usize) -> usize {
    let remainder = (len + TRANSPORT_HEADER_LEN) % BLOCK_SIZE;
    if remainder == 0 {
        0
    } else {
        BLOCK_SIZE - remainder
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
