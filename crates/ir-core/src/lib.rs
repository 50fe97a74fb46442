//! # ir-core
//!
//! Shared library for IR-Bridge containing the IR/RF code transcoding
//! pipeline.  It turns whatever a client sends ("play this code") into the
//! canonical binary packet that an IR/RF blaster understands.
//!
//! This crate has zero dependencies on sockets, async runtimes, or device
//! state: every function is pure and can be tested in isolation.
//!
//! # Architecture overview (for beginners)
//!
//! An IR code can reach the bridge in several shapes:
//!
//! ```text
//!  "power"                       named command (looked up by the caller)
//!  "0000 006D 0000 0022 ..."     Pronto hex text
//!  "JgBQAAABKJIVEhUSFT..."       base64 of a canonical packet
//!  [0x26, 0x00, 0x50, ...]       the canonical packet itself
//!  "3*<any of the above>"        repeat the code three times
//! ```
//!
//! - **`code`** – The [`IrCode`] tagged union.  A raw payload is classified
//!   exactly once at the protocol boundary so the rest of the pipeline never
//!   has to sniff bytes again.
//!
//! - **`codec`** – Repeat-multiplier folding and the single
//!   [`decode`] dispatch from an [`IrCode`] to a [`CanonicalPacket`].
//!
//! - **`pronto`** – Conversion of Pronto hex words into pulse widths.
//!
//! - **`packet`** – The validated, immutable canonical packet type.

pub mod code;
pub mod codec;
pub mod packet;
pub mod pronto;

// Re-export the most-used types at the crate root so callers can write
// `ir_core::IrCode` instead of `ir_core::code::IrCode`.
pub use code::IrCode;
pub use codec::{decode, decode_multiply, decode_text, CodecError};
pub use packet::{CanonicalPacket, PacketType};
pub use pronto::{decode_pronto, ProntoError};
