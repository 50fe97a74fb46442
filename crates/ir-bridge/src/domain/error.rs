//! Error kinds surfaced by the registry and device layer.
//!
//! Each front end maps these onto its own failure channel: an HTTP status
//! code, LIRC `ERROR` framing, or a logged-and-dropped MQTT message.  None of
//! them is fatal at request time.

use ir_core::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The payload could not be decoded into a packet.
    ///
    /// Pronto structural violations arrive here wrapped in
    /// [`CodecError::InvalidPronto`].
    #[error(transparent)]
    InvalidCode(#[from] CodecError),

    /// A command name contains whitespace (LIRC tokens are space-separated).
    #[error("invalid command name {0:?}: command names cannot contain spaces")]
    InvalidCommandName(String),

    /// No device matched the identifier and none could be reached at it.
    #[error("device not found: {0}")]
    NotFound(String),

    /// The device did not complete the handshake.  Retried on the next call.
    #[error("connection to {0} failed")]
    ConnectionFailed(String),
}

impl BridgeError {
    /// `true` for errors caused by the request payload rather than by the
    /// device or its lookup.
    pub fn is_bad_payload(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidCode(_) | BridgeError::InvalidCommandName(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir_core::ProntoError;

    #[test]
    fn test_codec_error_converts_into_invalid_code() {
        let err: BridgeError = CodecError::InvalidPronto(ProntoError::TooShort).into();
        assert!(matches!(err, BridgeError::InvalidCode(_)));
        assert!(err.is_bad_payload());
        assert_eq!(err.to_string(), "invalid pronto code: pronto code is too short");
    }

    #[test]
    fn test_not_found_is_not_a_payload_error() {
        let err = BridgeError::NotFound("kitchen".to_string());
        assert!(!err.is_bad_payload());
        assert_eq!(err.to_string(), "device not found: kitchen");
    }
}
