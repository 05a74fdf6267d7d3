//! Wire encoding for protocol messages.
//!
//! # Wire Format
//!
//! ```text
//! [version: u8][payload: bincode-encoded message]
//! ```
//!
//! Message type dispatch happens outside the payload (per-type streams or
//! topics), so the payload carries no discriminator.

use crate::NetworkMessage;
use thiserror::Error;

/// Current wire format version.
pub const WIRE_VERSION: u8 = 1;

/// Errors from message encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unknown wire version: {0}")]
    UnknownVersion(u8),

    #[error("Message too short")]
    MessageTooShort,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),
}

/// Encode a message to wire bytes, version byte prepended.
pub fn encode_payload<M: NetworkMessage>(message: &M) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serialize(message).map_err(|e| CodecError::Encode(e.to_string()))?;
    let mut bytes = Vec::with_capacity(1 + payload.len());
    bytes.push(WIRE_VERSION);
    bytes.extend(payload);
    Ok(bytes)
}

/// Decode wire bytes produced by [`encode_payload`].
pub fn decode_payload<M: NetworkMessage>(bytes: &[u8]) -> Result<M, CodecError> {
    let (&version, payload) = bytes.split_first().ok_or(CodecError::MessageTooShort)?;
    if version != WIRE_VERSION {
        return Err(CodecError::UnknownVersion(version));
    }
    bincode::deserialize(payload).map_err(|e| CodecError::Decode(e.to_string()))
}
