//! CBOR encoding of events.
//!
//! Events use serde's adjacent tagging, so the encoded form is a two-entry map
//! `{"event": "receive_dm", "data": {...}}`. Unit events such as `connect`
//! carry no `data` entry.

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    InboundEvent, OutboundEvent,
    errors::{ProtocolError, Result},
};

/// Largest encoded event accepted in either direction (1 MiB).
pub const MAX_EVENT_SIZE: usize = 1 << 20;

/// Encode any serializable value to CBOR.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;

    if buf.len() > MAX_EVENT_SIZE {
        return Err(ProtocolError::EventTooLarge { size: buf.len(), max: MAX_EVENT_SIZE });
    }
    Ok(buf)
}

/// Decode a CBOR buffer into `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() > MAX_EVENT_SIZE {
        return Err(ProtocolError::EventTooLarge { size: bytes.len(), max: MAX_EVENT_SIZE });
    }
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}

impl InboundEvent {
    /// Encode to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode from CBOR.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

impl OutboundEvent {
    /// Encode to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode from CBOR.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}
