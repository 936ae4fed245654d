//! The update envelope and its JSON codec.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Per-object revision counter carried on the wire.
///
/// Signed 64-bit: local mutations reserve `local + 1`, accepted remote
/// updates overwrite the local counter with the message's value.
pub type Revision = i64;

/// Flat property-name → value mapping.
///
/// The map preserves insertion order, matching the sender's property
/// enumeration order. A body need not cover every property of the target
/// object, and may carry keys the receiver does not have.
pub type Body = Map<String, Value>;

/// A full-state update for one mirrored object.
///
/// Field order matters for the serialized form: `body` first, then
/// `revision`. Unknown top-level keys on inbound documents are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Full observable state of the sending object.
    pub body: Body,

    /// Revision reserved for this update by the sender.
    #[serde(deserialize_with = "numeric_revision")]
    pub revision: Revision,
}

/// Errors from envelope encoding and decoding.
#[derive(Debug, Error)]
pub enum WireError {
    /// Inbound bytes do not decode into the expected envelope shape.
    #[error("malformed payload: {reason}")]
    Malformed {
        /// Decoder diagnostic.
        reason: String,
    },

    /// Outbound envelope failed to serialize.
    #[error("payload encoding failed: {reason}")]
    Encode {
        /// Encoder diagnostic.
        reason: String,
    },
}

impl Envelope {
    /// Create an envelope from a body and its reserved revision.
    pub fn new(body: Body, revision: Revision) -> Self {
        Self { body, revision }
    }

    /// Encode to UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `WireError::Encode` if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(self).map_err(|e| WireError::Encode { reason: e.to_string() })
    }

    /// Decode from UTF-8 JSON bytes.
    ///
    /// Rejects documents missing `body` or `revision`, and documents whose
    /// `revision` is not a JSON number.
    ///
    /// # Errors
    ///
    /// Returns `WireError::Malformed` on any decode failure.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(bytes).map_err(|e| WireError::Malformed { reason: e.to_string() })
    }
}

/// Accept any JSON number as a revision, truncating fractions toward zero.
#[allow(clippy::cast_possible_truncation)]
fn numeric_revision<'de, D>(deserializer: D) -> Result<Revision, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;

    number
        .as_i64()
        .or_else(|| number.as_f64().map(|f| f as i64))
        .ok_or_else(|| serde::de::Error::custom(format!("revision out of range: {number}")))
}
