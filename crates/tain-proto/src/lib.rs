//! Wire payload types for the Tain state mirroring protocol.
//!
//! A mirrored update travels as a single UTF-8 JSON document:
//!
//! ```json
//! { "body": { "<property>": <value>, ... }, "revision": 3 }
//! ```
//!
//! `body` is a flat property-name → value mapping holding the sender's full
//! observable state; `revision` is the sender's reservation counter for the
//! update. Receivers ignore unknown top-level keys and discard anything that
//! does not decode into this shape.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod envelope;

pub use envelope::{Body, Envelope, Revision, WireError};
