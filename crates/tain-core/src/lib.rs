//! Sans-IO core of the Tain state mirroring protocol.
//!
//! Tain binds each caller-owned stateful object to exactly one pub/sub topic
//! and keeps replicas of that object eventually consistent across processes:
//! local property mutations publish the object's full state, inbound topic
//! messages apply remote state back. A per-object monotonic revision counter
//! rejects echoes and stale updates, which is what makes the bidirectional
//! loop safe.
//!
//! # Architecture
//!
//! ```text
//! tain-core
//!   ├─ Registry      (topic ↔ object bindings + revision counters)
//!   ├─ ChangeBus     (fan-in queue of mutated object identities)
//!   ├─ serialize     (full state ↔ wire body)
//!   └─ StateMirror   (publish, arbitrate, apply; events in, actions out)
//! ```
//!
//! The mirror is a pure state machine: it performs no I/O and owns no
//! objects. Callers resolve objects through the [`ObjectStore`] capability
//! passed into each call, and execute the returned [`Action`]s against their
//! transport.
//!
//! # Concurrency
//!
//! All mirror operations for a given set of objects must run on one logical
//! thread of control — the same one that owns the objects and dispatches
//! transport events. The suppress-write-reenable sequence during a remote
//! apply is only atomic under that assumption.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod capture;
mod error;
mod mirror;
mod observe;
mod registry;
mod serialize;

pub use capture::{ChangeBus, ChangeListener};
pub use error::RegistryError;
pub use mirror::{Action, StateMirror};
pub use observe::{MemoryStore, ObjectId, ObjectStore, Observable, PropertyCell};
pub use registry::Registry;
pub use serialize::{apply_body, serialize};
