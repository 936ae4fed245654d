//! Deterministic test harness for the Tain mirroring protocol.
//!
//! Two halves:
//!
//! - [`model`] — a naive reference implementation of a replica group with
//!   instant delivery and the same lossy-disconnect semantics as the real
//!   protocol. It is the oracle for model-based testing.
//! - [`LoopbackMirrors`] — real [`tain_core::StateMirror`]s wired together
//!   in memory, routing every publish action synchronously to every
//!   subscribed replica (the publisher included, so echoes hit the stale
//!   gate exactly as they would through a broker).
//!
//! Model-based tests apply the same operation sequence to both halves and
//! compare their observable states after every step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod loopback;
pub mod model;

pub use loopback::LoopbackMirrors;
pub use model::{ModelWorld, ObservableState, Operation, ReplicaState, PROPERTY_KEYS};
