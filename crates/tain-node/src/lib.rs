//! Async driver and in-process transport for Tain mirrors.
//!
//! The core never touches a socket; this crate closes the loop:
//!
//! ```text
//! tain-node
//!   ├─ Transport      (pub/sub capability consumed by the driver)
//!   ├─ LocalBroker    (in-process hub wiring transports together)
//!   └─ MirrorDriver   (owns mirror + object store, executes actions)
//! ```
//!
//! All mirror operations for one driver run on the task that owns it, which
//! satisfies the core's single-thread-of-control requirement.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod broker;
mod driver;
mod error;
mod transport;

pub use broker::{LocalBroker, LocalTransport};
pub use driver::MirrorDriver;
pub use error::NodeError;
pub use transport::{PublishOptions, Transport, TransportError, TransportEvent};
