//! Node error types.

use tain_core::{ObjectId, RegistryError};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors from driver operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Registration operation failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Transport operation failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Operation addressed an object the driver's store does not hold.
    #[error("unknown object: {0}")]
    UnknownObject(ObjectId),
}
