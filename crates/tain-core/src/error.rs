//! Registry error types.

use thiserror::Error;

use crate::observe::ObjectId;

/// Errors from the three public registration operations.
///
/// Every variant is reported before any state changes, so a failed operation
/// has no side effect. Inbound-message problems (malformed payloads, stale
/// revisions, unknown topics) are not errors: the mirror recovers from them
/// locally and never surfaces them to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The object is already bound to a topic.
    #[error("object {0} is already bound to a topic")]
    DuplicateObject(ObjectId),

    /// The topic is already bound to an object.
    #[error("topic {0:?} is already bound to an object")]
    DuplicateTopic(String),

    /// The object is not registered (or cannot be resolved in the store).
    #[error("object {0} is not registered")]
    ObjectNotFound(ObjectId),

    /// The topic is not bound to any object.
    #[error("topic {0:?} is not bound to any object")]
    TopicNotFound(String),
}
