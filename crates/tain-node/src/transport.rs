//! The pub/sub transport capability consumed by the driver.
//!
//! The mirror core is transport-agnostic; anything that can subscribe,
//! unsubscribe, publish, and deliver events fits behind [`Transport`].
//! Delivery quality parameters are passed through with fixed defaults — the
//! protocol never varies them.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Delivery parameters passed through to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// Quality-of-service level.
    pub qos: u8,
    /// Retain flag.
    pub retain: bool,
    /// Duplicate-delivery flag.
    pub dup: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self { qos: 0, retain: false, dup: false }
    }
}

/// Events delivered by a transport to its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport established (or re-established) its connection.
    Connected,

    /// The transport lost its connection. Subscriptions are gone with it.
    Disconnected,

    /// A message arrived on a subscribed topic.
    Message {
        /// Topic the message arrived on.
        topic: String,
        /// Raw payload bytes.
        payload: Bytes,
    },

    /// A publish was accepted by the broker. Informational only.
    Published {
        /// Topic the publish was for.
        topic: String,
    },

    /// A subscription was acknowledged. Informational only.
    Subscribed {
        /// Topic the subscription was for.
        topic: String,
    },

    /// An unsubscription was acknowledged. Informational only.
    Unsubscribed {
        /// Topic the unsubscription was for.
        topic: String,
    },
}

/// Errors from transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport is not connected.
    #[error("transport is not connected")]
    NotConnected,

    /// The peer or broker is gone.
    #[error("transport closed: {reason}")]
    Closed {
        /// Description of the closure.
        reason: String,
    },
}

/// Pub/sub transport: fire-and-forget primitives plus an event stream.
#[async_trait]
pub trait Transport: Send {
    /// Subscribe to a topic.
    async fn subscribe(&mut self, topic: &str, qos: u8) -> Result<(), TransportError>;

    /// Unsubscribe from a topic.
    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Publish payload bytes to a topic.
    async fn publish(
        &mut self,
        topic: &str,
        payload: Bytes,
        options: PublishOptions,
    ) -> Result<(), TransportError>;

    /// Wait for the next event. `None` means the transport is gone for good.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Return an already-delivered event without waiting, if one is queued.
    fn try_next_event(&mut self) -> Option<TransportEvent>;

    /// Current connection state as seen by the transport.
    fn is_connected(&self) -> bool;
}
