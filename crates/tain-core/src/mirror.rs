//! The mirror state machine: publish local changes, arbitrate and apply
//! remote ones.
//!
//! `StateMirror` performs no I/O. Registration operations and transport
//! events return [`Action`]s for the driver to execute; inbound messages are
//! classified and either applied or discarded. The classification for one
//! inbound `(topic, bytes)` pair is:
//!
//! - unregistered topic → ignore silently
//! - malformed payload → log, discard
//! - revision ≤ local → stale, log, discard
//! - revision > local → apply with notifications suppressed, then commit the
//!   message's revision
//!
//! Suppression during apply is what breaks the echo loop: without it, the
//! apply's property writes would re-enter change capture and republish the
//! just-applied state onto the same topic.

use tain_proto::Envelope;

use crate::{
    capture::{ChangeBus, ChangeListener},
    error::RegistryError,
    observe::{ObjectId, ObjectStore, Observable},
    registry::Registry,
    serialize::{apply_body, serialize},
};

/// Transport actions emitted by the mirror.
///
/// The driver passes fixed delivery defaults (qos 0, no retain, no dup) to
/// its transport; the mirror does not vary them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Subscribe to a topic.
    Subscribe {
        /// Topic to subscribe to.
        topic: String,
    },

    /// Unsubscribe from a topic.
    Unsubscribe {
        /// Topic to unsubscribe from.
        topic: String,
    },

    /// Publish an encoded envelope to a topic.
    Publish {
        /// Topic to publish to.
        topic: String,
        /// UTF-8 JSON envelope bytes.
        payload: Vec<u8>,
    },
}

/// Re-enables notifications on every exit path of a remote apply.
struct SuppressScope<'a> {
    object: &'a mut dyn Observable,
}

impl<'a> SuppressScope<'a> {
    fn new(object: &'a mut dyn Observable) -> Self {
        object.set_notifications_suppressed(true);
        Self { object }
    }

    fn object(&mut self) -> &mut dyn Observable {
        self.object
    }
}

impl Drop for SuppressScope<'_> {
    fn drop(&mut self) {
        self.object.set_notifications_suppressed(false);
    }
}

/// Revision-gated bidirectional state mirror.
///
/// Owns the registry, the change-capture bus, and the connection flag.
/// Objects stay with the caller and are resolved per call through an
/// [`ObjectStore`].
#[derive(Debug, Default)]
pub struct StateMirror {
    registry: Registry,
    changes: ChangeBus,
    connected: bool,
}

impl StateMirror {
    /// Create a mirror that starts disconnected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mirror with an initial connection state, for drivers whose
    /// transport is already up when the mirror is constructed.
    pub fn with_connected(connected: bool) -> Self {
        Self { registry: Registry::new(), changes: ChangeBus::new(), connected }
    }

    /// True if the transport is currently considered connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The shared change-capture bus.
    pub fn change_bus(&self) -> &ChangeBus {
        &self.changes
    }

    /// Number of registered objects.
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Current revision of a registered object.
    pub fn revision(&self, object: ObjectId) -> Option<i64> {
        self.registry.revision(object)
    }

    /// Topic a registered object is bound to.
    pub fn topic_for(&self, object: ObjectId) -> Option<&str> {
        self.registry.topic_for(object)
    }

    /// Object bound to a topic.
    pub fn object_for(&self, topic: &str) -> Option<ObjectId> {
        self.registry.object_for(topic)
    }

    /// Bind `object` to `topic` and wire up change capture.
    ///
    /// Emits a `Subscribe` action if the transport is connected; while
    /// disconnected the binding is recorded and the subscription happens on
    /// the next `connected` event.
    ///
    /// # Errors
    ///
    /// Fails without side effect if the object or topic is already bound, or
    /// if the store cannot resolve the object.
    pub fn register(
        &mut self,
        object: ObjectId,
        topic: impl Into<String>,
        store: &mut impl ObjectStore,
    ) -> Result<Vec<Action>, RegistryError> {
        let topic = topic.into();

        if store.get(object).is_none() {
            return Err(RegistryError::ObjectNotFound(object));
        }
        self.registry.bind(object, topic.clone())?;

        if let Some(target) = store.get_mut(object) {
            target.connect_change_listener(ChangeListener::new(object, self.changes.clone()));
        }

        tracing::debug!(object, %topic, "registered");

        if self.connected {
            Ok(vec![Action::Subscribe { topic }])
        } else {
            Ok(vec![])
        }
    }

    /// Remove the binding for `object` and unwire change capture.
    ///
    /// Emits an `Unsubscribe` action if the transport is connected.
    ///
    /// # Errors
    ///
    /// Fails if the object is not registered.
    pub fn unregister(
        &mut self,
        object: ObjectId,
        store: &mut impl ObjectStore,
    ) -> Result<Vec<Action>, RegistryError> {
        let topic = self.registry.unbind(object)?;

        if let Some(target) = store.get_mut(object) {
            target.disconnect_change_listener();
        }

        tracing::debug!(object, %topic, "unregistered");

        if self.connected {
            Ok(vec![Action::Unsubscribe { topic }])
        } else {
            Ok(vec![])
        }
    }

    /// Resolve `topic` to its object and unregister it.
    ///
    /// # Errors
    ///
    /// Fails if no object is bound to the topic.
    pub fn unregister_topic(
        &mut self,
        topic: &str,
        store: &mut impl ObjectStore,
    ) -> Result<Vec<Action>, RegistryError> {
        let object = self
            .registry
            .object_for(topic)
            .ok_or_else(|| RegistryError::TopicNotFound(topic.to_string()))?;

        self.unregister(object, store)
    }

    /// Transport came up: subscribe every bound topic.
    pub fn connected(&mut self) -> Vec<Action> {
        self.connected = true;

        self.registry
            .topics()
            .map(|topic| Action::Subscribe { topic: topic.to_string() })
            .collect()
    }

    /// Transport went down. No unsubscribes are issued: the transport drops
    /// subscriptions itself.
    pub fn disconnected(&mut self) -> Vec<Action> {
        self.connected = false;
        vec![]
    }

    /// Process one inbound message. Total: every failure is recovered
    /// locally, logged, and discarded without state change.
    pub fn message_received(
        &mut self,
        topic: &str,
        payload: &[u8],
        store: &mut impl ObjectStore,
    ) -> Vec<Action> {
        let Some(object) = self.registry.object_for(topic) else {
            return vec![];
        };

        let envelope = match Envelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::debug!(topic, %error, "discarding malformed payload");
                return vec![];
            },
        };

        let local = self.registry.revision(object).unwrap_or(0);
        if envelope.revision <= local {
            tracing::debug!(
                topic,
                local,
                inbound = envelope.revision,
                "discarding stale update"
            );
            return vec![];
        }

        let Some(target) = store.get_mut(object) else {
            tracing::warn!(topic, object, "registered object missing from store");
            return vec![];
        };

        {
            let mut scope = SuppressScope::new(target);
            apply_body(scope.object(), &envelope.body);
            self.registry.set_revision(object, envelope.revision);
        }

        tracing::debug!(topic, object, revision = envelope.revision, "applied remote update");

        vec![]
    }

    /// Drain change capture and publish full state for each mutated object.
    ///
    /// For every drained notification: reserve `local + 1` in the registry
    /// first, then emit the publish carrying the reserved revision, so a
    /// fast echo of this update is already stale by the time it loops back.
    /// Notifications drained while disconnected are dropped, not queued.
    pub fn poll_changes(&mut self, store: &mut impl ObjectStore) -> Vec<Action> {
        let mut actions = Vec::new();

        for object in self.changes.drain() {
            if !self.connected {
                continue;
            }
            let Some(topic) = self.registry.topic_for(object).map(str::to_string) else {
                // Unregistered between notification and drain.
                continue;
            };
            let Some(revision) = self.registry.reserve_revision(object) else {
                continue;
            };
            let Some(target) = store.get(object) else {
                tracing::warn!(object, "mutated object missing from store");
                continue;
            };

            let envelope = serialize(target, revision);
            match envelope.encode() {
                Ok(payload) => actions.push(Action::Publish { topic, payload }),
                Err(error) => {
                    tracing::error!(object, %error, "failed to encode outbound state");
                },
            }
        }

        actions
    }
}
