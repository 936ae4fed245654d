//! Driver loop: owns a mirror and its objects, executes mirror actions
//! against a transport.

use bytes::Bytes;
use tain_core::{Action, MemoryStore, ObjectId, PropertyCell, StateMirror};

use crate::{
    error::NodeError,
    transport::{PublishOptions, Transport, TransportEvent},
};

/// Owns one [`StateMirror`], its object store, and its transport.
///
/// All operations run on the caller's task; the driver never spawns. Every
/// method that can change mirror state immediately executes the resulting
/// actions, so callers observe a consistent transport at each await point.
pub struct MirrorDriver<T: Transport> {
    mirror: StateMirror,
    store: MemoryStore,
    transport: T,
}

impl<T: Transport> MirrorDriver<T> {
    /// Wrap a transport. The mirror adopts the transport's current
    /// connection state.
    pub fn new(transport: T) -> Self {
        Self {
            mirror: StateMirror::with_connected(transport.is_connected()),
            store: MemoryStore::new(),
            transport,
        }
    }

    /// Read access to the mirror.
    pub fn mirror(&self) -> &StateMirror {
        &self.mirror
    }

    /// Read access to the object store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Direct access to the underlying transport, for link-level control.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Add an object to the store under `id`. Does not register it.
    pub fn insert_object(&mut self, id: ObjectId, cell: PropertyCell) {
        self.store.insert(id, cell);
    }

    /// Register an object on a topic and subscribe if connected.
    ///
    /// # Errors
    ///
    /// Fails on duplicate bindings, unresolvable objects, or transport
    /// failure while subscribing.
    pub async fn register(
        &mut self,
        id: ObjectId,
        topic: impl Into<String>,
    ) -> Result<(), NodeError> {
        let actions = self.mirror.register(id, topic, &mut self.store)?;
        self.execute(actions).await
    }

    /// Unregister an object and unsubscribe if connected.
    ///
    /// # Errors
    ///
    /// Fails if the object is not registered or the transport rejects the
    /// unsubscribe.
    pub async fn unregister(&mut self, id: ObjectId) -> Result<(), NodeError> {
        let actions = self.mirror.unregister(id, &mut self.store)?;
        self.execute(actions).await
    }

    /// Unregister whatever object is bound to `topic`.
    ///
    /// # Errors
    ///
    /// Fails if the topic is unbound or the transport rejects the
    /// unsubscribe.
    pub async fn unregister_topic(&mut self, topic: &str) -> Result<(), NodeError> {
        let actions = self.mirror.unregister_topic(topic, &mut self.store)?;
        self.execute(actions).await
    }

    /// Mutate an object through its normal mutation path, then flush the
    /// captured changes as publishes.
    ///
    /// # Errors
    ///
    /// Fails if the store does not hold `id` or a publish fails.
    pub async fn update(
        &mut self,
        id: ObjectId,
        mutate: impl FnOnce(&mut PropertyCell),
    ) -> Result<(), NodeError> {
        let cell = self.store.cell_mut(id).ok_or(NodeError::UnknownObject(id))?;
        mutate(cell);

        let actions = self.mirror.poll_changes(&mut self.store);
        self.execute(actions).await
    }

    /// Wait for and process one transport event. Returns `false` when the
    /// transport's event stream has ended.
    ///
    /// # Errors
    ///
    /// Fails if executing the resulting actions fails.
    pub async fn step(&mut self) -> Result<bool, NodeError> {
        let Some(event) = self.transport.next_event().await else {
            return Ok(false);
        };
        self.process(event).await?;
        Ok(true)
    }

    /// Process every already-delivered transport event without waiting.
    /// Returns the number of events processed.
    ///
    /// # Errors
    ///
    /// Fails if executing the resulting actions fails.
    pub async fn pump(&mut self) -> Result<usize, NodeError> {
        let mut processed = 0;
        while let Some(event) = self.transport.try_next_event() {
            self.process(event).await?;
            processed += 1;
        }
        Ok(processed)
    }

    async fn process(&mut self, event: TransportEvent) -> Result<(), NodeError> {
        let actions = match event {
            TransportEvent::Connected => self.mirror.connected(),
            TransportEvent::Disconnected => self.mirror.disconnected(),
            TransportEvent::Message { topic, payload } => {
                self.mirror.message_received(&topic, &payload, &mut self.store)
            },
            TransportEvent::Published { topic } => {
                tracing::trace!(%topic, "publish acknowledged");
                vec![]
            },
            TransportEvent::Subscribed { topic } => {
                tracing::trace!(%topic, "subscription acknowledged");
                vec![]
            },
            TransportEvent::Unsubscribed { topic } => {
                tracing::trace!(%topic, "unsubscription acknowledged");
                vec![]
            },
        };
        self.execute(actions).await
    }

    async fn execute(&mut self, actions: Vec<Action>) -> Result<(), NodeError> {
        for action in actions {
            match action {
                Action::Subscribe { topic } => {
                    let options = PublishOptions::default();
                    self.transport.subscribe(&topic, options.qos).await?;
                },
                Action::Unsubscribe { topic } => {
                    self.transport.unsubscribe(&topic).await?;
                },
                Action::Publish { topic, payload } => {
                    self.transport
                        .publish(&topic, Bytes::from(payload), PublishOptions::default())
                        .await?;
                },
            }
        }
        Ok(())
    }
}
