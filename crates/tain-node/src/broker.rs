//! In-process pub/sub hub.
//!
//! `LocalBroker` wires any number of [`LocalTransport`] clients together
//! with plain topic matching (exact string equality, no wildcards). Like a
//! real broker, it delivers a publish to *every* subscriber of the topic —
//! including the publisher itself if subscribed, which is exactly the echo
//! the mirror's revision gate has to reject. Used by the demo binary and by
//! integration tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::transport::{PublishOptions, Transport, TransportError, TransportEvent};

type ClientId = u64;

#[derive(Default)]
struct BrokerShared {
    next_client: ClientId,
    clients: HashMap<ClientId, mpsc::UnboundedSender<TransportEvent>>,
    subscriptions: HashMap<String, HashSet<ClientId>>,
}

impl BrokerShared {
    fn deliver(&self, client: ClientId, event: TransportEvent) {
        if let Some(sender) = self.clients.get(&client) {
            // A dropped receiver just means the client is gone.
            let _ = sender.send(event);
        }
    }
}

/// In-process broker connecting [`LocalTransport`] clients.
#[derive(Clone, Default)]
pub struct LocalBroker {
    shared: Arc<Mutex<BrokerShared>>,
}

impl LocalBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new client. The client starts connected and receives a
    /// `Connected` event as its first delivery.
    pub fn connect(&self) -> LocalTransport {
        let (sender, events) = mpsc::unbounded_channel();

        let id = {
            let mut shared = lock(&self.shared);
            let id = shared.next_client;
            shared.next_client += 1;
            shared.clients.insert(id, sender.clone());
            id
        };

        // First event the driver sees.
        let _ = sender.send(TransportEvent::Connected);

        LocalTransport { id, shared: Arc::clone(&self.shared), events, connected: true }
    }
}

fn lock(shared: &Arc<Mutex<BrokerShared>>) -> std::sync::MutexGuard<'_, BrokerShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One client's connection to a [`LocalBroker`].
pub struct LocalTransport {
    id: ClientId,
    shared: Arc<Mutex<BrokerShared>>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    connected: bool,
}

impl LocalTransport {
    /// Simulate a connection loss: the broker forgets this client's
    /// subscriptions and the client receives a `Disconnected` event.
    pub fn drop_connection(&mut self) {
        {
            let mut shared = lock(&self.shared);
            for subscribers in shared.subscriptions.values_mut() {
                subscribers.remove(&self.id);
            }
            shared.subscriptions.retain(|_, subscribers| !subscribers.is_empty());
            shared.deliver(self.id, TransportEvent::Disconnected);
        }
        self.connected = false;
    }

    /// Simulate the connection coming back. Subscriptions are not restored;
    /// the driver re-subscribes in response to the `Connected` event.
    pub fn restore_connection(&mut self) {
        lock(&self.shared).deliver(self.id, TransportEvent::Connected);
        self.connected = true;
    }
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        let mut shared = lock(&self.shared);
        shared.clients.remove(&self.id);
        for subscribers in shared.subscriptions.values_mut() {
            subscribers.remove(&self.id);
        }
        shared.subscriptions.retain(|_, subscribers| !subscribers.is_empty());
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn subscribe(&mut self, topic: &str, _qos: u8) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let mut shared = lock(&self.shared);
        shared.subscriptions.entry(topic.to_string()).or_default().insert(self.id);
        shared.deliver(self.id, TransportEvent::Subscribed { topic: topic.to_string() });

        Ok(())
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let mut shared = lock(&self.shared);
        if let Some(subscribers) = shared.subscriptions.get_mut(topic) {
            subscribers.remove(&self.id);
            if subscribers.is_empty() {
                shared.subscriptions.remove(topic);
            }
        }
        shared.deliver(self.id, TransportEvent::Unsubscribed { topic: topic.to_string() });

        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: Bytes,
        _options: PublishOptions,
    ) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let shared = lock(&self.shared);
        if let Some(subscribers) = shared.subscriptions.get(topic) {
            for subscriber in subscribers {
                shared.deliver(
                    *subscriber,
                    TransportEvent::Message {
                        topic: topic.to_string(),
                        payload: payload.clone(),
                    },
                );
            }
        }
        shared.deliver(self.id, TransportEvent::Published { topic: topic.to_string() });

        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    fn try_next_event(&mut self) -> Option<TransportEvent> {
        self.events.try_recv().ok()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
