//! Change capture: the fan-in path from object mutations to the mirror.
//!
//! Every registered object's change notifications land on one shared
//! [`ChangeBus`], keyed by object identity. The bus deliberately carries no
//! property names: the mirror always republishes full state, so "which
//! object" is the only information the publish path needs.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use crate::observe::ObjectId;

/// Shared fan-in queue of mutated object identities.
///
/// Cloning is cheap; all clones drain the same queue. The mirror owns one
/// bus and hands each registered object a [`ChangeListener`] bound to it.
#[derive(Clone, Debug, Default)]
pub struct ChangeBus {
    queue: Arc<Mutex<VecDeque<ObjectId>>>,
}

impl ChangeBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a mutation notification for `id`.
    pub(crate) fn push(&self, id: ObjectId) {
        self.lock().push_back(id);
    }

    /// Drain all pending notifications in arrival order.
    pub fn drain(&self) -> Vec<ObjectId> {
        self.lock().drain(..).collect()
    }

    /// True if no notifications are pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of pending notifications.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ObjectId>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Notification handle held by a registered object.
///
/// The mirror wires one of these into the object at registration and
/// disconnects it at unregistration. The object's mutation path calls
/// [`ChangeListener::notify`] once per property write; the listener forwards
/// the object's identity to the shared bus.
#[derive(Clone, Debug)]
pub struct ChangeListener {
    id: ObjectId,
    bus: ChangeBus,
}

impl ChangeListener {
    /// Bind a listener for `id` to `bus`.
    pub fn new(id: ObjectId, bus: ChangeBus) -> Self {
        Self { id, bus }
    }

    /// The identity this listener reports.
    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    /// Report one mutation of the bound object.
    pub fn notify(&self) {
        self.bus.push(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_drain_in_arrival_order() {
        let bus = ChangeBus::new();
        let first = ChangeListener::new(7, bus.clone());
        let second = ChangeListener::new(9, bus.clone());

        first.notify();
        second.notify();
        first.notify();

        assert_eq!(bus.drain(), [7, 9, 7]);
        assert!(bus.is_empty());
    }

    #[test]
    fn clones_share_one_queue() {
        let bus = ChangeBus::new();
        let listener = ChangeListener::new(1, bus.clone());

        listener.notify();
        assert_eq!(bus.len(), 1);
        assert_eq!(bus.drain(), [1]);
    }

    #[test]
    fn drain_on_empty_bus_is_empty() {
        let bus = ChangeBus::new();
        assert!(bus.drain().is_empty());
    }
}
