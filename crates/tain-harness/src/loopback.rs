//! Real mirrors wired together with synchronous in-memory routing.

use std::collections::HashSet;

use serde_json::{Value, json};
use tain_core::{Action, MemoryStore, ObjectId, Observable, PropertyCell, StateMirror};

use crate::model::{ObservableState, Operation, PROPERTY_KEYS, ReplicaState};

const OBJECT: ObjectId = 1;

struct Replica {
    mirror: StateMirror,
    store: MemoryStore,
    subscriptions: HashSet<String>,
    link: bool,
}

/// A group of real [`StateMirror`]s with instant loopback delivery.
///
/// Every publish action is routed synchronously to every replica whose link
/// is up and which is subscribed to the topic — the publisher included, so
/// self-echoes exercise the stale gate the same way a broker would. Applies
/// are asserted to produce no follow-up actions: a republish during apply
/// would be the echo loop the protocol exists to prevent.
pub struct LoopbackMirrors {
    topic: String,
    replicas: Vec<Replica>,
}

impl LoopbackMirrors {
    /// Create `count` replicas, each with one object (properties from
    /// [`PROPERTY_KEYS`], all 0) registered on `topic` with the link up.
    ///
    /// # Panics
    ///
    /// Panics if registration fails, which would be a harness bug.
    #[allow(clippy::expect_used)]
    pub fn new(count: usize, topic: &str) -> Self {
        let mut replicas = Vec::with_capacity(count);

        for _ in 0..count {
            let mut store = MemoryStore::new();
            store.insert(
                OBJECT,
                PropertyCell::new(
                    PROPERTY_KEYS.iter().map(|key| ((*key).to_string(), json!(0))),
                ),
            );

            let mut mirror = StateMirror::with_connected(true);
            let actions = mirror
                .register(OBJECT, topic, &mut store)
                .expect("fresh replica registration cannot collide");

            let mut replica = Replica { mirror, store, subscriptions: HashSet::new(), link: true };
            record_subscriptions(&mut replica, &actions);
            replicas.push(replica);
        }

        Self { topic: topic.to_string(), replicas }
    }

    /// Number of replicas.
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    /// True if the group is empty.
    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Apply one operation, routing any publishes synchronously.
    pub fn apply(&mut self, op: &Operation) {
        match *op {
            Operation::Mutate { replica, key, value } => self.apply_mutate(replica, key, value),
            Operation::SetLink { replica, up } => self.apply_set_link(replica, up),
        }
    }

    fn apply_mutate(&mut self, index: usize, key: usize, value: i64) {
        if index >= self.replicas.len() || key >= PROPERTY_KEYS.len() {
            return;
        }

        let replica = &mut self.replicas[index];
        if let Some(cell) = replica.store.cell_mut(OBJECT) {
            cell.set(PROPERTY_KEYS[key], json!(value));
        }

        let actions = replica.mirror.poll_changes(&mut replica.store);
        self.route(index, actions);
    }

    fn apply_set_link(&mut self, index: usize, up: bool) {
        let Some(replica) = self.replicas.get_mut(index) else {
            return;
        };

        if up {
            replica.link = true;
            let actions = replica.mirror.connected();
            self.route(index, actions);
        } else {
            replica.link = false;
            replica.subscriptions.clear();
            let actions = replica.mirror.disconnected();
            assert!(actions.is_empty(), "disconnect must not emit transport calls");
        }
    }

    fn route(&mut self, from: usize, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Subscribe { topic } => {
                    self.replicas[from].subscriptions.insert(topic);
                },
                Action::Unsubscribe { topic } => {
                    self.replicas[from].subscriptions.remove(&topic);
                },
                Action::Publish { topic, payload } => {
                    for replica in &mut self.replicas {
                        if replica.link && replica.subscriptions.contains(&topic) {
                            let follow_up = replica.mirror.message_received(
                                &topic,
                                &payload,
                                &mut replica.store,
                            );
                            assert!(
                                follow_up.is_empty(),
                                "an apply must never trigger a publish"
                            );
                            assert!(
                                replica.mirror.change_bus().is_empty(),
                                "an apply must not leave change notifications behind"
                            );
                        }
                    }
                },
            }
        }
    }

    /// Extract the observable state for oracle comparison.
    pub fn observable_state(&self) -> ObservableState {
        self.replicas
            .iter()
            .map(|replica| ReplicaState {
                values: PROPERTY_KEYS
                    .iter()
                    .map(|key| {
                        replica
                            .store
                            .cell(OBJECT)
                            .and_then(|cell| cell.value(key))
                            .cloned()
                            .unwrap_or(Value::Null)
                    })
                    .collect(),
                revision: replica.mirror.revision(OBJECT).unwrap_or(0),
                link: replica.link,
            })
            .collect()
    }

    /// Topic the group mirrors on.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

fn record_subscriptions(replica: &mut Replica, actions: &[Action]) {
    for action in actions {
        match action {
            Action::Subscribe { topic } => {
                replica.subscriptions.insert(topic.clone());
            },
            Action::Unsubscribe { topic } => {
                replica.subscriptions.remove(topic);
            },
            Action::Publish { .. } => {},
        }
    }
}
