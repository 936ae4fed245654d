//! Reference model of a mirrored replica group.
//!
//! Deliberately naive: plain maps, instant delivery, no queues. The model
//! encodes the protocol's intended semantics — full-state replication gated
//! by strictly-increasing revisions, lossy while disconnected — and serves
//! as the oracle the real implementation is compared against.

use serde_json::{Value, json};

/// Property names every modeled object carries.
pub const PROPERTY_KEYS: [&str; 2] = ["a", "b"];

/// One step applied to both the model and the real replicas.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Mutate one property on one replica's local object.
    Mutate {
        /// Index of the replica to mutate.
        replica: usize,
        /// Index into [`PROPERTY_KEYS`].
        key: usize,
        /// New value for the property.
        value: i64,
    },

    /// Bring a replica's transport link up or down.
    SetLink {
        /// Index of the replica.
        replica: usize,
        /// New link state.
        up: bool,
    },
}

/// Observable state of one replica, for oracle comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaState {
    /// Property values in declaration order.
    pub values: Vec<Value>,
    /// Local revision counter.
    pub revision: i64,
    /// Whether the replica's link is up.
    pub link: bool,
}

/// Observable state of the whole group.
pub type ObservableState = Vec<ReplicaState>;

#[derive(Debug, Clone)]
struct ModelReplica {
    values: Vec<Value>,
    revision: i64,
    link: bool,
}

/// The reference replica group.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    replicas: Vec<ModelReplica>,
}

impl ModelWorld {
    /// Create a group of `count` replicas, all linked, all at revision 0,
    /// with every property initialized to 0.
    pub fn new(count: usize) -> Self {
        let replica = ModelReplica {
            values: PROPERTY_KEYS.iter().map(|_| json!(0)).collect(),
            revision: 0,
            link: true,
        };
        Self { replicas: vec![replica; count] }
    }

    /// Number of replicas in the group.
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    /// True if the group is empty.
    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Apply one operation with instant delivery.
    pub fn apply(&mut self, op: &Operation) {
        match *op {
            Operation::Mutate { replica, key, value } => self.apply_mutate(replica, key, value),
            Operation::SetLink { replica, up } => {
                if let Some(target) = self.replicas.get_mut(replica) {
                    target.link = up;
                }
            },
        }
    }

    fn apply_mutate(&mut self, replica: usize, key: usize, value: i64) {
        if replica >= self.replicas.len() || key >= PROPERTY_KEYS.len() {
            return;
        }

        // The local write always lands.
        self.replicas[replica].values[key] = json!(value);

        // Publishing requires a live link; a dead one drops the update.
        if !self.replicas[replica].link {
            return;
        }

        self.replicas[replica].revision += 1;
        let published_revision = self.replicas[replica].revision;
        let snapshot = self.replicas[replica].values.clone();

        // Instant delivery to every linked replica, the sender included.
        // The sender's own copy is already at the published revision, so the
        // echo fails the strictly-greater gate, as does anything stale.
        for target in &mut self.replicas {
            if target.link && published_revision > target.revision {
                target.values = snapshot.clone();
                target.revision = published_revision;
            }
        }
    }

    /// Extract the observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        self.replicas
            .iter()
            .map(|replica| ReplicaState {
                values: replica.values.clone(),
                revision: replica.revision,
                link: replica.link,
            })
            .collect()
    }
}
