//! Model-based property tests.
//!
//! Random operation sequences are applied to both the reference model and a
//! group of real mirrors with loopback routing; their observable states must
//! match after every single step.
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld    LoopbackMirrors   Compare
//!      (reference)   (real mirrors)    states
//! ```

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use tain_harness::{LoopbackMirrors, ModelWorld, Operation, PROPERTY_KEYS};

const REPLICAS: usize = 3;
const TOPIC: &str = "model/topic";

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => (0..REPLICAS, 0..PROPERTY_KEYS.len(), -100i64..100)
            .prop_map(|(replica, key, value)| Operation::Mutate { replica, key, value }),
        1 => (0..REPLICAS, any::<bool>())
            .prop_map(|(replica, up)| Operation::SetLink { replica, up }),
    ]
}

proptest! {
    #[test]
    fn real_mirrors_match_reference_model(
        ops in proptest::collection::vec(operation_strategy(), 1..80)
    ) {
        let mut model = ModelWorld::new(REPLICAS);
        let mut real = LoopbackMirrors::new(REPLICAS, TOPIC);

        for (step, op) in ops.iter().enumerate() {
            model.apply(op);
            real.apply(op);

            prop_assert_eq!(
                real.observable_state(),
                model.observable_state(),
                "divergence after step {} ({:?})",
                step,
                op
            );
        }
    }

    #[test]
    fn fully_linked_groups_always_converge(
        ops in proptest::collection::vec(
            (0..REPLICAS, 0..PROPERTY_KEYS.len(), -100i64..100)
                .prop_map(|(replica, key, value)| Operation::Mutate { replica, key, value }),
            1..40,
        )
    ) {
        let mut real = LoopbackMirrors::new(REPLICAS, TOPIC);

        for op in &ops {
            real.apply(op);
        }

        // With every link up the final write wins everywhere.
        let state = real.observable_state();
        for replica in &state[1..] {
            prop_assert_eq!(&replica.values, &state[0].values);
            prop_assert_eq!(replica.revision, state[0].revision);
        }
    }
}
