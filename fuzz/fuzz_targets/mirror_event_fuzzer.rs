//! Fuzz target for the [`StateMirror`] event surface
//!
//! # Strategy
//!
//! - Arbitrary sequences of register/unregister, connection flaps, local
//!   mutations, and inbound messages (both structured and raw garbage)
//! - Structured inbound envelopes probe the revision gate with arbitrary
//!   revisions, including negative and duplicate ones
//!
//! # Invariants
//!
//! - NEVER panic, whatever the sequence
//! - Revisions are monotonically non-decreasing per binding
//! - No publish action is ever emitted while disconnected
//! - An apply never leaves pending change notifications behind

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::json;
use tain_core::{Action, MemoryStore, PropertyCell, StateMirror};

/// Small pools keep collisions frequent.
const OBJECTS: [u64; 3] = [1, 2, 3];
const TOPICS: [&str; 3] = ["t/0", "t/1", "t/2"];

#[derive(Debug, Arbitrary)]
enum MirrorEvent {
    Register { object: u8, topic: u8 },
    Unregister { object: u8 },
    UnregisterTopic { topic: u8 },
    Connect,
    Disconnect,
    Mutate { object: u8, value: i32 },
    Inbound { topic: u8, revision: i32, value: i32 },
    InboundRaw { topic: u8, payload: Vec<u8> },
    Poll,
}

fuzz_target!(|events: Vec<MirrorEvent>| {
    let mut store = MemoryStore::new();
    for object in OBJECTS {
        store.insert(object, PropertyCell::new([("x".to_string(), json!(0))]));
    }

    let mut mirror = StateMirror::new();

    for event in events {
        match event {
            MirrorEvent::Register { object, topic } => {
                let object = OBJECTS[object as usize % OBJECTS.len()];
                let topic = TOPICS[topic as usize % TOPICS.len()];
                let _ = mirror.register(object, topic, &mut store);
            },
            MirrorEvent::Unregister { object } => {
                let object = OBJECTS[object as usize % OBJECTS.len()];
                let _ = mirror.unregister(object, &mut store);
            },
            MirrorEvent::UnregisterTopic { topic } => {
                let topic = TOPICS[topic as usize % TOPICS.len()];
                let _ = mirror.unregister_topic(topic, &mut store);
            },
            MirrorEvent::Connect => {
                mirror.connected();
            },
            MirrorEvent::Disconnect => {
                mirror.disconnected();
            },
            MirrorEvent::Mutate { object, value } => {
                let object = OBJECTS[object as usize % OBJECTS.len()];
                if let Some(cell) = store.cell_mut(object) {
                    cell.set("x", json!(value));
                }
            },
            MirrorEvent::Inbound { topic, revision, value } => {
                let topic = TOPICS[topic as usize % TOPICS.len()];
                let object = mirror.object_for(topic);
                let before = object.and_then(|o| mirror.revision(o));
                let pending_before = mirror.change_bus().len();

                let payload = format!("{{\"body\":{{\"x\":{value}}},\"revision\":{revision}}}");
                let actions = mirror.message_received(topic, payload.as_bytes(), &mut store);

                assert!(actions.is_empty(), "inbound handling must not emit actions");
                assert!(
                    mirror.change_bus().len() <= pending_before,
                    "apply must not enqueue changes"
                );
                if let (Some(object), Some(before)) = (object, before) {
                    let after = mirror.revision(object).unwrap_or(before);
                    assert!(after >= before, "revision went backwards");
                }
            },
            MirrorEvent::InboundRaw { topic, payload } => {
                let topic = TOPICS[topic as usize % TOPICS.len()];
                let _ = mirror.message_received(topic, &payload, &mut store);
            },
            MirrorEvent::Poll => {
                let actions = mirror.poll_changes(&mut store);
                if !mirror.is_connected() {
                    assert!(actions.is_empty(), "publish emitted while disconnected");
                }
                for action in actions {
                    if let Action::Publish { topic, .. } = action {
                        assert!(
                            mirror.object_for(&topic).is_some(),
                            "publish for an unbound topic"
                        );
                    }
                }
            },
        }
    }
});
