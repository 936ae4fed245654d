//! End-to-end tests for two driver-managed mirrors over the local broker.

#![allow(clippy::unwrap_used, clippy::panic)]

use serde_json::json;
use tain_core::Observable;
use tain_node::{LocalBroker, LocalTransport, MirrorDriver, Transport, TransportEvent};
use tain_proto::Envelope;

const OBJ: u64 = 1;
const TOPIC: &str = "devices/alpha";

fn device_cell() -> tain_core::PropertyCell {
    tain_core::PropertyCell::new([
        ("x".to_string(), json!(1)),
        ("label".to_string(), json!("alpha")),
    ])
}

async fn paired_drivers(
    broker: &LocalBroker,
) -> (MirrorDriver<LocalTransport>, MirrorDriver<LocalTransport>) {
    let mut a = MirrorDriver::new(broker.connect());
    let mut b = MirrorDriver::new(broker.connect());

    a.insert_object(OBJ, device_cell());
    b.insert_object(OBJ, device_cell());

    a.register(OBJ, TOPIC).await.unwrap();
    b.register(OBJ, TOPIC).await.unwrap();

    a.pump().await.unwrap();
    b.pump().await.unwrap();

    (a, b)
}

#[tokio::test]
async fn mutation_converges_across_replicas() {
    let broker = LocalBroker::new();
    let (mut a, mut b) = paired_drivers(&broker).await;

    a.update(OBJ, |cell| cell.set("x", json!(2))).await.unwrap();
    b.pump().await.unwrap();

    assert_eq!(b.store().cell(OBJ).unwrap().value("x"), Some(&json!(2)));
    assert_eq!(b.mirror().revision(OBJ), Some(1));
}

#[tokio::test]
async fn self_echo_is_rejected_and_does_not_loop() {
    let broker = LocalBroker::new();
    let (mut a, mut b) = paired_drivers(&broker).await;

    a.update(OBJ, |cell| cell.set("x", json!(2))).await.unwrap();

    // The publisher receives its own message back; the stale gate drops it.
    a.pump().await.unwrap();
    assert_eq!(a.mirror().revision(OBJ), Some(1));
    assert_eq!(a.store().cell(OBJ).unwrap().value("x"), Some(&json!(2)));

    // B applies the update; applying must not republish, so after B pumps,
    // A has nothing further to receive.
    b.pump().await.unwrap();
    let residual = a.pump().await.unwrap();
    assert_eq!(residual, 0);
}

#[tokio::test]
async fn concurrent_writers_converge_on_highest_revision() {
    let broker = LocalBroker::new();
    let (mut a, mut b) = paired_drivers(&broker).await;

    // A publishes revision 1, B — not having seen it yet — also reserves
    // revision 1, then revision 2. Delivery order decides: each replica
    // keeps the highest revision it has seen.
    a.update(OBJ, |cell| cell.set("x", json!(10))).await.unwrap();
    b.update(OBJ, |cell| cell.set("x", json!(20))).await.unwrap();
    b.update(OBJ, |cell| cell.set("x", json!(30))).await.unwrap();

    a.pump().await.unwrap();
    b.pump().await.unwrap();
    a.pump().await.unwrap();
    b.pump().await.unwrap();

    assert_eq!(a.mirror().revision(OBJ), Some(2));
    assert_eq!(b.mirror().revision(OBJ), Some(2));
    assert_eq!(a.store().cell(OBJ).unwrap().value("x"), Some(&json!(30)));
    assert_eq!(b.store().cell(OBJ).unwrap().value("x"), Some(&json!(30)));
}

#[tokio::test]
async fn wire_payload_matches_protocol_shape() {
    let broker = LocalBroker::new();
    let mut a = MirrorDriver::new(broker.connect());
    a.insert_object(OBJ, device_cell());
    a.register(OBJ, TOPIC).await.unwrap();
    a.pump().await.unwrap();

    // A bare transport subscribed to the same topic sees the raw bytes.
    let mut tap = broker.connect();
    tap.subscribe(TOPIC, 0).await.unwrap();

    a.update(OBJ, |cell| cell.set("x", json!(7))).await.unwrap();

    let message = loop {
        match tap.try_next_event() {
            Some(TransportEvent::Message { payload, .. }) => break payload,
            Some(_) => continue,
            None => panic!("no message delivered to tap"),
        }
    };

    let envelope = Envelope::decode(&message).unwrap();
    assert_eq!(envelope.revision, 1);
    assert_eq!(envelope.body.get("x"), Some(&json!(7)));
    assert_eq!(envelope.body.get("label"), Some(&json!("alpha")));
}

#[tokio::test]
async fn disconnected_mutations_are_lost_by_design() {
    let broker = LocalBroker::new();
    let (mut a, mut b) = paired_drivers(&broker).await;

    // Sever A's link, mutate, then restore it.
    a.transport_mut().drop_connection();
    a.pump().await.unwrap();
    assert!(!a.mirror().is_connected());

    a.update(OBJ, |cell| cell.set("x", json!(99))).await.unwrap();

    a.transport_mut().restore_connection();
    a.pump().await.unwrap();
    assert!(a.mirror().is_connected());

    // The reconnect re-subscribed but did not replay: B never sees 99.
    b.pump().await.unwrap();
    assert_eq!(b.store().cell(OBJ).unwrap().value("x"), Some(&json!(1)));

    // The next connected mutation flows normally.
    a.update(OBJ, |cell| cell.set("x", json!(5))).await.unwrap();
    b.pump().await.unwrap();
    assert_eq!(b.store().cell(OBJ).unwrap().value("x"), Some(&json!(5)));
}

#[tokio::test]
async fn unregister_stops_delivery() {
    let broker = LocalBroker::new();
    let (mut a, mut b) = paired_drivers(&broker).await;

    b.unregister(OBJ).await.unwrap();
    b.pump().await.unwrap();

    a.update(OBJ, |cell| cell.set("x", json!(2))).await.unwrap();
    b.pump().await.unwrap();

    assert_eq!(b.store().cell(OBJ).unwrap().value("x"), Some(&json!(1)));
    assert_eq!(b.mirror().revision(OBJ), None);
}
