//! Full-state serialization and tolerant body application.

use tain_proto::{Body, Envelope, Revision};

use crate::observe::Observable;

/// Serialize an object's full observable state into an envelope.
///
/// Enumerates declared and dynamic properties in one pass (they share a
/// namespace, so duplicates cannot occur) and reads each current value. The
/// caller passes the revision it has already reserved for this update.
pub fn serialize(object: &dyn Observable, revision: Revision) -> Envelope {
    let mut body = Body::new();

    for name in object.property_names() {
        if let Some(value) = object.get(&name) {
            body.insert(name, value);
        }
    }

    Envelope::new(body, revision)
}

/// Write a received body's values into an object.
///
/// Keys with no matching property on the target are skipped silently, so
/// senders and receivers may disagree on schema in either direction. No
/// cross-property atomicity: each key is written independently.
pub fn apply_body(object: &mut dyn Observable, body: &Body) {
    for (key, value) in body {
        // Probe first: writes must never create properties.
        if object.get(key).is_none() {
            continue;
        }
        object.set(key, value.clone());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::observe::PropertyCell;

    fn sensor_cell() -> PropertyCell {
        let mut cell = PropertyCell::new([
            ("x".to_string(), json!(1)),
            ("label".to_string(), json!("sensor")),
        ]);
        cell.attach("firmware", json!("2.4.1"));
        cell
    }

    #[test]
    fn serialize_covers_declared_and_dynamic_properties() {
        let envelope = serialize(&sensor_cell(), 1);

        let keys: Vec<_> = envelope.body.keys().cloned().collect();
        assert_eq!(keys, ["x", "label", "firmware"]);
        assert_eq!(envelope.revision, 1);
    }

    #[test]
    fn apply_body_skips_unknown_keys() {
        let mut cell = sensor_cell();
        let envelope = Envelope::decode(br#"{"body":{"x":5,"ghost":9},"revision":2}"#).unwrap();

        apply_body(&mut cell, &envelope.body);

        assert_eq!(cell.get("x"), Some(json!(5)));
        assert_eq!(cell.get("ghost"), None);
    }

    #[test]
    fn apply_body_tolerates_partial_bodies() {
        let mut cell = sensor_cell();
        let envelope = Envelope::decode(br#"{"body":{"label":"relay"},"revision":2}"#).unwrap();

        apply_body(&mut cell, &envelope.body);

        assert_eq!(cell.get("label"), Some(json!("relay")));
        assert_eq!(cell.get("x"), Some(json!(1)));
    }

    #[test]
    fn serialize_then_apply_is_idempotent() {
        let mut cell = sensor_cell();
        let before: Vec<_> = cell.property_names().iter().map(|n| cell.get(n)).collect();

        let envelope = serialize(&cell, 1);
        apply_body(&mut cell, &envelope.body);

        let after: Vec<_> = cell.property_names().iter().map(|n| cell.get(n)).collect();
        assert_eq!(before, after);
    }
}
