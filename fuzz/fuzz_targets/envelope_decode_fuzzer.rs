//! Fuzz target for [`Envelope`] decoding
//!
//! The inbound path feeds raw broker bytes straight into the decoder, so it
//! must tolerate anything.
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary input bytes
//! - Anything that decodes must re-encode, and the re-encoded form must
//!   decode to the same envelope

#![no_main]

use libfuzzer_sys::fuzz_target;
use tain_proto::Envelope;

fuzz_target!(|data: &[u8]| {
    let Ok(envelope) = Envelope::decode(data) else {
        return;
    };

    let bytes = envelope.encode().expect("decoded envelope must re-encode");
    let reparsed = Envelope::decode(&bytes).expect("re-encoded envelope must decode");
    assert_eq!(reparsed, envelope);
});
