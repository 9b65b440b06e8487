#![no_main]

//! Arbitrary bytes must never panic the wire decoder, and anything that
//! decodes must survive a re-encode.

use libfuzzer_sys::fuzz_target;
use seq_crdt::{decode_operation, encode_operation};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(op) = decode_operation(raw) else {
        return;
    };

    let encoded = encode_operation(&op).expect("re-encoding a decoded operation");
    let round = decode_operation(&encoded).expect("decoding re-encoded operation");
    assert_eq!(op, round);
});
