#![no_main]

use libfuzzer_sys::fuzz_target;
use quorum_cosigner::ur::{decode_bytes, encode_bytes, UrCollector};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = decode_bytes(s);
        let mut collector = UrCollector::new();
        for part in s.split_whitespace() {
            let _ = collector.receive(part);
        }
    }
    let encoded = encode_bytes(data).expect("byte strings always encode");
    assert_eq!(decode_bytes(&encoded).as_deref(), Ok(data));
});
