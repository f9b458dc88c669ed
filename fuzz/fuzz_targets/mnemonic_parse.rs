#![no_main]

use libfuzzer_sys::fuzz_target;
use quorum_keys::{is_valid_mnemonic, parse_mnemonic};

fuzz_target!(|data: &[u8]| {
    // Arbitrary text must parse to Ok or Err, never panic, and both entry
    // points must agree.
    if let Ok(s) = std::str::from_utf8(data) {
        assert_eq!(parse_mnemonic(s).is_ok(), is_valid_mnemonic(s));
    }
});
