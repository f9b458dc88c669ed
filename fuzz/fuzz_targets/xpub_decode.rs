#![no_main]

use libfuzzer_sys::fuzz_target;
use quorum_keys::xpub::{is_xpub_for_multisig, is_xpub_valid, to_plain_xpub};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let valid = is_xpub_valid(s);
        // Multisig acceptance implies validity
        if is_xpub_for_multisig(s) {
            assert!(valid);
        }
        assert_eq!(to_plain_xpub(s).is_ok(), valid);
    }
});
