#![no_main]

use libfuzzer_sys::fuzz_target;
use quorum_cosigner::{CosignerParser, Prompt, Prompter};
use quorum_keys::{DerivationCache, ScriptPolicy};

struct Cancel;

impl Prompter for Cancel {
    fn ask(&mut self, _prompt: &Prompt) -> Option<String> {
        None
    }
}

fuzz_target!(|data: &[u8]| {
    // Any payload text resolves to a key or an error; the parser never panics.
    if let Ok(s) = std::str::from_utf8(data) {
        for policy in ScriptPolicy::ALL {
            let parser = CosignerParser::new(policy, DerivationCache::shared());
            let _ = parser.resolve(s, &mut Cancel);
        }
    }
});
