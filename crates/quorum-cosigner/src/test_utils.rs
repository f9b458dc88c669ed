//! Shared test vectors and collaborators for quorum-cosigner tests.

use std::collections::VecDeque;

use crate::parser::{Prompt, Prompter};

/// BIP-39 test mnemonic, fingerprint 73C5DA0A
pub const ABANDON: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// ABANDON at m/48'/0'/0'/2', plain form
pub const ABANDON_XPUB: &str = "xpub6DkFAXWQ2dHxq2vatrt9qyA3bXYU4ToWQwCHbf5XB2mSTexcHZCeKS1VZYcPoBd5X8yVcbXFHJR9R8UCVpt82VX1VhR28mCyxUFL4r6KFrf";

/// ABANDON at m/48'/0'/0'/2', Zpub form
pub const ABANDON_ZPUB: &str = "Zpub74Jru6aftwwHxCUCWEvP6DgrfFsdA4U6ZRtQ5i8qJpMcC39yZGv3egBhQfV3MS9pZtH5z8iV5qWkJsK6ESs6mSzt4qvGhzJxPeeVS2e1zUG";

/// External P2WSH cosigner, fingerprint D37EAD88
pub const ZPUB_1: &str = "Zpub74ijpfhERJNjhCKXRspTdLJV5eoEmSRZdHqDvp9kVtdVEyiXk7pXxRbfZzQvsDFpfDHEHVtVpx4Dz9DGUWGn2Xk5zG5u45QTMsYS2vjohNQ";
pub const FP_1: &str = "D37EAD88";

/// External P2WSH cosigner, fingerprint 168DD603
pub const ZPUB_2: &str = "Zpub75mAE8EjyxSzoyPmGnd5E6MyD7ALGNndruWv52xpzimZQKukwvEfXTHqmH8nbbc6ccP5t2aM3mws3pKYSnKpKMMytdbNEZFUxKzztYFM8Pn";
pub const FP_2: &str = "168DD603";

/// External P2SH-P2WSH cosigner
pub const YPUB_1: &str = "Ypub6jtUX12KGcqFosZWP4YcHc9qbKRTvgBpb8aE58hsYqby3SQVTr5KGfMmdMg38ekmQ9iLhCdgbAbjih7AWSkA7pgRhiLfah3zT6u1PFvVEbc";

/// Single-sig zpub, valid but unusable for multisig
pub const ZPUB_SINGLESIG: &str = "zpub6qT7amLcp2exr4mU4AhXZMjD9CFkopECVhUxc9LHW8pNsJG2B9ogs5sFbGZpxEeT5TBjLmc7EFYgZA9EeWEM1xkJMFLefzZc8eigRFhKB8Q";

/// Coldcard multisig export for the device holding ZPUB_2
pub const COLDCARD_EXPORT: &str = r#"{
  "p2sh_deriv": "m/45'",
  "p2sh": "xpub6847W6cYUqq4ixcmFb83iqPtJZfnMPTkpYiCsuUybzFppJp2qzh3KCVHsLGQy4WhaxGqkK9aDDZnSfhB92PkHDKihbH6WLztzmN7WW9GYpR",
  "p2wsh_p2sh_deriv": "m/48'/0'/0'/1'",
  "p2wsh_p2sh": "Ypub6kvtvTZpqGuWtQfg9bL5xe4vDWtwsirR8LzDvsY3vgXvyncW1NGXCUJ9Ps7CiizSSLV6NnnXSYyVDnxCu26QChWzWLg5YCAHam6cYjGtzRz",
  "p2wsh_deriv": "m/48'/0'/0'/2'",
  "p2wsh": "Zpub75mAE8EjyxSzoyPmGnd5E6MyD7ALGNndruWv52xpzimZQKukwvEfXTHqmH8nbbc6ccP5t2aM3mws3pKYSnKpKMMytdbNEZFUxKzztYFM8Pn",
  "xfp": "168DD603"
}"#;

/// Answers prompts from a fixed script; `None` entries cancel
pub struct ScriptedPrompter {
    answers: VecDeque<Option<String>>,
    pub asked: Vec<Prompt>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[Option<&str>]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.map(str::to_string)).collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, prompt: &Prompt) -> Option<String> {
        self.asked.push(prompt.clone());
        self.answers.pop_front().flatten()
    }
}
