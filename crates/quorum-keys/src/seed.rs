//! BIP-39 seed management
//!
//! Handles mnemonic generation and import. Phrases are normalized to single
//! spaced lower-case words before validation, so a phrase typed with stray
//! capitals or line breaks maps to the same cosigner.

use bip39::{Language, Mnemonic};
use thiserror::Error;
use zeroize::Zeroizing;

/// Number of words in freshly generated cosigner mnemonics
pub const GENERATED_WORD_COUNT: usize = 24;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("Mnemonic generation failed: {0}")]
    GenerationFailed(String),
}

/// Generate a new BIP-39 mnemonic (24 words)
pub fn generate_mnemonic() -> Result<Mnemonic, SeedError> {
    Mnemonic::generate_in(Language::English, GENERATED_WORD_COUNT)
        .map_err(|e| SeedError::GenerationFailed(e.to_string()))
}

/// Collapse whitespace and lower-case a phrase.
pub fn normalize_phrase(words: &str) -> Zeroizing<String> {
    let lowered = Zeroizing::new(words.to_lowercase());
    Zeroizing::new(lowered.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Parse a mnemonic from words, validating wordlist membership and checksum
pub fn parse_mnemonic(words: &str) -> Result<Mnemonic, SeedError> {
    let normalized = normalize_phrase(words);
    Mnemonic::parse_in(Language::English, normalized.as_str())
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// True if the words form a valid BIP-39 mnemonic
pub fn is_valid_mnemonic(words: &str) -> bool {
    parse_mnemonic(words).is_ok()
}

/// Derive seed bytes from mnemonic (with optional passphrase)
///
/// An absent passphrase and an empty one produce the same seed.
pub fn derive_seed(mnemonic: &Mnemonic, passphrase: Option<&str>) -> Zeroizing<[u8; 64]> {
    Zeroizing::new(mnemonic.to_seed(passphrase.unwrap_or("")))
}
