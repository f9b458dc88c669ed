//! Key derivation from BIP-39 seed
//!
//! Derives the master fingerprint and account-level xpubs used by multisig
//! cosigners. Everything here is pure and uncached; see
//! [`crate::cache::DerivationCache`] for the memoized versions.

use bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint, Xpriv, Xpub};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::Network;
use thiserror::Error;

use crate::seed::{derive_seed, parse_mnemonic};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),
    #[error("Invalid xpub: {0}")]
    InvalidXpub(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Derivation failed: {0}")]
    DerivationFailed(String),
}

/// Master key for a mnemonic and optional passphrase
fn master_key(mnemonic: &str, passphrase: Option<&str>) -> Result<Xpriv, KeyError> {
    let mnemonic = parse_mnemonic(mnemonic).map_err(|e| KeyError::InvalidSeed(e.to_string()))?;
    let seed = derive_seed(&mnemonic, passphrase);

    Xpriv::new_master(Network::Bitcoin, &seed[..])
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))
}

/// Derive the BIP-32 master fingerprint of a mnemonic.
///
/// The passphrase is part of the seed, so the same words with a different
/// passphrase produce a different fingerprint.
pub fn derive_fingerprint(mnemonic: &str, passphrase: Option<&str>) -> Result<Fingerprint, KeyError> {
    let secp = Secp256k1::new();
    let master = master_key(mnemonic, passphrase)?;
    Ok(master.fingerprint(&secp))
}

/// Derive the account-level xpub at `path`
pub fn derive_account_xpub(
    mnemonic: &str,
    path: &DerivationPath,
    passphrase: Option<&str>,
) -> Result<Xpub, KeyError> {
    let secp = Secp256k1::new();
    let master = master_key(mnemonic, passphrase)?;

    let account = master
        .derive_priv(&secp, path)
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;

    Ok(Xpub::from_priv(&secp, &account))
}

/// Parse a BIP-32 path string
pub fn parse_path(path: &str) -> Result<DerivationPath, KeyError> {
    path.parse()
        .map_err(|e: bitcoin::bip32::Error| KeyError::InvalidPath(e.to_string()))
}

/// Render a path as `m/48'/0'/0'/2'`
///
/// `DerivationPath`'s own `Display` drops the leading `m/`, which payloads
/// and setup files require.
pub fn format_path(path: &DerivationPath) -> String {
    let steps: &[ChildNumber] = path.as_ref();
    let mut out = String::from("m");
    for step in steps {
        match step {
            ChildNumber::Normal { index } => out.push_str(&format!("/{}", index)),
            ChildNumber::Hardened { index } => out.push_str(&format!("/{}'", index)),
        }
    }
    out
}

/// Render a fingerprint as 8 upper-case hex characters
pub fn fingerprint_hex(fingerprint: &Fingerprint) -> String {
    fingerprint.to_string().to_uppercase()
}
