//! Quorum Keys
//!
//! Key material primitives shared by every multisig cosigner flow.
//!
//! # Derivation
//!
//! From a BIP-39 mnemonic (plus optional passphrase):
//! - Master fingerprint (4 bytes, shown as 8 upper-case hex chars)
//! - Account xpub at the policy path, e.g. BIP-48 `m/48'/0'/0'/2'` for P2WSH
//!
//! # Representations
//!
//! Account xpubs travel between devices in SLIP-132 form (`Zpub`, `Ypub`,
//! `xpub`). [`xpub`] converts between those and the plain BIP-32 encoding,
//! and [`cache::DerivationCache`] memoizes the expensive seed stretching.

pub mod cache;
pub mod keys;
pub mod policy;
pub mod seed;
pub mod xpub;

pub use cache::DerivationCache;
pub use keys::*;
pub use policy::{PolicyError, ScriptPolicy};
pub use seed::*;
