//! Quorum Cosigner
//!
//! Turns independently sourced key material into a validated M-of-N
//! multisig wallet.
//!
//! # Flow
//!
//! 1. [`CosignerParser`] normalizes a raw payload (mnemonic, xpub, key-origin
//!    string, JSON export, Coldcard bundle) into a [`CosignerKey`], asking a
//!    [`Prompter`] for anything missing.
//! 2. [`CosignerSet`] accepts keys one at a time, rejecting duplicates and
//!    keys that don't fit the wallet's script policy.
//! 3. [`WalletAssembler`] turns a complete set into a [`WalletDescriptor`].
//!
//! [`CosignerExporter`] serializes one cosigner's public key material back
//! out for another device, as JSON or a `ur:bytes` QR payload.

pub mod assemble;
pub mod export;
pub mod key;
pub mod parser;
pub mod payload;
pub mod set;
pub mod ur;

pub use assemble::{AssembleError, ResolvedCosigner, SeedOrigin, WalletAssembler, WalletDescriptor};
pub use export::{CosignerExporter, ExportError};
pub use key::{unknown_fingerprint, CosignerKey};
pub use parser::{CosignerParser, ParseError, Parsed, PendingCosigner, Prompt, Prompter};
pub use payload::{AccountTuple, InterchangePayload};
pub use set::{CosignerSet, SetError, MAX_COSIGNERS};
pub use crate::ur::{UrCollector, UrError};

#[cfg(test)]
pub(crate) mod test_utils;
