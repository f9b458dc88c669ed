//! Wallet assembly
//!
//! Once every cosigner slot is filled, the set is resolved into a
//! [`WalletDescriptor`]: the quorum, the script policy and each cosigner's
//! fingerprint, account xpub and path. Seed-backed cosigners keep their
//! mnemonic as [`SeedOrigin`] until the caller discards it.
//!
//! # Descriptor
//!
//! ```text
//! wsh(sortedmulti(2,[fp1/48'/0'/0'/2']xpub1/<0;1>/*,[fp2/48'/0'/0'/2']xpub2/<0;1>/*,...))
//! ```

use bitcoin::bip32::{DerivationPath, Fingerprint, Xpub};
use miniscript::descriptor::{Descriptor, DescriptorPublicKey};
use quorum_keys::xpub::encode_multisig;
use quorum_keys::{fingerprint_hex, format_path, DerivationCache, KeyError, ScriptPolicy};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::key::{unknown_fingerprint, CosignerKey};
use crate::set::CosignerSet;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("Cosigner set incomplete: {have} of {need}")]
    IncompleteSet { have: usize, need: usize },
    #[error("Two cosigners share fingerprint {0}")]
    DuplicateFingerprint(String),
    #[error("Set was built for {set}, asked to assemble {requested}")]
    QuorumMismatch { set: String, requested: String },
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("Descriptor error: {0}")]
    Descriptor(String),
}

/// Mnemonic behind a seed-backed cosigner
#[derive(Clone)]
pub struct SeedOrigin {
    mnemonic: Zeroizing<String>,
    passphrase: Option<Zeroizing<String>>,
}

impl SeedOrigin {
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref().map(String::as_str)
    }
}

impl fmt::Debug for SeedOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeedOrigin([REDACTED])")
    }
}

/// One cosigner with every field resolved
#[derive(Debug, Clone)]
pub struct ResolvedCosigner {
    pub fingerprint: Fingerprint,
    /// Plain BIP-32 account xpub
    pub xpub: Xpub,
    pub path: DerivationPath,
    pub seed: Option<SeedOrigin>,
}

impl ResolvedCosigner {
    /// `[fingerprint/path]xpub/<0;1>/*`
    pub fn descriptor_key(&self) -> String {
        let path = format_path(&self.path);
        let origin = match path.trim_start_matches('m').trim_start_matches('/') {
            "" => self.fingerprint.to_string(),
            steps => format!("{}/{}", self.fingerprint, steps),
        };
        format!("[{}]{}/<0;1>/*", origin, self.xpub)
    }
}

/// A complete M-of-N multisig wallet
#[derive(Debug, Clone)]
pub struct WalletDescriptor {
    pub m: usize,
    pub n: usize,
    pub policy: ScriptPolicy,
    pub derivation_path: DerivationPath,
    pub label: String,
    pub cosigners: Vec<ResolvedCosigner>,
}

impl WalletDescriptor {
    /// Output descriptor with receive/change multipath keys
    pub fn to_descriptor(&self) -> Result<Descriptor<DescriptorPublicKey>, AssembleError> {
        let keys: Vec<String> = self.cosigners.iter().map(ResolvedCosigner::descriptor_key).collect();
        let inner = format!("sortedmulti({},{})", self.m, keys.join(","));
        let descriptor = self.policy.wrap_sortedmulti(&inner);

        Descriptor::<DescriptorPublicKey>::from_str(&descriptor)
            .map_err(|e| AssembleError::Descriptor(e.to_string()))
    }

    /// Public-only setup text, safe to share with every cosigner
    pub fn coordination_setup(&self) -> String {
        let mut out = String::new();
        out.push_str("# Quorum multisig setup file\n");
        out.push_str("# this file contains only public keys and is safe to\n");
        out.push_str("# distribute among cosigners\n");
        out.push_str("#\n");
        out.push_str(&format!("Name: {}\n", self.label));
        out.push_str(&format!("Policy: {} of {}\n", self.m, self.n));
        out.push_str(&format!("Derivation: {}\n", format_path(&self.derivation_path)));
        out.push_str(&format!("Format: {}\n", self.policy.format_name().to_uppercase()));
        out.push('\n');

        for cosigner in &self.cosigners {
            if cosigner.path != self.derivation_path {
                out.push_str(&format!("# derivation: {}\n", format_path(&cosigner.path)));
            }
            out.push_str(&format!(
                "{}: {}\n",
                fingerprint_hex(&cosigner.fingerprint),
                encode_multisig(&cosigner.xpub, self.policy)
            ));
        }
        out
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// True while any cosigner still carries its mnemonic
    pub fn has_secrets(&self) -> bool {
        self.cosigners.iter().any(|c| c.seed.is_some())
    }

    /// Drop every retained mnemonic
    pub fn discard_secrets(&mut self) {
        for cosigner in &mut self.cosigners {
            cosigner.seed = None;
        }
    }
}

pub struct WalletAssembler {
    cache: Arc<DerivationCache>,
}

impl WalletAssembler {
    pub fn new(cache: Arc<DerivationCache>) -> Self {
        Self { cache }
    }

    /// Resolve a complete set into a wallet.
    ///
    /// `m`, `n` and `policy` must match what the set was built for.
    pub fn assemble(
        &self,
        m: usize,
        n: usize,
        policy: ScriptPolicy,
        label: impl Into<String>,
        set: &CosignerSet,
    ) -> Result<WalletDescriptor, AssembleError> {
        if (m, n, policy) != (set.m(), set.n(), set.policy()) {
            return Err(AssembleError::QuorumMismatch {
                set: format!("{} of {} {}", set.m(), set.n(), set.policy()),
                requested: format!("{} of {} {}", m, n, policy),
            });
        }
        if !set.is_complete() {
            return Err(AssembleError::IncompleteSet {
                have: set.len(),
                need: n,
            });
        }

        let unknown = unknown_fingerprint();
        let mut seen = HashSet::new();
        let mut cosigners = Vec::with_capacity(n);

        for (index, key) in set.iter().enumerate() {
            let fingerprint = key.fingerprint(&self.cache)?;
            if fingerprint != unknown && !seen.insert(fingerprint) {
                return Err(AssembleError::DuplicateFingerprint(fingerprint_hex(&fingerprint)));
            }

            let xpub = match set.xpub_at(index) {
                Some(xpub) => *xpub,
                None => key.effective_xpub(policy, &self.cache)?,
            };

            let seed = match key {
                CosignerKey::SeedBacked { mnemonic, passphrase } => Some(SeedOrigin {
                    mnemonic: mnemonic.clone(),
                    passphrase: passphrase.clone(),
                }),
                CosignerKey::XpubBacked { .. } => None,
            };

            cosigners.push(ResolvedCosigner {
                fingerprint,
                xpub,
                path: key.path(policy),
                seed,
            });
        }

        log::info!("Assembled {} of {} {} wallet", m, n, policy);
        Ok(WalletDescriptor {
            m,
            n,
            policy,
            derivation_path: policy.path(),
            label: label.into(),
            cosigners,
        })
    }
}
