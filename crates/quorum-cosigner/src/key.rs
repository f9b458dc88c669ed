//! Cosigner key material
//!
//! A cosigner is either a recovery phrase held on this device or the public
//! account key of someone else's device.

use bitcoin::bip32::{DerivationPath, Fingerprint, Xpub};
use quorum_keys::xpub::to_plain_xpub;
use quorum_keys::{format_path, normalize_phrase, DerivationCache, KeyError, ScriptPolicy};
use std::fmt;
use zeroize::Zeroizing;

/// Placeholder fingerprint (`00000000`) for keys whose origin is unknown
pub fn unknown_fingerprint() -> Fingerprint {
    Fingerprint::from([0u8; 4])
}

#[derive(Clone)]
pub enum CosignerKey {
    /// Recovery phrase on this device. Derivation happens at the wallet's
    /// policy path.
    SeedBacked {
        mnemonic: Zeroizing<String>,
        passphrase: Option<Zeroizing<String>>,
    },
    /// Public account key of an external cosigner, as supplied (any
    /// SLIP-132 tag)
    XpubBacked {
        xpub: String,
        fingerprint: Fingerprint,
        path: DerivationPath,
    },
}

impl CosignerKey {
    /// Seed-backed key. The phrase is normalized and an empty passphrase is
    /// treated as none.
    pub fn from_mnemonic(mnemonic: &str, passphrase: Option<&str>) -> Self {
        CosignerKey::SeedBacked {
            mnemonic: normalize_phrase(mnemonic),
            passphrase: passphrase
                .filter(|p| !p.is_empty())
                .map(|p| Zeroizing::new(p.to_string())),
        }
    }

    pub fn from_xpub(xpub: impl Into<String>, fingerprint: Fingerprint, path: DerivationPath) -> Self {
        CosignerKey::XpubBacked {
            xpub: xpub.into().trim().to_string(),
            fingerprint,
            path,
        }
    }

    pub fn is_seed_backed(&self) -> bool {
        matches!(self, CosignerKey::SeedBacked { .. })
    }

    pub fn mnemonic(&self) -> Option<&str> {
        match self {
            CosignerKey::SeedBacked { mnemonic, .. } => Some(mnemonic.as_str()),
            CosignerKey::XpubBacked { .. } => None,
        }
    }

    pub fn passphrase(&self) -> Option<&str> {
        match self {
            CosignerKey::SeedBacked { passphrase, .. } => passphrase.as_deref().map(String::as_str),
            CosignerKey::XpubBacked { .. } => None,
        }
    }

    /// Account path this key signs at under `policy`
    pub fn path(&self, policy: ScriptPolicy) -> DerivationPath {
        match self {
            CosignerKey::SeedBacked { .. } => policy.path(),
            CosignerKey::XpubBacked { path, .. } => path.clone(),
        }
    }

    /// Plain BIP-32 account xpub. Seed-backed keys derive through the cache.
    pub fn effective_xpub(&self, policy: ScriptPolicy, cache: &DerivationCache) -> Result<Xpub, KeyError> {
        match self {
            CosignerKey::SeedBacked { mnemonic, passphrase } => cache.get_or_derive_xpub(
                mnemonic,
                &policy.path(),
                passphrase.as_deref().map(String::as_str),
            ),
            CosignerKey::XpubBacked { xpub, .. } => to_plain_xpub(xpub),
        }
    }

    /// Master fingerprint. Seed-backed keys derive through the cache.
    pub fn fingerprint(&self, cache: &DerivationCache) -> Result<Fingerprint, KeyError> {
        match self {
            CosignerKey::SeedBacked { mnemonic, passphrase } => {
                cache.get_or_derive_fingerprint(mnemonic, passphrase.as_deref().map(String::as_str))
            }
            CosignerKey::XpubBacked { fingerprint, .. } => Ok(*fingerprint),
        }
    }
}

impl fmt::Debug for CosignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CosignerKey::SeedBacked { passphrase, .. } => f
                .debug_struct("SeedBacked")
                .field("mnemonic", &"[REDACTED]")
                .field("passphrase", &passphrase.as_ref().map(|_| "[REDACTED]"))
                .finish(),
            CosignerKey::XpubBacked {
                xpub,
                fingerprint,
                path,
            } => f
                .debug_struct("XpubBacked")
                .field("xpub", xpub)
                .field("fingerprint", fingerprint)
                .field("path", &format_path(path))
                .finish(),
        }
    }
}
