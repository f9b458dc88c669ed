//! Cosigners accepted so far for one wallet in progress

use bitcoin::bip32::Xpub;
use quorum_keys::xpub::{encode_multisig, is_xpub_for_multisig};
use quorum_keys::{format_path, parse_mnemonic, DerivationCache, KeyError, ScriptPolicy};
use std::sync::Arc;
use thiserror::Error;

use crate::export::{CosignerExporter, ExportError};
use crate::key::CosignerKey;
use crate::payload::InterchangePayload;

/// Upper bound on N for `sortedmulti`
pub const MAX_COSIGNERS: usize = 15;

#[derive(Error, Debug)]
pub enum SetError {
    #[error("Invalid quorum {m} of {n}: need 1 <= m <= n <= 15")]
    InvalidQuorum { m: usize, n: usize },
    #[error("All {0} cosigners are already present")]
    SetFull(usize),
    #[error("Cosigner is already part of this wallet")]
    DuplicateCosigner,
    #[error("Extended public key is not usable in a multisig wallet")]
    NotMultisigXpub,
    #[error("Cosigner path {0} belongs to a different multisig format")]
    IncompatibleFormat(String),
    #[error("No cosigner at index {0}")]
    IndexOutOfRange(usize),
    #[error("Mnemonic does not match the stored cosigner")]
    SeedMismatch,
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

#[derive(Debug, Clone)]
struct Entry {
    key: CosignerKey,
    /// Plain account xpub, resolved once on insert
    xpub: Xpub,
}

/// Ordered cosigners for an M-of-N wallet under one script policy.
///
/// Every mutation is all-or-nothing: a rejected key leaves the set as it was.
#[derive(Debug)]
pub struct CosignerSet {
    m: usize,
    n: usize,
    policy: ScriptPolicy,
    cache: Arc<DerivationCache>,
    entries: Vec<Entry>,
}

impl CosignerSet {
    pub fn new(
        m: usize,
        n: usize,
        policy: ScriptPolicy,
        cache: Arc<DerivationCache>,
    ) -> Result<Self, SetError> {
        if m == 0 || m > n || n > MAX_COSIGNERS {
            return Err(SetError::InvalidQuorum { m, n });
        }
        Ok(Self {
            m,
            n,
            policy,
            cache,
            entries: Vec::with_capacity(n),
        })
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn policy(&self) -> ScriptPolicy {
        self.policy
    }

    pub fn cache(&self) -> &Arc<DerivationCache> {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.len() == self.n
    }

    pub fn get(&self, index: usize) -> Option<&CosignerKey> {
        self.entries.get(index).map(|e| &e.key)
    }

    /// Cached plain xpub of the cosigner at `index`
    pub fn xpub_at(&self, index: usize) -> Option<&Xpub> {
        self.entries.get(index).map(|e| &e.xpub)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CosignerKey> {
        self.entries.iter().map(|e| &e.key)
    }

    /// Validate `key` against the wallet and append it. Returns its index.
    pub fn try_add(&mut self, key: CosignerKey) -> Result<usize, SetError> {
        if self.is_complete() {
            return Err(SetError::SetFull(self.n));
        }

        let xpub = self.validate(&key)?;
        if self.entries.iter().any(|e| e.xpub == xpub) {
            return Err(SetError::DuplicateCosigner);
        }

        let kind = if key.is_seed_backed() { "seed" } else { "xpub" };
        self.entries.push(Entry { key, xpub });
        log::info!("Cosigner {} of {} added ({})", self.entries.len(), self.n, kind);
        Ok(self.entries.len() - 1)
    }

    /// Resolve the effective xpub and check it fits this wallet
    fn validate(&self, key: &CosignerKey) -> Result<Xpub, SetError> {
        if let CosignerKey::XpubBacked { xpub, .. } = key {
            if !is_xpub_for_multisig(xpub) {
                return Err(SetError::NotMultisigXpub);
            }
        }

        let xpub = key.effective_xpub(self.policy, &self.cache)?;

        let path = key.path(self.policy);
        if !self.policy.accepts_path(&path) {
            return Err(SetError::IncompatibleFormat(format_path(&path)));
        }
        Ok(xpub)
    }

    /// Remove and return the cosigner at `index`
    pub fn remove(&mut self, index: usize) -> Result<CosignerKey, SetError> {
        if index >= self.entries.len() {
            return Err(SetError::IndexOutOfRange(index));
        }
        Ok(self.entries.remove(index).key)
    }

    /// Replace an xpub-backed cosigner with the seed behind it.
    ///
    /// The mnemonic must derive exactly the stored xpub at the wallet's
    /// policy path.
    pub fn upgrade_to_seed(
        &mut self,
        index: usize,
        mnemonic: &str,
        passphrase: Option<&str>,
    ) -> Result<(), SetError> {
        let entry = self.entries.get(index).ok_or(SetError::IndexOutOfRange(index))?;
        parse_mnemonic(mnemonic).map_err(|e| KeyError::InvalidSeed(e.to_string()))?;

        let candidate = CosignerKey::from_mnemonic(mnemonic, passphrase);
        let derived = candidate.effective_xpub(self.policy, &self.cache)?;
        if derived != entry.xpub {
            return Err(SetError::SeedMismatch);
        }

        self.entries[index].key = candidate;
        Ok(())
    }

    /// Replace a seed-backed cosigner with its public key material, dropping
    /// the mnemonic. Xpub-backed cosigners are left unchanged.
    pub fn downgrade_to_xpub(&mut self, index: usize) -> Result<(), SetError> {
        let entry = self.entries.get(index).ok_or(SetError::IndexOutOfRange(index))?;
        if !entry.key.is_seed_backed() {
            return Ok(());
        }

        let fingerprint = entry.key.fingerprint(&self.cache)?;
        let downgraded = CosignerKey::from_xpub(
            encode_multisig(&entry.xpub, self.policy),
            fingerprint,
            self.policy.path(),
        );
        self.entries[index].key = downgraded;
        Ok(())
    }

    /// Interchange payload for the cosigner at `index`. Never includes the
    /// mnemonic.
    pub fn export_for(&self, index: usize) -> Result<InterchangePayload, ExportError> {
        let key = self.get(index).ok_or(ExportError::IndexOutOfRange(index))?;
        CosignerExporter::new(self.policy, Arc::clone(&self.cache)).export_self(key)
    }

    /// Drop every cosigner. Mnemonics are wiped as their buffers drop.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
