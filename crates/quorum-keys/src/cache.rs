//! Memoized seed derivations
//!
//! PBKDF2 seed stretching dominates the cost of checking a mnemonic cosigner,
//! and the same phrase is typically derived several times while a wallet is
//! being put together (validation, duplicate check, assembly, export). The
//! cache keeps the public results.
//!
//! Map keys are SHA-256 digests over length-prefixed, domain-separated
//! fields, so the phrase itself is never held as a key. Values are public
//! data only. Nothing here is persisted or logged.

use bitcoin::bip32::{DerivationPath, Fingerprint, Xpub};
use bitcoin::hashes::{sha256, Hash, HashEngine};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use zeroize::Zeroizing;

use crate::keys::{derive_account_xpub, derive_fingerprint, fingerprint_hex, format_path, KeyError};
use crate::seed::normalize_phrase;

const XPUB_DOMAIN: &[u8] = b"quorum/cache/xpub";
const FINGERPRINT_DOMAIN: &[u8] = b"quorum/cache/fingerprint";

type CacheKey = sha256::Hash;

/// Seed→xpub and seed→fingerprint memo table.
///
/// Shared by reference (`Arc<DerivationCache>`) between the parser, the
/// cosigner set and the assembler of one wallet flow.
#[derive(Debug, Default)]
pub struct DerivationCache {
    xpubs: Mutex<HashMap<CacheKey, Xpub>>,
    fingerprints: Mutex<HashMap<CacheKey, Fingerprint>>,
    derivations: AtomicUsize,
}

fn write_field(engine: &mut sha256::HashEngine, field: &[u8]) {
    engine.input(&(field.len() as u64).to_be_bytes());
    engine.input(field);
}

fn cache_key(
    domain: &[u8],
    mnemonic: &str,
    passphrase: Option<&str>,
    path: Option<&DerivationPath>,
) -> CacheKey {
    let phrase = normalize_phrase(mnemonic);
    let mut engine = sha256::Hash::engine();

    write_field(&mut engine, domain);
    write_field(&mut engine, phrase.as_bytes());
    // None and "" derive the same seed
    write_field(&mut engine, passphrase.unwrap_or("").as_bytes());
    if let Some(path) = path {
        let rendered = Zeroizing::new(format_path(path));
        write_field(&mut engine, rendered.as_bytes());
    }

    sha256::Hash::from_engine(engine)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Entries are inserted whole, so a poisoned map is still consistent
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DerivationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for the usual shared-ownership setup
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Account xpub for `mnemonic` at `path`, derived on first use.
    ///
    /// Derivation runs outside the lock. Two racing misses both derive and
    /// the second insert overwrites the first with an identical value.
    pub fn get_or_derive_xpub(
        &self,
        mnemonic: &str,
        path: &DerivationPath,
        passphrase: Option<&str>,
    ) -> Result<Xpub, KeyError> {
        let key = cache_key(XPUB_DOMAIN, mnemonic, passphrase, Some(path));
        if let Some(xpub) = lock(&self.xpubs).get(&key) {
            return Ok(*xpub);
        }

        log::debug!("Derivation cache miss: account xpub at {}", format_path(path));
        let xpub = derive_account_xpub(mnemonic, path, passphrase)?;
        self.derivations.fetch_add(1, Ordering::Relaxed);

        lock(&self.xpubs).insert(key, xpub);
        Ok(xpub)
    }

    /// Master fingerprint for `mnemonic`, derived on first use
    pub fn get_or_derive_fingerprint(
        &self,
        mnemonic: &str,
        passphrase: Option<&str>,
    ) -> Result<Fingerprint, KeyError> {
        let key = cache_key(FINGERPRINT_DOMAIN, mnemonic, passphrase, None);
        if let Some(fp) = lock(&self.fingerprints).get(&key) {
            return Ok(*fp);
        }

        let fp = derive_fingerprint(mnemonic, passphrase)?;
        self.derivations.fetch_add(1, Ordering::Relaxed);
        log::debug!("Derivation cache miss: fingerprint {}", fingerprint_hex(&fp));

        lock(&self.fingerprints).insert(key, fp);
        Ok(fp)
    }

    /// [`Self::get_or_derive_xpub`] on a blocking worker thread
    pub async fn xpub_offloaded(
        self: &Arc<Self>,
        mnemonic: Zeroizing<String>,
        path: DerivationPath,
        passphrase: Option<Zeroizing<String>>,
    ) -> Result<Xpub, KeyError> {
        let cache = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            cache.get_or_derive_xpub(&mnemonic, &path, passphrase.as_deref().map(String::as_str))
        })
        .await
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))?
    }

    /// [`Self::get_or_derive_fingerprint`] on a blocking worker thread
    pub async fn fingerprint_offloaded(
        self: &Arc<Self>,
        mnemonic: Zeroizing<String>,
        passphrase: Option<Zeroizing<String>>,
    ) -> Result<Fingerprint, KeyError> {
        let cache = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            cache.get_or_derive_fingerprint(&mnemonic, passphrase.as_deref().map(String::as_str))
        })
        .await
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))?
    }

    /// Number of derivations actually performed (cache misses)
    pub fn derivations(&self) -> usize {
        self.derivations.load(Ordering::Relaxed)
    }

    /// Number of memoized entries of both kinds
    pub fn len(&self) -> usize {
        lock(&self.xpubs).len() + lock(&self.fingerprints).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries
    pub fn clear(&self) {
        lock(&self.xpubs).clear();
        lock(&self.fingerprints).clear();
    }
}
