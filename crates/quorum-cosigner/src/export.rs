//! Export one cosigner's public key material for another device

use quorum_keys::xpub::encode_multisig;
use quorum_keys::{fingerprint_hex, format_path, DerivationCache, KeyError, ScriptPolicy};
use std::sync::Arc;
use thiserror::Error;

use crate::key::CosignerKey;
use crate::payload::InterchangePayload;
use crate::ur;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No cosigner at index {0}")]
    IndexOutOfRange(usize),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("UR error: {0}")]
    Ur(#[from] ur::UrError),
}

/// Builds [`InterchangePayload`]s for one wallet's script policy
#[derive(Debug, Clone)]
pub struct CosignerExporter {
    policy: ScriptPolicy,
    cache: Arc<DerivationCache>,
}

impl CosignerExporter {
    pub fn new(policy: ScriptPolicy, cache: Arc<DerivationCache>) -> Self {
        Self { policy, cache }
    }

    /// Public key material of `key`: upper-case fingerprint, xpub tagged for
    /// the policy, and the account path.
    pub fn export_self(&self, key: &CosignerKey) -> Result<InterchangePayload, ExportError> {
        let xpub = key.effective_xpub(self.policy, &self.cache)?;
        let fingerprint = key.fingerprint(&self.cache)?;

        Ok(InterchangePayload {
            xfp: fingerprint_hex(&fingerprint),
            xpub: encode_multisig(&xpub, self.policy),
            path: format_path(&key.path(self.policy)),
        })
    }
}

impl InterchangePayload {
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// `ur:bytes` encoding of the JSON form, for a static QR code
    pub fn to_ur(&self) -> Result<String, ExportError> {
        Ok(ur::encode_bytes(self.to_json()?.as_bytes())?)
    }

    /// The same encoding split for an animated QR, fragments of at most
    /// `max_fragment_len` bytes
    pub fn to_ur_parts(&self, max_fragment_len: usize) -> Result<Vec<String>, ExportError> {
        Ok(ur::encode_bytes_animated(self.to_json()?.as_bytes(), max_fragment_len)?)
    }

    /// Suggested file name when saving the payload
    pub fn file_name(&self) -> String {
        format!("cosigner-{}.json", self.xfp)
    }
}
