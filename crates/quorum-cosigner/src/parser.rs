//! Cosigner payload parser
//!
//! Normalizes whatever a cosigner device or person hands over into a
//! [`CosignerKey`]. The payload is tried against an ordered list of shapes
//! and the first match wins:
//!
//! 1. A UR string. These must be decoded by the caller first.
//! 2. JSON: one account object, an array of accounts, or a Coldcard export.
//!    A one-element array is treated as its element.
//! 3. A BIP-39 mnemonic.
//! 4. A bare xpub or a `[fingerprint/path]xpub` key-origin string.
//!
//! Missing details (passphrase, fingerprint, path) are requested through a
//! [`Prompter`]. Malformed fingerprints and paths are replaced with defaults
//! instead of rejecting the cosigner.

use bitcoin::bip32::{DerivationPath, Fingerprint};
use quorum_keys::xpub::{is_fp_valid, is_path_valid, is_xpub_for_multisig, is_xpub_valid};
use quorum_keys::{
    fingerprint_hex, format_path, normalize_phrase, parse_mnemonic, parse_path, DerivationCache,
    KeyError, ScriptPolicy,
};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::key::{unknown_fingerprint, CosignerKey};
use crate::payload::{classify_json, parse_key_origin, select_for_policy, AccountTuple, JsonShape};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("UR payloads must be decoded before parsing")]
    Decode,
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("Extended public key is not usable in a multisig wallet")]
    NotMultisigXpub,
    #[error("Cosigner does not match this wallet's multisig format")]
    InvalidCosignerFormat,
    #[error("Unrecognized cosigner payload")]
    InvalidCosigner,
    #[error("Cancelled")]
    Cancelled,
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

impl ParseError {
    /// Errors that indicate a caller bug rather than bad user input
    pub fn is_internal(&self) -> bool {
        matches!(self, ParseError::Decode)
    }
}

/// A question the parser needs answered before a cosigner is complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Optional BIP-39 passphrase; an empty answer means none
    Passphrase,
    /// Master fingerprint of the device that exported the xpub
    Fingerprint,
    /// Account derivation path; an empty answer takes `default`
    Path { default: String },
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::Passphrase => write!(f, "Passphrase (leave empty for none)"),
            Prompt::Fingerprint => write!(f, "Master key fingerprint (8 hex characters)"),
            Prompt::Path { default } => write!(f, "Derivation path [{}]", default),
        }
    }
}

/// Answers prompts. `None` means the user cancelled.
pub trait Prompter {
    fn ask(&mut self, prompt: &Prompt) -> Option<String>;
}

/// Outcome of a successful parse step
#[derive(Debug)]
pub enum Parsed {
    Ready(CosignerKey),
    NeedsInput(PendingCosigner),
}

/// A partially parsed cosigner waiting for one more answer
pub struct PendingCosigner {
    policy: ScriptPolicy,
    state: PendingState,
}

enum PendingState {
    Passphrase {
        mnemonic: Zeroizing<String>,
    },
    Origin {
        xpub: String,
        fingerprint: Option<Fingerprint>,
        path: Option<DerivationPath>,
    },
}

impl PendingCosigner {
    /// The question to put to the user next
    pub fn prompt(&self) -> Prompt {
        match &self.state {
            PendingState::Passphrase { .. } => Prompt::Passphrase,
            PendingState::Origin { fingerprint: None, .. } => Prompt::Fingerprint,
            PendingState::Origin { .. } => Prompt::Path {
                default: self.policy.path_str().to_string(),
            },
        }
    }
}

impl fmt::Debug for PendingCosigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCosigner")
            .field("policy", &self.policy)
            .field("prompt", &self.prompt())
            .finish()
    }
}

/// Parser bound to one wallet's script policy
#[derive(Debug, Clone)]
pub struct CosignerParser {
    policy: ScriptPolicy,
    ask_passphrase: bool,
    cache: Arc<DerivationCache>,
}

/// Several alphabetic words separated by whitespace
fn looks_like_mnemonic(s: &str) -> bool {
    let words: Vec<&str> = s.split_whitespace().collect();
    words.len() > 1 && words.iter().all(|w| w.chars().all(|c| c.is_ascii_alphabetic()))
}

fn resolve_fingerprint(s: &str) -> Fingerprint {
    let s = s.trim();
    if is_fp_valid(s) {
        if let Ok(fp) = Fingerprint::from_str(s) {
            return fp;
        }
    }
    log::warn!("Malformed fingerprint, using 00000000");
    unknown_fingerprint()
}

impl CosignerParser {
    pub fn new(policy: ScriptPolicy, cache: Arc<DerivationCache>) -> Self {
        Self {
            policy,
            ask_passphrase: false,
            cache,
        }
    }

    /// Ask for a BIP-39 passphrase after accepting a mnemonic
    pub fn with_passphrase_prompt(mut self, ask: bool) -> Self {
        self.ask_passphrase = ask;
        self
    }

    pub fn policy(&self) -> ScriptPolicy {
        self.policy
    }

    /// Parse a raw, already UR-decoded payload
    pub fn parse(&self, raw: &str) -> Result<Parsed, ParseError> {
        let trimmed = raw.trim();
        if trimmed.to_uppercase().starts_with("UR:") {
            return Err(ParseError::Decode);
        }

        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return match classify_json(value) {
                JsonShape::Account(account) => {
                    log::debug!("Cosigner payload is a single account");
                    self.accept_account(account)
                }
                JsonShape::Bundle(bundle) => {
                    log::debug!("Cosigner payload is a bundle of {} accounts", bundle.len());
                    let account = select_for_policy(bundle, self.policy)
                        .ok_or(ParseError::InvalidCosignerFormat)?;
                    self.accept_account(account)
                }
                JsonShape::Unrecognized => Err(ParseError::InvalidCosigner),
            };
        }

        if looks_like_mnemonic(trimmed) {
            log::debug!("Cosigner payload is a mnemonic");
            return self.accept_mnemonic(trimmed);
        }

        match parse_key_origin(trimmed) {
            Some(account) if is_xpub_valid(&account.xpub) => {
                log::debug!("Cosigner payload is an extended public key");
                self.accept_account(account)
            }
            _ => Err(ParseError::InvalidCosigner),
        }
    }

    /// Feed the answer to a pending cosigner's prompt
    pub fn answer(
        &self,
        pending: PendingCosigner,
        answer: Option<String>,
    ) -> Result<Parsed, ParseError> {
        let answer = Zeroizing::new(answer.ok_or(ParseError::Cancelled)?);

        match pending.state {
            PendingState::Passphrase { mnemonic } => {
                self.finish_mnemonic(&mnemonic, Some(answer.as_str()))
            }
            PendingState::Origin {
                xpub,
                fingerprint: None,
                path,
            } => self.advance(xpub, Some(resolve_fingerprint(&answer)), path),
            PendingState::Origin {
                xpub,
                fingerprint,
                path: _,
            } => {
                let path = if answer.trim().is_empty() {
                    self.policy.path()
                } else {
                    self.resolve_prompted_path(&answer)
                };
                self.advance(xpub, fingerprint, Some(path))
            }
        }
    }

    /// Parse `raw`, asking `prompter` until the cosigner is complete
    pub fn resolve(&self, raw: &str, prompter: &mut dyn Prompter) -> Result<CosignerKey, ParseError> {
        let mut parsed = self.parse(raw)?;
        loop {
            match parsed {
                Parsed::Ready(key) => return Ok(key),
                Parsed::NeedsInput(pending) => {
                    let answer = prompter.ask(&pending.prompt());
                    parsed = self.answer(pending, answer)?;
                }
            }
        }
    }

    fn accept_mnemonic(&self, words: &str) -> Result<Parsed, ParseError> {
        parse_mnemonic(words).map_err(|e| ParseError::InvalidMnemonic(e.to_string()))?;
        let mnemonic = normalize_phrase(words);

        if self.ask_passphrase {
            return Ok(Parsed::NeedsInput(PendingCosigner {
                policy: self.policy,
                state: PendingState::Passphrase { mnemonic },
            }));
        }
        self.finish_mnemonic(&mnemonic, None)
    }

    fn finish_mnemonic(&self, mnemonic: &str, passphrase: Option<&str>) -> Result<Parsed, ParseError> {
        let key = CosignerKey::from_mnemonic(mnemonic, passphrase);
        // Warms the cache and surfaces derivation failures here
        key.effective_xpub(self.policy, &self.cache)?;

        log::info!("Accepted mnemonic cosigner for {}", self.policy);
        Ok(Parsed::Ready(key))
    }

    fn accept_account(&self, account: AccountTuple) -> Result<Parsed, ParseError> {
        if !is_xpub_valid(&account.xpub) {
            return Err(ParseError::InvalidCosigner);
        }
        if !is_xpub_for_multisig(&account.xpub) {
            return Err(ParseError::NotMultisigXpub);
        }

        let fingerprint = account.fingerprint.as_deref().map(resolve_fingerprint);
        let path = match account.path.as_deref() {
            Some(path) => Some(self.resolve_path(path)?),
            None => None,
        };

        self.advance(account.xpub, fingerprint, path)
    }

    /// Parse a supplied path, defaulting malformed ones to the policy
    /// template. A path belonging to another known policy is rejected.
    fn resolve_path(&self, path: &str) -> Result<DerivationPath, ParseError> {
        let path = path.trim();
        let parsed = if is_path_valid(path) {
            parse_path(path).ok()
        } else {
            None
        };

        let parsed = match parsed {
            Some(parsed) => parsed,
            None => {
                log::warn!("Malformed derivation path, using {}", self.policy.path_str());
                return Ok(self.policy.path());
            }
        };

        if !self.policy.accepts_path(&parsed) {
            return Err(ParseError::InvalidCosignerFormat);
        }
        Ok(parsed)
    }

    /// A typed path never rejects the cosigner. Anything the policy does
    /// not accept falls back to the template.
    fn resolve_prompted_path(&self, answer: &str) -> DerivationPath {
        match self.resolve_path(answer) {
            Ok(path) => path,
            Err(_) => {
                log::warn!(
                    "Path {} belongs to another format, using {}",
                    answer.trim(),
                    self.policy.path_str()
                );
                self.policy.path()
            }
        }
    }

    fn advance(
        &self,
        xpub: String,
        fingerprint: Option<Fingerprint>,
        path: Option<DerivationPath>,
    ) -> Result<Parsed, ParseError> {
        match (fingerprint, path) {
            (Some(fingerprint), Some(path)) => {
                log::info!(
                    "Accepted cosigner {} at {}",
                    fingerprint_hex(&fingerprint),
                    format_path(&path)
                );
                Ok(Parsed::Ready(CosignerKey::from_xpub(xpub, fingerprint, path)))
            }
            (fingerprint, path) => Ok(Parsed::NeedsInput(PendingCosigner {
                policy: self.policy,
                state: PendingState::Origin {
                    xpub,
                    fingerprint,
                    path,
                },
            })),
        }
    }
}
