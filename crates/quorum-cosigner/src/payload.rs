//! Interchange payload shapes
//!
//! What a cosigner device hands over, and what we hand back:
//!
//! - a single account: `{"xfp": "...", "xpub": "...", "path": "..."}`
//! - a bundle of accounts for one seed: a JSON array of the above, or a
//!   Coldcard multisig export (`xfp` plus `p2sh`, `p2wsh_p2sh`, `p2wsh`
//!   with matching `*_deriv` paths)
//! - a key-origin string: `[73c5da0a/48'/0'/0'/2']Zpub...`

use quorum_keys::ScriptPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One cosigner's public key material, ready for transport.
///
/// Field order is part of the format: `xfp`, `xpub`, `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangePayload {
    /// Master fingerprint, 8 upper-case hex chars
    pub xfp: String,
    /// Account xpub, multisig-tagged for the wallet's policy
    pub xpub: String,
    /// Account derivation path
    pub path: String,
}

/// One account as found in an incoming payload, before validation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountTuple {
    pub xpub: String,
    pub fingerprint: Option<String>,
    pub path: Option<String>,
}

/// Structural reading of a decoded JSON payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JsonShape {
    Account(AccountTuple),
    Bundle(Vec<AccountTuple>),
    Unrecognized,
}

/// Coldcard export slots: (xpub field, path field, policy)
const COLDCARD_SLOTS: [(&str, &str, ScriptPolicy); 4] = [
    ("p2sh", "p2sh_deriv", ScriptPolicy::Legacy),
    ("p2wsh_p2sh", "p2wsh_p2sh_deriv", ScriptPolicy::WrappedSegwit),
    ("p2sh_p2wsh", "p2sh_p2wsh_deriv", ScriptPolicy::WrappedSegwit),
    ("p2wsh", "p2wsh_deriv", ScriptPolicy::NativeSegwit),
];

fn string_field(object: &Map<String, Value>, name: &str) -> Option<String> {
    object
        .get(name)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn account_from_object(object: &Map<String, Value>) -> Option<AccountTuple> {
    Some(AccountTuple {
        xpub: string_field(object, "xpub")?,
        fingerprint: string_field(object, "xfp"),
        path: string_field(object, "path"),
    })
}

fn coldcard_accounts(object: &Map<String, Value>) -> Vec<AccountTuple> {
    let fingerprint = string_field(object, "xfp");
    COLDCARD_SLOTS
        .iter()
        .filter_map(|(xpub_field, path_field, policy)| {
            Some(AccountTuple {
                xpub: string_field(object, xpub_field)?,
                fingerprint: fingerprint.clone(),
                path: Some(
                    string_field(object, path_field).unwrap_or_else(|| policy.path_str().to_string()),
                ),
            })
        })
        .collect()
}

/// Classify a decoded JSON value. A single-element array is unwrapped.
pub(crate) fn classify_json(value: Value) -> JsonShape {
    let value = match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    };

    match value {
        Value::Object(object) => {
            if let Some(account) = account_from_object(&object) {
                return JsonShape::Account(account);
            }
            let bundle = coldcard_accounts(&object);
            if bundle.is_empty() {
                JsonShape::Unrecognized
            } else {
                JsonShape::Bundle(bundle)
            }
        }
        Value::Array(items) => {
            let bundle: Vec<AccountTuple> = items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(account_from_object)
                .collect();
            if bundle.is_empty() {
                JsonShape::Unrecognized
            } else {
                JsonShape::Bundle(bundle)
            }
        }
        Value::String(s) => match parse_key_origin(&s) {
            Some(account) => JsonShape::Account(account),
            None => JsonShape::Unrecognized,
        },
        _ => JsonShape::Unrecognized,
    }
}

/// Parse `[fingerprint/path]xpub`, a bare xpub, or either followed by a
/// descriptor suffix such as `/<0;1>/*`.
///
/// Only the shape is checked here; the xpub itself is validated later.
pub(crate) fn parse_key_origin(s: &str) -> Option<AccountTuple> {
    let s = s.trim();
    if s.is_empty() || s.contains(char::is_whitespace) {
        return None;
    }

    let (fingerprint, path, key) = match s.strip_prefix('[') {
        Some(rest) => {
            let (origin, key) = rest.split_once(']')?;
            match origin.split_once('/') {
                Some((fp, path)) => (Some(fp.to_string()), Some(format!("m/{}", path)), key),
                None => (Some(origin.to_string()), None, key),
            }
        }
        None => (None, None, s),
    };

    let xpub = key.split('/').next().unwrap_or_default();
    if xpub.is_empty() {
        return None;
    }

    Some(AccountTuple {
        xpub: xpub.to_string(),
        fingerprint: fingerprint.filter(|fp| !fp.is_empty()),
        path,
    })
}

/// Account whose path classifies to `policy`. When several do, the last
/// one in the bundle wins.
pub(crate) fn select_for_policy(bundle: Vec<AccountTuple>, policy: ScriptPolicy) -> Option<AccountTuple> {
    bundle
        .into_iter()
        .filter(|account| {
            account
                .path
                .as_deref()
                .filter(|p| quorum_keys::xpub::is_path_valid(p))
                .and_then(|p| quorum_keys::parse_path(p).ok())
                .and_then(|p| ScriptPolicy::from_path(&p))
                == Some(policy)
        })
        .last()
}
