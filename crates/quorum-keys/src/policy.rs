//! Script policy catalog
//!
//! The fixed table of multisig script types the wallet can create. Each
//! policy owns a canonical BIP-48/BIP-45 account path, the SLIP-132 version
//! bytes used when an account xpub is shown "multisig flavored", and the
//! descriptor wrapper used around `sortedmulti`.
//!
//! | policy        | path             | tag    | format       |
//! |---------------|------------------|--------|--------------|
//! | NativeSegwit  | `m/48'/0'/0'/2'` | `Zpub` | `p2wsh`      |
//! | WrappedSegwit | `m/48'/0'/0'/1'` | `Ypub` | `p2sh-p2wsh` |
//! | Legacy        | `m/45'`          | `xpub` | `p2sh`       |

use bitcoin::bip32::{ChildNumber, DerivationPath};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::xpub::{VERSION_MAGIC_XPUB, VERSION_MAGIC_YPUB_MULTISIG, VERSION_MAGIC_ZPUB_MULTISIG};

/// BIP-48 account path for P2WSH multisig
pub const PATH_NATIVE_SEGWIT: &str = "m/48'/0'/0'/2'";

/// BIP-48 account path for P2SH-P2WSH multisig
pub const PATH_WRAPPED_SEGWIT: &str = "m/48'/0'/0'/1'";

/// BIP-45 path for legacy P2SH multisig
pub const PATH_LEGACY: &str = "m/45'";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Unknown multisig format: {0}")]
    UnknownFormat(String),
}

/// Script type governing derivation path and xpub version tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPolicy {
    /// P2WSH
    NativeSegwit,
    /// P2SH-wrapped P2WSH
    WrappedSegwit,
    /// Bare P2SH
    Legacy,
}

impl ScriptPolicy {
    pub const ALL: [ScriptPolicy; 3] = [
        ScriptPolicy::NativeSegwit,
        ScriptPolicy::WrappedSegwit,
        ScriptPolicy::Legacy,
    ];

    /// Canonical account path template as a string
    pub fn path_str(&self) -> &'static str {
        match self {
            ScriptPolicy::NativeSegwit => PATH_NATIVE_SEGWIT,
            ScriptPolicy::WrappedSegwit => PATH_WRAPPED_SEGWIT,
            ScriptPolicy::Legacy => PATH_LEGACY,
        }
    }

    /// Canonical account path template
    pub fn path(&self) -> DerivationPath {
        let children: Vec<ChildNumber> = match self {
            ScriptPolicy::NativeSegwit => vec![hardened(48), hardened(0), hardened(0), hardened(2)],
            ScriptPolicy::WrappedSegwit => {
                vec![hardened(48), hardened(0), hardened(0), hardened(1)]
            }
            ScriptPolicy::Legacy => vec![hardened(45)],
        };
        DerivationPath::from(children)
    }

    /// SLIP-132 version bytes for the multisig-flavored xpub
    pub fn version_tag(&self) -> [u8; 4] {
        match self {
            ScriptPolicy::NativeSegwit => VERSION_MAGIC_ZPUB_MULTISIG,
            ScriptPolicy::WrappedSegwit => VERSION_MAGIC_YPUB_MULTISIG,
            ScriptPolicy::Legacy => VERSION_MAGIC_XPUB,
        }
    }

    /// Inverse of [`ScriptPolicy::version_tag`]
    pub fn from_version_tag(tag: [u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.version_tag() == tag)
    }

    /// Classify an account path by its purpose and script-type components.
    ///
    /// Matching is prefix + suffix based because coin type and account index
    /// vary between devices: `48/.../2'` is P2WSH, `48/.../1'` is P2SH-P2WSH
    /// and anything under `45` is legacy P2SH.
    pub fn from_path(path: &DerivationPath) -> Option<Self> {
        let children: &[ChildNumber] = path.as_ref();
        let first = children.first()?;
        let last = children.last()?;

        match child_index(first) {
            45 => Some(ScriptPolicy::Legacy),
            48 if children.len() > 1 => match last {
                ChildNumber::Hardened { index: 2 } => Some(ScriptPolicy::NativeSegwit),
                ChildNumber::Hardened { index: 1 } => Some(ScriptPolicy::WrappedSegwit),
                _ => None,
            },
            _ => None,
        }
    }

    /// True when `path` is either unclassified (custom) or classifies to
    /// this policy.
    pub fn accepts_path(&self, path: &DerivationPath) -> bool {
        match Self::from_path(path) {
            Some(policy) => policy == *self,
            None => true,
        }
    }

    /// Short format name used in setup files and configs
    pub fn format_name(&self) -> &'static str {
        match self {
            ScriptPolicy::NativeSegwit => "p2wsh",
            ScriptPolicy::WrappedSegwit => "p2sh-p2wsh",
            ScriptPolicy::Legacy => "p2sh",
        }
    }

    /// Descriptor for `sortedmulti` wrapped in this policy's script type
    pub fn wrap_sortedmulti(&self, inner: &str) -> String {
        match self {
            ScriptPolicy::NativeSegwit => format!("wsh({inner})"),
            ScriptPolicy::WrappedSegwit => format!("sh(wsh({inner}))"),
            ScriptPolicy::Legacy => format!("sh({inner})"),
        }
    }
}

impl fmt::Display for ScriptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.format_name())
    }
}

impl FromStr for ScriptPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p2wsh" | "native_segwit" => Ok(ScriptPolicy::NativeSegwit),
            "p2sh-p2wsh" | "p2wsh-p2sh" | "wrapped_segwit" => Ok(ScriptPolicy::WrappedSegwit),
            "p2sh" | "legacy" => Ok(ScriptPolicy::Legacy),
            other => Err(PolicyError::UnknownFormat(other.to_string())),
        }
    }
}

fn hardened(index: u32) -> ChildNumber {
    ChildNumber::Hardened { index }
}

fn child_index(child: &ChildNumber) -> u32 {
    match *child {
        ChildNumber::Normal { index } | ChildNumber::Hardened { index } => index,
    }
}
