//! SLIP-132 extended public key codec
//!
//! Cosigner devices export account keys with script-specific version bytes
//! (`Zpub` for P2WSH, `Ypub` for P2SH-P2WSH, plain `xpub` for P2SH). The key
//! material is identical; only the first four bytes of the base58check
//! payload change. Descriptors always use the plain `xpub` form.
//!
//! Only mainnet public tags are recognized.

use bitcoin::base58;
use bitcoin::bip32::Xpub;

use crate::keys::KeyError;
use crate::policy::ScriptPolicy;

/// xpub: P2PKH or P2SH
pub const VERSION_MAGIC_XPUB: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];
/// ypub: P2WPKH in P2SH
pub const VERSION_MAGIC_YPUB: [u8; 4] = [0x04, 0x9D, 0x7C, 0xB2];
/// zpub: P2WPKH
pub const VERSION_MAGIC_ZPUB: [u8; 4] = [0x04, 0xB2, 0x47, 0x46];
/// Ypub: multi-signature P2WSH in P2SH
pub const VERSION_MAGIC_YPUB_MULTISIG: [u8; 4] = [0x02, 0x95, 0xB4, 0x3F];
/// Zpub: multi-signature P2WSH
pub const VERSION_MAGIC_ZPUB_MULTISIG: [u8; 4] = [0x02, 0xAA, 0x7E, 0xD3];

/// Length of a serialized BIP-32 extended key
const EXTENDED_KEY_LEN: usize = 78;

/// Indices at or above this are hardened
const HARDENED_OFFSET: u64 = 1 << 31;

fn is_known_public_tag(tag: [u8; 4]) -> bool {
    matches!(
        tag,
        VERSION_MAGIC_XPUB
            | VERSION_MAGIC_YPUB
            | VERSION_MAGIC_ZPUB
            | VERSION_MAGIC_YPUB_MULTISIG
            | VERSION_MAGIC_ZPUB_MULTISIG
    )
}

fn is_multisig_tag(tag: [u8; 4]) -> bool {
    matches!(
        tag,
        VERSION_MAGIC_XPUB | VERSION_MAGIC_YPUB_MULTISIG | VERSION_MAGIC_ZPUB_MULTISIG
    )
}

/// Decode base58check and split off the version tag
fn decode_tagged(s: &str) -> Result<([u8; 4], Vec<u8>), KeyError> {
    let data = base58::decode_check(s.trim()).map_err(|e| KeyError::InvalidXpub(e.to_string()))?;
    if data.len() != EXTENDED_KEY_LEN {
        return Err(KeyError::InvalidXpub(format!(
            "wrong extended key length: {}",
            data.len()
        )));
    }

    let mut tag = [0u8; 4];
    tag.copy_from_slice(&data[0..4]);
    if !is_known_public_tag(tag) {
        return Err(KeyError::InvalidXpub(format!("unknown version bytes: {:02X?}", tag)));
    }

    Ok((tag, data))
}

/// The SLIP-132 version tag of an extended public key, if recognized
pub fn version_tag_of(s: &str) -> Option<[u8; 4]> {
    decode_tagged(s).ok().map(|(tag, _)| tag)
}

/// Decode any recognized SLIP-132 variant into a standard BIP-32 xpub
pub fn to_plain_xpub(s: &str) -> Result<Xpub, KeyError> {
    let (_, mut data) = decode_tagged(s)?;
    data[0..4].copy_from_slice(&VERSION_MAGIC_XPUB);

    Xpub::decode(&data).map_err(|e| KeyError::InvalidXpub(e.to_string()))
}

/// Encode a plain xpub with the multisig version tag of `policy`
pub fn encode_multisig(xpub: &Xpub, policy: ScriptPolicy) -> String {
    let mut data = xpub.encode();
    data[0..4].copy_from_slice(&policy.version_tag());
    base58::encode_check(&data)
}

/// Re-tag an extended public key for `policy`. The key material is unchanged.
pub fn to_multisig_xpub(s: &str, policy: ScriptPolicy) -> Result<String, KeyError> {
    let xpub = to_plain_xpub(s)?;
    Ok(encode_multisig(&xpub, policy))
}

/// Well-formed extended public key with a recognized public version tag
pub fn is_xpub_valid(s: &str) -> bool {
    to_plain_xpub(s).is_ok()
}

/// Valid, and tagged as usable in a multisig context (`xpub`, `Ypub`, `Zpub`).
///
/// Single-sig tags (`ypub`, `zpub`) are rejected: a device exporting those is
/// advertising a single-key account, not a multisig cosigner key.
pub fn is_xpub_for_multisig(s: &str) -> bool {
    match decode_tagged(s) {
        Ok((tag, _)) => is_multisig_tag(tag) && is_xpub_valid(s),
        Err(_) => false,
    }
}

/// Exactly 8 hex characters, either case
pub fn is_fp_valid(s: &str) -> bool {
    s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// `m/` followed by one or more `/`-separated indices below 2^31, each
/// optionally hardened with `'` or `h`
pub fn is_path_valid(s: &str) -> bool {
    let rest = match s.strip_prefix("m/") {
        Some(rest) => rest,
        None => return false,
    };

    rest.split('/').all(|component| {
        let digits = component
            .strip_suffix('\'')
            .or_else(|| component.strip_suffix('h'))
            .unwrap_or(component);

        !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && digits
                .parse::<u64>()
                .map(|index| index < HARDENED_OFFSET)
                .unwrap_or(false)
    })
}
