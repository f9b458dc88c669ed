//! Security-specific tests.
//!
//! These tests verify:
//! 1. Mnemonics never leave through exports, setup files or Debug output
//! 2. One key cannot enter a wallet twice under a different representation
//! 3. Keys that don't fit the wallet are rejected without touching the set
//! 4. Malformed inputs don't panic

use quorum_cosigner::{
    AssembleError, CosignerKey, CosignerParser, CosignerSet, ParseError, Parsed, Prompt,
    Prompter, SetError, WalletAssembler,
};
use quorum_keys::xpub::encode_multisig;
use quorum_keys::{
    derive_account_xpub, derive_fingerprint, parse_path, DerivationCache, ScriptPolicy,
};
use std::str::FromStr;
use std::sync::Arc;

const ABANDON: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const ABANDON_XPUB: &str = "xpub6DkFAXWQ2dHxq2vatrt9qyA3bXYU4ToWQwCHbf5XB2mSTexcHZCeKS1VZYcPoBd5X8yVcbXFHJR9R8UCVpt82VX1VhR28mCyxUFL4r6KFrf";
const ZPUB_1: &str = "Zpub74ijpfhERJNjhCKXRspTdLJV5eoEmSRZdHqDvp9kVtdVEyiXk7pXxRbfZzQvsDFpfDHEHVtVpx4Dz9DGUWGn2Xk5zG5u45QTMsYS2vjohNQ";
const ZPUB_2: &str = "Zpub75mAE8EjyxSzoyPmGnd5E6MyD7ALGNndruWv52xpzimZQKukwvEfXTHqmH8nbbc6ccP5t2aM3mws3pKYSnKpKMMytdbNEZFUxKzztYFM8Pn";
const ZPUB_SINGLESIG: &str = "zpub6qT7amLcp2exr4mU4AhXZMjD9CFkopECVhUxc9LHW8pNsJG2B9ogs5sFbGZpxEeT5TBjLmc7EFYgZA9EeWEM1xkJMFLefzZc8eigRFhKB8Q";

struct Cancel;

impl Prompter for Cancel {
    fn ask(&mut self, _prompt: &Prompt) -> Option<String> {
        None
    }
}

fn native_set(m: usize, n: usize) -> (Arc<DerivationCache>, CosignerSet) {
    let cache = DerivationCache::shared();
    let set = CosignerSet::new(m, n, ScriptPolicy::NativeSegwit, Arc::clone(&cache)).unwrap();
    (cache, set)
}

fn xpub_key(xpub: &str, fingerprint: &str) -> CosignerKey {
    CosignerKey::from_xpub(
        xpub,
        bitcoin::bip32::Fingerprint::from_str(fingerprint).unwrap(),
        ScriptPolicy::NativeSegwit.path(),
    )
}

// ============================================================================
// 1. Secret containment
// ============================================================================

#[test]
fn test_exports_never_contain_mnemonic() {
    let (_, mut set) = native_set(1, 1);
    set.try_add(CosignerKey::from_mnemonic(ABANDON, Some("hunter2"))).unwrap();

    let payload = set.export_for(0).unwrap();
    for rendered in [payload.to_json().unwrap(), payload.to_ur().unwrap()] {
        assert!(!rendered.contains("abandon"));
        assert!(!rendered.contains("hunter2"));
    }
}

#[test]
fn test_debug_output_redacts_secrets() {
    let key = CosignerKey::from_mnemonic(ABANDON, Some("hunter2"));
    let debug = format!("{:?}", key);
    assert!(!debug.contains("abandon"));
    assert!(!debug.contains("hunter2"));

    let parser = CosignerParser::new(ScriptPolicy::NativeSegwit, DerivationCache::shared())
        .with_passphrase_prompt(true);
    match parser.parse(ABANDON).unwrap() {
        Parsed::NeedsInput(pending) => {
            assert_eq!(pending.prompt(), Prompt::Passphrase);
            assert!(!format!("{:?}", pending).contains("abandon"));
        }
        other => panic!("expected a passphrase prompt, got {:?}", other),
    }
}

#[test]
fn test_assembled_wallet_keeps_secrets_private() {
    let (cache, mut set) = native_set(1, 2);
    set.try_add(CosignerKey::from_mnemonic(ABANDON, None)).unwrap();
    set.try_add(xpub_key(ZPUB_1, "D37EAD88")).unwrap();

    let mut wallet = WalletAssembler::new(cache)
        .assemble(1, 2, ScriptPolicy::NativeSegwit, "vault", &set)
        .unwrap();
    assert!(wallet.has_secrets());
    assert!(!format!("{:?}", wallet).contains("abandon"));
    assert!(!wallet.coordination_setup().contains("abandon"));
    assert!(!wallet.to_descriptor().unwrap().to_string().contains("abandon"));

    wallet.discard_secrets();
    assert!(!wallet.has_secrets());
}

#[test]
fn test_cleared_set_holds_nothing() {
    let (_, mut set) = native_set(1, 2);
    set.try_add(CosignerKey::from_mnemonic(ABANDON, None)).unwrap();
    set.clear();

    assert!(set.is_empty());
    assert!(set.get(0).is_none());
    assert!(matches!(set.export_for(0), Err(_)));
}

#[test]
fn test_passphrase_yields_different_identity() {
    let plain = derive_fingerprint(ABANDON, None).unwrap();
    let protected = derive_fingerprint(ABANDON, Some("TREZOR")).unwrap();
    assert_ne!(plain, protected);

    // Empty passphrase is the same cosigner as none
    assert_eq!(derive_fingerprint(ABANDON, Some("")).unwrap(), plain);
}

// ============================================================================
// 2. Duplicate detection
// ============================================================================

#[test]
fn test_seed_and_its_xpub_are_duplicates() {
    let (_, mut set) = native_set(2, 3);
    set.try_add(CosignerKey::from_mnemonic(ABANDON, None)).unwrap();

    let as_xpub = xpub_key(ABANDON_XPUB, "73C5DA0A");
    assert!(matches!(set.try_add(as_xpub), Err(SetError::DuplicateCosigner)));

    let as_zpub = xpub_key(
        &encode_multisig(
            &quorum_keys::xpub::to_plain_xpub(ABANDON_XPUB).unwrap(),
            ScriptPolicy::NativeSegwit,
        ),
        "73C5DA0A",
    );
    assert!(matches!(set.try_add(as_zpub), Err(SetError::DuplicateCosigner)));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_same_device_two_accounts_rejected_at_assembly() {
    let (cache, mut set) = native_set(1, 2);
    set.try_add(CosignerKey::from_mnemonic(ABANDON, None)).unwrap();

    // Account 1 of the same seed: distinct xpub, same master fingerprint
    let path = parse_path("m/48'/0'/1'/2'").unwrap();
    let other_account = derive_account_xpub(ABANDON, &path, None).unwrap();
    set.try_add(CosignerKey::from_xpub(
        encode_multisig(&other_account, ScriptPolicy::NativeSegwit),
        derive_fingerprint(ABANDON, None).unwrap(),
        path,
    ))
    .unwrap();

    let result = WalletAssembler::new(cache).assemble(1, 2, ScriptPolicy::NativeSegwit, "x", &set);
    match result {
        Err(AssembleError::DuplicateFingerprint(fp)) => assert_eq!(fp, "73C5DA0A"),
        other => panic!("expected duplicate fingerprint, got {:?}", other.map(|w| w.label)),
    }
}

#[test]
fn test_unknown_fingerprints_do_not_collide() {
    let (cache, mut set) = native_set(2, 2);
    set.try_add(xpub_key(ZPUB_1, "00000000")).unwrap();
    set.try_add(xpub_key(ZPUB_2, "00000000")).unwrap();

    assert!(WalletAssembler::new(cache)
        .assemble(2, 2, ScriptPolicy::NativeSegwit, "x", &set)
        .is_ok());
}

// ============================================================================
// 3. Rejections leave the set untouched
// ============================================================================

#[test]
fn test_singlesig_xpub_rejected() {
    let parser = CosignerParser::new(ScriptPolicy::NativeSegwit, DerivationCache::shared());
    assert!(matches!(
        parser.resolve(ZPUB_SINGLESIG, &mut Cancel),
        Err(ParseError::NotMultisigXpub)
    ));

    let (_, mut set) = native_set(1, 2);
    set.try_add(xpub_key(ZPUB_1, "D37EAD88")).unwrap();
    assert!(matches!(
        set.try_add(xpub_key(ZPUB_SINGLESIG, "D37EAD88")),
        Err(SetError::NotMultisigXpub)
    ));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_foreign_policy_path_rejected() {
    let parser = CosignerParser::new(ScriptPolicy::NativeSegwit, DerivationCache::shared());
    let legacy = format!(r#"{{"xfp":"D37EAD88","xpub":"{}","path":"m/45'"}}"#, ZPUB_1);
    assert!(matches!(
        parser.resolve(&legacy, &mut Cancel),
        Err(ParseError::InvalidCosignerFormat)
    ));

    let (_, mut set) = native_set(1, 2);
    let key = CosignerKey::from_xpub(
        ZPUB_1,
        bitcoin::bip32::Fingerprint::from_str("D37EAD88").unwrap(),
        parse_path("m/48'/0'/0'/1'").unwrap(),
    );
    assert!(matches!(set.try_add(key), Err(SetError::IncompatibleFormat(_))));
    assert!(set.is_empty());
}

#[test]
fn test_full_set_rejects_more() {
    let (_, mut set) = native_set(1, 1);
    set.try_add(xpub_key(ZPUB_1, "D37EAD88")).unwrap();
    assert!(matches!(
        set.try_add(xpub_key(ZPUB_2, "168DD603")),
        Err(SetError::SetFull(1))
    ));
}

#[test]
fn test_cancelled_prompt_adds_nothing() {
    let parser = CosignerParser::new(ScriptPolicy::NativeSegwit, DerivationCache::shared());
    assert!(matches!(
        parser.resolve(ZPUB_1, &mut Cancel),
        Err(ParseError::Cancelled)
    ));
}

// ============================================================================
// 4. Malformed input
// ============================================================================

#[test]
fn test_malformed_payloads_dont_panic() {
    let parser = CosignerParser::new(ScriptPolicy::NativeSegwit, DerivationCache::shared());
    let inputs = [
        "",
        " ",
        "{",
        "[]",
        "[[]]",
        "null",
        "\"\"",
        "{\"xpub\": 5}",
        "{\"xpub\": \"\"}",
        "{\"xfp\": \"D37EAD88\"}",
        "[d37ead88",
        "[]xpub",
        "[zzzz/48'/0'/0'/2']Zpub",
        "xpub",
        "Zpub74ijpfhERJNjhCKXRspTdLJV5eoEmSRZdHqDvp9kVtdVEyiXk7pXxRbfZzQvsDFpfDHEHVtVpx4Dz9DGUWGn2Xk5zG5u45QTMsYS2vjohNR",
        "abandon abandon",
        "ur:bytes/",
        "\u{0}\u{1}\u{2}",
        "🔑 🔑 🔑",
    ];

    for input in inputs {
        let result = parser.resolve(input, &mut Cancel);
        assert!(result.is_err(), "input {:?} should be rejected", input);
    }
}

#[test]
fn test_garbage_xpub_decode_never_panics() {
    for len in 0..120 {
        let s: String = std::iter::repeat('Z').take(len).collect();
        assert!(!quorum_keys::xpub::is_xpub_valid(&s));
        assert!(!quorum_keys::xpub::is_xpub_for_multisig(&s));
    }
}
