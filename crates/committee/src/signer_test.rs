use pretty_assertions::assert_eq;

use super::ClaimSigner;

const PRIVATE_KEY: &str = "0xbfb1d570ddf495e378a1a85140e72d177a92637223fa540e05aaa061179f4290";

#[test]
fn key_parsing() {
    let with_prefix = ClaimSigner::new(PRIVATE_KEY).unwrap();
    let without_prefix = ClaimSigner::new(PRIVATE_KEY.strip_prefix("0x").unwrap()).unwrap();
    assert_eq!(with_prefix.address(), without_prefix.address());
    // Trailing whitespace from the key file is tolerated.
    let with_newline = ClaimSigner::new(&format!("{PRIVATE_KEY}\n")).unwrap();
    assert_eq!(with_prefix.address(), with_newline.address());

    assert!(ClaimSigner::new("not a key").is_err());
}

#[test]
fn signatures_are_deterministic_and_well_formed() {
    let signer = ClaimSigner::new(PRIVATE_KEY).unwrap();
    let claim_hash = [7_u8; 32];

    let signature = signer.sign_claim(&claim_hash).unwrap();
    assert_eq!(signature, signer.sign_claim(&claim_hash).unwrap());
    // 0x || r[32] || s[32] || v[1].
    assert_eq!(signature.len(), 2 + 2 * 65);
    assert!(signature.starts_with("0x"));
    let v = &signature[signature.len() - 2..];
    assert!(v == "1b" || v == "1c", "v byte is {v}");

    let other = signer.sign_claim(&[8_u8; 32]).unwrap();
    assert_ne!(signature, other);
}
