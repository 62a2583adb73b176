use assert_matches::assert_matches;
use committee_storage::db_object::{DBObject, Fact};
use committee_storage::hash::Digest;
use pretty_assertions::assert_eq;
use starkex_crypto::pedersen::pedersen_hash;
use starkex_crypto::FieldElement;

use super::{u64_digest, OrderStateFact, VaultStateFact, MAX_AMOUNT};
use crate::hashing::PedersenHashFunction;
use crate::StateError;

fn element(value: u64) -> FieldElement {
    FieldElement::from(value)
}

#[test]
fn empty_vault_is_normalized() {
    // A zero balance zeroes the key and token, whatever was passed in.
    let vault = VaultStateFact::new(element(0x11), element(0x22), 0).unwrap();
    assert_eq!(vault, VaultStateFact::empty());
}

#[test]
fn non_empty_vault_requires_key_and_token() {
    assert_matches!(
        VaultStateFact::new(element(0), element(0x22), 5),
        Err(StateError::NonEmptyVaultWithEmptyStarkKey)
    );
    assert_matches!(
        VaultStateFact::new(element(0x11), element(0), 5),
        Err(StateError::NonEmptyVaultWithEmptyToken)
    );
    assert_matches!(
        VaultStateFact::new(element(0x11), element(0x22), MAX_AMOUNT),
        Err(StateError::OutOfRangeBalance(_))
    );
}

#[test]
fn vault_canonical_json() {
    let vault = VaultStateFact::new(element(0x11), element(0x22), 3).unwrap();
    let json = serde_json::to_string(&vault).unwrap();
    assert_eq!(json, r#"{"stark_key":"0x11","token":"0x22","balance":"3"}"#);
    assert_eq!(serde_json::from_str::<VaultStateFact>(&json).unwrap(), vault);

    let empty_json = serde_json::to_string(&VaultStateFact::empty()).unwrap();
    assert_eq!(empty_json, r#"{"stark_key":"0x0","token":"0x0","balance":"0"}"#);
}

#[test]
fn vault_deserialization_enforces_the_invariants() {
    // Normalization applies to loaded values too.
    let vault: VaultStateFact =
        serde_json::from_str(r#"{"stark_key":"0x11","token":"0x22","balance":"0"}"#).unwrap();
    assert_eq!(vault, VaultStateFact::empty());

    assert!(serde_json::from_str::<VaultStateFact>(
        r#"{"stark_key":"0x0","token":"0x22","balance":"5"}"#
    )
    .is_err());
    assert!(serde_json::from_str::<VaultStateFact>(
        r#"{"stark_key":"0x11","token":"0x22","balance":"9223372036854775808"}"#
    )
    .is_err());
    assert!(serde_json::from_str::<VaultStateFact>(
        r#"{"stark_key":"0x11","token":"0x22","balance":"-1"}"#
    )
    .is_err());
}

#[tokio::test]
async fn vault_leaf_hash_is_nested_pedersen() {
    let vault = VaultStateFact::new(element(0x11), element(0x22), 3).unwrap();
    let hash = vault.hash(&PedersenHashFunction).await.unwrap();

    let key_and_token = pedersen_hash(&element(0x11), &element(0x22)).unwrap();
    let expected = pedersen_hash(&key_and_token, &element(3)).unwrap();
    assert_eq!(hash, Digest(expected.to_bytes_be()));

    // The empty-vault hash is H(H(0, 0), 0).
    let empty_hash = VaultStateFact::empty().hash(&PedersenHashFunction).await.unwrap();
    let expected_empty =
        pedersen_hash(&pedersen_hash(&element(0), &element(0)).unwrap(), &element(0)).unwrap();
    assert_eq!(empty_hash, Digest(expected_empty.to_bytes_be()));
}

#[test]
fn vault_storage_round_trip() {
    let vault = VaultStateFact::new(element(0x11), element(0x22), 3).unwrap();
    assert_eq!(VaultStateFact::deserialize(&vault.serialize()).unwrap(), vault);
    assert_eq!(VaultStateFact::prefix().0, "vault_state");
}

#[test]
fn order_range_and_json() {
    assert_matches!(
        OrderStateFact::new(MAX_AMOUNT),
        Err(StateError::OutOfRangeFulfilledAmount(_))
    );

    let order = OrderStateFact::new(5).unwrap();
    let json = serde_json::to_string(&order).unwrap();
    assert_eq!(json, r#"{"fulfilled_amount":"5"}"#);
    assert_eq!(serde_json::from_str::<OrderStateFact>(&json).unwrap(), order);
    assert_eq!(OrderStateFact::deserialize(&order.serialize()).unwrap(), order);
    assert_eq!(OrderStateFact::prefix().0, "order_state");
}

#[tokio::test]
async fn order_leaf_hash_is_the_raw_amount() {
    // Order leaves are not Pedersen-hashed; the amount itself is the 32-byte digest.
    let order = OrderStateFact::new(0xabcd).unwrap();
    let hash = order.hash(&PedersenHashFunction).await.unwrap();
    assert_eq!(hash, u64_digest(0xabcd));
    let mut expected = [0_u8; 32];
    expected[30] = 0xab;
    expected[31] = 0xcd;
    assert_eq!(hash.0, expected);
}
