//! The availability claim: the fixed-layout byte string a committee member signs to attest the
//! two state commitments and a monotonically increasing sequence number. The layout matches the
//! data-availability contract's `keccak256(abi.encodePacked(...))`.

use committee_storage::hash::{Digest, HASH_BYTES};
use sha3::{Digest as _, Keccak256};

#[cfg(test)]
#[path = "availability_claim_test.rs"]
mod availability_claim_test;

const U256_BYTES: usize = 32;

fn u256_be(value: u64) -> [u8; U256_BYTES] {
    let mut bytes = [0_u8; U256_BYTES];
    bytes[U256_BYTES - 8..].copy_from_slice(&value.to_be_bytes());
    bytes
}

fn claim_preimage(
    vaults_root: &Digest,
    vaults_height: usize,
    trades_root: &Digest,
    trades_height: usize,
    seq_num: u64,
) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(2 * HASH_BYTES + 3 * U256_BYTES);
    preimage.extend_from_slice(&vaults_root.0);
    preimage.extend_from_slice(&u256_be(vaults_height.try_into().expect("usize fits in u64")));
    preimage.extend_from_slice(&trades_root.0);
    preimage.extend_from_slice(&u256_be(trades_height.try_into().expect("usize fits in u64")));
    preimage.extend_from_slice(&u256_be(seq_num));
    preimage
}

/// Keccak-256 of `vaults_root[32] || vaults_height[u256] || trades_root[32] ||
/// trades_height[u256] || seq_num[u256]`, all big-endian.
pub fn hash_availability_claim(
    vaults_root: &Digest,
    vaults_height: usize,
    trades_root: &Digest,
    trades_height: usize,
    seq_num: u64,
) -> [u8; 32] {
    Keccak256::digest(claim_preimage(vaults_root, vaults_height, trades_root, trades_height, seq_num))
        .into()
}
