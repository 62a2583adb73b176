//! The StarkEx Pedersen hash: a sum of precomputed constant points selected by the bits of the
//! inputs, starting from the shift point. The hash of two field elements is the x coordinate of
//! the resulting point.

use num_bigint::BigUint;
use num_traits::Zero;
use once_cell::sync::Lazy;

use crate::curve::{ec_add, ec_double, AffinePoint, EC_GEN, SHIFT_POINT};
use crate::field::{biguint_from_hex, FieldElement, FIELD_ELEMENT_BYTES};
use crate::{CryptoError, CryptoResult};

#[cfg(test)]
#[path = "pedersen_test.rs"]
mod pedersen_test;

/// Bits consumed per hashed element.
pub const N_ELEMENT_BITS_HASH: usize = 252;

/// Bits covered by the low-part base point of each element; the remaining four bits use the
/// high-part base point.
const LOW_PART_BITS: usize = 248;

/// The four published hash base points, (low, high) per input element.
static HASH_BASE_POINTS: Lazy<[AffinePoint; 4]> = Lazy::new(|| {
    [
        AffinePoint {
            x: biguint_from_hex("234287dcbaffe7f969c748655fca9e58fa8120b6d56eb0c1080d17957ebe47b"),
            y: biguint_from_hex("3b056f100f96fb21e889527d41f4e39940135dd7a6c94cc6ed0268ee89e5615"),
        },
        AffinePoint {
            x: biguint_from_hex("4fa56f376c83db33f9dab2656558f3399099ec1de5e3018b7a6932dba8aa378"),
            y: biguint_from_hex("3fa0984c931c9e38113e0c0e47e4401562761f92a7a23b45168f4e80ff5b54d"),
        },
        AffinePoint {
            x: biguint_from_hex("4ba4cc166be8dec764910f75b45f74b40c690c74709e90f3aa372f0bd2d6997"),
            y: biguint_from_hex("40301cf5c1751f4b971e46c4ede85fcac5c59a5ce5ae7c48151f27b24b219c"),
        },
        AffinePoint {
            x: biguint_from_hex("54302dcb0e6cc1c6e44cca8f61a63bb2ca65048d53fb325d36ff12c49a58202"),
            y: biguint_from_hex("1b77b3e37d13504b348046268d8ae25ce98ad783c25561a879dcc77e99c2426"),
        },
    ]
});

/// The constant-points table of the hash: the shift point, the generator, and per element
/// `i` the points `2^j * low_i` for the low 248 bits followed by `2^j * high_i` for the top four.
/// This reproduces the layout of the published parameter blob.
pub static CONSTANT_POINTS: Lazy<Vec<AffinePoint>> = Lazy::new(|| {
    let mut points = vec![SHIFT_POINT.clone(), EC_GEN.clone()];
    for element_index in 0..2 {
        for (base, bits) in [
            (&HASH_BASE_POINTS[2 * element_index], LOW_PART_BITS),
            (&HASH_BASE_POINTS[2 * element_index + 1], N_ELEMENT_BITS_HASH - LOW_PART_BITS),
        ] {
            let mut point = base.clone();
            for bit in 0..bits {
                if bit > 0 {
                    point = ec_double(&point).expect("Doubling a hash base point cannot fail");
                }
                points.push(point.clone());
            }
        }
    }
    points
});

/// Hashes the given elements into a curve point. Exposed for tests; use [`pedersen_hash`] for the
/// x-coordinate digest.
pub fn pedersen_hash_as_point(elements: &[&FieldElement]) -> CryptoResult<AffinePoint> {
    let mut point = CONSTANT_POINTS[0].clone();
    for (element_index, element) in elements.iter().enumerate() {
        let table_offset = 2 + element_index * N_ELEMENT_BITS_HASH;
        let element_points = CONSTANT_POINTS
            .get(table_offset..table_offset + N_ELEMENT_BITS_HASH)
            .expect("The constant-points table covers two hashed elements");
        let mut remaining: BigUint = element.as_biguint().clone();
        for table_point in element_points {
            if point.x == table_point.x {
                return Err(CryptoError::UnhashableInput);
            }
            if remaining.bit(0) {
                point = ec_add(&point, table_point)?;
            }
            remaining >>= 1;
        }
        assert!(remaining.is_zero(), "A field element has at most {N_ELEMENT_BITS_HASH} bits");
    }
    Ok(point)
}

pub fn pedersen_hash(x: &FieldElement, y: &FieldElement) -> CryptoResult<FieldElement> {
    let point = pedersen_hash_as_point(&[x, y])?;
    FieldElement::new(point.x)
}

/// The byte-level hash used as the Merkle node hash: decodes two 32-byte big-endian field
/// elements, Pedersen-hashes them and re-encodes the digest. Out-of-range input is a hard error.
pub fn pedersen_hash_func(
    left: &[u8; FIELD_ELEMENT_BYTES],
    right: &[u8; FIELD_ELEMENT_BYTES],
) -> CryptoResult<[u8; FIELD_ELEMENT_BYTES]> {
    let hash =
        pedersen_hash(&FieldElement::from_bytes_be(left)?, &FieldElement::from_bytes_be(right)?)?;
    Ok(hash.to_bytes_be())
}
