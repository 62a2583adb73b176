//! Arithmetic over the STARK prime field, `FIELD_PRIME = 2^251 + 17 * 2^192 + 1`.

use std::fmt;

use num_bigint::{BigUint, ToBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{CryptoError, CryptoResult};

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;

/// Number of bytes in the big-endian encoding of a field element.
pub const FIELD_ELEMENT_BYTES: usize = 32;

pub static FIELD_PRIME: Lazy<BigUint> = Lazy::new(|| {
    biguint_from_hex("800000000000011000000000000000000000000000000000000000000000001")
});

/// Order of the subgroup generated by the curve generator. Distinct from `FIELD_PRIME`.
pub static EC_ORDER: Lazy<BigUint> = Lazy::new(|| {
    biguint_from_hex("800000000000010ffffffffffffffffb781126dcae7b2321e66a241adc64d2f")
});

pub(crate) fn biguint_from_hex(hex_str: &str) -> BigUint {
    BigUint::parse_bytes(hex_str.as_bytes(), 16).expect("Hardcoded hex constant is valid")
}

/// A nonnegative integer in `[0, FIELD_PRIME)`.
///
/// Serializes to a minimal, lowercase, `0x`-prefixed hex string, the canonical wire form of field
/// elements.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldElement(BigUint);

impl FieldElement {
    pub fn new(value: BigUint) -> CryptoResult<Self> {
        if value >= *FIELD_PRIME {
            return Err(CryptoError::ValueOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parses the canonical `0x`-prefixed lowercase hex form.
    pub fn from_hex(hex_str: &str) -> CryptoResult<Self> {
        let digits = hex_str
            .strip_prefix("0x")
            .filter(|digits| {
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
            })
            .ok_or_else(|| CryptoError::InvalidHexString(hex_str.to_owned()))?;
        let value = BigUint::parse_bytes(digits.as_bytes(), 16)
            .ok_or_else(|| CryptoError::InvalidHexString(hex_str.to_owned()))?;
        Self::new(value)
    }

    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// The 32-byte big-endian encoding. The high four bits are always zero since
    /// `FIELD_PRIME < 2^252`.
    pub fn to_bytes_be(&self) -> [u8; FIELD_ELEMENT_BYTES] {
        let digits = self.0.to_bytes_be();
        let mut bytes = [0_u8; FIELD_ELEMENT_BYTES];
        bytes[FIELD_ELEMENT_BYTES - digits.len()..].copy_from_slice(&digits);
        bytes
    }

    pub fn from_bytes_be(bytes: &[u8; FIELD_ELEMENT_BYTES]) -> CryptoResult<Self> {
        Self::new(BigUint::from_bytes_be(bytes))
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn into_biguint(self) -> BigUint {
        self.0
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        // Any u64 is far below FIELD_PRIME.
        Self(BigUint::from(value))
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        Self::from_hex(&hex_str).map_err(D::Error::custom)
    }
}

/// Modular inverse via the extended Euclidean algorithm.
pub fn inv_mod(value: &BigUint, modulus: &BigUint) -> CryptoResult<BigUint> {
    let value_int = value.to_bigint().expect("BigUint to BigInt cannot fail");
    let modulus_int = modulus.to_bigint().expect("BigUint to BigInt cannot fail");
    let gcd = value_int.extended_gcd(&modulus_int);
    if !gcd.gcd.is_one() {
        return Err(CryptoError::NotInvertible(value.clone()));
    }
    let inverse = gcd.x.mod_floor(&modulus_int);
    Ok(inverse.to_biguint().expect("A value reduced modulo a positive modulus is nonnegative"))
}

/// `numerator / denominator` modulo `modulus`.
pub fn div_mod(numerator: &BigUint, denominator: &BigUint, modulus: &BigUint) -> CryptoResult<BigUint> {
    Ok(numerator * inv_mod(denominator, modulus)? % modulus)
}

/// `minuend - subtrahend` modulo `modulus`. Both operands may exceed the modulus.
pub(crate) fn sub_mod(minuend: &BigUint, subtrahend: &BigUint, modulus: &BigUint) -> BigUint {
    ((modulus + minuend % modulus) - subtrahend % modulus) % modulus
}

/// Euler's criterion. Zero counts as a residue (its root is zero).
pub fn is_quad_residue(value: &BigUint, modulus: &BigUint) -> bool {
    if value.is_zero() {
        return true;
    }
    let exponent = (modulus - 1_u8) >> 1;
    value.modpow(&exponent, modulus).is_one()
}

/// Square root modulo an odd prime, via Tonelli-Shanks. Returns `None` for non-residues.
/// The returned root is one of the two; the caller negates as needed.
pub fn sqrt_mod(value: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    if value.is_zero() {
        return Some(BigUint::zero());
    }
    if !is_quad_residue(value, modulus) {
        return None;
    }

    // Factor modulus - 1 as odd_part * 2^two_adicity.
    let mut odd_part: BigUint = modulus - 1_u8;
    let mut two_adicity = 0_u64;
    while odd_part.is_even() {
        odd_part >>= 1;
        two_adicity += 1;
    }

    let non_residue = {
        let mut candidate = BigUint::from(2_u8);
        while is_quad_residue(&candidate, modulus) {
            candidate += 1_u8;
        }
        candidate
    };

    let mut order = two_adicity;
    let mut cofactor = non_residue.modpow(&odd_part, modulus);
    let mut residue = value.modpow(&odd_part, modulus);
    let mut root = value.modpow(&((&odd_part + 1_u8) >> 1), modulus);

    while !residue.is_one() {
        let mut lowest_one = 0_u64;
        let mut square = residue.clone();
        while !square.is_one() {
            square = &square * &square % modulus;
            lowest_one += 1;
        }
        let gap = order - lowest_one - 1;
        let mut adjuster = cofactor;
        for _ in 0..gap {
            adjuster = &adjuster * &adjuster % modulus;
        }
        order = lowest_one;
        cofactor = &adjuster * &adjuster % modulus;
        residue = residue * &cofactor % modulus;
        root = root * adjuster % modulus;
    }
    Some(root)
}
