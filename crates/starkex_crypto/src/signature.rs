//! The StarkEx ECDSA variant.
//!
//! Differences from classic ECDSA, kept bit-for-bit compatible with the STARK-provable AIR
//! verification routine:
//! - `r` is the raw x coordinate of `k * G`, not reduced modulo the curve order;
//! - the second signature component is `w = k / (msg_hash + r * priv)`, not its inverse;
//! - `msg_hash`, `r` and `w` must all be below `2^251`;
//! - verification runs every scalar multiplication through [`mimic_ec_mult`], and any internal
//!   assertion failure means "invalid signature" rather than an error.

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::curve::{ec_add, ec_double, ec_mult, AffinePoint, EC_GEN, MINUS_SHIFT_POINT, SHIFT_POINT};
use crate::field::{div_mod, sqrt_mod, sub_mod, EC_ORDER, FIELD_PRIME};
use crate::{CryptoError, CryptoResult};

#[cfg(test)]
#[path = "signature_test.rs"]
mod signature_test;

/// Signable messages and signature components are bounded by `2^251`.
pub const N_ELEMENT_BITS_ECDSA: u64 = 251;

static ELEMENT_UPPER_BOUND: Lazy<BigUint> = Lazy::new(|| BigUint::one() << N_ELEMENT_BITS_ECDSA);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r: BigUint,
    pub s: BigUint,
}

/// A verification key: either the full curve point or its x coordinate alone, in which case both
/// y candidates are tried.
#[derive(Clone, Debug)]
pub enum PublicKey {
    XOnly(BigUint),
    Point(AffinePoint),
}

/// A possible y coordinate for the given x, such that (x, y) is on the curve. The real
/// y coordinate is either the returned value or its negation.
pub fn get_y_coordinate(x: &BigUint) -> CryptoResult<BigUint> {
    let y_squared =
        (x.modpow(&BigUint::from(3_u8), &FIELD_PRIME) + x + &*crate::curve::BETA) % &*FIELD_PRIME;
    sqrt_mod(&y_squared, &FIELD_PRIME).ok_or(CryptoError::InvalidPublicKey)
}

/// Samples a private key from a cryptographically strong RNG.
pub fn random_private_key() -> BigUint {
    OsRng.gen_biguint_range(&BigUint::one(), &EC_ORDER)
}

pub fn private_key_to_ec_point(private_key: &BigUint) -> CryptoResult<AffinePoint> {
    if private_key.is_zero() || private_key >= &*EC_ORDER {
        return Err(CryptoError::InvalidPrivateKey);
    }
    ec_mult(private_key, &EC_GEN)
}

/// The x coordinate of the public key derived from `private_key`.
pub fn private_to_stark_key(private_key: &BigUint) -> CryptoResult<BigUint> {
    Ok(private_key_to_ec_point(private_key)?.x)
}

/// Computes `scalar * point + shift_point` with exactly the steps of the AIR routine, erroring
/// if and only if the AIR errors: 251 iterations, a collision check before every conditional
/// addition, and a zero remainder at the end.
pub fn mimic_ec_mult(
    scalar: &BigUint,
    point: &AffinePoint,
    shift_point: &AffinePoint,
) -> CryptoResult<AffinePoint> {
    if scalar.is_zero() || scalar >= &*ELEMENT_UPPER_BOUND {
        return Err(CryptoError::ScalarOutOfRange(scalar.clone()));
    }
    let mut partial_sum = shift_point.clone();
    let mut doubled = point.clone();
    let mut remaining = scalar.clone();
    for _ in 0..N_ELEMENT_BITS_ECDSA {
        if partial_sum.x == doubled.x {
            return Err(CryptoError::PointCollision);
        }
        if remaining.bit(0) {
            partial_sum = ec_add(&partial_sum, &doubled)?;
        }
        doubled = ec_double(&doubled)?;
        remaining >>= 1;
    }
    assert!(remaining.is_zero(), "The scalar was checked to fit in {N_ELEMENT_BITS_ECDSA} bits");
    Ok(partial_sum)
}

/// Signs `msg_hash` with a deterministically derived nonce, seeded by the private key, the
/// message and the optional extra entropy. Nonce candidates rejected by the range and collision
/// rules of the scheme are skipped by bumping a counter, so signing always terminates.
///
/// The derivation is a SHA-256 counter construction reduced into `[1, EC_ORDER)`; it is
/// deterministic but not RFC-6979-interoperable.
pub fn sign(
    msg_hash: &BigUint,
    private_key: &BigUint,
    seed: Option<&BigUint>,
) -> CryptoResult<Signature> {
    sign_with_nonces(msg_hash, private_key, deterministic_nonces(private_key, msg_hash, seed))
}

/// Signs `msg_hash` with nonces drawn from a cryptographically strong RNG. Only appropriate when
/// the caller guarantees the same message is never re-signed after a crash.
pub fn sign_random(msg_hash: &BigUint, private_key: &BigUint) -> CryptoResult<Signature> {
    sign_with_nonces(
        msg_hash,
        private_key,
        std::iter::repeat_with(|| OsRng.gen_biguint_range(&BigUint::one(), &EC_ORDER)),
    )
}

fn sign_with_nonces(
    msg_hash: &BigUint,
    private_key: &BigUint,
    nonces: impl Iterator<Item = BigUint>,
) -> CryptoResult<Signature> {
    if msg_hash >= &*ELEMENT_UPPER_BOUND {
        return Err(CryptoError::MessageNotSignable(msg_hash.clone()));
    }
    if private_key.is_zero() || private_key >= &*EC_ORDER {
        return Err(CryptoError::InvalidPrivateKey);
    }

    for nonce in nonces {
        // The same multiplier as the verification path, so both paths agree on every corner
        // case; a collision inside it just means this nonce is unusable.
        let shifted = match mimic_ec_mult(&nonce, &EC_GEN, &SHIFT_POINT) {
            Ok(point) => point,
            Err(_) => continue,
        };
        let Ok(nonce_point) = ec_add(&shifted, &MINUS_SHIFT_POINT) else {
            continue;
        };

        let r = nonce_point.x;
        if r.is_zero() || r >= *ELEMENT_UPPER_BOUND {
            continue;
        }
        let denominator = (msg_hash + &r * private_key) % &*EC_ORDER;
        if denominator.is_zero() {
            continue;
        }
        let s = div_mod(&nonce, &denominator, &EC_ORDER)?;
        if s.is_zero() || s >= *ELEMENT_UPPER_BOUND {
            continue;
        }
        return Ok(Signature { r, s });
    }
    unreachable!("The nonce iterators are infinite")
}

fn deterministic_nonces<'a>(
    private_key: &'a BigUint,
    msg_hash: &'a BigUint,
    seed: Option<&'a BigUint>,
) -> impl Iterator<Item = BigUint> + 'a {
    (0_u64..).map(move |counter| {
        let mut hasher = Sha256::new();
        hasher.update(to_be_bytes_32(private_key));
        hasher.update(to_be_bytes_32(msg_hash));
        if let Some(seed) = seed {
            hasher.update(to_be_bytes_32(seed));
        }
        hasher.update(counter.to_be_bytes());
        let digest = BigUint::from_bytes_be(&hasher.finalize());
        digest % (&*EC_ORDER - 1_u8) + 1_u8
    })
}

fn to_be_bytes_32(value: &BigUint) -> [u8; 32] {
    let digits = value.to_bytes_be();
    assert!(digits.len() <= 32, "Scalars are below 2^256");
    let mut bytes = [0_u8; 32];
    bytes[32 - digits.len()..].copy_from_slice(&digits);
    bytes
}

/// Verifies a signature. Malformed arguments (components out of range, a public-key point off
/// the curve) are errors; every failure *internal* to the scheme maps to `Ok(false)`.
pub fn verify(
    msg_hash: &BigUint,
    r: &BigUint,
    s: &BigUint,
    public_key: &PublicKey,
) -> CryptoResult<bool> {
    if msg_hash >= &*ELEMENT_UPPER_BOUND {
        return Err(CryptoError::SignatureOutOfRange { name: "msg_hash", value: msg_hash.clone() });
    }
    if r.is_zero() || r >= &*ELEMENT_UPPER_BOUND {
        return Err(CryptoError::SignatureOutOfRange { name: "r", value: r.clone() });
    }
    if s.is_zero() || s >= &*ELEMENT_UPPER_BOUND {
        return Err(CryptoError::SignatureOutOfRange { name: "s", value: s.clone() });
    }

    match public_key {
        PublicKey::XOnly(x) => {
            let y = match get_y_coordinate(x) {
                Ok(y) => y,
                // The x coordinate does not name a curve point.
                Err(CryptoError::InvalidPublicKey) => return Ok(false),
                Err(other) => return Err(other),
            };
            let candidate = AffinePoint { x: x.clone(), y: y.clone() };
            let negated = AffinePoint { x: x.clone(), y: sub_mod(&BigUint::zero(), &y, &FIELD_PRIME) };
            Ok(verify_with_point(msg_hash, r, s, &candidate) || verify_with_point(msg_hash, r, s, &negated))
        }
        PublicKey::Point(point) => {
            if !point.is_on_curve() {
                return Err(CryptoError::PointNotOnCurve { x: point.x.clone(), y: point.y.clone() });
            }
            Ok(verify_with_point(msg_hash, r, s, point))
        }
    }
}

/// The AIR verification equation `w * (msg_hash * G + r * Q)`, shifted at every step. Computed as
/// one formula rather than the classic two-term sum so that it errors exactly when the AIR does.
fn verify_with_point(msg_hash: &BigUint, r: &BigUint, s: &BigUint, public_key: &AffinePoint) -> bool {
    let result: CryptoResult<BigUint> = (|| {
        let zg = mimic_ec_mult(msg_hash, &EC_GEN, &MINUS_SHIFT_POINT)?;
        let rq = mimic_ec_mult(r, public_key, &SHIFT_POINT)?;
        let wb = mimic_ec_mult(s, &ec_add(&zg, &rq)?, &SHIFT_POINT)?;
        Ok(ec_add(&wb, &MINUS_SHIFT_POINT)?.x)
    })();
    match result {
        Ok(x) => *r == x,
        Err(_) => false,
    }
}
