//! Short-Weierstrass curve `y^2 = x^3 + ALPHA * x + BETA` over the STARK prime field.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use once_cell::sync::Lazy;

use crate::field::{biguint_from_hex, div_mod, sub_mod, FIELD_PRIME};
use crate::{CryptoError, CryptoResult};

#[cfg(test)]
#[path = "curve_test.rs"]
mod curve_test;

pub static ALPHA: Lazy<BigUint> = Lazy::new(BigUint::one);

pub static BETA: Lazy<BigUint> = Lazy::new(|| {
    biguint_from_hex("6f21413efbe40de150e596d72f7a8c5609ad26c15c915c1f4cdfcb99cee9e89")
});

/// Generator of the signature subgroup.
pub static EC_GEN: Lazy<AffinePoint> = Lazy::new(|| AffinePoint {
    x: biguint_from_hex("1ef15c18599971b7beced415a40f0c7deacfd9b0d1819e03d723d8bc943cfca"),
    y: biguint_from_hex("5668060aa49730b7be4801df46ec62de53ecd11abe43a32873000c36e8dc1f"),
});

/// The point added at the start of hash and signature scalar-multiplications, making the
/// "partial sum equals target" edge case unreachable with overwhelming probability.
pub static SHIFT_POINT: Lazy<AffinePoint> = Lazy::new(|| AffinePoint {
    x: biguint_from_hex("49ee3eba8c1600700ee1b87eb599f16716b0b1022947733551fde4050ca6804"),
    y: biguint_from_hex("3ca0cfe4b3bc6ddf346d49d06ea0ed34e621062c0e056c1d0405d266e10268a"),
});

pub static MINUS_SHIFT_POINT: Lazy<AffinePoint> = Lazy::new(|| SHIFT_POINT.neg());

/// A curve point. The point at infinity is deliberately not representable; the arithmetic below
/// is structured so it never comes up, and the degenerate additions surface as errors instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AffinePoint {
    pub x: BigUint,
    pub y: BigUint,
}

impl AffinePoint {
    pub fn new(x: BigUint, y: BigUint) -> CryptoResult<Self> {
        let point = Self { x, y };
        if !point.is_on_curve() {
            return Err(CryptoError::PointNotOnCurve { x: point.x, y: point.y });
        }
        Ok(point)
    }

    pub fn is_on_curve(&self) -> bool {
        let lhs = &self.y * &self.y % &*FIELD_PRIME;
        let rhs =
            (self.x.modpow(&BigUint::from(3_u8), &FIELD_PRIME) + &*ALPHA * &self.x + &*BETA) % &*FIELD_PRIME;
        lhs == rhs
    }

    pub fn neg(&self) -> Self {
        Self { x: self.x.clone(), y: sub_mod(&BigUint::zero(), &self.y, &FIELD_PRIME) }
    }
}

/// Adds two distinct points. Returns `PointCollision` when `lhs.x == rhs.x`; callers decide
/// whether that means doubling, the point at infinity, or a failed verification.
pub fn ec_add(lhs: &AffinePoint, rhs: &AffinePoint) -> CryptoResult<AffinePoint> {
    if lhs.x == rhs.x {
        return Err(CryptoError::PointCollision);
    }
    let slope = div_mod(
        &sub_mod(&lhs.y, &rhs.y, &FIELD_PRIME),
        &sub_mod(&lhs.x, &rhs.x, &FIELD_PRIME),
        &FIELD_PRIME,
    )?;
    let x = sub_mod(&(&slope * &slope % &*FIELD_PRIME), &(&lhs.x + &rhs.x), &FIELD_PRIME);
    let y = sub_mod(&(slope * sub_mod(&lhs.x, &x, &FIELD_PRIME) % &*FIELD_PRIME), &lhs.y, &FIELD_PRIME);
    Ok(AffinePoint { x, y })
}

pub fn ec_double(point: &AffinePoint) -> CryptoResult<AffinePoint> {
    // A point with y == 0 would double to infinity; it cannot lie on a subgroup of odd order.
    let slope = div_mod(
        &((BigUint::from(3_u8) * &point.x * &point.x + &*ALPHA) % &*FIELD_PRIME),
        &((BigUint::from(2_u8) * &point.y) % &*FIELD_PRIME),
        &FIELD_PRIME,
    )?;
    let x = sub_mod(&(&slope * &slope % &*FIELD_PRIME), &(BigUint::from(2_u8) * &point.x), &FIELD_PRIME);
    let y = sub_mod(&(slope * sub_mod(&point.x, &x, &FIELD_PRIME) % &*FIELD_PRIME), &point.y, &FIELD_PRIME);
    Ok(AffinePoint { x, y })
}

/// Scalar multiplication by `scalar >= 1`. The recursion bottoms out at the point itself, so no
/// intermediate ever needs the point at infinity.
pub fn ec_mult(scalar: &BigUint, point: &AffinePoint) -> CryptoResult<AffinePoint> {
    if scalar.is_zero() {
        return Err(CryptoError::ScalarOutOfRange(scalar.clone()));
    }
    if scalar.is_one() {
        return Ok(point.clone());
    }
    if scalar.is_even() {
        return ec_mult(&(scalar >> 1), &ec_double(point)?);
    }
    ec_add(&ec_mult(&(scalar - 1_u8), point)?, point)
}
