use num_bigint::BigUint;
use pretty_assertions::assert_eq;

use super::{ec_add, ec_double, ec_mult, AffinePoint, EC_GEN, MINUS_SHIFT_POINT, SHIFT_POINT};
use crate::field::EC_ORDER;
use crate::CryptoError;

#[test]
fn fixed_points_are_on_the_curve() {
    assert!(EC_GEN.is_on_curve());
    assert!(SHIFT_POINT.is_on_curve());
    assert!(MINUS_SHIFT_POINT.is_on_curve());
}

#[test]
fn point_construction_rejects_off_curve_points() {
    assert!(matches!(
        AffinePoint::new(EC_GEN.x.clone(), EC_GEN.x.clone()),
        Err(CryptoError::PointNotOnCurve { .. })
    ));
    assert_eq!(AffinePoint::new(EC_GEN.x.clone(), EC_GEN.y.clone()).unwrap(), *EC_GEN);
}

#[test]
fn multiplication_matches_repeated_addition() {
    let double = ec_double(&EC_GEN).unwrap();
    assert!(double.is_on_curve());
    assert_eq!(ec_mult(&BigUint::from(2_u8), &EC_GEN).unwrap(), double);

    let triple = ec_add(&double, &EC_GEN).unwrap();
    assert_eq!(ec_mult(&BigUint::from(3_u8), &EC_GEN).unwrap(), triple);

    let mut accumulated = EC_GEN.clone();
    for _ in 0..9 {
        accumulated = ec_add(&accumulated, &EC_GEN).unwrap();
    }
    assert_eq!(ec_mult(&BigUint::from(10_u8), &EC_GEN).unwrap(), accumulated);
}

#[test]
fn addition_of_points_with_equal_x_is_rejected() {
    assert!(matches!(ec_add(&EC_GEN, &EC_GEN), Err(CryptoError::PointCollision)));
    assert!(matches!(ec_add(&EC_GEN, &EC_GEN.neg()), Err(CryptoError::PointCollision)));
}

#[test]
fn generator_has_the_published_order() {
    // (EC_ORDER - 1) * G is the negation of G, so completing the multiplication to EC_ORDER
    // degenerates into an equal-x addition.
    let almost_full_cycle = ec_mult(&(&*EC_ORDER - 1_u8), &EC_GEN).unwrap();
    assert_eq!(almost_full_cycle, EC_GEN.neg());
    assert!(matches!(ec_mult(&EC_ORDER, &EC_GEN), Err(CryptoError::PointCollision)));
}

#[test]
fn zero_scalar_is_rejected() {
    assert!(matches!(
        ec_mult(&BigUint::from(0_u8), &EC_GEN),
        Err(CryptoError::ScalarOutOfRange(_))
    ));
}
