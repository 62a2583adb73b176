//! Cryptographic primitives of the StarkEx data-availability committee: arithmetic over the
//! STARK-friendly prime field and curve, the Pedersen hash used as the Merkle node hash, and the
//! ECDSA variant whose verification mimics the STARK-provable AIR routine.

use num_bigint::BigUint;

pub mod curve;
pub mod field;
pub mod pedersen;
pub mod signature;

pub use field::FieldElement;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Value {0:#x} is out of range for a field element.")]
    ValueOutOfRange(BigUint),
    #[error("Expected a 0x-prefixed lowercase hex string, got: {0:?}.")]
    InvalidHexString(String),
    #[error("Given x coordinate does not represent any point on the elliptic curve.")]
    InvalidPublicKey,
    #[error("Point ({x:#x}, {y:#x}) is not on the curve.")]
    PointNotOnCurve { x: BigUint, y: BigUint },
    #[error("Points with equal x coordinates cannot be added.")]
    PointCollision,
    #[error("Value {0:#x} has no inverse modulo the given modulus.")]
    NotInvertible(BigUint),
    #[error("Scalar {0:#x} is out of range for the AIR scalar multiplier.")]
    ScalarOutOfRange(BigUint),
    #[error("Message hash {0:#x} is not signable.")]
    MessageNotSignable(BigUint),
    #[error("Private key is out of range.")]
    InvalidPrivateKey,
    #[error("Signature component {name} = {value:#x} is out of range.")]
    SignatureOutOfRange { name: &'static str, value: BigUint },
    #[error("Unhashable input.")]
    UnhashableInput,
}

pub type CryptoResult<T> = Result<T, CryptoError>;
