//! Base field `Fp` and its quadratic extension `Fp2 = Fp[u]/(u² + 1)`.
//!
//! The `bls12_381` crate keeps its field types private, so hash-to-curve and the
//! on-chain verifier do their coordinate arithmetic here. Nothing in this module
//! touches secret data, so plain big-integer arithmetic is fine.

use crate::constants::{FP_SIZE, MODULUS, PADDED_FP_SIZE};
use crate::error::{BlsError, BlsResult};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

static P: Lazy<BigUint> = Lazy::new(|| BigUint::from_bytes_be(&MODULUS));

/// (p + 1) / 4, the square-root exponent since p ≡ 3 (mod 4)
static P_PLUS_1_DIV_4: Lazy<BigUint> = Lazy::new(|| (&*P + 1u32) >> 2usize);

/// (p - 1) / 2, Euler's criterion exponent
static P_MINUS_1_DIV_2: Lazy<BigUint> = Lazy::new(|| (&*P - 1u32) >> 1usize);

/// p - 2, the Fermat inversion exponent
static P_MINUS_2: Lazy<BigUint> = Lazy::new(|| &*P - 2u32);

/// An element of the BLS12-381 base field, always reduced.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Fp(BigUint);

impl Fp {
    /// The field modulus p
    pub fn modulus() -> &'static BigUint {
        &P
    }

    /// (p + 1) / 4
    pub fn sqrt_exponent() -> &'static BigUint {
        &P_PLUS_1_DIV_4
    }

    /// (p - 1) / 2
    pub fn legendre_exponent() -> &'static BigUint {
        &P_MINUS_1_DIV_2
    }

    /// p - 2
    pub fn inversion_exponent() -> &'static BigUint {
        &P_MINUS_2
    }

    pub fn zero() -> Self {
        Fp(BigUint::zero())
    }

    pub fn one() -> Self {
        Fp(BigUint::one())
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_biguint(BigUint::from(value))
    }

    /// Reduces an arbitrary integer modulo p
    pub fn from_biguint(value: BigUint) -> Self {
        if value < *P {
            Fp(value)
        } else {
            Fp(value % &*P)
        }
    }

    /// Interprets big-endian bytes of any length and reduces modulo p (OS2IP mod p)
    pub fn from_be_bytes_reduced(bytes: &[u8]) -> Self {
        Self::from_biguint(BigUint::from_bytes_be(bytes))
    }

    /// Decodes a canonical 48-byte big-endian element, rejecting values `>= p`
    pub fn from_bytes(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != FP_SIZE {
            return Err(BlsError::InvalidLength {
                what: "field element",
                expected: FP_SIZE,
                actual: bytes.len(),
            });
        }
        let value = BigUint::from_bytes_be(bytes);
        if value >= *P {
            return Err(BlsError::invalid_encoding(
                "field element is not reduced modulo p",
            ));
        }
        Ok(Fp(value))
    }

    /// Canonical 48-byte big-endian encoding
    pub fn to_bytes(&self) -> [u8; FP_SIZE] {
        let raw = self.0.to_bytes_be();
        let mut out = [0u8; FP_SIZE];
        out[FP_SIZE - raw.len()..].copy_from_slice(&raw);
        out
    }

    /// Decodes the EIP-2537 64-byte form: 16 zero bytes followed by a canonical element
    pub fn from_padded_bytes(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != PADDED_FP_SIZE {
            return Err(BlsError::InvalidLength {
                what: "padded field element",
                expected: PADDED_FP_SIZE,
                actual: bytes.len(),
            });
        }
        let (padding, value) = bytes.split_at(PADDED_FP_SIZE - FP_SIZE);
        if padding.iter().any(|b| *b != 0) {
            return Err(BlsError::invalid_encoding(
                "non-zero padding in field element",
            ));
        }
        Self::from_bytes(value)
    }

    /// EIP-2537 64-byte encoding
    pub fn to_padded_bytes(&self) -> [u8; PADDED_FP_SIZE] {
        let mut out = [0u8; PADDED_FP_SIZE];
        out[PADDED_FP_SIZE - FP_SIZE..].copy_from_slice(&self.to_bytes());
        out
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    pub fn square(&self) -> Self {
        self * self
    }

    pub fn double(&self) -> Self {
        self + self
    }

    pub fn pow(&self, exp: &BigUint) -> Self {
        Fp(self.0.modpow(exp, &P))
    }

    /// Multiplicative inverse; zero has none
    pub fn invert(&self) -> BlsResult<Self> {
        if self.is_zero() {
            return Err(BlsError::ZeroInversion);
        }
        Ok(self.pow(&P_MINUS_2))
    }

    /// Square root, if one exists
    pub fn sqrt(&self) -> Option<Self> {
        let root = self.pow(&P_PLUS_1_DIV_4);
        (root.square() == *self).then_some(root)
    }

    /// Euler's criterion; zero counts as a square
    pub fn is_square(&self) -> bool {
        self.is_zero() || self.pow(&P_MINUS_1_DIV_2).is_one()
    }

    /// RFC 9380 sign: the parity of the canonical representative
    pub fn sgn0(&self) -> bool {
        self.0.bit(0)
    }

    /// True if `self > (p - 1) / 2`, the sign convention of compressed points
    pub fn lexicographically_largest(&self) -> bool {
        self.0 > *P_MINUS_1_DIV_2
    }
}

impl fmt::Debug for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fp(0x{})", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes()))
    }
}

impl<'a> Add<&'a Fp> for &'a Fp {
    type Output = Fp;

    fn add(self, rhs: &'a Fp) -> Fp {
        Fp::from_biguint(&self.0 + &rhs.0)
    }
}

impl<'a> Sub<&'a Fp> for &'a Fp {
    type Output = Fp;

    fn sub(self, rhs: &'a Fp) -> Fp {
        if self.0 >= rhs.0 {
            Fp(&self.0 - &rhs.0)
        } else {
            Fp(&*P - (&rhs.0 - &self.0))
        }
    }
}

impl<'a> Mul<&'a Fp> for &'a Fp {
    type Output = Fp;

    fn mul(self, rhs: &'a Fp) -> Fp {
        Fp::from_biguint(&self.0 * &rhs.0)
    }
}

impl<'a> Neg for &'a Fp {
    type Output = Fp;

    fn neg(self) -> Fp {
        if self.is_zero() {
            Fp::zero()
        } else {
            Fp(&*P - &self.0)
        }
    }
}

impl Neg for Fp {
    type Output = Fp;

    fn neg(self) -> Fp {
        -&self
    }
}

macro_rules! forward_owned_binop {
    ($field:ty, $trait:ident, $method:ident) => {
        impl $trait<$field> for $field {
            type Output = $field;

            fn $method(self, rhs: $field) -> $field {
                (&self).$method(&rhs)
            }
        }

        impl<'a> $trait<&'a $field> for $field {
            type Output = $field;

            fn $method(self, rhs: &'a $field) -> $field {
                (&self).$method(rhs)
            }
        }
    };
}

forward_owned_binop!(Fp, Add, add);
forward_owned_binop!(Fp, Sub, sub);
forward_owned_binop!(Fp, Mul, mul);

/// An element `c0 + c1·u` of Fp2.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Fp2 {
    pub c0: Fp,
    pub c1: Fp,
}

impl Fp2 {
    pub fn new(c0: Fp, c1: Fp) -> Self {
        Self { c0, c1 }
    }

    pub fn zero() -> Self {
        Self::new(Fp::zero(), Fp::zero())
    }

    pub fn one() -> Self {
        Self::new(Fp::one(), Fp::zero())
    }

    /// Embeds a base field element
    pub fn from_fp(c0: Fp) -> Self {
        Self::new(c0, Fp::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.c0.is_zero() && self.c1.is_zero()
    }

    pub fn square(&self) -> Self {
        self * self
    }

    pub fn double(&self) -> Self {
        self + self
    }

    pub fn conjugate(&self) -> Self {
        Self::new(self.c0.clone(), -&self.c1)
    }

    /// Norm down to Fp: `c0² + c1²`
    pub fn norm(&self) -> Fp {
        &self.c0.square() + &self.c1.square()
    }

    pub fn mul_by_fp(&self, k: &Fp) -> Self {
        Self::new(&self.c0 * k, &self.c1 * k)
    }

    pub fn pow(&self, exp: &BigUint) -> Self {
        let mut result = Fp2::one();
        for i in (0..exp.bits()).rev() {
            result = result.square();
            if exp.bit(i) {
                result = &result * self;
            }
        }
        result
    }

    pub fn invert(&self) -> BlsResult<Self> {
        let norm_inv = self.norm().invert()?;
        Ok(self.conjugate().mul_by_fp(&norm_inv))
    }

    /// An element of Fp2 is a square exactly when its norm is a square in Fp
    pub fn is_square(&self) -> bool {
        self.norm().is_square()
    }

    /// Square root via the norm, if one exists.
    pub fn sqrt(&self) -> Option<Self> {
        let candidate = if self.c1.is_zero() {
            match self.c0.sqrt() {
                Some(root) => Fp2::from_fp(root),
                // (b·u)² = -b², so a non-square c0 has root sqrt(-c0)·u
                None => Fp2::new(Fp::zero(), (-&self.c0).sqrt()?),
            }
        } else {
            let gamma = self.norm().sqrt()?;
            let two_inv = Fp::from_u64(2).invert().ok()?;
            let mut delta = &(&self.c0 + &gamma) * &two_inv;
            if !delta.is_square() {
                delta = &(&self.c0 - &gamma) * &two_inv;
            }
            let x0 = delta.sqrt()?;
            let x1 = &self.c1 * &x0.double().invert().ok()?;
            Fp2::new(x0, x1)
        };
        (candidate.square() == *self).then_some(candidate)
    }

    /// RFC 9380 `sgn0` for m = 2
    pub fn sgn0(&self) -> bool {
        let sign_0 = self.c0.sgn0();
        let zero_0 = self.c0.is_zero();
        let sign_1 = self.c1.sgn0();
        sign_0 || (zero_0 && sign_1)
    }

    /// Sign convention of compressed G2 points: compare c1 first, then c0
    pub fn lexicographically_largest(&self) -> bool {
        self.c1.lexicographically_largest()
            || (self.c1.is_zero() && self.c0.lexicographically_largest())
    }

    /// Decodes `c1 || c0`, the order used by compressed G2 points
    pub fn from_bytes(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != 2 * FP_SIZE {
            return Err(BlsError::InvalidLength {
                what: "Fp2 element",
                expected: 2 * FP_SIZE,
                actual: bytes.len(),
            });
        }
        let c1 = Fp::from_bytes(&bytes[..FP_SIZE])?;
        let c0 = Fp::from_bytes(&bytes[FP_SIZE..])?;
        Ok(Self::new(c0, c1))
    }

    /// Encodes as `c1 || c0`
    pub fn to_bytes(&self) -> [u8; 2 * FP_SIZE] {
        let mut out = [0u8; 2 * FP_SIZE];
        out[..FP_SIZE].copy_from_slice(&self.c1.to_bytes());
        out[FP_SIZE..].copy_from_slice(&self.c0.to_bytes());
        out
    }

    /// Decodes the EIP-2537 form `pad(c0) || pad(c1)`
    pub fn from_padded_bytes(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != 2 * PADDED_FP_SIZE {
            return Err(BlsError::InvalidLength {
                what: "padded Fp2 element",
                expected: 2 * PADDED_FP_SIZE,
                actual: bytes.len(),
            });
        }
        let c0 = Fp::from_padded_bytes(&bytes[..PADDED_FP_SIZE])?;
        let c1 = Fp::from_padded_bytes(&bytes[PADDED_FP_SIZE..])?;
        Ok(Self::new(c0, c1))
    }

    /// EIP-2537 encoding `pad(c0) || pad(c1)`
    pub fn to_padded_bytes(&self) -> [u8; 2 * PADDED_FP_SIZE] {
        let mut out = [0u8; 2 * PADDED_FP_SIZE];
        out[..PADDED_FP_SIZE].copy_from_slice(&self.c0.to_padded_bytes());
        out[PADDED_FP_SIZE..].copy_from_slice(&self.c1.to_padded_bytes());
        out
    }
}

impl fmt::Debug for Fp2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fp2({:?} + {:?}·u)", self.c0, self.c1)
    }
}

impl<'a> Add<&'a Fp2> for &'a Fp2 {
    type Output = Fp2;

    fn add(self, rhs: &'a Fp2) -> Fp2 {
        Fp2::new(&self.c0 + &rhs.c0, &self.c1 + &rhs.c1)
    }
}

impl<'a> Sub<&'a Fp2> for &'a Fp2 {
    type Output = Fp2;

    fn sub(self, rhs: &'a Fp2) -> Fp2 {
        Fp2::new(&self.c0 - &rhs.c0, &self.c1 - &rhs.c1)
    }
}

impl<'a> Mul<&'a Fp2> for &'a Fp2 {
    type Output = Fp2;

    fn mul(self, rhs: &'a Fp2) -> Fp2 {
        // (a0 + a1·u)(b0 + b1·u) = (a0b0 - a1b1) + (a0b1 + a1b0)·u
        let c0 = &(&self.c0 * &rhs.c0) - &(&self.c1 * &rhs.c1);
        let c1 = &(&self.c0 * &rhs.c1) + &(&self.c1 * &rhs.c0);
        Fp2::new(c0, c1)
    }
}

impl<'a> Neg for &'a Fp2 {
    type Output = Fp2;

    fn neg(self) -> Fp2 {
        Fp2::new(-&self.c0, -&self.c1)
    }
}

impl Neg for Fp2 {
    type Output = Fp2;

    fn neg(self) -> Fp2 {
        -&self
    }
}

forward_owned_binop!(Fp2, Add, add);
forward_owned_binop!(Fp2, Sub, sub);
forward_owned_binop!(Fp2, Mul, mul);
