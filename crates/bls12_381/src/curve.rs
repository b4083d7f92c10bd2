//! G1 and G2 point types, encodings and pairings.
//!
//! Group arithmetic and the pairing come from the `bls12_381` crate; this module
//! adds the encodings the signature scheme and the EIP-2537 precompiles need,
//! distinguishes decoding failures, and provides a constant-time scalar
//! multiplication for secret scalars.

use crate::constants::{
    COMPRESSION_FLAG, FLAG_MASK, FP_SIZE, G1_UNCOMPRESSED_SIZE, G2_UNCOMPRESSED_SIZE,
    INFINITY_FLAG, PADDED_FP_SIZE, PADDED_G1_SIZE, PADDED_G2_SIZE, PUBLIC_KEY_SIZE,
    SIGNATURE_SIZE, SIGN_FLAG,
};
use crate::error::{BlsError, BlsResult};
use crate::field::{Fp, Fp2};
use bls12_381::{
    multi_miller_loop, G1Affine, G1Projective, G2Affine, G2Prepared, G2Projective, Gt, Scalar,
};
use group::{Curve, Group};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use subtle::{Choice, ConditionallySelectable};

/// Left-to-right double-and-add over all 256 bits of `scalar`.
///
/// Every bit costs one doubling, one addition and one conditional select, so
/// neither the control flow nor the memory access pattern depends on the scalar.
fn double_and_add<T>(base: &T, scalar: &Scalar) -> T
where
    T: Group + ConditionallySelectable,
{
    // little-endian
    let bytes = scalar.to_bytes();
    let mut acc = T::identity();
    for byte in bytes.iter().rev() {
        for i in (0..8u8).rev() {
            acc = acc.double();
            let sum = acc + base;
            let bit = Choice::from((byte >> i) & 1);
            acc = T::conditional_select(&acc, &sum, bit);
        }
    }
    acc
}

/// Splits the flag bits off the first byte of a compressed encoding.
///
/// Returns `None` for a canonical point at infinity and `Some(is_largest)`
/// otherwise, rejecting every other flag combination.
fn parse_compressed_flags(bytes: &[u8]) -> BlsResult<Option<bool>> {
    let flags = bytes[0] & FLAG_MASK;
    if flags & COMPRESSION_FLAG == 0 {
        return Err(BlsError::invalid_encoding("compression flag is not set"));
    }
    if flags & INFINITY_FLAG != 0 {
        let clean = flags & SIGN_FLAG == 0
            && bytes[0] & !FLAG_MASK == 0
            && bytes[1..].iter().all(|b| *b == 0);
        if !clean {
            return Err(BlsError::invalid_encoding(
                "non-canonical encoding of the point at infinity",
            ));
        }
        return Ok(None);
    }
    Ok(Some(flags & SIGN_FLAG != 0))
}

fn x_without_flags(bytes: &[u8]) -> Vec<u8> {
    let mut x = bytes.to_vec();
    x[0] &= !FLAG_MASK;
    x
}

/// Right-hand side of the G1 curve equation `y² = x³ + 4`
pub fn g1_curve_rhs(x: &Fp) -> Fp {
    &(&x.square() * x) + &Fp::from_u64(4)
}

/// Right-hand side of the G2 curve equation `y² = x³ + 4(1 + u)`
pub fn g2_curve_rhs(x: &Fp2) -> Fp2 {
    let b = Fp2::new(Fp::from_u64(4), Fp::from_u64(4));
    &(&x.square() * x) + &b
}

/// A point of the prime-order subgroup G1 (or, before validation, of E1).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct G1Point(G1Projective);

impl G1Point {
    pub fn identity() -> Self {
        G1Point(G1Projective::identity())
    }

    pub fn generator() -> Self {
        G1Point(G1Projective::generator())
    }

    pub fn from_projective(point: G1Projective) -> Self {
        G1Point(point)
    }

    pub fn inner(&self) -> &G1Projective {
        &self.0
    }

    pub fn to_affine(&self) -> G1Affine {
        self.0.to_affine()
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_identity().into()
    }

    pub fn is_on_curve(&self) -> bool {
        self.0.is_on_curve().into()
    }

    /// Subgroup membership check
    pub fn is_torsion_free(&self) -> bool {
        self.to_affine().is_torsion_free().into()
    }

    pub fn double(&self) -> Self {
        G1Point(self.0.double())
    }

    /// Constant-time multiplication, for secret scalars
    pub fn mul_secret(&self, scalar: &Scalar) -> Self {
        G1Point(double_and_add(&self.0, scalar))
    }

    /// Decodes a 48-byte compressed point and checks subgroup membership.
    pub fn from_compressed(bytes: &[u8]) -> BlsResult<Self> {
        let point = Self::from_compressed_unchecked(bytes)?;
        if !point.is_torsion_free() {
            return Err(BlsError::NotInSubgroup);
        }
        Ok(point)
    }

    /// Decodes a 48-byte compressed point without the subgroup check.
    pub fn from_compressed_unchecked(bytes: &[u8]) -> BlsResult<Self> {
        let array: [u8; PUBLIC_KEY_SIZE] =
            bytes.try_into().map_err(|_| BlsError::InvalidLength {
                what: "compressed G1 point",
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            })?;
        if parse_compressed_flags(&array)?.is_none() {
            return Ok(Self::identity());
        }
        Fp::from_bytes(&x_without_flags(&array))?;
        Option::<G1Affine>::from(G1Affine::from_compressed_unchecked(&array))
            .map(|affine| G1Point(affine.into()))
            .ok_or(BlsError::NotOnCurve)
    }

    pub fn to_compressed(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.to_affine().to_compressed()
    }

    /// Decodes a 96-byte uncompressed point with full validation.
    pub fn from_uncompressed(bytes: &[u8]) -> BlsResult<Self> {
        let array: [u8; G1_UNCOMPRESSED_SIZE] =
            bytes.try_into().map_err(|_| BlsError::InvalidLength {
                what: "uncompressed G1 point",
                expected: G1_UNCOMPRESSED_SIZE,
                actual: bytes.len(),
            })?;
        let affine = Option::<G1Affine>::from(G1Affine::from_uncompressed_unchecked(&array))
            .ok_or_else(|| BlsError::invalid_encoding("malformed uncompressed G1 point"))?;
        let point = G1Point(affine.into());
        if !point.is_on_curve() {
            return Err(BlsError::NotOnCurve);
        }
        if !point.is_torsion_free() {
            return Err(BlsError::NotInSubgroup);
        }
        Ok(point)
    }

    pub fn to_uncompressed(&self) -> [u8; G1_UNCOMPRESSED_SIZE] {
        self.to_affine().to_uncompressed()
    }

    /// Builds a point from affine coordinates, checking the curve equation only
    pub fn from_affine_coordinates(x: &Fp, y: &Fp) -> BlsResult<Self> {
        let mut bytes = [0u8; G1_UNCOMPRESSED_SIZE];
        bytes[..FP_SIZE].copy_from_slice(&x.to_bytes());
        bytes[FP_SIZE..].copy_from_slice(&y.to_bytes());
        let affine = Option::<G1Affine>::from(G1Affine::from_uncompressed_unchecked(&bytes))
            .ok_or_else(|| BlsError::invalid_encoding("malformed G1 coordinates"))?;
        if !bool::from(affine.is_on_curve()) {
            return Err(BlsError::NotOnCurve);
        }
        Ok(G1Point(affine.into()))
    }

    /// Affine coordinates, `None` for the identity
    pub fn to_affine_coordinates(&self) -> Option<(Fp, Fp)> {
        if self.is_identity() {
            return None;
        }
        let bytes = self.to_uncompressed();
        Some((
            Fp::from_be_bytes_reduced(&bytes[..FP_SIZE]),
            Fp::from_be_bytes_reduced(&bytes[FP_SIZE..]),
        ))
    }

    /// EIP-2537 encoding; the identity is all zeros
    pub fn to_padded(&self) -> [u8; PADDED_G1_SIZE] {
        let mut out = [0u8; PADDED_G1_SIZE];
        if let Some((x, y)) = self.to_affine_coordinates() {
            out[..PADDED_FP_SIZE].copy_from_slice(&x.to_padded_bytes());
            out[PADDED_FP_SIZE..].copy_from_slice(&y.to_padded_bytes());
        }
        out
    }

    /// Decodes the EIP-2537 encoding; checks the curve equation but not the subgroup
    pub fn from_padded(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != PADDED_G1_SIZE {
            return Err(BlsError::InvalidLength {
                what: "padded G1 point",
                expected: PADDED_G1_SIZE,
                actual: bytes.len(),
            });
        }
        let x = Fp::from_padded_bytes(&bytes[..PADDED_FP_SIZE])?;
        let y = Fp::from_padded_bytes(&bytes[PADDED_FP_SIZE..])?;
        if x.is_zero() && y.is_zero() {
            return Ok(Self::identity());
        }
        Self::from_affine_coordinates(&x, &y)
    }
}

/// A point of the prime-order subgroup G2 (or, before validation, of E2).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct G2Point(G2Projective);

impl G2Point {
    pub fn identity() -> Self {
        G2Point(G2Projective::identity())
    }

    pub fn generator() -> Self {
        G2Point(G2Projective::generator())
    }

    pub fn from_projective(point: G2Projective) -> Self {
        G2Point(point)
    }

    pub fn inner(&self) -> &G2Projective {
        &self.0
    }

    pub fn to_affine(&self) -> G2Affine {
        self.0.to_affine()
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_identity().into()
    }

    pub fn is_on_curve(&self) -> bool {
        self.0.is_on_curve().into()
    }

    pub fn is_torsion_free(&self) -> bool {
        self.to_affine().is_torsion_free().into()
    }

    pub fn double(&self) -> Self {
        G2Point(self.0.double())
    }

    /// Multiplies by the effective cofactor h_eff, landing in G2
    pub fn clear_cofactor(&self) -> Self {
        G2Point(self.0.clear_cofactor())
    }

    /// Constant-time multiplication, for secret scalars
    pub fn mul_secret(&self, scalar: &Scalar) -> Self {
        G2Point(double_and_add(&self.0, scalar))
    }

    /// Decodes a 96-byte compressed point and checks subgroup membership.
    pub fn from_compressed(bytes: &[u8]) -> BlsResult<Self> {
        let point = Self::from_compressed_unchecked(bytes)?;
        if !point.is_torsion_free() {
            return Err(BlsError::NotInSubgroup);
        }
        Ok(point)
    }

    /// Decodes a 96-byte compressed point without the subgroup check.
    pub fn from_compressed_unchecked(bytes: &[u8]) -> BlsResult<Self> {
        let array: [u8; SIGNATURE_SIZE] =
            bytes.try_into().map_err(|_| BlsError::InvalidLength {
                what: "compressed G2 point",
                expected: SIGNATURE_SIZE,
                actual: bytes.len(),
            })?;
        if parse_compressed_flags(&array)?.is_none() {
            return Ok(Self::identity());
        }
        Fp2::from_bytes(&x_without_flags(&array))?;
        Option::<G2Affine>::from(G2Affine::from_compressed_unchecked(&array))
            .map(|affine| G2Point(affine.into()))
            .ok_or(BlsError::NotOnCurve)
    }

    pub fn to_compressed(&self) -> [u8; SIGNATURE_SIZE] {
        self.to_affine().to_compressed()
    }

    /// Decodes a 192-byte uncompressed point with full validation.
    pub fn from_uncompressed(bytes: &[u8]) -> BlsResult<Self> {
        let array: [u8; G2_UNCOMPRESSED_SIZE] =
            bytes.try_into().map_err(|_| BlsError::InvalidLength {
                what: "uncompressed G2 point",
                expected: G2_UNCOMPRESSED_SIZE,
                actual: bytes.len(),
            })?;
        let affine = Option::<G2Affine>::from(G2Affine::from_uncompressed_unchecked(&array))
            .ok_or_else(|| BlsError::invalid_encoding("malformed uncompressed G2 point"))?;
        let point = G2Point(affine.into());
        if !point.is_on_curve() {
            return Err(BlsError::NotOnCurve);
        }
        if !point.is_torsion_free() {
            return Err(BlsError::NotInSubgroup);
        }
        Ok(point)
    }

    pub fn to_uncompressed(&self) -> [u8; G2_UNCOMPRESSED_SIZE] {
        self.to_affine().to_uncompressed()
    }

    pub fn from_affine_coordinates(x: &Fp2, y: &Fp2) -> BlsResult<Self> {
        let mut bytes = [0u8; G2_UNCOMPRESSED_SIZE];
        bytes[..2 * FP_SIZE].copy_from_slice(&x.to_bytes());
        bytes[2 * FP_SIZE..].copy_from_slice(&y.to_bytes());
        let affine = Option::<G2Affine>::from(G2Affine::from_uncompressed_unchecked(&bytes))
            .ok_or_else(|| BlsError::invalid_encoding("malformed G2 coordinates"))?;
        if !bool::from(affine.is_on_curve()) {
            return Err(BlsError::NotOnCurve);
        }
        Ok(G2Point(affine.into()))
    }

    pub fn to_affine_coordinates(&self) -> Option<(Fp2, Fp2)> {
        if self.is_identity() {
            return None;
        }
        let bytes = self.to_uncompressed();
        let half = 2 * FP_SIZE;
        // uncompressed coordinates are canonical, so decoding cannot fail
        let x = Fp2::from_bytes(&bytes[..half]).ok()?;
        let y = Fp2::from_bytes(&bytes[half..]).ok()?;
        Some((x, y))
    }

    pub fn to_padded(&self) -> [u8; PADDED_G2_SIZE] {
        let mut out = [0u8; PADDED_G2_SIZE];
        if let Some((x, y)) = self.to_affine_coordinates() {
            out[..2 * PADDED_FP_SIZE].copy_from_slice(&x.to_padded_bytes());
            out[2 * PADDED_FP_SIZE..].copy_from_slice(&y.to_padded_bytes());
        }
        out
    }

    pub fn from_padded(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != PADDED_G2_SIZE {
            return Err(BlsError::InvalidLength {
                what: "padded G2 point",
                expected: PADDED_G2_SIZE,
                actual: bytes.len(),
            });
        }
        let x = Fp2::from_padded_bytes(&bytes[..2 * PADDED_FP_SIZE])?;
        let y = Fp2::from_padded_bytes(&bytes[2 * PADDED_FP_SIZE..])?;
        if x.is_zero() && y.is_zero() {
            return Ok(Self::identity());
        }
        Self::from_affine_coordinates(&x, &y)
    }
}

macro_rules! impl_point_ops {
    ($point:ident) => {
        impl Add for $point {
            type Output = $point;

            fn add(self, rhs: $point) -> $point {
                $point(self.0 + rhs.0)
            }
        }

        impl Sub for $point {
            type Output = $point;

            fn sub(self, rhs: $point) -> $point {
                $point(self.0 - rhs.0)
            }
        }

        impl Neg for $point {
            type Output = $point;

            fn neg(self) -> $point {
                $point(-self.0)
            }
        }

        /// Variable-time multiplication; use `mul_secret` for secret scalars
        impl Mul<Scalar> for $point {
            type Output = $point;

            fn mul(self, rhs: Scalar) -> $point {
                $point(self.0 * rhs)
            }
        }

        impl fmt::Debug for $point {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "{}({})",
                    stringify!($point),
                    hex::encode(self.to_compressed())
                )
            }
        }

        impl fmt::Display for $point {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.to_compressed()))
            }
        }
    };
}

impl_point_ops!(G1Point);
impl_point_ops!(G2Point);

/// An element of the pairing target group GT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetElement(Gt);

impl TargetElement {
    pub fn identity() -> Self {
        TargetElement(Gt::identity())
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_identity().into()
    }
}

impl Mul for TargetElement {
    type Output = TargetElement;

    fn mul(self, rhs: TargetElement) -> TargetElement {
        // GT is written additively by the bls12_381 crate
        TargetElement(self.0 + rhs.0)
    }
}

/// The optimal ate pairing e(P, Q)
pub fn pairing(p: &G1Point, q: &G2Point) -> TargetElement {
    TargetElement(bls12_381::pairing(&p.to_affine(), &q.to_affine()))
}

/// Checks `∏ e(Pᵢ, Qᵢ) == 1` with one multi-Miller loop and a single final exponentiation
pub fn pairing_product_is_identity(pairs: &[(G1Point, G2Point)]) -> bool {
    let prepared: Vec<(G1Affine, G2Prepared)> = pairs
        .iter()
        .map(|(p, q)| (p.to_affine(), G2Prepared::from(q.to_affine())))
        .collect();
    let terms: Vec<(&G1Affine, &G2Prepared)> = prepared.iter().map(|(p, q)| (p, q)).collect();
    multi_miller_loop(&terms)
        .final_exponentiation()
        .is_identity()
        .into()
}
