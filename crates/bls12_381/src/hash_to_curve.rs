//! Hashing to G2 with the `BLS12381G2_XMD:SHA-256_SSWU_RO_` suite of RFC 9380.
//!
//! The pipeline is `expand_message_xmd` → `hash_to_field` (two Fp2 elements) →
//! simplified SWU on the 3-isogenous curve E2' → 3-isogeny to E2 → point addition
//! → cofactor clearing.

use crate::constants::{
    HASH_TO_FIELD_L, MAX_DST_LENGTH, OVERSIZE_DST_PREFIX, XMD_BLOCK_SIZE, XMD_HASH_SIZE,
};
use crate::curve::G2Point;
use crate::error::{BlsError, BlsResult};
use crate::field::{Fp, Fp2};
use crate::utils::{i2osp, strxor, validate_dst};
use hex_literal::hex;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::borrow::Cow;

/// Largest output expand_message_xmd can produce: 255 blocks
const MAX_EXPAND_BLOCKS: usize = 255;

fn fp2(c0: &[u8], c1: &[u8]) -> Fp2 {
    Fp2::new(Fp::from_be_bytes_reduced(c0), Fp::from_be_bytes_reduced(c1))
}

/// A' = 240·u
static SSWU_A: Lazy<Fp2> = Lazy::new(|| Fp2::new(Fp::zero(), Fp::from_u64(240)));

/// B' = 1012·(1 + u)
static SSWU_B: Lazy<Fp2> = Lazy::new(|| Fp2::new(Fp::from_u64(1012), Fp::from_u64(1012)));

/// Z = -(2 + u)
static SSWU_Z: Lazy<Fp2> = Lazy::new(|| Fp2::new(-Fp::from_u64(2), -Fp::one()));

/// -B' / A'
static SSWU_MINUS_B_OVER_A: Lazy<Fp2> = Lazy::new(|| {
    fp2(
        &hex!("083c12791abdd5d2fe2f284f0cc6e5aa9b8c2d3f6f3f792302cf75e62bfc4df1d6834443da498888725d8cccccccb1c3"),
        &hex!("11c4ff711ec210c74cec7f673684c72cc8eb1e458445999c64615cbacab4a8324828bbbad70a777747a173333332f8e8"),
    )
});

/// B' / (Z·A'), the exceptional-case x-coordinate
static SSWU_B_OVER_ZA: Lazy<Fp2> = Lazy::new(|| {
    fp2(
        &hex!("01a59d4b6bbf912a32d63b43028e2deeebe8d5d97ca64b6d66f64ac7a265a9305e1a40da5edb81b4e3ac4f5c28f5bd27"),
        &hex!("15103a07f641331bb298f5ed3ba1230aa0bcc9f87d923077324df24a0f7ffa93045d3d6f94c17ae10efa11eb851e7336"),
    )
});

// 3-isogeny E2' → E2 coefficients, lowest degree first.

static ISO_X_NUM: Lazy<[Fp2; 4]> = Lazy::new(|| {
    [
        fp2(
            &hex!("05c759507e8e333ebb5b7a9a47d7ed8532c52d39fd3a042a88b58423c50ae15d5c2638e343d9c71c6238aaaaaaaa97d6"),
            &hex!("05c759507e8e333ebb5b7a9a47d7ed8532c52d39fd3a042a88b58423c50ae15d5c2638e343d9c71c6238aaaaaaaa97d6"),
        ),
        fp2(
            &hex!("00"),
            &hex!("11560bf17baa99bc32126fced787c88f984f87adf7ae0c7f9a208c6b4f20a4181472aaa9cb8d555526a9ffffffffc71a"),
        ),
        fp2(
            &hex!("11560bf17baa99bc32126fced787c88f984f87adf7ae0c7f9a208c6b4f20a4181472aaa9cb8d555526a9ffffffffc71e"),
            &hex!("08ab05f8bdd54cde190937e76bc3e447cc27c3d6fbd7063fcd104635a790520c0a395554e5c6aaaa9354ffffffffe38d"),
        ),
        fp2(
            &hex!("171d6541fa38ccfaed6dea691f5fb614cb14b4e7f4e810aa22d6108f142b85757098e38d0f671c7188e2aaaaaaaa5ed1"),
            &hex!("00"),
        ),
    ]
});

static ISO_X_DEN: Lazy<[Fp2; 3]> = Lazy::new(|| {
    [
        fp2(
            &hex!("00"),
            &hex!("1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffffb9feffffffffaa63"),
        ),
        fp2(
            &hex!("0c"),
            &hex!("1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffffb9feffffffffaa9f"),
        ),
        Fp2::one(),
    ]
});

static ISO_Y_NUM: Lazy<[Fp2; 4]> = Lazy::new(|| {
    [
        fp2(
            &hex!("1530477c7ab4113b59a4c18b076d11930f7da5d4a07f649bf54439d87d27e500fc8c25ebf8c92f6812cfc71c71c6d706"),
            &hex!("1530477c7ab4113b59a4c18b076d11930f7da5d4a07f649bf54439d87d27e500fc8c25ebf8c92f6812cfc71c71c6d706"),
        ),
        fp2(
            &hex!("00"),
            &hex!("05c759507e8e333ebb5b7a9a47d7ed8532c52d39fd3a042a88b58423c50ae15d5c2638e343d9c71c6238aaaaaaaa97be"),
        ),
        fp2(
            &hex!("11560bf17baa99bc32126fced787c88f984f87adf7ae0c7f9a208c6b4f20a4181472aaa9cb8d555526a9ffffffffc71c"),
            &hex!("08ab05f8bdd54cde190937e76bc3e447cc27c3d6fbd7063fcd104635a790520c0a395554e5c6aaaa9354ffffffffe38f"),
        ),
        fp2(
            &hex!("124c9ad43b6cf79bfbf7043de3811ad0761b0f37a1e26286b0e977c69aa274524e79097a56dc4bd9e1b371c71c718b10"),
            &hex!("00"),
        ),
    ]
});

static ISO_Y_DEN: Lazy<[Fp2; 4]> = Lazy::new(|| {
    [
        fp2(
            &hex!("1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffffb9feffffffffa8fb"),
            &hex!("1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffffb9feffffffffa8fb"),
        ),
        fp2(
            &hex!("00"),
            &hex!("1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffffb9feffffffffa9d3"),
        ),
        fp2(
            &hex!("12"),
            &hex!("1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffffb9feffffffffaa99"),
        ),
        Fp2::one(),
    ]
});

/// Shortens DSTs over 255 bytes to `SHA-256("H2C-OVERSIZE-DST-" || DST)`
fn reduce_dst(dst: &[u8]) -> Cow<'_, [u8]> {
    if dst.len() > MAX_DST_LENGTH {
        let digest = Sha256::new()
            .chain_update(OVERSIZE_DST_PREFIX)
            .chain_update(dst)
            .finalize();
        Cow::Owned(digest.to_vec())
    } else {
        Cow::Borrowed(dst)
    }
}

/// `expand_message_xmd` with SHA-256 (RFC 9380 §5.3.1).
pub fn expand_message_xmd(msg: &[u8], dst: &[u8], len_in_bytes: usize) -> BlsResult<Vec<u8>> {
    let ell = len_in_bytes.div_ceil(XMD_HASH_SIZE);
    if ell > MAX_EXPAND_BLOCKS || len_in_bytes > u16::MAX as usize {
        return Err(BlsError::ExpandMessage(format!(
            "requested {len_in_bytes} bytes, at most {} supported",
            MAX_EXPAND_BLOCKS * XMD_HASH_SIZE
        )));
    }

    let dst = reduce_dst(dst);
    let mut dst_prime = dst.to_vec();
    dst_prime.extend(i2osp(dst.len() as u64, 1)?);

    let b_0 = Sha256::new()
        .chain_update([0u8; XMD_BLOCK_SIZE])
        .chain_update(msg)
        .chain_update(i2osp(len_in_bytes as u64, 2)?)
        .chain_update([0u8])
        .chain_update(&dst_prime)
        .finalize();

    let mut b_i = Sha256::new()
        .chain_update(b_0)
        .chain_update([1u8])
        .chain_update(&dst_prime)
        .finalize();

    let mut uniform_bytes = Vec::with_capacity(ell * XMD_HASH_SIZE);
    uniform_bytes.extend_from_slice(&b_i);
    for i in 2..=ell {
        b_i = Sha256::new()
            .chain_update(strxor(&b_0, &b_i))
            .chain_update(i2osp(i as u64, 1)?)
            .chain_update(&dst_prime)
            .finalize();
        uniform_bytes.extend_from_slice(&b_i);
    }
    uniform_bytes.truncate(len_in_bytes);
    Ok(uniform_bytes)
}

/// Hashes `msg` to `count` elements of Fp2 (RFC 9380 §5.2, m = 2, L = 64).
pub fn hash_to_field(msg: &[u8], dst: &[u8], count: usize) -> BlsResult<Vec<Fp2>> {
    let len_in_bytes = count * 2 * HASH_TO_FIELD_L;
    let uniform_bytes = expand_message_xmd(msg, dst, len_in_bytes)?;
    Ok(uniform_bytes
        .chunks_exact(2 * HASH_TO_FIELD_L)
        .map(|chunk| {
            let (e0, e1) = chunk.split_at(HASH_TO_FIELD_L);
            fp2(e0, e1)
        })
        .collect())
}

/// Simplified SWU map to E2': `y² = x³ + 240u·x + 1012(1 + u)`.
///
/// Returns affine coordinates on the isogenous curve.
pub fn map_to_curve_simple_swu(u: &Fp2) -> BlsResult<(Fp2, Fp2)> {
    let a = &*SSWU_A;
    let b = &*SSWU_B;
    let curve_rhs = |x: &Fp2| &(&(&x.square() * x) + &(a * x)) + b;

    let tv1 = &*SSWU_Z * &u.square();
    let tv2 = &tv1.square() + &tv1;
    let x1 = if tv2.is_zero() {
        SSWU_B_OVER_ZA.clone()
    } else {
        &*SSWU_MINUS_B_OVER_A * &(&Fp2::one() + &tv2.invert()?)
    };

    let gx1 = curve_rhs(&x1);
    let (x, mut y) = match gx1.sqrt() {
        Some(y1) => (x1, y1),
        None => {
            let x2 = &tv1 * &x1;
            let gx2 = curve_rhs(&x2);
            // gx2 = Z³u⁶·gx1 is square whenever gx1 is not
            let y2 = gx2.sqrt().ok_or(BlsError::NotOnCurve)?;
            (x2, y2)
        }
    };
    if u.sgn0() != y.sgn0() {
        y = -y;
    }
    Ok((x, y))
}

fn evaluate(coefficients: &[Fp2], x: &Fp2) -> Fp2 {
    coefficients
        .iter()
        .rev()
        .fold(Fp2::zero(), |acc, c| &(&acc * x) + c)
}

/// The 3-isogeny from E2' to E2; poles map to the identity.
pub fn iso_map(x: &Fp2, y: &Fp2) -> BlsResult<G2Point> {
    let x_den = evaluate(&*ISO_X_DEN, x);
    let y_den = evaluate(&*ISO_Y_DEN, x);
    if x_den.is_zero() || y_den.is_zero() {
        return Ok(G2Point::identity());
    }
    let x_mapped = &evaluate(&*ISO_X_NUM, x) * &x_den.invert()?;
    let y_mapped = &(y * &evaluate(&*ISO_Y_NUM, x)) * &y_den.invert()?;
    G2Point::from_affine_coordinates(&x_mapped, &y_mapped)
}

/// Maps one field element to E2 without clearing the cofactor
pub fn map_to_curve(u: &Fp2) -> BlsResult<G2Point> {
    let (x, y) = map_to_curve_simple_swu(u)?;
    iso_map(&x, &y)
}

/// Maps one field element into G2: `clear_cofactor(map_to_curve(u))`.
///
/// This is the `BLS12_MAP_FP2_TO_G2` primitive of EIP-2537.
pub fn map_fp2_to_g2(u: &Fp2) -> BlsResult<G2Point> {
    Ok(map_to_curve(u)?.clear_cofactor())
}

/// Random-oracle hash of `msg` into G2 under `dst`.
pub fn hash_to_point(msg: &[u8], dst: &[u8]) -> BlsResult<G2Point> {
    validate_dst(dst)?;
    let u = hash_to_field(msg, dst, 2)?;
    let q0 = map_to_curve(&u[0])?;
    let q1 = map_to_curve(&u[1])?;
    Ok((q0 + q1).clear_cofactor())
}

/// Non-uniform encoding (`_NU_` suite): a single field element, mapped and cleared.
pub fn encode_to_point(msg: &[u8], dst: &[u8]) -> BlsResult<G2Point> {
    validate_dst(dst)?;
    let u = hash_to_field(msg, dst, 1)?;
    map_fp2_to_g2(&u[0])
}
