//! Precompiled contracts: SHA-256, MODEXP (EIP-198 / EIP-2565) and the
//! EIP-2537 BLS12-381 operations the verifier needs.
//!
//! Field elements are 64 bytes (16 zero bytes then the 48-byte big-endian
//! value); G1 points are `x || y`, G2 points `x.c0 || x.c1 || y.c0 || y.c1`,
//! and all-zero encodes the point at infinity.

use crate::address::Address;
use num_bigint::BigUint;
use num_traits::Zero;
use popsig_bls12_381::{
    map_fp2_to_g2, pairing_product_is_identity, BlsError, Fp2, G1Point, G2Point,
};
use popsig_config::{GasSchedule, ADDRESS_SIZE, PADDED_FP_SIZE, PADDED_G1_SIZE, PADDED_G2_SIZE};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Largest base, exponent or modulus MODEXP will operate on.
pub const MODEXP_MAX_LEN: usize = 1024;

const WORD: usize = 32;

/// Precompile failure: the call frame fails but the caller keeps control
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    #[error("{precompile}: invalid input length {actual}")]
    InvalidInputLength { precompile: &'static str, actual: usize },

    #[error("invalid field element: {0}")]
    InvalidFieldElement(String),

    #[error("invalid point: {0}")]
    InvalidPoint(String),

    #[error("point is not in the prime-order subgroup")]
    NotInSubgroup,

    #[error("MODEXP operand of {0} bytes is too large")]
    OperandTooLarge(usize),
}

impl From<BlsError> for PrecompileError {
    fn from(err: BlsError) -> Self {
        match err {
            BlsError::NotInSubgroup => Self::NotInSubgroup,
            BlsError::InvalidEncoding(msg) => Self::InvalidFieldElement(msg),
            other => Self::InvalidPoint(other.to_string()),
        }
    }
}

/// The precompiled contracts of the execution environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precompile {
    Sha256,
    ModExp,
    Bls12G2Add,
    Bls12PairingCheck,
    Bls12MapFp2ToG2,
}

impl Precompile {
    pub const ALL: [Precompile; 5] = [
        Precompile::Sha256,
        Precompile::ModExp,
        Precompile::Bls12G2Add,
        Precompile::Bls12PairingCheck,
        Precompile::Bls12MapFp2ToG2,
    ];

    /// The last byte of the precompile address
    pub fn id(&self) -> u8 {
        match self {
            Precompile::Sha256 => 0x02,
            Precompile::ModExp => 0x05,
            Precompile::Bls12G2Add => 0x0d,
            Precompile::Bls12PairingCheck => 0x0f,
            Precompile::Bls12MapFp2ToG2 => 0x11,
        }
    }

    pub fn address(&self) -> Address {
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes[ADDRESS_SIZE - 1] = self.id();
        Address::new(bytes)
    }

    pub fn from_address(address: &Address) -> Option<Self> {
        let bytes = address.as_bytes();
        if bytes[..ADDRESS_SIZE - 1].iter().any(|b| *b != 0) {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|p| p.id() == bytes[ADDRESS_SIZE - 1])
    }

    pub fn name(&self) -> &'static str {
        match self {
            Precompile::Sha256 => "SHA256",
            Precompile::ModExp => "MODEXP",
            Precompile::Bls12G2Add => "BLS12_G2ADD",
            Precompile::Bls12PairingCheck => "BLS12_PAIRING_CHECK",
            Precompile::Bls12MapFp2ToG2 => "BLS12_MAP_FP2_TO_G2",
        }
    }

    /// Gas charged for running the precompile on `input`
    pub fn gas_cost(&self, input: &[u8], schedule: &GasSchedule) -> u64 {
        match self {
            Precompile::Sha256 => schedule.sha256_gas(input.len()),
            Precompile::ModExp => modexp_gas(input, schedule),
            Precompile::Bls12G2Add => schedule.bls12_g2_add,
            Precompile::Bls12PairingCheck => {
                schedule.pairing_gas(input.len() / (PADDED_G1_SIZE + PADDED_G2_SIZE))
            }
            Precompile::Bls12MapFp2ToG2 => schedule.bls12_map_fp2_to_g2,
        }
    }

    pub fn execute(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
        match self {
            Precompile::Sha256 => Ok(Sha256::digest(input).to_vec()),
            Precompile::ModExp => modexp(input),
            Precompile::Bls12G2Add => g2_add(input),
            Precompile::Bls12PairingCheck => pairing_check(input),
            Precompile::Bls12MapFp2ToG2 => map_fp2_to_g2_precompile(input),
        }
    }
}

impl fmt::Display for Precompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#04x}", self.name(), self.id())
    }
}

/// Reads `len` bytes at `start`, zero-extending past the end of `input`
fn read_padded(input: &[u8], start: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if start < input.len() {
        let available = (input.len() - start).min(len);
        out[..available].copy_from_slice(&input[start..start + available]);
    }
    out
}

/// A 32-byte length header, saturating at `u64::MAX`
fn read_length(input: &[u8], index: usize) -> u64 {
    let word = read_padded(input, index * WORD, WORD);
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return u64::MAX;
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[WORD - 8..]);
    u64::from_be_bytes(bytes)
}

/// EIP-2565 pricing
fn modexp_gas(input: &[u8], schedule: &GasSchedule) -> u64 {
    let base_len = read_length(input, 0);
    let exp_len = read_length(input, 1);
    let mod_len = read_length(input, 2);

    let words = base_len.max(mod_len).saturating_add(7) / 8;
    let multiplication_complexity = words.saturating_mul(words);

    let exp_start = usize::try_from(base_len.saturating_add(3 * WORD as u64)).unwrap_or(usize::MAX);
    let head_len = exp_len.min(WORD as u64) as usize;
    let exp_head = BigUint::from_bytes_be(&read_padded(input, exp_start, head_len));
    let head_bits = exp_head.bits().saturating_sub(1);

    let iteration_count = if exp_len <= WORD as u64 {
        head_bits
    } else {
        (exp_len - WORD as u64).saturating_mul(8).saturating_add(head_bits)
    };

    let dynamic = multiplication_complexity.saturating_mul(iteration_count.max(1)) / 3;
    dynamic.max(schedule.modexp_min)
}

fn modexp(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    let lengths = [read_length(input, 0), read_length(input, 1), read_length(input, 2)];
    let mut sizes = [0usize; 3];
    for (size, len) in sizes.iter_mut().zip(lengths) {
        *size = usize::try_from(len)
            .ok()
            .filter(|l| *l <= MODEXP_MAX_LEN)
            .ok_or(PrecompileError::OperandTooLarge(len.min(usize::MAX as u64) as usize))?;
    }
    let [base_len, exp_len, mod_len] = sizes;

    let base = BigUint::from_bytes_be(&read_padded(input, 3 * WORD, base_len));
    let exponent = BigUint::from_bytes_be(&read_padded(input, 3 * WORD + base_len, exp_len));
    let modulus =
        BigUint::from_bytes_be(&read_padded(input, 3 * WORD + base_len + exp_len, mod_len));

    let mut out = vec![0u8; mod_len];
    if modulus.is_zero() {
        return Ok(out);
    }
    let result = base.modpow(&exponent, &modulus).to_bytes_be();
    // result < modulus, so it fits in mod_len bytes
    out[mod_len - result.len()..].copy_from_slice(&result);
    Ok(out)
}

fn g2_add(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    if input.len() != 2 * PADDED_G2_SIZE {
        return Err(PrecompileError::InvalidInputLength {
            precompile: "BLS12_G2ADD",
            actual: input.len(),
        });
    }
    let a = G2Point::from_padded(&input[..PADDED_G2_SIZE])?;
    let b = G2Point::from_padded(&input[PADDED_G2_SIZE..])?;
    Ok((a + b).to_padded().to_vec())
}

fn pairing_check(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    let pair_size = PADDED_G1_SIZE + PADDED_G2_SIZE;
    if input.is_empty() || input.len() % pair_size != 0 {
        return Err(PrecompileError::InvalidInputLength {
            precompile: "BLS12_PAIRING_CHECK",
            actual: input.len(),
        });
    }

    let pairs = input
        .chunks_exact(pair_size)
        .map(|chunk| {
            let p = G1Point::from_padded(&chunk[..PADDED_G1_SIZE])?;
            let q = G2Point::from_padded(&chunk[PADDED_G1_SIZE..])?;
            if !p.is_torsion_free() || !q.is_torsion_free() {
                return Err(PrecompileError::NotInSubgroup);
            }
            Ok((p, q))
        })
        .collect::<Result<Vec<_>, PrecompileError>>()?;

    let mut out = vec![0u8; WORD];
    out[WORD - 1] = pairing_product_is_identity(&pairs) as u8;
    Ok(out)
}

fn map_fp2_to_g2_precompile(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    if input.len() != 2 * PADDED_FP_SIZE {
        return Err(PrecompileError::InvalidInputLength {
            precompile: "BLS12_MAP_FP2_TO_G2",
            actual: input.len(),
        });
    }
    let u = Fp2::from_padded_bytes(input)?;
    Ok(map_fp2_to_g2(&u)?.to_padded().to_vec())
}
