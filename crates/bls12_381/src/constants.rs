//! Ciphersuite and curve constants.

pub use popsig_config::{
    DEFAULT_MIN_SEED_LENGTH, FP_SIZE, HASH_SIZE, IETF_MIN_SEED_LENGTH, PADDED_FP_SIZE,
    PADDED_G1_SIZE, PADDED_G2_SIZE, POP_PROOF_DST, POP_SIGNATURE_DST, PUBLIC_KEY_SIZE,
    SECRET_KEY_SIZE, SIGNATURE_SIZE,
};

use hex_literal::hex;

/// Size of an uncompressed G1 point
pub const G1_UNCOMPRESSED_SIZE: usize = 2 * FP_SIZE;
/// Size of an uncompressed G2 point
pub const G2_UNCOMPRESSED_SIZE: usize = 4 * FP_SIZE;

/// Compressed encoding flag
pub const COMPRESSION_FLAG: u8 = 0x80;
/// Point at infinity flag
pub const INFINITY_FLAG: u8 = 0x40;
/// "y is lexicographically largest" flag
pub const SIGN_FLAG: u8 = 0x20;
/// Mask over the three flag bits
pub const FLAG_MASK: u8 = 0xe0;

/// Base field modulus p, big-endian
pub const MODULUS: [u8; FP_SIZE] = hex!(
    "1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffffb9feffffffffaaab"
);

/// Subgroup order r, big-endian
pub const GROUP_ORDER: [u8; SECRET_KEY_SIZE] =
    hex!("73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001");

/// SHA-256 output size (b_in_bytes)
pub const XMD_HASH_SIZE: usize = 32;
/// SHA-256 block size (s_in_bytes)
pub const XMD_BLOCK_SIZE: usize = 64;
/// Bytes per field element in hash_to_field: ceil((ceil(log2 p) + k) / 8) with k = 128
pub const HASH_TO_FIELD_L: usize = 64;
/// Longest DST expand_message_xmd accepts without reduction
pub const MAX_DST_LENGTH: usize = 255;
/// Prefix used to shorten oversized DSTs
pub const OVERSIZE_DST_PREFIX: &[u8] = b"H2C-OVERSIZE-DST-";

/// Initial HKDF salt of KeyGen
pub const KEYGEN_SALT: &[u8] = b"BLS-SIG-KEYGEN-SALT-";
/// Output length of the HKDF expand step in KeyGen: ceil((3 * ceil(log2 r)) / 16)
pub const KEYGEN_OKM_LENGTH: usize = 48;
