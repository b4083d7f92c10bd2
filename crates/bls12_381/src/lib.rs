//! BLS12-381 proof-of-possession signatures.
//!
//! Public keys live in G1 (48-byte compressed), signatures in G2 (96-byte
//! compressed), and messages are hashed to G2 with RFC 9380
//! `BLS12381G2_XMD:SHA-256_SSWU_RO_`. The default ciphersuite is
//! `BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_`.
//!
//! Proof-of-possession verification (`pop_verify`) is the prerequisite for any
//! future same-message aggregation; aggregation itself is not provided.

pub mod constants;
pub mod curve;
pub mod error;
pub mod field;
pub mod hash_to_curve;
pub mod keys;
pub mod signature;
pub mod utils;

pub use curve::{pairing, pairing_product_is_identity, G1Point, G2Point, TargetElement};
pub use error::{BlsError, BlsResult};
pub use field::{Fp, Fp2};
pub use hash_to_curve::{encode_to_point, hash_to_point, map_fp2_to_g2};
pub use keys::{KeyPair, PublicKey, SecretKey};
pub use signature::{Ciphersuite, Signature, G2_PROOF_OF_POSSESSION};

pub use bls12_381::Scalar;

use rand::RngCore;

/// BLS12-381 proof-of-possession operations under the default ciphersuite
pub struct Bls12381;

impl Bls12381 {
    /// Generates a new random secret key
    pub fn generate_secret_key<R: RngCore>(rng: &mut R) -> SecretKey {
        SecretKey::generate(rng)
    }

    /// KeyGen(seed) with an empty key_info
    pub fn key_gen(seed: &[u8]) -> BlsResult<SecretKey> {
        G2_PROOF_OF_POSSESSION.key_gen(seed, b"")
    }

    /// SkToPk
    pub fn derive_public_key(secret_key: &SecretKey) -> PublicKey {
        G2_PROOF_OF_POSSESSION.sk_to_pk(secret_key)
    }

    /// Signs a message with a secret key
    pub fn sign(secret_key: &SecretKey, message: &[u8]) -> BlsResult<Signature> {
        G2_PROOF_OF_POSSESSION.sign(secret_key, message)
    }

    /// Verifies a signature
    pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        G2_PROOF_OF_POSSESSION.verify(public_key, message, signature)
    }

    /// Verifies raw encodings; wrong lengths are errors, other defects are `false`
    pub fn verify_bytes(public_key: &[u8], message: &[u8], signature: &[u8]) -> BlsResult<bool> {
        G2_PROOF_OF_POSSESSION.verify_bytes(public_key, message, signature)
    }

    /// KeyValidate
    pub fn key_validate(public_key: &[u8]) -> bool {
        G2_PROOF_OF_POSSESSION.key_validate(public_key)
    }

    /// PopProve
    pub fn pop_prove(secret_key: &SecretKey) -> BlsResult<Signature> {
        G2_PROOF_OF_POSSESSION.pop_prove(secret_key)
    }

    /// PopVerify
    pub fn pop_verify(public_key: &PublicKey, proof: &Signature) -> bool {
        G2_PROOF_OF_POSSESSION.pop_verify(public_key, proof)
    }

    /// Validates a signature
    pub fn validate_signature(signature: &Signature) -> bool {
        signature.is_valid()
    }

    /// Serializes a secret key to 32 big-endian bytes
    pub fn secret_key_to_bytes(secret_key: &SecretKey) -> [u8; constants::SECRET_KEY_SIZE] {
        secret_key.to_bytes()
    }

    /// Deserializes a secret key
    pub fn secret_key_from_bytes(bytes: &[u8]) -> BlsResult<SecretKey> {
        SecretKey::from_bytes(bytes)
    }

    /// Serializes a public key (compressed G1)
    pub fn public_key_to_bytes(public_key: &PublicKey) -> [u8; constants::PUBLIC_KEY_SIZE] {
        public_key.to_bytes()
    }

    /// Deserializes and validates a public key
    pub fn public_key_from_bytes(bytes: &[u8]) -> BlsResult<PublicKey> {
        PublicKey::from_bytes(bytes)
    }

    /// Serializes a signature (compressed G2)
    pub fn signature_to_bytes(signature: &Signature) -> [u8; constants::SIGNATURE_SIZE] {
        signature.to_bytes()
    }

    /// Deserializes a signature
    pub fn signature_from_bytes(bytes: &[u8]) -> BlsResult<Signature> {
        Signature::from_bytes(bytes)
    }

    /// Generates a key pair
    pub fn generate_key_pair<R: RngCore>(rng: &mut R) -> KeyPair {
        KeyPair::generate(rng)
    }
}
