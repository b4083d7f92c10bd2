//! BLS12-381 signature types and the proof-of-possession ciphersuite.

use crate::constants::{
    DEFAULT_MIN_SEED_LENGTH, FP_SIZE, POP_PROOF_DST, POP_SIGNATURE_DST, SIGNATURE_SIZE,
};
use crate::curve::{pairing_product_is_identity, G1Point, G2Point};
use crate::error::{BlsError, BlsResult};
use crate::hash_to_curve::hash_to_point;
use crate::keys::{PublicKey, SecretKey};
use popsig_config::CiphersuiteConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// BLS12-381 signature: a point of G2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    point: G2Point,
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl Signature {
    /// Wraps a G2 point, rejecting points outside G2
    pub fn from_point(point: G2Point) -> BlsResult<Self> {
        if !point.is_torsion_free() {
            return Err(BlsError::NotInSubgroup);
        }
        Ok(Self { point })
    }

    /// Creates a signature from bytes (compressed G2 point)
    pub fn from_bytes(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(BlsError::InvalidSignatureSize {
                expected: SIGNATURE_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            point: G2Point::from_compressed(bytes)?,
        })
    }

    /// Converts the signature to bytes (compressed G2 point)
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        self.point.to_compressed()
    }

    /// Gets the G2 point
    pub fn point(&self) -> &G2Point {
        &self.point
    }

    /// Affine y-coordinate as `c0 || c1`, the on-chain decompression witness
    pub fn y_coordinate(&self) -> [u8; 2 * FP_SIZE] {
        let mut out = [0u8; 2 * FP_SIZE];
        if let Some((_, y)) = self.point.to_affine_coordinates() {
            out[..FP_SIZE].copy_from_slice(&y.c0.to_bytes());
            out[FP_SIZE..].copy_from_slice(&y.c1.to_bytes());
        }
        out
    }

    /// A signature is never the identity when produced by a valid key
    pub fn is_valid(&self) -> bool {
        !self.point.is_identity() && self.point.is_torsion_free()
    }

    /// Creates a signature from hex string
    pub fn from_hex(hex: &str) -> BlsResult<Self> {
        let bytes = crate::utils::hex_to_bytes(hex)?;
        Self::from_bytes(&bytes)
    }

    /// Converts the signature to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The `BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_` ciphersuite
pub const G2_PROOF_OF_POSSESSION: Ciphersuite = Ciphersuite {
    dst: Cow::Borrowed(POP_SIGNATURE_DST.as_bytes()),
    pop_dst: Cow::Borrowed(POP_PROOF_DST.as_bytes()),
    min_seed_length: DEFAULT_MIN_SEED_LENGTH,
};

/// A minimal-pubkey-size BLS ciphersuite: keys in G1, signatures in G2.
///
/// The signing DST is a parameter so that signatures under foreign domains can
/// be produced and shown not to verify here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphersuite {
    dst: Cow<'static, [u8]>,
    pop_dst: Cow<'static, [u8]>,
    min_seed_length: usize,
}

impl Default for Ciphersuite {
    fn default() -> Self {
        G2_PROOF_OF_POSSESSION
    }
}

impl Ciphersuite {
    /// The proof-of-possession ciphersuite
    pub fn proof_of_possession() -> Self {
        G2_PROOF_OF_POSSESSION
    }

    /// Same ciphersuite with a different signing DST
    pub fn with_dst(mut self, dst: impl Into<Vec<u8>>) -> Self {
        self.dst = Cow::Owned(dst.into());
        self
    }

    /// Same ciphersuite with a different KeyGen seed minimum
    pub fn with_min_seed_length(mut self, min_seed_length: usize) -> Self {
        self.min_seed_length = min_seed_length;
        self
    }

    /// Builds the ciphersuite described by a configuration section
    pub fn from_config(config: &CiphersuiteConfig) -> BlsResult<Self> {
        if config.dst.is_empty() || config.pop_dst.is_empty() {
            return Err(BlsError::InvalidDst("DST must not be empty".into()));
        }
        Ok(Self {
            dst: Cow::Owned(config.dst.as_bytes().to_vec()),
            pop_dst: Cow::Owned(config.pop_dst.as_bytes().to_vec()),
            min_seed_length: config.min_seed_length,
        })
    }

    pub fn dst(&self) -> &[u8] {
        &self.dst
    }

    pub fn pop_dst(&self) -> &[u8] {
        &self.pop_dst
    }

    pub fn min_seed_length(&self) -> usize {
        self.min_seed_length
    }

    /// KeyGen(IKM, key_info)
    pub fn key_gen(&self, seed: &[u8], key_info: &[u8]) -> BlsResult<SecretKey> {
        SecretKey::key_gen(seed, key_info, self.min_seed_length)
    }

    /// SkToPk(sk)
    pub fn sk_to_pk(&self, secret_key: &SecretKey) -> PublicKey {
        secret_key.public_key()
    }

    /// Sign(sk, message) = sk · H(message)
    pub fn sign(&self, secret_key: &SecretKey, message: &[u8]) -> BlsResult<Signature> {
        if !secret_key.is_valid() {
            return Err(BlsError::invalid_scalar("secret key must be non-zero"));
        }
        let hash_point = hash_to_point(message, &self.dst)?;
        Ok(Signature {
            point: hash_point.mul_secret(secret_key.scalar()),
        })
    }

    /// Core verification: `e(pk, H(m)) · e(-G1, sig) == 1`
    fn core_verify(
        &self,
        public_key: &PublicKey,
        message: &[u8],
        signature: &Signature,
        dst: &[u8],
    ) -> bool {
        if !public_key.is_valid() {
            debug!("rejecting signature: invalid public key");
            return false;
        }
        if !signature.point.is_torsion_free() {
            debug!("rejecting signature: not in G2");
            return false;
        }
        let hash_point = match hash_to_point(message, dst) {
            Ok(point) => point,
            Err(err) => {
                debug!(%err, "rejecting signature: hash to curve failed");
                return false;
            }
        };
        pairing_product_is_identity(&[
            (*public_key.point(), hash_point),
            (-G1Point::generator(), signature.point),
        ])
    }

    /// Verify(pk, message, signature)
    pub fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        self.core_verify(public_key, message, signature, &self.dst)
    }

    /// Verify over raw encodings.
    ///
    /// Inputs of the wrong length are malformed and reported as errors. Any
    /// other defect (flag bits, `x >= p`, off-curve, outside the subgroup,
    /// identity key) makes the signature invalid and yields `Ok(false)`.
    pub fn verify_bytes(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> BlsResult<bool> {
        if public_key.len() != crate::constants::PUBLIC_KEY_SIZE {
            return Err(BlsError::InvalidKeySize {
                expected: crate::constants::PUBLIC_KEY_SIZE,
                actual: public_key.len(),
            });
        }
        if signature.len() != SIGNATURE_SIZE {
            return Err(BlsError::InvalidSignatureSize {
                expected: SIGNATURE_SIZE,
                actual: signature.len(),
            });
        }
        let public_key = match PublicKey::from_bytes(public_key) {
            Ok(key) => key,
            Err(err) => {
                debug!(%err, "rejecting public key");
                return Ok(false);
            }
        };
        let signature = match Signature::from_bytes(signature) {
            Ok(sig) => sig,
            Err(err) => {
                debug!(%err, "rejecting signature encoding");
                return Ok(false);
            }
        };
        Ok(self.verify(&public_key, message, &signature))
    }

    /// KeyValidate(pk) over the compressed encoding
    pub fn key_validate(&self, public_key: &[u8]) -> bool {
        PublicKey::from_bytes(public_key).is_ok()
    }

    /// PopProve(sk): a signature over the compressed public key under the PoP DST
    pub fn pop_prove(&self, secret_key: &SecretKey) -> BlsResult<Signature> {
        if !secret_key.is_valid() {
            return Err(BlsError::invalid_scalar("secret key must be non-zero"));
        }
        let public_key = secret_key.public_key();
        let hash_point = hash_to_point(&public_key.to_bytes(), &self.pop_dst)?;
        Ok(Signature {
            point: hash_point.mul_secret(secret_key.scalar()),
        })
    }

    /// PopVerify(pk, proof)
    pub fn pop_verify(&self, public_key: &PublicKey, proof: &Signature) -> bool {
        self.core_verify(public_key, &public_key.to_bytes(), proof, &self.pop_dst)
    }
}
