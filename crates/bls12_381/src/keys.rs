//! BLS12-381 key types and operations.

use crate::constants::{KEYGEN_OKM_LENGTH, KEYGEN_SALT, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE};
use crate::curve::G1Point;
use crate::error::{BlsError, BlsResult};
use crate::signature::{Ciphersuite, Signature, G2_PROOF_OF_POSSESSION};
use crate::utils::i2osp;
use bls12_381::Scalar;
use ff::Field;
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{DefaultIsZeroes, Zeroize, ZeroizeOnDrop};

/// OS2IP(bytes) mod r for big-endian input of at most 64 bytes
fn scalar_from_be_bytes_wide(bytes: &[u8]) -> Scalar {
    let mut wide = [0u8; 64];
    for (dst, src) in wide.iter_mut().zip(bytes.iter().rev()) {
        *dst = *src;
    }
    Scalar::from_bytes_wide(&wide)
}

/// Scalar whose `Default` is zero, which lets `zeroize` wipe it with volatile writes
#[derive(Clone, Copy, Default, PartialEq, Eq)]
struct SecretScalar(Scalar);

impl DefaultIsZeroes for SecretScalar {}

/// BLS12-381 secret key: a scalar in `[1, r - 1]`, wiped on drop
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    scalar: SecretScalar,
}

impl SecretKey {
    /// Generates a new random secret key
    pub fn generate<R: RngCore>(rng: &mut R) -> Self {
        loop {
            let scalar = Scalar::random(&mut *rng);
            if !bool::from(scalar.is_zero()) {
                return Self {
                    scalar: SecretScalar(scalar),
                };
            }
        }
    }

    /// Deterministic KeyGen from the IETF BLS signature draft.
    ///
    /// HKDF-SHA-256 over `ikm || 0x00` with info `key_info || I2OSP(48, 2)`; the salt
    /// starts as `"BLS-SIG-KEYGEN-SALT-"` and is re-hashed before every attempt
    /// until the reduced output is non-zero.
    pub fn key_gen(ikm: &[u8], key_info: &[u8], min_seed_length: usize) -> BlsResult<Self> {
        if ikm.len() < min_seed_length {
            return Err(BlsError::InsufficientSeedLength {
                minimum: min_seed_length,
                actual: ikm.len(),
            });
        }

        let mut ikm_prime = ikm.to_vec();
        ikm_prime.push(0);
        let mut info = key_info.to_vec();
        info.extend(i2osp(KEYGEN_OKM_LENGTH as u64, 2)?);

        let mut salt = KEYGEN_SALT.to_vec();
        loop {
            salt = Sha256::digest(&salt).to_vec();
            let hkdf = Hkdf::<Sha256>::new(Some(salt.as_slice()), &ikm_prime);
            let mut okm = [0u8; KEYGEN_OKM_LENGTH];
            hkdf.expand(&info, &mut okm)
                .map_err(|_| BlsError::invalid_scalar("HKDF output length rejected"))?;
            let scalar = scalar_from_be_bytes_wide(&okm);
            if !bool::from(scalar.is_zero()) {
                return Ok(Self {
                    scalar: SecretScalar(scalar),
                });
            }
        }
    }

    /// Creates a secret key from a scalar
    pub fn from_scalar(scalar: Scalar) -> BlsResult<Self> {
        if bool::from(scalar.is_zero()) {
            return Err(BlsError::invalid_scalar("secret key must be non-zero"));
        }
        Ok(Self {
            scalar: SecretScalar(scalar),
        })
    }

    /// Creates a secret key from its 32-byte big-endian encoding
    pub fn from_bytes(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(BlsError::InvalidKeySize {
                expected: SECRET_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut little_endian = [0u8; SECRET_KEY_SIZE];
        for (dst, src) in little_endian.iter_mut().zip(bytes.iter().rev()) {
            *dst = *src;
        }

        let scalar = Option::<Scalar>::from(Scalar::from_bytes(&little_endian))
            .ok_or_else(|| BlsError::invalid_scalar("scalar is not below the group order"))?;
        Self::from_scalar(scalar)
    }

    /// 32-byte big-endian encoding
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_SIZE] {
        let mut bytes = self.scalar.0.to_bytes();
        bytes.reverse();
        bytes
    }

    /// Gets the scalar value
    pub fn scalar(&self) -> &Scalar {
        &self.scalar.0
    }

    /// SkToPk: `sk · G1`, computed in constant time
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            point: G1Point::generator().mul_secret(&self.scalar.0),
        }
    }

    /// Signs a message under the proof-of-possession ciphersuite
    pub fn sign(&self, message: &[u8]) -> BlsResult<Signature> {
        G2_PROOF_OF_POSSESSION.sign(self, message)
    }

    /// Validates the secret key
    pub fn is_valid(&self) -> bool {
        !bool::from(self.scalar.0.is_zero())
    }

    /// Creates a secret key from hex string
    pub fn from_hex(hex: &str) -> BlsResult<Self> {
        let bytes = crate::utils::hex_to_bytes(hex)?;
        Self::from_bytes(&bytes)
    }

    /// Converts the secret key to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.scalar.zeroize();
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

/// BLS12-381 public key: a non-identity point of G1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    point: G1Point,
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl PublicKey {
    /// Wraps a G1 point, rejecting the identity and points outside G1
    pub fn from_point(point: G1Point) -> BlsResult<Self> {
        if point.is_identity() {
            return Err(BlsError::IdentityPoint);
        }
        if !point.is_torsion_free() {
            return Err(BlsError::NotInSubgroup);
        }
        Ok(Self { point })
    }

    /// Creates a public key from bytes (compressed G1 point).
    ///
    /// Performs KeyValidate: the encoding must be canonical, on the curve, in
    /// the subgroup and not the identity.
    pub fn from_bytes(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(BlsError::InvalidKeySize {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        Self::from_point(G1Point::from_compressed(bytes)?)
    }

    /// Converts the public key to bytes (compressed G1 point)
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.point.to_compressed()
    }

    /// Gets the G1 point
    pub fn point(&self) -> &G1Point {
        &self.point
    }

    /// Affine y-coordinate, the decompression witness of the on-chain verifier
    pub fn y_coordinate(&self) -> [u8; crate::constants::FP_SIZE] {
        match self.point.to_affine_coordinates() {
            Some((_, y)) => y.to_bytes(),
            None => [0u8; crate::constants::FP_SIZE],
        }
    }

    /// Verifies a signature under the proof-of-possession ciphersuite
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        G2_PROOF_OF_POSSESSION.verify(self, message, signature)
    }

    /// Validates the public key
    pub fn is_valid(&self) -> bool {
        !self.point.is_identity() && self.point.is_torsion_free()
    }

    /// Creates a public key from hex string
    pub fn from_hex(hex: &str) -> BlsResult<Self> {
        let bytes = crate::utils::hex_to_bytes(hex)?;
        Self::from_bytes(&bytes)
    }

    /// Converts the public key to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// BLS12-381 key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random key pair
    pub fn generate<R: RngCore>(rng: &mut R) -> Self {
        Self::from_secret_key(SecretKey::generate(rng))
    }

    /// Derives a key pair with KeyGen under `ciphersuite`
    pub fn key_gen(ciphersuite: &Ciphersuite, seed: &[u8], key_info: &[u8]) -> BlsResult<Self> {
        Ok(Self::from_secret_key(ciphersuite.key_gen(seed, key_info)?))
    }

    /// Creates a key pair from a secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self {
            secret_key,
            public_key,
        }
    }

    /// Gets the secret key
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Gets the public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Signs a message with the secret key
    pub fn sign(&self, message: &[u8]) -> BlsResult<Signature> {
        self.secret_key.sign(message)
    }

    /// Verifies a signature with the public key
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.public_key.verify(message, signature)
    }

    /// Serializes the key pair to bytes (secret key + public key)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SECRET_KEY_SIZE + PUBLIC_KEY_SIZE);
        bytes.extend_from_slice(&self.secret_key.to_bytes());
        bytes.extend_from_slice(&self.public_key.to_bytes());
        bytes
    }

    /// Deserializes a key pair from bytes
    pub fn from_bytes(bytes: &[u8]) -> BlsResult<Self> {
        if bytes.len() != SECRET_KEY_SIZE + PUBLIC_KEY_SIZE {
            return Err(BlsError::InvalidKeySize {
                expected: SECRET_KEY_SIZE + PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let secret_key = SecretKey::from_bytes(&bytes[..SECRET_KEY_SIZE])?;
        let public_key = PublicKey::from_bytes(&bytes[SECRET_KEY_SIZE..])?;

        if public_key != secret_key.public_key() {
            return Err(BlsError::invalid_encoding(
                "public key does not match secret key",
            ));
        }

        Ok(Self {
            secret_key,
            public_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rand::thread_rng;

    #[test]
    fn test_secret_key_generation() {
        let mut rng = thread_rng();
        let secret_key = SecretKey::generate(&mut rng);
        assert!(secret_key.is_valid());
    }

    #[test]
    fn test_key_gen_known_answer() {
        let secret_key = SecretKey::key_gen(b"some-secret", b"", 8).unwrap();
        assert_eq!(
            secret_key.to_bytes(),
            hex!("0b5de26a140b2add47442c6b0eb4b23623030b9adaba4334da0948f70249b131")
        );
        assert_eq!(
            secret_key.public_key().to_bytes(),
            hex!("90b67fcdc75604ef2ccfb42816fba0541295558f0e2ee532151f2144372f5ede34aef503f2442bcd2676aea2b1ee3284")
        );
    }

    #[test]
    fn test_key_gen_seed_length_and_info() {
        assert_eq!(
            SecretKey::key_gen(b"short", b"", 8).unwrap_err(),
            BlsError::InsufficientSeedLength {
                minimum: 8,
                actual: 5
            }
        );
        let seed = [7u8; 32];
        let plain = SecretKey::key_gen(&seed, b"", 32).unwrap();
        let with_info = SecretKey::key_gen(&seed, b"validator-1", 32).unwrap();
        assert_ne!(plain, with_info);
        assert_eq!(plain, SecretKey::key_gen(&seed, b"", 32).unwrap());
    }

    #[test]
    fn test_secret_key_serialization() {
        let mut rng = thread_rng();
        let secret_key = SecretKey::generate(&mut rng);

        let bytes = secret_key.to_bytes();
        assert_eq!(bytes.len(), SECRET_KEY_SIZE);
        assert_eq!(SecretKey::from_bytes(&bytes).unwrap(), secret_key);
        assert_eq!(SecretKey::from_hex(&secret_key.to_hex()).unwrap(), secret_key);
    }

    #[test]
    fn test_secret_key_rejects_invalid_scalars() {
        assert!(matches!(
            SecretKey::from_bytes(&[0u8; 32]),
            Err(BlsError::InvalidScalar(_))
        ));
        // the group order itself is out of range
        assert!(matches!(
            SecretKey::from_bytes(&crate::constants::GROUP_ORDER),
            Err(BlsError::InvalidScalar(_))
        ));
        assert!(matches!(
            SecretKey::from_scalar(Scalar::ZERO),
            Err(BlsError::InvalidScalar(_))
        ));
        assert!(matches!(
            SecretKey::from_bytes(&[1u8; 16]),
            Err(BlsError::InvalidKeySize { .. })
        ));
    }

    #[test]
    fn test_secret_key_debug_is_redacted() {
        let secret_key = SecretKey::key_gen(b"some-secret", b"", 8).unwrap();
        assert_eq!(format!("{:?}", secret_key), "SecretKey(..)");
    }

    #[test]
    fn test_secret_key_zeroize() {
        fn wiped_on_drop<T: ZeroizeOnDrop>() {}
        wiped_on_drop::<SecretKey>();

        let mut secret_key = SecretKey::key_gen(b"some-secret", b"", 8).unwrap();
        let copy = secret_key.clone();
        assert!(secret_key.is_valid());

        secret_key.zeroize();
        assert!(!secret_key.is_valid());
        assert_eq!(secret_key.scalar(), &Scalar::ZERO);
        assert_eq!(secret_key.to_bytes(), [0u8; SECRET_KEY_SIZE]);
        // clones own their scalar
        assert!(copy.is_valid());
    }

    #[test]
    fn test_public_key_serialization() {
        let mut rng = thread_rng();
        let public_key = SecretKey::generate(&mut rng).public_key();

        let bytes = public_key.to_bytes();
        assert_eq!(PublicKey::from_bytes(&bytes).unwrap(), public_key);
        assert_eq!(PublicKey::from_hex(&public_key.to_hex()).unwrap(), public_key);

        let json = serde_json::to_string(&public_key).unwrap();
        let decoded: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, public_key);
    }

    #[test]
    fn test_public_key_rejects_identity() {
        let mut identity = [0u8; PUBLIC_KEY_SIZE];
        identity[0] = 0xc0;
        assert_eq!(
            PublicKey::from_bytes(&identity),
            Err(BlsError::IdentityPoint)
        );
        assert_eq!(
            PublicKey::from_point(G1Point::identity()),
            Err(BlsError::IdentityPoint)
        );
    }

    #[test]
    fn test_public_key_y_witness() {
        let secret_key = SecretKey::key_gen(b"some-secret", b"", 8).unwrap();
        assert_eq!(
            secret_key.public_key().y_coordinate(),
            hex!("02aad19a5cbe711f96aad3d2bd5a386b9bb5cf9e083befbbc93424e16e66da973e7ac0a51188533ee95612dc13ef44c1")
        );
    }

    #[test]
    fn test_key_pair_serialization() {
        let mut rng = thread_rng();
        let key_pair = KeyPair::generate(&mut rng);

        let bytes = key_pair.to_bytes();
        assert_eq!(bytes.len(), SECRET_KEY_SIZE + PUBLIC_KEY_SIZE);
        assert_eq!(KeyPair::from_bytes(&bytes).unwrap(), key_pair);

        let other = KeyPair::generate(&mut rng);
        let mut mismatched = key_pair.secret_key().to_bytes().to_vec();
        mismatched.extend_from_slice(&other.public_key().to_bytes());
        assert!(KeyPair::from_bytes(&mismatched).is_err());
        assert!(KeyPair::from_bytes(&[0u8; 64]).is_err());
    }
}
