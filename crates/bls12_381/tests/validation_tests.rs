//! Point and encoding validation tests.
//!
//! Every malformed input must be classified: wrong lengths are errors, any
//! other defect is a failed verification.

use hex_literal::hex;
use popsig_bls12_381::constants::{MODULUS, SIGNATURE_SIZE};
use popsig_bls12_381::*;

const SIGNING_ROOT: [u8; 32] =
    hex!("3a896ca4b5db102b9dfd47528b06220a91bd12461dcc86793ce2d591f41ea4f8");

fn scenario() -> (PublicKey, Signature) {
    let secret_key = Bls12381::key_gen(b"some-secret").unwrap();
    let signature = Bls12381::sign(&secret_key, &SIGNING_ROOT).unwrap();
    (Bls12381::derive_public_key(&secret_key), signature)
}

/// A G1 x coordinate with no square root on the curve
fn off_curve_g1() -> [u8; 48] {
    (1u64..)
        .map(|x| {
            let mut bytes = Fp::from_u64(x).to_bytes();
            bytes[0] |= 0x80;
            bytes
        })
        .find(|bytes| G1Point::from_compressed_unchecked(bytes).is_err())
        .unwrap()
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    /// Clearing the compression flag invalidates both keys and signatures
    #[test]
    fn test_missing_compression_flag() {
        let (public_key, signature) = scenario();

        let mut pk = public_key.to_bytes();
        pk[0] &= 0x7f;
        assert!(!Bls12381::key_validate(&pk));
        assert_eq!(Bls12381::verify_bytes(&pk, &SIGNING_ROOT, &signature.to_bytes()), Ok(false));

        let mut sig = signature.to_bytes();
        sig[0] &= 0x7f;
        assert!(matches!(Signature::from_bytes(&sig), Err(BlsError::InvalidEncoding(_))));
        assert_eq!(
            Bls12381::verify_bytes(&public_key.to_bytes(), &SIGNING_ROOT, &sig),
            Ok(false)
        );
    }

    /// x equal to the field modulus is non-canonical
    #[test]
    fn test_non_canonical_x() {
        let mut pk = MODULUS;
        pk[0] |= 0x80;
        assert!(matches!(G1Point::from_compressed(&pk), Err(BlsError::InvalidEncoding(_))));

        let mut sig = [0u8; SIGNATURE_SIZE];
        sig[..48].copy_from_slice(&MODULUS);
        sig[0] |= 0x80;
        assert!(matches!(Signature::from_bytes(&sig), Err(BlsError::InvalidEncoding(_))));
    }

    /// Infinity with stray x bits or the sign flag is not canonical
    #[test]
    fn test_non_canonical_infinity() {
        let mut pk = [0u8; 48];
        pk[0] = 0xc0;
        pk[47] = 1;
        assert!(G1Point::from_compressed(&pk).is_err());

        let mut sig = [0u8; SIGNATURE_SIZE];
        sig[0] = 0xe0;
        assert!(Signature::from_bytes(&sig).is_err());

        sig[0] = 0xc0;
        assert!(Signature::from_bytes(&sig).unwrap().point().is_identity());
    }

    /// Off-curve x coordinates are rejected, not panicked on
    #[test]
    fn test_off_curve_public_key() {
        let pk = off_curve_g1();
        let (_, signature) = scenario();

        assert!(matches!(PublicKey::from_bytes(&pk), Err(BlsError::NotOnCurve)));
        assert!(!Bls12381::key_validate(&pk));
        assert_eq!(Bls12381::verify_bytes(&pk, &SIGNING_ROOT, &signature.to_bytes()), Ok(false));
    }

    /// Wrong lengths are the only error class of verify_bytes
    #[test]
    fn test_length_errors() {
        let (public_key, signature) = scenario();
        let pk = public_key.to_bytes();
        let sig = signature.to_bytes();

        for len in [0usize, 47, 49, 96] {
            let input = vec![0x80u8; len];
            let result = Bls12381::verify_bytes(&input, &SIGNING_ROOT, &sig);
            assert!(result.as_ref().is_err_and(BlsError::is_malformed), "pk length {len}");
        }
        for len in [0usize, 48, 95, 97] {
            let input = vec![0x80u8; len];
            let result = Bls12381::verify_bytes(&pk, &SIGNING_ROOT, &input);
            assert!(result.as_ref().is_err_and(BlsError::is_malformed), "sig length {len}");
        }
    }

    /// EIP-2537 padded encodings round trip and reject dirty padding
    #[test]
    fn test_padded_encodings() {
        let (public_key, signature) = scenario();

        let padded_pk = public_key.point().to_padded();
        assert_eq!(G1Point::from_padded(&padded_pk).unwrap(), *public_key.point());

        let padded_sig = signature.point().to_padded();
        assert_eq!(G2Point::from_padded(&padded_sig).unwrap(), *signature.point());

        let mut dirty = padded_sig;
        dirty[0] = 1;
        assert!(G2Point::from_padded(&dirty).is_err());

        assert!(G2Point::from_padded(&[0u8; 256]).unwrap().is_identity());
    }

    /// The witnesses are the affine y coordinates of the decoded points
    #[test]
    fn test_witnesses_satisfy_curve_equations() {
        let (public_key, signature) = scenario();

        let (x1, y1) = public_key.point().to_affine_coordinates().unwrap();
        assert_eq!(y1.to_bytes(), public_key.y_coordinate());
        assert_eq!(y1.square(), curve::g1_curve_rhs(&x1));

        let (x2, y2) = signature.point().to_affine_coordinates().unwrap();
        let witness = signature.y_coordinate();
        assert_eq!(y2.c0.to_bytes()[..], witness[..48]);
        assert_eq!(y2.c1.to_bytes()[..], witness[48..]);
        assert_eq!(y2.square(), curve::g2_curve_rhs(&x2));
    }
}
