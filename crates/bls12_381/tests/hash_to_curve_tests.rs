//! Hash-to-G2 tests against RFC 9380 and the bls12_381 crate's own
//! `hash_to_curve` implementation.

use bls12_381::hash_to_curve::{ExpandMsgXmd, HashToCurve};
use bls12_381::G2Projective;
use hex_literal::hex;
use popsig_bls12_381::constants::POP_SIGNATURE_DST;
use popsig_bls12_381::hash_to_curve::{expand_message_xmd, hash_to_field};
use popsig_bls12_381::*;

const RFC_DST: &[u8] = b"QUUX-V01-CS02-with-BLS12381G2_XMD:SHA-256_SSWU_RO_";

fn reference_hash(message: &[u8], dst: &[u8]) -> G2Point {
    G2Point::from_projective(
        <G2Projective as HashToCurve<ExpandMsgXmd<sha2_09::Sha256>>>::hash_to_curve(message, dst),
    )
}

fn reference_encode(message: &[u8], dst: &[u8]) -> G2Point {
    G2Point::from_projective(
        <G2Projective as HashToCurve<ExpandMsgXmd<sha2_09::Sha256>>>::encode_to_curve(
            message, dst,
        ),
    )
}

#[cfg(test)]
mod hash_to_curve_tests {
    use super::*;

    /// RFC 9380 appendix J.10.1, msg = ""
    #[test]
    fn test_rfc_vector_empty_message() {
        let point = hash_to_point(b"", RFC_DST).unwrap();
        let (x, y) = point.to_affine_coordinates().unwrap();

        assert_eq!(
            x.c0.to_bytes(),
            hex!(
                "0141ebfbdca40eb85b87142e130ab689c673cf60f1a3e98d69335266f30d9b8d"
                "4ac44c1038e9dcdd5393faf5c41fb78a"
            )
        );
        assert_eq!(
            x.c1.to_bytes(),
            hex!(
                "05cb8437535e20ecffaef7752baddf98034139c38452458baeefab379ba13dff"
                "5bf5dd71b72418717047f5b0f37da03d"
            )
        );
        assert_eq!(
            y.c0.to_bytes(),
            hex!(
                "0503921d7f6a12805e72940b963c0cf3471c7b2a524950ca195d11062ee75ec0"
                "76daf2d4bc358c4b190c0c98064fdd92"
            )
        );
        assert_eq!(
            y.c1.to_bytes(),
            hex!(
                "12424ac32561493f3fe3c260708a12b7c620e7be00099a974e259ddc7d1f6395"
                "c3c811cdd19f1e8dbf3e9ecfdcbab8d6"
            )
        );
    }

    /// The signing tag hashes the empty message to a fixed point
    #[test]
    fn test_signing_dst_empty_message() {
        let point = hash_to_point(b"", POP_SIGNATURE_DST.as_bytes()).unwrap();
        assert_eq!(
            point.to_compressed(),
            hex!(
                "83b633b06dd88b63ee6180a849fb16f7d4a5823ec8a27294bfe57656c0f319a8"
                "21478ccf453bacdc94ad1b79d95a00e4102504549e1cbd3e95173eefe75a36aa"
                "fcc6427d7f16ddc36daba4fc0ea32b7183d052de00a929950bd9f78c290b3686"
            )
        );
    }

    /// Random oracle hashing agrees with the bls12_381 crate
    #[test]
    fn test_hash_to_point_matches_reference() {
        let messages: [&[u8]; 5] = [
            b"",
            b"abc",
            b"abcdef0123456789",
            &[0x61; 200],
            &hex!("3a896ca4b5db102b9dfd47528b06220a91bd12461dcc86793ce2d591f41ea4f8"),
        ];

        for message in messages {
            for dst in [RFC_DST, POP_SIGNATURE_DST.as_bytes()] {
                let ours = hash_to_point(message, dst).unwrap();
                assert_eq!(ours, reference_hash(message, dst), "message {message:02x?}");
                assert!(ours.is_torsion_free());
            }
        }
    }

    /// Nonuniform encoding agrees with the bls12_381 crate
    #[test]
    fn test_encode_to_point_matches_reference() {
        for message in [&b""[..], b"abc", b"q128_qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq"] {
            assert_eq!(
                encode_to_point(message, RFC_DST).unwrap(),
                reference_encode(message, RFC_DST)
            );
        }
    }

    /// Tags longer than 255 bytes are hashed down on both sides
    #[test]
    fn test_oversize_dst_matches_reference() {
        let dst = vec![b'D'; 300];
        assert_eq!(
            hash_to_point(b"oversize", &dst).unwrap(),
            reference_hash(b"oversize", &dst)
        );
    }

    /// hash_to_point is the sum of the two mapped field elements
    #[test]
    fn test_hash_is_sum_of_mapped_elements() {
        let dst = POP_SIGNATURE_DST.as_bytes();
        let elements = hash_to_field(b"split", dst, 2).unwrap();
        let q0 = map_fp2_to_g2(&elements[0]).unwrap();
        let q1 = map_fp2_to_g2(&elements[1]).unwrap();

        assert_eq!(q0 + q1, hash_to_point(b"split", dst).unwrap());
    }

    /// The expander output feeds hash_to_field in 64-byte chunks
    #[test]
    fn test_hash_to_field_uses_expander() {
        let dst = POP_SIGNATURE_DST.as_bytes();
        let uniform = expand_message_xmd(b"chunks", dst, 256).unwrap();
        let elements = hash_to_field(b"chunks", dst, 2).unwrap();

        assert_eq!(elements[0].c0, Fp::from_be_bytes_reduced(&uniform[..64]));
        assert_eq!(elements[0].c1, Fp::from_be_bytes_reduced(&uniform[64..128]));
        assert_eq!(elements[1].c0, Fp::from_be_bytes_reduced(&uniform[128..192]));
        assert_eq!(elements[1].c1, Fp::from_be_bytes_reduced(&uniform[192..]));
    }
}
