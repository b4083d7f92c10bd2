//! The `BLS` verifier library.
//!
//! Verification runs against the chain's precompiles only: SHA-256 for
//! `expand_message_xmd`, MODEXP for reductions, inversions and square roots,
//! and the EIP-2537 map, add and pairing operations. Other field arithmetic is
//! done in-contract and charged per operation.
//!
//! Wrong input lengths revert. Every other invalid input (bad flags,
//! non-canonical coordinates, points off the curve, the identity public key,
//! a subgroup failure reported by the pairing precompile) returns `false`.

use crate::abi::{decode_args, IBls, SolCall};
use crate::application_engine::ApplicationEngine;
use crate::contract::{CallContext, Contract, ContractMethod, ReturnKind};
use crate::error::{ChainError, ChainResult};
use crate::precompiles::Precompile;
use alloy_primitives::U256;
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use popsig_bls12_381::constants::{
    COMPRESSION_FLAG, FLAG_MASK, HASH_TO_FIELD_L, INFINITY_FLAG, MODULUS, SIGN_FLAG,
    XMD_BLOCK_SIZE, XMD_HASH_SIZE,
};
use popsig_bls12_381::{Fp, Fp2, G1Point};
use popsig_config::{
    BLS_LIBRARY_FQN, FP_SIZE, PADDED_G1_SIZE, PADDED_G2_SIZE, POP_SIGNATURE_DST, PUBLIC_KEY_SIZE,
    SIGNATURE_SIZE,
};
use tracing::debug;

/// Dispatch price of the library methods
pub const VERIFY_GAS: u64 = 1_000;

/// Bytes of uniform output hashed to the two Fp2 elements
const EXPAND_LEN: usize = 4 * HASH_TO_FIELD_L;

static NEG_G1: Lazy<[u8; PADDED_G1_SIZE]> = Lazy::new(|| (-G1Point::generator()).to_padded());

/// (p + 1) / 2, the inverse of 2
static TWO_INV: Lazy<Fp> = Lazy::new(|| Fp::from_biguint((Fp::modulus() + 1u32) >> 1usize));

/// 4(1 + u), the G2 curve constant
static G2_B: Lazy<Fp2> = Lazy::new(|| Fp2::new(Fp::from_u64(4), Fp::from_u64(4)));

/// Affine y-coordinates supplied by the caller so decompression needs no square root.
#[derive(Debug, Clone, Copy)]
pub struct Witnesses<'w> {
    /// 48 bytes, big-endian
    pub public_key_y: &'w [u8],
    /// 96 bytes, `c0 || c1`
    pub signature_y: &'w [u8],
}

/// Verifier step result: `None` means the signature is rejected.
type Check<T> = ChainResult<Option<T>>;

fn reject<T>(reason: &str) -> Check<T> {
    debug!(reason, "signature rejected");
    Ok(None)
}

/// Metered verification over an engine.
pub struct Verifier<'e, 'a> {
    engine: &'e mut ApplicationEngine<'a>,
}

impl<'e, 'a> Verifier<'e, 'a> {
    pub fn new(engine: &'e mut ApplicationEngine<'a>) -> Self {
        Self { engine }
    }

    /// `verify(pk, message, signature)`, optionally with decompression witnesses.
    pub fn verify(
        &mut self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
        witnesses: Option<Witnesses<'_>>,
    ) -> ChainResult<bool> {
        if public_key.len() != PUBLIC_KEY_SIZE {
            return Err(ChainError::revert("invalid public key length"));
        }
        if signature.len() != SIGNATURE_SIZE {
            return Err(ChainError::revert("invalid signature length"));
        }
        if let Some(w) = &witnesses {
            if w.public_key_y.len() != FP_SIZE || w.signature_y.len() != 2 * FP_SIZE {
                return Err(ChainError::revert("invalid witness length"));
            }
        }

        let Some(pk) = self.decode_g1(public_key, witnesses.map(|w| w.public_key_y))? else {
            return Ok(false);
        };
        let Some(sig) = self.decode_g2(signature, witnesses.map(|w| w.signature_y))? else {
            return Ok(false);
        };
        let Some(hash) = self.hash_to_g2(message)? else {
            return Ok(false);
        };

        let mut input = Vec::with_capacity(2 * (PADDED_G1_SIZE + PADDED_G2_SIZE));
        input.extend_from_slice(&pk);
        input.extend_from_slice(&hash);
        input.extend_from_slice(&*NEG_G1);
        input.extend_from_slice(&sig);
        let Some(output) = self.precompile(Precompile::Bls12PairingCheck, &input)? else {
            return Ok(false);
        };
        Ok(output.last() == Some(&1))
    }

    fn ops(&mut self, count: u64) -> ChainResult<()> {
        self.engine.charge_field_ops(count)
    }

    fn precompile(&mut self, precompile: Precompile, input: &[u8]) -> Check<Vec<u8>> {
        match self.engine.precompile(precompile, input)? {
            Ok(output) => Ok(Some(output)),
            Err(err) => {
                debug!(%precompile, %err, "precompile failed");
                Ok(None)
            }
        }
    }

    /// `base^exponent mod p` through MODEXP, for any base length
    fn modexp(&mut self, base: &[u8], exponent: &[u8]) -> Check<Fp> {
        let mut input = Vec::with_capacity(3 * 32 + base.len() + exponent.len() + FP_SIZE);
        for len in [base.len(), exponent.len(), FP_SIZE] {
            input.extend_from_slice(&U256::from(len).to_be_bytes::<32>());
        }
        input.extend_from_slice(base);
        input.extend_from_slice(exponent);
        input.extend_from_slice(&MODULUS);

        let Some(output) = self.precompile(Precompile::ModExp, &input)? else {
            return Ok(None);
        };
        Ok(Fp::from_bytes(&output).ok())
    }

    fn pow(&mut self, base: &Fp, exponent: &BigUint) -> Check<Fp> {
        self.modexp(&base.to_bytes(), &exponent.to_bytes_be())
    }

    fn sqrt(&mut self, a: &Fp) -> Check<Fp> {
        let Some(root) = self.pow(a, Fp::sqrt_exponent())? else {
            return Ok(None);
        };
        self.ops(2)?;
        Ok((root.square() == *a).then_some(root))
    }

    fn is_square(&mut self, a: &Fp) -> Check<bool> {
        self.ops(1)?;
        if a.is_zero() {
            return Ok(Some(true));
        }
        Ok(self.pow(a, Fp::legendre_exponent())?.map(|l| l.is_one()))
    }

    fn invert(&mut self, a: &Fp) -> Check<Fp> {
        self.ops(1)?;
        if a.is_zero() {
            return Ok(None);
        }
        self.pow(a, Fp::inversion_exponent())
    }

    fn sqrt_fp2(&mut self, a: &Fp2) -> Check<Fp2> {
        self.ops(1)?;
        let candidate = if a.c1.is_zero() {
            if let Some(root) = self.sqrt(&a.c0)? {
                Fp2::from_fp(root)
            } else {
                self.ops(1)?;
                let Some(root) = self.sqrt(&-&a.c0)? else {
                    return Ok(None);
                };
                Fp2::new(Fp::zero(), root)
            }
        } else {
            self.ops(3)?;
            let Some(gamma) = self.sqrt(&a.norm())? else {
                return Ok(None);
            };
            self.ops(2)?;
            let mut delta = &(&a.c0 + &gamma) * &*TWO_INV;
            if self.is_square(&delta)? != Some(true) {
                self.ops(2)?;
                delta = &(&a.c0 - &gamma) * &*TWO_INV;
            }
            let Some(x0) = self.sqrt(&delta)? else {
                return Ok(None);
            };
            self.ops(1)?;
            let Some(inv) = self.invert(&x0.double())? else {
                return Ok(None);
            };
            self.ops(1)?;
            Fp2::new(x0, &a.c1 * &inv)
        };
        self.ops(4)?;
        Ok((candidate.square() == *a).then_some(candidate))
    }

    /// Splits the flag bits off a compressed point; `None` for the identity.
    ///
    /// A canonical identity is all zero apart from the compression and
    /// infinity flags. Anything else carrying the infinity flag, or lacking
    /// the compression flag, is rejected.
    fn parse_flags(bytes: &[u8]) -> Result<Option<(Vec<u8>, bool)>, &'static str> {
        let flags = bytes[0] & FLAG_MASK;
        if flags & COMPRESSION_FLAG == 0 {
            return Err("compression flag not set");
        }
        let mut x = bytes.to_vec();
        x[0] &= !FLAG_MASK;
        if flags & INFINITY_FLAG != 0 {
            if flags & SIGN_FLAG != 0 || x.iter().any(|b| *b != 0) {
                return Err("non-canonical point at infinity");
            }
            return Ok(None);
        }
        Ok(Some((x, flags & SIGN_FLAG != 0)))
    }

    /// Decompresses a public key to its EIP-2537 encoding.
    fn decode_g1(&mut self, bytes: &[u8], witness: Option<&[u8]>) -> Check<Vec<u8>> {
        let (x, sign) = match Self::parse_flags(bytes) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return reject("identity public key"),
            Err(reason) => return reject(reason),
        };
        self.ops(1)?;
        let Ok(x) = Fp::from_bytes(&x) else {
            return reject("public key x is not canonical");
        };

        self.ops(3)?;
        let rhs = &(&x.square() * &x) + &Fp::from_u64(4);
        let y = match witness {
            Some(witness) => {
                let Ok(y) = Fp::from_bytes(witness) else {
                    return reject("public key witness is not canonical");
                };
                self.ops(2)?;
                if y.square() != rhs {
                    return reject("public key witness is not on the curve");
                }
                if y.lexicographically_largest() != sign {
                    return reject("public key witness has the wrong sign");
                }
                y
            }
            None => {
                let Some(y) = self.sqrt(&rhs)? else {
                    return reject("public key is not on the curve");
                };
                self.ops(1)?;
                if y.lexicographically_largest() != sign {
                    -y
                } else {
                    y
                }
            }
        };

        let mut out = Vec::with_capacity(PADDED_G1_SIZE);
        out.extend_from_slice(&x.to_padded_bytes());
        out.extend_from_slice(&y.to_padded_bytes());
        Ok(Some(out))
    }

    /// Decompresses a signature to its EIP-2537 encoding.
    fn decode_g2(&mut self, bytes: &[u8], witness: Option<&[u8]>) -> Check<Vec<u8>> {
        let (x, sign) = match Self::parse_flags(bytes) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return Ok(Some(vec![0u8; PADDED_G2_SIZE])),
            Err(reason) => return reject(reason),
        };
        self.ops(2)?;
        let Ok(x) = Fp2::from_bytes(&x) else {
            return reject("signature x is not canonical");
        };

        self.ops(8)?;
        let rhs = &(&x.square() * &x) + &*G2_B;
        let y = match witness {
            Some(witness) => {
                let (c0, c1) = witness.split_at(FP_SIZE);
                let (Ok(c0), Ok(c1)) = (Fp::from_bytes(c0), Fp::from_bytes(c1)) else {
                    return reject("signature witness is not canonical");
                };
                let y = Fp2::new(c0, c1);
                self.ops(4)?;
                if y.square() != rhs {
                    return reject("signature witness is not on the curve");
                }
                if y.lexicographically_largest() != sign {
                    return reject("signature witness has the wrong sign");
                }
                y
            }
            None => {
                let Some(y) = self.sqrt_fp2(&rhs)? else {
                    return reject("signature is not on the curve");
                };
                self.ops(2)?;
                if y.lexicographically_largest() != sign {
                    -y
                } else {
                    y
                }
            }
        };

        let mut out = Vec::with_capacity(PADDED_G2_SIZE);
        out.extend_from_slice(&x.to_padded_bytes());
        out.extend_from_slice(&y.to_padded_bytes());
        Ok(Some(out))
    }

    fn sha256(&mut self, input: &[u8]) -> Check<Vec<u8>> {
        self.precompile(Precompile::Sha256, input)
    }

    /// `expand_message_xmd` with the signing DST, via the SHA-256 precompile
    fn expand_message(&mut self, message: &[u8]) -> Check<Vec<u8>> {
        let dst = POP_SIGNATURE_DST.as_bytes();
        let mut dst_prime = dst.to_vec();
        dst_prime.push(dst.len() as u8);

        let mut input = vec![0u8; XMD_BLOCK_SIZE];
        input.extend_from_slice(message);
        input.extend_from_slice(&(EXPAND_LEN as u16).to_be_bytes());
        input.push(0);
        input.extend_from_slice(&dst_prime);
        let Some(b_0) = self.sha256(&input)? else {
            return Ok(None);
        };

        let mut uniform = Vec::with_capacity(EXPAND_LEN);
        let mut b_i: Vec<u8> = Vec::new();
        for i in 1..=EXPAND_LEN / XMD_HASH_SIZE {
            let mut block: Vec<u8> = if i == 1 {
                b_0.clone()
            } else {
                self.ops(1)?;
                b_0.iter().zip(&b_i).map(|(a, b)| a ^ b).collect()
            };
            block.push(i as u8);
            block.extend_from_slice(&dst_prime);
            let Some(next) = self.sha256(&block)? else {
                return Ok(None);
            };
            uniform.extend_from_slice(&next);
            b_i = next;
        }
        Ok(Some(uniform))
    }

    /// Hashes `message` to G2 and returns the EIP-2537 encoding.
    fn hash_to_g2(&mut self, message: &[u8]) -> Check<Vec<u8>> {
        let Some(uniform) = self.expand_message(message)? else {
            return Ok(None);
        };

        let mut elements = Vec::with_capacity(4);
        for chunk in uniform.chunks_exact(HASH_TO_FIELD_L) {
            let Some(e) = self.modexp(chunk, &[1])? else {
                return Ok(None);
            };
            elements.push(e);
        }

        let mut points = Vec::with_capacity(2 * PADDED_G2_SIZE);
        for pair in elements.chunks_exact(2) {
            let u = Fp2::new(pair[0].clone(), pair[1].clone());
            let Some(q) = self.precompile(Precompile::Bls12MapFp2ToG2, &u.to_padded_bytes())?
            else {
                return Ok(None);
            };
            points.extend_from_slice(&q);
        }
        self.precompile(Precompile::Bls12G2Add, &points)
    }
}

/// The `BLS` library contract.
pub struct BlsLibrary {
    methods: Vec<ContractMethod>,
}

impl Default for BlsLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl BlsLibrary {
    pub fn new() -> Self {
        Self {
            methods: vec![
                ContractMethod::view::<IBls::verifyCall>(
                    &["pk", "message", "signature"],
                    ReturnKind::Bool,
                    VERIFY_GAS,
                ),
                ContractMethod::view::<IBls::verifyWithWitnessesCall>(
                    &["pk", "message", "signature", "pkY", "sigY"],
                    ReturnKind::Bool,
                    VERIFY_GAS,
                ),
            ],
        }
    }
}

impl Contract for BlsLibrary {
    fn name(&self) -> &str {
        BLS_LIBRARY_FQN
    }

    fn methods(&self) -> &[ContractMethod] {
        &self.methods
    }

    fn invoke(
        &self,
        engine: &mut ApplicationEngine<'_>,
        _context: &CallContext,
        method: &ContractMethod,
        args: &[u8],
    ) -> ChainResult<Vec<u8>> {
        let mut verifier = Verifier::new(engine);
        let selector = method.selector();
        let valid = if selector == IBls::verifyCall::SELECTOR {
            let call = decode_args::<IBls::verifyCall>(args)?;
            verifier.verify(&call.pk, &call.message, &call.signature, None)?
        } else if selector == IBls::verifyWithWitnessesCall::SELECTOR {
            let call = decode_args::<IBls::verifyWithWitnessesCall>(args)?;
            verifier.verify(
                &call.pk,
                &call.message,
                &call.signature,
                Some(Witnesses {
                    public_key_y: &call.pkY,
                    signature_y: &call.sigY,
                }),
            )?
        } else {
            return Err(ChainError::revert(format!("BLS: no method {}", method.name)));
        };
        Ok(IBls::verifyCall::abi_encode_returns(&(valid,)))
    }
}
