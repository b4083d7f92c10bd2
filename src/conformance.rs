//! Off-chain / on-chain parity harness.
//!
//! Each [`TestVector`] is verified by `Bls12381::verify_bytes` and by the
//! `BLSTest` consumer on a fresh deployment. Both answers are mapped to a
//! [`Verdict`]; a vector passes when they agree with each other and with the
//! expected verdict.

use crate::bls::{BlsError, Bls12381, Ciphersuite};
use crate::config::{Config, BLS_LIBRARY_FQN, PUBLIC_KEY_SIZE};
use crate::smart_contract::abi::verify_calldata;
use crate::smart_contract::contracts::{bls_library_artifact, bls_test_artifact};
use crate::smart_contract::{
    Address, CallOutcome, ChainError, Deployer, Deployment, ExecutionEnvironment, LocalChain,
    Receipt, ReturnValue,
};
use hex_literal::hex;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// Seed of the reference key pair
pub const SCENARIO_SEED: &[u8] = b"some-secret";

/// 32-byte signing root of the reference scenario
pub const SCENARIO_SIGNING_ROOT: [u8; 32] =
    hex!("3a896ca4b5db102b9dfd47528b06220a91bd12461dcc86793ce2d591f41ea4f8");

#[derive(Error, Debug)]
pub enum ConformanceError {
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("BLS error: {0}")]
    Bls(#[from] BlsError),
}

pub type ConformanceResult<T> = Result<T, ConformanceError>;

/// Outcome of a verification, comparable across both verifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Signature is valid
    Accept,
    /// Well-formed input, invalid signature
    Reject,
    /// Input of the wrong shape: an error off-chain, a revert on-chain
    Malformed,
    /// The on-chain call hit the gas limit before reaching a verdict
    OutOfGas,
}

impl Verdict {
    pub fn from_off_chain(result: &Result<bool, BlsError>) -> Self {
        match result {
            Ok(true) => Verdict::Accept,
            Ok(false) => Verdict::Reject,
            Err(_) => Verdict::Malformed,
        }
    }

    pub fn from_receipt(receipt: &Receipt) -> Self {
        match receipt.outcome {
            CallOutcome::Returned(ReturnValue::Bool(true)) => Verdict::Accept,
            CallOutcome::Returned(ReturnValue::Bool(false)) => Verdict::Reject,
            CallOutcome::OutOfGas => Verdict::OutOfGas,
            _ => Verdict::Malformed,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Accept => "accept",
            Verdict::Reject => "reject",
            Verdict::Malformed => "malformed",
            Verdict::OutOfGas => "out-of-gas",
        };
        f.pad(s)
    }
}

/// A verification input with its expected verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    pub name: String,
    pub public_key: Vec<u8>,
    pub message: Vec<u8>,
    pub signature: Vec<u8>,
    pub expect: Verdict,
}

impl TestVector {
    pub fn new(
        name: impl Into<String>,
        public_key: impl Into<Vec<u8>>,
        message: impl Into<Vec<u8>>,
        signature: impl Into<Vec<u8>>,
        expect: Verdict,
    ) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
            message: message.into(),
            signature: signature.into(),
            expect,
        }
    }
}

/// Result of one vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorReport {
    pub name: String,
    pub expected: Verdict,
    pub off_chain: Verdict,
    pub on_chain: Verdict,
    pub gas_used: u64,
}

impl VectorReport {
    /// Both verifiers returned the same verdict
    pub fn agrees(&self) -> bool {
        self.off_chain == self.on_chain
    }

    pub fn passed(&self) -> bool {
        self.agrees() && self.off_chain == self.expected
    }
}

/// Results of a conformance run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub deployment: Deployment,
    pub results: Vec<VectorReport>,
}

impl ConformanceReport {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(VectorReport::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &VectorReport> {
        self.results.iter().filter(|r| !r.passed())
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "library  {}", self.deployment.library)?;
        writeln!(f, "consumer {}", self.deployment.consumer)?;
        writeln!(
            f,
            "{:<28} {:<10} {:<10} {:<10} {:>9}  result",
            "vector", "expected", "off-chain", "on-chain", "gas"
        )?;
        for r in &self.results {
            writeln!(
                f,
                "{:<28} {:<10} {:<10} {:<10} {:>9}  {}",
                r.name,
                r.expected,
                r.off_chain,
                r.on_chain,
                r.gas_used,
                if r.passed() { "ok" } else { "FAIL" }
            )?;
        }
        let passed = self.results.iter().filter(|r| r.passed()).count();
        write!(f, "{passed}/{} vectors passed", self.results.len())
    }
}

/// A local chain with the verifier library and its consumer deployed.
pub struct ConformanceHarness {
    chain: LocalChain,
    from: Address,
    deployment: Deployment,
}

impl ConformanceHarness {
    /// Harness on a chain with the default configuration.
    pub fn new() -> ConformanceResult<Self> {
        Self::with_chain(LocalChain::new())
    }

    pub fn from_config(config: &Config) -> ConformanceResult<Self> {
        Self::with_chain(LocalChain::from_config(config))
    }

    fn with_chain(mut chain: LocalChain) -> ConformanceResult<Self> {
        let from = chain.deployer()?;
        let deployment = Deployer::new(&mut chain, from).deploy(
            &bls_library_artifact(),
            BLS_LIBRARY_FQN,
            &bls_test_artifact(),
        )?;
        Ok(Self {
            chain,
            from,
            deployment,
        })
    }

    pub fn deployment(&self) -> Deployment {
        self.deployment
    }

    pub fn chain(&self) -> &LocalChain {
        &self.chain
    }

    /// Verifies one vector on both sides.
    pub fn run_vector(&mut self, vector: &TestVector) -> ConformanceResult<VectorReport> {
        let off_chain = Verdict::from_off_chain(&Bls12381::verify_bytes(
            &vector.public_key,
            &vector.message,
            &vector.signature,
        ));

        let calldata = verify_calldata(&vector.public_key, &vector.message, &vector.signature);
        let receipt = self
            .chain
            .call(self.from, self.deployment.consumer, &calldata)?;
        let on_chain = Verdict::from_receipt(&receipt);

        let report = VectorReport {
            name: vector.name.clone(),
            expected: vector.expect,
            off_chain,
            on_chain,
            gas_used: receipt.gas_used,
        };
        if report.passed() {
            info!(vector = %report.name, verdict = %on_chain, gas_used = report.gas_used, "vector passed");
        } else {
            warn!(
                vector = %report.name,
                expected = %report.expected,
                %off_chain,
                %on_chain,
                "vector failed"
            );
        }
        Ok(report)
    }

    pub fn run(&mut self, vectors: &[TestVector]) -> ConformanceResult<ConformanceReport> {
        let results = vectors
            .iter()
            .map(|vector| self.run_vector(vector))
            .collect::<ConformanceResult<Vec<_>>>()?;
        Ok(ConformanceReport {
            deployment: self.deployment,
            results,
        })
    }
}

fn flip(bytes: &[u8], index: usize, mask: u8) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out[index] ^= mask;
    out
}

/// The built-in vectors, all derived from the reference scenario.
pub fn builtin_vectors() -> ConformanceResult<Vec<TestVector>> {
    let secret_key = Bls12381::key_gen(SCENARIO_SEED)?;
    let public_key = Bls12381::derive_public_key(&secret_key).to_bytes();
    let signature = Bls12381::sign(&secret_key, &SCENARIO_SIGNING_ROOT)?.to_bytes();
    let root = SCENARIO_SIGNING_ROOT;

    let other_key = Bls12381::key_gen(b"another-secret")?;
    let other_public_key = Bls12381::derive_public_key(&other_key).to_bytes();

    let foreign = Ciphersuite::proof_of_possession().with_dst(b"POPSIG-FOREIGN-DST".to_vec());
    let foreign_signature = foreign.sign(&secret_key, &root)?.to_bytes();

    let mut identity = [0u8; PUBLIC_KEY_SIZE];
    identity[0] = 0xc0;

    Ok(vec![
        TestVector::new("scenario", public_key, root, signature, Verdict::Accept),
        TestVector::new(
            "signature bit flip",
            public_key,
            root,
            flip(&signature, 95, 0x01),
            Verdict::Reject,
        ),
        TestVector::new(
            "compression flag cleared",
            public_key,
            root,
            flip(&signature, 0, 0x80),
            Verdict::Reject,
        ),
        TestVector::new(
            "truncated signature",
            public_key,
            root,
            &signature[..95],
            Verdict::Malformed,
        ),
        TestVector::new(
            "wrong message",
            public_key,
            b"not the signing root".to_vec(),
            signature,
            Verdict::Reject,
        ),
        TestVector::new("wrong key", other_public_key, root, signature, Verdict::Reject),
        TestVector::new("foreign DST", public_key, root, foreign_signature, Verdict::Reject),
        TestVector::new("identity public key", identity, root, signature, Verdict::Reject),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_from_off_chain() {
        assert_eq!(Verdict::from_off_chain(&Ok(true)), Verdict::Accept);
        assert_eq!(Verdict::from_off_chain(&Ok(false)), Verdict::Reject);
        assert_eq!(
            Verdict::from_off_chain(&Err(BlsError::InvalidSignatureSize {
                expected: 96,
                actual: 95
            })),
            Verdict::Malformed
        );
    }

    #[test]
    fn test_verdict_from_receipt() {
        let receipt = |outcome| Receipt {
            outcome,
            gas_used: 0,
        };
        assert_eq!(
            Verdict::from_receipt(&receipt(CallOutcome::Returned(ReturnValue::Bool(true)))),
            Verdict::Accept
        );
        assert_eq!(
            Verdict::from_receipt(&receipt(CallOutcome::Returned(ReturnValue::Bool(false)))),
            Verdict::Reject
        );
        assert_eq!(
            Verdict::from_receipt(&receipt(CallOutcome::Reverted("x".into()))),
            Verdict::Malformed
        );
        assert_eq!(
            Verdict::from_receipt(&receipt(CallOutcome::OutOfGas)),
            Verdict::OutOfGas
        );
        assert_eq!(format!("{:<12}|", Verdict::OutOfGas), "out-of-gas  |");
    }

    #[test]
    fn test_builtin_vectors_shape() {
        let vectors = builtin_vectors().unwrap();
        assert_eq!(vectors.len(), 8);
        assert_eq!(vectors[0].expect, Verdict::Accept);
        assert_eq!(vectors[3].signature.len(), 95);
        assert!(vectors[1..].iter().all(|v| v.expect != Verdict::Accept));
    }
}
