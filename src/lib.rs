//! # popsig
//!
//! BLS12-381 proof-of-possession signatures (`BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_`)
//! with an on-chain verifier whose verdicts are checked against the off-chain library.
//!
//! ## Architecture
//!
//! - [`bls`] - keys, signing, verification, proof of possession and hash-to-curve
//! - [`smart_contract`] - in-memory execution environment, precompiles, the `BLS`
//!   library contract, linker and deployer
//! - [`config`] - constants, gas schedule and TOML configuration
//! - [`conformance`] - runs test vectors through both verifiers and compares them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use popsig::prelude::*;
//!
//! let secret_key = Bls12381::key_gen(b"some-secret")?;
//! let public_key = Bls12381::derive_public_key(&secret_key);
//! let signature = Bls12381::sign(&secret_key, b"message")?;
//! assert!(Bls12381::verify(&public_key, b"message", &signature));
//!
//! let mut harness = ConformanceHarness::new()?;
//! let report = harness.run(&builtin_vectors()?)?;
//! assert!(report.all_passed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub use popsig_bls12_381 as bls;
pub use popsig_config as config;
pub use popsig_smart_contract as smart_contract;

pub mod conformance;

pub use conformance::{
    builtin_vectors, ConformanceError, ConformanceHarness, ConformanceReport, TestVector,
    Verdict, VectorReport,
};

/// Common imports
pub mod prelude {
    pub use crate::bls::{Bls12381, Ciphersuite, KeyPair, PublicKey, SecretKey, Signature};
    pub use crate::config::Config;
    pub use crate::conformance::{builtin_vectors, ConformanceHarness, TestVector, Verdict};
    pub use crate::smart_contract::{
        Address, CallOutcome, Deployer, ExecutionEnvironment, LocalChain, Receipt,
    };
}
