//! Execution environment and the on-chain BLS verifier.
//!
//! [`LocalChain`] is an in-memory chain with the precompiles the verifier
//! needs (SHA-256, MODEXP and the EIP-2537 BLS12-381 operations). Contracts are
//! native implementations of [`Contract`], found through the code id embedded
//! in their deployed bytecode. Consumer bytecode carries library placeholders
//! that only the [`Linker`] can resolve.
//!
//! ```rust,no_run
//! use popsig_smart_contract::{
//!     contracts, Deployer, ExecutionEnvironment, LocalChain,
//! };
//! use popsig_config::BLS_LIBRARY_FQN;
//!
//! let mut chain = LocalChain::new();
//! let from = chain.deployer()?;
//! let deployment = Deployer::new(&mut chain, from).deploy(
//!     &contracts::bls_library_artifact(),
//!     BLS_LIBRARY_FQN,
//!     &contracts::bls_test_artifact(),
//! )?;
//! # Ok::<(), popsig_smart_contract::ChainError>(())
//! ```

pub mod abi;
pub mod address;
pub mod application_engine;
pub mod artifact;
pub mod chain;
pub mod contract;
pub mod contracts;
pub mod deployer;
pub mod error;
pub mod linker;
pub mod precompiles;

pub use address::Address;
pub use application_engine::ApplicationEngine;
pub use artifact::Artifact;
pub use chain::{Account, CallOutcome, ExecutionEnvironment, LocalChain, Receipt, ReturnValue};
pub use contract::{CallContext, Contract, ContractMethod, ReturnKind};
pub use contracts::ContractRegistry;
pub use deployer::{Deployer, Deployment};
pub use error::{ChainError, ChainResult};
pub use linker::{LibraryAddresses, LinkError, LinkedBytecode, Linker};
pub use precompiles::{Precompile, PrecompileError};
