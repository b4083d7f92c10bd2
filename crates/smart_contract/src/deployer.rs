//! Deploy pipeline: library first, then link, then the consumer.

use crate::address::Address;
use crate::artifact::Artifact;
use crate::chain::{CallOutcome, ExecutionEnvironment, Receipt};
use crate::error::{ChainError, ChainResult};
use crate::linker::{LibraryAddresses, LinkedBytecode, Linker};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Addresses produced by a full deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub library: Address,
    pub consumer: Address,
}

/// Deploys a library and a consumer that links against it, from one account.
pub struct Deployer<'e, E: ExecutionEnvironment> {
    env: &'e mut E,
    from: Address,
}

impl<'e, E: ExecutionEnvironment> Deployer<'e, E> {
    pub fn new(env: &'e mut E, from: Address) -> Self {
        Self { env, from }
    }

    fn expect_deployed(receipt: Receipt, what: &str) -> ChainResult<Address> {
        receipt
            .deployed_address()
            .ok_or_else(|| ChainError::UnexpectedOutcome {
                address: Address::ZERO,
                reason: format!(
                    "{what} deployment failed: {}",
                    match &receipt.outcome {
                        CallOutcome::Reverted(reason) => reason.as_str(),
                        CallOutcome::OutOfGas => "out of gas",
                        _ => "no contract created",
                    }
                ),
            })
    }

    /// Step 1: deploys the library, which must not reference other libraries.
    pub fn deploy_library(&mut self, library: &Artifact) -> ChainResult<Address> {
        let receipt = self.env.deploy_artifact(self.from, library)?;
        let address = Self::expect_deployed(receipt, "library")?;
        info!(%address, "library deployed");
        Ok(address)
    }

    /// Step 2: resolves the consumer's placeholders against `library`.
    pub fn link(
        &self,
        consumer: &Artifact,
        library_name: &str,
        library: Address,
    ) -> ChainResult<LinkedBytecode> {
        let libraries = LibraryAddresses::new().with(library_name, library);
        Ok(Linker::link(consumer, &libraries)?)
    }

    /// Step 3: deploys the linked consumer.
    pub fn deploy_consumer(&mut self, code: &LinkedBytecode) -> ChainResult<Address> {
        let receipt = self.env.deploy(self.from, code)?;
        let address = Self::expect_deployed(receipt, "consumer")?;
        info!(%address, "consumer deployed");
        Ok(address)
    }

    /// All three steps.
    pub fn deploy(
        &mut self,
        library: &Artifact,
        library_name: &str,
        consumer: &Artifact,
    ) -> ChainResult<Deployment> {
        let library_address = self.deploy_library(library)?;
        let code = self.link(consumer, library_name, library_address)?;
        let consumer_address = self.deploy_consumer(&code)?;
        Ok(Deployment {
            library: library_address,
            consumer: consumer_address,
        })
    }
}
