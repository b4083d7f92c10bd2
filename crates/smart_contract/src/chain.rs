//! The execution environment: accounts, transactions and receipts.

use crate::abi::{decode_bool, split_selector};
use crate::address::Address;
use crate::application_engine::ApplicationEngine;
use crate::artifact::Artifact;
use crate::contract::ReturnKind;
use crate::contracts::ContractRegistry;
use crate::error::{ChainError, ChainResult};
use crate::linker::{LibraryAddresses, LinkedBytecode, Linker};
use popsig_config::{ChainConfig, Config, GasSchedule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// An account: externally owned when `code` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    pub code: Vec<u8>,
}

/// Decoded return data of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnValue {
    Bool(bool),
    Bytes(Vec<u8>),
}

/// What a transaction did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    Deployed(Address),
    Returned(ReturnValue),
    Reverted(String),
    /// The transaction hit the gas limit and burned all of it.
    OutOfGas,
}

/// Result of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub outcome: CallOutcome,
    pub gas_used: u64,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, CallOutcome::Reverted(_) | CallOutcome::OutOfGas)
    }

    pub fn is_out_of_gas(&self) -> bool {
        self.outcome == CallOutcome::OutOfGas
    }

    pub fn deployed_address(&self) -> Option<Address> {
        match self.outcome {
            CallOutcome::Deployed(address) => Some(address),
            _ => None,
        }
    }

    pub fn return_bool(&self) -> Option<bool> {
        match self.outcome {
            CallOutcome::Returned(ReturnValue::Bool(value)) => Some(value),
            _ => None,
        }
    }

    pub fn revert_reason(&self) -> Option<&str> {
        match &self.outcome {
            CallOutcome::Reverted(reason) => Some(reason),
            _ => None,
        }
    }
}

/// A chain that can host contracts.
///
/// A failed transaction is an `Ok` receipt with [`CallOutcome::Reverted`] or
/// [`CallOutcome::OutOfGas`];
/// `Err` means the transaction could not be executed at all.
pub trait ExecutionEnvironment {
    /// Creates a contract from linked bytecode.
    fn deploy(&mut self, from: Address, code: &LinkedBytecode) -> ChainResult<Receipt>;

    /// Sends `calldata` to `to`.
    fn call(&mut self, from: Address, to: Address, calldata: &[u8]) -> ChainResult<Receipt>;

    fn nonce(&self, address: &Address) -> u64;

    fn code(&self, address: &Address) -> Option<&[u8]>;

    /// Deploys an artifact that references no libraries.
    fn deploy_artifact(&mut self, from: Address, artifact: &Artifact) -> ChainResult<Receipt> {
        if artifact.has_unresolved_placeholders() {
            return Err(ChainError::invalid_bytecode(format!(
                "bytecode references unlinked libraries: {}",
                artifact.libraries().join(", ")
            )));
        }
        let code = Linker::link(artifact, &LibraryAddresses::new())?;
        self.deploy(from, &code)
    }
}

/// In-memory chain running registered native contracts.
pub struct LocalChain {
    config: ChainConfig,
    schedule: GasSchedule,
    accounts: BTreeMap<Address, Account>,
    registry: ContractRegistry,
}

impl Default for LocalChain {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalChain {
    /// Chain with default configuration and the default contracts.
    pub fn new() -> Self {
        Self::with_registry(
            ChainConfig::default(),
            GasSchedule::default(),
            ContractRegistry::with_defaults(),
        )
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_registry(
            config.chain.clone(),
            config.gas.clone(),
            ContractRegistry::with_defaults(),
        )
    }

    pub fn with_registry(
        config: ChainConfig,
        schedule: GasSchedule,
        registry: ContractRegistry,
    ) -> Self {
        Self {
            config,
            schedule,
            accounts: BTreeMap::new(),
            registry,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn gas_limit(&self) -> u64 {
        self.config.gas_limit
    }

    pub fn set_gas_limit(&mut self, gas_limit: u64) {
        self.config.gas_limit = gas_limit;
    }

    pub fn schedule(&self) -> &GasSchedule {
        &self.schedule
    }

    /// The configured deployer account
    pub fn deployer(&self) -> ChainResult<Address> {
        self.config.deployer.parse()
    }

    fn bump_nonce(&mut self, address: Address) -> u64 {
        let account = self.accounts.entry(address).or_default();
        let nonce = account.nonce;
        account.nonce += 1;
        nonce
    }

    /// Return kind of the method `calldata` selects on `to`, if it is a known contract
    fn return_kind(&self, to: &Address, calldata: &[u8]) -> Option<ReturnKind> {
        let code = self.code(to)?;
        let contract = self.registry.resolve(code)?;
        let (selector, _) = split_selector(calldata).ok()?;
        contract.find_method(&selector).map(|method| method.returns)
    }

    fn out_of_gas(&self, what: &str) -> Receipt {
        debug!(what, gas_limit = self.config.gas_limit, "transaction ran out of gas");
        Receipt {
            outcome: CallOutcome::OutOfGas,
            gas_used: self.config.gas_limit,
        }
    }
}

impl ExecutionEnvironment for LocalChain {
    fn deploy(&mut self, from: Address, code: &LinkedBytecode) -> ChainResult<Receipt> {
        let name = self
            .registry
            .resolve(code.as_bytes())
            .map(|contract| contract.name().to_string())
            .ok_or_else(|| {
                ChainError::invalid_bytecode("bytecode does not match any known contract")
            })?;

        let gas = self
            .schedule
            .intrinsic_gas(code.as_bytes(), true)
            .saturating_add(self.schedule.code_deposit_per_byte * code.len() as u64);
        let nonce = self.bump_nonce(from);
        if gas > self.config.gas_limit {
            return Ok(self.out_of_gas("create"));
        }

        let address = Address::create(&from, nonce);
        self.accounts.insert(
            address,
            Account {
                nonce: 1,
                code: code.as_bytes().to_vec(),
            },
        );
        info!(contract = %name, %address, %from, gas_used = gas, "deployed contract");

        Ok(Receipt {
            outcome: CallOutcome::Deployed(address),
            gas_used: gas,
        })
    }

    fn call(&mut self, from: Address, to: Address, calldata: &[u8]) -> ChainResult<Receipt> {
        let intrinsic = self.schedule.intrinsic_gas(calldata, false);
        self.bump_nonce(from);
        if intrinsic > self.config.gas_limit {
            return Ok(self.out_of_gas("call"));
        }

        let mut engine = ApplicationEngine::new(
            &self.accounts,
            &self.registry,
            &self.schedule,
            self.config.gas_limit - intrinsic,
        );
        let result = engine.call_contract(from, to, calldata);
        let gas_used = intrinsic + engine.gas_consumed();

        let output = match result {
            Ok(output) => output,
            Err(ChainError::OutOfGas { .. }) => return Ok(self.out_of_gas("call")),
            Err(err) if err.is_revert() => {
                debug!(%to, reason = %err, gas_used, "call reverted");
                return Ok(Receipt {
                    outcome: CallOutcome::Reverted(err.to_string()),
                    gas_used,
                });
            }
            Err(err) => return Err(err),
        };

        let value = match self.return_kind(&to, calldata) {
            Some(ReturnKind::Bool) => ReturnValue::Bool(decode_bool(&output)?),
            _ => ReturnValue::Bytes(output),
        };
        debug!(%to, ?value, gas_used, "call returned");

        Ok(Receipt {
            outcome: CallOutcome::Returned(value),
            gas_used,
        })
    }

    fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |account| account.nonce)
    }

    fn code(&self, address: &Address) -> Option<&[u8]> {
        self.accounts
            .get(address)
            .map(|account| account.code.as_slice())
            .filter(|code| !code.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{bls_library_artifact, bls_test_artifact};
    use crate::precompiles::Precompile;
    use hex_literal::hex;

    #[test]
    fn test_deploy_assigns_create_addresses() {
        let mut chain = LocalChain::new();
        let deployer = chain.deployer().unwrap();

        let receipt = chain.deploy_artifact(deployer, &bls_library_artifact()).unwrap();
        assert_eq!(
            receipt.deployed_address().unwrap().as_bytes(),
            &hex!("f2e246bb76df876cef8b38ae84130f4f55de395b")
        );
        assert_eq!(chain.nonce(&deployer), 1);

        let address = receipt.deployed_address().unwrap();
        assert_eq!(chain.nonce(&address), 1);
        assert!(chain.code(&address).is_some());
        assert!(chain.code(&deployer).is_none());
    }

    #[test]
    fn test_unlinked_artifact_is_rejected() {
        let mut chain = LocalChain::new();
        let deployer = chain.deployer().unwrap();

        let err = chain.deploy_artifact(deployer, &bls_test_artifact()).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBytecode(_)));
        assert_eq!(chain.nonce(&deployer), 0);
    }

    #[test]
    fn test_unknown_bytecode_is_rejected() {
        let mut chain = LocalChain::new();
        let mut artifact = bls_library_artifact();
        artifact.bytecode.object = "0x6080604052".to_string();

        let err = chain.deploy_artifact(Address::ZERO, &artifact).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBytecode(_)));
    }

    #[test]
    fn test_deploy_out_of_gas() {
        let mut chain = LocalChain::new();
        chain.set_gas_limit(30_000);

        let receipt = chain.deploy_artifact(Address::ZERO, &bls_library_artifact()).unwrap();
        assert!(!receipt.is_success());
        assert_eq!(receipt.gas_used, 30_000);
        assert!(receipt.is_out_of_gas());
        assert_eq!(receipt.revert_reason(), None);
    }

    #[test]
    fn test_call_out_of_gas_burns_limit() {
        let mut chain = LocalChain::new();
        let from = chain.deployer().unwrap();
        chain.set_gas_limit(21_000);

        // Intrinsic cost alone exceeds the limit
        let receipt = chain.call(from, Precompile::Sha256.address(), b"abc").unwrap();
        assert_eq!(receipt.outcome, CallOutcome::OutOfGas);
        assert_eq!(receipt.gas_used, 21_000);

        // The precompile itself runs out
        let input = [0u8; 4096];
        let limit = chain.schedule().intrinsic_gas(&input, false) + 100;
        chain.set_gas_limit(limit);
        let receipt = chain.call(from, Precompile::Sha256.address(), &input).unwrap();
        assert!(receipt.is_out_of_gas());
        assert_eq!(receipt.gas_used, limit);
        assert_eq!(chain.nonce(&from), 2);
    }

    #[test]
    fn test_call_precompile_and_empty_account() {
        let mut chain = LocalChain::new();
        let from = chain.deployer().unwrap();

        let receipt = chain.call(from, Precompile::Sha256.address(), b"abc").unwrap();
        assert_eq!(
            receipt.outcome,
            CallOutcome::Returned(ReturnValue::Bytes(
                hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad").to_vec()
            ))
        );

        let receipt = chain.call(from, Address::new([0x42; 20]), &[1, 2, 3]).unwrap();
        assert_eq!(receipt.outcome, CallOutcome::Returned(ReturnValue::Bytes(Vec::new())));
        assert_eq!(chain.nonce(&from), 2);
    }

    #[test]
    fn test_receipt_helpers() {
        let receipt = Receipt {
            outcome: CallOutcome::Returned(ReturnValue::Bool(true)),
            gas_used: 1,
        };
        assert!(receipt.is_success());
        assert_eq!(receipt.return_bool(), Some(true));
        assert_eq!(receipt.deployed_address(), None);
        assert_eq!(receipt.revert_reason(), None);
        assert!(!receipt.is_out_of_gas());
    }
}
