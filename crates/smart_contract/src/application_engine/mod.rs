//! Per-transaction execution context.
//!
//! An `ApplicationEngine` borrows the chain state read-only, meters gas for one
//! transaction and dispatches nested calls and precompile invocations.

pub mod gas;

pub use gas::GasManager;

use crate::abi::split_selector;
use crate::address::Address;
use crate::chain::Account;
use crate::contract::CallContext;
use crate::contracts::ContractRegistry;
use crate::error::{ChainError, ChainResult};
use crate::precompiles::{Precompile, PrecompileError};
use popsig_config::GasSchedule;
use std::collections::BTreeMap;
use tracing::trace;

/// Maximum nesting of contract calls.
pub const MAX_CALL_DEPTH: usize = 1024;

pub struct ApplicationEngine<'a> {
    accounts: &'a BTreeMap<Address, Account>,
    registry: &'a ContractRegistry,
    schedule: &'a GasSchedule,
    gas: GasManager,
    depth: usize,
}

impl<'a> ApplicationEngine<'a> {
    pub fn new(
        accounts: &'a BTreeMap<Address, Account>,
        registry: &'a ContractRegistry,
        schedule: &'a GasSchedule,
        gas_limit: u64,
    ) -> Self {
        Self {
            accounts,
            registry,
            schedule,
            gas: GasManager::new(gas_limit),
            depth: 0,
        }
    }

    pub fn gas_manager(&self) -> &GasManager {
        &self.gas
    }

    pub fn gas_consumed(&self) -> u64 {
        self.gas.gas_consumed()
    }

    pub fn schedule(&self) -> &GasSchedule {
        self.schedule
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Charges `gas`, failing with `OutOfGas` when the limit would be exceeded.
    pub fn charge(&mut self, gas: u64, what: &str) -> ChainResult<()> {
        self.gas.consume_gas(gas, what)
    }

    /// Charges `count` native field operations.
    pub fn charge_field_ops(&mut self, count: u64) -> ChainResult<()> {
        let gas = self.schedule.field_op.saturating_mul(count);
        self.gas.consume_gas(gas, "field ops")
    }

    /// Deployed code at `address`.
    pub fn code(&self, address: &Address) -> Option<&'a [u8]> {
        let accounts: &'a BTreeMap<Address, Account> = self.accounts;
        accounts
            .get(address)
            .map(|account| account.code.as_slice())
            .filter(|code| !code.is_empty())
    }

    /// Runs a precompile.
    ///
    /// The outer result fails only when gas runs out; the inner result is the
    /// precompile's own success or failure, which the caller may handle.
    pub fn precompile(
        &mut self,
        precompile: Precompile,
        input: &[u8],
    ) -> ChainResult<Result<Vec<u8>, PrecompileError>> {
        let cost = self
            .schedule
            .call_base
            .saturating_add(precompile.gas_cost(input, self.schedule));
        self.charge(cost, precompile.name())?;
        let result = precompile.execute(input);
        trace!(
            %precompile,
            input_len = input.len(),
            gas = cost,
            ok = result.is_ok(),
            "precompile call"
        );
        Ok(result)
    }

    /// Calls `target` with `calldata` on behalf of `caller`.
    ///
    /// Calls to accounts without code succeed with empty output; calls to a
    /// precompile address revert when the precompile fails.
    pub fn call_contract(
        &mut self,
        caller: Address,
        target: Address,
        calldata: &[u8],
    ) -> ChainResult<Vec<u8>> {
        if let Some(precompile) = Precompile::from_address(&target) {
            return self
                .precompile(precompile, calldata)?
                .map_err(|err| ChainError::revert(err.to_string()));
        }

        self.charge(self.schedule.call_base, "call")?;
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ChainError::CallDepthExceeded(MAX_CALL_DEPTH));
        }

        let Some(code) = self.code(&target) else {
            trace!(%target, "call to account without code");
            return Ok(Vec::new());
        };
        let registry: &'a ContractRegistry = self.registry;
        let contract = registry.resolve(code).ok_or_else(|| {
            ChainError::invalid_bytecode(format!("no contract registered for code at {target}"))
        })?;

        let (selector, args) = split_selector(calldata)?;
        let method = contract.find_method(&selector).ok_or_else(|| {
            ChainError::revert(format!(
                "{}: unknown selector 0x{}",
                contract.name(),
                hex::encode(selector)
            ))
        })?;
        self.charge(method.gas_cost, &method.name)?;

        trace!(contract = contract.name(), method = %method.name, depth = self.depth, "call");
        let context = CallContext {
            address: target,
            caller,
        };
        self.depth += 1;
        let result = contract.invoke(self, &context, method, args);
        self.depth -= 1;
        result
    }
}
