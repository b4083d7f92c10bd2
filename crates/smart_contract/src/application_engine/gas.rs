//! Gas accounting for a single transaction.

use crate::error::{ChainError, ChainResult};
use tracing::trace;

/// Gas manager for handling gas consumption and limits.
#[derive(Debug, Clone)]
pub struct GasManager {
    /// Gas consumed by the execution.
    gas_consumed: u64,

    /// Maximum gas allowed.
    gas_limit: u64,
}

impl GasManager {
    /// Creates a new gas manager.
    pub fn new(gas_limit: u64) -> Self {
        Self {
            gas_consumed: 0,
            gas_limit,
        }
    }

    /// Gets the gas consumed.
    pub fn gas_consumed(&self) -> u64 {
        self.gas_consumed
    }

    /// Gets the gas limit.
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Gets the remaining gas.
    pub fn remaining_gas(&self) -> u64 {
        self.gas_limit - self.gas_consumed
    }

    /// Consumes gas, failing without charging anything if the limit would be exceeded.
    pub fn consume_gas(&mut self, gas: u64, what: &str) -> ChainResult<()> {
        self.check_gas(gas)?;
        self.gas_consumed += gas;
        trace!(gas, what, consumed = self.gas_consumed, limit = self.gas_limit, "gas consumed");
        Ok(())
    }

    /// Checks if enough gas is available.
    pub fn check_gas(&self, required_gas: u64) -> ChainResult<()> {
        if required_gas > self.remaining_gas() {
            return Err(ChainError::OutOfGas {
                required: required_gas,
                remaining: self.remaining_gas(),
            });
        }
        Ok(())
    }
}
