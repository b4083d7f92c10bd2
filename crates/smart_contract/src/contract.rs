//! Base contract trait and method descriptors.

use crate::abi::{SolCall, SELECTOR_SIZE};
use crate::address::Address;
use crate::application_engine::ApplicationEngine;
use crate::error::ChainResult;
use alloy_primitives::keccak256;
use serde::{Deserialize, Serialize};

/// Return type of a contract method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
    Bool,
    Bytes,
}

impl ReturnKind {
    pub fn abi_type(&self) -> &'static str {
        match self {
            ReturnKind::Bool => "bool",
            ReturnKind::Bytes => "bytes",
        }
    }
}

/// Represents a method of a contract. Every parameter is ABI `bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractMethod {
    /// The name of the method.
    pub name: String,

    /// Parameter names, in order.
    pub params: Vec<String>,

    /// The return type.
    pub returns: ReturnKind,

    /// Gas charged on dispatch, before the method body runs.
    pub gas_cost: u64,

    /// Whether the method is read-only.
    pub view: bool,

    selector: [u8; SELECTOR_SIZE],
}

impl ContractMethod {
    /// Creates a read-only method for the `sol!` call type `C`.
    pub fn view<C: SolCall>(params: &[&str], returns: ReturnKind, gas_cost: u64) -> Self {
        let name = C::SIGNATURE
            .split_once('(')
            .map_or(C::SIGNATURE, |(name, _)| name);
        Self {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            returns,
            gas_cost,
            view: true,
            selector: C::SELECTOR,
        }
    }

    /// Canonical signature, e.g. `verify(bytes,bytes,bytes)`
    pub fn signature(&self) -> String {
        let types = vec!["bytes"; self.params.len()].join(",");
        format!("{}({})", self.name, types)
    }

    pub fn selector(&self) -> [u8; SELECTOR_SIZE] {
        self.selector
    }
}

/// The frame a method runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// The contract being executed.
    pub address: Address,

    /// The account or contract that called it.
    pub caller: Address,
}

/// Trait for contracts the execution environment can run.
///
/// Deployed code carries the keccak hash of the contract's fully-qualified
/// name; the environment resolves that hash to an implementation of this trait.
pub trait Contract: Send + Sync {
    /// Fully-qualified name, `path/to/File.sol:Name`.
    fn name(&self) -> &str;

    /// Libraries this contract links against, by fully-qualified name.
    fn libraries(&self) -> &[&'static str] {
        &[]
    }

    /// Gets the supported methods of the contract.
    fn methods(&self) -> &[ContractMethod];

    /// Invokes `method` with its ABI-encoded argument payload (selector removed).
    fn invoke(
        &self,
        engine: &mut ApplicationEngine<'_>,
        context: &CallContext,
        method: &ContractMethod,
        args: &[u8],
    ) -> ChainResult<Vec<u8>>;

    /// The code identifier embedded in deployed bytecode.
    fn code_id(&self) -> [u8; 32] {
        keccak256(self.name().as_bytes()).0
    }

    /// Finds a method by selector.
    fn find_method(&self, selector: &[u8; SELECTOR_SIZE]) -> Option<&ContractMethod> {
        self.methods().iter().find(|m| m.selector() == *selector)
    }
}
