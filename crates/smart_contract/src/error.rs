//! Error types for the execution environment.

use crate::address::Address;
use crate::linker::LinkError;
use thiserror::Error;

/// Result type alias for execution environment operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Execution environment errors.
///
/// `Revert` and `OutOfGas` abort the current call frame and surface in a
/// receipt as [`CallOutcome::Reverted`](crate::chain::CallOutcome) and
/// [`CallOutcome::OutOfGas`](crate::chain::CallOutcome) respectively; the other
/// variants are rejected before any execution takes place.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Execution reverted with a reason.
    #[error("execution reverted: {0}")]
    Revert(String),

    /// The gas limit of the transaction was exhausted.
    #[error("out of gas: {required} required, {remaining} remaining")]
    OutOfGas { required: u64, remaining: u64 },

    /// Deployed code is not runnable: unlinked placeholders or an unknown contract.
    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),

    /// Calldata or return data does not follow the ABI.
    #[error("invalid ABI encoding: {0}")]
    InvalidAbi(String),

    /// Nested calls exceeded the maximum depth.
    #[error("call depth limit {0} exceeded")]
    CallDepthExceeded(usize),

    /// An address literal could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The transaction did not produce the expected outcome.
    #[error("unexpected outcome at {address}: {reason}")]
    UnexpectedOutcome { address: Address, reason: String },

    /// Library linking failed.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Configuration was invalid.
    #[error("configuration error: {0}")]
    Config(#[from] popsig_config::ConfigError),

    /// IO error propagated from the standard library.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialisation/deserialisation error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChainError {
    /// Helper for creating a revert with a reason.
    pub fn revert(reason: impl Into<String>) -> Self {
        Self::Revert(reason.into())
    }

    /// Helper for creating an ABI error with a message.
    pub fn invalid_abi(message: impl Into<String>) -> Self {
        Self::InvalidAbi(message.into())
    }

    /// Helper for creating an invalid bytecode error with a message.
    pub fn invalid_bytecode(message: impl Into<String>) -> Self {
        Self::InvalidBytecode(message.into())
    }

    /// True for errors that abort a call frame rather than reject a transaction.
    pub fn is_revert(&self) -> bool {
        matches!(
            self,
            Self::Revert(_) | Self::OutOfGas { .. } | Self::InvalidAbi(_) | Self::CallDepthExceeded(_)
        )
    }
}
