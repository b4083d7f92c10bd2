//! Error types for BLS12-381 operations.

use thiserror::Error;

/// BLS12-381 operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlsError {
    /// Wrong byte length for a key
    #[error("Invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    /// Wrong byte length for a signature
    #[error("Invalid signature size: expected {expected}, got {actual}")]
    InvalidSignatureSize { expected: usize, actual: usize },

    /// Wrong byte length for any other encoding
    #[error("Invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Bad flag bits, non-canonical coordinates or non-zero padding
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Point is not on the curve")]
    NotOnCurve,

    #[error("Point is not in the prime-order subgroup")]
    NotInSubgroup,

    /// The point at infinity where a proper point is required
    #[error("Unexpected identity point")]
    IdentityPoint,

    /// Zero or out-of-range secret scalar
    #[error("Invalid scalar: {0}")]
    InvalidScalar(String),

    #[error("Seed too short: need at least {minimum} bytes, got {actual}")]
    InsufficientSeedLength { minimum: usize, actual: usize },

    #[error("Attempted to invert zero")]
    ZeroInversion,

    #[error("expand_message_xmd failed: {0}")]
    ExpandMessage(String),

    #[error("Invalid domain separation tag: {0}")]
    InvalidDst(String),

    #[error("Hex decoding error: {0}")]
    HexError(#[from] hex::FromHexError),
}

/// Result type for BLS operations
pub type BlsResult<T> = std::result::Result<T, BlsError>;

impl BlsError {
    /// Creates an encoding error
    pub fn invalid_encoding<S: Into<String>>(msg: S) -> Self {
        BlsError::InvalidEncoding(msg.into())
    }

    /// Creates a scalar error
    pub fn invalid_scalar<S: Into<String>>(msg: S) -> Self {
        BlsError::InvalidScalar(msg.into())
    }

    /// True for input that does not even have the shape of an encoding.
    ///
    /// Verification reports these as errors; every other decoding failure
    /// makes verification return `false`.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            BlsError::InvalidKeySize { .. }
                | BlsError::InvalidSignatureSize { .. }
                | BlsError::InvalidLength { .. }
                | BlsError::HexError(_)
        )
    }
}
