//! Solidity interface of the verifier contracts.
//!
//! Call types come from `sol!`; this module adds selector splitting and the
//! strict `bool` decoding receipts rely on.

use crate::error::{ChainError, ChainResult};
use alloy_sol_types::{sol, sol_data, SolType};

pub use alloy_sol_types::SolCall;

/// Size of a function selector
pub const SELECTOR_SIZE: usize = 4;

const BOOL_SIZE: usize = 32;

sol! {
    /// Entry points shared by the `BLS` library and the `BLSTest` consumer.
    interface IBls {
        function verify(bytes pk, bytes message, bytes signature) external view returns (bool);

        function verifyWithWitnesses(
            bytes pk,
            bytes message,
            bytes signature,
            bytes pkY,
            bytes sigY
        ) external view returns (bool);
    }
}

/// Calldata for `verify(pk, message, signature)`
pub fn verify_calldata(public_key: &[u8], message: &[u8], signature: &[u8]) -> Vec<u8> {
    IBls::verifyCall {
        pk: public_key.to_vec().into(),
        message: message.to_vec().into(),
        signature: signature.to_vec().into(),
    }
    .abi_encode()
}

/// Splits calldata into selector and argument payload
pub fn split_selector(calldata: &[u8]) -> ChainResult<([u8; SELECTOR_SIZE], &[u8])> {
    match calldata.split_first_chunk::<SELECTOR_SIZE>() {
        Some((selector, payload)) => Ok((*selector, payload)),
        None => Err(ChainError::invalid_abi(format!(
            "calldata of {} bytes has no selector",
            calldata.len()
        ))),
    }
}

/// Decodes a call's arguments (selector removed), validating every word.
pub fn decode_args<C: SolCall>(payload: &[u8]) -> ChainResult<C> {
    C::abi_decode_raw(payload, true)
        .map_err(|err| ChainError::invalid_abi(format!("{}: {err}", C::SIGNATURE)))
}

/// Decodes a `bool` return value, rejecting dirty high bits
pub fn decode_bool(data: &[u8]) -> ChainResult<bool> {
    if data.len() != BOOL_SIZE {
        return Err(ChainError::invalid_abi(format!(
            "bool return value of {} bytes",
            data.len()
        )));
    }
    sol_data::Bool::abi_decode(data, true)
        .map_err(|err| ChainError::invalid_abi(format!("bool return value: {err}")))
}
