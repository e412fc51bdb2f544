//! Calldata for the wrapped SOL token contract.
//!
//! The token is a standard ERC-20 with one extra entry point,
//! `burn(uint256 amount, string solanaAddress)`, which destroys `amount`
//! and signals the relayer to release SOL to the given Solana address.

use alloy_primitives::U256;

use crate::abi::{
    decode_string, decode_uint256, decode_uint8, encode_function_call, function_selector, AbiParam,
};
use crate::address::parse_address;
use crate::error::EthError;

pub const BURN_SIGNATURE: &str = "burn(uint256,string)";
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";
pub const DECIMALS_SIGNATURE: &str = "decimals()";
pub const SYMBOL_SIGNATURE: &str = "symbol()";

/// Deployed wrapped SOL contract on Sepolia.
pub const SEPOLIA_WRAPPED_SOL: &str = "0xba82C80E13beDdAE290edf6b016d7f981e43431f";

/// Wrapped SOL mirrors SOL's 9 decimals.
pub const WRAPPED_SOL_DECIMALS: u8 = 9;

/// Encode `burn(amount, solana_destination)`.
///
/// The destination is passed through as a string; the caller validates it
/// as a Solana address.
pub fn encode_burn(amount: U256, solana_destination: &str) -> Result<Vec<u8>, EthError> {
    if amount.is_zero() {
        return Err(EthError::InvalidAmount("burn amount must be > 0".into()));
    }
    if solana_destination.trim().is_empty() {
        return Err(EthError::EncodingError("destination address is empty".into()));
    }

    Ok(encode_function_call(
        function_selector(BURN_SIGNATURE),
        &[
            AbiParam::Uint256(amount),
            AbiParam::String(solana_destination.trim().to_string()),
        ],
    ))
}

/// Encode `balanceOf(owner)`.
pub fn encode_balance_of(owner: &str) -> Result<Vec<u8>, EthError> {
    let owner = parse_address(owner)?;
    Ok(encode_function_call(
        function_selector(BALANCE_OF_SIGNATURE),
        &[AbiParam::Address(owner)],
    ))
}

pub fn encode_decimals() -> Vec<u8> {
    encode_function_call(function_selector(DECIMALS_SIGNATURE), &[])
}

pub fn encode_symbol() -> Vec<u8> {
    encode_function_call(function_selector(SYMBOL_SIGNATURE), &[])
}

pub fn decode_balance(data: &[u8]) -> Result<U256, EthError> {
    decode_uint256(data)
}

pub fn decode_decimals(data: &[u8]) -> Result<u8, EthError> {
    decode_uint8(data)
}

pub fn decode_symbol(data: &[u8]) -> Result<String, EthError> {
    decode_string(data)
}
