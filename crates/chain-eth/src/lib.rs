//! Ethereum-side support for the CrossBridge client.
//!
//! This crate provides:
//! - Address parsing, EIP-55 checksums and secp256k1 key-to-address derivation
//! - A minimal ABI codec with dynamic `string` support
//! - Calldata for the wrapped SOL token (`burn`, `balanceOf`, `decimals`, `symbol`)
//! - EIP-1559 transaction encoding and signing
//! - Supported EVM network definitions

pub mod abi;
pub mod address;
pub mod chains;
pub mod error;
pub mod transaction;
pub mod wrapped_token;

pub use alloy_primitives::U256;
pub use error::EthError;
