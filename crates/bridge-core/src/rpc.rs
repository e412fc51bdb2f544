//! Network seams.
//!
//! The pipeline talks to the chains only through [`SolanaRpc`] and
//! [`EthProvider`]. Both are injected, so a deployment wires in a JSON-RPC
//! client and tests wire in an in-memory mock. Response types mirror the
//! JSON-RPC shapes and deserialize straight from them.

use std::sync::Arc;

use crossbridge_eth::transaction::FeeParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from an RPC endpoint.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// `sendTransaction` preflight rejected the transaction.
    #[error("preflight check failed: {err}")]
    Preflight { err: Value, logs: Vec<String> },

    #[error("blockhash not found")]
    BlockhashNotFound,

    #[error("execution reverted: {0}")]
    ExecutionReverted(String),

    #[error("request timed out: {0}")]
    Timeout(String),
}

/// Commitment levels, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

/// An account as returned by `getAccountInfo` (data already decoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: [u8; 32],
    pub data: Vec<u8>,
    pub executable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// `simulateTransaction` result value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    pub err: Option<Value>,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub units_consumed: Option<u64>,
}

/// One entry of `getSignatureStatuses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    pub err: Option<Value>,
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// Whether the status has reached `commitment`.
    pub fn reached(&self, commitment: Commitment) -> bool {
        match self.confirmation_status {
            Some(status) => status >= commitment,
            // Older nodes omit the field; `confirmations: null` means rooted.
            None => self.confirmations.is_none(),
        }
    }
}

/// The parts of `getTransaction` the pipeline reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub slot: u64,
    pub block_time: Option<i64>,
    pub meta: Option<TransactionMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    pub err: Option<Value>,
    pub fee: u64,
    #[serde(default)]
    pub log_messages: Option<Vec<String>>,
    #[serde(default)]
    pub compute_units_consumed: Option<u64>,
}

impl TransactionRecord {
    pub fn err(&self) -> Option<&Value> {
        self.meta.as_ref().and_then(|m| m.err.as_ref())
    }
}

/// Solana JSON-RPC surface used by the pipeline.
pub trait SolanaRpc {
    fn get_balance(&self, pubkey: &[u8; 32]) -> Result<u64, RpcError>;

    /// `None` when the account does not exist.
    fn get_account_info(&self, pubkey: &[u8; 32]) -> Result<Option<AccountInfo>, RpcError>;

    fn get_latest_blockhash(&self) -> Result<LatestBlockhash, RpcError>;

    fn get_block_height(&self) -> Result<u64, RpcError>;

    fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError>;

    /// Dry-run wire bytes without signature verification.
    fn simulate_transaction(&self, wire: &[u8]) -> Result<SimulationResponse, RpcError>;

    /// Submit signed wire bytes; returns the Base58 signature.
    fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError>;

    fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, RpcError>;

    fn get_transaction(&self, signature: &str) -> Result<Option<TransactionRecord>, RpcError>;
}

/// A mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
    /// 1 on success, 0 when reverted.
    pub status: u64,
}

/// Ethereum JSON-RPC surface used by the burn flow.
pub trait EthProvider {
    fn chain_id(&self) -> Result<u64, RpcError>;

    /// `eth_getCode` at latest.
    fn get_code(&self, address: &str) -> Result<Vec<u8>, RpcError>;

    /// `eth_call`. A revert is reported as [`RpcError::ExecutionReverted`].
    fn call(&self, from: Option<&str>, to: &str, data: &[u8]) -> Result<Vec<u8>, RpcError>;

    fn estimate_gas(&self, from: &str, to: &str, data: &[u8]) -> Result<u64, RpcError>;

    fn fee_data(&self) -> Result<FeeParams, RpcError>;

    /// Pending nonce.
    fn get_transaction_count(&self, address: &str) -> Result<u64, RpcError>;

    /// Returns the transaction hash.
    fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, RpcError>;

    fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<EthReceipt>, RpcError>;
}

macro_rules! forward_solana_rpc {
    ($ty:ty) => {
        impl<T: SolanaRpc + ?Sized> SolanaRpc for $ty {
            fn get_balance(&self, pubkey: &[u8; 32]) -> Result<u64, RpcError> {
                (**self).get_balance(pubkey)
            }
            fn get_account_info(&self, pubkey: &[u8; 32]) -> Result<Option<AccountInfo>, RpcError> {
                (**self).get_account_info(pubkey)
            }
            fn get_latest_blockhash(&self) -> Result<LatestBlockhash, RpcError> {
                (**self).get_latest_blockhash()
            }
            fn get_block_height(&self) -> Result<u64, RpcError> {
                (**self).get_block_height()
            }
            fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError> {
                (**self).get_minimum_balance_for_rent_exemption(data_len)
            }
            fn simulate_transaction(&self, wire: &[u8]) -> Result<SimulationResponse, RpcError> {
                (**self).simulate_transaction(wire)
            }
            fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
                (**self).send_transaction(wire)
            }
            fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, RpcError> {
                (**self).get_signature_status(signature)
            }
            fn get_transaction(&self, signature: &str) -> Result<Option<TransactionRecord>, RpcError> {
                (**self).get_transaction(signature)
            }
        }
    };
}

forward_solana_rpc!(&T);
forward_solana_rpc!(Arc<T>);

macro_rules! forward_eth_provider {
    ($ty:ty) => {
        impl<T: EthProvider + ?Sized> EthProvider for $ty {
            fn chain_id(&self) -> Result<u64, RpcError> {
                (**self).chain_id()
            }
            fn get_code(&self, address: &str) -> Result<Vec<u8>, RpcError> {
                (**self).get_code(address)
            }
            fn call(&self, from: Option<&str>, to: &str, data: &[u8]) -> Result<Vec<u8>, RpcError> {
                (**self).call(from, to, data)
            }
            fn estimate_gas(&self, from: &str, to: &str, data: &[u8]) -> Result<u64, RpcError> {
                (**self).estimate_gas(from, to, data)
            }
            fn fee_data(&self) -> Result<FeeParams, RpcError> {
                (**self).fee_data()
            }
            fn get_transaction_count(&self, address: &str) -> Result<u64, RpcError> {
                (**self).get_transaction_count(address)
            }
            fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, RpcError> {
                (**self).send_raw_transaction(raw_tx)
            }
            fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<EthReceipt>, RpcError> {
                (**self).get_transaction_receipt(tx_hash)
            }
        }
    };
}

forward_eth_provider!(&T);
forward_eth_provider!(Arc<T>);
