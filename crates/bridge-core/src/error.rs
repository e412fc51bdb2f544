use crossbridge_eth::EthError;
use crossbridge_sol::SolError;
use thiserror::Error;

use crate::amount::format_sol;
use crate::confirm::UnknownReason;
use crate::rpc::RpcError;
use crate::simulate::{DecodedError, ErrorCategory};
use crate::wallet::WalletError;

/// Input problems caught before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount {amount} lamports is below the minimum of {minimum} lamports")]
    BelowMinimum { amount: u64, minimum: u64 },

    #[error(
        "insufficient balance: have {} SOL, need {} SOL (including {} SOL fee buffer)",
        sol(.balance),
        sol(.required),
        sol(.fee_buffer)
    )]
    InsufficientBalance {
        balance: u64,
        required: u64,
        fee_buffer: u64,
    },

    #[error("insufficient {symbol} balance: have {have}, need {need}")]
    InsufficientTokenBalance {
        symbol: String,
        have: String,
        need: String,
    },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("connected wallet is not the bridge admin")]
    NotAdmin,

    #[error("no fees available to collect")]
    NoFeesToCollect,
}

/// Problems with the on-chain vault account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultStateError {
    #[error("bridge vault {address} is not initialized")]
    NotInitialized { address: String },

    #[error("bridge vault {address} is owned by {owner}, not the bridge program")]
    WrongOwner { address: String, owner: String },

    #[error("bridge vault data mismatch: expected {expected} bytes, got {actual}")]
    DataMismatch { expected: usize, actual: usize },

    #[error("fee collection requires the V2 vault layout")]
    FeesUnsupported,
}

/// Failures between signing and the RPC node accepting the transaction.
/// No signature exists for any of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("transaction too large: {size} bytes (max {max})")]
    Oversize { size: usize, max: usize },

    #[error("blockhash expired: block height {current} is past {last_valid}")]
    BlockhashExpired { last_valid: u64, current: u64 },

    #[error("blockhash not found by the node")]
    BlockhashNotFound,

    #[error("wallet rejected the request: {0}")]
    WalletRejected(String),

    #[error("wallet failed to sign: {0}")]
    Signing(String),

    #[error("send failed: {0}")]
    Send(RpcError),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("address derivation failed: {0}")]
    Derivation(SolError),

    #[error("vault state: {0}")]
    VaultState(#[from] VaultStateError),

    #[error("network error: {0}")]
    Network(#[from] RpcError),

    #[error("simulation unavailable: {0}")]
    SimulationUnavailable(RpcError),

    #[error("simulation rejected: {}", .error.message())]
    SimulationRejected {
        error: DecodedError,
        logs: Vec<String>,
    },

    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),

    #[error("transaction {signature} failed on-chain: {}", .error.message())]
    OnChain {
        signature: String,
        error: DecodedError,
    },

    #[error("transaction {signature} status unknown: {reason}")]
    ConfirmationUnknown {
        signature: String,
        reason: UnknownReason,
    },

    #[error("a bridge transaction is already in flight")]
    AlreadyInFlight,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("encoding error: {0}")]
    Encoding(SolError),

    #[error("ethereum error: {0}")]
    Ethereum(#[from] EthError),

    /// An Ethereum call or transaction reverted. `tx_hash` is `None` for a
    /// dry run.
    #[error("execution reverted: {reason}")]
    Reverted {
        tx_hash: Option<String>,
        reason: String,
    },
}

impl From<SolError> for BridgeError {
    fn from(e: SolError) -> Self {
        match e {
            SolError::InvalidSeed(_) | SolError::DerivationExhausted => BridgeError::Derivation(e),
            SolError::InvalidAddress(msg) => ValidationError::InvalidAddress(msg).into(),
            SolError::OversizeTransaction { size, max } => {
                SubmissionError::Oversize { size, max }.into()
            }
            SolError::BlockhashExpired {
                last_valid,
                current,
            } => SubmissionError::BlockhashExpired {
                last_valid,
                current,
            }
            .into(),
            SolError::AccountDataMismatch { expected, actual } => {
                VaultStateError::DataMismatch { expected, actual }.into()
            }
            other => BridgeError::Encoding(other),
        }
    }
}

impl From<WalletError> for BridgeError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::NotConnected => ValidationError::WalletNotConnected.into(),
            WalletError::Rejected(msg) => SubmissionError::WalletRejected(msg).into(),
            WalletError::Signing(msg) => SubmissionError::Signing(msg).into(),
        }
    }
}

impl BridgeError {
    /// A specific, non-empty message for display.
    pub fn user_message(&self) -> String {
        match self {
            BridgeError::Validation(e) => capitalize(&e.to_string()),
            BridgeError::VaultState(VaultStateError::NotInitialized { .. }) => {
                "Bridge not initialized. Please initialize the bridge first.".into()
            }
            BridgeError::SimulationRejected { error, .. } => {
                format!("Transaction simulation failed: {}", error.message())
            }
            BridgeError::Submission(SubmissionError::WalletRejected(_)) => {
                "Transaction cancelled by user".into()
            }
            BridgeError::Submission(
                SubmissionError::BlockhashExpired { .. } | SubmissionError::BlockhashNotFound,
            ) => "Transaction expired. Please try again.".into(),
            BridgeError::Submission(SubmissionError::Oversize { size, max }) => {
                format!("Transaction too large: {size} bytes exceeds the {max} byte limit")
            }
            BridgeError::OnChain { error, .. } => {
                format!("Transaction failed: {}", error.message())
            }
            BridgeError::ConfirmationUnknown { reason, .. } => match reason {
                UnknownReason::Expired => {
                    "Transaction expired before it was confirmed. It may not have landed.".into()
                }
                _ => "Transaction confirmation timed out. Transaction may still be processing."
                    .into(),
            },
            BridgeError::AlreadyInFlight => {
                "Another bridge transaction is still in progress".into()
            }
            other => capitalize(&other.to_string()),
        }
    }

    /// What the user can do about it, when there is something.
    pub fn remediation_hint(&self) -> Option<&'static str> {
        match self {
            BridgeError::Validation(ValidationError::WalletNotConnected) => {
                Some("connect your wallet and try again")
            }
            BridgeError::Validation(ValidationError::InsufficientBalance { .. }) => {
                Some("add more SOL to your wallet or reduce the amount")
            }
            BridgeError::Validation(ValidationError::InsufficientTokenBalance { .. }) => {
                Some("reduce the amount to at most your token balance")
            }
            BridgeError::VaultState(VaultStateError::NotInitialized { .. }) => {
                Some("initialize the bridge before locking SOL")
            }
            BridgeError::VaultState(VaultStateError::WrongOwner { .. })
            | BridgeError::VaultState(VaultStateError::DataMismatch { .. }) => {
                Some("check the configured program id and vault layout")
            }
            BridgeError::Network(_) | BridgeError::SimulationUnavailable(_) => {
                Some("check your connection and try again")
            }
            BridgeError::SimulationRejected { error, .. } | BridgeError::OnChain { error, .. } => {
                category_hint(error)
            }
            BridgeError::Submission(
                SubmissionError::BlockhashExpired { .. } | SubmissionError::BlockhashNotFound,
            ) => Some("transaction expired, please retry"),
            BridgeError::Submission(SubmissionError::Oversize { .. }) => {
                Some("the transaction is too large to send; reduce its contents")
            }
            BridgeError::Submission(SubmissionError::Send(_)) => {
                Some("check your connection and try again")
            }
            BridgeError::ConfirmationUnknown { .. } => {
                Some("check the transaction in the explorer before retrying")
            }
            BridgeError::AlreadyInFlight => Some("wait for the pending transaction to finish"),
            _ => None,
        }
    }
}

fn category_hint(error: &DecodedError) -> Option<&'static str> {
    match error.category {
        ErrorCategory::InsufficientFunds => {
            Some("add more SOL to your wallet or reduce the amount")
        }
        ErrorCategory::AccountNotInitialized => Some("initialize the bridge account first"),
        ErrorCategory::UnauthorizedSigner => Some("sign with the authorized wallet"),
        ErrorCategory::AccountDataMismatch => {
            Some("check the configured program id and vault layout")
        }
        ErrorCategory::CustomProgram if error.custom_code == Some(101) => {
            Some("check that the program is deployed and up to date")
        }
        _ => None,
    }
}

fn sol(lamports: &u64) -> String {
    format_sol(*lamports)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Unknown error".into(),
    }
}
