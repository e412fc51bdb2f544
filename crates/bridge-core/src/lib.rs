//! The CrossBridge transaction pipeline.
//!
//! Locks SOL into the bridge vault on Solana and burns wrapped SOL on
//! Ethereum. Chain access goes through the [`SolanaRpc`] and [`EthProvider`]
//! traits and signing through the wallet traits, so the whole pipeline runs
//! against in-memory mocks in tests.
//!
//! Logging uses the `log` facade; install a logger in the binary.

pub mod amount;
pub mod balance;
pub mod burn;
pub mod config;
pub mod confirm;
pub mod error;
pub mod guard;
pub mod pipeline;
pub mod rpc;
pub mod simulate;
pub mod stage;
pub mod wallet;

pub use amount::{format_sol, parse_sol, parse_units, TokenAmount, LAMPORTS_PER_SOL};
pub use balance::{read_sol_balance, read_wrapped_balance, BalancePoller, BalanceView};
pub use burn::{BurnClient, BurnPlan, BurnReceipt, TokenMetadata};
pub use config::{BridgeConfig, WrappedTokenConfig};
pub use confirm::{
    ConfirmPolicy, Confirmer, Observation, PollDecision, PollFailure, Sleeper, ThreadSleeper,
    TransactionOutcome, UnknownReason,
};
pub use error::{BridgeError, SubmissionError, ValidationError, VaultStateError};
pub use guard::{InFlight, InFlightTicket};
pub use pipeline::{BridgeClient, ExecutedTransaction, InitializeOutcome, LockRequest};
pub use rpc::{
    AccountInfo, Commitment, EthProvider, EthReceipt, LatestBlockhash, RpcError, SignatureStatus,
    SimulationResponse, SolanaRpc, TransactionMeta, TransactionRecord,
};
pub use simulate::{
    custom_error_message, decode_transaction_error, DecodedError, ErrorCategory,
    SimulationOutcome, SimulationReport, Simulator,
};
pub use stage::{StageTracker, TxStage};
pub use wallet::{EthWallet, KeypairWallet, LocalEthWallet, SolanaWallet, WalletError};

pub use crossbridge_eth as eth;
pub use crossbridge_sol as sol;
