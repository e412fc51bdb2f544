//! In-memory Solana RPC used by the pipeline tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Mutex, Once};
use std::time::Duration;

use crossbridge_core::sol::{bytes_to_address, transaction_signature, LockInstruction, VaultLayout};
use crossbridge_core::*;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Sleeper that returns immediately and counts the time it was asked for.
#[derive(Default)]
pub struct NoSleep {
    pub slept: Mutex<Duration>,
}

impl Sleeper for NoSleep {
    fn sleep(&self, duration: Duration) {
        *self.slept.lock().unwrap() += duration;
    }
}

pub struct MockState {
    pub balance: u64,
    pub vault: Option<AccountInfo>,
    pub blockhash: LatestBlockhash,
    pub block_height: u64,
    /// Popped per `getBlockHeight`; `block_height` once empty.
    pub heights: VecDeque<u64>,
    pub rent: u64,
    pub simulation: Result<SimulationResponse, RpcError>,
    pub send_error: Option<RpcError>,
    /// Popped per status poll; `Ok(None)` once empty.
    pub statuses: VecDeque<Result<Option<SignatureStatus>, RpcError>>,
    pub transaction: Result<Option<TransactionRecord>, RpcError>,
    /// Account to create when a transaction is sent (initialize).
    pub vault_after_send: Option<AccountInfo>,
    /// Charged to `balance` per sent transaction, with any locked amount.
    pub network_fee: u64,
}

pub struct MockRpc {
    pub state: Mutex<MockState>,
    pub calls: Mutex<Vec<&'static str>>,
    pub sent: Mutex<Vec<Vec<u8>>>,
    /// Signalled when `send_transaction` is entered.
    pub send_entered: Mutex<Option<Sender<()>>>,
    /// `send_transaction` blocks until this yields.
    pub send_release: Mutex<Option<Receiver<()>>>,
}

impl MockRpc {
    /// A funded wallet, an initialized V2 vault, and a transaction that
    /// confirms on the first poll.
    pub fn healthy(program_id: [u8; 32], admin: [u8; 32]) -> Self {
        Self {
            state: Mutex::new(MockState {
                balance: 2 * LAMPORTS_PER_SOL,
                vault: Some(vault_account(program_id, admin, 0, VaultLayout::V2)),
                blockhash: LatestBlockhash {
                    blockhash: bytes_to_address(&[5u8; 32]),
                    last_valid_block_height: 1_150,
                },
                block_height: 1_000,
                heights: VecDeque::new(),
                rent: 1_287_600,
                simulation: Ok(SimulationResponse {
                    err: None,
                    logs: Some(vec!["Program log: Instruction: LockSol".into()]),
                    units_consumed: Some(5_120),
                }),
                send_error: None,
                statuses: VecDeque::from(vec![Ok(Some(confirmed_status(None)))]),
                transaction: Ok(None),
                vault_after_send: None,
                network_fee: 5_000,
            }),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            send_entered: Mutex::new(None),
            send_release: Mutex::new(None),
        }
    }

    pub fn with<F: FnOnce(&mut MockState)>(self, f: F) -> Self {
        f(&mut *self.state.lock().unwrap());
        self
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    pub fn call_log(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

impl SolanaRpc for MockRpc {
    fn get_balance(&self, _pubkey: &[u8; 32]) -> Result<u64, RpcError> {
        self.record("getBalance");
        Ok(self.state.lock().unwrap().balance)
    }

    fn get_account_info(&self, _pubkey: &[u8; 32]) -> Result<Option<AccountInfo>, RpcError> {
        self.record("getAccountInfo");
        Ok(self.state.lock().unwrap().vault.clone())
    }

    fn get_latest_blockhash(&self) -> Result<LatestBlockhash, RpcError> {
        self.record("getLatestBlockhash");
        Ok(self.state.lock().unwrap().blockhash.clone())
    }

    fn get_block_height(&self) -> Result<u64, RpcError> {
        self.record("getBlockHeight");
        let mut state = self.state.lock().unwrap();
        Ok(state.heights.pop_front().unwrap_or(state.block_height))
    }

    fn get_minimum_balance_for_rent_exemption(&self, _data_len: usize) -> Result<u64, RpcError> {
        self.record("getMinimumBalanceForRentExemption");
        Ok(self.state.lock().unwrap().rent)
    }

    fn simulate_transaction(&self, _wire: &[u8]) -> Result<SimulationResponse, RpcError> {
        self.record("simulateTransaction");
        self.state.lock().unwrap().simulation.clone()
    }

    fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        self.record("sendTransaction");

        let entered = self.send_entered.lock().unwrap().take();
        if let Some(entered) = entered {
            let _ = entered.send(());
        }
        let release = self.send_release.lock().unwrap().take();
        if let Some(release) = release {
            let _ = release.recv();
        }

        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.send_error.clone() {
            return Err(err);
        }
        if let Some(account) = state.vault_after_send.take() {
            state.vault = Some(account);
        }
        let locked = LockInstruction::decode(&wire[wire.len().saturating_sub(16)..])
            .map(|lock| lock.amount)
            .unwrap_or(0);
        let charged = locked.saturating_add(state.network_fee);
        state.balance = state.balance.saturating_sub(charged);
        drop(state);

        self.sent.lock().unwrap().push(wire.to_vec());
        transaction_signature(wire).map_err(|e| RpcError::Rpc {
            code: -32602,
            message: e.to_string(),
        })
    }

    fn get_signature_status(&self, _signature: &str) -> Result<Option<SignatureStatus>, RpcError> {
        self.record("getSignatureStatuses");
        self.state
            .lock()
            .unwrap()
            .statuses
            .pop_front()
            .unwrap_or(Ok(None))
    }

    fn get_transaction(&self, _signature: &str) -> Result<Option<TransactionRecord>, RpcError> {
        self.record("getTransaction");
        self.state.lock().unwrap().transaction.clone()
    }
}

pub fn confirmed_status(err: Option<serde_json::Value>) -> SignatureStatus {
    SignatureStatus {
        slot: 4_242,
        confirmations: Some(1),
        err,
        confirmation_status: Some(Commitment::Confirmed),
    }
}

pub fn processed_status() -> SignatureStatus {
    SignatureStatus {
        slot: 4_240,
        confirmations: Some(0),
        err: None,
        confirmation_status: Some(Commitment::Processed),
    }
}

pub fn landed_record(err: Option<serde_json::Value>) -> TransactionRecord {
    TransactionRecord {
        slot: 4_243,
        block_time: Some(1_700_000_000),
        meta: Some(TransactionMeta {
            err,
            fee: 5_000,
            log_messages: None,
            compute_units_consumed: Some(5_120),
        }),
    }
}

/// Vault account data in the given layout.
pub fn vault_account(
    program_id: [u8; 32],
    admin: [u8; 32],
    fees: u64,
    layout: VaultLayout,
) -> AccountInfo {
    let mut data = vec![0xd8u8; 8];
    if layout == VaultLayout::V2 {
        data.extend_from_slice(&admin);
    }
    data.extend_from_slice(&25_000_000_000u64.to_le_bytes());
    data.push(254);
    if layout == VaultLayout::V2 {
        data.extend_from_slice(&fees.to_le_bytes());
    }
    AccountInfo {
        lamports: 25_001_000_000,
        owner: program_id,
        data,
        executable: false,
    }
}

/// Policy with tiny waits so exhaustion is reached in a few polls.
pub fn fast_policy() -> ConfirmPolicy {
    ConfirmPolicy {
        max_attempts: 4,
        initial_backoff_ms: 10,
        max_backoff_ms: 40,
        timeout_ms: 10_000,
    }
}
