//! The Solana-side bridge client.
//!
//! Every transaction goes through the same path:
//!
//! ```text
//! validate -> derive -> build -> size check -> simulate -> sign -> submit -> confirm
//! ```
//!
//! Local checks run before any network call. Nothing is signed unless the
//! simulation passed, and nothing is submitted with an expired blockhash.

use crossbridge_sol::{
    build_pending_transaction, bytes_to_address, check_transaction_size, collect_fees_instruction,
    derive_bridge_vault, initialize_instruction, parse_vault_account, BridgeVaultAddress,
    BridgeVaultState, LockInstruction, RecentBlockhash, SolInstruction,
};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::BridgeConfig;
use crate::confirm::{Confirmer, Sleeper, ThreadSleeper, TransactionOutcome};
use crate::error::{BridgeError, ValidationError, VaultStateError};
use crate::guard::InFlight;
use crate::rpc::SolanaRpc;
use crate::simulate::Simulator;
use crate::stage::{StageTracker, TxStage};
use crate::wallet::{parse_solana_address, SolanaWallet};

/// A lock request in lamports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRequest {
    pub lamports: u64,
    /// Balance the caller already displays. When set, the balance check
    /// runs locally instead of fetching it.
    pub known_balance: Option<u64>,
}

impl LockRequest {
    pub fn new(lamports: u64) -> Self {
        Self {
            lamports,
            known_balance: None,
        }
    }

    pub fn with_known_balance(mut self, lamports: u64) -> Self {
        self.known_balance = Some(lamports);
        self
    }
}

/// A transaction that was submitted and confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutedTransaction {
    pub signature: String,
    pub slot: Option<u64>,
    pub stages: Vec<TxStage>,
    pub units_consumed: u64,
    pub confirmed_via_fallback: bool,
    pub explorer_url: String,
    /// Fee payer's balance read after confirmation; `None` if that read failed.
    pub balance_after: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitializeOutcome {
    AlreadyInitialized { vault: String },
    Initialized(ExecutedTransaction),
}

pub struct BridgeClient<R: SolanaRpc, S: Sleeper = ThreadSleeper> {
    rpc: R,
    sleeper: S,
    config: BridgeConfig,
    program_id: [u8; 32],
    admin: [u8; 32],
    vault: BridgeVaultAddress,
    in_flight: InFlight,
}

impl<R: SolanaRpc> BridgeClient<R> {
    pub fn new(rpc: R, config: BridgeConfig) -> Result<Self, BridgeError> {
        Self::with_sleeper(rpc, ThreadSleeper, config)
    }
}

impl<R: SolanaRpc, S: Sleeper> BridgeClient<R, S> {
    /// Validates `config` and derives the vault address up front.
    pub fn with_sleeper(rpc: R, sleeper: S, config: BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        let program_id = config.program_id_bytes()?;
        let admin = config.admin_bytes()?;
        let vault = derive_bridge_vault(&program_id, &config.vault_seed)?;
        debug!(
            "bridge vault {} (bump {}) for program {}",
            vault.to_base58(),
            vault.bump,
            config.program_id
        );

        Ok(Self {
            rpc,
            sleeper,
            config,
            program_id,
            admin,
            vault,
            in_flight: InFlight::new(),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn vault_address(&self) -> &BridgeVaultAddress {
        &self.vault
    }

    /// Shares this client's in-flight slot.
    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    pub fn is_admin(&self, pubkey: &[u8; 32]) -> bool {
        *pubkey == self.admin
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Lock SOL into the bridge vault.
    pub fn lock_sol(
        &self,
        wallet: &dyn SolanaWallet,
        request: LockRequest,
    ) -> Result<ExecutedTransaction, BridgeError> {
        let _ticket = self.in_flight.try_acquire()?;
        info!("lock_sol: {} lamports", request.lamports);
        finish("lock_sol", self.lock_sol_inner(wallet, request))
    }

    fn lock_sol_inner(
        &self,
        wallet: &dyn SolanaWallet,
        request: LockRequest,
    ) -> Result<ExecutedTransaction, BridgeError> {
        let user = connected_key(wallet)?;
        let lamports = request.lamports;

        if lamports == 0 {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        if lamports < self.config.min_lock_lamports {
            return Err(ValidationError::BelowMinimum {
                amount: lamports,
                minimum: self.config.min_lock_lamports,
            }
            .into());
        }
        if let Some(balance) = request.known_balance {
            self.check_lock_balance(balance, lamports)?;
        }

        let ix = LockInstruction::new(lamports).to_instruction(
            &self.program_id,
            &self.vault.address,
            &user,
        )?;
        check_transaction_size(std::slice::from_ref(&ix), &user)?;

        if request.known_balance.is_none() {
            let balance = self.rpc.get_balance(&user)?;
            self.check_lock_balance(balance, lamports)?;
        }
        self.vault_state()?;

        self.execute("lock_sol", vec![ix], &user, wallet)
    }

    fn check_lock_balance(&self, balance: u64, lamports: u64) -> Result<(), BridgeError> {
        let fee_buffer = self.config.fee_buffer_lamports;
        let required = lamports
            .checked_add(fee_buffer)
            .ok_or_else(|| ValidationError::InvalidAmount("amount is too large".into()))?;
        if balance < required {
            return Err(ValidationError::InsufficientBalance {
                balance,
                required,
                fee_buffer,
            }
            .into());
        }
        Ok(())
    }

    /// Create the vault account. A no-op if it already exists.
    pub fn initialize_bridge(
        &self,
        wallet: &dyn SolanaWallet,
    ) -> Result<InitializeOutcome, BridgeError> {
        let _ticket = self.in_flight.try_acquire()?;
        info!("initialize_bridge: vault {}", self.vault.to_base58());
        finish("initialize", self.initialize_inner(wallet))
    }

    fn initialize_inner(&self, wallet: &dyn SolanaWallet) -> Result<InitializeOutcome, BridgeError> {
        let payer = connected_key(wallet)?;

        if self.rpc.get_account_info(&self.vault.address)?.is_some() {
            info!("bridge vault {} already initialized", self.vault.to_base58());
            return Ok(InitializeOutcome::AlreadyInitialized {
                vault: self.vault.to_base58(),
            });
        }

        let rent = self
            .rpc
            .get_minimum_balance_for_rent_exemption(self.config.vault_layout.size())?;
        let fee_buffer = self.config.fee_buffer_lamports;
        let required = rent.saturating_add(fee_buffer);
        let balance = self.rpc.get_balance(&payer)?;
        if balance < required {
            return Err(ValidationError::InsufficientBalance {
                balance,
                required,
                fee_buffer,
            }
            .into());
        }

        let ix = initialize_instruction(&self.program_id, &self.vault.address, &payer)?;
        let executed = self.execute("initialize", vec![ix], &payer, wallet)?;

        // Confirmed but not readable means the program did not create it.
        self.vault_state()?;
        Ok(InitializeOutcome::Initialized(executed))
    }

    /// Sweep accumulated fees to `fee_collector`. Admin only, V2 vaults only.
    pub fn collect_fees(
        &self,
        wallet: &dyn SolanaWallet,
        fee_collector: &str,
    ) -> Result<ExecutedTransaction, BridgeError> {
        let _ticket = self.in_flight.try_acquire()?;
        info!("collect_fees to {}", fee_collector.trim());
        finish("collect_fees", self.collect_fees_inner(wallet, fee_collector))
    }

    fn collect_fees_inner(
        &self,
        wallet: &dyn SolanaWallet,
        fee_collector: &str,
    ) -> Result<ExecutedTransaction, BridgeError> {
        let admin = connected_key(wallet)?;
        if !self.is_admin(&admin) {
            return Err(ValidationError::NotAdmin.into());
        }
        let collector = parse_solana_address(fee_collector)?;
        if !self.config.vault_layout.has_fees() {
            return Err(VaultStateError::FeesUnsupported.into());
        }

        let state = self.vault_state()?;
        if state.admin.is_some_and(|onchain| onchain != admin) {
            return Err(ValidationError::NotAdmin.into());
        }

        let minimum = self.config.min_admin_balance_lamports;
        let balance = self.rpc.get_balance(&admin)?;
        if balance < minimum {
            return Err(ValidationError::InsufficientBalance {
                balance,
                required: minimum,
                fee_buffer: minimum,
            }
            .into());
        }
        if state.fees_collected == 0 {
            return Err(ValidationError::NoFeesToCollect.into());
        }

        debug!("collecting {} lamports of fees", state.fees_collected);
        let ix =
            collect_fees_instruction(&self.program_id, &self.vault.address, &admin, &collector)?;
        self.execute("collect_fees", vec![ix], &admin, wallet)
    }

    /// Fees waiting in the vault; 0 when there is no vault or no fee field.
    pub fn available_fees(&self) -> Result<u64, BridgeError> {
        if !self.config.vault_layout.has_fees() {
            return Ok(0);
        }
        match self.rpc.get_account_info(&self.vault.address)? {
            None => Ok(0),
            Some(_) => Ok(self.vault_state()?.fees_collected),
        }
    }

    /// Read and check the vault account.
    pub fn vault_state(&self) -> Result<BridgeVaultState, BridgeError> {
        let address = self.vault.to_base58();
        let account = self
            .rpc
            .get_account_info(&self.vault.address)?
            .ok_or_else(|| VaultStateError::NotInitialized {
                address: address.clone(),
            })?;

        if account.owner != self.program_id {
            return Err(VaultStateError::WrongOwner {
                address,
                owner: bytes_to_address(&account.owner),
            }
            .into());
        }
        Ok(parse_vault_account(&account.data, self.config.vault_layout)?)
    }

    // -----------------------------------------------------------------------
    // Shared pipeline
    // -----------------------------------------------------------------------

    fn execute(
        &self,
        label: &'static str,
        instructions: Vec<SolInstruction>,
        fee_payer: &[u8; 32],
        wallet: &dyn SolanaWallet,
    ) -> Result<ExecutedTransaction, BridgeError> {
        let mut stages = StageTracker::new(label);

        let latest = self.rpc.get_latest_blockhash()?;
        let blockhash =
            RecentBlockhash::from_base58(&latest.blockhash, latest.last_valid_block_height)?;
        let pending = build_pending_transaction(instructions, fee_payer, blockhash)?;
        let unsigned = pending.wire_unsigned()?;
        debug!("{label}: {} byte transaction", unsigned.len());

        stages.advance(TxStage::Simulating);
        let report = match Simulator::new(&self.rpc).gate(&unsigned) {
            Ok(report) => report,
            Err(e) => {
                stages.advance(TxStage::SimulationFailed);
                return Err(e);
            }
        };

        stages.advance(TxStage::Signing);
        let signed = match self.sign(&pending, &unsigned, wallet) {
            Ok(signed) => signed,
            Err(e) => {
                stages.advance(TxStage::SubmitFailed);
                return Err(e);
            }
        };

        stages.advance(TxStage::Submitting);
        let confirmer = Confirmer::new(&self.rpc, &self.sleeper, self.config.confirm);
        let signature = match confirmer.submit(&signed) {
            Ok(signature) => signature,
            Err(e) => {
                stages.advance(TxStage::SubmitFailed);
                return Err(e);
            }
        };

        stages.advance(TxStage::Confirming);
        let outcome = confirmer.confirm(&signature, pending.recent_blockhash.last_valid_block_height);
        match outcome {
            TransactionOutcome::Confirmed {
                signature,
                slot,
                via_fallback,
            } => {
                if via_fallback {
                    stages.advance(TxStage::Timeout);
                }
                stages.advance(TxStage::Confirmed);
                let balance_after = match self.rpc.get_balance(fee_payer) {
                    Ok(lamports) => Some(lamports),
                    Err(e) => {
                        warn!("{label}: balance refresh failed: {e}");
                        None
                    }
                };
                Ok(ExecutedTransaction {
                    explorer_url: self.config.cluster.explorer_tx_url(&signature),
                    signature,
                    slot,
                    stages: stages.into_stages(),
                    units_consumed: report.units_consumed,
                    confirmed_via_fallback: via_fallback,
                    balance_after,
                })
            }
            TransactionOutcome::Failed {
                signature,
                error,
                via_fallback,
            } => {
                if via_fallback {
                    stages.advance(TxStage::Timeout);
                }
                stages.advance(TxStage::OnChainFailed);
                Err(BridgeError::OnChain { signature, error })
            }
            TransactionOutcome::Unknown { signature, reason } => {
                stages.advance(TxStage::Timeout);
                stages.advance(TxStage::Unknown);
                Err(BridgeError::ConfirmationUnknown { signature, reason })
            }
        }
    }

    /// Recheck the blockhash window, then hand the wallet the unsigned bytes.
    fn sign(
        &self,
        pending: &crossbridge_sol::PendingTransaction,
        unsigned: &[u8],
        wallet: &dyn SolanaWallet,
    ) -> Result<Vec<u8>, BridgeError> {
        let height = self.rpc.get_block_height()?;
        pending.ensure_not_expired(height)?;
        Ok(wallet.sign_transaction(unsigned)?)
    }
}

fn connected_key(wallet: &dyn SolanaWallet) -> Result<[u8; 32], BridgeError> {
    if !wallet.connected() {
        return Err(ValidationError::WalletNotConnected.into());
    }
    wallet
        .public_key()
        .ok_or_else(|| ValidationError::WalletNotConnected.into())
}

fn finish<T>(label: &str, result: Result<T, BridgeError>) -> Result<T, BridgeError> {
    match &result {
        Ok(_) => info!("{label} finished"),
        Err(e) => error!("{label} failed: {e}"),
    }
    result
}
