//! Burning wrapped SOL on Ethereum to release SOL on Solana.
//!
//! Mirrors the Solana pipeline: validate locally, check chain state, dry-run
//! with `eth_call`, and only then sign and broadcast.

use std::time::Duration;

use crossbridge_eth::chains::{require_chain, EvmChain};
use crossbridge_eth::transaction::{build_contract_call, gas_with_margin};
use crossbridge_eth::wrapped_token::{
    decode_balance, decode_decimals, decode_symbol, encode_balance_of, encode_burn,
    encode_decimals, encode_symbol,
};
use crossbridge_eth::EthError;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::amount::{parse_units, TokenAmount};
use crate::config::WrappedTokenConfig;
use crate::confirm::{
    ConfirmPolicy, Observation, PollDecision, PollFailure, Sleeper, ThreadSleeper, UnknownReason,
};
use crate::error::{BridgeError, SubmissionError, ValidationError};
use crate::guard::InFlight;
use crate::rpc::{EthProvider, EthReceipt, RpcError};
use crate::wallet::{parse_solana_address, EthWallet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

/// A validated burn, ready to dry-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnPlan {
    pub owner: String,
    pub amount: TokenAmount,
    pub balance: TokenAmount,
    pub destination: String,
    pub calldata: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BurnReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
    pub amount: TokenAmount,
    pub destination: String,
    pub explorer_url: String,
}

pub struct BurnClient<P: EthProvider, S: Sleeper = ThreadSleeper> {
    provider: P,
    sleeper: S,
    token: WrappedTokenConfig,
    chain: &'static EvmChain,
    policy: ConfirmPolicy,
    in_flight: InFlight,
}

impl<P: EthProvider> BurnClient<P> {
    pub fn new(
        provider: P,
        token: WrappedTokenConfig,
        policy: ConfirmPolicy,
    ) -> Result<Self, BridgeError> {
        Self::with_sleeper(provider, ThreadSleeper, token, policy)
    }
}

impl<P: EthProvider, S: Sleeper> BurnClient<P, S> {
    pub fn with_sleeper(
        provider: P,
        sleeper: S,
        token: WrappedTokenConfig,
        policy: ConfirmPolicy,
    ) -> Result<Self, BridgeError> {
        crossbridge_eth::address::parse_address(&token.contract)?;
        let chain = require_chain(token.chain_id)?;
        Ok(Self {
            provider,
            sleeper,
            token,
            chain,
            policy,
            in_flight: InFlight::new(),
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    pub fn read_token_metadata(&self) -> Result<TokenMetadata, BridgeError> {
        let contract = self.token.contract.as_str();
        let symbol = decode_symbol(&self.provider.call(None, contract, &encode_symbol())?)?;
        let decimals = decode_decimals(&self.provider.call(None, contract, &encode_decimals())?)?;
        Ok(TokenMetadata { symbol, decimals })
    }

    /// Everything that can be checked without sending a transaction.
    pub fn validate_burn(
        &self,
        wallet: &dyn EthWallet,
        amount: &str,
        solana_destination: &str,
    ) -> Result<BurnPlan, BridgeError> {
        let owner = match wallet.address() {
            Some(owner) if wallet.connected() => owner,
            _ => return Err(ValidationError::WalletNotConnected.into()),
        };
        let destination = solana_destination.trim().to_string();
        parse_solana_address(&destination)?;

        let amount = parse_units(amount, self.token.decimals)?;
        if amount.is_zero() {
            return Err(ValidationError::NonPositiveAmount.into());
        }

        let chain_id = self.provider.chain_id()?;
        if chain_id != self.chain.chain_id {
            return Err(EthError::UnsupportedChain(chain_id).into());
        }

        let code = self.provider.get_code(&self.token.contract)?;
        if code.is_empty() {
            return Err(BridgeError::Config(format!(
                "no contract deployed at {} on {}",
                self.token.contract, self.chain.name
            )));
        }

        let returned = self
            .provider
            .call(None, &self.token.contract, &encode_balance_of(&owner)?)?;
        let balance = TokenAmount::new(decode_balance(&returned)?, self.token.decimals);
        if balance.base_units < amount.base_units {
            return Err(ValidationError::InsufficientTokenBalance {
                symbol: self.token.symbol.clone(),
                have: balance.to_string(),
                need: amount.to_string(),
            }
            .into());
        }

        let calldata = encode_burn(amount.base_units, &destination)?;
        Ok(BurnPlan {
            owner,
            amount,
            balance,
            destination,
            calldata,
        })
    }

    /// Burn `amount` tokens, releasing SOL to `solana_destination`.
    pub fn burn(
        &self,
        wallet: &dyn EthWallet,
        amount: &str,
        solana_destination: &str,
    ) -> Result<BurnReceipt, BridgeError> {
        let _ticket = self.in_flight.try_acquire()?;
        info!("burn {amount} {} to {}", self.token.symbol, solana_destination.trim());
        let result = self.burn_inner(wallet, amount, solana_destination);
        match &result {
            Ok(receipt) => info!(
                "burn {} confirmed in block {}",
                receipt.tx_hash, receipt.block_number
            ),
            Err(e) => error!("burn failed: {e}"),
        }
        result
    }

    fn burn_inner(
        &self,
        wallet: &dyn EthWallet,
        amount: &str,
        solana_destination: &str,
    ) -> Result<BurnReceipt, BridgeError> {
        let plan = self.validate_burn(wallet, amount, solana_destination)?;
        let contract = self.token.contract.as_str();

        self.provider
            .call(Some(&plan.owner), contract, &plan.calldata)
            .map_err(|e| match e {
                RpcError::ExecutionReverted(reason) => BridgeError::Reverted {
                    tx_hash: None,
                    reason,
                },
                other => BridgeError::SimulationUnavailable(other),
            })?;
        debug!("burn dry run passed");

        let estimate = self.provider.estimate_gas(&plan.owner, contract, &plan.calldata)?;
        let gas_limit = gas_with_margin(estimate, self.token.gas_margin_percent);
        let fees = self.provider.fee_data()?;
        let nonce = self.provider.get_transaction_count(&plan.owner)?;
        debug!("burn gas {gas_limit} (estimate {estimate}), nonce {nonce}");

        let tx = build_contract_call(
            self.chain.chain_id,
            nonce,
            contract,
            plan.calldata.clone(),
            fees,
            gas_limit,
        )?;
        let signed = wallet.sign_transaction(&tx)?;

        let returned = self
            .provider
            .send_raw_transaction(&signed.raw_tx)
            .map_err(|e| match e {
                RpcError::ExecutionReverted(reason) => BridgeError::Reverted {
                    tx_hash: None,
                    reason,
                },
                other => SubmissionError::Send(other).into(),
            })?;
        if !returned.eq_ignore_ascii_case(&signed.tx_hash) {
            warn!("node returned hash {returned}, expected {}", signed.tx_hash);
        }
        let tx_hash = signed.tx_hash;
        info!("burn submitted: {tx_hash}");

        let receipt = self.wait_for_receipt(&tx_hash)?;
        Ok(BurnReceipt {
            explorer_url: self.chain.explorer_tx_url(&tx_hash),
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            amount: plan.amount,
            destination: plan.destination,
        })
    }

    fn wait_for_receipt(&self, tx_hash: &str) -> Result<EthReceipt, BridgeError> {
        let mut elapsed = Duration::ZERO;
        let mut attempt = 0u32;

        loop {
            let receipt = match self.provider.get_transaction_receipt(tx_hash) {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!("receipt poll for {tx_hash} failed: {e}");
                    None
                }
            };
            let observed = match &receipt {
                None => Observation::Pending,
                Some(r) if r.status == 1 => Observation::Landed,
                Some(_) => Observation::Reverted,
            };

            match (self.policy.decide(attempt, elapsed, observed), receipt) {
                (PollDecision::Continue { wait }, _) => {
                    self.sleeper.sleep(wait);
                    elapsed += wait;
                    attempt += 1;
                }
                (PollDecision::Succeed, Some(receipt)) => return Ok(receipt),
                (PollDecision::Fail(PollFailure::Reverted), Some(receipt)) => {
                    return Err(BridgeError::Reverted {
                        tx_hash: Some(tx_hash.to_string()),
                        reason: format!("burn reverted in block {}", receipt.block_number),
                    })
                }
                _ => {
                    return Err(BridgeError::ConfirmationUnknown {
                        signature: tx_hash.to_string(),
                        reason: UnknownReason::TimedOut {
                            attempts: attempt + 1,
                        },
                    })
                }
            }
        }
    }
}
