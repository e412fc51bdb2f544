//! Balance readers and a cancellable background poller.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbridge_eth::wrapped_token::{decode_balance, encode_balance_of};
use log::{debug, warn};

use crate::amount::TokenAmount;
use crate::config::{BridgeConfig, WrappedTokenConfig};
use crate::error::BridgeError;
use crate::rpc::{EthProvider, SolanaRpc};
use crate::wallet::{EthWallet, SolanaWallet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceView {
    Disconnected,
    Loaded(TokenAmount),
}

impl BalanceView {
    pub fn amount(&self) -> Option<TokenAmount> {
        match self {
            BalanceView::Loaded(amount) => Some(*amount),
            BalanceView::Disconnected => None,
        }
    }
}

/// Native SOL balance of the connected wallet.
pub fn read_sol_balance<R: SolanaRpc + ?Sized>(
    rpc: &R,
    wallet: &dyn SolanaWallet,
) -> Result<BalanceView, BridgeError> {
    let pubkey = match wallet.public_key() {
        Some(pubkey) if wallet.connected() => pubkey,
        _ => return Ok(BalanceView::Disconnected),
    };
    let lamports = rpc.get_balance(&pubkey)?;
    Ok(BalanceView::Loaded(TokenAmount::from_lamports(lamports)))
}

/// Wrapped-token balance of the connected wallet via `balanceOf`.
pub fn read_wrapped_balance<P: EthProvider + ?Sized>(
    provider: &P,
    wallet: &dyn EthWallet,
    token: &WrappedTokenConfig,
) -> Result<BalanceView, BridgeError> {
    let owner = match wallet.address() {
        Some(owner) if wallet.connected() => owner,
        _ => return Ok(BalanceView::Disconnected),
    };
    let calldata = encode_balance_of(&owner)?;
    let returned = provider.call(None, &token.contract, &calldata)?;
    let balance = decode_balance(&returned)?;
    Ok(BalanceView::Loaded(TokenAmount::new(balance, token.decimals)))
}

/// Reads a balance now and then every interval on a background thread.
///
/// Polling stops on [`cancel`](Self::cancel), on drop, or after the reader
/// reports [`BalanceView::Disconnected`]. Reader errors are passed to the
/// callback and polling continues.
///
/// Cancelling and dropping join the thread: they return once a read that is
/// already running has finished, so a slow RPC delays them by up to one
/// request timeout.
pub struct BalancePoller {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BalancePoller {
    /// Poll at the configured `balance_poll_interval_ms`.
    pub fn from_config<F, U>(config: &BridgeConfig, reader: F, on_update: U) -> Self
    where
        F: FnMut() -> Result<BalanceView, BridgeError> + Send + 'static,
        U: FnMut(Result<BalanceView, BridgeError>) + Send + 'static,
    {
        Self::spawn(config.balance_poll_interval(), reader, on_update)
    }

    pub fn spawn<F, U>(interval: Duration, mut reader: F, mut on_update: U) -> Self
    where
        F: FnMut() -> Result<BalanceView, BridgeError> + Send + 'static,
        U: FnMut(Result<BalanceView, BridgeError>) + Send + 'static,
    {
        let (cancel, cancelled) = mpsc::channel::<()>();

        let handle = thread::spawn(move || loop {
            let result = reader();
            let disconnected = matches!(result, Ok(BalanceView::Disconnected));
            if let Err(e) = &result {
                warn!("balance read failed: {e}");
            }
            on_update(result);

            if disconnected {
                debug!("wallet disconnected, balance polling stopped");
                break;
            }
            // Cancel is only seen here, between reads.
            match cancelled.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                // Explicit cancel, or the handle was dropped.
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("balance polling cancelled");
                    break;
                }
            }
        });

        Self {
            cancel: Some(cancel),
            handle: Some(handle),
        }
    }

    /// Stop polling and wait for the thread to exit, including any read
    /// in progress.
    pub fn cancel(mut self) {
        self.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The thread may already have exited after a disconnect.
            let _ = cancel.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("balance poller thread panicked");
            }
        }
    }
}

impl Drop for BalancePoller {
    fn drop(&mut self) {
        self.stop();
    }
}
