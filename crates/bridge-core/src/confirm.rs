//! Submission and confirmation.
//!
//! Confirmation polls the signature status with capped exponential backoff
//! until the transaction lands, the blockhash window closes, or the policy
//! runs out. When polling errors out or gives up without a definitive
//! answer, a direct transaction lookup decides; only if that is also
//! inconclusive is the outcome reported as unknown.

use std::fmt;
use std::time::Duration;

use crossbridge_sol::transaction_signature;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, SubmissionError};
use crate::rpc::{Commitment, RpcError, SolanaRpc};
use crate::simulate::{decode_transaction_error, DecodedError};

/// Blocking wait between polls. Injected so tests run instantly.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Real-time [`Sleeper`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Polling limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_ms: u64,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 40,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            timeout_ms: 90_000,
        }
    }
}

/// What a single poll saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Pending,
    Landed,
    Reverted,
    /// The blockhash window closed with nothing landed.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFailure {
    Reverted,
    Expired,
    /// Attempts or time ran out.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Continue { wait: Duration },
    Succeed,
    Fail(PollFailure),
}

/// A status poll with the data the outcome needs.
#[derive(Debug)]
enum Poll {
    Pending,
    Landed { slot: u64 },
    Reverted { err: serde_json::Value, slot: u64 },
    Expired,
}

impl Poll {
    fn observation(&self) -> Observation {
        match self {
            Poll::Pending => Observation::Pending,
            Poll::Landed { .. } => Observation::Landed,
            Poll::Reverted { .. } => Observation::Reverted,
            Poll::Expired => Observation::Expired,
        }
    }

    fn slot(&self) -> Option<u64> {
        match self {
            Poll::Landed { slot } | Poll::Reverted { slot, .. } => Some(*slot),
            _ => None,
        }
    }
}

impl ConfirmPolicy {
    /// Delay after the `attempt`-th poll (0-based): doubles, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(63)).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Decide what to do after poll number `attempt` (0-based), given the
    /// time already waited and what the poll observed.
    pub fn decide(&self, attempt: u32, elapsed: Duration, observed: Observation) -> PollDecision {
        match observed {
            Observation::Landed => PollDecision::Succeed,
            Observation::Reverted => PollDecision::Fail(PollFailure::Reverted),
            Observation::Expired => PollDecision::Fail(PollFailure::Expired),
            Observation::Pending => {
                let wait = self.backoff(attempt);
                if attempt.saturating_add(1) >= self.max_attempts
                    || elapsed.saturating_add(wait) > self.timeout()
                {
                    PollDecision::Fail(PollFailure::Exhausted)
                } else {
                    PollDecision::Continue { wait }
                }
            }
        }
    }
}

/// Why a submitted transaction's fate is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownReason {
    /// The blockhash window closed and the transaction was not found.
    Expired,
    TimedOut { attempts: u32 },
    /// Status polling errored and the fallback lookup found nothing.
    WatcherFailed(String),
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::Expired => f.write_str("blockhash expired before confirmation"),
            UnknownReason::TimedOut { attempts } => {
                write!(f, "confirmation timed out after {attempts} polls")
            }
            UnknownReason::WatcherFailed(msg) => write!(f, "confirmation watcher failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    Confirmed {
        signature: String,
        slot: Option<u64>,
        /// Established by the direct lookup rather than status polling.
        via_fallback: bool,
    },
    Failed {
        signature: String,
        error: DecodedError,
        via_fallback: bool,
    },
    Unknown {
        signature: String,
        reason: UnknownReason,
    },
}

impl TransactionOutcome {
    pub fn signature(&self) -> &str {
        match self {
            TransactionOutcome::Confirmed { signature, .. }
            | TransactionOutcome::Failed { signature, .. }
            | TransactionOutcome::Unknown { signature, .. } => signature,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, TransactionOutcome::Confirmed { .. })
    }
}

pub struct Confirmer<'a, R: SolanaRpc + ?Sized, S: Sleeper + ?Sized> {
    rpc: &'a R,
    sleeper: &'a S,
    policy: ConfirmPolicy,
    commitment: Commitment,
}

impl<'a, R: SolanaRpc + ?Sized, S: Sleeper + ?Sized> Confirmer<'a, R, S> {
    pub fn new(rpc: &'a R, sleeper: &'a S, policy: ConfirmPolicy) -> Self {
        Self {
            rpc,
            sleeper,
            policy,
            commitment: Commitment::Confirmed,
        }
    }

    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = commitment;
        self
    }

    /// Send signed wire bytes. Any failure here means nothing was submitted
    /// and there is no signature to report.
    pub fn submit(&self, signed_wire: &[u8]) -> Result<String, BridgeError> {
        let local = transaction_signature(signed_wire).map_err(|e| {
            BridgeError::from(SubmissionError::Signing(e.to_string()))
        })?;

        let returned = self.rpc.send_transaction(signed_wire).map_err(|e| match e {
            RpcError::BlockhashNotFound => {
                warn!("send rejected: blockhash not found");
                BridgeError::from(SubmissionError::BlockhashNotFound)
            }
            RpcError::Preflight { err, logs } => {
                let error = decode_transaction_error(&err);
                warn!("send rejected by preflight: {}", error.message());
                BridgeError::SimulationRejected { error, logs }
            }
            other => {
                warn!("send failed: {other}");
                BridgeError::from(SubmissionError::Send(other))
            }
        })?;

        if returned != local {
            warn!("node returned signature {returned}, expected {local}");
        }
        info!("submitted transaction {local}");
        Ok(local)
    }

    /// Follow `signature` to a definitive outcome where possible.
    pub fn confirm(&self, signature: &str, last_valid_block_height: u64) -> TransactionOutcome {
        let mut elapsed = Duration::ZERO;
        let mut attempt = 0u32;

        loop {
            let poll = match self.poll(signature, last_valid_block_height) {
                Ok(poll) => poll,
                Err(e) => {
                    warn!("status poll for {signature} failed: {e}; falling back to lookup");
                    return self.lookup(signature, UnknownReason::WatcherFailed(e.to_string()));
                }
            };
            debug!("poll {attempt} for {signature}: {:?}", poll.observation());

            match self.policy.decide(attempt, elapsed, poll.observation()) {
                PollDecision::Continue { wait } => {
                    self.sleeper.sleep(wait);
                    elapsed += wait;
                    attempt += 1;
                }
                PollDecision::Succeed => {
                    info!("transaction {signature} confirmed");
                    return TransactionOutcome::Confirmed {
                        signature: signature.to_string(),
                        slot: poll.slot(),
                        via_fallback: false,
                    };
                }
                PollDecision::Fail(PollFailure::Reverted) => {
                    let error = match poll {
                        Poll::Reverted { err, .. } => decode_transaction_error(&err),
                        _ => decode_transaction_error(&serde_json::Value::Null),
                    };
                    warn!("transaction {signature} failed on-chain: {}", error.message());
                    return TransactionOutcome::Failed {
                        signature: signature.to_string(),
                        error,
                        via_fallback: false,
                    };
                }
                PollDecision::Fail(PollFailure::Expired) => {
                    return self.lookup(signature, UnknownReason::Expired);
                }
                PollDecision::Fail(PollFailure::Exhausted) => {
                    warn!("confirmation of {signature} exhausted after {} polls", attempt + 1);
                    return self.lookup(
                        signature,
                        UnknownReason::TimedOut {
                            attempts: attempt + 1,
                        },
                    );
                }
            }
        }
    }

    fn poll(&self, signature: &str, last_valid_block_height: u64) -> Result<Poll, RpcError> {
        match self.rpc.get_signature_status(signature)? {
            Some(status) => match status.err {
                Some(err) if !err.is_null() => Ok(Poll::Reverted {
                    err,
                    slot: status.slot,
                }),
                _ if status.reached(self.commitment) => Ok(Poll::Landed { slot: status.slot }),
                _ => Ok(Poll::Pending),
            },
            None => {
                let height = self.rpc.get_block_height()?;
                if height > last_valid_block_height {
                    Ok(Poll::Expired)
                } else {
                    Ok(Poll::Pending)
                }
            }
        }
    }

    /// Direct `getTransaction` lookup; `reason` is reported if it finds nothing.
    fn lookup(&self, signature: &str, reason: UnknownReason) -> TransactionOutcome {
        match self.rpc.get_transaction(signature) {
            Ok(Some(record)) => match record.err().filter(|e| !e.is_null()) {
                None => {
                    info!("transaction {signature} found by lookup at slot {}", record.slot);
                    TransactionOutcome::Confirmed {
                        signature: signature.to_string(),
                        slot: Some(record.slot),
                        via_fallback: true,
                    }
                }
                Some(err) => {
                    let error = decode_transaction_error(err);
                    warn!("transaction {signature} failed on-chain: {}", error.message());
                    TransactionOutcome::Failed {
                        signature: signature.to_string(),
                        error,
                        via_fallback: true,
                    }
                }
            },
            Ok(None) => {
                warn!("transaction {signature} not found: {reason}");
                TransactionOutcome::Unknown {
                    signature: signature.to_string(),
                    reason,
                }
            }
            Err(e) => {
                warn!("lookup of {signature} failed: {e}");
                TransactionOutcome::Unknown {
                    signature: signature.to_string(),
                    reason,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ConfirmPolicy {
        ConfirmPolicy {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 400,
            timeout_ms: 10_000,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.backoff(0), Duration::from_millis(100));
        assert_eq!(p.backoff(1), Duration::from_millis(200));
        assert_eq!(p.backoff(2), Duration::from_millis(400));
        assert_eq!(p.backoff(3), Duration::from_millis(400));
        assert_eq!(p.backoff(200), Duration::from_millis(400));
    }

    #[test]
    fn terminal_observations() {
        let p = policy();
        assert_eq!(p.decide(0, Duration::ZERO, Observation::Landed), PollDecision::Succeed);
        assert_eq!(
            p.decide(0, Duration::ZERO, Observation::Reverted),
            PollDecision::Fail(PollFailure::Reverted)
        );
        assert_eq!(
            p.decide(2, Duration::ZERO, Observation::Expired),
            PollDecision::Fail(PollFailure::Expired)
        );
    }

    #[test]
    fn pending_continues_until_attempts_run_out() {
        let p = policy();
        assert_eq!(
            p.decide(0, Duration::ZERO, Observation::Pending),
            PollDecision::Continue {
                wait: Duration::from_millis(100)
            }
        );
        assert_eq!(
            p.decide(4, Duration::ZERO, Observation::Pending),
            PollDecision::Fail(PollFailure::Exhausted)
        );
    }

    #[test]
    fn pending_fails_when_wait_would_pass_timeout() {
        let p = policy();
        assert_eq!(
            p.decide(1, Duration::from_millis(9_900), Observation::Pending),
            PollDecision::Fail(PollFailure::Exhausted)
        );
    }

    #[test]
    fn policy_from_partial_json() {
        let p: ConfirmPolicy = serde_json::from_str(r#"{"max_attempts": 3}"#).unwrap();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.initial_backoff_ms, ConfirmPolicy::default().initial_backoff_ms);
    }

    #[test]
    fn unknown_reason_display() {
        assert_eq!(
            UnknownReason::TimedOut { attempts: 4 }.to_string(),
            "confirmation timed out after 4 polls"
        );
    }
}
