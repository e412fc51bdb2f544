//! Burn flow against an in-memory Ethereum provider.

mod common;

use std::collections::VecDeque;
use std::sync::Mutex;

use alloy_primitives::keccak256;
use common::{fast_policy, init_logger, NoSleep};
use crossbridge_core::eth::abi::{encode_params, function_selector, AbiParam};
use crossbridge_core::eth::transaction::FeeParams;
use crossbridge_core::eth::wrapped_token::{
    BALANCE_OF_SIGNATURE, BURN_SIGNATURE, DECIMALS_SIGNATURE, SYMBOL_SIGNATURE,
};
use crossbridge_core::eth::{EthError, U256};
use crossbridge_core::sol::bytes_to_address;
use crossbridge_core::*;

const GWEI: u128 = 1_000_000_000;

struct EthState {
    chain_id: u64,
    code: Vec<u8>,
    balance: U256,
    dry_run: Result<(), RpcError>,
    send_error: Option<RpcError>,
    /// Popped per receipt poll; `Ok(None)` once empty.
    receipts: VecDeque<Result<Option<EthReceipt>, RpcError>>,
    receipt_status: u64,
}

struct MockEth {
    state: Mutex<EthState>,
    calls: Mutex<Vec<&'static str>>,
    sent: Mutex<Vec<Vec<u8>>>,
    dry_run_from: Mutex<Option<String>>,
}

impl MockEth {
    /// Sepolia, a deployed token, 5 wSOL held, and a receipt on the
    /// second poll.
    fn healthy() -> Self {
        Self {
            state: Mutex::new(EthState {
                chain_id: 11155111,
                code: vec![0x60, 0x80, 0x60, 0x40],
                balance: U256::from(5_000_000_000u64),
                dry_run: Ok(()),
                send_error: None,
                receipts: VecDeque::from(vec![Ok(None)]),
                receipt_status: 1,
            }),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            dry_run_from: Mutex::new(None),
        }
    }

    fn with<F: FnOnce(&mut EthState)>(self, f: F) -> Self {
        f(&mut *self.state.lock().unwrap());
        self
    }

    fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    fn call_log(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

fn tx_hash(raw: &[u8]) -> String {
    format!("0x{}", hex::encode(keccak256(raw)))
}

impl EthProvider for MockEth {
    fn chain_id(&self) -> Result<u64, RpcError> {
        self.record("eth_chainId");
        Ok(self.state.lock().unwrap().chain_id)
    }

    fn get_code(&self, _address: &str) -> Result<Vec<u8>, RpcError> {
        self.record("eth_getCode");
        Ok(self.state.lock().unwrap().code.clone())
    }

    fn call(&self, from: Option<&str>, _to: &str, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        self.record("eth_call");
        let state = self.state.lock().unwrap();
        let selector = &data[..4];

        if selector == function_selector(SYMBOL_SIGNATURE) {
            Ok(encode_params(&[AbiParam::String("wSOL".into())]))
        } else if selector == function_selector(DECIMALS_SIGNATURE) {
            Ok(encode_params(&[AbiParam::Uint256(U256::from(9u8))]))
        } else if selector == function_selector(BALANCE_OF_SIGNATURE) {
            Ok(encode_params(&[AbiParam::Uint256(state.balance)]))
        } else if selector == function_selector(BURN_SIGNATURE) {
            *self.dry_run_from.lock().unwrap() = from.map(str::to_string);
            state.dry_run.clone().map(|()| Vec::new())
        } else {
            Err(RpcError::ExecutionReverted("unknown selector".into()))
        }
    }

    fn estimate_gas(&self, _from: &str, _to: &str, _data: &[u8]) -> Result<u64, RpcError> {
        self.record("eth_estimateGas");
        Ok(50_000)
    }

    fn fee_data(&self) -> Result<FeeParams, RpcError> {
        self.record("eth_feeHistory");
        Ok(FeeParams {
            max_fee_per_gas: 30 * GWEI,
            max_priority_fee_per_gas: 2 * GWEI,
        })
    }

    fn get_transaction_count(&self, _address: &str) -> Result<u64, RpcError> {
        self.record("eth_getTransactionCount");
        Ok(7)
    }

    fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, RpcError> {
        self.record("eth_sendRawTransaction");
        if let Some(err) = self.state.lock().unwrap().send_error.clone() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(raw_tx.to_vec());
        Ok(tx_hash(raw_tx))
    }

    fn get_transaction_receipt(&self, hash: &str) -> Result<Option<EthReceipt>, RpcError> {
        self.record("eth_getTransactionReceipt");
        let mut state = self.state.lock().unwrap();
        let status = state.receipt_status;
        match state.receipts.pop_front() {
            Some(scripted) => scripted,
            None => Ok(Some(EthReceipt {
                transaction_hash: hash.to_string(),
                block_number: 77,
                gas_used: 51_234,
                status,
            })),
        }
    }
}

fn eth_wallet() -> LocalEthWallet {
    let mut secret = [0u8; 32];
    secret[31] = 1;
    LocalEthWallet::from_secret(secret).unwrap()
}

fn destination() -> String {
    bytes_to_address(&[7u8; 32])
}

fn burner(mutate: impl FnOnce(&mut EthState)) -> BurnClient<MockEth, NoSleep> {
    init_logger();
    BurnClient::with_sleeper(
        MockEth::healthy().with(mutate),
        NoSleep::default(),
        WrappedTokenConfig::default(),
        fast_policy(),
    )
    .unwrap()
}

#[test]
fn burn_confirms() {
    let client = burner(|_| {});
    let wallet = eth_wallet();

    let receipt = client.burn(&wallet, "1.5", &destination()).unwrap();

    assert_eq!(receipt.amount.to_string(), "1.500000000");
    assert_eq!(receipt.destination, destination());
    assert_eq!(receipt.block_number, 77);
    assert_eq!(receipt.gas_used, 51_234);
    assert!(receipt
        .explorer_url
        .starts_with("https://sepolia.etherscan.io/tx/0x"));

    let provider = client.provider();
    let sent = provider.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0][0], 0x02, "EIP-1559 envelope");
    assert_eq!(receipt.tx_hash, tx_hash(&sent[0]));

    assert_eq!(
        provider.dry_run_from.lock().unwrap().as_deref(),
        wallet.address().as_deref()
    );
    assert_eq!(provider.count("eth_getTransactionReceipt"), 2);
    assert!(!client.in_flight().is_busy());

    let json = serde_json::to_value(&receipt).unwrap();
    assert_eq!(json["amount"]["decimals"], 9);
    assert_eq!(json["gas_used"], 51_234);
}

#[test]
fn dry_run_precedes_signing() {
    let client = burner(|_| {});
    client.burn(&eth_wallet(), "1", &destination()).unwrap();

    assert_eq!(
        client.provider().call_log(),
        vec![
            "eth_chainId",
            "eth_getCode",
            "eth_call",
            "eth_call",
            "eth_estimateGas",
            "eth_feeHistory",
            "eth_getTransactionCount",
            "eth_sendRawTransaction",
            "eth_getTransactionReceipt",
            "eth_getTransactionReceipt",
        ]
    );
}

#[test]
fn validate_builds_burn_calldata() {
    let client = burner(|_| {});
    let plan = client
        .validate_burn(&eth_wallet(), " 2 ", &format!(" {} ", destination()))
        .unwrap();

    assert_eq!(plan.amount.base_units, U256::from(2_000_000_000u64));
    assert_eq!(plan.balance.base_units, U256::from(5_000_000_000u64));
    assert_eq!(plan.destination, destination());
    assert_eq!(plan.calldata[..4], function_selector(BURN_SIGNATURE));
    assert_eq!(client.provider().count("eth_sendRawTransaction"), 0);
}

#[test]
fn invalid_destination_is_rejected_locally() {
    let client = burner(|_| {});
    let err = client
        .burn(&eth_wallet(), "1", "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf")
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Validation(ValidationError::InvalidAddress(_))
    ));
    assert!(client.provider().call_log().is_empty());
}

#[test]
fn bad_amounts_are_rejected_locally() {
    let client = burner(|_| {});
    let wallet = eth_wallet();
    assert!(matches!(
        client.burn(&wallet, "0", &destination()),
        Err(BridgeError::Validation(ValidationError::NonPositiveAmount))
    ));
    assert!(matches!(
        client.burn(&wallet, "-1", &destination()),
        Err(BridgeError::Validation(ValidationError::NonPositiveAmount))
    ));
    assert!(matches!(
        client.burn(&wallet, "0.0000000001", &destination()),
        Err(BridgeError::Validation(ValidationError::InvalidAmount(_)))
    ));
    assert!(client.provider().call_log().is_empty());
}

#[test]
fn disconnected_wallet_cannot_burn() {
    let client = burner(|_| {});
    let wallet = eth_wallet();
    wallet.disconnect();
    assert!(matches!(
        client.burn(&wallet, "1", &destination()),
        Err(BridgeError::Validation(ValidationError::WalletNotConnected))
    ));
}

#[test]
fn burning_more_than_held_is_refused() {
    let client = burner(|s| s.balance = U256::from(1_000_000_000u64));
    let err = client.burn(&eth_wallet(), "2", &destination()).unwrap_err();

    match &err {
        BridgeError::Validation(ValidationError::InsufficientTokenBalance { symbol, have, need }) => {
            assert_eq!(symbol, "wSOL");
            assert_eq!(have, "1.000000000");
            assert_eq!(need, "2.000000000");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        err.remediation_hint(),
        Some("reduce the amount to at most your token balance")
    );
    assert_eq!(client.provider().count("eth_sendRawTransaction"), 0);
}

#[test]
fn wrong_network_is_refused() {
    let client = burner(|s| s.chain_id = 1);
    assert!(matches!(
        client.burn(&eth_wallet(), "1", &destination()),
        Err(BridgeError::Ethereum(EthError::UnsupportedChain(1)))
    ));
}

#[test]
fn missing_contract_is_a_config_error() {
    let client = burner(|s| s.code.clear());
    assert!(matches!(
        client.burn(&eth_wallet(), "1", &destination()),
        Err(BridgeError::Config(_))
    ));
}

#[test]
fn dry_run_revert_sends_nothing() {
    let client = burner(|s| {
        s.dry_run = Err(RpcError::ExecutionReverted("ERC20: burn amount exceeds balance".into()));
    });
    let err = client.burn(&eth_wallet(), "1", &destination()).unwrap_err();

    match err {
        BridgeError::Reverted { tx_hash, reason } => {
            assert_eq!(tx_hash, None);
            assert!(reason.contains("exceeds balance"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(client.provider().count("eth_estimateGas"), 0);
    assert_eq!(client.provider().count("eth_sendRawTransaction"), 0);
}

#[test]
fn dry_run_outage_is_not_a_revert() {
    let client = burner(|s| s.dry_run = Err(RpcError::Transport("connection reset".into())));
    assert!(matches!(
        client.burn(&eth_wallet(), "1", &destination()),
        Err(BridgeError::SimulationUnavailable(_))
    ));
}

#[test]
fn send_failure_is_a_submission_error() {
    let client = burner(|s| {
        s.send_error = Some(RpcError::Rpc {
            code: -32000,
            message: "nonce too low".into(),
        })
    });
    assert!(matches!(
        client.burn(&eth_wallet(), "1", &destination()),
        Err(BridgeError::Submission(SubmissionError::Send(_)))
    ));
    assert!(!client.in_flight().is_busy());
}

#[test]
fn reverted_receipt_carries_the_hash() {
    let client = burner(|s| s.receipt_status = 0);
    let err = client.burn(&eth_wallet(), "1", &destination()).unwrap_err();

    let sent = client.provider().sent.lock().unwrap().clone();
    match err {
        BridgeError::Reverted { tx_hash, .. } => {
            assert_eq!(tx_hash, Some(self::tx_hash(&sent[0])));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn receipt_poll_errors_are_retried() {
    let client = burner(|s| {
        s.receipts = VecDeque::from(vec![
            Err(RpcError::Timeout("eth_getTransactionReceipt".into())),
            Ok(None),
        ]);
    });
    assert!(client.burn(&eth_wallet(), "1", &destination()).is_ok());
    assert_eq!(client.provider().count("eth_getTransactionReceipt"), 3);
}

#[test]
fn missing_receipt_is_unknown() {
    let client = burner(|s| s.receipts = (0..10).map(|_| Ok(None)).collect());
    let err = client.burn(&eth_wallet(), "1", &destination()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::ConfirmationUnknown {
            reason: UnknownReason::TimedOut { attempts: 4 },
            ..
        }
    ));
    assert_eq!(client.provider().count("eth_getTransactionReceipt"), 4);
}

#[test]
fn reads_token_metadata() {
    let client = burner(|_| {});
    assert_eq!(
        client.read_token_metadata().unwrap(),
        TokenMetadata {
            symbol: "wSOL".into(),
            decimals: 9,
        }
    );
}

#[test]
fn reads_wrapped_balance() {
    let client = burner(|_| {});
    let wallet = eth_wallet();
    let token = WrappedTokenConfig::default();

    let view = read_wrapped_balance(client.provider(), &wallet, &token).unwrap();
    assert_eq!(view.amount().map(|a| a.to_string()), Some("5.000000000".into()));

    wallet.disconnect();
    assert_eq!(
        read_wrapped_balance(client.provider(), &wallet, &token).unwrap(),
        BalanceView::Disconnected
    );
    assert_eq!(client.provider().count("eth_call"), 1);
}
