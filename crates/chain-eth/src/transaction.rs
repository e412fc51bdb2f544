//! EIP-1559 (type 2) transactions for contract calls.

use alloy_rlp::{Encodable, RlpEncodable};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

use crate::address::parse_address;
use crate::error::EthError;

/// EIP-1559 fee parameters, in wei per gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeParams {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// An unsigned EIP-1559 transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub to: [u8; 20],
    /// Value in wei.
    pub value: u128,
    pub data: Vec<u8>,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEthTransaction {
    /// `0x02 || rlp(signed fields)`.
    pub raw_tx: Vec<u8>,
    /// 0x-prefixed Keccak-256 of `raw_tx`.
    pub tx_hash: String,
}

/// Build a zero-value contract call.
pub fn build_contract_call(
    chain_id: u64,
    nonce: u64,
    contract: &str,
    calldata: Vec<u8>,
    fees: FeeParams,
    gas_limit: u64,
) -> Result<EthTransaction, EthError> {
    let to = parse_address(contract)?;

    if calldata.len() < 4 {
        return Err(EthError::TransactionBuildError(
            "calldata must start with a 4-byte selector".into(),
        ));
    }
    if gas_limit == 0 {
        return Err(EthError::TransactionBuildError("gas limit must be > 0".into()));
    }
    if fees.max_priority_fee_per_gas > fees.max_fee_per_gas {
        return Err(EthError::TransactionBuildError(format!(
            "priority fee {} exceeds max fee {}",
            fees.max_priority_fee_per_gas, fees.max_fee_per_gas
        )));
    }

    Ok(EthTransaction {
        chain_id,
        nonce,
        max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
        max_fee_per_gas: fees.max_fee_per_gas,
        gas_limit,
        to,
        value: 0,
        data: calldata,
    })
}

/// Gas limit with a percentage safety margin over an `eth_estimateGas` result.
pub fn gas_with_margin(estimate: u64, margin_percent: u64) -> u64 {
    estimate.saturating_add(estimate.saturating_mul(margin_percent) / 100)
}

/// `0x02 || rlp([chain_id, nonce, tip, max_fee, gas, to, value, data, access_list])`.
pub fn encode_unsigned_tx(tx: &EthTransaction) -> Vec<u8> {
    let fields = UnsignedTxFields {
        chain_id: tx.chain_id,
        nonce: tx.nonce,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        max_fee_per_gas: tx.max_fee_per_gas,
        gas_limit: tx.gas_limit,
        to: RlpAddress(tx.to),
        value: tx.value,
        data: tx.data.clone(),
        access_list: Vec::new(),
    };

    let mut payload = vec![0x02];
    fields.encode(&mut payload);
    payload
}

/// Sign with a secp256k1 key over `keccak256(encode_unsigned_tx(tx))`.
pub fn sign_transaction(
    tx: &EthTransaction,
    private_key: &[u8; 32],
) -> Result<SignedEthTransaction, EthError> {
    let msg_hash = Keccak256::digest(encode_unsigned_tx(tx));

    let mut key_bytes = *private_key;
    let signing_key = SigningKey::from_bytes((&key_bytes).into())
        .map_err(|e| EthError::InvalidPrivateKey(e.to_string()));
    key_bytes.zeroize();
    let signing_key = signing_key?;

    let (signature, recovery_id): (Signature, RecoveryId) = signing_key
        .sign_prehash(msg_hash.as_slice())
        .map_err(|e| EthError::SigningError(e.to_string()))?;

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&signature.r().to_bytes());
    s.copy_from_slice(&signature.s().to_bytes());

    let fields = SignedTxFields {
        chain_id: tx.chain_id,
        nonce: tx.nonce,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        max_fee_per_gas: tx.max_fee_per_gas,
        gas_limit: tx.gas_limit,
        to: RlpAddress(tx.to),
        value: tx.value,
        data: tx.data.clone(),
        access_list: Vec::new(),
        signature_y_parity: u8::from(recovery_id.is_y_odd()),
        signature_r: RlpU256(r),
        signature_s: RlpU256(s),
    };

    let mut raw_tx = vec![0x02];
    fields.encode(&mut raw_tx);

    let tx_hash = format!("0x{}", hex::encode(Keccak256::digest(&raw_tx)));
    Ok(SignedEthTransaction { raw_tx, tx_hash })
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable)]
struct UnsignedTxFields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: u128,
    data: Vec<u8>,
    access_list: Vec<AccessListItem>,
}

#[derive(RlpEncodable)]
struct SignedTxFields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: u128,
    data: Vec<u8>,
    access_list: Vec<AccessListItem>,
    signature_y_parity: u8,
    signature_r: RlpU256,
    signature_s: RlpU256,
}

/// Access list entry. Always empty for burns.
#[derive(RlpEncodable)]
struct AccessListItem {
    address: RlpAddress,
    storage_keys: Vec<[u8; 32]>,
}

/// 20 bytes encoded as an RLP string.
struct RlpAddress([u8; 20]);

impl Encodable for RlpAddress {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

/// 32-byte big-endian integer, RLP-encoded with leading zeros stripped.
struct RlpU256([u8; 32]);

impl RlpU256 {
    fn trimmed(&self) -> &[u8] {
        let start = self.0.iter().position(|&b| b != 0).unwrap_or(32);
        &self.0[start..]
    }
}

impl Encodable for RlpU256 {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.trimmed().encode(out);
    }

    fn length(&self) -> usize {
        self.trimmed().length()
    }
}
