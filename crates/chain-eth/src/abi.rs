//! Minimal ABI encoding for contract calls and return values.
//!
//! Supports the handful of types the wrapped token needs: `address`,
//! `uint256`, `bool` and dynamic `string`. Static parameters are encoded
//! in the head; a `string` puts its offset in the head and
//! `length || padded bytes` in the tail.

use alloy_primitives::U256;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

const WORD: usize = 32;

/// A single ABI parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiParam {
    Address([u8; 20]),
    Uint256(U256),
    Bool(bool),
    String(String),
}

impl AbiParam {
    fn is_dynamic(&self) -> bool {
        matches!(self, AbiParam::String(_))
    }
}

/// First four bytes of `keccak256(signature)`, e.g. `transfer(address,uint256)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Encode `selector || head || tail` for a function call.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * WORD);
    data.extend_from_slice(&selector);
    data.extend_from_slice(&encode_params(params));
    data
}

/// Encode a parameter tuple (no selector).
pub fn encode_params(params: &[AbiParam]) -> Vec<u8> {
    let head_len = params.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for param in params {
        if param.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            encode_tail(param, &mut tail);
        } else {
            head.extend_from_slice(&encode_static(param));
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn encode_static(param: &AbiParam) -> [u8; WORD] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(addr);
            word
        }
        AbiParam::Uint256(value) => uint_word(*value),
        AbiParam::Bool(b) => uint_word(U256::from(u8::from(*b))),
        AbiParam::String(_) => [0u8; WORD],
    }
}

fn encode_tail(param: &AbiParam, tail: &mut Vec<u8>) {
    if let AbiParam::String(s) = param {
        let bytes = s.as_bytes();
        tail.extend_from_slice(&uint_word(U256::from(bytes.len())));
        tail.extend_from_slice(bytes);
        let padding = (WORD - bytes.len() % WORD) % WORD;
        tail.resize(tail.len() + padding, 0);
    }
}

fn uint_word(value: U256) -> [u8; WORD] {
    value.to_be_bytes::<WORD>()
}

// ---------------------------------------------------------------------------
// Decoding return data
// ---------------------------------------------------------------------------

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], EthError> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            EthError::DecodeError(format!(
                "return data too short: need word at {offset}, have {} bytes",
                data.len()
            ))
        })
}

/// `value` as a `u64` if it does not exceed `max`.
pub(crate) fn small_uint(value: U256, max: u64) -> Option<u64> {
    (value <= U256::from(max)).then(|| value.as_limbs()[0])
}

fn word_as_usize(word: &[u8]) -> Result<usize, EthError> {
    let value = U256::from_be_slice(word);
    small_uint(value, u64::from(u32::MAX))
        .map(|v| v as usize)
        .ok_or_else(|| EthError::DecodeError(format!("offset {value} too large")))
}

/// Decode a single `uint256` return value.
pub fn decode_uint256(data: &[u8]) -> Result<U256, EthError> {
    Ok(U256::from_be_slice(word_at(data, 0)?))
}

/// Decode a `uint8` return value (e.g. `decimals()`).
pub fn decode_uint8(data: &[u8]) -> Result<u8, EthError> {
    let value = decode_uint256(data)?;
    small_uint(value, u64::from(u8::MAX))
        .map(|v| v as u8)
        .ok_or_else(|| EthError::DecodeError(format!("{value} does not fit in uint8")))
}

/// Decode a single dynamic `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String, EthError> {
    let offset = word_as_usize(word_at(data, 0)?)?;
    let len = word_as_usize(word_at(data, offset)?)?;
    let start = offset + WORD;

    let bytes = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| EthError::DecodeError(format!("string of {len} bytes exceeds return data")))?;

    String::from_utf8(bytes.to_vec())
        .map_err(|e| EthError::DecodeError(format!("string is not utf-8: {e}")))
}
