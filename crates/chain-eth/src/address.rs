//! Ethereum address parsing, EIP-55 checksums and key-to-address derivation.

use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

use crate::error::EthError;

/// Parse a 0x-prefixed hex address into 20 bytes.
///
/// Case is not checked here; use [`validate_address`] for EIP-55.
pub fn parse_address(address: &str) -> Result<[u8; 20], EthError> {
    let hex_part = strip_0x(address.trim())?;

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|_| EthError::InvalidAddress("address contains non-hex characters".into()))?;

    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes);
    Ok(addr)
}

/// Validate an address string.
///
/// All-lowercase and all-uppercase addresses carry no checksum and are
/// accepted. Mixed case must match EIP-55; a mismatch returns `Ok(false)`.
pub fn validate_address(address: &str) -> Result<bool, EthError> {
    let bytes = parse_address(address)?;
    let hex_part = strip_0x(address.trim())?;

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return Ok(true);
    }

    Ok(to_checksum(&bytes)[2..] == *hex_part)
}

/// Apply the EIP-55 mixed-case checksum to an address string.
pub fn checksum_address(address: &str) -> Result<String, EthError> {
    parse_address(address).map(|bytes| to_checksum(&bytes))
}

/// EIP-55 encoding of raw address bytes.
pub fn to_checksum(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Derive the checksummed address for a secp256k1 private key.
pub fn address_from_secret(private_key: &[u8; 32]) -> Result<String, EthError> {
    let mut key_bytes = *private_key;
    let signing_key = SigningKey::from_bytes((&key_bytes).into())
        .map_err(|e| EthError::InvalidPrivateKey(e.to_string()));
    key_bytes.zeroize();
    let signing_key = signing_key?;

    let point = signing_key.verifying_key().to_encoded_point(false);
    // Skip the 0x04 uncompressed prefix.
    let hash = Keccak256::digest(&point.as_bytes()[1..]);

    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    Ok(to_checksum(&addr))
}

fn strip_0x(address: &str) -> Result<&str, EthError> {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))
}
