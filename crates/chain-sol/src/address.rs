//! Solana address encoding and validation.
//!
//! Solana addresses are Base58-encoded 32-byte values. For wallet accounts the
//! bytes are an Ed25519 public key; for program-derived addresses they are a
//! SHA-256 digest that deliberately lies off the curve (see [`crate::pda`]).

use serde::{Deserialize, Serialize};

use crate::error::SolError;

/// Solana cluster, used to build explorer links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    MainnetBeta,
    #[default]
    Devnet,
    Testnet,
}

impl Cluster {
    /// Query-string value understood by explorer.solana.com.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
        }
    }

    /// Explorer link for a transaction signature.
    pub fn explorer_tx_url(&self, signature: &str) -> String {
        match self {
            Cluster::MainnetBeta => format!("https://explorer.solana.com/tx/{signature}"),
            other => format!(
                "https://explorer.solana.com/tx/{signature}?cluster={}",
                other.as_str()
            ),
        }
    }
}

/// Decode a Solana address string to its 32-byte representation.
///
/// A valid address is Base58 that decodes to exactly 32 bytes.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], SolError> {
    let bytes = bs58::decode(address.trim())
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

/// Encode 32 bytes as a Solana address (Base58 string).
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}
