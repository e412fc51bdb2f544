use serde::Serialize;

use crate::error::EthError;

/// An EVM network the wrapped token is deployed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvmChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    pub explorer_url: &'static str,
    pub is_testnet: bool,
}

impl EvmChain {
    /// Block explorer link for a transaction hash.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url)
    }
}

/// Ethereum Mainnet (chain ID 1).
pub const ETHEREUM: EvmChain = EvmChain {
    chain_id: 1,
    name: "Ethereum",
    symbol: "ETH",
    decimals: 18,
    explorer_url: "https://etherscan.io",
    is_testnet: false,
};

/// Sepolia Testnet (chain ID 11155111).
pub const SEPOLIA: EvmChain = EvmChain {
    chain_id: 11155111,
    name: "Sepolia",
    symbol: "ETH",
    decimals: 18,
    explorer_url: "https://sepolia.etherscan.io",
    is_testnet: true,
};

const ALL_CHAINS: &[&EvmChain] = &[&ETHEREUM, &SEPOLIA];

/// Chain definition for a chain ID, or `None` if unsupported.
pub fn get_chain(chain_id: u64) -> Option<&'static EvmChain> {
    ALL_CHAINS.iter().find(|c| c.chain_id == chain_id).copied()
}

/// Like [`get_chain`], but an error for unknown IDs.
pub fn require_chain(chain_id: u64) -> Result<&'static EvmChain, EthError> {
    get_chain(chain_id).ok_or(EthError::UnsupportedChain(chain_id))
}

/// Every chain the wrapped token can be configured on.
pub fn supported_chains() -> Vec<&'static EvmChain> {
    ALL_CHAINS.to_vec()
}
