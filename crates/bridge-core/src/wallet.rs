//! Wallet seams.
//!
//! A wallet owns the key and decides whether to sign; the pipeline only
//! hands it wire bytes. The bundled implementations hold a raw key in
//! memory and are meant for tests and headless tooling.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbridge_eth::transaction::{sign_transaction, EthTransaction, SignedEthTransaction};
use crossbridge_sol::{address_to_bytes, sign_sol_raw_transaction};
use ed25519_dalek::SigningKey;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet not connected")]
    NotConnected,

    #[error("user rejected the request: {0}")]
    Rejected(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

pub trait SolanaWallet {
    fn connected(&self) -> bool;

    /// `None` while disconnected.
    fn public_key(&self) -> Option<[u8; 32]>;

    /// Sign unsigned wire bytes and return the signed wire bytes.
    fn sign_transaction(&self, wire: &[u8]) -> Result<Vec<u8>, WalletError>;
}

pub trait EthWallet {
    fn connected(&self) -> bool;

    /// 0x-prefixed checksummed address; `None` while disconnected.
    fn address(&self) -> Option<String>;

    fn sign_transaction(&self, tx: &EthTransaction) -> Result<SignedEthTransaction, WalletError>;
}

/// An Ed25519 keypair held in memory.
pub struct KeypairWallet {
    secret: Zeroizing<[u8; 32]>,
    public: [u8; 32],
    connected: AtomicBool,
}

impl KeypairWallet {
    pub fn from_secret(secret: [u8; 32]) -> Self {
        let public = SigningKey::from_bytes(&secret).verifying_key().to_bytes();
        Self {
            secret: Zeroizing::new(secret),
            public,
            connected: AtomicBool::new(true),
        }
    }

    /// Accepts a Base58 32-byte seed or 64-byte keypair (seed ‖ public key).
    pub fn from_base58(encoded: &str) -> Result<Self, WalletError> {
        let bytes = Zeroizing::new(
            bs58::decode(encoded.trim())
                .into_vec()
                .map_err(|e| WalletError::Signing(format!("invalid keypair encoding: {e}")))?,
        );
        let mut secret = [0u8; 32];
        match bytes.len() {
            32 | 64 => secret.copy_from_slice(&bytes[..32]),
            n => {
                return Err(WalletError::Signing(format!(
                    "keypair must be 32 or 64 bytes, got {n}"
                )))
            }
        }
        let wallet = Self::from_secret(secret);
        if bytes.len() == 64 && bytes[32..] != wallet.public {
            return Err(WalletError::Signing(
                "keypair public half does not match its secret".into(),
            ));
        }
        Ok(wallet)
    }

    pub fn address(&self) -> String {
        bs58::encode(self.public).into_string()
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn connect(&self) {
        self.connected.store(true, Ordering::Release);
    }
}

impl SolanaWallet for KeypairWallet {
    fn connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn public_key(&self) -> Option<[u8; 32]> {
        self.connected().then_some(self.public)
    }

    fn sign_transaction(&self, wire: &[u8]) -> Result<Vec<u8>, WalletError> {
        if !self.connected() {
            return Err(WalletError::NotConnected);
        }
        sign_sol_raw_transaction(&self.secret, wire).map_err(|e| WalletError::Signing(e.to_string()))
    }
}

/// A secp256k1 key held in memory.
pub struct LocalEthWallet {
    secret: Zeroizing<[u8; 32]>,
    address: String,
    connected: AtomicBool,
}

impl LocalEthWallet {
    pub fn from_secret(secret: [u8; 32]) -> Result<Self, WalletError> {
        let address = crossbridge_eth::address::address_from_secret(&secret)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(Self {
            secret: Zeroizing::new(secret),
            address,
            connected: AtomicBool::new(true),
        })
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

impl EthWallet for LocalEthWallet {
    fn connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn address(&self) -> Option<String> {
        self.connected().then(|| self.address.clone())
    }

    fn sign_transaction(&self, tx: &EthTransaction) -> Result<SignedEthTransaction, WalletError> {
        if !self.connected() {
            return Err(WalletError::NotConnected);
        }
        sign_transaction(tx, &self.secret).map_err(|e| WalletError::Signing(e.to_string()))
    }
}

/// Parse a Base58 Solana address typed by the user.
pub(crate) fn parse_solana_address(address: &str) -> Result<[u8; 32], ValidationError> {
    address_to_bytes(address).map_err(|_| {
        ValidationError::InvalidAddress(format!("'{}' is not a Solana address", address.trim()))
    })
}
