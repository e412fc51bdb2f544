use std::path::Path;
use std::time::Duration;

use crossbridge_eth::address::validate_address;
use crossbridge_eth::chains::{require_chain, supported_chains};
use crossbridge_eth::wrapped_token::{SEPOLIA_WRAPPED_SOL, WRAPPED_SOL_DECIMALS};
use crossbridge_sol::pda::MAX_SEED_LEN;
use crossbridge_sol::{address_to_bytes, Cluster, VaultLayout};
use serde::{Deserialize, Serialize};

use crate::confirm::ConfirmPolicy;
use crate::error::BridgeError;

pub const DEFAULT_PROGRAM_ID: &str = "7N9UCyKUqac5JuEjn4inZcBFhi87FXDRy3rP1mNhTrdB";
pub const DEFAULT_VAULT_SEED: &str = "bridge_vault_v2";
pub const DEFAULT_ADMIN: &str = "4dmQAcJe9Ksh4FtpMMfHajP4ssBhrbNrPrGc3v5jFFSA";

/// Environment variables read by [`BridgeConfig::with_env_overrides`].
pub const ENV_PROGRAM_ID: &str = "CROSSBRIDGE_PROGRAM_ID";
pub const ENV_VAULT_SEED: &str = "CROSSBRIDGE_VAULT_SEED";
pub const ENV_ADMIN: &str = "CROSSBRIDGE_ADMIN";
pub const ENV_CLUSTER: &str = "CROSSBRIDGE_CLUSTER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrappedTokenConfig {
    pub contract: String,
    pub symbol: String,
    pub decimals: u8,
    pub chain_id: u64,
    /// Added on top of `eth_estimateGas`.
    pub gas_margin_percent: u64,
}

impl Default for WrappedTokenConfig {
    fn default() -> Self {
        Self {
            contract: SEPOLIA_WRAPPED_SOL.to_string(),
            symbol: "wSOL".to_string(),
            decimals: WRAPPED_SOL_DECIMALS,
            chain_id: 11155111,
            gas_margin_percent: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub program_id: String,
    pub vault_seed: String,
    pub admin: String,
    pub cluster: Cluster,
    pub vault_layout: VaultLayout,
    /// Kept back from the lock amount for transaction fees.
    pub fee_buffer_lamports: u64,
    pub min_lock_lamports: u64,
    /// Balance the admin must hold to pay for fee collection.
    pub min_admin_balance_lamports: u64,
    pub confirm: ConfirmPolicy,
    pub balance_poll_interval_ms: u64,
    pub wrapped_token: WrappedTokenConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            vault_seed: DEFAULT_VAULT_SEED.to_string(),
            admin: DEFAULT_ADMIN.to_string(),
            cluster: Cluster::Devnet,
            vault_layout: VaultLayout::V2,
            fee_buffer_lamports: 10_000,
            min_lock_lamports: 1_000,
            min_admin_balance_lamports: 10_000,
            confirm: ConfirmPolicy::default(),
            balance_poll_interval_ms: 10_000,
            wrapped_token: WrappedTokenConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, BridgeError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BridgeError::Config(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&data)
    }

    /// Apply `CROSSBRIDGE_*` environment variables on top of this config.
    ///
    /// Opt-in: [`from_json_str`](Self::from_json_str), [`from_file`](Self::from_file)
    /// and `default()` never read the environment.
    pub fn with_env_overrides(self) -> Result<Self, BridgeError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BridgeError> {
        if let Some(program_id) = lookup(ENV_PROGRAM_ID) {
            self.program_id = program_id;
        }
        if let Some(seed) = lookup(ENV_VAULT_SEED) {
            self.vault_seed = seed;
        }
        if let Some(admin) = lookup(ENV_ADMIN) {
            self.admin = admin;
        }
        if let Some(cluster) = lookup(ENV_CLUSTER) {
            self.cluster = serde_json::from_value(serde_json::Value::String(cluster.clone()))
                .map_err(|_| BridgeError::Config(format!("invalid {ENV_CLUSTER}: {cluster}")))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        self.program_id_bytes()?;
        self.admin_bytes()?;

        if self.vault_seed.is_empty() {
            return Err(BridgeError::Config("vault_seed is empty".into()));
        }
        if self.vault_seed.len() > MAX_SEED_LEN {
            return Err(BridgeError::Config(format!(
                "vault_seed is {} bytes, max {MAX_SEED_LEN}",
                self.vault_seed.len()
            )));
        }
        if self.confirm.max_attempts == 0 {
            return Err(BridgeError::Config("confirm.max_attempts must be > 0".into()));
        }
        if self.confirm.initial_backoff_ms > self.confirm.max_backoff_ms {
            return Err(BridgeError::Config(
                "confirm.initial_backoff_ms exceeds confirm.max_backoff_ms".into(),
            ));
        }
        if self.balance_poll_interval_ms == 0 {
            return Err(BridgeError::Config("balance_poll_interval_ms must be > 0".into()));
        }

        let checksum_ok = validate_address(&self.wrapped_token.contract)
            .map_err(|e| BridgeError::Config(format!("wrapped_token.contract: {e}")))?;
        if !checksum_ok {
            return Err(BridgeError::Config(format!(
                "wrapped_token.contract: bad EIP-55 checksum in {}",
                self.wrapped_token.contract
            )));
        }
        require_chain(self.wrapped_token.chain_id).map_err(|e| {
            let ids: Vec<String> = supported_chains()
                .iter()
                .map(|c| format!("{} ({})", c.chain_id, c.name))
                .collect();
            BridgeError::Config(format!(
                "wrapped_token.chain_id: {e}; supported: {}",
                ids.join(", ")
            ))
        })?;
        Ok(())
    }

    pub fn program_id_bytes(&self) -> Result<[u8; 32], BridgeError> {
        address_to_bytes(&self.program_id)
            .map_err(|e| BridgeError::Config(format!("program_id: {e}")))
    }

    pub fn admin_bytes(&self) -> Result<[u8; 32], BridgeError> {
        address_to_bytes(&self.admin).map_err(|e| BridgeError::Config(format!("admin: {e}")))
    }

    pub fn balance_poll_interval(&self) -> Duration {
        Duration::from_millis(self.balance_poll_interval_ms)
    }
}
