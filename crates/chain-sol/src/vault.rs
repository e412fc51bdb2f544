//! Bridge vault account data.
//!
//! The vault account has shipped with two layouts. Both start with an 8-byte
//! Anchor account discriminator and are little-endian:
//!
//! ```text
//! V1 (17 bytes)  disc[8] | total_locked u64 | bump u8
//! V2 (57 bytes)  disc[8] | admin[32] | total_locked u64 | bump u8 | fees_collected u64
//! ```
//!
//! The length is checked against the expected version before any field is read.

use serde::{Deserialize, Serialize};

use crate::error::SolError;

/// Vault account layout version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VaultLayout {
    V1,
    #[default]
    V2,
}

impl VaultLayout {
    /// Account data size in bytes.
    pub const fn size(&self) -> usize {
        match self {
            VaultLayout::V1 => 17,
            VaultLayout::V2 => 57,
        }
    }

    pub const fn has_fees(&self) -> bool {
        matches!(self, VaultLayout::V2)
    }
}

/// Offset of `fees_collected` in a V2 vault.
pub const V2_FEES_OFFSET: usize = 49;

/// Decoded vault account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeVaultState {
    pub layout: VaultLayout,
    pub discriminator: [u8; 8],
    /// Admin recorded on-chain. `None` for V1.
    pub admin: Option<[u8; 32]>,
    pub total_locked: u64,
    pub bump: u8,
    /// Fees accrued and not yet collected. Always 0 for V1.
    pub fees_collected: u64,
}

/// Parse vault account data against the expected layout.
pub fn parse_vault_account(data: &[u8], expected: VaultLayout) -> Result<BridgeVaultState, SolError> {
    if data.len() != expected.size() {
        return Err(SolError::AccountDataMismatch {
            expected: expected.size(),
            actual: data.len(),
        });
    }

    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&data[..8]);

    let state = match expected {
        VaultLayout::V1 => BridgeVaultState {
            layout: expected,
            discriminator,
            admin: None,
            total_locked: read_u64(data, 8),
            bump: data[16],
            fees_collected: 0,
        },
        VaultLayout::V2 => {
            let mut admin = [0u8; 32];
            admin.copy_from_slice(&data[8..40]);
            BridgeVaultState {
                layout: expected,
                discriminator,
                admin: Some(admin),
                total_locked: read_u64(data, 40),
                bump: data[48],
                fees_collected: read_u64(data, V2_FEES_OFFSET),
            }
        }
    };

    Ok(state)
}

// Callers have already checked the length.
fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v2_bytes(admin: [u8; 32], locked: u64, bump: u8, fees: u64) -> Vec<u8> {
        let mut data = vec![0xD1; 8];
        data.extend_from_slice(&admin);
        data.extend_from_slice(&locked.to_le_bytes());
        data.push(bump);
        data.extend_from_slice(&fees.to_le_bytes());
        data
    }

    #[test]
    fn sizes() {
        assert_eq!(VaultLayout::V1.size(), 17);
        assert_eq!(VaultLayout::V2.size(), 57);
        assert_eq!(VaultLayout::default(), VaultLayout::V2);
    }

    #[test]
    fn parse_v2() {
        let data = v2_bytes([4; 32], 5_000_000_000, 254, 12_345);
        assert_eq!(data.len(), 57);

        let state = parse_vault_account(&data, VaultLayout::V2).unwrap();
        assert_eq!(state.discriminator, [0xD1; 8]);
        assert_eq!(state.admin, Some([4; 32]));
        assert_eq!(state.total_locked, 5_000_000_000);
        assert_eq!(state.bump, 254);
        assert_eq!(state.fees_collected, 12_345);
    }

    #[test]
    fn fees_live_at_offset_49() {
        let data = v2_bytes([0; 32], 0, 0, 777);
        assert_eq!(&data[V2_FEES_OFFSET..], &777u64.to_le_bytes());
    }

    #[test]
    fn parse_v1() {
        let mut data = vec![0xAB; 8];
        data.extend_from_slice(&42u64.to_le_bytes());
        data.push(253);

        let state = parse_vault_account(&data, VaultLayout::V1).unwrap();
        assert_eq!(state.admin, None);
        assert_eq!(state.total_locked, 42);
        assert_eq!(state.bump, 253);
        assert_eq!(state.fees_collected, 0);
        assert!(!state.layout.has_fees());
    }

    #[test]
    fn v1_data_against_v2_layout_is_rejected() {
        let err = parse_vault_account(&[0u8; 17], VaultLayout::V2).unwrap_err();
        assert_eq!(
            err,
            SolError::AccountDataMismatch {
                expected: 57,
                actual: 17
            }
        );
    }

    #[test]
    fn empty_data_is_rejected() {
        assert!(parse_vault_account(&[], VaultLayout::V1).is_err());
    }

    #[test]
    fn layout_serde_names() {
        assert_eq!(serde_json::to_string(&VaultLayout::V1).unwrap(), "\"V1\"");
        let parsed: VaultLayout = serde_json::from_str("\"V2\"").unwrap();
        assert_eq!(parsed, VaultLayout::V2);
    }
}
