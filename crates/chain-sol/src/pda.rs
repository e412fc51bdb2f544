//! Program Derived Address (PDA) derivation.
//!
//! A PDA is `SHA-256(seed_0 || ... || seed_n || bump || program_id || "ProgramDerivedAddress")`
//! for the first bump (searching 255 down to 0) whose digest is NOT a valid
//! compressed Ed25519 point. Being off-curve guarantees no private key exists
//! for the address, so only the owning program can sign for it.

use sha2::{Digest, Sha256};

use crate::address::bytes_to_address;
use crate::error::SolError;

/// Maximum length of a single seed, in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, including the bump.
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// The bridge vault account: a PDA of `[seed]` under the bridge program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeVaultAddress {
    pub address: [u8; 32],
    pub bump: u8,
}

impl BridgeVaultAddress {
    pub fn to_base58(&self) -> String {
        bytes_to_address(&self.address)
    }
}

/// Derive the bridge vault address for `program_id` and a UTF-8 seed.
pub fn derive_bridge_vault(program_id: &[u8; 32], seed: &str) -> Result<BridgeVaultAddress, SolError> {
    let (address, bump) = find_program_address(&[seed.as_bytes()], program_id)?;
    Ok(BridgeVaultAddress { address, bump })
}

/// Find the canonical PDA (highest valid bump) for `seeds` under `program_id`.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), SolError> {
    validate_seeds(seeds, 1)?;

    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::DerivationExhausted)
}

/// Create a PDA from seeds that already include the bump.
///
/// Fails with `InvalidSeed` when the digest lands on the curve.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<[u8; 32], SolError> {
    validate_seeds(seeds, 0)?;

    try_create_program_address(seeds, &[], program_id).ok_or_else(|| {
        SolError::InvalidSeed("seeds produce an on-curve address".into())
    })
}

/// Check if 32 bytes decompress to a valid Ed25519 point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

fn validate_seeds(seeds: &[&[u8]], reserved: usize) -> Result<(), SolError> {
    if seeds.len() + reserved > MAX_SEEDS {
        return Err(SolError::InvalidSeed(format!(
            "too many seeds: {} (max {})",
            seeds.len() + reserved,
            MAX_SEEDS
        )));
    }

    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(SolError::InvalidSeed(format!(
            "seed is {} bytes (max {MAX_SEED_LEN})",
            seed.len()
        )));
    }

    Ok(())
}

fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &[u8; 32],
) -> Option<[u8; 32]> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(hash)
}
