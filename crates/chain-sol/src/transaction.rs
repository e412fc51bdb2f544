//! Legacy Solana transaction wire format, size gate and signing.
//!
//! Transactions are assembled by hand from the compact binary layout:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```
//!
//! A serialized transaction must fit in a single network packet
//! ([`PACKET_DATA_SIZE`]); anything larger is rejected before it touches
//! the network.

use ed25519_dalek::Signer;
use zeroize::Zeroize;

use crate::address::{address_to_bytes, bytes_to_address};
use crate::error::SolError;

/// The Solana System Program public key: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// Maximum serialized transaction size accepted by the network.
pub const PACKET_DATA_SIZE: usize = 1232;

const SIGNATURE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` in Solana's compact-u16 (7 bits per byte) format.
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut rest = u32::from(value);
    let mut out = Vec::with_capacity(3);

    loop {
        let low = (rest & 0x7f) as u8;
        rest >>= 7;
        if rest == 0 {
            out.push(low);
            return out;
        }
        out.push(low | 0x80);
    }
}

/// Decode a compact-u16 value, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;

    for (i, byte) in data.iter().take(3).enumerate() {
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            let value = u16::try_from(value)
                .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()))?;
            return Ok((value, i + 1));
        }
    }

    if data.len() >= 3 {
        return Err(SolError::SerializationError(
            "compact-u16 longer than 3 bytes".into(),
        ));
    }

    Err(SolError::SerializationError(
        "unexpected end of data while decoding compact-u16".into(),
    ))
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("too many {what}: {len}")))?;
    Ok(encode_compact_u16(len))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

/// An instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled (unsigned) transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolTransaction {
    /// Account keys in canonical order: writable signers (fee payer first),
    /// read-only signers, writable non-signers, read-only non-signers.
    pub account_keys: Vec<[u8; 32]>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub recent_blockhash: [u8; 32],
    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// An instruction whose account references are indices into `account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A recent blockhash and the last block height at which it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentBlockhash {
    pub blockhash: [u8; 32],
    pub last_valid_block_height: u64,
}

impl RecentBlockhash {
    /// Parse the Base58 blockhash returned by `getLatestBlockhash`.
    pub fn from_base58(blockhash: &str, last_valid_block_height: u64) -> Result<Self, SolError> {
        let blockhash = address_to_bytes(blockhash)
            .map_err(|e| SolError::TransactionBuildError(format!("bad blockhash: {e}")))?;
        Ok(Self {
            blockhash,
            last_valid_block_height,
        })
    }

    pub fn to_base58(&self) -> String {
        bytes_to_address(&self.blockhash)
    }
}

/// A built, size-checked, unsigned transaction bound to a blockhash window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub instructions: Vec<SolInstruction>,
    pub fee_payer: [u8; 32],
    pub recent_blockhash: RecentBlockhash,
    pub message: SolTransaction,
}

impl PendingTransaction {
    /// Fail if the network has moved past the blockhash validity window.
    ///
    /// An expired transaction must be rebuilt with a fresh blockhash.
    pub fn ensure_not_expired(&self, current_block_height: u64) -> Result<(), SolError> {
        if current_block_height > self.recent_blockhash.last_valid_block_height {
            return Err(SolError::BlockhashExpired {
                last_valid: self.recent_blockhash.last_valid_block_height,
                current: current_block_height,
            });
        }
        Ok(())
    }

    /// Wire bytes with zeroed signature slots, for simulation and for the
    /// wallet to sign.
    pub fn wire_unsigned(&self) -> Result<Vec<u8>, SolError> {
        let message = serialize_message(&self.message)?;
        let num_sigs = usize::from(self.message.num_required_signatures);

        let mut wire = Vec::with_capacity(3 + num_sigs * SIGNATURE_LEN + message.len());
        wire.extend_from_slice(&compact_len(num_sigs, "signatures")?);
        wire.resize(wire.len() + num_sigs * SIGNATURE_LEN, 0);
        wire.extend_from_slice(&message);
        Ok(wire)
    }

    pub fn wire_size(&self) -> Result<usize, SolError> {
        wire_size(&self.message)
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Compile instructions into a message with a single fee payer at index 0.
pub fn compile_transaction(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SolError> {
    if instructions.is_empty() {
        return Err(SolError::TransactionBuildError(
            "transaction has no instructions".into(),
        ));
    }

    struct AccountEntry {
        pubkey: [u8; 32],
        is_signer: bool,
        is_writable: bool,
    }

    impl AccountEntry {
        fn rank(&self) -> u8 {
            match (self.is_signer, self.is_writable) {
                (true, true) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (false, false) => 3,
            }
        }
    }

    let mut entries: Vec<AccountEntry> = Vec::new();
    let mut upsert = |pubkey: [u8; 32], signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);
    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable sort: the fee payer was inserted first with rank 0, so it stays at index 0.
    entries.sort_by_key(AccountEntry::rank);

    if entries.len() > usize::from(u8::MAX) + 1 {
        return Err(SolError::TransactionBuildError(format!(
            "too many accounts: {}",
            entries.len()
        )));
    }

    let count = |pred: fn(&AccountEntry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
    let num_required_signatures = count(|e| e.is_signer);
    let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
    let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

    let account_keys: Vec<[u8; 32]> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &[u8; 32]| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError("account not in account keys".into()))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        compiled.push(CompiledInstruction {
            program_id_index: index_of(&ix.program_id)?,
            account_indices: ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<Result<_, _>>()?,
            data: ix.data.clone(),
        });
    }

    Ok(SolTransaction {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions: compiled,
    })
}

/// Serialize the message (the bytes that get signed).
pub fn serialize_message(tx: &SolTransaction) -> Result<Vec<u8>, SolError> {
    let mut buf = Vec::with_capacity(256);

    buf.push(tx.num_required_signatures);
    buf.push(tx.num_readonly_signed);
    buf.push(tx.num_readonly_unsigned);

    buf.extend_from_slice(&compact_len(tx.account_keys.len(), "account keys")?);
    for key in &tx.account_keys {
        buf.extend_from_slice(key);
    }

    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&compact_len(tx.compiled_instructions.len(), "instructions")?);
    for ix in &tx.compiled_instructions {
        buf.push(ix.program_id_index);
        buf.extend_from_slice(&compact_len(ix.account_indices.len(), "instruction accounts")?);
        buf.extend_from_slice(&ix.account_indices);
        buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data bytes")?);
        buf.extend_from_slice(&ix.data);
    }

    Ok(buf)
}

/// Full wire size of a message once every signature slot is filled.
pub fn wire_size(tx: &SolTransaction) -> Result<usize, SolError> {
    let num_sigs = usize::from(tx.num_required_signatures);
    let sigs = compact_len(num_sigs, "signatures")?.len() + num_sigs * SIGNATURE_LEN;
    Ok(sigs + serialize_message(tx)?.len())
}

/// Reject instructions whose signed transaction would exceed [`PACKET_DATA_SIZE`].
///
/// The blockhash is a fixed 32 bytes, so a placeholder gives the exact size
/// and this can run before any network call.
pub fn check_transaction_size(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
) -> Result<usize, SolError> {
    let tx = compile_transaction(instructions, fee_payer, &[0u8; 32])?;
    let size = wire_size(&tx)?;
    if size > PACKET_DATA_SIZE {
        return Err(SolError::OversizeTransaction {
            size,
            max: PACKET_DATA_SIZE,
        });
    }
    Ok(size)
}

/// Compile and size-check a transaction against a fetched blockhash.
pub fn build_pending_transaction(
    instructions: Vec<SolInstruction>,
    fee_payer: &[u8; 32],
    recent_blockhash: RecentBlockhash,
) -> Result<PendingTransaction, SolError> {
    let message = compile_transaction(&instructions, fee_payer, &recent_blockhash.blockhash)?;

    let size = wire_size(&message)?;
    if size > PACKET_DATA_SIZE {
        return Err(SolError::OversizeTransaction {
            size,
            max: PACKET_DATA_SIZE,
        });
    }

    Ok(PendingTransaction {
        instructions,
        fee_payer: *fee_payer,
        recent_blockhash,
        message,
    })
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Sign a wire-format transaction with an Ed25519 seed.
///
/// Locates the signer slot matching the key's public key and writes the
/// signature over the message into it. Other slots are left untouched.
pub fn sign_sol_raw_transaction(
    private_key: &[u8; 32],
    raw_tx: &[u8],
) -> Result<Vec<u8>, SolError> {
    let mut seed = *private_key;
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
    seed.zeroize();
    let our_pubkey = signing_key.verifying_key().to_bytes();

    let (num_sigs, prefix_len) = decode_compact_u16(raw_tx)?;
    if num_sigs == 0 {
        return Err(SolError::TransactionBuildError(
            "transaction has zero signatures".into(),
        ));
    }

    let sigs_end = prefix_len + usize::from(num_sigs) * SIGNATURE_LEN;
    if sigs_end > raw_tx.len() {
        return Err(SolError::SerializationError(
            "transaction too short: signature slots exceed length".into(),
        ));
    }

    let message = &raw_tx[sigs_end..];
    if message.len() < 4 {
        return Err(SolError::SerializationError(
            "transaction message too short".into(),
        ));
    }

    let num_required_sigs = usize::from(message[0]);
    let (num_accounts, keys_prefix_len) = decode_compact_u16(&message[3..])?;
    let keys_start = 3 + keys_prefix_len;
    let keys_end = keys_start + usize::from(num_accounts) * 32;
    if keys_end > message.len() {
        return Err(SolError::SerializationError(
            "transaction message too short for account keys".into(),
        ));
    }

    let signer_index = message[keys_start..keys_end]
        .chunks_exact(32)
        .take(num_required_sigs.min(usize::from(num_sigs)))
        .position(|key| key == our_pubkey)
        .ok_or_else(|| {
            SolError::SigningError("wallet pubkey not found in transaction signers".into())
        })?;

    let signature = signing_key.sign(message);

    let mut signed = raw_tx.to_vec();
    let offset = prefix_len + signer_index * SIGNATURE_LEN;
    signed[offset..offset + SIGNATURE_LEN].copy_from_slice(&signature.to_bytes());
    Ok(signed)
}

/// Base58 of the first signature: the transaction id used for status lookups.
pub fn transaction_signature(wire: &[u8]) -> Result<String, SolError> {
    let (num_sigs, prefix_len) = decode_compact_u16(wire)?;
    if num_sigs == 0 || wire.len() < prefix_len + SIGNATURE_LEN {
        return Err(SolError::SerializationError(
            "transaction carries no signature".into(),
        ));
    }

    let sig = &wire[prefix_len..prefix_len + SIGNATURE_LEN];
    if sig.iter().all(|b| *b == 0) {
        return Err(SolError::SigningError("transaction is not signed".into()));
    }
    Ok(bs58::encode(sig).into_string())
}
