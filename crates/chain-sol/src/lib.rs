//! Solana primitives for the CrossBridge client.
//!
//! This crate handles Base58 addresses, program-derived addresses, Anchor
//! instruction encoding, the legacy transaction wire format and the bridge
//! vault account layout, without pulling in `solana-sdk`.
//!
//! Everything here is pure: network access lives in `crossbridge-core`.

pub mod address;
pub mod error;
pub mod instruction;
pub mod pda;
pub mod transaction;
pub mod vault;

pub use address::{address_to_bytes, bytes_to_address, Cluster};
pub use error::SolError;
pub use instruction::{
    collect_fees_instruction, encode_instruction_data, initialize_instruction,
    instruction_discriminator, InstructionArg, LockInstruction,
};
pub use pda::{
    create_program_address, derive_bridge_vault, find_program_address, is_on_curve,
    BridgeVaultAddress,
};
pub use transaction::{
    build_pending_transaction, check_transaction_size, compile_transaction, decode_compact_u16,
    encode_compact_u16, serialize_message, sign_sol_raw_transaction, transaction_signature,
    CompiledInstruction, PendingTransaction, RecentBlockhash, SolAccountMeta, SolInstruction,
    SolTransaction, PACKET_DATA_SIZE, SYSTEM_PROGRAM_ID,
};
pub use vault::{parse_vault_account, BridgeVaultState, VaultLayout};
