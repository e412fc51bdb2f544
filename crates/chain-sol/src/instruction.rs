//! Anchor-style instruction encoding for the bridge program.
//!
//! Instruction data is an 8-byte discriminator followed by the Borsh
//! (little-endian) encoding of the arguments:
//!
//! ```text
//! discriminator   SHA-256("global:" || name)[0..8]
//! args            each argument in declaration order
//! ```
//!
//! The program decodes by exact byte layout, so the same `(name, args)` must
//! always produce the same bytes.

use sha2::{Digest, Sha256};

use crate::error::SolError;
use crate::transaction::{SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

/// Length of an Anchor instruction discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

pub const LOCK_SOL: &str = "lock_sol";
pub const INITIALIZE: &str = "initialize";
pub const COLLECT_FEES: &str = "collect_fees";

/// A typed instruction argument.
///
/// Integer variants carry an `i128` so that callers can hand over values
/// before range checking; encoding fails if the value does not fit the
/// declared width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionArg {
    U8(i128),
    U16(i128),
    U32(i128),
    U64(i128),
    I64(i128),
    Bool(bool),
    Pubkey([u8; 32]),
    /// Borsh string: u32 LE byte length followed by UTF-8 bytes.
    Str(String),
}

impl InstructionArg {
    fn type_name(&self) -> &'static str {
        match self {
            InstructionArg::U8(_) => "u8",
            InstructionArg::U16(_) => "u16",
            InstructionArg::U32(_) => "u32",
            InstructionArg::U64(_) => "u64",
            InstructionArg::I64(_) => "i64",
            InstructionArg::Bool(_) => "bool",
            InstructionArg::Pubkey(_) => "pubkey",
            InstructionArg::Str(_) => "string",
        }
    }

    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), SolError> {
        let out_of_range = |value: &i128| {
            SolError::EncodingError(format!(
                "value {value} does not fit in {}",
                self.type_name()
            ))
        };

        match self {
            InstructionArg::U8(v) => {
                let v = u8::try_from(*v).map_err(|_| out_of_range(v))?;
                buf.push(v);
            }
            InstructionArg::U16(v) => {
                let v = u16::try_from(*v).map_err(|_| out_of_range(v))?;
                buf.extend_from_slice(&v.to_le_bytes());
            }
            InstructionArg::U32(v) => {
                let v = u32::try_from(*v).map_err(|_| out_of_range(v))?;
                buf.extend_from_slice(&v.to_le_bytes());
            }
            InstructionArg::U64(v) => {
                let v = u64::try_from(*v).map_err(|_| out_of_range(v))?;
                buf.extend_from_slice(&v.to_le_bytes());
            }
            InstructionArg::I64(v) => {
                let v = i64::try_from(*v).map_err(|_| out_of_range(v))?;
                buf.extend_from_slice(&v.to_le_bytes());
            }
            InstructionArg::Bool(b) => buf.push(u8::from(*b)),
            InstructionArg::Pubkey(key) => buf.extend_from_slice(key),
            InstructionArg::Str(s) => {
                let len = u32::try_from(s.len()).map_err(|_| {
                    SolError::EncodingError(format!("string of {} bytes is too long", s.len()))
                })?;
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
        }

        Ok(())
    }
}

/// Compute the 8-byte discriminator for an instruction name.
pub fn instruction_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

/// Encode a full instruction payload: discriminator followed by arguments.
pub fn encode_instruction_data(name: &str, args: &[InstructionArg]) -> Result<Vec<u8>, SolError> {
    if name.is_empty() {
        return Err(SolError::EncodingError("instruction name is empty".into()));
    }

    let mut data = Vec::with_capacity(DISCRIMINATOR_LEN + 8 * args.len());
    data.extend_from_slice(&instruction_discriminator(name));
    for arg in args {
        arg.encode_into(&mut data)?;
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// Bridge instructions
// ---------------------------------------------------------------------------

/// `lock_sol(amount: u64)`: move `amount` lamports from the user into the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockInstruction {
    pub amount: u64,
}

impl LockInstruction {
    pub fn new(amount: u64) -> Self {
        Self { amount }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SolError> {
        encode_instruction_data(LOCK_SOL, &[InstructionArg::U64(i128::from(self.amount))])
    }

    /// Decode `lock_sol` instruction data, checking the discriminator.
    pub fn decode(data: &[u8]) -> Result<Self, SolError> {
        const LEN: usize = DISCRIMINATOR_LEN + 8;

        if data.len() != LEN {
            return Err(SolError::EncodingError(format!(
                "lock_sol data must be {LEN} bytes, got {}",
                data.len()
            )));
        }

        if data[..DISCRIMINATOR_LEN] != instruction_discriminator(LOCK_SOL) {
            return Err(SolError::EncodingError(format!(
                "discriminator mismatch: 0x{}",
                hex::encode(&data[..DISCRIMINATOR_LEN])
            )));
        }

        let mut amount = [0u8; 8];
        amount.copy_from_slice(&data[DISCRIMINATOR_LEN..]);
        Ok(Self {
            amount: u64::from_le_bytes(amount),
        })
    }

    /// Accounts: vault (writable), user (signer, writable), system program.
    pub fn to_instruction(
        &self,
        program_id: &[u8; 32],
        vault: &[u8; 32],
        user: &[u8; 32],
    ) -> Result<SolInstruction, SolError> {
        Ok(SolInstruction {
            program_id: *program_id,
            accounts: vec![
                writable(vault),
                signer(user),
                readonly(&SYSTEM_PROGRAM_ID),
            ],
            data: self.encode()?,
        })
    }
}

/// `initialize()`: create the vault account, paid for by `payer`.
pub fn initialize_instruction(
    program_id: &[u8; 32],
    vault: &[u8; 32],
    payer: &[u8; 32],
) -> Result<SolInstruction, SolError> {
    Ok(SolInstruction {
        program_id: *program_id,
        accounts: vec![
            writable(vault),
            signer(payer),
            readonly(&SYSTEM_PROGRAM_ID),
        ],
        data: encode_instruction_data(INITIALIZE, &[])?,
    })
}

/// `collect_fees()`: sweep accumulated fees from the vault to `collector`.
pub fn collect_fees_instruction(
    program_id: &[u8; 32],
    vault: &[u8; 32],
    admin: &[u8; 32],
    collector: &[u8; 32],
) -> Result<SolInstruction, SolError> {
    Ok(SolInstruction {
        program_id: *program_id,
        accounts: vec![
            writable(vault),
            signer(admin),
            writable(collector),
            readonly(&SYSTEM_PROGRAM_ID),
        ],
        data: encode_instruction_data(COLLECT_FEES, &[])?,
    })
}

fn writable(pubkey: &[u8; 32]) -> SolAccountMeta {
    SolAccountMeta {
        pubkey: *pubkey,
        is_signer: false,
        is_writable: true,
    }
}

fn signer(pubkey: &[u8; 32]) -> SolAccountMeta {
    SolAccountMeta {
        pubkey: *pubkey,
        is_signer: true,
        is_writable: true,
    }
}

fn readonly(pubkey: &[u8; 32]) -> SolAccountMeta {
    SolAccountMeta {
        pubkey: *pubkey,
        is_signer: false,
        is_writable: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Discriminators -----------------------------------------------------

    #[test]
    fn discriminator_is_sha256_prefix() {
        let full = Sha256::digest(b"global:lock_sol");
        assert_eq!(instruction_discriminator(LOCK_SOL), full[..8]);
    }

    #[test]
    fn discriminator_is_stable() {
        assert_eq!(
            instruction_discriminator(LOCK_SOL),
            instruction_discriminator("lock_sol")
        );
    }

    #[test]
    fn known_anchor_initialize_discriminator() {
        // Anchor's well-known `initialize` tag.
        assert_eq!(
            hex::encode(instruction_discriminator(INITIALIZE)),
            "afaf6d1f0d989bed"
        );
    }

    #[test]
    fn discriminators_differ_per_instruction() {
        let lock = instruction_discriminator(LOCK_SOL);
        let init = instruction_discriminator(INITIALIZE);
        let fees = instruction_discriminator(COLLECT_FEES);
        assert_ne!(lock, init);
        assert_ne!(lock, fees);
        assert_ne!(init, fees);
    }

    // -- Argument encoding --------------------------------------------------

    #[test]
    fn encodes_integers_little_endian() {
        let data = encode_instruction_data(
            "f",
            &[
                InstructionArg::U8(1),
                InstructionArg::U16(0x0203),
                InstructionArg::U32(0x0405_0607),
                InstructionArg::I64(-1),
            ],
        )
        .unwrap();
        let args = &data[8..];
        assert_eq!(args[0], 1);
        assert_eq!(&args[1..3], &[0x03, 0x02]);
        assert_eq!(&args[3..7], &[0x07, 0x06, 0x05, 0x04]);
        assert_eq!(&args[7..15], &[0xff; 8]);
    }

    #[test]
    fn encodes_bool_pubkey_and_string() {
        let key = [9u8; 32];
        let data = encode_instruction_data(
            "f",
            &[
                InstructionArg::Bool(true),
                InstructionArg::Pubkey(key),
                InstructionArg::Str("abc".into()),
            ],
        )
        .unwrap();
        let args = &data[8..];
        assert_eq!(args[0], 1);
        assert_eq!(&args[1..33], &key);
        assert_eq!(&args[33..37], &3u32.to_le_bytes());
        assert_eq!(&args[37..], b"abc");
    }

    #[test]
    fn negative_amount_into_u64_fails() {
        let err = encode_instruction_data(LOCK_SOL, &[InstructionArg::U64(-5)]).unwrap_err();
        assert!(matches!(err, SolError::EncodingError(_)));
        assert!(err.to_string().contains("does not fit in u64"));
    }

    #[test]
    fn overflowing_u8_fails() {
        assert!(encode_instruction_data("f", &[InstructionArg::U8(256)]).is_err());
    }

    #[test]
    fn u64_max_fits() {
        let data =
            encode_instruction_data("f", &[InstructionArg::U64(i128::from(u64::MAX))]).unwrap();
        assert_eq!(&data[8..], &[0xff; 8]);
    }

    #[test]
    fn empty_name_fails() {
        assert!(encode_instruction_data("", &[]).is_err());
    }

    // -- lock_sol -----------------------------------------------------------

    #[test]
    fn lock_sol_layout() {
        let data = LockInstruction::new(1_000_000).encode().unwrap();
        assert_eq!(data.len(), 16);
        assert_eq!(&data[..8], &instruction_discriminator(LOCK_SOL));
        assert_eq!(&data[8..], &1_000_000u64.to_le_bytes());
    }

    #[test]
    fn lock_sol_decodes_back() {
        let data = LockInstruction::new(1_000_000).encode().unwrap();
        let decoded = LockInstruction::decode(&data).unwrap();
        assert_eq!(decoded.amount, 1_000_000);
    }

    #[test]
    fn lock_sol_decode_rejects_wrong_discriminator() {
        let mut data = LockInstruction::new(7).encode().unwrap();
        data[0] ^= 0xff;
        let err = LockInstruction::decode(&data).unwrap_err();
        assert!(err.to_string().contains("discriminator mismatch"));
    }

    #[test]
    fn lock_sol_decode_rejects_wrong_length() {
        assert!(LockInstruction::decode(&[0u8; 15]).is_err());
    }

    #[test]
    fn lock_sol_account_order() {
        let program = [1u8; 32];
        let vault = [2u8; 32];
        let user = [3u8; 32];
        let ix = LockInstruction::new(5)
            .to_instruction(&program, &vault, &user)
            .unwrap();

        assert_eq!(ix.program_id, program);
        assert_eq!(ix.accounts.len(), 3);

        assert_eq!(ix.accounts[0].pubkey, vault);
        assert!(!ix.accounts[0].is_signer);
        assert!(ix.accounts[0].is_writable);

        assert_eq!(ix.accounts[1].pubkey, user);
        assert!(ix.accounts[1].is_signer);
        assert!(ix.accounts[1].is_writable);

        assert_eq!(ix.accounts[2].pubkey, SYSTEM_PROGRAM_ID);
        assert!(!ix.accounts[2].is_writable);
    }

    // -- initialize / collect_fees -----------------------------------------

    #[test]
    fn initialize_is_discriminator_only() {
        let ix = initialize_instruction(&[1; 32], &[2; 32], &[3; 32]).unwrap();
        assert_eq!(ix.data, instruction_discriminator(INITIALIZE).to_vec());
        assert!(ix.accounts[1].is_signer);
    }

    #[test]
    fn collect_fees_account_order() {
        let ix = collect_fees_instruction(&[1; 32], &[2; 32], &[3; 32], &[4; 32]).unwrap();
        assert_eq!(ix.data, instruction_discriminator(COLLECT_FEES).to_vec());

        let keys: Vec<[u8; 32]> = ix.accounts.iter().map(|a| a.pubkey).collect();
        assert_eq!(keys, vec![[2; 32], [3; 32], [4; 32], SYSTEM_PROGRAM_ID]);
        assert!(ix.accounts[1].is_signer);
        assert!(ix.accounts[2].is_writable);
        assert!(!ix.accounts[2].is_signer);
    }
}
