//! Simulation gate and transaction error decoding.
//!
//! Every transaction is dry-run before the wallet is asked to sign. A
//! rejection is decoded into a category the UI can act on; an RPC failure
//! during simulation is reported separately so the caller can retry.

use std::fmt;

use log::{debug, warn};
use serde_json::Value;

use crate::error::BridgeError;
use crate::rpc::SolanaRpc;

/// What went wrong, coarsely, for display and remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InsufficientFunds,
    UnauthorizedSigner,
    /// Account missing, uninitialized, or owned by the wrong program.
    AccountNotInitialized,
    AccountDataMismatch,
    /// A program error code with no known meaning.
    CustomProgram,
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCategory::InsufficientFunds => "insufficient funds",
            ErrorCategory::UnauthorizedSigner => "unauthorized signer",
            ErrorCategory::AccountNotInitialized => {
                "account not initialized or owned by the wrong program"
            }
            ErrorCategory::AccountDataMismatch => "account data shape mismatch",
            ErrorCategory::CustomProgram => "custom program error",
            ErrorCategory::Other => "transaction error",
        })
    }
}

/// Framework and bridge program error codes.
const CUSTOM_ERRORS: &[(u32, ErrorCategory, &str)] = &[
    (101, ErrorCategory::CustomProgram, "instruction not found in program"),
    (102, ErrorCategory::AccountDataMismatch, "instruction data did not deserialize"),
    (103, ErrorCategory::AccountDataMismatch, "instruction data did not serialize"),
    (300, ErrorCategory::Other, "account discriminator already set"),
    (301, ErrorCategory::AccountNotInitialized, "account discriminator not found"),
    (302, ErrorCategory::AccountDataMismatch, "account did not deserialize"),
    (303, ErrorCategory::AccountDataMismatch, "account did not serialize"),
    (304, ErrorCategory::Other, "not enough account keys"),
    (305, ErrorCategory::Other, "account is not mutable"),
    (306, ErrorCategory::AccountNotInitialized, "account owned by wrong program"),
    (2001, ErrorCategory::InsufficientFunds, "insufficient funds"),
    (2002, ErrorCategory::AccountDataMismatch, "invalid account data"),
    (2003, ErrorCategory::AccountNotInitialized, "invalid account owner"),
    (2004, ErrorCategory::AccountNotInitialized, "account not initialized"),
    (6000, ErrorCategory::UnauthorizedSigner, "unauthorized"),
    (6001, ErrorCategory::Other, "no fees to collect"),
];

/// Human text for a custom program error code, or `"custom error N"`.
pub fn custom_error_message(code: u32) -> String {
    match lookup_custom(code) {
        Some((_, text)) => text.to_string(),
        None => format!("custom error {code}"),
    }
}

fn lookup_custom(code: u32) -> Option<(ErrorCategory, &'static str)> {
    CUSTOM_ERRORS
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, category, text)| (*category, *text))
}

fn builtin_category(name: &str) -> ErrorCategory {
    match name {
        "InsufficientFunds" | "InsufficientFundsForFee" | "InsufficientFundsForRent" => {
            ErrorCategory::InsufficientFunds
        }
        "MissingRequiredSignature" | "SignatureFailure" => ErrorCategory::UnauthorizedSigner,
        "AccountNotFound" | "UninitializedAccount" | "IncorrectProgramId"
        | "InvalidAccountForFee" | "ProgramAccountNotFound" => ErrorCategory::AccountNotInitialized,
        "InvalidAccountData" | "AccountDataTooSmall" | "AccountDataSizeChanged" => {
            ErrorCategory::AccountDataMismatch
        }
        _ => ErrorCategory::Other,
    }
}

/// A decoded transaction error.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedError {
    /// Failing instruction, for instruction-level errors.
    pub instruction_index: Option<u8>,
    pub category: ErrorCategory,
    pub custom_code: Option<u32>,
    /// The builtin error name, or `"Custom"`.
    pub name: String,
    pub raw: Value,
}

impl DecodedError {
    pub fn message(&self) -> String {
        let detail = match self.custom_code {
            Some(code) => custom_error_message(code),
            None if self.category == ErrorCategory::Other => self.name.clone(),
            None => self.category.to_string(),
        };
        match self.instruction_index {
            Some(index) => format!("{detail} (instruction {index})"),
            None => detail,
        }
    }
}

/// Decode the `err` value of a simulation, signature status or transaction.
///
/// Understands `{"InstructionError": [i, {"Custom": n}]}`,
/// `{"InstructionError": [i, "Name"]}` and bare transaction-level errors
/// such as `"AccountNotFound"` or `{"InsufficientFundsForRent": {...}}`.
pub fn decode_transaction_error(err: &Value) -> DecodedError {
    let raw = err.clone();

    if let Some([index, inner]) = err
        .get("InstructionError")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
    {
        let instruction_index = index.as_u64().and_then(|i| u8::try_from(i).ok());
        if let Some(code) = inner
            .get("Custom")
            .and_then(Value::as_u64)
            .and_then(|c| u32::try_from(c).ok())
        {
            let category = lookup_custom(code)
                .map(|(category, _)| category)
                .unwrap_or(ErrorCategory::CustomProgram);
            return DecodedError {
                instruction_index,
                category,
                custom_code: Some(code),
                name: "Custom".into(),
                raw,
            };
        }

        let name = error_name(inner);
        return DecodedError {
            instruction_index,
            category: builtin_category(&name),
            custom_code: None,
            name,
            raw,
        };
    }

    let name = error_name(err);
    DecodedError {
        instruction_index: None,
        category: builtin_category(&name),
        custom_code: None,
        name,
        raw,
    }
}

fn error_name(value: &Value) -> String {
    match value {
        Value::String(name) => name.clone(),
        Value::Object(map) => map
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| "UnknownError".into()),
        other => other.to_string(),
    }
}

/// Outcome of a successful dry run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationReport {
    pub logs: Vec<String>,
    pub units_consumed: u64,
}

/// Result of a dry run: either it would succeed, or it would fail with a
/// decoded error.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    Success(SimulationReport),
    Rejected {
        error: DecodedError,
        logs: Vec<String>,
    },
}

pub struct Simulator<'a, R: SolanaRpc + ?Sized> {
    rpc: &'a R,
}

impl<'a, R: SolanaRpc + ?Sized> Simulator<'a, R> {
    pub fn new(rpc: &'a R) -> Self {
        Self { rpc }
    }

    /// Dry-run `wire`. An RPC failure is `SimulationUnavailable`; a program
    /// rejection is returned as [`SimulationOutcome::Rejected`].
    pub fn simulate(&self, wire: &[u8]) -> Result<SimulationOutcome, BridgeError> {
        let response = self.rpc.simulate_transaction(wire).map_err(|e| {
            warn!("simulation request failed: {e}");
            BridgeError::SimulationUnavailable(e)
        })?;

        let logs = response.logs.unwrap_or_default();
        match response.err {
            Some(err) if !err.is_null() => {
                let error = decode_transaction_error(&err);
                debug!("simulation rejected: {} ({})", error.message(), err);
                Ok(SimulationOutcome::Rejected { error, logs })
            }
            _ => {
                let units_consumed = response.units_consumed.unwrap_or(0);
                debug!("simulation passed, {units_consumed} compute units");
                Ok(SimulationOutcome::Success(SimulationReport {
                    logs,
                    units_consumed,
                }))
            }
        }
    }

    /// Like [`simulate`](Self::simulate), but a rejection is an error. Nothing
    /// may be signed or sent unless this returns `Ok`.
    pub fn gate(&self, wire: &[u8]) -> Result<SimulationReport, BridgeError> {
        match self.simulate(wire)? {
            SimulationOutcome::Success(report) => Ok(report),
            SimulationOutcome::Rejected { error, logs } => {
                Err(BridgeError::SimulationRejected { error, logs })
            }
        }
    }
}
