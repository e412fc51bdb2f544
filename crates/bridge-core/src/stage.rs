use std::fmt;

use log::{debug, warn};
use serde::Serialize;

/// Stages of a bridge transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStage {
    Building,
    Simulating,
    SimulationFailed,
    Signing,
    Submitting,
    SubmitFailed,
    Confirming,
    Confirmed,
    OnChainFailed,
    /// Polling gave up; a direct lookup decides the outcome.
    Timeout,
    Unknown,
}

impl TxStage {
    pub fn can_transition_to(self, next: TxStage) -> bool {
        use TxStage::*;
        matches!(
            (self, next),
            (Building, Simulating)
                | (Simulating, SimulationFailed)
                | (Simulating, Signing)
                | (Signing, Submitting)
                | (Signing, SubmitFailed)
                | (Submitting, SubmitFailed)
                | (Submitting, Confirming)
                | (Confirming, Confirmed)
                | (Confirming, OnChainFailed)
                | (Confirming, Timeout)
                | (Timeout, Confirmed)
                | (Timeout, OnChainFailed)
                | (Timeout, Unknown)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TxStage::SimulationFailed
                | TxStage::SubmitFailed
                | TxStage::Confirmed
                | TxStage::OnChainFailed
                | TxStage::Unknown
        )
    }
}

impl fmt::Display for TxStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxStage::Building => "building",
            TxStage::Simulating => "simulating",
            TxStage::SimulationFailed => "simulation failed",
            TxStage::Signing => "signing",
            TxStage::Submitting => "submitting",
            TxStage::SubmitFailed => "submit failed",
            TxStage::Confirming => "confirming",
            TxStage::Confirmed => "confirmed",
            TxStage::OnChainFailed => "failed on-chain",
            TxStage::Timeout => "timed out",
            TxStage::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Records the stages one transaction passes through.
#[derive(Debug, Clone)]
pub struct StageTracker {
    label: &'static str,
    stages: Vec<TxStage>,
}

impl StageTracker {
    pub fn new(label: &'static str) -> Self {
        debug!("{label}: {}", TxStage::Building);
        Self {
            label,
            stages: vec![TxStage::Building],
        }
    }

    pub fn current(&self) -> TxStage {
        self.stages.last().copied().unwrap_or(TxStage::Building)
    }

    pub fn advance(&mut self, next: TxStage) {
        let current = self.current();
        if current.is_terminal() {
            warn!("{}: {next} after terminal stage {current}", self.label);
            debug_assert!(false, "{next:?} after terminal stage {current:?}");
        } else if current.can_transition_to(next) {
            debug!("{}: {current} -> {next}", self.label);
        } else {
            warn!("{}: unexpected transition {current} -> {next}", self.label);
            debug_assert!(false, "illegal stage transition {current:?} -> {next:?}");
        }
        self.stages.push(next);
    }

    pub fn into_stages(self) -> Vec<TxStage> {
        self.stages
    }
}
