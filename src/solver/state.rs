//! Mutable state of a running simulation

use crate::error::{Invariant, LeachResult};
use crate::models::{CavernProfile, FluidState};
use crate::solver::{StepResult, VolumeTotals};

/// Everything a run owns between two steps
///
/// Created at run start, mutated once per accepted step by the driver and
/// consumed into the [`SimulationResult`](super::SimulationResult) at the end.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Simulated time \[h\]
    pub time: f64,
    /// Accepted steps so far
    pub step: usize,
    /// Index of the active stage
    pub stage: Option<usize>,
    pub cumulative: VolumeTotals,
    pub profile: CavernProfile,
    pub fluid: FluidState,
    pub history: Vec<StepResult>,
}

impl SimulationState {
    pub fn new(profile: CavernProfile, fluid: FluidState) -> Self {
        Self {
            time: 0.0,
            step: 0,
            stage: Some(0),
            cumulative: VolumeTotals::default(),
            profile,
            fluid,
            history: Vec::new(),
        }
    }

    /// Reject NaN or infinity anywhere in the state
    pub fn validate(&self) -> LeachResult<()> {
        for (index, node) in self.profile.nodes().iter().enumerate() {
            if !node.radius.is_finite() {
                return Err(Invariant::NonFinite { quantity: "radius", index }.into());
            }
            if !node.recession_rate.is_finite() {
                return Err(Invariant::NonFinite { quantity: "recession rate", index }.into());
            }
        }
        if !self.time.is_finite() {
            return Err(Invariant::NonFinite { quantity: "time", index: 0 }.into());
        }
        Ok(())
    }
}
