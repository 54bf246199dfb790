//! Step records and run results

use crate::error::SimulationError;
use crate::models::{Diagnostic, FluidInterfaces, StageKind, StageTransition};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fluid volumes moved through the cavern \[m³\]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeTotals {
    pub injected: f64,
    pub filled: f64,
    pub withdrawn: f64,
    pub vented: f64,
    pub dissolved: f64,
}

impl std::ops::AddAssign for VolumeTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.injected += rhs.injected;
        self.filled += rhs.filled;
        self.withdrawn += rhs.withdrawn;
        self.vented += rhs.vented;
        self.dissolved += rhs.dissolved;
    }
}

impl VolumeTotals {
    /// Net volume entering the cavern contents
    pub fn net_inflow(&self) -> f64 {
        self.injected + self.filled - self.withdrawn - self.vented + self.dissolved
    }
}

/// State of the cavern after one accepted step
///
/// A step subdivided into several substeps still produces a single record
/// covering the whole interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// 1-based index of the accepted step
    pub step: usize,
    /// Simulated time at the end of the step \[h\]
    pub time: f64,
    pub dt: f64,
    /// Substeps the interval was split into
    pub substeps: usize,

    pub stage: usize,
    pub kind: StageKind,

    /// Node radii \[m\]
    pub radii: DVector<f64>,
    /// Node recession rates of the last substep \[m/h\]
    pub recession_rates: DVector<f64>,
    pub interfaces: FluidInterfaces,

    pub cavern_volume: f64,
    pub blanket_volume: f64,
    pub brine_volume: f64,
    pub pile_volume: f64,

    /// Brine specific gravity at the end of the step
    pub specific_gravity: f64,
    /// Salinity of the brine produced during the step
    pub produced_salinity: f64,

    /// Volumes moved during this step
    pub step_volumes: VolumeTotals,
    /// Volumes moved since the start of the run
    pub cumulative: VolumeTotals,

    /// `V_blanket + V_brine + V_pile − V_cavern` \[m³\]
    pub volume_error: f64,

    pub transition: Option<StageTransition>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Why a run stopped normally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Every stage reached its target
    ScheduleExhausted,
    MaxTime,
    MaxSteps,
    /// The roof receded beyond the configured limit
    RoofExposed,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Termination::ScheduleExhausted => "schedule exhausted",
            Termination::MaxTime => "maximum time reached",
            Termination::MaxSteps => "maximum step count reached",
            Termination::RoofExposed => "roof exposed",
        };
        f.write_str(text)
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Termination),
    Failed(SimulationError),
    Cancelled,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// History and outcome of a run
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub history: Vec<StepResult>,
    pub outcome: RunOutcome,
    pub metadata: BTreeMap<String, String>,
}

impl SimulationResult {
    pub fn new(history: Vec<StepResult>, outcome: RunOutcome) -> Self {
        Self {
            history,
            outcome,
            metadata: BTreeMap::new(),
        }
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    /// Number of accepted steps
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last(&self) -> Option<&StepResult> {
        self.history.last()
    }

    pub fn times(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.time).collect()
    }

    pub fn cavern_volumes(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.cavern_volume).collect()
    }

    pub fn blanket_depths(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.interfaces.blanket_depth).collect()
    }

    pub fn produced_salinities(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.produced_salinity).collect()
    }

    /// Steps at which the active stage changed
    pub fn transitions(&self) -> Vec<(usize, &StageTransition)> {
        self.history
            .iter()
            .filter_map(|s| s.transition.as_ref().map(|t| (s.step, t)))
            .collect()
    }
}
