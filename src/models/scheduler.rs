//! Stage scheduler
//!
//! A small state machine walking through the schedule:
//!
//! ```text
//!            ┌──────────── termination met, next stage ──────────┐
//!            ▼                                                   │
//!   Idle / Leaching / Filling / LeachingAndFilling { stage } ────┘
//!            │                          │
//!            │ last stage done          │ fatal error
//!            ▼                          ▼
//!        Completed                   Failed
//! ```
//!
//! The scheduler knows nothing about time integration. The driver feeds it the
//! volumes of each accepted step ([`StageScheduler::record`]) and asks it,
//! after the step, whether the active stage is over
//! ([`StageScheduler::evaluate`]). String depths therefore only change at step
//! boundaries.

use crate::error::ConfigurationError;
use crate::models::{OperatingPoint, StageDefinition, StageKind, TerminationCondition};
use crate::physics::BrineProperties;
use serde::{Deserialize, Serialize};

/// Scheduler state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchedulerState {
    Idle { stage: usize },
    Leaching { stage: usize },
    Filling { stage: usize },
    LeachingAndFilling { stage: usize },
    Completed,
    Failed { reason: String },
}

impl SchedulerState {
    fn active(stage: usize, kind: StageKind) -> Self {
        match kind {
            StageKind::Idle => SchedulerState::Idle { stage },
            StageKind::Leach => SchedulerState::Leaching { stage },
            StageKind::Fill => SchedulerState::Filling { stage },
            StageKind::LeachAndFill => SchedulerState::LeachingAndFilling { stage },
        }
    }

    /// Index of the active stage
    pub fn stage(&self) -> Option<usize> {
        match *self {
            SchedulerState::Idle { stage }
            | SchedulerState::Leaching { stage }
            | SchedulerState::Filling { stage }
            | SchedulerState::LeachingAndFilling { stage } => Some(stage),
            SchedulerState::Completed | SchedulerState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage().is_none()
    }
}

/// Stage change decided at the end of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    /// Stage that just ended
    pub from: usize,
    /// Next stage, `None` when the schedule is exhausted
    pub to: Option<usize>,
    /// Simulated time of the change \[h\]
    pub time: f64,
    /// Rates and string depths applied from the next step on
    pub operating_point: Option<OperatingPoint>,
}

/// Sequences the stages of a schedule
#[derive(Debug, Clone)]
pub struct StageScheduler {
    stages: Vec<StageDefinition>,
    state: SchedulerState,
    /// Time at which the active stage started \[h\]
    stage_start: f64,
    /// Water plus product injected during the active stage \[m³\]
    stage_injected: f64,
    /// Blanket depth at the start of the active stage \[m\]
    blanket_at_start: f64,
}

impl StageScheduler {
    /// Validate the schedule and activate its first stage
    ///
    /// `extent` is the `(roof, floor)` depth pair of the cavern.
    pub fn new(
        stages: Vec<StageDefinition>,
        extent: (f64, f64),
        brine: &BrineProperties,
        initial_blanket_depth: f64,
    ) -> Result<Self, ConfigurationError> {
        let (roof, floor) = extent;
        for (index, stage) in stages.iter().enumerate() {
            stage.validate(index, roof, floor, brine)?;
        }

        let first = stages.first().ok_or(ConfigurationError::EmptySchedule)?;
        let state = SchedulerState::active(0, first.kind);

        Ok(Self {
            stages,
            state,
            stage_start: 0.0,
            stage_injected: 0.0,
            blanket_at_start: initial_blanket_depth,
        })
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Active stage and its index
    pub fn active_stage(&self) -> Option<(usize, &StageDefinition)> {
        let index = self.state.stage()?;
        self.stages.get(index).map(|stage| (index, stage))
    }

    /// Rates and string depths of the active stage
    pub fn operating_point(&self) -> Option<OperatingPoint> {
        self.active_stage()
            .map(|(index, stage)| OperatingPoint::from_stage(index, stage))
    }

    /// Time left before the active stage reaches its target \[h\]
    ///
    /// Known in advance for duration targets, and for injected volume targets
    /// since rates are constant within a stage. `None` otherwise.
    pub fn remaining_duration(&self, time: f64) -> Option<f64> {
        let (_, stage) = self.active_stage()?;
        match stage.termination {
            TerminationCondition::Duration { duration } => Some((self.stage_start + duration - time).max(0.0)),
            TerminationCondition::InjectedVolume { volume } => {
                let rate = stage.injection_rate + stage.fill_rate;
                (rate > 0.0).then(|| ((volume - self.stage_injected) / rate).max(0.0))
            }
            TerminationCondition::CavernVolume { .. } | TerminationCondition::BlanketDepth { .. } => None,
        }
    }

    /// Account for the water and product injected during an accepted step
    pub fn record(&mut self, injected: f64) {
        self.stage_injected += injected;
    }

    /// Check the active stage target after an accepted step
    ///
    /// Returns the transition when the stage ended. The next stage starts at
    /// `time` with `blanket_depth` as its reference.
    pub fn evaluate(&mut self, time: f64, cavern_volume: f64, blanket_depth: f64) -> Option<StageTransition> {
        let (index, stage) = self.active_stage()?;

        let reached = match stage.termination {
            TerminationCondition::Duration { duration } => {
                time - self.stage_start >= duration - 1e-9 * duration.max(1.0)
            }
            TerminationCondition::InjectedVolume { volume } => {
                self.stage_injected >= volume * (1.0 - 1e-12)
            }
            TerminationCondition::CavernVolume { volume } => cavern_volume >= volume,
            TerminationCondition::BlanketDepth { depth } => {
                if self.blanket_at_start <= depth {
                    blanket_depth >= depth
                } else {
                    blanket_depth <= depth
                }
            }
        };

        if !reached {
            return None;
        }

        let ended = stage.label(index);
        let next = index + 1;

        self.stage_start = time;
        self.stage_injected = 0.0;
        self.blanket_at_start = blanket_depth;

        match self.stages.get(next) {
            Some(stage) => {
                log::info!(
                    "t={:.3} h: stage {} complete, starting stage {}",
                    time,
                    ended,
                    stage.label(next)
                );
                self.state = SchedulerState::active(next, stage.kind);
                Some(StageTransition {
                    from: index,
                    to: Some(next),
                    time,
                    operating_point: Some(OperatingPoint::from_stage(next, stage)),
                })
            }
            None => {
                log::info!("t={:.3} h: stage {} complete, schedule exhausted", time, ended);
                self.state = SchedulerState::Completed;
                Some(StageTransition {
                    from: index,
                    to: None,
                    time,
                    operating_point: None,
                })
            }
        }
    }

    /// Mark the run as failed
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = SchedulerState::Failed { reason: reason.into() };
    }
}
