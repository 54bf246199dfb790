//! Time integrator
//!
//! # Algorithm
//!
//! ```text
//! loop
//!   cancelled?                      → Cancelled
//!   schedule exhausted / max time / max steps → Completed
//!   dt = min(time_step, stage remaining, max_time − t)
//!   advance(dt):
//!     dissolution on a trial copy of the profile
//!     interface tracker on the trial profile
//!     StepTooLarge → advance(dt/2) twice, up to max_subdivisions
//!   commit, record StepResult, evaluate stage termination
//!   roof receded beyond the limit   → Completed(RoofExposed)
//! ```
//!
//! The state is only replaced once the whole interval succeeded, so a failed
//! step leaves the history exactly as it was after the last accepted step.

use crate::error::{ConfigurationError, LeachResult, SimulationError};
use crate::models::{
    CavernProfile, Diagnostic, DissolutionSolver, FluidState, InterfaceTracker, OperatingPoint,
};
use crate::physics::{BrineProperties, RecessionModel};
use crate::solver::scenario::PreparedScenario;
use crate::solver::{
    RunOutcome, Scenario, SimulationResult, SimulationState, SolverConfiguration, StepResult,
    Termination, VolumeTotals,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// =================================================================================================
// Cancellation
// =================================================================================================

/// Cooperative cancellation signal
///
/// Clones share the same flag. The driver checks it once per step boundary,
/// never in the middle of a step.
///
/// # Example
///
/// ```rust
/// use leach_rs::solver::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// =================================================================================================
// Interval integration
// =================================================================================================

/// Result of integrating one interval, possibly in several substeps
struct Interval {
    profile: CavernProfile,
    fluid: FluidState,
    totals: VolumeTotals,
    substeps: usize,
    produced_salinity: f64,
    diagnostics: Vec<Diagnostic>,
}

impl Interval {
    /// Chain `next`, which started where `self` ended
    fn then(mut self, next: Interval) -> Interval {
        let (w1, w2) = (self.totals.withdrawn, next.totals.withdrawn);
        let produced_salinity = if w1 + w2 > 0.0 {
            (self.produced_salinity * w1 + next.produced_salinity * w2) / (w1 + w2)
        } else {
            next.produced_salinity
        };

        self.totals += next.totals;
        self.diagnostics.extend(next.diagnostics);

        Interval {
            profile: next.profile,
            fluid: next.fluid,
            totals: self.totals,
            substeps: self.substeps + next.substeps,
            produced_salinity,
            diagnostics: self.diagnostics,
        }
    }
}

/// Per-run step machinery
struct Stepper<'a> {
    dissolution: DissolutionSolver<'a>,
    tracker: InterfaceTracker<'a>,
    config: &'a SolverConfiguration,
}

impl Stepper<'_> {
    /// Single attempt over `dt`
    fn attempt(
        &self,
        profile: &CavernProfile,
        fluid: &FluidState,
        operating: &OperatingPoint,
        dt: f64,
    ) -> LeachResult<Interval> {
        let moved = operating.circulation_rate() * dt / profile.total_volume();
        if moved > self.config.max_volume_fraction {
            return Err(SimulationError::StepTooLarge {
                ratio: moved / self.config.max_volume_fraction,
                threshold: 1.0,
            });
        }

        let mut trial = profile.clone();
        let recession = self.dissolution.advance(&mut trial, &fluid.interfaces, operating, dt)?;
        let (next, report) = self
            .tracker
            .update(&trial, fluid, operating, dt, recession.dissolved_volume)?;

        let mut diagnostics = Vec::new();
        if recession.clamped > 0 {
            diagnostics.push(Diagnostic::RecessionClamped { nodes: recession.clamped });
        }
        diagnostics.extend(report.diagnostics);

        Ok(Interval {
            profile: trial,
            fluid: next,
            totals: VolumeTotals {
                injected: report.injected,
                filled: report.filled,
                withdrawn: report.withdrawn,
                vented: report.vented,
                dissolved: report.dissolved,
            },
            substeps: 1,
            produced_salinity: report.produced_salinity,
            diagnostics,
        })
    }

    /// Integrate `[time, time + dt]`, halving on `StepTooLarge`
    fn advance(
        &self,
        profile: &CavernProfile,
        fluid: &FluidState,
        operating: &OperatingPoint,
        time: f64,
        dt: f64,
        depth: usize,
    ) -> LeachResult<Interval> {
        match self.attempt(profile, fluid, operating, dt) {
            Ok(interval) => Ok(interval),
            Err(error) if error.is_recoverable() => {
                if depth >= self.config.max_subdivisions {
                    return Err(SimulationError::RetryBudgetExhausted {
                        time,
                        subdivisions: depth,
                    });
                }

                let half = 0.5 * dt;
                log::debug!("t={:.3} h: {}, retrying with dt={:.6} h", time, error, half);

                let first = self.advance(profile, fluid, operating, time, half, depth + 1)?;
                let second = self.advance(&first.profile, &first.fluid, operating, time + half, half, depth + 1)?;
                Ok(first.then(second))
            }
            Err(error) => Err(error),
        }
    }
}

// =================================================================================================
// Simulator
// =================================================================================================

/// Leach and fill simulator
///
/// Holds nothing but an optional recession model override, so one simulator
/// can run any number of independent scenarios, concurrently if needed.
///
/// # Example
///
/// ```rust
/// use leach_rs::models::{StageDefinition, StageKind, TerminationCondition};
/// use leach_rs::solver::{
///     InitialFluids, ProfileDefinition, RunOutcome, Scenario, Simulator, SolverConfiguration,
///     Termination,
/// };
///
/// let scenario = Scenario::new(
///     ProfileDefinition::cylinder(500.0, 600.0, 10.0, 21),
///     InitialFluids::saturated(510.0),
///     vec![StageDefinition {
///         name: None,
///         kind: StageKind::Leach,
///         injection_rate: 20.0,
///         fill_rate: 0.0,
///         withdrawal_rate: 20.0,
///         injection_depth: 590.0,
///         production_depth: 520.0,
///         injection_salinity: 0.0,
///         termination: TerminationCondition::Duration { duration: 48.0 },
///     }],
/// );
///
/// let result = Simulator::new()
///     .run(&scenario, &SolverConfiguration::default())
///     .unwrap();
///
/// assert_eq!(result.outcome, RunOutcome::Completed(Termination::ScheduleExhausted));
/// assert_eq!(result.len(), 2);
/// ```
#[derive(Default)]
pub struct Simulator {
    recession: Option<Box<dyn RecessionModel>>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("recession", &self.recession.as_ref().map(|m| m.name()))
            .finish()
    }
}

impl Simulator {
    /// Simulator using each scenario's own recession correlation
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulator using `model` instead of the scenario's correlation
    pub fn with_recession_model(model: Box<dyn RecessionModel>) -> Self {
        Self { recession: Some(model) }
    }

    /// Run a scenario to completion
    ///
    /// # Errors
    ///
    /// Only load-time problems are returned as errors. Failures while stepping
    /// end the run with [`RunOutcome::Failed`] and the history collected so far.
    pub fn run(
        &self,
        scenario: &Scenario,
        config: &SolverConfiguration,
    ) -> Result<SimulationResult, ConfigurationError> {
        self.run_with_observer(scenario, config, &CancellationToken::new(), |_| {})
    }

    /// Run a scenario that `token` may cancel
    pub fn run_with_cancellation(
        &self,
        scenario: &Scenario,
        config: &SolverConfiguration,
        token: &CancellationToken,
    ) -> Result<SimulationResult, ConfigurationError> {
        self.run_with_observer(scenario, config, token, |_| {})
    }

    /// Run a scenario, handing every accepted step to `observer`
    pub fn run_with_observer<F>(
        &self,
        scenario: &Scenario,
        config: &SolverConfiguration,
        token: &CancellationToken,
        mut observer: F,
    ) -> Result<SimulationResult, ConfigurationError>
    where
        F: FnMut(&StepResult),
    {
        // ====== Step 1: Validation ======

        config.validate()?;
        let PreparedScenario {
            scenario,
            profile,
            fluid,
            mut scheduler,
        } = scenario.prepare()?;

        // ====== Step 2: Setup ======

        let model: &dyn RecessionModel = match &self.recession {
            Some(model) => model.as_ref(),
            None => &scenario.recession,
        };
        let brine: &BrineProperties = &scenario.brine;

        let stepper = Stepper {
            dissolution: DissolutionSolver::new(
                model,
                brine,
                scenario.mixing,
                scenario.insolubles.fraction,
                config.dissolution_settings(),
            ),
            tracker: InterfaceTracker::new(
                brine,
                &scenario.insolubles,
                config.root_solver(),
                config.volume_tolerance,
            )
            .with_max_exchange_fraction(config.max_volume_fraction),
            config,
        };

        let initial_roof_radius = profile.roof_radius();
        let mut state = SimulationState::new(profile, fluid);

        log::info!(
            "Starting run '{}': {} nodes, {} stages, cavern {:.1} m3, dt={} h",
            scenario.name.as_deref().unwrap_or("unnamed"),
            state.profile.node_count(),
            scheduler.stages().len(),
            state.profile.total_volume(),
            config.time_step
        );

        // ====== Step 3: Time Integration ======

        let outcome = loop {
            if token.is_cancelled() {
                log::info!("Run cancelled at t={:.3} h after {} steps", state.time, state.step);
                break RunOutcome::Cancelled;
            }

            let Some(operating) = scheduler.operating_point() else {
                break RunOutcome::Completed(Termination::ScheduleExhausted);
            };

            if let Some(max_time) = config.max_time
                && state.time >= max_time - 1e-9 * max_time
            {
                break RunOutcome::Completed(Termination::MaxTime);
            }
            if state.step >= config.max_steps {
                break RunOutcome::Completed(Termination::MaxSteps);
            }

            let mut dt = config.time_step;
            if let Some(remaining) = scheduler.remaining_duration(state.time)
                && remaining > 0.0
            {
                dt = dt.min(remaining);
            }
            if let Some(max_time) = config.max_time {
                dt = dt.min(max_time - state.time);
            }

            let interval = match stepper.advance(&state.profile, &state.fluid, &operating, state.time, dt, 0) {
                Ok(interval) => interval,
                Err(error) => {
                    log::warn!("Run failed at t={:.3} h (step {}): {}", state.time, state.step + 1, error);
                    scheduler.fail(error.to_string());
                    break RunOutcome::Failed(error);
                }
            };

            // ====== Commit ======

            state.profile = interval.profile;
            state.fluid = interval.fluid;
            state.time += dt;
            if let Err(error) = state.validate() {
                log::warn!("Run failed at t={:.3} h (step {}): {}", state.time, state.step + 1, error);
                scheduler.fail(error.to_string());
                break RunOutcome::Failed(error);
            }
            state.step += 1;
            state.cumulative += interval.totals;

            scheduler.record(interval.totals.injected + interval.totals.filled);
            let cavern_volume = state.profile.total_volume();
            let transition = scheduler.evaluate(
                state.time,
                cavern_volume,
                state.fluid.interfaces.blanket_depth,
            );
            state.stage = scheduler.state().stage();

            let inventory = &state.fluid.inventory;
            let record = StepResult {
                step: state.step,
                time: state.time,
                dt,
                substeps: interval.substeps,
                stage: operating.stage,
                kind: operating.kind,
                radii: state.profile.radii(),
                recession_rates: state.profile.recession_rates(),
                interfaces: state.fluid.interfaces,
                cavern_volume,
                blanket_volume: inventory.blanket_volume,
                brine_volume: inventory.brine_volume,
                pile_volume: inventory.pile_volume,
                specific_gravity: brine.specific_gravity(state.fluid.interfaces.salinity),
                produced_salinity: interval.produced_salinity,
                step_volumes: interval.totals,
                cumulative: state.cumulative,
                volume_error: inventory.occupied_volume() - cavern_volume,
                transition,
                diagnostics: interval.diagnostics,
            };

            observer(&record);
            state.history.push(record);

            if let Some(limit) = config.roof_recession_limit {
                let recession = state.profile.roof_radius() - initial_roof_radius;
                if recession > limit {
                    log::info!(
                        "Roof exposed at t={:.3} h: receded {:.3} m (limit {:.3} m), stopping",
                        state.time,
                        recession,
                        limit
                    );
                    break RunOutcome::Completed(Termination::RoofExposed);
                }
            }
        };

        // ====== Step 4: Build Result ======

        match &outcome {
            RunOutcome::Completed(reason) => log::info!(
                "Run complete ({}) after {} steps, t={:.3} h, cavern {:.1} m3",
                reason,
                state.step,
                state.time,
                state.profile.total_volume()
            ),
            RunOutcome::Failed(_) | RunOutcome::Cancelled => {}
        }

        let steps = state.step;
        let final_time = state.time;
        let mut result = SimulationResult::new(state.history, outcome);

        result.add_metadata("recession model", model.name());
        result.add_metadata("time step", &config.time_step.to_string());
        result.add_metadata("steps", &steps.to_string());
        result.add_metadata("final time", &final_time.to_string());
        if let Some(name) = &scenario.name {
            result.add_metadata("scenario", name);
        }

        Ok(result)
    }
}
