//! Wall dissolution over one step
//!
//! # Algorithm
//!
//! For each node, from the pre-step snapshot only:
//!
//! 1. Nodes above the blanket interface or below the pile top are protected:
//!    zero recession.
//! 2. Wall velocity `v = Q / A(z)` inside the interval between the two strings,
//!    zero outside it (natural convection only).
//! 3. Within the jet mixing length `L` of the injection string, at distance
//!    `d`, the jet amplifies the velocity and dilutes the local brine:
//!
//!    ```text
//!    s = 1 − d / L
//!    v ← v · (1 + amplification · s)
//!    w ← w + (w_inj − w) · dilution · s
//!    ```
//!
//! 4. `dr = flux(v, w_sat − w) · dt / (ρ_salt · (1 − f_insoluble))`
//!
//! The largest ratio `dr / cap` decides whether the step is accepted: above
//! the configured threshold the solver reports
//! [`SimulationError::StepTooLarge`] and leaves the profile untouched. A zero
//! cap freezes the wall.
//!
//! With the `parallel` feature, nodes are evaluated with rayon above the
//! configured node count. Each node reads only the snapshot, so both paths give
//! identical increments.

use crate::error::{ConfigurationError, LeachResult, SimulationError};
use crate::models::{CavernProfile, DepthNode, FluidInterfaces, OperatingPoint};
use crate::physics::{BrineProperties, RecessionModel};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Injection jet near the injection string
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JetMixing {
    /// Reach of the jet on each side of the string \[m\]
    #[serde(default = "default_mixing_length")]
    pub mixing_length: f64,

    /// Velocity gain at the string outlet
    #[serde(default = "default_jet_amplification")]
    pub jet_amplification: f64,

    /// Share of injected water in the local brine at the outlet
    #[serde(default = "default_jet_dilution")]
    pub jet_dilution: f64,
}

fn default_mixing_length() -> f64 { 10.0 }
fn default_jet_amplification() -> f64 { 2.0 }
fn default_jet_dilution() -> f64 { 0.5 }

impl Default for JetMixing {
    fn default() -> Self {
        Self {
            mixing_length: default_mixing_length(),
            jet_amplification: default_jet_amplification(),
            jet_dilution: default_jet_dilution(),
        }
    }
}

impl JetMixing {
    /// Jet strength `1 − d/L` at distance `d` from the string, 0 outside
    fn strength(&self, distance: f64) -> f64 {
        if self.mixing_length > 0.0 && distance < self.mixing_length {
            1.0 - distance / self.mixing_length
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.mixing_length.is_finite() && self.mixing_length >= 0.0) {
            return Err(ConfigurationError::InvalidSetting {
                name: "mixing.mixing_length",
                value: self.mixing_length,
                reason: "must be finite and non-negative",
            });
        }
        if !(self.jet_amplification.is_finite() && self.jet_amplification >= 0.0) {
            return Err(ConfigurationError::InvalidSetting {
                name: "mixing.jet_amplification",
                value: self.jet_amplification,
                reason: "must be finite and non-negative",
            });
        }
        if !(0.0..=1.0).contains(&self.jet_dilution) {
            return Err(ConfigurationError::InvalidSetting {
                name: "mixing.jet_dilution",
                value: self.jet_dilution,
                reason: "must lie in [0, 1]",
            });
        }
        Ok(())
    }
}

/// Numerical limits of the dissolution step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DissolutionSettings {
    /// Largest radius increment per step \[m\]
    pub recession_cap: f64,
    /// Largest accepted `dr / cap`
    pub clamp_ratio_threshold: f64,
    /// Node count above which nodes are evaluated in parallel
    pub parallel_threshold: usize,
}

/// Outcome of an accepted dissolution step
#[derive(Debug, Clone, PartialEq)]
pub struct RecessionStep {
    /// Unclamped radius increments \[m\]
    pub deltas: DVector<f64>,
    /// Nodes limited to the cap
    pub clamped: usize,
    /// `max(dr / cap)`
    pub max_ratio: f64,
    /// Rock volume removed from the wall \[m³\]
    pub dissolved_volume: f64,
}

/// Conditions shared by every node of a step
struct Snapshot {
    blanket_depth: f64,
    pile_top: f64,
    interval: (f64, f64),
    flow: f64,
    salinity: f64,
    injection_depth: f64,
    injection_salinity: f64,
}

/// Computes and applies wall recession
pub struct DissolutionSolver<'a> {
    model: &'a dyn RecessionModel,
    brine: &'a BrineProperties,
    mixing: JetMixing,
    insoluble_fraction: f64,
    settings: DissolutionSettings,
}

impl<'a> DissolutionSolver<'a> {
    pub fn new(
        model: &'a dyn RecessionModel,
        brine: &'a BrineProperties,
        mixing: JetMixing,
        insoluble_fraction: f64,
        settings: DissolutionSettings,
    ) -> Self {
        Self {
            model,
            brine,
            mixing,
            insoluble_fraction,
            settings,
        }
    }

    fn node_increment(&self, node: &DepthNode, snapshot: &Snapshot, dt: f64) -> f64 {
        if node.depth < snapshot.blanket_depth || node.depth > snapshot.pile_top {
            return 0.0;
        }

        let (top, bottom) = snapshot.interval;
        let area = PI * node.radius * node.radius;
        let mut velocity = if node.depth >= top && node.depth <= bottom && area > 0.0 {
            snapshot.flow / area
        } else {
            0.0
        };

        let mut salinity = snapshot.salinity;
        let strength = self.mixing.strength((node.depth - snapshot.injection_depth).abs());
        if strength > 0.0 {
            velocity *= 1.0 + self.mixing.jet_amplification * strength;
            salinity += (snapshot.injection_salinity - salinity) * self.mixing.jet_dilution * strength;
        }

        let flux = self
            .model
            .mass_flux(velocity, self.brine.undersaturation(salinity), self.brine);

        flux * dt / (self.brine.salt_density * (1.0 - self.insoluble_fraction))
    }

    /// Radius increments over `dt`, without touching the profile
    pub fn increments(
        &self,
        profile: &CavernProfile,
        interfaces: &FluidInterfaces,
        operating: &OperatingPoint,
        dt: f64,
    ) -> DVector<f64> {
        let nodes = profile.nodes();

        if operating.circulation_rate() <= 0.0 && interfaces.salinity >= self.brine.saturation {
            return DVector::zeros(nodes.len());
        }

        let snapshot = Snapshot {
            blanket_depth: interfaces.blanket_depth,
            pile_top: interfaces.pile_top(profile.floor()),
            interval: operating.circulation_interval(),
            flow: operating.circulation_rate(),
            salinity: interfaces.salinity,
            injection_depth: operating.injection_depth,
            injection_salinity: operating.injection_salinity,
        };

        let compute = |node: &DepthNode| self.node_increment(node, &snapshot, dt);

        #[cfg(feature = "parallel")]
        let deltas: Vec<f64> = if nodes.len() > self.settings.parallel_threshold {
            nodes.par_iter().map(compute).collect()
        } else {
            nodes.iter().map(compute).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let deltas: Vec<f64> = nodes.iter().map(compute).collect();

        DVector::from_vec(deltas)
    }

    /// Dissolve the wall over `dt`
    ///
    /// # Errors
    ///
    /// - [`SimulationError::StepTooLarge`] when `max(dr / cap)` exceeds the
    ///   threshold; the profile is unchanged
    /// - an invariant violation when an increment is negative or non-finite
    pub fn advance(
        &self,
        profile: &mut CavernProfile,
        interfaces: &FluidInterfaces,
        operating: &OperatingPoint,
        dt: f64,
    ) -> LeachResult<RecessionStep> {
        let cap = self.settings.recession_cap;

        if cap <= 0.0 {
            // Frozen wall: only the recorded rates change
            let deltas = DVector::zeros(profile.node_count());
            profile.apply_recession(&deltas, 0.0, dt)?;
            return Ok(RecessionStep {
                deltas,
                clamped: 0,
                max_ratio: 0.0,
                dissolved_volume: 0.0,
            });
        }

        let deltas = self.increments(profile, interfaces, operating, dt);
        let max_ratio = deltas.iter().fold(0.0_f64, |acc, &dr| acc.max(dr / cap));

        if max_ratio > self.settings.clamp_ratio_threshold {
            return Err(SimulationError::StepTooLarge {
                ratio: max_ratio,
                threshold: self.settings.clamp_ratio_threshold,
            });
        }

        let volume_before = profile.total_volume();
        let clamped = profile.apply_recession(&deltas, cap, dt)?;

        Ok(RecessionStep {
            deltas,
            clamped,
            max_ratio,
            dissolved_volume: profile.total_volume() - volume_before,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StageDefinition, StageKind, TerminationCondition};
    use crate::physics::EmpiricalRecession;

    fn cylinder() -> CavernProfile {
        let depths: Vec<f64> = (0..=10).map(|i| 500.0 + 10.0 * i as f64).collect();
        CavernProfile::new(&depths, &vec![10.0; depths.len()]).unwrap()
    }

    fn interfaces(salinity: f64) -> FluidInterfaces {
        FluidInterfaces {
            blanket_depth: 515.0,
            injection_depth: 590.0,
            pile_height: 5.0,
            salinity,
        }
    }

    fn leach() -> OperatingPoint {
        let stage = StageDefinition {
            name: None,
            kind: StageKind::Leach,
            injection_rate: 50.0,
            fill_rate: 0.0,
            withdrawal_rate: 50.0,
            injection_depth: 590.0,
            production_depth: 530.0,
            injection_salinity: 0.0,
            termination: TerminationCondition::Duration { duration: 24.0 },
        };
        OperatingPoint::from_stage(0, &stage)
    }

    fn settings(cap: f64, threshold: f64) -> DissolutionSettings {
        DissolutionSettings {
            recession_cap: cap,
            clamp_ratio_threshold: threshold,
            parallel_threshold: 999,
        }
    }

    #[test]
    fn test_protected_nodes_do_not_recede() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let solver = DissolutionSolver::new(&model, &brine, JetMixing::default(), 0.05, settings(1.0, 2.0));

        let deltas = solver.increments(&cylinder(), &interfaces(0.1), &leach(), 1.0);

        // 500 and 510 lie above the blanket, 600 below the pile top
        assert_eq!(deltas[0], 0.0);
        assert_eq!(deltas[1], 0.0);
        assert_eq!(deltas[10], 0.0);
        assert!(deltas.iter().skip(2).take(8).all(|&dr| dr > 0.0));
    }

    #[test]
    fn test_jet_enhances_recession_near_injection_string() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let solver = DissolutionSolver::new(&model, &brine, JetMixing::default(), 0.05, settings(1.0, 2.0));

        let deltas = solver.increments(&cylinder(), &interfaces(0.2), &leach(), 1.0);

        // 590 sits on the string, 560 in the circulation interval, 520 above it
        assert!(deltas[9] > deltas[6]);
        assert!(deltas[6] > deltas[2]);
    }

    #[test]
    fn test_saturated_idle_cavern_does_not_dissolve() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let solver = DissolutionSolver::new(&model, &brine, JetMixing::default(), 0.05, settings(1.0, 2.0));
        let idle = OperatingPoint {
            kind: StageKind::Idle,
            injection_rate: 0.0,
            withdrawal_rate: 0.0,
            ..leach()
        };

        let deltas = solver.increments(&cylinder(), &interfaces(brine.saturation), &idle, 10.0);
        assert!(deltas.iter().all(|&dr| dr == 0.0));
    }

    #[test]
    fn test_step_too_large_leaves_profile_untouched() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let solver = DissolutionSolver::new(&model, &brine, JetMixing::default(), 0.05, settings(1e-6, 2.0));

        let mut profile = cylinder();
        let before = profile.clone();
        let error = solver.advance(&mut profile, &interfaces(0.0), &leach(), 24.0).unwrap_err();

        assert!(error.is_recoverable());
        assert_eq!(profile, before);
    }

    #[test]
    fn test_zero_cap_freezes_wall() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let solver = DissolutionSolver::new(&model, &brine, JetMixing::default(), 0.05, settings(0.0, 2.0));

        let mut profile = cylinder();
        let step = solver.advance(&mut profile, &interfaces(0.0), &leach(), 24.0).unwrap();

        assert_eq!(step.dissolved_volume, 0.0);
        assert_eq!(profile.radii(), cylinder().radii());
    }

    #[test]
    fn test_accepted_step_grows_cavern() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let solver = DissolutionSolver::new(&model, &brine, JetMixing::default(), 0.05, settings(1.0, 2.0));

        let mut profile = cylinder();
        let step = solver.advance(&mut profile, &interfaces(0.1), &leach(), 1.0).unwrap();

        assert!(step.dissolved_volume > 0.0);
        assert_eq!(step.clamped, 0);
        assert!(step.max_ratio < 1.0);
        assert!(profile.radii().iter().all(|&r| r >= 10.0));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let sequential = DissolutionSolver::new(&model, &brine, JetMixing::default(), 0.05, settings(1.0, 2.0));
        let parallel = DissolutionSolver::new(
            &model,
            &brine,
            JetMixing::default(),
            0.05,
            DissolutionSettings {
                parallel_threshold: 1,
                ..settings(1.0, 2.0)
            },
        );

        let a = sequential.increments(&cylinder(), &interfaces(0.1), &leach(), 2.0);
        let b = parallel.increments(&cylinder(), &interfaces(0.1), &leach(), 2.0);
        assert_eq!(a, b);
    }
}
