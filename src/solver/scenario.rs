//! Simulation scenario definition
//!
//! A scenario is the "WHAT to simulate": the initial cavern, the fluids it
//! holds, the operating schedule and the physical properties of brine and
//! rock. It is plain data, built by an outer loader from any serde format, and
//! may be written in any [`UnitSystem`]. [`Scenario::normalized`] converts it
//! to internal units before anything else looks at it.
//!
//! # Example
//!
//! ```rust
//! use leach_rs::models::{StageDefinition, StageKind, TerminationCondition};
//! use leach_rs::solver::{InitialFluids, ProfileDefinition, Scenario};
//!
//! let scenario = Scenario::new(
//!     ProfileDefinition::cylinder(500.0, 600.0, 10.0, 11),
//!     InitialFluids::saturated(510.0),
//!     vec![StageDefinition {
//!         name: Some("sump".into()),
//!         kind: StageKind::Leach,
//!         injection_rate: 50.0,
//!         fill_rate: 0.0,
//!         withdrawal_rate: 50.0,
//!         injection_depth: 590.0,
//!         production_depth: 520.0,
//!         injection_salinity: 0.0,
//!         termination: TerminationCondition::Duration { duration: 240.0 },
//!     }],
//! );
//!
//! assert!(scenario.validate().is_ok());
//! ```

use crate::error::ConfigurationError;
use crate::models::{
    CavernProfile, FluidInterfaces, FluidState, Insolubles, JetMixing, StageDefinition,
    StageScheduler,
};
use crate::physics::{BrineProperties, EmpiricalRecession};
use crate::units::{Unit, UnitSystem};
use serde::{Deserialize, Serialize};

/// Initial cavern shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    /// Node depths from roof to floor
    pub depths: Vec<f64>,
    /// Wall radius at each node
    pub radii: Vec<f64>,
}

impl ProfileDefinition {
    /// Evenly spaced nodes on a cylinder
    pub fn cylinder(roof: f64, floor: f64, radius: f64, nodes: usize) -> Self {
        let intervals = nodes.max(2) - 1;
        let spacing = (floor - roof) / intervals as f64;
        let depths: Vec<f64> = (0..=intervals)
            .map(|i| if i == intervals { floor } else { roof + spacing * i as f64 })
            .collect();
        let radii = vec![radius; depths.len()];
        Self { depths, radii }
    }
}

/// Fluids in place at the start of the run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialFluids {
    /// Blanket interface depth, the roof when absent
    #[serde(default)]
    pub blanket_depth: Option<f64>,

    /// Injection interface depth, the deepest string of the first stage
    /// when absent
    #[serde(default)]
    pub injection_interface_depth: Option<f64>,

    /// Insolubles pile height
    #[serde(default)]
    pub pile_height: f64,

    /// Brine salinity (mass fraction)
    pub salinity: f64,
}

impl InitialFluids {
    /// Cavern full of brine at default saturation under a blanket
    pub fn saturated(blanket_depth: f64) -> Self {
        Self {
            blanket_depth: Some(blanket_depth),
            injection_interface_depth: None,
            pile_height: 0.0,
            salinity: BrineProperties::default().saturation,
        }
    }
}

/// Complete description of a leaching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    pub profile: ProfileDefinition,

    pub initial: InitialFluids,

    pub schedule: Vec<StageDefinition>,

    #[serde(default)]
    pub brine: BrineProperties,

    #[serde(default)]
    pub recession: EmpiricalRecession,

    #[serde(default)]
    pub insolubles: Insolubles,

    #[serde(default)]
    pub mixing: JetMixing,

    /// Units of every dimensional input above
    #[serde(default)]
    pub units: UnitSystem,
}

/// Validated run inputs, in internal units
#[derive(Debug, Clone)]
pub(crate) struct PreparedScenario {
    pub scenario: Scenario,
    pub profile: CavernProfile,
    pub fluid: FluidState,
    pub scheduler: StageScheduler,
}

impl Scenario {
    /// Create a scenario in internal units with default physical properties
    pub fn new(profile: ProfileDefinition, initial: InitialFluids, schedule: Vec<StageDefinition>) -> Self {
        Self {
            name: None,
            profile,
            initial,
            schedule,
            brine: BrineProperties::default(),
            recession: EmpiricalRecession::default(),
            insolubles: Insolubles::default(),
            mixing: JetMixing::default(),
            units: UnitSystem::default(),
        }
    }

    /// Copy of the scenario converted to internal units
    pub fn normalized(&self) -> Self {
        let units = self.units;
        let length = |value: f64| units.length.to_internal(value);

        Self {
            name: self.name.clone(),
            profile: ProfileDefinition {
                depths: self.profile.depths.iter().map(|&d| length(d)).collect(),
                radii: self.profile.radii.iter().map(|&r| length(r)).collect(),
            },
            initial: InitialFluids {
                blanket_depth: self.initial.blanket_depth.map(length),
                injection_interface_depth: self.initial.injection_interface_depth.map(length),
                pile_height: length(self.initial.pile_height),
                salinity: self.initial.salinity,
            },
            schedule: self.schedule.iter().map(|stage| stage.normalized(&units)).collect(),
            brine: self.brine.clone(),
            recession: self.recession.clone(),
            insolubles: Insolubles {
                settling_rate: self
                    .insolubles
                    .settling_rate
                    .map(|rate| rate / units.duration.to_internal(1.0)),
                ..self.insolubles
            },
            mixing: JetMixing {
                mixing_length: length(self.mixing.mixing_length),
                ..self.mixing
            },
            units: UnitSystem::default(),
        }
    }

    /// Check every load-time invariant
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.prepare().map(|_| ())
    }

    /// Normalize, validate and build the initial run state
    pub(crate) fn prepare(&self) -> Result<PreparedScenario, ConfigurationError> {
        let scenario = self.normalized();

        scenario.brine.validate()?;
        scenario.recession.validate()?;
        scenario.insolubles.validate()?;
        scenario.mixing.validate()?;

        let profile = CavernProfile::new(&scenario.profile.depths, &scenario.profile.radii)?;
        let (roof, floor) = (profile.roof(), profile.floor());

        let first = scenario.schedule.first().ok_or(ConfigurationError::EmptySchedule)?;
        let blanket_depth = scenario.initial.blanket_depth.unwrap_or(roof);
        let injection_depth = scenario
            .initial
            .injection_interface_depth
            .unwrap_or_else(|| blanket_depth.max(first.injection_depth.max(first.production_depth)));

        let fluid = FluidState::initial(
            &profile,
            FluidInterfaces {
                blanket_depth,
                injection_depth,
                pile_height: scenario.initial.pile_height,
                salinity: scenario.initial.salinity,
            },
            &scenario.brine,
        )?;

        let scheduler = StageScheduler::new(
            scenario.schedule.clone(),
            (roof, floor),
            &scenario.brine,
            blanket_depth,
        )?;

        Ok(PreparedScenario {
            scenario,
            profile,
            fluid,
            scheduler,
        })
    }
}

// ================================================================================================
// Tests
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use crate::units::DurationUnit;
    use crate::models::{StageKind, TerminationCondition};

    fn leach_stage() -> StageDefinition {
        StageDefinition {
            name: None,
            kind: StageKind::Leach,
            injection_rate: 50.0,
            fill_rate: 0.0,
            withdrawal_rate: 50.0,
            injection_depth: 590.0,
            production_depth: 520.0,
            injection_salinity: 0.0,
            termination: TerminationCondition::Duration { duration: 24.0 },
        }
    }

    fn scenario() -> Scenario {
        Scenario::new(
            ProfileDefinition::cylinder(500.0, 600.0, 10.0, 11),
            InitialFluids::saturated(510.0),
            vec![leach_stage()],
        )
    }

    #[test]
    fn test_cylinder_definition() {
        let profile = ProfileDefinition::cylinder(500.0, 600.0, 10.0, 11);
        assert_eq!(profile.depths.len(), 11);
        assert_eq!(profile.depths[0], 500.0);
        assert_eq!(profile.depths[10], 600.0);
        assert_abs_diff_eq!(profile.depths[5], 550.0, epsilon = 1e-12);
    }

    #[test]
    fn test_injection_interface_defaults_to_deepest_string() {
        let prepared = scenario().prepare().unwrap();
        assert_eq!(prepared.fluid.interfaces.injection_depth, 590.0);
        assert_eq!(prepared.fluid.interfaces.blanket_depth, 510.0);
    }

    #[test]
    fn test_missing_blanket_starts_at_roof() {
        let mut scenario = scenario();
        scenario.initial.blanket_depth = None;
        let prepared = scenario.prepare().unwrap();
        assert_eq!(prepared.fluid.interfaces.blanket_depth, 500.0);
        assert_eq!(prepared.fluid.inventory.blanket_volume, 0.0);
    }

    #[test]
    fn test_empty_schedule_is_rejected() {
        let mut scenario = scenario();
        scenario.schedule.clear();
        assert!(matches!(scenario.validate(), Err(ConfigurationError::EmptySchedule)));
    }

    #[test]
    fn test_blanket_below_strings_is_rejected() {
        let mut scenario = scenario();
        scenario.initial.blanket_depth = Some(595.0);
        scenario.initial.injection_interface_depth = Some(590.0);
        assert!(matches!(scenario.validate(), Err(ConfigurationError::InterfaceOrder { .. })));
    }

    #[test]
    fn test_settling_rate_follows_the_duration_unit() {
        let mut scenario = scenario();
        scenario.insolubles.settling_rate = Some(1.2);
        scenario.units.duration = DurationUnit::Day;

        let internal = scenario.normalized();
        assert_relative_eq!(internal.insolubles.settling_rate.unwrap(), 0.05, max_relative = 1e-12);
        assert_eq!(internal.insolubles.fraction, scenario.insolubles.fraction);
    }

    #[test]
    fn test_normalized_is_identity_for_internal_units() {
        let scenario = scenario();
        assert_eq!(scenario.normalized(), scenario);
    }
}
