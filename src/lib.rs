//! leach-rs: Salt Cavern Leach and Fill Simulation
//!
//! Simulates the evolution of a salt cavern's shape and fluid contents while
//! it is leached by under-saturated water and, optionally, filled with a
//! stored product displacing the brine. Predicts the cavern geometry,
//! interface depths and produced-brine salinity over months to years of
//! operation.
//!
//! # Architecture
//!
//! leach-rs is built on two core principles:
//!
//! 1. **Separation of Physics and Numerics**
//!    - Physics defines the correlations (brine density, wall recession)
//!    - Models apply them over a step (dissolution, fluid balance, stages)
//!    - The solver drives the models in time
//!
//! 2. **Per-run owned state**
//!    - No global mutable state, runs are independent
//!    - Every failure is a typed error, never a panic
//!
//! # Quick Start
//!
//! ```rust
//! use leach_rs::prelude::*;
//!
//! # fn main() -> Result<(), leach_rs::error::ConfigurationError> {
//! // 1. Describe the cavern and the operations
//! let scenario = Scenario::new(
//!     ProfileDefinition::cylinder(500.0, 600.0, 10.0, 21),
//!     InitialFluids::saturated(505.0),
//!     vec![StageDefinition {
//!         name: Some("sump".into()),
//!         kind: StageKind::Leach,
//!         injection_rate: 40.0,
//!         fill_rate: 0.0,
//!         withdrawal_rate: 40.0,
//!         injection_depth: 595.0,
//!         production_depth: 510.0,
//!         injection_salinity: 0.0,
//!         termination: TerminationCondition::Duration { duration: 24.0 * 30.0 },
//!     }],
//! );
//!
//! // 2. Configure the solver: daily steps
//! let config = SolverConfiguration::default();
//!
//! // 3. Run simulation
//! let result = Simulator::new().run(&scenario, &config)?;
//!
//! // 4. Access results
//! assert!(result.outcome.is_completed());
//! println!("Final cavern volume: {:?}", result.cavern_volumes().last());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`numerics`]: Bounded root finding
//! - [`units`]: Unit codes and conversion to internal units
//! - [`physics`]: Brine properties and recession correlations
//! - [`models`]: Cavern profile, dissolution, interfaces, stages
//! - [`solver`]: Scenario, configuration and time integration
//! - [`error`]: Configuration and simulation errors

pub mod error;
pub mod numerics;
pub mod units;

// Core modules
pub mod physics;

pub mod models;
pub mod solver;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //!
    //! use leach_rs::prelude::*;
    //! ```
    pub use crate::error::{ConfigurationError, Invariant, SimulationError};
    pub use crate::models::{
        CavernProfile, FluidInterfaces, StageDefinition, StageKind, TerminationCondition,
    };
    pub use crate::physics::{BrineProperties, EmpiricalRecession, RecessionModel};
    pub use crate::solver::{
        CancellationToken, InitialFluids, ProfileDefinition, RunOutcome, Scenario,
        SimulationResult, Simulator, SolverConfiguration, StepResult, Termination,
    };
    pub use crate::units::UnitSystem;
}
