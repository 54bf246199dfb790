//! Cavern models
//!
//! The driver composes these models once per step. Models own the physics of
//! the step (what dissolves, where fluids sit, which stage is active); the
//! driver owns the time integration.
//!
//! # Available Models
//!
//! ## [`CavernProfile`]: geometry
//!
//! Axisymmetric wall discretized into depth nodes, with exact frustum volume
//! and wall area queries.
//!
//! ## [`DissolutionSolver`]: wall recession
//!
//! Radius increment of every node from the local wall velocity and
//! undersaturation, through a [`RecessionModel`](crate::physics::RecessionModel).
//!
//! ## [`InterfaceTracker`]: fluids
//!
//! Volumetric balance of blanket, brine and insolubles; salinity and interface
//! depths re-derived from the updated profile.
//!
//! ## [`StageScheduler`]: operations
//!
//! State machine over the [`StageDefinition`] schedule.

// =================================================================================================
// Module Declarations
// =================================================================================================

pub mod dissolution;
pub mod interfaces;
pub mod profile;
pub mod scheduler;
pub mod stage;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use dissolution::{DissolutionSettings, DissolutionSolver, JetMixing, RecessionStep};
pub use interfaces::{
    Diagnostic, FluidInterfaces, FluidInventory, FluidState, Insolubles, InterfaceTracker,
    TrackerReport,
};
pub use profile::{CavernProfile, DepthNode};
pub use scheduler::{SchedulerState, StageScheduler, StageTransition};
pub use stage::{OperatingPoint, StageDefinition, StageKind, TerminationCondition};
