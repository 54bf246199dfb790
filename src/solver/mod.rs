//! Time integration of a leach and fill scenario
//!
//! # Core Concepts
//!
//! ## The Architecture (WHAT vs HOW)
//!
//! 1. **Scenario** (`Scenario`) - WHAT to simulate
//!    - Initial cavern profile and fluids
//!    - Operating schedule
//!    - Brine, recession and insolubles properties
//!
//! 2. **Configuration** (`SolverConfiguration`) - HOW to simulate
//!    - Step duration and run limits
//!    - Recession cap and subdivision budget
//!    - Root finding and volume tolerances
//!
//! 3. **Simulator** (`Simulator`) - the driver
//!    - Owns no state between runs
//!    - Returns the history and the outcome
//!
//! # Module Organization
//!
//! - **`scenario`**: `Scenario`, `ProfileDefinition`, `InitialFluids`
//! - **`configuration`**: `SolverConfiguration`
//! - **`state`**: `SimulationState`, the per-run mutable state
//! - **`result`**: `StepResult`, `SimulationResult`, `RunOutcome`
//! - **`driver`**: `Simulator`, `CancellationToken`
//!
//! # Workflow Diagram
//!
//! ```text
//! ┌─────────────────┐   ┌──────────────────────┐
//! │ Scenario        │   │ Solver Configuration │
//! │ (cavern, plan)  │   │ (steps, tolerances)  │
//! └────────┬────────┘   └──────────┬───────────┘
//!          └──────────┬────────────┘
//!            ┌────────▼────────┐
//!            │ Simulator       │ ── observer(&StepResult)
//!            └────────┬────────┘
//!   per step:         │
//!   Scheduler → Dissolution → Interface tracker → StepResult → Scheduler
//!                     │
//!            ┌────────▼────────────┐
//!            │ Simulation Result   │
//!            │ (history + outcome) │
//!            └─────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! Configuration problems are returned as `Err(ConfigurationError)` before the
//! first step. Anything going wrong while stepping ends the run as
//! `RunOutcome::Failed` with the history collected so far:
//!
//! ```rust,ignore
//! match simulator.run(&scenario, &config)?.outcome {
//!     RunOutcome::Completed(reason) => println!("done: {}", reason),
//!     RunOutcome::Failed(error) => eprintln!("run failed: {}", error),
//!     RunOutcome::Cancelled => println!("cancelled"),
//! }
//! ```

// =================================================================================================
// Module Declarations
// =================================================================================================

mod configuration;
mod driver;
mod result;
pub(crate) mod scenario;
mod state;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use configuration::SolverConfiguration;
pub use driver::{CancellationToken, Simulator};
pub use result::{RunOutcome, SimulationResult, StepResult, Termination, VolumeTotals};
pub use scenario::{InitialFluids, ProfileDefinition, Scenario};
pub use state::SimulationState;
