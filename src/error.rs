//! Error types
//!
//! Two families of errors exist in a leach simulation:
//!
//! - [`ConfigurationError`]: the [`Scenario`](crate::solver::Scenario) or the
//!   [`SolverConfiguration`](crate::solver::SolverConfiguration) is malformed.
//!   Detected before the first step; the run never starts.
//! - [`SimulationError`]: something went wrong while stepping. `StepTooLarge`
//!   is recovered internally by step subdivision, every other variant ends the
//!   run as [`RunOutcome::Failed`](crate::solver::RunOutcome::Failed) with the
//!   history collected so far.

use crate::numerics::RootError;
use thiserror::Error;

/// Result alias for run-time operations
pub type LeachResult<T> = Result<T, SimulationError>;

// =================================================================================================
// Configuration errors
// =================================================================================================

/// Load-time validation failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// The profile needs at least two nodes to enclose a volume
    #[error("profile needs at least 2 depth nodes, got {count}")]
    TooFewNodes { count: usize },

    /// Depths must be strictly increasing from roof to floor
    #[error("node depths must be strictly increasing: node {index} at {depth} m follows {previous} m")]
    NonIncreasingDepth {
        index: usize,
        depth: f64,
        previous: f64,
    },

    /// Radii must be finite and non-negative
    #[error("node {index} has invalid radius {radius}")]
    InvalidRadius { index: usize, radius: f64 },

    /// The initial cavern encloses no volume
    #[error("initial cavern volume is zero")]
    EmptyCavern,

    /// A value that must be finite is not
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// An interface or string depth lies outside the cavern
    #[error("{name} depth {depth} m lies outside the cavern [{roof}, {floor}] m")]
    DepthOutOfRange {
        name: String,
        depth: f64,
        roof: f64,
        floor: f64,
    },

    /// Initial interfaces are not stacked roof → blanket → brine → pile → floor
    #[error("initial interfaces are out of order: {upper} ({upper_depth} m) lies below {lower} ({lower_depth} m)")]
    InterfaceOrder {
        upper: &'static str,
        upper_depth: f64,
        lower: &'static str,
        lower_depth: f64,
    },

    /// Salinity is outside [0, saturation]
    #[error("{field} salinity {value} outside [0, {saturation}]")]
    SalinityOutOfRange {
        field: &'static str,
        value: f64,
        saturation: f64,
    },

    /// The schedule has no stage
    #[error("schedule contains no stage")]
    EmptySchedule,

    /// A stage termination target is zero or negative
    #[error("stage {stage} has a non-positive termination target {value}")]
    ZeroTarget { stage: usize, value: f64 },

    /// A flow rate is negative or non-finite
    #[error("stage {stage}: {field} must be a finite non-negative rate, got {value}")]
    InvalidRate {
        stage: usize,
        field: &'static str,
        value: f64,
    },

    /// A flow rate contradicts the stage kind
    #[error("stage {stage} ({kind}): {reason}")]
    RateMismatch {
        stage: usize,
        kind: String,
        reason: String,
    },

    /// A solver or physics setting is invalid
    #[error("invalid setting {name}={value}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A unit code was not recognised
    #[error("unknown {kind} unit code '{code}'")]
    UnknownUnit { kind: &'static str, code: String },
}

// =================================================================================================
// Run-time errors
// =================================================================================================

/// Named invariant whose violation ends a run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Invariant {
    /// Two fluid boundaries crossed
    #[error("interface crossing: {upper} at {upper_depth:.4} m lies below {lower} at {lower_depth:.4} m")]
    InterfaceCrossing {
        upper: &'static str,
        upper_depth: f64,
        lower: &'static str,
        lower_depth: f64,
    },

    /// A node radius would shrink or become invalid
    #[error("radius decrease at node {index}: increment {delta}")]
    RadiusDecrease { index: usize, delta: f64 },

    /// Brine salinity left [0, saturation]
    #[error("salinity {value} outside [0, {saturation}]")]
    SalinityOutOfBounds { value: f64, saturation: f64 },

    /// Configured withdrawal removes more fluid than the cavern holds
    #[error("fluid deficit of {deficit:.6} m3: withdrawal exceeds available fluid")]
    FluidDeficit { deficit: f64 },

    /// No brine is left in the cavern
    #[error("brine exhausted: volume {volume:.6} m3")]
    BrineExhausted { volume: f64 },

    /// NaN or infinity appeared in the state
    #[error("non-finite {quantity} at node {index}")]
    NonFinite { quantity: &'static str, index: usize },
}

/// Failure raised while advancing the simulation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// The requested step is too large to be applied safely
    #[error("step too large: ratio {ratio:.3} exceeds threshold {threshold:.3}")]
    StepTooLarge { ratio: f64, threshold: f64 },

    /// A geometric query fell outside the cavern
    #[error("depth {depth} m outside the cavern [{roof}, {floor}] m")]
    InputOutOfRange { depth: f64, roof: f64, floor: f64 },

    /// A physical invariant was violated
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] Invariant),

    /// Step subdivision did not converge within the retry budget
    #[error("step at t={time} h still too large after {subdivisions} subdivisions")]
    RetryBudgetExhausted { time: f64, subdivisions: usize },

    /// The bounded root finder failed
    #[error("root finding failed for {target}: {reason}")]
    RootFinding { target: &'static str, reason: String },
}

impl SimulationError {
    /// Whether the driver may recover by subdividing the step
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimulationError::StepTooLarge { .. })
    }

    pub(crate) fn root_finding(target: &'static str, error: RootError) -> Self {
        SimulationError::RootFinding {
            target,
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_step_too_large_is_recoverable() {
        let recoverable = SimulationError::StepTooLarge { ratio: 3.0, threshold: 2.0 };
        assert!(recoverable.is_recoverable());

        let fatal = SimulationError::from(Invariant::FluidDeficit { deficit: 1.0 });
        assert!(!fatal.is_recoverable());
    }

    #[test]
    fn test_invariant_message_names_the_invariant() {
        let error = SimulationError::from(Invariant::InterfaceCrossing {
            upper: "blanket interface",
            upper_depth: 510.0,
            lower: "injection interface",
            lower_depth: 500.0,
        });
        let message = error.to_string();
        assert!(message.contains("interface crossing"));
        assert!(message.contains("blanket interface"));
    }
}
