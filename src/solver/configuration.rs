//! Solver configuration
//!
//! The "HOW to simulate": step size, run limits and numerical tolerances.
//! Every field has a serde default so a loader only needs to spell out what
//! differs from them.
//!
//! # Examples
//!
//! ```rust
//! use leach_rs::solver::SolverConfiguration;
//!
//! // Daily steps, at most a year of simulated time
//! let config = SolverConfiguration::time_evolution(24.0, 8766.0);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::ConfigurationError;
use crate::models::DissolutionSettings;
use crate::numerics::{RootSolver, Tolerance};
use serde::{Deserialize, Serialize};

/// Numerical parameters of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfiguration {
    /// Nominal step duration \[h\]
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// Hard limit on accepted steps
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Hard limit on simulated time \[h\]
    #[serde(default)]
    pub max_time: Option<f64>,

    /// Depth of recursive step halving before giving up
    #[serde(default = "default_max_subdivisions")]
    pub max_subdivisions: usize,

    /// Largest radius increment per step \[m\], 0 freezes the wall
    #[serde(default = "default_recession_cap")]
    pub recession_cap: f64,

    /// Largest accepted `dr / cap` before the step is subdivided
    #[serde(default = "default_clamp_ratio_threshold")]
    pub clamp_ratio_threshold: f64,

    /// Largest share of the cavern volume injected or filled in one step,
    /// and of the liquid brine withdrawn or vented
    #[serde(default = "default_max_volume_fraction")]
    pub max_volume_fraction: f64,

    /// Relative tolerance on the cavern volume balance
    #[serde(default = "default_volume_tolerance")]
    pub volume_tolerance: f64,

    /// Relative residual tolerance of interface and salinity solves
    #[serde(default = "default_root_tolerance")]
    pub root_tolerance: f64,

    #[serde(default = "default_root_max_iterations")]
    pub root_max_iterations: usize,

    /// Node count above which dissolution runs in parallel (`parallel` feature)
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Roof recession since the start of the run beyond which the roof is
    /// considered breached and the run stops \[m\], `None` never stops
    #[serde(default = "default_roof_recession_limit")]
    pub roof_recession_limit: Option<f64>,
}

fn default_time_step() -> f64 { 24.0 }
fn default_max_steps() -> usize { 100_000 }
fn default_max_subdivisions() -> usize { 8 }
fn default_recession_cap() -> f64 { 0.25 }
fn default_clamp_ratio_threshold() -> f64 { 2.0 }
fn default_max_volume_fraction() -> f64 { 0.25 }
fn default_volume_tolerance() -> f64 { 1e-6 }
fn default_root_tolerance() -> f64 { 1e-10 }
fn default_root_max_iterations() -> usize { 100 }
fn default_parallel_threshold() -> usize { 999 }
fn default_roof_recession_limit() -> Option<f64> { Some(1.0) }

impl Default for SolverConfiguration {
    fn default() -> Self {
        Self {
            time_step: default_time_step(),
            max_steps: default_max_steps(),
            max_time: None,
            max_subdivisions: default_max_subdivisions(),
            recession_cap: default_recession_cap(),
            clamp_ratio_threshold: default_clamp_ratio_threshold(),
            max_volume_fraction: default_max_volume_fraction(),
            volume_tolerance: default_volume_tolerance(),
            root_tolerance: default_root_tolerance(),
            root_max_iterations: default_root_max_iterations(),
            parallel_threshold: default_parallel_threshold(),
            roof_recession_limit: default_roof_recession_limit(),
        }
    }
}

impl SolverConfiguration {
    /// Fixed step over a bounded simulated time
    pub fn time_evolution(time_step: f64, max_time: f64) -> Self {
        Self {
            time_step,
            max_time: Some(max_time),
            ..Default::default()
        }
    }

    /// Bounded root finder built from the tolerances
    pub fn root_solver(&self) -> RootSolver {
        RootSolver::new(
            Tolerance::Combined(1e-12, self.root_tolerance),
            1e-10,
            self.root_max_iterations,
        )
    }

    pub fn dissolution_settings(&self) -> DissolutionSettings {
        DissolutionSettings {
            recession_cap: self.recession_cap,
            clamp_ratio_threshold: self.clamp_ratio_threshold,
            parallel_threshold: self.parallel_threshold,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |name: &'static str, value: f64, reason: &'static str| {
            Err(ConfigurationError::InvalidSetting { name, value, reason })
        };

        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return invalid("time_step", self.time_step, "must be positive");
        }
        if self.max_steps == 0 {
            return invalid("max_steps", 0.0, "must be greater than 0");
        }
        if let Some(max_time) = self.max_time
            && !(max_time.is_finite() && max_time > 0.0)
        {
            return invalid("max_time", max_time, "must be positive");
        }
        if !(self.recession_cap.is_finite() && self.recession_cap >= 0.0) {
            return invalid("recession_cap", self.recession_cap, "must be finite and non-negative");
        }
        if !(self.clamp_ratio_threshold.is_finite() && self.clamp_ratio_threshold >= 1.0) {
            return invalid("clamp_ratio_threshold", self.clamp_ratio_threshold, "must be at least 1");
        }
        if !(self.max_volume_fraction > 0.0 && self.max_volume_fraction <= 1.0) {
            return invalid("max_volume_fraction", self.max_volume_fraction, "must lie in ]0, 1]");
        }
        if !(self.volume_tolerance.is_finite() && self.volume_tolerance > 0.0) {
            return invalid("volume_tolerance", self.volume_tolerance, "must be positive");
        }
        if !(self.root_tolerance.is_finite() && self.root_tolerance > 0.0) {
            return invalid("root_tolerance", self.root_tolerance, "must be positive");
        }
        if self.root_max_iterations == 0 {
            return invalid("root_max_iterations", 0.0, "must be greater than 0");
        }
        if let Some(limit) = self.roof_recession_limit
            && !(limit.is_finite() && limit > 0.0)
        {
            return invalid("roof_recession_limit", limit, "must be positive");
        }
        if self.parallel_threshold == 0 {
            return invalid("parallel_threshold", 0.0, "must be at least 1");
        }

        Ok(())
    }
}
