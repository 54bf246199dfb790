//! Mock recession models for testing
//!
//! Their increments are known in closed form, which makes the step control
//! of the driver easy to check.

use leach_rs::physics::{BrineProperties, RecessionModel};

// =================================================================================================
// Constant flux
// =================================================================================================

/// Same mass flux on every wetted node, whatever the flow
///
/// Radius increment over `dt`: `flux · dt / (ρ_salt · (1 − f))`.
/// Saturated brine still stops dissolution.
pub struct ConstantRecession {
    pub flux: f64,
}

impl ConstantRecession {
    pub fn new(flux: f64) -> Self {
        Self { flux }
    }

    /// Flux giving a radius increment of `dr` over `dt`
    pub fn for_increment(dr: f64, dt: f64, brine: &BrineProperties, insoluble_fraction: f64) -> Self {
        Self::new(dr * brine.salt_density * (1.0 - insoluble_fraction) / dt)
    }
}

impl RecessionModel for ConstantRecession {
    fn mass_flux(&self, _velocity: f64, undersaturation: f64, _brine: &BrineProperties) -> f64 {
        if undersaturation > 0.0 { self.flux } else { 0.0 }
    }

    fn name(&self) -> &str {
        "Constant Recession"
    }
}

// =================================================================================================
// Frozen wall
// =================================================================================================

/// No dissolution at all
pub struct FrozenWall;

impl RecessionModel for FrozenWall {
    fn mass_flux(&self, _velocity: f64, _undersaturation: f64, _brine: &BrineProperties) -> f64 {
        0.0
    }

    fn name(&self) -> &str {
        "Frozen Wall"
    }
}
