//! Wall recession correlations
//!
//! A recession model maps the local fluid state at the cavern wall to a salt
//! mass flux leaving the wall. The dissolution solver turns that flux into a
//! radius increment:
//!
//! ```text
//! dr = flux · dt / (ρ_salt · (1 − f_insoluble))
//! ```
//!
//! # Contract
//!
//! Every model MUST be:
//! - zero when the undersaturation is zero (saturated brine dissolves nothing)
//! - non-decreasing in velocity and in undersaturation
//! - finite and non-negative for finite non-negative inputs

use crate::error::ConfigurationError;
use crate::physics::BrineProperties;
use serde::{Deserialize, Serialize};

/// Trait for wall recession correlations
///
/// The correlation is calibration data of the governing physical model, so it
/// is kept behind this trait: the bundled [`EmpiricalRecession`] can be
/// replaced by any calibrated model.
pub trait RecessionModel: Send + Sync {
    /// Salt mass flux leaving the wall \[kg/(m²·h)\]
    ///
    /// # Arguments
    ///
    /// * `velocity` - Fluid velocity along the wall \[m/h\]
    /// * `undersaturation` - `saturation − local salinity`, never negative
    /// * `brine` - Brine properties of the run
    fn mass_flux(&self, velocity: f64, undersaturation: f64, brine: &BrineProperties) -> f64;

    /// Model name
    fn name(&self) -> &str;

    /// Optional description
    fn description(&self) -> Option<&str> {
        None
    }
}

/// Power-law recession correlation
///
/// ```text
/// flux = k · (u / w_sat)^n · (1 + a · v^m)
/// ```
///
/// The first factor is the natural-convection flux at rest, scaled by the
/// relative undersaturation; the second one enhances it with forced
/// circulation. The defaults give roughly 0.2 m/day of wall recession for
/// fresh water at rest and are placeholders awaiting site calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalRecession {
    /// Flux at full undersaturation and zero velocity \[kg/(m²·h)\]
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,

    /// Exponent `n` on the relative undersaturation
    #[serde(default = "default_undersaturation_exponent")]
    pub undersaturation_exponent: f64,

    /// Velocity enhancement `a` \[(h/m)^m\]
    #[serde(default = "default_velocity_coefficient")]
    pub velocity_coefficient: f64,

    /// Exponent `m` on the velocity
    #[serde(default = "default_velocity_exponent")]
    pub velocity_exponent: f64,
}

fn default_coefficient() -> f64 { 18.0 }
fn default_undersaturation_exponent() -> f64 { 1.5 }
fn default_velocity_coefficient() -> f64 { 0.05 }
fn default_velocity_exponent() -> f64 { 0.8 }

impl Default for EmpiricalRecession {
    fn default() -> Self {
        Self {
            coefficient: default_coefficient(),
            undersaturation_exponent: default_undersaturation_exponent(),
            velocity_coefficient: default_velocity_coefficient(),
            velocity_exponent: default_velocity_exponent(),
        }
    }
}

impl EmpiricalRecession {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let checks: [(&'static str, f64, bool); 4] = [
            ("recession.coefficient", self.coefficient, self.coefficient >= 0.0),
            (
                "recession.undersaturation_exponent",
                self.undersaturation_exponent,
                self.undersaturation_exponent > 0.0,
            ),
            (
                "recession.velocity_coefficient",
                self.velocity_coefficient,
                self.velocity_coefficient >= 0.0,
            ),
            (
                "recession.velocity_exponent",
                self.velocity_exponent,
                self.velocity_exponent > 0.0,
            ),
        ];

        for (name, value, ok) in checks {
            if !value.is_finite() || !ok {
                return Err(ConfigurationError::InvalidSetting {
                    name,
                    value,
                    reason: "coefficients must be finite, exponents positive",
                });
            }
        }

        Ok(())
    }
}

impl RecessionModel for EmpiricalRecession {
    fn mass_flux(&self, velocity: f64, undersaturation: f64, brine: &BrineProperties) -> f64 {
        if undersaturation <= 0.0 {
            return 0.0;
        }

        let relative = (undersaturation / brine.saturation).min(1.0);
        let at_rest = self.coefficient * relative.powf(self.undersaturation_exponent);
        let forced = 1.0 + self.velocity_coefficient * velocity.abs().powf(self.velocity_exponent);

        at_rest * forced
    }

    fn name(&self) -> &str {
        "Empirical power-law recession"
    }

    fn description(&self) -> Option<&str> {
        Some(
            "Natural-convection flux scaled by relative undersaturation, \
             enhanced by forced circulation velocity.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_when_saturated() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        assert_eq!(model.mass_flux(10.0, 0.0, &brine), 0.0);
    }

    #[test]
    fn test_monotone_in_velocity() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let slow = model.mass_flux(0.1, 0.1, &brine);
        let fast = model.mass_flux(50.0, 0.1, &brine);
        assert!(fast > slow);
    }

    #[test]
    fn test_monotone_in_undersaturation() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let near_saturated = model.mass_flux(1.0, 0.01, &brine);
        let fresh = model.mass_flux(1.0, brine.saturation, &brine);
        assert!(fresh > near_saturated);
    }

    #[test]
    fn test_fresh_water_at_rest_recedes_about_twenty_centimetres_a_day() {
        let model = EmpiricalRecession::default();
        let brine = BrineProperties::default();
        let flux = model.mass_flux(0.0, brine.saturation, &brine);
        let metres_per_day = flux / brine.salt_density * 24.0;
        assert!(metres_per_day > 0.1 && metres_per_day < 0.3);
    }

    #[test]
    fn test_validation_rejects_negative_exponent() {
        let model = EmpiricalRecession {
            velocity_exponent: -1.0,
            ..Default::default()
        };
        assert!(model.validate().is_err());
    }
}
