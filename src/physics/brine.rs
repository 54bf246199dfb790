//! Brine and rock-salt properties
//!
//! # Density Correlation
//!
//! Brine specific gravity is a quadratic in the salt mass fraction `w`:
//!
//! ```text
//! sg(w) = c₀ + c₁·w + c₂·w²
//! ρ(w)  = ρ_water · sg(w)            [kg/m³]
//! C(w)  = w · ρ(w)                   [kg salt / m³ brine]
//! ```
//!
//! `C(w)` is strictly increasing on `[0, 1]` for the default coefficients, so
//! the salinity of a brine holding a known salt mass in a known volume is the
//! unique root of `C(w) = M / V`.

use crate::error::ConfigurationError;
use crate::numerics::{RootError, RootSolver};
use serde::{Deserialize, Serialize};

/// Brine and salt properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrineProperties {
    /// Saturation mass fraction of NaCl
    #[serde(default = "default_saturation")]
    pub saturation: f64,

    /// Fresh water density \[kg/m³\]
    #[serde(default = "default_water_density")]
    pub water_density: f64,

    /// Specific gravity coefficients `[c₀, c₁, c₂]`
    #[serde(default = "default_density_coefficients")]
    pub density_coefficients: [f64; 3],

    /// Solid rock-salt density \[kg/m³\]
    #[serde(default = "default_salt_density")]
    pub salt_density: f64,
}

fn default_saturation() -> f64 { 0.2645 }
fn default_water_density() -> f64 { 998.2 }
fn default_density_coefficients() -> [f64; 3] { [1.0, 0.6877, 0.26] }
fn default_salt_density() -> f64 { 2160.0 }

impl Default for BrineProperties {
    fn default() -> Self {
        Self {
            saturation: default_saturation(),
            water_density: default_water_density(),
            density_coefficients: default_density_coefficients(),
            salt_density: default_salt_density(),
        }
    }
}

impl BrineProperties {
    /// Specific gravity of brine at salinity `w`
    #[inline]
    pub fn specific_gravity(&self, salinity: f64) -> f64 {
        let [c0, c1, c2] = self.density_coefficients;
        c0 + salinity * (c1 + salinity * c2)
    }

    /// Brine density \[kg/m³\]
    #[inline]
    pub fn density(&self, salinity: f64) -> f64 {
        self.water_density * self.specific_gravity(salinity)
    }

    /// Dissolved salt per unit brine volume \[kg/m³\]
    #[inline]
    pub fn concentration(&self, salinity: f64) -> f64 {
        salinity * self.density(salinity)
    }

    /// dC/dw
    #[inline]
    fn concentration_slope(&self, salinity: f64) -> f64 {
        let [c0, c1, c2] = self.density_coefficients;
        self.water_density * (c0 + salinity * (2.0 * c1 + 3.0 * c2 * salinity))
    }

    /// Salt concentration of saturated brine \[kg/m³\]
    pub fn saturated_concentration(&self) -> f64 {
        self.concentration(self.saturation)
    }

    /// `max(saturation − w, 0)`
    #[inline]
    pub fn undersaturation(&self, salinity: f64) -> f64 {
        (self.saturation - salinity).max(0.0)
    }

    /// Invert `C(w)` for the salinity
    ///
    /// Negative concentrations are mapped linearly to negative salinities so
    /// the caller can report them; they are never clamped here.
    pub fn salinity_from_concentration(
        &self,
        concentration: f64,
        solver: &RootSolver,
    ) -> Result<f64, RootError> {
        if concentration <= 0.0 {
            return Ok(concentration / self.concentration_slope(0.0));
        }

        let root = solver.solve(0.0, 1.0, concentration, |w| {
            (self.concentration(w) - concentration, self.concentration_slope(w))
        })?;

        Ok(root.x)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.saturation > 0.0 && self.saturation < 1.0) {
            return Err(ConfigurationError::InvalidSetting {
                name: "brine.saturation",
                value: self.saturation,
                reason: "must lie in ]0, 1[",
            });
        }
        if !(self.water_density > 0.0 && self.water_density.is_finite()) {
            return Err(ConfigurationError::InvalidSetting {
                name: "brine.water_density",
                value: self.water_density,
                reason: "must be positive",
            });
        }
        if !(self.salt_density > 0.0 && self.salt_density.is_finite()) {
            return Err(ConfigurationError::InvalidSetting {
                name: "brine.salt_density",
                value: self.salt_density,
                reason: "must be positive",
            });
        }

        // C(w) must increase monotonically up to saturation
        let [c0, _, _] = self.density_coefficients;
        if c0 <= 0.0 {
            return Err(ConfigurationError::InvalidSetting {
                name: "brine.density_coefficients[0]",
                value: c0,
                reason: "fresh water specific gravity must be positive",
            });
        }
        if self.concentration_slope(self.saturation) <= 0.0 {
            return Err(ConfigurationError::InvalidSetting {
                name: "brine.density_coefficients",
                value: self.concentration_slope(self.saturation),
                reason: "salt concentration must increase with salinity",
            });
        }

        Ok(())
    }
}
