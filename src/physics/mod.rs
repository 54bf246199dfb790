//! Physical properties
//!
//! This module holds the physics that the numerical components consume:
//!
//! - **Brine** ([`BrineProperties`]): density, salt concentration and
//!   saturation as functions of salinity
//! - **Recession** ([`RecessionModel`]): the correlation giving the salt flux
//!   leaving the cavern wall
//!
//! # Architecture
//!
//! Physics is **separate from the numerics**:
//! - the physics provides the correlations (what dissolves, how fast)
//! - the dissolution solver and interface tracker apply them over a step
//!
//! # Implementing a New Recession Model
//!
//! ```rust
//! use leach_rs::physics::{BrineProperties, RecessionModel};
//!
//! struct LinearRecession {
//!     rate: f64,
//! }
//!
//! impl RecessionModel for LinearRecession {
//!     fn mass_flux(&self, _velocity: f64, undersaturation: f64, brine: &BrineProperties) -> f64 {
//!         self.rate * undersaturation / brine.saturation
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Linear recession"
//!     }
//! }
//! ```

pub mod brine;
pub mod recession;

pub use brine::BrineProperties;
pub use recession::{EmpiricalRecession, RecessionModel};
