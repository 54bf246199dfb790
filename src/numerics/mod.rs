//! Numerical building blocks
//!
//! - [`root`]: bounded, safeguarded Newton/bisection for monotone scalar
//!   equations (interface depths, salinity from salt concentration)

pub mod root;

pub use root::{RootError, RootEstimate, RootSolver};

/// Convergence tolerance on a residual
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    Absolute(f64),
    Relative(f64),
    Combined(f64, f64),
}

impl Tolerance {
    /// Check a residual against the tolerance, `scale` being the magnitude
    /// relative tolerances refer to
    pub fn is_met(&self, residual: f64, scale: f64) -> bool {
        let residual = residual.abs();
        let scale = scale.abs();
        match *self {
            Tolerance::Absolute(tol) => residual <= tol,
            Tolerance::Relative(tol) => residual <= tol * scale,
            Tolerance::Combined(abs_tol, rel_tol) => {
                residual <= abs_tol || residual <= rel_tol * scale
            }
        }
    }
}
