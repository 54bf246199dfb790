//! Safeguarded Newton/bisection root finder
//!
//! Solves `f(x) = 0` on a bracket `[lo, hi]` where `f(lo)` and `f(hi)` have
//! opposite signs. Each iteration takes a Newton step when it stays inside the
//! current bracket and falls back to bisection otherwise, so the iteration
//! count is bounded by the bisection count for the requested width.
//!
//! ```text
//!   f(x)
//!    │╲
//!    │  ╲         Newton step inside [a, b]  → accept
//!    │    ╲       Newton step outside [a, b] → bisect
//!  ──┼──────╲──────────── x
//!    a       ╲   b
//! ```

use crate::numerics::Tolerance;
use thiserror::Error;

/// Root finder failure
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RootError {
    #[error("root is not bracketed: f({lo})={f_lo}, f({hi})={f_hi}")]
    NotBracketed { lo: f64, hi: f64, f_lo: f64, f_hi: f64 },
    #[error("no convergence after {iterations} iterations (residual {residual})")]
    NonConvergence { iterations: usize, residual: f64 },
    #[error("function returned a non-finite value at x={x}")]
    NonFinite { x: f64 },
}

/// Converged root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootEstimate {
    pub x: f64,
    pub residual: f64,
    pub iterations: usize,
}

/// Bounded scalar root finder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSolver {
    /// Tolerance on the residual `f(x)`
    pub tolerance: Tolerance,
    /// Bracket width below which `x` is accepted
    pub x_tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RootSolver {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::Combined(1e-9, 1e-12),
            x_tolerance: 1e-9,
            max_iterations: 100,
        }
    }
}

impl RootSolver {
    pub fn new(tolerance: Tolerance, x_tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            x_tolerance,
            max_iterations,
        }
    }

    /// Find the root of `f` on `[lo, hi]`
    ///
    /// `f` returns `(value, derivative)`. `scale` is the magnitude relative
    /// residual tolerances refer to (e.g. the total cavern volume).
    ///
    /// # Example
    ///
    /// ```rust
    /// use leach_rs::numerics::RootSolver;
    ///
    /// let solver = RootSolver::default();
    /// let root = solver.solve(0.0, 2.0, 2.0, |x| (x * x - 2.0, 2.0 * x)).unwrap();
    /// assert!((root.x - 2.0_f64.sqrt()).abs() < 1e-9);
    /// ```
    pub fn solve<F>(&self, lo: f64, hi: f64, scale: f64, f: F) -> Result<RootEstimate, RootError>
    where
        F: Fn(f64) -> (f64, f64),
    {
        let (mut a, mut b) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let (mut f_a, _) = f(a);
        let (f_b, _) = f(b);

        if !f_a.is_finite() {
            return Err(RootError::NonFinite { x: a });
        }
        if !f_b.is_finite() {
            return Err(RootError::NonFinite { x: b });
        }
        if self.tolerance.is_met(f_a, scale) {
            return Ok(RootEstimate { x: a, residual: f_a, iterations: 0 });
        }
        if self.tolerance.is_met(f_b, scale) {
            return Ok(RootEstimate { x: b, residual: f_b, iterations: 0 });
        }
        if f_a.signum() == f_b.signum() {
            return Err(RootError::NotBracketed { lo: a, hi: b, f_lo: f_a, f_hi: f_b });
        }

        let mut x = 0.5 * (a + b);
        let mut residual = f64::INFINITY;

        for iteration in 1..=self.max_iterations {
            let (f_x, df_x) = f(x);
            if !f_x.is_finite() {
                return Err(RootError::NonFinite { x });
            }
            residual = f_x;

            if self.tolerance.is_met(f_x, scale) || (b - a) < self.x_tolerance {
                return Ok(RootEstimate { x, residual, iterations: iteration });
            }

            // Shrink the bracket around the sign change
            if f_x.signum() == f_a.signum() {
                a = x;
                f_a = f_x;
            } else {
                b = x;
            }

            let newton = if df_x != 0.0 && df_x.is_finite() {
                x - f_x / df_x
            } else {
                f64::NAN
            };

            x = if newton.is_finite() && newton > a && newton < b {
                newton
            } else {
                0.5 * (a + b)
            };
        }

        Err(RootError::NonConvergence {
            iterations: self.max_iterations,
            residual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_square_root() {
        let solver = RootSolver::default();
        let root = solver.solve(0.0, 3.0, 1.0, |x| (x * x - 2.0, 2.0 * x)).unwrap();
        assert_abs_diff_eq!(root.x, 2.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_reversed_bracket() {
        let solver = RootSolver::default();
        let root = solver.solve(3.0, 0.0, 1.0, |x| (x - 1.5, 1.0)).unwrap();
        assert_abs_diff_eq!(root.x, 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_root_on_bracket_end() {
        let solver = RootSolver::default();
        let root = solver.solve(1.0, 2.0, 1.0, |x| (x - 1.0, 1.0)).unwrap();
        assert_eq!(root.x, 1.0);
        assert_eq!(root.iterations, 0);
    }

    #[test]
    fn test_not_bracketed() {
        let solver = RootSolver::default();
        let result = solver.solve(0.0, 1.0, 1.0, |x| (x + 5.0, 1.0));
        assert!(matches!(result, Err(RootError::NotBracketed { .. })));
    }

    #[test]
    fn test_bad_derivative_falls_back_to_bisection() {
        let solver = RootSolver::default();
        // Derivative reported as zero everywhere: pure bisection
        let root = solver.solve(0.0, 10.0, 1.0, |x| (x.powi(3) - 8.0, 0.0)).unwrap();
        assert_abs_diff_eq!(root.x, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_iteration_cap() {
        let solver = RootSolver::new(Tolerance::Absolute(0.0), 0.0, 5);
        let result = solver.solve(0.0, 10.0, 1.0, |x| (x - std::f64::consts::PI, 0.0));
        assert!(matches!(
            result,
            Err(RootError::NonConvergence { iterations: 5, .. })
        ));
    }
}
