//! Axisymmetric cavern geometry
//!
//! The cavern wall is described by depth nodes ordered from the roof to the
//! floor. Between two nodes the radius varies linearly with depth, so every
//! segment is a truncated cone (frustum) and all geometric integrals are exact:
//!
//! ```text
//!   roof ─── z₀ ┌──────┐ r₀
//!               │      │            V = π h (r₁² + r₁ r₂ + r₂²) / 3
//!          z₁  ┌┘      └┐ r₁        S = π (r₁ + r₂) √(h² + (r₂ − r₁)²)
//!              │        │
//!   floor ─ z₂ └────────┘ r₂
//! ```
//!
//! Cumulative volumes from the roof are cached lazily and invalidated on every
//! mutation of the radii.

use crate::error::{ConfigurationError, Invariant, LeachResult, SimulationError};
use crate::numerics::RootSolver;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::OnceLock;

/// One point of the discretized cavern wall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthNode {
    /// Depth below the reference datum \[m\]
    pub depth: f64,
    /// Wall radius \[m\]
    pub radius: f64,
    /// Recession rate applied in the last accepted step \[m/h\]
    #[serde(default)]
    pub recession_rate: f64,
}

impl DepthNode {
    pub fn new(depth: f64, radius: f64) -> Self {
        Self {
            depth,
            radius,
            recession_rate: 0.0,
        }
    }
}

#[inline]
fn frustum_volume(height: f64, r1: f64, r2: f64) -> f64 {
    PI * height * (r1 * r1 + r1 * r2 + r2 * r2) / 3.0
}

#[inline]
fn frustum_wall_area(height: f64, r1: f64, r2: f64) -> f64 {
    PI * (r1 + r2) * (height * height + (r2 - r1) * (r2 - r1)).sqrt()
}

/// Discretized cavern shape
///
/// Roof depth is the first node depth, floor depth the last one. The node
/// count is fixed for the lifetime of a run; only radii change, and only
/// upwards.
///
/// # Example
///
/// ```rust
/// use leach_rs::models::CavernProfile;
///
/// // 100 m tall cylinder of radius 10 m
/// let profile = CavernProfile::new(&[500.0, 600.0], &[10.0, 10.0]).unwrap();
/// let expected = std::f64::consts::PI * 100.0 * 100.0;
/// assert!((profile.total_volume() - expected).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct CavernProfile {
    nodes: Vec<DepthNode>,
    /// Volume between the roof and each node
    cumulative: OnceLock<Vec<f64>>,
}

impl PartialEq for CavernProfile {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl CavernProfile {
    /// Build a profile from node depths and radii
    pub fn new(depths: &[f64], radii: &[f64]) -> Result<Self, ConfigurationError> {
        if depths.len() != radii.len() {
            return Err(ConfigurationError::InvalidSetting {
                name: "profile.radii",
                value: radii.len() as f64,
                reason: "one radius per depth node is required",
            });
        }

        let nodes = depths
            .iter()
            .zip(radii)
            .map(|(&depth, &radius)| DepthNode::new(depth, radius))
            .collect();

        Self::from_nodes(nodes)
    }

    /// Build a profile from already assembled nodes
    pub fn from_nodes(nodes: Vec<DepthNode>) -> Result<Self, ConfigurationError> {
        if nodes.len() < 2 {
            return Err(ConfigurationError::TooFewNodes { count: nodes.len() });
        }

        for (index, node) in nodes.iter().enumerate() {
            if !node.depth.is_finite() {
                return Err(ConfigurationError::NonFinite {
                    field: "profile.depth",
                    value: node.depth,
                });
            }
            if !(node.radius.is_finite() && node.radius >= 0.0) {
                return Err(ConfigurationError::InvalidRadius {
                    index,
                    radius: node.radius,
                });
            }
            if index > 0 && node.depth <= nodes[index - 1].depth {
                return Err(ConfigurationError::NonIncreasingDepth {
                    index,
                    depth: node.depth,
                    previous: nodes[index - 1].depth,
                });
            }
        }

        let profile = Self {
            nodes,
            cumulative: OnceLock::new(),
        };

        if profile.total_volume() <= 0.0 {
            return Err(ConfigurationError::EmptyCavern);
        }

        Ok(profile)
    }

    // ===================================== Accessors =====================================

    pub fn nodes(&self) -> &[DepthNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Roof depth \[m\]
    pub fn roof(&self) -> f64 {
        self.nodes[0].depth
    }

    /// Floor depth \[m\]
    pub fn floor(&self) -> f64 {
        self.nodes[self.nodes.len() - 1].depth
    }

    /// Wall radius at the roof node \[m\]
    pub fn roof_radius(&self) -> f64 {
        self.nodes[0].radius
    }

    pub fn height(&self) -> f64 {
        self.floor() - self.roof()
    }

    pub fn depths(&self) -> DVector<f64> {
        DVector::from_iterator(self.nodes.len(), self.nodes.iter().map(|n| n.depth))
    }

    pub fn radii(&self) -> DVector<f64> {
        DVector::from_iterator(self.nodes.len(), self.nodes.iter().map(|n| n.radius))
    }

    pub fn recession_rates(&self) -> DVector<f64> {
        DVector::from_iterator(self.nodes.len(), self.nodes.iter().map(|n| n.recession_rate))
    }

    // ================================= Geometric queries =================================

    fn cumulative(&self) -> &[f64] {
        self.cumulative.get_or_init(|| {
            let mut cumulative = Vec::with_capacity(self.nodes.len());
            let mut total = 0.0;
            cumulative.push(total);
            for pair in self.nodes.windows(2) {
                total += frustum_volume(pair[1].depth - pair[0].depth, pair[0].radius, pair[1].radius);
                cumulative.push(total);
            }
            cumulative
        })
    }

    fn check_depth(&self, depth: f64) -> LeachResult<()> {
        if depth.is_finite() && depth >= self.roof() && depth <= self.floor() {
            Ok(())
        } else {
            Err(SimulationError::InputOutOfRange {
                depth,
                roof: self.roof(),
                floor: self.floor(),
            })
        }
    }

    /// Index `k` of the segment `[node k, node k+1]` holding `depth`
    fn segment(&self, depth: f64) -> usize {
        self.nodes
            .partition_point(|node| node.depth <= depth)
            .saturating_sub(1)
            .min(self.nodes.len() - 2)
    }

    fn interpolate(&self, segment: usize, depth: f64) -> f64 {
        let (upper, lower) = (&self.nodes[segment], &self.nodes[segment + 1]);
        let t = (depth - upper.depth) / (lower.depth - upper.depth);
        upper.radius + t * (lower.radius - upper.radius)
    }

    /// Volume between the roof and `depth`, without range check
    fn volume_above_unchecked(&self, depth: f64) -> f64 {
        let k = self.segment(depth);
        let upper = &self.nodes[k];
        self.cumulative()[k] + frustum_volume(depth - upper.depth, upper.radius, self.interpolate(k, depth))
    }

    /// Linearly interpolated wall radius \[m\]
    pub fn radius_at(&self, depth: f64) -> LeachResult<f64> {
        self.check_depth(depth)?;
        Ok(self.interpolate(self.segment(depth), depth))
    }

    /// Horizontal cross-section `π r²` \[m²\]
    pub fn cross_section_at(&self, depth: f64) -> LeachResult<f64> {
        let radius = self.radius_at(depth)?;
        Ok(PI * radius * radius)
    }

    /// Total cavern volume \[m³\]
    pub fn total_volume(&self) -> f64 {
        self.cumulative().last().copied().unwrap_or(0.0)
    }

    /// Volume between `depth` and the floor \[m³\]
    pub fn volume_below(&self, depth: f64) -> LeachResult<f64> {
        self.check_depth(depth)?;
        Ok((self.total_volume() - self.volume_above_unchecked(depth)).max(0.0))
    }

    /// Volume between two depths, in either order \[m³\]
    pub fn volume_between(&self, top: f64, bottom: f64) -> LeachResult<f64> {
        self.check_depth(top)?;
        self.check_depth(bottom)?;
        let (top, bottom) = (top.min(bottom), top.max(bottom));
        Ok((self.volume_above_unchecked(bottom) - self.volume_above_unchecked(top)).max(0.0))
    }

    /// Lateral wall surface of the whole cavern \[m²\]
    pub fn wall_area(&self) -> f64 {
        self.nodes
            .windows(2)
            .map(|pair| frustum_wall_area(pair[1].depth - pair[0].depth, pair[0].radius, pair[1].radius))
            .sum()
    }

    /// Lateral wall surface between two depths, in either order \[m²\]
    pub fn wall_area_between(&self, top: f64, bottom: f64) -> LeachResult<f64> {
        self.check_depth(top)?;
        self.check_depth(bottom)?;
        let (top, bottom) = (top.min(bottom), top.max(bottom));

        let mut area = 0.0;
        for k in self.segment(top)..=self.segment(bottom) {
            let z1 = self.nodes[k].depth.max(top);
            let z2 = self.nodes[k + 1].depth.min(bottom);
            if z2 > z1 {
                area += frustum_wall_area(z2 - z1, self.interpolate(k, z1), self.interpolate(k, z2));
            }
        }

        Ok(area)
    }

    /// Depth `z` at which `volume_below(z) = volume`
    ///
    /// Volumes beyond the cavern capacity map to the roof, non-positive
    /// volumes to the floor.
    pub fn depth_for_volume_below(&self, volume: f64, solver: &RootSolver) -> LeachResult<f64> {
        let total = self.total_volume();
        if volume >= total {
            return Ok(self.roof());
        }
        if volume <= 0.0 {
            return Ok(self.floor());
        }

        let root = solver
            .solve(self.roof(), self.floor(), total, |z| {
                let radius = self.interpolate(self.segment(z), z);
                (total - self.volume_above_unchecked(z) - volume, -PI * radius * radius)
            })
            .map_err(|e| SimulationError::root_finding("depth for volume", e))?;

        Ok(root.x.clamp(self.roof(), self.floor()))
    }

    // ===================================== Mutation =====================================

    /// Enlarge the wall by per-node radius increments
    ///
    /// Increments are clamped to `cap`; `dt` is the step duration used to
    /// record each node's recession rate. Returns the number of clamped nodes.
    ///
    /// # Errors
    ///
    /// Negative or non-finite increments would shrink or corrupt the wall and
    /// are reported as [`Invariant::RadiusDecrease`]; the profile is left
    /// untouched in that case.
    pub fn apply_recession(&mut self, deltas: &DVector<f64>, cap: f64, dt: f64) -> LeachResult<usize> {
        if deltas.len() != self.nodes.len() {
            return Err(Invariant::NonFinite {
                quantity: "recession increment count",
                index: deltas.len(),
            }
            .into());
        }
        if let Some((index, &delta)) = deltas.iter().enumerate().find(|(_, d)| !(**d >= 0.0 && d.is_finite())) {
            return Err(Invariant::RadiusDecrease { index, delta }.into());
        }

        let mut clamped = 0;
        for (node, &delta) in self.nodes.iter_mut().zip(deltas.iter()) {
            let applied = if delta > cap {
                clamped += 1;
                cap.max(0.0)
            } else {
                delta
            };
            node.radius += applied;
            node.recession_rate = if dt > 0.0 { applied / dt } else { 0.0 };
        }

        self.cumulative = OnceLock::new();
        Ok(clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cylinder() -> CavernProfile {
        CavernProfile::new(&[500.0, 550.0, 600.0], &[10.0, 10.0, 10.0]).unwrap()
    }

    fn cone() -> CavernProfile {
        // Apex at the roof, radius 30 m at the floor
        CavernProfile::new(&[0.0, 90.0], &[0.0, 30.0]).unwrap()
    }

    #[test]
    fn test_cylinder_volume_and_area() {
        let profile = cylinder();
        let expected_volume = PI * 100.0 * 100.0;
        assert_abs_diff_eq!(profile.total_volume(), expected_volume, epsilon = 1e-6);

        let expected_area = 2.0 * PI * 10.0 * 100.0;
        assert_abs_diff_eq!(profile.wall_area(), expected_area, epsilon = 1e-6);
    }

    #[test]
    fn test_cone_volume_is_exact() {
        let profile = cone();
        let expected = PI * 30.0 * 30.0 * 90.0 / 3.0;
        assert_abs_diff_eq!(profile.total_volume(), expected, epsilon = 1e-6);

        // Lower half of a cone: full cone minus the similar upper cone
        let upper = PI * 15.0 * 15.0 * 45.0 / 3.0;
        let below = profile.volume_below(45.0).unwrap();
        assert_abs_diff_eq!(below, expected - upper, epsilon = 1e-6);
    }

    #[test]
    fn test_radius_interpolation() {
        let profile = cone();
        assert_abs_diff_eq!(profile.radius_at(45.0).unwrap(), 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(profile.cross_section_at(90.0).unwrap(), PI * 900.0, epsilon = 1e-9);
    }

    #[test]
    fn test_out_of_range_query() {
        let profile = cylinder();
        assert!(matches!(
            profile.volume_below(499.0),
            Err(SimulationError::InputOutOfRange { .. })
        ));
        assert!(profile.radius_at(f64::NAN).is_err());
    }

    #[test]
    fn test_volume_between_is_order_independent() {
        let profile = cylinder();
        let a = profile.volume_between(520.0, 580.0).unwrap();
        let b = profile.volume_between(580.0, 520.0).unwrap();
        assert_eq!(a, b);
        assert_abs_diff_eq!(a, PI * 100.0 * 60.0, epsilon = 1e-6);
    }

    #[test]
    fn test_partial_wall_area() {
        let profile = cylinder();
        let area = profile.wall_area_between(525.0, 575.0).unwrap();
        assert_abs_diff_eq!(area, 2.0 * PI * 10.0 * 50.0, epsilon = 1e-6);
    }

    #[test]
    fn test_depth_for_volume_inverts_volume_below() {
        let profile = cone();
        let solver = RootSolver::default();
        for &z in &[10.0, 45.0, 80.0] {
            let volume = profile.volume_below(z).unwrap();
            let back = profile.depth_for_volume_below(volume, &solver).unwrap();
            assert_abs_diff_eq!(back, z, epsilon = 1e-6);
        }
        assert_eq!(profile.depth_for_volume_below(1e12, &solver).unwrap(), 0.0);
        assert_eq!(profile.depth_for_volume_below(0.0, &solver).unwrap(), 90.0);
    }

    #[test]
    fn test_recession_invalidates_cache() {
        let mut profile = cylinder();
        let before = profile.total_volume();
        let clamped = profile
            .apply_recession(&DVector::from_element(3, 1.0), 0.5, 10.0)
            .unwrap();

        assert_eq!(clamped, 3);
        assert_abs_diff_eq!(profile.radii()[1], 10.5, epsilon = 1e-12);
        assert_abs_diff_eq!(profile.recession_rates()[1], 0.05, epsilon = 1e-12);
        assert!(profile.total_volume() > before);
    }

    #[test]
    fn test_negative_increment_is_rejected() {
        let mut profile = cylinder();
        let deltas = DVector::from_vec(vec![0.1, -0.1, 0.1]);
        let error = profile.apply_recession(&deltas, 1.0, 1.0).unwrap_err();

        assert!(matches!(
            error,
            SimulationError::InvariantViolation(Invariant::RadiusDecrease { index: 1, .. })
        ));
        assert_eq!(profile.radii()[0], 10.0);
    }

    #[test]
    fn test_invalid_profiles() {
        assert!(matches!(
            CavernProfile::new(&[10.0], &[1.0]),
            Err(ConfigurationError::TooFewNodes { count: 1 })
        ));
        assert!(matches!(
            CavernProfile::new(&[10.0, 10.0], &[1.0, 1.0]),
            Err(ConfigurationError::NonIncreasingDepth { index: 1, .. })
        ));
        assert!(matches!(
            CavernProfile::new(&[10.0, 20.0], &[1.0, -1.0]),
            Err(ConfigurationError::InvalidRadius { index: 1, .. })
        ));
        assert!(matches!(
            CavernProfile::new(&[10.0, 20.0], &[0.0, 0.0]),
            Err(ConfigurationError::EmptyCavern)
        ));
    }
}
