//! Common utilities for integration tests

pub mod mock_models;
pub mod test_helpers;

// Re-export commonly used items
pub use mock_models::{ConstantRecession, FrozenWall};
pub use test_helpers::{
    assert_radii_non_decreasing,
    cylinder_scenario,
    leach_stage,
};
