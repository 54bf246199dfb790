//! Helper functions for integration tests

use leach_rs::models::{StageDefinition, StageKind, TerminationCondition};
use leach_rs::solver::{InitialFluids, ProfileDefinition, Scenario, StepResult};

/// Leach stage with fresh water injected deep and brine produced high
pub fn leach_stage(rate: f64, termination: TerminationCondition) -> StageDefinition {
    StageDefinition {
        name: None,
        kind: StageKind::Leach,
        injection_rate: rate,
        fill_rate: 0.0,
        withdrawal_rate: rate,
        injection_depth: 590.0,
        production_depth: 520.0,
        injection_salinity: 0.0,
        termination,
    }
}

/// 10 m radius cylinder between 500 m and 600 m under a blanket at 505 m
///
/// The brine starts at `salinity` so that dissolution is active from the
/// first step when it is below saturation.
pub fn cylinder_scenario(nodes: usize, salinity: f64, schedule: Vec<StageDefinition>) -> Scenario {
    let mut initial = InitialFluids::saturated(505.0);
    initial.salinity = salinity;

    let mut scenario = Scenario::new(
        ProfileDefinition::cylinder(500.0, 600.0, 10.0, nodes),
        initial,
        schedule,
    );
    scenario.name = Some("test cylinder".to_string());
    scenario
}

/// Assert that no node radius shrinks from one step to the next
pub fn assert_radii_non_decreasing(history: &[StepResult]) {
    for pair in history.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        for (i, (r0, r1)) in before.radii.iter().zip(after.radii.iter()).enumerate() {
            assert!(
                r1 >= r0,
                "Step {}: node {} radius shrank from {} to {}",
                after.step, i, r0, r1
            );
        }
    }
}
