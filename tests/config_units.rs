//! Scenario loading and unit handling

mod common;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use leach_rs::error::ConfigurationError;
use leach_rs::models::{StageDefinition, StageKind, TerminationCondition};
use leach_rs::solver::{
    InitialFluids, ProfileDefinition, RunOutcome, Scenario, Simulator, SolverConfiguration,
    StepResult, Termination,
};
use leach_rs::units::{DurationUnit, FlowUnit, LengthUnit, Unit, UnitSystem, VolumeUnit};

const FIELD_SCENARIO: &str = r#"{
    "name": "field sump",
    "profile": {
        "depths": [1640.0, 1690.0, 1740.0, 1790.0, 1840.0, 1890.0, 1940.0],
        "radii": [30.0, 30.0, 30.0, 30.0, 30.0, 30.0, 30.0]
    },
    "initial": { "blanket_depth": 1650.0, "salinity": 0.2 },
    "schedule": [
        {
            "name": "sump",
            "kind": "leach",
            "injection_rate": 5000.0,
            "withdrawal_rate": 5000.0,
            "injection_depth": 1930.0,
            "production_depth": 1700.0,
            "termination": { "type": "duration", "duration": 5.0 }
        },
        {
            "kind": "leach_and_fill",
            "injection_rate": 4000.0,
            "fill_rate": 1000.0,
            "withdrawal_rate": 5000.0,
            "injection_depth": 1935.0,
            "production_depth": 1700.0,
            "termination": { "type": "injected_volume", "volume": 10000.0 }
        }
    ],
    "insolubles": { "fraction": 0.08 },
    "units": {
        "length": "[ft_i]",
        "volume": "[bbl_us]",
        "flow": "[bbl_us]/d",
        "duration": "d"
    }
}"#;

/// The field scenario written directly in internal units
fn metric_counterpart(field: &Scenario) -> Scenario {
    let ft = |value: f64| LengthUnit::Foot.to_internal(value);
    let bpd = |value: f64| FlowUnit::BarrelsPerDay.to_internal(value);

    let schedule = field
        .schedule
        .iter()
        .map(|stage| StageDefinition {
            name: stage.name.clone(),
            kind: stage.kind,
            injection_rate: bpd(stage.injection_rate),
            fill_rate: bpd(stage.fill_rate),
            withdrawal_rate: bpd(stage.withdrawal_rate),
            injection_depth: ft(stage.injection_depth),
            production_depth: ft(stage.production_depth),
            injection_salinity: stage.injection_salinity,
            termination: match stage.termination {
                TerminationCondition::Duration { duration } => TerminationCondition::Duration {
                    duration: DurationUnit::Day.to_internal(duration),
                },
                TerminationCondition::InjectedVolume { volume } => TerminationCondition::InjectedVolume {
                    volume: VolumeUnit::Barrel.to_internal(volume),
                },
                other => other,
            },
        })
        .collect();

    let mut metric = Scenario::new(
        ProfileDefinition {
            depths: field.profile.depths.iter().map(|&d| ft(d)).collect(),
            radii: field.profile.radii.iter().map(|&r| ft(r)).collect(),
        },
        InitialFluids {
            blanket_depth: field.initial.blanket_depth.map(ft),
            injection_interface_depth: None,
            pile_height: 0.0,
            salinity: field.initial.salinity,
        },
        schedule,
    );
    metric.name = field.name.clone();
    metric.insolubles = field.insolubles;
    metric.mixing.mixing_length = ft(field.mixing.mixing_length);
    metric
}

// =================================================================================================
// Loading
// =================================================================================================

#[test]
fn test_field_scenario_loads_from_json() {
    let scenario: Scenario = serde_json::from_str(FIELD_SCENARIO).unwrap();

    assert_eq!(scenario.units, UnitSystem::oilfield());
    assert_eq!(scenario.schedule.len(), 2);
    assert_eq!(scenario.schedule[1].kind, StageKind::LeachAndFill);
    assert_eq!(scenario.schedule[1].injection_salinity, 0.0);
    assert_eq!(scenario.insolubles.settling_rate, None);
    assert!(scenario.validate().is_ok());

    let internal = scenario.normalized();
    assert!(internal.units.is_internal());
    assert_abs_diff_eq!(internal.profile.depths[0], 499.872, epsilon = 1e-9);
    assert_eq!(internal.schedule[0].termination, TerminationCondition::Duration { duration: 120.0 });
    assert_relative_eq!(
        internal.schedule[0].injection_rate,
        5000.0 * 0.158_987_294_928 / 24.0,
        max_relative = 1e-12
    );
}

#[test]
fn test_unknown_unit_code_is_rejected() {
    let text = FIELD_SCENARIO.replace("[bbl_us]/d", "[bbl_uk]/d");
    assert!(serde_json::from_str::<Scenario>(&text).is_err());

    let parsed = "[bbl_uk]/d".parse::<FlowUnit>();
    assert!(matches!(parsed, Err(ConfigurationError::UnknownUnit { .. })));
}

#[test]
fn test_scenario_survives_a_json_round_trip() {
    let scenario: Scenario = serde_json::from_str(FIELD_SCENARIO).unwrap();
    let text = serde_json::to_string(&scenario).unwrap();
    let back: Scenario = serde_json::from_str(&text).unwrap();
    assert_eq!(back, scenario);
}

#[test]
fn test_configuration_defaults_fill_missing_fields() {
    let config: SolverConfiguration =
        serde_json::from_str(r#"{ "time_step": 12.0, "max_time": 720.0 }"#).unwrap();

    assert_eq!(config.time_step, 12.0);
    assert_eq!(config.max_time, Some(720.0));
    assert_eq!(config.recession_cap, SolverConfiguration::default().recession_cap);
    assert_eq!(config.max_subdivisions, SolverConfiguration::default().max_subdivisions);
    assert!(config.validate().is_ok());
}

// =================================================================================================
// Units do not change the physics
// =================================================================================================

#[test]
fn test_field_units_match_internal_units() {
    let field: Scenario = serde_json::from_str(FIELD_SCENARIO).unwrap();
    let metric = metric_counterpart(&field);

    assert_eq!(field.normalized(), metric.normalized());

    let config = SolverConfiguration::default();
    let from_field = Simulator::new().run(&field, &config).unwrap();
    let from_metric = Simulator::new().run(&metric, &config).unwrap();

    assert_eq!(from_field.outcome, RunOutcome::Completed(Termination::ScheduleExhausted));
    assert_eq!(from_field.outcome, from_metric.outcome);
    assert_eq!(from_field.history, from_metric.history);

    // 5 days of leaching, then 10 000 bbl injected at 5000 bbl/d
    let last = from_field.last().unwrap();
    assert_abs_diff_eq!(last.time, 24.0 * 7.0, epsilon = 1e-6);
    let barrel = VolumeUnit::Barrel.to_internal(1.0);
    assert_relative_eq!(
        last.cumulative.injected + last.cumulative.filled,
        35_000.0 * barrel,
        max_relative = 1e-9
    );
}

#[test]
fn test_step_records_serialize() {
    let field: Scenario = serde_json::from_str(FIELD_SCENARIO).unwrap();
    let result = Simulator::new()
        .run(&field, &SolverConfiguration::time_evolution(24.0, 48.0))
        .unwrap();

    let json = serde_json::to_string(&result.history).unwrap();
    let back: Vec<StepResult> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), 2);
    assert_eq!(back[1].step, 2);
    assert_relative_eq!(back[1].cavern_volume, result.history[1].cavern_volume, max_relative = 1e-12);
}
