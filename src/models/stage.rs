//! Operational stage definitions
//!
//! A schedule is an ordered list of [`StageDefinition`]s. Each stage fixes the
//! flow rates, the two string depths and the condition that ends it. Stages
//! are immutable once loaded; the [`StageScheduler`](super::StageScheduler)
//! walks through them.
//!
//! | Kind           | Injection | Product fill | Withdrawal |
//! |----------------|-----------|--------------|------------|
//! | `Leach`        | > 0       | 0            | ≥ 0        |
//! | `Fill`         | 0         | > 0          | ≥ 0        |
//! | `LeachAndFill` | > 0       | > 0          | ≥ 0        |
//! | `Idle`         | 0         | 0            | 0          |

use crate::error::ConfigurationError;
use crate::physics::BrineProperties;
use crate::units::{Unit, UnitSystem};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of operation carried out during a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Circulate under-saturated water against the wall
    Leach,
    /// Inject product under the roof, displacing brine
    Fill,
    /// Leach while filling product
    LeachAndFill,
    /// Shut-in
    Idle,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Leach => "Leach",
            StageKind::Fill => "Fill",
            StageKind::LeachAndFill => "LeachAndFill",
            StageKind::Idle => "Idle",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Condition ending a stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminationCondition {
    /// Elapsed stage time, in the duration unit of the scenario
    Duration { duration: f64 },
    /// Water plus product injected during the stage \[m³\]
    InjectedVolume { volume: f64 },
    /// Total cavern volume \[m³\]
    CavernVolume { volume: f64 },
    /// Blanket interface reaching a depth \[m\]
    BlanketDepth { depth: f64 },
}

impl TerminationCondition {
    /// Target value, whatever its dimension
    pub fn target(&self) -> f64 {
        match *self {
            TerminationCondition::Duration { duration } => duration,
            TerminationCondition::InjectedVolume { volume } => volume,
            TerminationCondition::CavernVolume { volume } => volume,
            TerminationCondition::BlanketDepth { depth } => depth,
        }
    }

    fn normalized(&self, units: &UnitSystem) -> Self {
        match *self {
            TerminationCondition::Duration { duration } => TerminationCondition::Duration {
                duration: units.duration.to_internal(duration),
            },
            TerminationCondition::InjectedVolume { volume } => TerminationCondition::InjectedVolume {
                volume: units.volume.to_internal(volume),
            },
            TerminationCondition::CavernVolume { volume } => TerminationCondition::CavernVolume {
                volume: units.volume.to_internal(volume),
            },
            TerminationCondition::BlanketDepth { depth } => TerminationCondition::BlanketDepth {
                depth: units.length.to_internal(depth),
            },
        }
    }
}

/// One stage of the operating schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    #[serde(default)]
    pub name: Option<String>,

    pub kind: StageKind,

    /// Water injection rate \[m³/h\]
    #[serde(default)]
    pub injection_rate: f64,

    /// Product fill rate \[m³/h\]
    #[serde(default)]
    pub fill_rate: f64,

    /// Brine withdrawal rate \[m³/h\]
    #[serde(default)]
    pub withdrawal_rate: f64,

    /// Injection string depth \[m\]
    pub injection_depth: f64,

    /// Production string depth \[m\]
    pub production_depth: f64,

    /// Salinity of the injected water (mass fraction)
    #[serde(default)]
    pub injection_salinity: f64,

    pub termination: TerminationCondition,
}

impl StageDefinition {
    /// Label used in logs and messages
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => format!("#{} '{}'", index, name),
            None => format!("#{} ({})", index, self.kind),
        }
    }

    /// Convert rates, depths and target from `units` to internal units
    pub fn normalized(&self, units: &UnitSystem) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            injection_rate: units.flow.to_internal(self.injection_rate),
            fill_rate: units.flow.to_internal(self.fill_rate),
            withdrawal_rate: units.flow.to_internal(self.withdrawal_rate),
            injection_depth: units.length.to_internal(self.injection_depth),
            production_depth: units.length.to_internal(self.production_depth),
            injection_salinity: self.injection_salinity,
            termination: self.termination.normalized(units),
        }
    }

    /// Load-time validation against the cavern extent
    pub fn validate(
        &self,
        index: usize,
        roof: f64,
        floor: f64,
        brine: &BrineProperties,
    ) -> Result<(), ConfigurationError> {
        let rates = [
            ("injection_rate", self.injection_rate),
            ("fill_rate", self.fill_rate),
            ("withdrawal_rate", self.withdrawal_rate),
        ];
        for (field, value) in rates {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigurationError::InvalidRate { stage: index, field, value });
            }
        }

        let mismatch = |reason: &str| ConfigurationError::RateMismatch {
            stage: index,
            kind: self.kind.to_string(),
            reason: reason.to_string(),
        };

        match self.kind {
            StageKind::Leach => {
                if self.injection_rate <= 0.0 {
                    return Err(mismatch("a leach stage needs a positive injection rate"));
                }
                if self.fill_rate > 0.0 {
                    return Err(mismatch("a leach stage cannot fill product"));
                }
            }
            StageKind::Fill => {
                if self.fill_rate <= 0.0 {
                    return Err(mismatch("a fill stage needs a positive fill rate"));
                }
                if self.injection_rate > 0.0 {
                    return Err(mismatch("a fill stage cannot inject water"));
                }
            }
            StageKind::LeachAndFill => {
                if self.injection_rate <= 0.0 || self.fill_rate <= 0.0 {
                    return Err(mismatch("a leach-and-fill stage needs positive injection and fill rates"));
                }
            }
            StageKind::Idle => {
                if self.injection_rate > 0.0 || self.fill_rate > 0.0 || self.withdrawal_rate > 0.0 {
                    return Err(mismatch("an idle stage has no flow"));
                }
                if matches!(self.termination, TerminationCondition::InjectedVolume { .. }) {
                    return Err(mismatch("an idle stage never reaches an injected volume"));
                }
            }
        }

        let target = self.termination.target();
        if !(target.is_finite() && target > 0.0) {
            return Err(ConfigurationError::ZeroTarget { stage: index, value: target });
        }

        let depths = [
            ("injection string", self.injection_depth),
            ("production string", self.production_depth),
        ];
        for (name, depth) in depths {
            if !(depth >= roof && depth <= floor) {
                return Err(ConfigurationError::DepthOutOfRange {
                    name: format!("stage {} {}", index, name),
                    depth,
                    roof,
                    floor,
                });
            }
        }

        if let TerminationCondition::BlanketDepth { depth } = self.termination
            && !(depth >= roof && depth <= floor)
        {
            return Err(ConfigurationError::DepthOutOfRange {
                name: format!("stage {} target blanket", index),
                depth,
                roof,
                floor,
            });
        }

        if !(self.injection_salinity >= 0.0 && self.injection_salinity <= brine.saturation) {
            return Err(ConfigurationError::SalinityOutOfRange {
                field: "injection",
                value: self.injection_salinity,
                saturation: brine.saturation,
            });
        }

        Ok(())
    }
}

/// Flow rates and string depths currently applied to the cavern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub stage: usize,
    pub kind: StageKind,
    pub injection_rate: f64,
    pub fill_rate: f64,
    pub withdrawal_rate: f64,
    pub injection_depth: f64,
    pub production_depth: f64,
    pub injection_salinity: f64,
}

impl OperatingPoint {
    pub fn from_stage(index: usize, stage: &StageDefinition) -> Self {
        Self {
            stage: index,
            kind: stage.kind,
            injection_rate: stage.injection_rate,
            fill_rate: stage.fill_rate,
            withdrawal_rate: stage.withdrawal_rate,
            injection_depth: stage.injection_depth,
            production_depth: stage.production_depth,
            injection_salinity: stage.injection_salinity,
        }
    }

    /// Depth of the deeper string
    pub fn deepest_string(&self) -> f64 {
        self.injection_depth.max(self.production_depth)
    }

    /// Depth interval swept by the circulation between the two strings
    pub fn circulation_interval(&self) -> (f64, f64) {
        (
            self.injection_depth.min(self.production_depth),
            self.injection_depth.max(self.production_depth),
        )
    }

    /// Volumetric flow along the wall in the circulation interval \[m³/h\]
    pub fn circulation_rate(&self) -> f64 {
        (self.injection_rate + self.fill_rate).max(self.withdrawal_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn leach(rate: f64) -> StageDefinition {
        StageDefinition {
            name: None,
            kind: StageKind::Leach,
            injection_rate: rate,
            fill_rate: 0.0,
            withdrawal_rate: rate,
            injection_depth: 590.0,
            production_depth: 520.0,
            injection_salinity: 0.0,
            termination: TerminationCondition::Duration { duration: 48.0 },
        }
    }

    #[test]
    fn test_valid_leach_stage() {
        let stage = leach(50.0);
        assert!(stage.validate(0, 500.0, 600.0, &BrineProperties::default()).is_ok());
    }

    #[test]
    fn test_rate_inconsistent_with_kind() {
        let stage = StageDefinition { fill_rate: 5.0, ..leach(50.0) };
        assert!(matches!(
            stage.validate(0, 500.0, 600.0, &BrineProperties::default()),
            Err(ConfigurationError::RateMismatch { stage: 0, .. })
        ));

        let idle = StageDefinition { kind: StageKind::Idle, ..leach(50.0) };
        assert!(idle.validate(1, 500.0, 600.0, &BrineProperties::default()).is_err());
    }

    #[test]
    fn test_zero_target() {
        let stage = StageDefinition {
            termination: TerminationCondition::Duration { duration: 0.0 },
            ..leach(50.0)
        };
        assert!(matches!(
            stage.validate(2, 500.0, 600.0, &BrineProperties::default()),
            Err(ConfigurationError::ZeroTarget { stage: 2, .. })
        ));
    }

    #[test]
    fn test_string_outside_cavern() {
        let stage = StageDefinition { injection_depth: 650.0, ..leach(50.0) };
        assert!(matches!(
            stage.validate(0, 500.0, 600.0, &BrineProperties::default()),
            Err(ConfigurationError::DepthOutOfRange { .. })
        ));
    }

    #[test]
    fn test_normalization_to_internal_units() {
        let stage = StageDefinition {
            injection_rate: 2400.0,
            withdrawal_rate: 2400.0,
            injection_depth: 2000.0,
            production_depth: 1800.0,
            termination: TerminationCondition::Duration { duration: 2.0 },
            ..leach(0.0)
        };
        let internal = stage.normalized(&UnitSystem::oilfield());

        // 2400 bbl/d = 100 bbl/h
        assert_abs_diff_eq!(internal.injection_rate, 100.0 * 0.158987294928, epsilon = 1e-9);
        assert_abs_diff_eq!(internal.injection_depth, 609.6, epsilon = 1e-9);
        assert_eq!(internal.termination, TerminationCondition::Duration { duration: 48.0 });
    }

    #[test]
    fn test_operating_point() {
        let point = OperatingPoint::from_stage(3, &leach(50.0));
        assert_eq!(point.stage, 3);
        assert_eq!(point.deepest_string(), 590.0);
        assert_eq!(point.circulation_interval(), (520.0, 590.0));
        assert_eq!(point.circulation_rate(), 50.0);
    }
}
