//! Unit codes and conversion to internal units
//!
//! Internally every quantity is expressed in:
//!
//! | Quantity  | Internal unit |
//! |-----------|---------------|
//! | Length    | m             |
//! | Volume    | m³            |
//! | Flow rate | m³/h          |
//! | Duration  | h             |
//!
//! Scenarios are often written in field units (feet, barrels, barrels per
//! day). Each unit carries a UCUM-style code (`[ft_i]`, `[bbl_us]/d`, ...)
//! used in configuration files, and a factor converting one unit into the
//! internal unit.
//!
//! # Example
//!
//! ```rust
//! use leach_rs::units::{FlowUnit, LengthUnit, Unit};
//!
//! let depth: LengthUnit = "[ft_i]".parse().unwrap();
//! assert!((depth.to_internal(1000.0) - 304.8).abs() < 1e-9);
//!
//! let rate: FlowUnit = "[bbl_us]/d".parse().unwrap();
//! assert!((rate.to_internal(24.0) - 0.158987294928).abs() < 1e-12);
//! ```

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BARREL_M3: f64 = 0.158_987_294_928;

/// Common behaviour of unit enumerations
pub trait Unit: Copy + Sized + 'static {
    /// Every unit of this kind
    const ALL: &'static [Self];
    /// Kind name used in error messages
    const KIND: &'static str;

    /// Configuration code
    fn code(&self) -> &'static str;

    /// Long name, accepted by `FromStr` as well as the code
    fn name(&self) -> &'static str;

    /// Multiplier from this unit into the internal unit
    fn factor(&self) -> f64;

    fn to_internal(&self, value: f64) -> f64 {
        value * self.factor()
    }

    fn from_internal(&self, value: f64) -> f64 {
        value / self.factor()
    }
}

fn parse_unit<U: Unit>(text: &str) -> Result<U, ConfigurationError> {
    let trimmed = text.trim();
    U::ALL
        .iter()
        .find(|unit| unit.code() == trimmed || unit.name().eq_ignore_ascii_case(trimmed))
        .copied()
        .ok_or_else(|| ConfigurationError::UnknownUnit {
            kind: U::KIND,
            code: trimmed.to_string(),
        })
}

// =================================================================================================
// Length
// =================================================================================================

/// Depth and radius units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "[in_i]")]
    Inch,
    #[serde(rename = "[ft_i]")]
    Foot,
    #[serde(rename = "[ft_us]")]
    SurveyFoot,
    #[default]
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "cm")]
    Centimeter,
    #[serde(rename = "mm")]
    Millimeter,
}

impl Unit for LengthUnit {
    const ALL: &'static [Self] = &[
        Self::Inch,
        Self::Foot,
        Self::SurveyFoot,
        Self::Meter,
        Self::Centimeter,
        Self::Millimeter,
    ];
    const KIND: &'static str = "length";

    fn code(&self) -> &'static str {
        match self {
            Self::Inch => "[in_i]",
            Self::Foot => "[ft_i]",
            Self::SurveyFoot => "[ft_us]",
            Self::Meter => "m",
            Self::Centimeter => "cm",
            Self::Millimeter => "mm",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Inch => "inch",
            Self::Foot => "foot",
            Self::SurveyFoot => "survey_foot",
            Self::Meter => "meter",
            Self::Centimeter => "centimeter",
            Self::Millimeter => "millimeter",
        }
    }

    fn factor(&self) -> f64 {
        match self {
            Self::Inch => 0.0254,
            Self::Foot => 0.3048,
            Self::SurveyFoot => 1200.0 / 3937.0,
            Self::Meter => 1.0,
            Self::Centimeter => 0.01,
            Self::Millimeter => 0.001,
        }
    }
}

// =================================================================================================
// Volume
// =================================================================================================

/// Volume units (targets, initial inventories)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VolumeUnit {
    #[default]
    #[serde(rename = "m3")]
    CubicMeter,
    #[serde(rename = "L")]
    Liter,
    #[serde(rename = "[cft_i]")]
    CubicFoot,
    #[serde(rename = "[bbl_us]")]
    Barrel,
    #[serde(rename = "10^3.[bbl_us]")]
    ThousandBarrels,
    #[serde(rename = "10^6.[bbl_us]")]
    MillionBarrels,
}

impl Unit for VolumeUnit {
    const ALL: &'static [Self] = &[
        Self::CubicMeter,
        Self::Liter,
        Self::CubicFoot,
        Self::Barrel,
        Self::ThousandBarrels,
        Self::MillionBarrels,
    ];
    const KIND: &'static str = "volume";

    fn code(&self) -> &'static str {
        match self {
            Self::CubicMeter => "m3",
            Self::Liter => "L",
            Self::CubicFoot => "[cft_i]",
            Self::Barrel => "[bbl_us]",
            Self::ThousandBarrels => "10^3.[bbl_us]",
            Self::MillionBarrels => "10^6.[bbl_us]",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::CubicMeter => "cubic_meter",
            Self::Liter => "liter",
            Self::CubicFoot => "cubic_foot",
            Self::Barrel => "barrel",
            Self::ThousandBarrels => "thousand_barrels",
            Self::MillionBarrels => "million_barrels",
        }
    }

    fn factor(&self) -> f64 {
        match self {
            Self::CubicMeter => 1.0,
            Self::Liter => 1e-3,
            Self::CubicFoot => 0.028_316_846_592,
            Self::Barrel => BARREL_M3,
            Self::ThousandBarrels => BARREL_M3 * 1e3,
            Self::MillionBarrels => BARREL_M3 * 1e6,
        }
    }
}

// =================================================================================================
// Flow rate
// =================================================================================================

/// Injection, fill and withdrawal rate units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlowUnit {
    #[serde(rename = "[bbl_us]/d")]
    BarrelsPerDay,
    #[serde(rename = "[bbl_us]/h")]
    BarrelsPerHour,
    #[serde(rename = "[bbl_us]/min")]
    BarrelsPerMinute,
    #[serde(rename = "m3/d")]
    CubicMetersPerDay,
    #[default]
    #[serde(rename = "m3/h")]
    CubicMetersPerHour,
    #[serde(rename = "m3/min")]
    CubicMetersPerMinute,
}

impl Unit for FlowUnit {
    const ALL: &'static [Self] = &[
        Self::BarrelsPerDay,
        Self::BarrelsPerHour,
        Self::BarrelsPerMinute,
        Self::CubicMetersPerDay,
        Self::CubicMetersPerHour,
        Self::CubicMetersPerMinute,
    ];
    const KIND: &'static str = "flow";

    fn code(&self) -> &'static str {
        match self {
            Self::BarrelsPerDay => "[bbl_us]/d",
            Self::BarrelsPerHour => "[bbl_us]/h",
            Self::BarrelsPerMinute => "[bbl_us]/min",
            Self::CubicMetersPerDay => "m3/d",
            Self::CubicMetersPerHour => "m3/h",
            Self::CubicMetersPerMinute => "m3/min",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::BarrelsPerDay => "barrels_per_day",
            Self::BarrelsPerHour => "barrels_per_hour",
            Self::BarrelsPerMinute => "barrels_per_minute",
            Self::CubicMetersPerDay => "cubic_meters_per_day",
            Self::CubicMetersPerHour => "cubic_meters_per_hour",
            Self::CubicMetersPerMinute => "cubic_meters_per_minute",
        }
    }

    fn factor(&self) -> f64 {
        match self {
            Self::BarrelsPerDay => BARREL_M3 / 24.0,
            Self::BarrelsPerHour => BARREL_M3,
            Self::BarrelsPerMinute => BARREL_M3 * 60.0,
            Self::CubicMetersPerDay => 1.0 / 24.0,
            Self::CubicMetersPerHour => 1.0,
            Self::CubicMetersPerMinute => 60.0,
        }
    }
}

// =================================================================================================
// Duration
// =================================================================================================

/// Stage duration units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DurationUnit {
    #[serde(rename = "s")]
    Second,
    #[serde(rename = "min")]
    Minute,
    #[default]
    #[serde(rename = "h")]
    Hour,
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "wk")]
    Week,
    /// Mean Julian month
    #[serde(rename = "mo_j")]
    Month,
    /// Julian year
    #[serde(rename = "a_j")]
    Year,
}

impl Unit for DurationUnit {
    const ALL: &'static [Self] = &[
        Self::Second,
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::Week,
        Self::Month,
        Self::Year,
    ];
    const KIND: &'static str = "duration";

    fn code(&self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "min",
            Self::Hour => "h",
            Self::Day => "d",
            Self::Week => "wk",
            Self::Month => "mo_j",
            Self::Year => "a_j",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    fn factor(&self) -> f64 {
        match self {
            Self::Second => 1.0 / 3600.0,
            Self::Minute => 1.0 / 60.0,
            Self::Hour => 1.0,
            Self::Day => 24.0,
            Self::Week => 168.0,
            Self::Month => 730.5,
            Self::Year => 8766.0,
        }
    }
}

macro_rules! impl_unit_text {
    ($($unit:ty),*) => {
        $(
            impl FromStr for $unit {
                type Err = ConfigurationError;

                fn from_str(text: &str) -> Result<Self, Self::Err> {
                    parse_unit(text)
                }
            }

            impl fmt::Display for $unit {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.code())
                }
            }
        )*
    };
}

impl_unit_text!(LengthUnit, VolumeUnit, FlowUnit, DurationUnit);

// =================================================================================================
// Unit system
// =================================================================================================

/// Units in which a scenario is written
///
/// The default is the internal system, for which conversion is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitSystem {
    #[serde(default)]
    pub length: LengthUnit,
    #[serde(default)]
    pub volume: VolumeUnit,
    #[serde(default)]
    pub flow: FlowUnit,
    #[serde(default)]
    pub duration: DurationUnit,
}

impl UnitSystem {
    /// Feet, barrels, barrels per day and days
    pub fn oilfield() -> Self {
        Self {
            length: LengthUnit::Foot,
            volume: VolumeUnit::Barrel,
            flow: FlowUnit::BarrelsPerDay,
            duration: DurationUnit::Day,
        }
    }

    /// Whether conversion to internal units is the identity
    pub fn is_internal(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parse_code_and_name() {
        assert_eq!("[ft_i]".parse::<LengthUnit>().unwrap(), LengthUnit::Foot);
        assert_eq!("Foot".parse::<LengthUnit>().unwrap(), LengthUnit::Foot);
        assert_eq!("mo_j".parse::<DurationUnit>().unwrap(), DurationUnit::Month);
        assert_eq!(
            "10^6.[bbl_us]".parse::<VolumeUnit>().unwrap(),
            VolumeUnit::MillionBarrels
        );
    }

    #[test]
    fn test_unknown_code() {
        let err = "furlong".parse::<LengthUnit>().unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownUnit { kind: "length", code: "furlong".to_string() }
        );
    }

    #[test]
    fn test_display_is_code() {
        assert_eq!(FlowUnit::BarrelsPerDay.to_string(), "[bbl_us]/d");
        assert_eq!(DurationUnit::Year.to_string(), "a_j");
    }

    #[test]
    fn test_round_trip_conversion() {
        for unit in LengthUnit::ALL {
            let value = 1234.5;
            assert_abs_diff_eq!(unit.from_internal(unit.to_internal(value)), value, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_known_factors() {
        assert_abs_diff_eq!(DurationUnit::Year.to_internal(1.0), 365.25 * 24.0, epsilon = 1e-9);
        assert_abs_diff_eq!(FlowUnit::CubicMetersPerDay.to_internal(24.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(VolumeUnit::MillionBarrels.to_internal(1.0), 158_987.294_928, epsilon = 1e-6);
        assert_abs_diff_eq!(LengthUnit::SurveyFoot.to_internal(3937.0), 1200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_default_system_is_internal() {
        assert!(UnitSystem::default().is_internal());
        assert!(!UnitSystem::oilfield().is_internal());
    }
}
