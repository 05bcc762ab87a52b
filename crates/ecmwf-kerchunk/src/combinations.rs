//! ECMWF open-data product vocabulary and the table of valid
//! `(format, type, reference_time, stream, step)` combinations.
//!
//! Combinations sharing an [`AssetKey`] are sibling files of one item; the
//! table order keeps siblings adjacent.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::{KerchunkError, Result};

/// Model run times (UTC hour).
pub const REFERENCE_TIMES: &[&str] = &["00", "06", "12", "18"];

/// Forecasting systems.
pub const STREAMS: &[&str] = &["oper", "enfo", "waef", "scda", "scwv", "mmsf", "wave"];

/// Product types: forecast, ensemble forecast, ensemble probabilities, tropical cyclone tracks.
pub const TYPES: &[&str] = &["fc", "ef", "ep", "tf"];

pub const FORMATS: &[&str] = &["grib2", "bufr"];

/// Pressure levels (hPa) published for upper-air fields.
pub const PRESSURE_LEVELS: &[u32] = &[1000, 925, 850, 700, 500, 300, 250, 200, 50];

/// Unit of a forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepUnit {
    Hours,
    Months,
}

impl StepUnit {
    pub fn suffix(&self) -> char {
        match self {
            Self::Hours => 'h',
            Self::Months => 'm',
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StepParseError {
    #[error("Invalid step: {0}")]
    InvalidFormat(String),
}

/// A forecast step such as `144h` or `3m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Step {
    pub unit: StepUnit,
    pub value: u32,
}

impl Step {
    pub fn hours(value: u32) -> Self {
        Self {
            unit: StepUnit::Hours,
            value,
        }
    }

    pub fn months(value: u32) -> Self {
        Self {
            unit: StepUnit::Months,
            value,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for Step {
    type Err = StepParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || StepParseError::InvalidFormat(s.to_string());
        let (digits, unit) = match s.char_indices().last() {
            Some((i, 'h')) => (&s[..i], StepUnit::Hours),
            Some((i, 'm')) => (&s[..i], StepUnit::Months),
            _ => return Err(invalid()),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value = digits.parse().map_err(|_| invalid())?;
        Ok(Self { unit, value })
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn hour_steps(range: impl Iterator<Item = u32>) -> impl Iterator<Item = Step> {
    range.map(Step::hours)
}

/// Every published step: `0h..141h` by 3, `144h..360h` by 6, `1m..7m`.
pub fn steps() -> Vec<Step> {
    hour_steps((0..144).step_by(3))
        .chain(hour_steps((144..=360).step_by(6)))
        .chain((1..=7).map(Step::months))
        .collect()
}

/// One published file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Combination {
    pub format: &'static str,
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub reference_time: &'static str,
    pub stream: &'static str,
    pub step: Step,
}

/// `(format, type, reference_time, stream)`: the combination minus its step.
pub type AssetKey = (&'static str, &'static str, &'static str, &'static str);

impl Combination {
    pub fn asset_key(&self) -> AssetKey {
        (self.format, self.type_, self.reference_time, self.stream)
    }
}

/// Steps published for a `(reference_time, stream, type)` triple.
fn rule_steps(reference_time: &str, stream: &str, type_: &str) -> Vec<Step> {
    match (reference_time, stream, type_) {
        ("00" | "12", "enfo" | "waef", "ef") => hour_steps((0..144).step_by(3))
            .chain(hour_steps((144..=360).step_by(6)))
            .collect(),
        ("00" | "12", "enfo" | "waef", "ep") => vec![Step::hours(240), Step::hours(360)],
        ("00" | "12", "oper" | "wave", "fc") => hour_steps((0..144).step_by(3))
            .chain(hour_steps((144..=240).step_by(6)))
            .collect(),
        ("06" | "18", "enfo" | "waef", "ef") => hour_steps((0..=144).step_by(3)).collect(),
        ("06" | "18", "scda" | "scwv", "fc") => hour_steps((0..=90).step_by(3)).collect(),
        ("00", "mmsf", "fc") => (1..=7).map(Step::months).collect(),
        _ => Vec::new(),
    }
}

fn build_combinations(format: &'static str) -> Vec<Combination> {
    let mut combinations = Vec::new();
    for &reference_time in REFERENCE_TIMES {
        for &stream in STREAMS {
            for &type_ in TYPES {
                combinations.extend(rule_steps(reference_time, stream, type_).into_iter().map(
                    |step| Combination {
                        format,
                        type_,
                        reference_time,
                        stream,
                        step,
                    },
                ));
            }
        }
    }
    combinations
}

static GRIB2_COMBINATIONS: Lazy<Vec<Combination>> = Lazy::new(|| {
    let combinations = build_combinations("grib2");
    debug!(count = combinations.len(), "Built grib2 combination table");
    combinations
});

/// All valid combinations for `format`, in table order.
///
/// The table is built once per process. Only `grib2` is supported.
pub fn get_combinations(format: &str) -> Result<&'static [Combination]> {
    match format {
        "grib2" => Ok(GRIB2_COMBINATIONS.as_slice()),
        other => Err(KerchunkError::UnsupportedFormat(other.to_string())),
    }
}

/// Group adjacent combinations by [`AssetKey`].
pub fn group_by_asset(combinations: &[Combination]) -> Vec<(AssetKey, Vec<Combination>)> {
    let mut groups: Vec<(AssetKey, Vec<Combination>)> = Vec::new();
    for combination in combinations {
        let key = combination.asset_key();
        if let Some((last, members)) = groups.last_mut() {
            if *last == key {
                members.push(*combination);
                continue;
            }
        }
        groups.push((key, vec![*combination]));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_display_and_parse() {
        assert_eq!(Step::hours(144).to_string(), "144h");
        assert_eq!(Step::months(3).to_string(), "3m");
        assert_eq!("0h".parse::<Step>().unwrap(), Step::hours(0));
        assert_eq!("7m".parse::<Step>().unwrap(), Step::months(7));
        for bad in ["", "h", "12", "12d", "-3h", "3 h"] {
            assert!(bad.parse::<Step>().is_err(), "parsed {:?}", bad);
        }
    }

    #[test]
    fn test_steps_vocabulary() {
        let steps = steps();
        assert_eq!(steps.len(), 48 + 37 + 7);
        assert_eq!(steps[0], Step::hours(0));
        assert_eq!(steps[47], Step::hours(141));
        assert_eq!(steps[48], Step::hours(144));
        assert_eq!(steps[84], Step::hours(360));
        assert_eq!(steps[91], Step::months(7));
    }

    #[test]
    fn test_rule_table_sizes() {
        assert_eq!(rule_steps("00", "enfo", "ef").len(), 85);
        assert_eq!(rule_steps("12", "waef", "ep").len(), 2);
        assert_eq!(rule_steps("00", "oper", "fc").len(), 65);
        assert_eq!(rule_steps("18", "waef", "ef").len(), 49);
        assert_eq!(rule_steps("06", "scda", "fc").len(), 31);
        assert_eq!(rule_steps("00", "mmsf", "fc").len(), 7);
        assert!(rule_steps("12", "mmsf", "fc").is_empty());
        assert!(rule_steps("06", "oper", "fc").is_empty());
        assert!(rule_steps("00", "enfo", "tf").is_empty());
    }

    #[test]
    fn test_unsupported_format() {
        assert_eq!(
            get_combinations("bufr").unwrap_err(),
            KerchunkError::UnsupportedFormat("bufr".to_string())
        );
    }

    #[test]
    fn test_group_by_asset_keeps_runs() {
        let combos = get_combinations("grib2").unwrap();
        let groups = group_by_asset(combos);

        let total: usize = groups.iter().map(|(_, members)| members.len()).sum();
        assert_eq!(total, combos.len());
        assert_eq!(groups[0].0, ("grib2", "fc", "00", "oper"));
        assert_eq!(groups[0].1.len(), 65);
    }

    #[test]
    fn test_combination_serializes_type_field() {
        let combination = get_combinations("grib2").unwrap()[0];
        let value = serde_json::to_value(combination).unwrap();
        assert_eq!(value["type"], "fc");
        assert_eq!(value["step"], "0h");
    }
}
