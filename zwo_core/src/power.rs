//! Unit normalization: power expressions to FTP ratios, minutes to seconds.
//!
//! Every power that reaches a [`Block`](crate::Block) has been converted here
//! exactly once, so downstream code only ever sees [`Power`] ratios.

use crate::{Error, Power, Result, Zone};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A power target as written in a plan document
///
/// Accepted shapes: a bare ratio (`0.75`), a zone name (`"z3"`), a
/// `{pct: 88}` or `{watts: 250}` map, or a two-element list of any of those.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PowerValue {
    Ratio(f64),
    Named(String),
    Pair(Vec<PowerValue>),
    Keyed(BTreeMap<String, serde_json::Value>),
}

impl From<f64> for PowerValue {
    fn from(v: f64) -> Self {
        PowerValue::Ratio(v)
    }
}

impl From<&str> for PowerValue {
    fn from(v: &str) -> Self {
        PowerValue::Named(v.to_string())
    }
}

/// Resolve a power expression into a ratio of FTP
///
/// Returns `Ok(None)` when no value was given. A two-element list always
/// yields [`Power::Range`]; every other shape yields [`Power::Fixed`].
pub fn power_to_ratio(
    value: Option<&PowerValue>,
    ftp: Option<f64>,
    field: &str,
) -> Result<Option<Power>> {
    let Some(value) = value else {
        return Ok(None);
    };

    match value {
        PowerValue::Pair(sides) => match sides.as_slice() {
            [low, high] => {
                let low = single_ratio(low, ftp, field)?;
                let high = single_ratio(high, ftp, field)?;
                Ok(Some(Power::Range { low, high }))
            }
            _ => Err(Error::input(format!(
                "Power range for {} must have exactly two values, got {}",
                field,
                sides.len()
            ))),
        },
        other => Ok(Some(Power::Fixed(single_ratio(other, ftp, field)?))),
    }
}

/// One side of a power expression; a nested range contributes its low bound
///
/// The resolved ratio must be strictly positive.
fn single_ratio(value: &PowerValue, ftp: Option<f64>, field: &str) -> Result<f64> {
    let ratio = match value {
        PowerValue::Ratio(v) => *v,
        PowerValue::Named(name) => name
            .parse::<Zone>()
            .map(Zone::ratio)
            .map_err(|_| Error::input(format!("Unsupported power string for {}: {}", field, name)))?,
        PowerValue::Keyed(map) => keyed_ratio(map, ftp, field)?,
        PowerValue::Pair(_) => power_to_ratio(Some(value), ftp, field)?
            .map(|p| p.low())
            .ok_or_else(|| Error::input(format!("{} is required", field)))?,
    };
    if ratio <= 0.0 {
        return Err(Error::input(format!(
            "Power for {} must be positive, got {}",
            field, ratio
        )));
    }
    Ok(ratio)
}

/// `{pct: N}` or `{watts: N}`; other keys alongside are ignored
fn keyed_ratio(map: &BTreeMap<String, serde_json::Value>, ftp: Option<f64>, field: &str) -> Result<f64> {
    let number = |key: &str| map.get(key).map(serde_json::Value::as_f64);
    match (number("pct"), number("watts")) {
        (Some(Some(pct)), _) => Ok(pct / 100.0),
        (None, Some(Some(watts))) => watts_to_ratio(watts, ftp, field),
        _ => {
            let shown: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            Err(Error::input(format!(
                "Unsupported power dict for {}: {{{}}}",
                field,
                shown.join(", ")
            )))
        }
    }
}

/// Absolute watts as a fraction of FTP; a missing or zero FTP is an error
pub fn watts_to_ratio(watts: f64, ftp: Option<f64>, field: &str) -> Result<f64> {
    match ftp {
        Some(ftp) if ftp != 0.0 => Ok(watts / ftp),
        _ => Err(Error::input(format!("FTP required for watts in {}", field))),
    }
}

/// Duration in whole seconds from optional minutes and seconds
///
/// Minutes win when they resolve to a non-zero value (`round(minutes * 60)`,
/// ties to even); otherwise seconds are used, truncated. The result may be
/// zero or negative; callers decide whether that is acceptable.
pub fn duration_seconds(minutes: Option<f64>, seconds: Option<f64>) -> i64 {
    let from_minutes = minutes
        .map(|m| (m * 60.0).round_ties_even() as i64)
        .unwrap_or(0);
    if from_minutes != 0 {
        return from_minutes;
    }
    seconds.map(|s| s.trunc() as i64).unwrap_or(0)
}

/// A strictly positive duration, or an error naming the block kind
pub fn require_duration(seconds: i64, kind: &str) -> Result<u32> {
    if seconds <= 0 {
        return Err(Error::input(format!("{} requires minutes or seconds", kind)));
    }
    u32::try_from(seconds)
        .map_err(|_| Error::input(format!("{} duration out of range: {}s", kind, seconds)))
}
