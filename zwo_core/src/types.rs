//! Core domain types for the workout compiler.
//!
//! This module defines the fundamental types used throughout the system:
//! - Training zones and resolved power targets
//! - Terminal workout blocks (the flat, emitted segment list)
//! - Intermediate interval/set records produced by text extraction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Power Types
// ============================================================================

/// Ordinal training-intensity band with a fixed power ratio
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Z1,
    Z2,
    Z3,
    Z4,
    Z5,
    Z6,
}

impl Zone {
    pub const ALL: [Zone; 6] = [Zone::Z1, Zone::Z2, Zone::Z3, Zone::Z4, Zone::Z5, Zone::Z6];

    /// Power as a fraction of FTP
    pub fn ratio(self) -> f64 {
        match self {
            Zone::Z1 => 0.55,
            Zone::Z2 => 0.65,
            Zone::Z3 => 0.75,
            Zone::Z4 => 0.90,
            Zone::Z5 => 1.05,
            Zone::Z6 => 1.20,
        }
    }
}

impl FromStr for Zone {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "z1" => Ok(Zone::Z1),
            "z2" => Ok(Zone::Z2),
            "z3" => Ok(Zone::Z3),
            "z4" => Ok(Zone::Z4),
            "z5" => Ok(Zone::Z5),
            "z6" => Ok(Zone::Z6),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = Zone::ALL.iter().position(|z| z == self).unwrap_or(0) + 1;
        write!(f, "z{}", n)
    }
}

/// A power target already expressed as a ratio of FTP
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    Fixed(f64),
    Range { low: f64, high: f64 },
}

impl Power {
    /// Lower bound, or the fixed value
    pub fn low(&self) -> f64 {
        match *self {
            Power::Fixed(v) => v,
            Power::Range { low, .. } => low,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Power::Range { .. })
    }
}

// ============================================================================
// Block Types
// ============================================================================

/// Linear power change over a duration (warmup, cooldown, ramp)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RampSegment {
    pub duration: u32,
    pub power_low: f64,
    pub power_high: f64,
    pub cadence: Option<u32>,
}

/// Repeating on/off efforts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntervalSegment {
    pub repeat: u32,
    pub on_duration: u32,
    pub off_duration: u32,
    pub on_power: Option<Power>,
    pub off_power: Option<Power>,
    pub cadence: Option<u32>,
    pub cadence_resting: Option<u32>,
}

impl IntervalSegment {
    /// Seconds spent across every repetition
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.repeat) * (u64::from(self.on_duration) + u64::from(self.off_duration))
    }
}

/// A terminal workout segment, in emission order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Warmup(RampSegment),
    Cooldown(RampSegment),
    Ramp(RampSegment),
    SteadyState {
        duration: u32,
        power: f64,
        cadence: Option<u32>,
    },
    FreeRide {
        duration: u32,
        flat_road: Option<bool>,
        cadence: Option<u32>,
    },
    Intervals(IntervalSegment),
    MaxEffort {
        duration: u32,
    },
    /// Zero-duration marker at a point in time
    TextEvent {
        time_offset: u32,
        message: String,
    },
}

impl Block {
    pub fn steady(duration: u32, power: f64) -> Self {
        Block::SteadyState {
            duration,
            power,
            cadence: None,
        }
    }

    /// Seconds this block occupies on the timeline
    pub fn duration_seconds(&self) -> u64 {
        match self {
            Block::Warmup(r) | Block::Cooldown(r) | Block::Ramp(r) => u64::from(r.duration),
            Block::SteadyState { duration, .. }
            | Block::FreeRide { duration, .. }
            | Block::MaxEffort { duration } => u64::from(*duration),
            Block::Intervals(i) => i.total_seconds(),
            Block::TextEvent { .. } => 0,
        }
    }
}

// ============================================================================
// Extracted (free-text) records
// ============================================================================

/// `S x [R x D' @.. C' rbi] E' rbs`: one interval group repeated with rests
#[derive(Clone, Debug, PartialEq)]
pub struct SetBlock {
    pub repeat: u32,
    pub interval: IntervalSegment,
    pub rest_between_sets: u32,
}

impl SetBlock {
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.repeat)
            * (self.interval.total_seconds() + u64::from(self.rest_between_sets))
    }
}

/// Interval structure recognized in a free-text description
#[derive(Clone, Debug, PartialEq)]
pub enum ExtractedBlock {
    Intervals(IntervalSegment),
    Set(SetBlock),
}

impl ExtractedBlock {
    pub fn total_seconds(&self) -> u64 {
        match self {
            ExtractedBlock::Intervals(i) => i.total_seconds(),
            ExtractedBlock::Set(s) => s.total_seconds(),
        }
    }
}
