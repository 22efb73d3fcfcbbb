//! Duration budget for free-text workouts.
//!
//! Fits the fixed warmup, the extracted intervals and the cooldown into the
//! stated total, and fills whatever time remains with a steady base segment.

use crate::{Block, Error, ExtractedBlock, RampSegment, Result, Zone};

pub const STANDARD_COOLDOWN_SECONDS: u32 = 600;
pub const MIN_COOLDOWN_SECONDS: u32 = 300;
pub const DEFAULT_BASE_POWER: f64 = 0.65;

/// Workouts shorter than this get the 300s warmup ramp
const SHORT_WORKOUT_MINUTES: u32 = 45;

const WARMUP_LONG_SECONDS: u32 = 600;
const WARMUP_SHORT_SECONDS: u32 = 300;

/// The fixed 5-segment warmup: ramp, then two spin-up/settle pairs
pub fn standard_warmup(short: bool) -> Vec<Block> {
    let ramp = if short {
        WARMUP_SHORT_SECONDS
    } else {
        WARMUP_LONG_SECONDS
    };
    let spin_up = || Block::FreeRide {
        duration: 60,
        flat_road: Some(true),
        cadence: Some(110),
    };

    vec![
        Block::Warmup(RampSegment {
            duration: ramp,
            power_low: 0.5,
            power_high: 0.77,
            cadence: None,
        }),
        spin_up(),
        Block::steady(60, 0.5),
        spin_up(),
        Block::steady(60, 0.5),
    ]
}

pub fn cooldown_block(seconds: u32) -> Block {
    Block::Cooldown(RampSegment {
        duration: seconds,
        power_low: 0.65,
        power_high: 0.45,
        cadence: None,
    })
}

/// Intensity factor implied by a TSS target over a duration
///
/// `sqrt(tss * 3600 / (seconds * 100))`, clamped to [0.45, 1.10].
pub fn tss_to_intensity(tss: f64, duration_seconds: u32) -> f64 {
    if duration_seconds == 0 {
        return DEFAULT_BASE_POWER;
    }
    let intensity = ((tss * 3600.0) / (f64::from(duration_seconds) * 100.0)).sqrt();
    intensity.clamp(0.45, 1.1)
}

/// Seconds used by every interval and set block
pub fn interval_seconds(blocks: &[ExtractedBlock]) -> u64 {
    blocks.iter().map(ExtractedBlock::total_seconds).sum()
}

/// Time left for the base segment; negative when the budget is overdrawn
pub fn base_seconds(total: u32, warmup: u64, cooldown: u32, intervals: u64) -> i64 {
    i64::from(total) - warmup as i64 - i64::from(cooldown) - intervals as i64
}

/// What the resolver needs to know about a workout
#[derive(Clone, Copy, Debug, Default)]
pub struct BudgetInput<'a> {
    pub total_minutes: Option<u32>,
    pub cooldown_minutes: Option<u32>,
    pub zone: Option<Zone>,
    pub tss: Option<f64>,
    pub blocks: &'a [ExtractedBlock],
}

/// Resolved warmup, base and cooldown around the extracted intervals
#[derive(Clone, Debug, PartialEq)]
pub struct Budget {
    pub warmup: Vec<Block>,
    /// Base segment seconds; `None` when the total is unknown or nothing is left
    pub base_seconds: Option<u32>,
    pub base_power: f64,
    pub cooldown_seconds: u32,
}

impl Budget {
    pub fn base_block(&self) -> Option<Block> {
        self.base_seconds.map(|s| Block::steady(s, self.base_power))
    }
}

/// Resolve the duration budget
///
/// With a known total, an overdrawn budget is retried once with the cooldown
/// at its 300s floor; if it is still overdrawn this fails. Without a total
/// no base segment is produced and nothing is checked.
pub fn resolve(input: &BudgetInput<'_>) -> Result<Budget> {
    let short = input
        .total_minutes
        .is_some_and(|m| m < SHORT_WORKOUT_MINUTES);
    let warmup = standard_warmup(short);
    let warmup_seconds: u64 = warmup.iter().map(Block::duration_seconds).sum();

    let mut cooldown_seconds = match input.cooldown_minutes {
        Some(m) if m > 0 => m.saturating_mul(60),
        _ => STANDARD_COOLDOWN_SECONDS,
    }
    .max(MIN_COOLDOWN_SECONDS);

    let intervals = interval_seconds(input.blocks);
    let total_seconds = input.total_minutes.map(|m| m.saturating_mul(60));

    let mut base = None;
    if let Some(total) = total_seconds {
        let mut remaining = base_seconds(total, warmup_seconds, cooldown_seconds, intervals);
        if remaining < 0 {
            tracing::debug!(
                remaining,
                "Budget overdrawn, retrying with {}s cooldown",
                MIN_COOLDOWN_SECONDS
            );
            cooldown_seconds = MIN_COOLDOWN_SECONDS;
            remaining = base_seconds(total, warmup_seconds, cooldown_seconds, intervals);
        }
        if remaining < 0 {
            return Err(Error::Budget(format!(
                "Not enough time for warmup/intervals/cooldown: {}s total, {}s needed",
                total,
                warmup_seconds + u64::from(cooldown_seconds) + intervals
            )));
        }
        base = u32::try_from(remaining).ok().filter(|s| *s > 0);
    }

    let base_power = match (input.zone, input.tss, total_seconds) {
        (Some(zone), _, _) => zone.ratio(),
        (None, Some(tss), Some(total)) if tss > 0.0 && total > 0 => tss_to_intensity(tss, total),
        _ => DEFAULT_BASE_POWER,
    };

    tracing::debug!(
        warmup_seconds,
        intervals,
        cooldown_seconds,
        base_seconds = ?base,
        base_power,
        "Resolved duration budget"
    );

    Ok(Budget {
        warmup,
        base_seconds: base,
        base_power,
        cooldown_seconds,
    })
}
