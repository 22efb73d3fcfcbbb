//! Free-text workout builder.
//!
//! Turns a plain description such as `"1 hour, 6x3' @105-110% 3' rbi"` into a
//! [`WorkoutDocument`]:
//! - Extract facts from the text
//! - Resolve the duration budget around the intervals
//! - Lay out warmup, base, intervals, sets and cooldown in that order

use crate::budget::{self, BudgetInput};
use crate::config::DefaultsConfig;
use crate::extract::{WorkoutText, INTERVAL_OFF_POWER};
use crate::{Block, ExtractedBlock, Result, WorkoutDocument};

/// Build a workout document from a free-text description
///
/// The description becomes the document description verbatim. Sport, tags
/// and author come from `defaults`.
pub fn build_workout(text: &str, name: &str, defaults: &DefaultsConfig) -> Result<WorkoutDocument> {
    let parsed = WorkoutText::parse(text)?;
    let budget = budget::resolve(&BudgetInput {
        total_minutes: parsed.total_minutes,
        cooldown_minutes: parsed.cooldown_minutes,
        zone: parsed.zone,
        tss: parsed.tss,
        blocks: &parsed.blocks,
    })?;

    let mut blocks = budget.warmup.clone();
    blocks.extend(budget.base_block());
    blocks.extend(layout_intervals(&parsed.blocks));
    blocks.push(budget::cooldown_block(budget.cooldown_seconds));

    tracing::info!(
        "Built '{}': {} blocks, {}s",
        name,
        blocks.len(),
        blocks.iter().map(Block::duration_seconds).sum::<u64>()
    );

    Ok(WorkoutDocument {
        author: defaults.author.clone(),
        name: name.to_string(),
        description: parsed.raw,
        sport: defaults.sport.clone(),
        tags: defaults.tags.clone(),
        blocks,
    })
}

/// Simple intervals first, then every set unrolled
///
/// Each repetition of a set is its interval block followed by a steady rest.
fn layout_intervals(extracted: &[ExtractedBlock]) -> Vec<Block> {
    let mut intervals = Vec::new();
    let mut sets = Vec::new();
    for block in extracted {
        match block {
            ExtractedBlock::Intervals(segment) => intervals.push(Block::Intervals(segment.clone())),
            ExtractedBlock::Set(set) => {
                for _ in 0..set.repeat {
                    sets.push(Block::Intervals(set.interval.clone()));
                    sets.push(Block::steady(set.rest_between_sets, INTERVAL_OFF_POWER));
                }
            }
        }
    }
    intervals.extend(sets);
    intervals
}
