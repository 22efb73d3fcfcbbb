//! Structured workout plans and their compilation.
//!
//! A plan is a YAML or JSON document with workout metadata and a tree of
//! blocks. Compilation unrolls every `repeat` by copying its children, runs
//! each leaf through the unit normalizer and yields a flat block list.

use crate::config::DefaultsConfig;
use crate::power::{duration_seconds, power_to_ratio, require_duration, PowerValue};
use crate::{
    budget, Block, Error, IntervalSegment, Power, RampSegment, Result, WorkoutDocument,
};
use serde::Deserialize;
use std::path::Path;

/// A workout plan as written by the user
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Plan {
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub sport: Option<String>,
    pub ftp: Option<f64>,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub blocks: Vec<PlanBlock>,
}

/// One node of the plan's block tree
///
/// Every field other than `type` is optional at parse time; which ones are
/// required depends on the kind and is checked during compilation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlanBlock {
    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub minutes: Option<f64>,
    pub seconds: Option<f64>,
    pub power: Option<PowerValue>,
    pub power_low: Option<f64>,
    pub power_high: Option<f64>,
    pub cadence: Option<f64>,
    pub flat_road: Option<FlatRoad>,

    // repeat
    pub times: Option<i64>,
    #[serde(default)]
    pub blocks: Vec<PlanBlock>,

    // intervals
    pub repeat: Option<i64>,
    pub on_minutes: Option<f64>,
    pub on_seconds: Option<f64>,
    pub off_minutes: Option<f64>,
    pub off_seconds: Option<f64>,
    pub on_power: Option<PowerValue>,
    pub off_power: Option<PowerValue>,
    pub cadence_rest: Option<f64>,

    // textevent
    pub time_offset: Option<f64>,
    pub message: Option<String>,
}

/// `flat_road` accepts `true`/`false` or `1`/`0`
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FlatRoad {
    Bool(bool),
    Int(i64),
}

impl FlatRoad {
    fn enabled(self) -> bool {
        match self {
            FlatRoad::Bool(b) => b,
            FlatRoad::Int(i) => i != 0,
        }
    }
}

/// Read a plan; `.json` files are JSON, everything else is YAML
pub fn load_plan(path: &Path) -> Result<Plan> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let plan = if is_json {
        serde_json::from_str(&text)?
    } else {
        serde_yaml::from_str(&text)?
    };
    tracing::info!("Loaded plan from {:?}", path);
    Ok(plan)
}

/// Compile a plan into a flat workout document
pub fn compile_plan(plan: &Plan, defaults: &DefaultsConfig) -> Result<WorkoutDocument> {
    let name = plan
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::input("plan.name is required"))?;

    let mut blocks = Vec::new();
    for block in &plan.blocks {
        emit_block(&mut blocks, block, plan.ftp)?;
    }
    tracing::debug!("Compiled plan '{}' into {} blocks", name, blocks.len());

    Ok(WorkoutDocument {
        author: plan.author.clone().unwrap_or_else(|| defaults.author.clone()),
        name: name.to_string(),
        description: plan.description.clone().unwrap_or_default(),
        sport: plan.sport.clone().unwrap_or_else(|| defaults.sport.clone()),
        tags: plan.tags.clone().unwrap_or_else(|| defaults.tags.clone()),
        blocks,
    })
}

fn block_duration(block: &PlanBlock, kind: &str) -> Result<u32> {
    require_duration(duration_seconds(block.minutes, block.seconds), kind)
}

fn cadence(value: Option<f64>) -> Option<u32> {
    value.map(|c| c.trunc() as u32)
}

fn require_power(value: Option<f64>, field: &str) -> Result<f64> {
    match value {
        Some(v) if v <= 0.0 => Err(Error::input(format!(
            "Power for {} must be positive, got {}",
            field, v
        ))),
        Some(v) => Ok(v),
        None => Err(Error::input(format!("{} is required", field))),
    }
}

/// Append the blocks `block` expands to
pub fn emit_block(out: &mut Vec<Block>, block: &PlanBlock, ftp: Option<f64>) -> Result<()> {
    let kind = block
        .kind
        .as_deref()
        .ok_or_else(|| Error::input("Block missing type"))?;

    match kind {
        "standard_warmup" => out.extend(budget::standard_warmup(false)),

        "repeat" => {
            let times = block.times.unwrap_or(0);
            if times <= 0 {
                return Err(Error::input("repeat.times must be > 0"));
            }
            for _ in 0..times {
                for child in &block.blocks {
                    emit_block(out, child, ftp)?;
                }
            }
        }

        "warmup" | "cooldown" | "ramp" => {
            let duration = block_duration(block, kind)?;
            let (low, high) = match power_to_ratio(block.power.as_ref(), ftp, "power")? {
                Some(Power::Range { low, high }) => (Some(low), Some(high)),
                fixed => (
                    block.power_low.or(fixed.map(|p| p.low())),
                    block.power_high,
                ),
            };
            if low.is_none() || high.is_none() {
                return Err(Error::input(format!(
                    "{} requires power_low/power_high or power range",
                    kind
                )));
            }
            let ramp = RampSegment {
                duration,
                power_low: require_power(low, "power_low")?,
                power_high: require_power(high, "power_high")?,
                cadence: cadence(block.cadence),
            };
            out.push(match kind {
                "warmup" => Block::Warmup(ramp),
                "cooldown" => Block::Cooldown(ramp),
                _ => Block::Ramp(ramp),
            });
        }

        "steadystate" => {
            let duration = block_duration(block, "steadystate")?;
            let power = power_to_ratio(block.power.as_ref(), ftp, "power")?
                .map(|p| p.low())
                .ok_or_else(|| Error::input("steadystate requires power"))?;
            out.push(Block::SteadyState {
                duration,
                power,
                cadence: cadence(block.cadence),
            });
        }

        "freeride" => {
            let duration = block_duration(block, "freeride")?;
            out.push(Block::FreeRide {
                duration,
                flat_road: block.flat_road.map(FlatRoad::enabled),
                cadence: cadence(block.cadence),
            });
        }

        "intervals" => {
            let repeat = block.repeat.unwrap_or(0);
            if repeat <= 0 {
                return Err(Error::input("intervals requires repeat"));
            }
            let on_seconds = duration_seconds(block.on_minutes, block.on_seconds);
            let off_seconds = duration_seconds(block.off_minutes, block.off_seconds);
            if on_seconds <= 0 || off_seconds <= 0 {
                return Err(Error::input("intervals requires on/off duration"));
            }
            out.push(Block::Intervals(IntervalSegment {
                repeat: u32::try_from(repeat)
                    .map_err(|_| Error::input(format!("intervals repeat out of range: {}", repeat)))?,
                on_duration: require_duration(on_seconds, "intervals")?,
                off_duration: require_duration(off_seconds, "intervals")?,
                on_power: power_to_ratio(block.on_power.as_ref(), ftp, "on_power")?,
                off_power: power_to_ratio(block.off_power.as_ref(), ftp, "off_power")?,
                cadence: cadence(block.cadence),
                cadence_resting: cadence(block.cadence_rest),
            }));
        }

        "maxeffort" => {
            let duration = block_duration(block, "maxeffort")?;
            out.push(Block::MaxEffort { duration });
        }

        "textevent" => {
            let message = block
                .message
                .as_deref()
                .filter(|m| !m.is_empty())
                .ok_or_else(|| Error::input("textevent requires message"))?;
            let offset = block.time_offset.unwrap_or(0.0).trunc();
            if offset < 0.0 {
                return Err(Error::input(format!(
                    "textevent time_offset must not be negative: {}",
                    offset
                )));
            }
            out.push(Block::TextEvent {
                time_offset: offset as u32,
                message: message.to_string(),
            });
        }

        other => return Err(Error::input(format!("Unsupported block type: {}", other))),
    }

    Ok(())
}
