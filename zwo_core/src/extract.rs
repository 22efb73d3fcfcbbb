//! Pattern extraction over free-text workout descriptions.
//!
//! Each fact (total duration, TSS, cooldown, FTP, zone, cadence, intervals)
//! comes from its own independent scan of the lower-cased text. When a
//! pattern matches more than once the last match wins, so a figure stated
//! later overrides an earlier one. The zone is the exception: the first
//! standalone `z1`..`z6` token is used.

use crate::{Error, ExtractedBlock, IntervalSegment, Power, Result, SetBlock, Zone};
use once_cell::sync::Lazy;
use regex::Regex;

/// Off-power used by both interval grammars
pub const INTERVAL_OFF_POWER: f64 = 0.5;

/// On-power used by the set grammar, which does not parse its `@` clause
pub const SET_ON_POWER: f64 = 1.05;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("extraction pattern is a valid regex")
}

static RANGE_MINUTES: Lazy<Regex> = Lazy::new(|| {
    compile(r"([0-9]+(?:\.[0-9]+)?)\s*[–-]\s*([0-9]+(?:\.[0-9]+)?)\s*(?:min|minutes|m)\b")
});
static SINGLE_MINUTES: Lazy<Regex> =
    Lazy::new(|| compile(r"\b([0-9]+(?:\.[0-9]+)?)\s*(?:min|minutes|m)\b"));
static RANGE_HOURS: Lazy<Regex> = Lazy::new(|| {
    compile(r"([0-9]+(?:\.[0-9]+)?)\s*[–-]\s*([0-9]+(?:\.[0-9]+)?)\s*(?:hour|hours|hr|h)\b")
});
static SINGLE_HOURS: Lazy<Regex> =
    Lazy::new(|| compile(r"\b([0-9]+(?:\.[0-9]+)?)\s*(?:hour|hours|hr|h)\b"));
static TSS: Lazy<Regex> = Lazy::new(|| compile(r"\btss\b[^0-9]*([0-9]+(?:\.[0-9]+)?)"));
static COOLDOWN: Lazy<Regex> = Lazy::new(|| {
    compile(r"([0-9]+(?:\.[0-9]+)?)\s*(?:min|minutes|m)\s*(?:cooldown|cool down)")
});
static FTP: Lazy<Regex> = Lazy::new(|| compile(r"\bftp\b[^0-9]*([0-9]+(?:\.[0-9]+)?)"));
static ZONE: Lazy<Regex> = Lazy::new(|| compile(r"\b(z[1-6])\b"));
static REST_CADENCE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?:rest cadence|cadence rest|rbi cadence)\s*([0-9]+)(?:\s*[–-]\s*([0-9]+))?")
});
static WORK_CADENCE: Lazy<Regex> =
    Lazy::new(|| compile(r"\bcadence\b\s*([0-9]+)(?:\s*[–-]\s*([0-9]+))?"));
static SET: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"([0-9]+)\s*[x×]\s*\[\s*([0-9]+)\s*[x×]\s*([0-9]+)\s*[′']\s*(?:@[^\]]+)?\s*([0-9]+)\s*[′']\s*rbi\s*\]\s*([0-9]+)\s*[′']\s*rbs",
    )
});
static INTERVAL: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"([0-9]+)(?:\s*[–-]\s*([0-9]+))?\s*[x×]\s*([0-9]+)\s*[′']\s*@\s*([0-9.]+)(?:\s*[–-]\s*([0-9.]+))?\s*(%|percent|w|watts)?",
    )
});

/// Work and rest cadence targets stated anywhere in the text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cadence {
    pub work: Option<u32>,
    pub rest: Option<u32>,
}

/// A free-text description and the facts extracted from it
#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutText {
    pub raw: String,
    pub total_minutes: Option<u32>,
    pub tss: Option<f64>,
    pub cooldown_minutes: Option<u32>,
    pub ftp: Option<f64>,
    pub zone: Option<Zone>,
    pub cadence: Cadence,
    pub blocks: Vec<ExtractedBlock>,
}

impl WorkoutText {
    /// Run every extractor over `raw`
    ///
    /// Missing facts are `None`. Only a malformed interval phrase is an error.
    pub fn parse(raw: &str) -> Result<Self> {
        let text = raw.to_lowercase();
        let ftp = parse_ftp(&text);
        let cadence = parse_cadence(&text);
        let blocks = parse_intervals(&text, ftp, cadence)?;

        let parsed = WorkoutText {
            raw: raw.to_string(),
            total_minutes: parse_total_minutes(&text),
            tss: parse_tss(&text),
            cooldown_minutes: parse_cooldown_minutes(&text),
            ftp,
            zone: parse_zone(&text),
            cadence,
            blocks,
        };

        tracing::debug!(
            total_minutes = ?parsed.total_minutes,
            tss = ?parsed.tss,
            cooldown_minutes = ?parsed.cooldown_minutes,
            ftp = ?parsed.ftp,
            zone = ?parsed.zone,
            blocks = parsed.blocks.len(),
            "Extracted workout facts"
        );
        Ok(parsed)
    }
}

/// Capture group `group` of the last match of `re`
fn last_capture<'t>(re: &Regex, text: &'t str, group: usize) -> Option<&'t str> {
    re.captures_iter(text)
        .last()
        .and_then(|caps| caps.get(group))
        .map(|m| m.as_str())
}

fn parse_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok()
}

fn whole(value: f64) -> u32 {
    value.trunc() as u32
}

/// Total workout length in minutes
///
/// Four phrase categories contribute independently and are summed: minute
/// range (upper bound), single minutes, hour range (upper bound) and single
/// hours. Each category uses its last match. A range is also seen by the
/// single-value category of the same unit, so "20-30 min" yields 60.
pub fn parse_total_minutes(text: &str) -> Option<u32> {
    let text = text.to_lowercase();
    let mut total: u32 = 0;

    if let Some(v) = last_capture(&RANGE_MINUTES, &text, 2).and_then(parse_f64) {
        total = total.saturating_add(whole(v));
    }
    if let Some(v) = last_capture(&SINGLE_MINUTES, &text, 1).and_then(parse_f64) {
        total = total.saturating_add(whole(v));
    }
    if let Some(v) = last_capture(&RANGE_HOURS, &text, 2).and_then(parse_f64) {
        total = total.saturating_add(whole(v * 60.0));
    }
    if let Some(v) = last_capture(&SINGLE_HOURS, &text, 1).and_then(parse_f64) {
        total = total.saturating_add(whole(v * 60.0));
    }

    (total > 0).then_some(total)
}

pub fn parse_tss(text: &str) -> Option<f64> {
    last_capture(&TSS, &text.to_lowercase(), 1).and_then(parse_f64)
}

pub fn parse_cooldown_minutes(text: &str) -> Option<u32> {
    last_capture(&COOLDOWN, &text.to_lowercase(), 1)
        .and_then(parse_f64)
        .map(whole)
}

pub fn parse_ftp(text: &str) -> Option<f64> {
    last_capture(&FTP, &text.to_lowercase(), 1).and_then(parse_f64)
}

pub fn parse_zone(text: &str) -> Option<Zone> {
    ZONE.captures(&text.to_lowercase())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Work and rest cadence; only the low bound of a range is kept
///
/// A `cadence N` that belongs to a rest phrase ("rest cadence 85",
/// "rbi cadence 85") is not taken as the work cadence.
pub fn parse_cadence(text: &str) -> Cadence {
    let text = text.to_lowercase();

    let rest_spans: Vec<_> = REST_CADENCE.find_iter(&text).map(|m| m.range()).collect();
    let rest = last_capture(&REST_CADENCE, &text, 1).and_then(|s| s.parse().ok());

    let work = WORK_CADENCE
        .captures_iter(&text)
        .filter(|caps| {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            !rest_spans.iter().any(|span| span.contains(&start))
        })
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());

    Cadence { work, rest }
}

/// A strictly positive count or minute figure
fn parse_count(s: &str, what: &str) -> Result<u32> {
    match s.parse::<u32>() {
        Ok(0) => Err(Error::input(format!("Interval {} must be > 0", what))),
        Ok(n) => Ok(n),
        Err(_) => Err(Error::input(format!("Invalid {} in interval: {}", what, s))),
    }
}

fn parse_power(s: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|_| Error::input(format!("Invalid interval power: {}", s)))
}

fn minutes_to_seconds(minutes: u32) -> Result<u32> {
    minutes
        .checked_mul(60)
        .ok_or_else(|| Error::input(format!("Interval duration too large: {} min", minutes)))
}

/// Interval structure of the description, set grammar first
///
/// When the set form `S x [R x D' @.. C' rbi] E' rbs` matches, it is the only
/// block returned and the simple grammar is not consulted.
pub fn parse_intervals(text: &str, ftp: Option<f64>, cadence: Cadence) -> Result<Vec<ExtractedBlock>> {
    let text = text.to_lowercase();

    if let Some(set) = parse_set(&text, cadence)? {
        return Ok(vec![ExtractedBlock::Set(set)]);
    }

    let mut blocks = Vec::new();
    for caps in INTERVAL.captures_iter(&text) {
        let group = |i: usize| caps.get(i).map(|m| m.as_str());

        // Upper bound of a repeat range wins
        let repeat_text = group(2).or(group(1)).unwrap_or_default();
        let repeat = parse_count(repeat_text, "repeat count")?;
        let on_minutes = parse_count(group(3).unwrap_or_default(), "duration")?;
        let p_low = parse_power(group(4).unwrap_or_default())?;
        let p_high = match group(5) {
            Some(high) => parse_power(high)?,
            None => p_low,
        };

        let matched = group(0).unwrap_or_default();
        let unit = match group(6) {
            Some(unit) => unit,
            None if matched.contains('%') => "%",
            None => "",
        };

        let (low, high) = match unit {
            "%" | "percent" => (p_low / 100.0, p_high / 100.0),
            "w" | "watts" => match ftp {
                Some(ftp) if ftp != 0.0 => (p_low / ftp, p_high / ftp),
                _ => {
                    return Err(Error::input(
                        "FTP is required when using watt-based intervals",
                    ))
                }
            },
            _ => {
                return Err(Error::input(
                    "Could not determine interval units; use % of FTP or watts",
                ))
            }
        };

        if low <= 0.0 || high <= 0.0 {
            return Err(Error::input(format!(
                "Interval power must be positive: '{}'",
                matched
            )));
        }

        let on_power = if low == high {
            Power::Fixed(low)
        } else {
            Power::Range { low, high }
        };
        let seconds = minutes_to_seconds(on_minutes)?;

        tracing::debug!(repeat, seconds, ?on_power, "Matched interval phrase '{}'", matched);
        blocks.push(ExtractedBlock::Intervals(IntervalSegment {
            repeat,
            on_duration: seconds,
            off_duration: seconds,
            on_power: Some(on_power),
            off_power: Some(Power::Fixed(INTERVAL_OFF_POWER)),
            cadence: cadence.work,
            cadence_resting: cadence.rest,
        }));
    }

    Ok(blocks)
}

fn parse_set(text: &str, cadence: Cadence) -> Result<Option<SetBlock>> {
    let Some(caps) = SET.captures(text) else {
        return Ok(None);
    };
    let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();

    let sets = parse_count(group(1), "set count")?;
    let reps = parse_count(group(2), "repeat count")?;
    let on_minutes = parse_count(group(3), "duration")?;
    let rbi_minutes = parse_count(group(4), "rbi duration")?;
    let rbs_minutes = parse_count(group(5), "rbs duration")?;

    tracing::debug!(sets, reps, on_minutes, rbi_minutes, rbs_minutes, "Matched set phrase");
    Ok(Some(SetBlock {
        repeat: sets,
        interval: IntervalSegment {
            repeat: reps,
            on_duration: minutes_to_seconds(on_minutes)?,
            off_duration: minutes_to_seconds(rbi_minutes)?,
            on_power: Some(Power::Fixed(SET_ON_POWER)),
            off_power: Some(Power::Fixed(INTERVAL_OFF_POWER)),
            cadence: cadence.work,
            cadence_resting: cadence.rest,
        },
        rest_between_sets: minutes_to_seconds(rbs_minutes)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_simple_interval_percent_range() {
        let blocks = parse_intervals("6x3' @105-110% 3' rbi", None, Cadence::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        let ExtractedBlock::Intervals(iv) = &blocks[0] else {
            panic!("expected simple interval, got {:?}", blocks[0]);
        };
        assert_eq!(iv.repeat, 6);
        assert_eq!(iv.on_duration, 180);
        assert_eq!(iv.off_duration, 180);
        let Some(Power::Range { low, high }) = iv.on_power else {
            panic!("expected power range, got {:?}", iv.on_power);
        };
        assert!(approx(low, 1.05));
        assert!(approx(high, 1.10));
        assert_eq!(iv.off_power, Some(Power::Fixed(0.5)));
    }

    #[test]
    fn test_simple_interval_single_power_is_fixed() {
        let blocks = parse_intervals("5x4' @95%", None, Cadence::default()).unwrap();
        let ExtractedBlock::Intervals(iv) = &blocks[0] else {
            panic!("expected simple interval");
        };
        assert_eq!(iv.on_power, Some(Power::Fixed(0.95)));
    }

    #[test]
    fn test_repeat_range_uses_upper_bound() {
        let blocks = parse_intervals("4-6 x 2' @ 120 percent", None, Cadence::default()).unwrap();
        let ExtractedBlock::Intervals(iv) = &blocks[0] else {
            panic!("expected simple interval");
        };
        assert_eq!(iv.repeat, 6);
        assert_eq!(iv.on_power, Some(Power::Fixed(1.2)));
    }

    #[test]
    fn test_watt_intervals_need_ftp() {
        let err = parse_intervals("3x10' @250w", None, Cadence::default()).unwrap_err();
        assert!(err.to_string().contains("FTP is required"));

        let blocks = parse_intervals("3x10' @250w", Some(250.0), Cadence::default()).unwrap();
        let ExtractedBlock::Intervals(iv) = &blocks[0] else {
            panic!("expected simple interval");
        };
        assert_eq!(iv.on_power, Some(Power::Fixed(1.0)));
        assert_eq!(iv.on_duration, 600);
    }

    #[test]
    fn test_interval_without_unit_errors() {
        let err = parse_intervals("3x10' @90", None, Cadence::default()).unwrap_err();
        assert!(err.to_string().contains("Could not determine interval units"));
    }

    #[test]
    fn test_zero_counts_and_durations_rejected() {
        for text in [
            "3x0' @100%",
            "0x3' @100%",
            "2x[3x5' @z5 2' rbi] 0' rbs",
            "2x[3x5' @z5 0' rbi] 5' rbs",
            "2x[0x5' @z5 2' rbi] 5' rbs",
            "0x[3x5' @z5 2' rbi] 5' rbs",
            "2x[3x0' @z5 2' rbi] 5' rbs",
        ] {
            let err = parse_intervals(text, None, Cadence::default()).unwrap_err();
            assert!(matches!(err, Error::Input(_)), "{}: {:?}", text, err);
            assert!(err.to_string().contains("must be > 0"), "{}: {}", text, err);
        }
    }

    #[test]
    fn test_zero_power_rejected() {
        let err = parse_intervals("3x5' @0%", None, Cadence::default()).unwrap_err();
        assert!(err.to_string().contains("Interval power must be positive"));
        let err = parse_intervals("3x5' @0-100%", None, Cadence::default()).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
        let err = parse_intervals("3x5' @0w", Some(250.0), Cadence::default()).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn test_multiple_simple_intervals() {
        let text = "3x5' @90% then 4x2' @120%";
        let blocks = parse_intervals(text, None, Cadence::default()).unwrap();
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_set_grammar() {
        let blocks =
            parse_intervals("4x[3x5' @Z5 2' rbi] 5' rbs", None, Cadence::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        let ExtractedBlock::Set(set) = &blocks[0] else {
            panic!("expected set block, got {:?}", blocks[0]);
        };
        assert_eq!(set.repeat, 4);
        assert_eq!(set.interval.repeat, 3);
        assert_eq!(set.interval.on_duration, 300);
        assert_eq!(set.interval.off_duration, 120);
        assert_eq!(set.interval.on_power, Some(Power::Fixed(1.05)));
        assert_eq!(set.interval.off_power, Some(Power::Fixed(0.5)));
        assert_eq!(set.rest_between_sets, 300);
    }

    #[test]
    fn test_set_grammar_unicode_marks() {
        let blocks =
            parse_intervals("2×[4×3′ @110% 1′ rbi] 4′ rbs", None, Cadence::default()).unwrap();
        let ExtractedBlock::Set(set) = &blocks[0] else {
            panic!("expected set block");
        };
        assert_eq!(set.repeat, 2);
        assert_eq!(set.interval.repeat, 4);
        assert_eq!(set.rest_between_sets, 240);
    }

    #[test]
    fn test_set_grammar_excludes_simple() {
        // The inner "3x5' @110%" would match the simple grammar on its own
        let text = "3x[3x5' @110% 2' rbi] 5' rbs";
        let blocks = parse_intervals(text, None, Cadence::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], ExtractedBlock::Set(_)));
    }

    #[test]
    fn test_cadence_applies_to_intervals() {
        let cadence = parse_cadence("6x3' @105% cadence 95-100, rest cadence 85");
        assert_eq!(cadence, Cadence { work: Some(95), rest: Some(85) });

        let blocks = parse_intervals("6x3' @105%", None, cadence).unwrap();
        let ExtractedBlock::Intervals(iv) = &blocks[0] else {
            panic!("expected simple interval");
        };
        assert_eq!(iv.cadence, Some(95));
        assert_eq!(iv.cadence_resting, Some(85));
    }

    #[test]
    fn test_rest_cadence_is_not_work_cadence() {
        let cadence = parse_cadence("rbi cadence 80");
        assert_eq!(cadence, Cadence { work: None, rest: Some(80) });
        let cadence = parse_cadence("cadence rest 75");
        assert_eq!(cadence, Cadence { work: None, rest: Some(75) });
    }

    #[test]
    fn test_total_minutes_single_values() {
        assert_eq!(parse_total_minutes("45 min endurance"), Some(45));
        assert_eq!(parse_total_minutes("1.5 hours z2"), Some(90));
        assert_eq!(parse_total_minutes("easy spin"), None);
    }

    #[test]
    fn test_total_minutes_categories_sum() {
        // Last single-minute phrase (10) plus the hour phrase (60)
        let text = "45 min endurance, last 10 min cooldown 1 hour total";
        assert_eq!(parse_total_minutes(text), Some(70));
    }

    #[test]
    fn test_total_minutes_range_counts_twice() {
        // Range category contributes 30, single category also sees "30 min"
        assert_eq!(parse_total_minutes("20-30 min recovery"), Some(60));
    }

    #[test]
    fn test_scalar_facts() {
        let text = "tss 60, ftp: 280, z3 then z4, 8 min cool down";
        assert_eq!(parse_tss(text), Some(60.0));
        assert_eq!(parse_ftp(text), Some(280.0));
        assert_eq!(parse_zone(text), Some(Zone::Z3));
        assert_eq!(parse_cooldown_minutes(text), Some(8));
    }

    #[test]
    fn test_last_match_wins() {
        assert_eq!(parse_ftp("ftp 250 ... new ftp 265"), Some(265.0));
        assert_eq!(parse_tss("tss 50 or maybe tss 70"), Some(70.0));
    }

    #[test]
    fn test_zone_needs_standalone_token() {
        assert_eq!(parse_zone("dz2 x"), None);
        assert_eq!(parse_zone("Z2 endurance"), Some(Zone::Z2));
    }

    #[test]
    fn test_workout_text_parse() {
        let parsed = WorkoutText::parse("60min endurance, 6x3' @105-110% 3' rbi, FTP 250").unwrap();
        assert_eq!(parsed.ftp, Some(250.0));
        assert_eq!(parsed.total_minutes, Some(60));
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.zone, None);
    }
}
