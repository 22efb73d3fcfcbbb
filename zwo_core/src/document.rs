//! The emitted `.zwo` workout file.
//!
//! A [`WorkoutDocument`] holds metadata and the flat block list produced by
//! either compile path, and renders it as `<workout_file>` XML.

use crate::{Block, IntervalSegment, Power, RampSegment, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const ROOT_ELEMENT: &str = "workout_file";
pub const WORKOUT_ELEMENT: &str = "workout";
pub const FILE_EXTENSION: &str = "zwo";

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("slug pattern is a valid regex"));
static REPEATED_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("slug pattern is a valid regex"));

/// A compiled workout, ready to serialize
#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutDocument {
    pub author: String,
    pub name: String,
    pub description: String,
    pub sport: String,
    pub tags: Vec<String>,
    pub blocks: Vec<Block>,
}

impl WorkoutDocument {
    /// Total timeline length in seconds
    pub fn duration_seconds(&self) -> u64 {
        self.blocks.iter().map(Block::duration_seconds).sum()
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "<{}>", ROOT_ELEMENT);
        for (tag, text) in [
            ("author", &self.author),
            ("name", &self.name),
            ("description", &self.description),
            ("sportType", &self.sport),
        ] {
            let _ = writeln!(out, "    <{tag}>{}</{tag}>", escape_xml(text));
        }

        out.push_str("    <tags>\n");
        for tag in &self.tags {
            let _ = writeln!(out, "        <tag name=\"{}\"/>", escape_xml(tag));
        }
        out.push_str("    </tags>\n");

        let _ = writeln!(out, "    <{}>", WORKOUT_ELEMENT);
        for block in &self.blocks {
            let (tag, attrs) = block_element(block);
            out.push_str("        <");
            out.push_str(tag);
            for (name, value) in attrs {
                let _ = write!(out, " {}=\"{}\"", name, escape_xml(&value));
            }
            out.push_str("/>\n");
        }
        let _ = writeln!(out, "    </{}>", WORKOUT_ELEMENT);
        let _ = writeln!(out, "</{}>", ROOT_ELEMENT);
        out
    }

    /// Path this document would be written to inside `dir`
    pub fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.{}", slugify(&self.name), FILE_EXTENSION))
    }

    /// Write `<slug>.zwo` into `dir`, creating it if needed
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = self.output_path(dir);
        std::fs::write(&path, self.to_xml())?;
        tracing::info!(
            "Wrote {} blocks ({}s) to {:?}",
            self.blocks.len(),
            self.duration_seconds(),
            path
        );
        Ok(path)
    }
}

type Attrs = Vec<(&'static str, String)>;

fn ratio(v: f64) -> String {
    format!("{:.4}", v)
}

fn ramp_attrs(r: &RampSegment) -> Attrs {
    let mut attrs = vec![
        ("Duration", r.duration.to_string()),
        ("PowerLow", ratio(r.power_low)),
        ("PowerHigh", ratio(r.power_high)),
    ];
    if let Some(c) = r.cadence {
        attrs.push(("Cadence", c.to_string()));
    }
    attrs
}

fn interval_attrs(i: &IntervalSegment) -> Attrs {
    let mut attrs = vec![
        ("Repeat", i.repeat.to_string()),
        ("OnDuration", i.on_duration.to_string()),
        ("OffDuration", i.off_duration.to_string()),
    ];
    match i.on_power {
        Some(Power::Fixed(v)) => attrs.push(("OnPower", ratio(v))),
        Some(Power::Range { low, high }) => {
            attrs.push(("PowerOnLow", ratio(low)));
            attrs.push(("PowerOnHigh", ratio(high)));
        }
        None => {}
    }
    match i.off_power {
        Some(Power::Fixed(v)) => attrs.push(("OffPower", ratio(v))),
        Some(Power::Range { low, high }) => {
            attrs.push(("PowerOffLow", ratio(low)));
            attrs.push(("PowerOffHigh", ratio(high)));
        }
        None => {}
    }
    if let Some(c) = i.cadence {
        attrs.push(("Cadence", c.to_string()));
    }
    if let Some(c) = i.cadence_resting {
        attrs.push(("CadenceResting", c.to_string()));
    }
    attrs
}

fn block_element(block: &Block) -> (&'static str, Attrs) {
    match block {
        Block::Warmup(r) => ("Warmup", ramp_attrs(r)),
        Block::Cooldown(r) => ("Cooldown", ramp_attrs(r)),
        Block::Ramp(r) => ("Ramp", ramp_attrs(r)),
        Block::SteadyState {
            duration,
            power,
            cadence,
        } => {
            let mut attrs = vec![("Duration", duration.to_string()), ("Power", ratio(*power))];
            if let Some(c) = cadence {
                attrs.push(("Cadence", c.to_string()));
            }
            ("SteadyState", attrs)
        }
        Block::FreeRide {
            duration,
            flat_road,
            cadence,
        } => {
            let mut attrs = vec![("Duration", duration.to_string())];
            if let Some(flat) = flat_road {
                attrs.push(("FlatRoad", u8::from(*flat).to_string()));
            }
            if let Some(c) = cadence {
                attrs.push(("Cadence", c.to_string()));
            }
            ("FreeRide", attrs)
        }
        Block::Intervals(i) => ("IntervalsT", interval_attrs(i)),
        Block::MaxEffort { duration } => ("MaxEffort", vec![("Duration", duration.to_string())]),
        Block::TextEvent {
            time_offset,
            message,
        } => (
            "textevent",
            vec![
                ("timeoffset", time_offset.to_string()),
                ("message", message.clone()),
            ],
        ),
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// File stem for a workout name
pub fn slugify(name: &str) -> String {
    let safe = UNSAFE_CHARS.replace_all(name.trim(), "_");
    let safe = REPEATED_UNDERSCORES.replace_all(&safe, "_");
    let safe = safe.trim_matches('_');
    if safe.is_empty() {
        "workout".to_string()
    } else {
        safe.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkoutDocument {
        WorkoutDocument {
            author: "coach".into(),
            name: "Tempo & Threshold".into(),
            description: "3 < 4".into(),
            sport: "bike".into(),
            tags: vec!["CUSTOM".into()],
            blocks: vec![
                Block::steady(600, 0.75),
                Block::Intervals(IntervalSegment {
                    repeat: 6,
                    on_duration: 180,
                    off_duration: 180,
                    on_power: Some(Power::Range { low: 1.05, high: 1.1 }),
                    off_power: Some(Power::Fixed(0.5)),
                    cadence: Some(95),
                    cadence_resting: None,
                }),
                Block::FreeRide {
                    duration: 60,
                    flat_road: Some(true),
                    cadence: None,
                },
                Block::TextEvent {
                    time_offset: 10,
                    message: "Go \"hard\"".into(),
                },
            ],
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Sweet Spot 3x15! "), "Sweet_Spot_3x15");
        assert_eq!(slugify("a // b"), "a_b");
        assert_eq!(slugify("***"), "workout");
        assert_eq!(slugify("keep-dash_and_underscore"), "keep-dash_and_underscore");
    }

    #[test]
    fn test_xml_structure_and_escaping() {
        let xml = sample().to_xml();
        assert!(xml.starts_with("<workout_file>"));
        assert!(xml.contains("<name>Tempo &amp; Threshold</name>"));
        assert!(xml.contains("<description>3 &lt; 4</description>"));
        assert!(xml.contains("<tag name=\"CUSTOM\"/>"));
        assert!(xml.contains("<SteadyState Duration=\"600\" Power=\"0.7500\"/>"));
        assert!(xml.contains(
            "<IntervalsT Repeat=\"6\" OnDuration=\"180\" OffDuration=\"180\" \
             PowerOnLow=\"1.0500\" PowerOnHigh=\"1.1000\" OffPower=\"0.5000\" Cadence=\"95\"/>"
        ));
        assert!(xml.contains("<FreeRide Duration=\"60\" FlatRoad=\"1\"/>"));
        assert!(xml.contains("<textevent timeoffset=\"10\" message=\"Go &quot;hard&quot;\"/>"));
    }

    #[test]
    fn test_xml_parses_back() {
        let xml = sample().to_xml();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let workout = doc
            .root_element()
            .children()
            .find(|n| n.has_tag_name("workout"))
            .unwrap();
        assert_eq!(workout.children().filter(|n| n.is_element()).count(), 4);
    }

    #[test]
    fn test_write_to_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let out_dir = temp_dir.path().join("out");
        let path = sample().write_to_dir(&out_dir).unwrap();
        assert_eq!(path, out_dir.join("Tempo_Threshold.zwo"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("IntervalsT"));
    }

    #[test]
    fn test_duration_seconds() {
        // 600 + 6 * 360 + 60
        assert_eq!(sample().duration_seconds(), 2820);
    }
}
