//! Schema validation of `.zwo` documents against a [`SchemaCatalog`].
//!
//! Findings are data, not failures: every document produces a report, and a
//! document that cannot be parsed only affects its own report.

use crate::catalog::SchemaCatalog;
use crate::document::{FILE_EXTENSION, ROOT_ELEMENT, WORKOUT_ELEMENT};
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One problem found in a document
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaIssue {
    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("unreadable file: {0}")]
    Unreadable(String),

    #[error("root tag is '{found}', expected 'workout_file'")]
    UnexpectedRoot { found: String },

    #[error("missing <workout> element")]
    MissingWorkout,

    #[error("unknown element <{0}>")]
    UnknownElement(String),

    #[error("unknown attribute '{attribute}' on <{tag}>")]
    UnknownAttribute { tag: String, attribute: String },

    /// Strict mode only
    #[error("attribute '{attribute}' not listed for <{tag}> in tag_attr_usage.json")]
    UnlistedAttribute { tag: String, attribute: String },
}

/// Errors and warnings for one document
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Findings {
    pub errors: Vec<SchemaIssue>,
    pub warnings: Vec<SchemaIssue>,
}

impl Findings {
    fn error(issue: SchemaIssue) -> Self {
        Findings {
            errors: vec![issue],
            warnings: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate XML text
///
/// `warn_mismatch` enables the per-tag attribute listing check, which only
/// ever produces warnings.
pub fn validate_str(xml: &str, catalog: &SchemaCatalog, warn_mismatch: bool) -> Findings {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => return Findings::error(SchemaIssue::Parse(e.to_string())),
    };

    let mut findings = Findings::default();
    let root = doc.root_element();

    let root_tag = root.tag_name().name();
    if root_tag != ROOT_ELEMENT {
        findings.errors.push(SchemaIssue::UnexpectedRoot {
            found: root_tag.to_string(),
        });
    }
    if !root.children().any(|n| n.has_tag_name(WORKOUT_ELEMENT)) {
        findings.errors.push(SchemaIssue::MissingWorkout);
    }

    for node in root.descendants().filter(|n| n.is_element()) {
        let tag = node.tag_name().name();
        if !catalog.allows_tag(tag) {
            findings
                .errors
                .push(SchemaIssue::UnknownElement(tag.to_string()));
            continue;
        }

        let listed = catalog.listed_attributes(tag);
        for attr in node.attributes() {
            let attribute = attr.name();
            if !catalog.allows_attribute(attribute) {
                findings.errors.push(SchemaIssue::UnknownAttribute {
                    tag: tag.to_string(),
                    attribute: attribute.to_string(),
                });
                continue;
            }
            if warn_mismatch && listed.is_some_and(|attrs| !attrs.contains(attribute)) {
                findings.warnings.push(SchemaIssue::UnlistedAttribute {
                    tag: tag.to_string(),
                    attribute: attribute.to_string(),
                });
            }
        }
    }

    findings
}

/// Findings for one file on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub findings: Findings,
}

impl DocumentReport {
    pub fn is_ok(&self) -> bool {
        self.findings.is_clean()
    }

    /// Error lines, each prefixed with the document path
    pub fn error_lines(&self) -> Vec<String> {
        self.lines(&self.findings.errors)
    }

    pub fn warning_lines(&self) -> Vec<String> {
        self.lines(&self.findings.warnings)
    }

    fn lines(&self, issues: &[SchemaIssue]) -> Vec<String> {
        issues
            .iter()
            .map(|issue| format!("{}: {}", self.path.display(), issue))
            .collect()
    }
}

impl fmt::Display for DocumentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} error(s), {} warning(s)",
            self.path.display(),
            self.findings.errors.len(),
            self.findings.warnings.len()
        )
    }
}

pub fn validate_file(path: &Path, catalog: &SchemaCatalog, warn_mismatch: bool) -> DocumentReport {
    let findings = match std::fs::read_to_string(path) {
        Ok(xml) => validate_str(&xml, catalog, warn_mismatch),
        Err(e) => Findings::error(SchemaIssue::Unreadable(e.to_string())),
    };
    let report = DocumentReport {
        path: path.to_path_buf(),
        findings,
    };
    tracing::debug!("{}", report);
    report
}

/// Documents to validate under `path`
///
/// A file yields itself; a directory yields every `.zwo` file beneath it in
/// sorted order. Finding nothing is an error.
pub fn collect_documents(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    if path.is_dir() {
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(std::io::Error::from)?;
            let is_zwo = entry
                .path()
                .extension()
                .is_some_and(|ext| ext == FILE_EXTENSION);
            if entry.file_type().is_file() && is_zwo {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(Error::input("no .zwo files found"));
    }
    Ok(files)
}

/// Validate each document independently
pub fn validate_documents(
    paths: &[PathBuf],
    catalog: &SchemaCatalog,
    warn_mismatch: bool,
) -> Vec<DocumentReport> {
    let reports: Vec<DocumentReport> = paths
        .iter()
        .map(|path| validate_file(path, catalog, warn_mismatch))
        .collect();

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        tracing::warn!("{} of {} document(s) failed validation", failed, reports.len());
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;

    const CLEAN: &str = r#"<workout_file>
    <author>coach</author>
    <name>Test</name>
    <description>d</description>
    <sportType>bike</sportType>
    <tags>
        <tag name="CUSTOM"/>
    </tags>
    <workout>
        <Warmup Duration="600" PowerLow="0.5000" PowerHigh="0.7700"/>
        <SteadyState Duration="300" Power="0.7500"/>
        <IntervalsT Repeat="3" OnDuration="60" OffDuration="60" OnPower="1.2000" OffPower="0.5000"/>
    </workout>
</workout_file>"#;

    #[test]
    fn test_allowed_document_is_clean_in_both_modes() {
        let catalog = sample_catalog();
        assert_eq!(validate_str(CLEAN, &catalog, false), Findings::default());
        assert_eq!(validate_str(CLEAN, &catalog, true), Findings::default());
    }

    #[test]
    fn test_unknown_element_skips_attributes() {
        let xml = CLEAN.replace(
            "<SteadyState Duration=\"300\" Power=\"0.7500\"/>",
            "<Sprint Bogus=\"1\" Other=\"2\"/>",
        );
        let findings = validate_str(&xml, &sample_catalog(), true);
        assert_eq!(
            findings.errors,
            vec![SchemaIssue::UnknownElement("Sprint".into())]
        );
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_unknown_attribute() {
        let xml = CLEAN.replace("Power=\"0.7500\"", "Power=\"0.7500\" Zone=\"3\"");
        let findings = validate_str(&xml, &sample_catalog(), false);
        assert_eq!(
            findings.errors,
            vec![SchemaIssue::UnknownAttribute {
                tag: "SteadyState".into(),
                attribute: "Zone".into(),
            }]
        );
        assert_eq!(
            findings.errors[0].to_string(),
            "unknown attribute 'Zone' on <SteadyState>"
        );
    }

    #[test]
    fn test_unlisted_attribute_warns_only_in_strict_mode() {
        // Cadence is known globally but not recorded for SteadyState
        let xml = CLEAN.replace("Power=\"0.7500\"", "Power=\"0.7500\" Cadence=\"90\"");
        let catalog = sample_catalog();

        assert_eq!(validate_str(&xml, &catalog, false), Findings::default());

        let strict = validate_str(&xml, &catalog, true);
        assert!(strict.is_clean());
        assert_eq!(
            strict.warnings,
            vec![SchemaIssue::UnlistedAttribute {
                tag: "SteadyState".into(),
                attribute: "Cadence".into(),
            }]
        );
    }

    #[test]
    fn test_bad_root_and_missing_workout() {
        let xml = "<plan><author>x</author></plan>";
        let findings = validate_str(xml, &sample_catalog(), false);
        assert_eq!(
            findings.errors,
            vec![
                SchemaIssue::UnexpectedRoot {
                    found: "plan".into()
                },
                SchemaIssue::MissingWorkout,
                SchemaIssue::UnknownElement("plan".into()),
            ]
        );
        assert_eq!(
            findings.errors[0].to_string(),
            "root tag is 'plan', expected 'workout_file'"
        );
    }

    #[test]
    fn test_nested_workout_does_not_count() {
        let xml = "<workout_file><tags><workout/></tags></workout_file>";
        let findings = validate_str(xml, &sample_catalog(), false);
        assert_eq!(findings.errors, vec![SchemaIssue::MissingWorkout]);
    }

    #[test]
    fn test_parse_error_short_circuits() {
        let findings = validate_str("<workout_file><workout>", &sample_catalog(), false);
        assert_eq!(findings.errors.len(), 1);
        assert!(matches!(findings.errors[0], SchemaIssue::Parse(_)));
    }

    #[test]
    fn test_batch_continues_past_bad_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp_dir.path().join("a.zwo"), CLEAN).unwrap();
        std::fs::write(nested.join("b.zwo"), "<workout_file>").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let paths = collect_documents(temp_dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("a.zwo"));

        let reports = validate_documents(&paths, &sample_catalog(), false);
        assert!(reports[0].is_ok());
        assert!(!reports[1].is_ok());
        let lines = reports[1].error_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("b.zwo: XML parse error"));
    }

    #[test]
    fn test_collect_single_file_and_empty_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("one.zwo");
        std::fs::write(&file, CLEAN).unwrap();
        assert_eq!(collect_documents(&file).unwrap(), vec![file]);

        let empty = temp_dir.path().join("empty");
        std::fs::create_dir_all(&empty).unwrap();
        let err = collect_documents(&empty).unwrap_err();
        assert_eq!(err.to_string(), "no .zwo files found");
        assert!(collect_documents(&temp_dir.path().join("missing")).is_err());
    }
}
