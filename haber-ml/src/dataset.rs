//! Labeled dataset loading
//!
//! Two framings are supported: one JSON object per line, or a single JSON
//! array of objects. Each object maps `Body` to the text and `Durum` to the
//! label. Bad records never abort a load; each one is returned in
//! [`LoadReport::rejected`] with its position and reason.

use haber_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Stance label, `0..=MAX_LABEL`
pub type Label = u8;

pub use haber_common::polarity::MAX_LABEL;

const TEXT_FIELD: &str = "Body";
const LABEL_FIELD: &str = "Durum";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub text: String,
    pub label: Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// One JSON object per line
    JsonLines,
    /// A single JSON array of objects
    JsonArray,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub path: PathBuf,
    pub format: SourceFormat,
}

impl DataSource {
    pub fn json_lines(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: SourceFormat::JsonLines,
        }
    }

    pub fn json_array(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: SourceFormat::JsonArray,
        }
    }
}

/// Why a record was dropped
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    MalformedJson(String),
    NotAnObject,
    MissingText,
    MissingLabel,
    InvalidLabel(String),
    LabelOutOfRange(i64),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MalformedJson(e) => write!(f, "malformed JSON: {}", e),
            RejectReason::NotAnObject => write!(f, "entry is not a JSON object"),
            RejectReason::MissingText => write!(f, "missing or empty '{}'", TEXT_FIELD),
            RejectReason::MissingLabel => write!(f, "missing '{}'", LABEL_FIELD),
            RejectReason::InvalidLabel(raw) => write!(f, "non-numeric label {}", raw),
            RejectReason::LabelOutOfRange(v) => {
                write!(f, "label {} outside 0..={}", v, MAX_LABEL)
            }
        }
    }
}

/// Where a record sits in its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPosition {
    /// 1-based line number (JSON lines)
    Line(usize),
    /// 0-based array index (JSON array)
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub source: PathBuf,
    pub position: RecordPosition,
    pub reason: RejectReason,
}

/// Accepted records plus every rejection, in source order
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<LabeledRecord>,
    pub rejected: Vec<Rejection>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.records.extend(other.records);
        self.rejected.extend(other.rejected);
    }

    /// Record count per label
    pub fn class_distribution(&self) -> BTreeMap<Label, usize> {
        class_distribution(self.records.iter().map(|r| r.label))
    }

    /// Rejection count per reason kind, for logging
    pub fn rejection_summary(&self) -> BTreeMap<&'static str, usize> {
        let mut summary = BTreeMap::new();
        for rejection in &self.rejected {
            let key = match rejection.reason {
                RejectReason::MalformedJson(_) => "malformed_json",
                RejectReason::NotAnObject => "not_an_object",
                RejectReason::MissingText => "missing_text",
                RejectReason::MissingLabel => "missing_label",
                RejectReason::InvalidLabel(_) => "invalid_label",
                RejectReason::LabelOutOfRange(_) => "label_out_of_range",
            };
            *summary.entry(key).or_insert(0) += 1;
        }
        summary
    }
}

/// Count labels
pub fn class_distribution(labels: impl IntoIterator<Item = Label>) -> BTreeMap<Label, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Distinct labels, ascending
pub fn distinct_labels(labels: &[Label]) -> Vec<Label> {
    class_distribution(labels.iter().copied()).into_keys().collect()
}

/// Position of each label within the sorted `classes`
pub(crate) fn encode_targets(labels: &[Label], classes: &[Label]) -> Result<Vec<usize>> {
    labels
        .iter()
        .map(|l| {
            classes.binary_search(l).map_err(|_| {
                Error::InvalidInput(format!("label {} is not one of {:?}", l, classes))
            })
        })
        .collect()
}

/// Load and concatenate all sources.
///
/// Every path is checked before any parsing so a missing file fails fast.
pub fn load_sources(sources: &[DataSource]) -> Result<LoadReport> {
    if let Some(missing) = sources.iter().find(|s| !s.path.exists()) {
        return Err(Error::SourceNotFound(missing.path.clone()));
    }

    let mut report = LoadReport::default();
    for source in sources {
        report.merge(load_source(source)?);
    }

    if !report.rejected.is_empty() {
        warn!(
            "Dropped {} malformed records: {:?}",
            report.rejected.len(),
            report.rejection_summary()
        );
    }
    info!("Loaded {} records from {} sources", report.records.len(), sources.len());

    Ok(report)
}

/// Load a single source
pub fn load_source(source: &DataSource) -> Result<LoadReport> {
    if !source.path.exists() {
        return Err(Error::SourceNotFound(source.path.clone()));
    }

    let report = match source.format {
        SourceFormat::JsonLines => load_json_lines(&source.path)?,
        SourceFormat::JsonArray => load_json_array(&source.path)?,
    };

    info!(
        "{}: {} accepted, {} rejected",
        source.path.display(),
        report.records.len(),
        report.rejected.len()
    );

    Ok(report)
}

fn load_json_lines(path: &Path) -> Result<LoadReport> {
    let reader = BufReader::new(File::open(path)?);
    let mut report = LoadReport::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let position = RecordPosition::Line(idx + 1);
        let parsed = serde_json::from_str::<Value>(line.trim())
            .map_err(|e| RejectReason::MalformedJson(e.to_string()))
            .and_then(|value| parse_entry(&value));

        match parsed {
            Ok(record) => report.records.push(record),
            Err(reason) => report.rejected.push(Rejection {
                source: path.to_path_buf(),
                position,
                reason,
            }),
        }
    }

    Ok(report)
}

/// The array itself must parse; only its entries are best-effort
fn load_json_array(path: &Path) -> Result<LoadReport> {
    let reader = BufReader::new(File::open(path)?);
    let entries: Vec<Value> = serde_json::from_reader(reader)?;
    let mut report = LoadReport::default();

    for (idx, value) in entries.iter().enumerate() {
        match parse_entry(value) {
            Ok(record) => report.records.push(record),
            Err(reason) => report.rejected.push(Rejection {
                source: path.to_path_buf(),
                position: RecordPosition::Index(idx),
                reason,
            }),
        }
    }

    Ok(report)
}

fn parse_entry(value: &Value) -> std::result::Result<LabeledRecord, RejectReason> {
    let object = value.as_object().ok_or(RejectReason::NotAnObject)?;

    let text = object
        .get(TEXT_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(RejectReason::MissingText)?;

    let label = match object.get(LABEL_FIELD) {
        None | Some(Value::Null) => return Err(RejectReason::MissingLabel),
        Some(raw) => coerce_label(raw)?,
    };

    Ok(LabeledRecord {
        text: text.to_string(),
        label,
    })
}

/// Float-then-integer coercion: `7`, `7.9`, `"7"` and `" 7.0 "` are all 7
fn coerce_label(raw: &Value) -> std::result::Result<Label, RejectReason> {
    let as_float = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    let value = as_float
        .filter(|v| v.is_finite())
        .ok_or_else(|| RejectReason::InvalidLabel(raw.to_string()))?
        .trunc() as i64;

    if (0..=i64::from(MAX_LABEL)).contains(&value) {
        Ok(value as Label)
    } else {
        Err(RejectReason::LabelOutOfRange(value))
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Body")]
    body: &'a str,
    #[serde(rename = "Durum")]
    durum: Label,
}

/// Write records as JSON lines in the source shape, so the export can be
/// loaded back with [`SourceFormat::JsonLines`]
pub fn write_cleaned_jsonl(path: &Path, records: &[LabeledRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(
            &mut writer,
            &ExportRow {
                body: &record.text,
                durum: record.label,
            },
        )?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    info!("Cleaned dataset written: {} ({} rows)", path.display(), records.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_targets_rejects_unknown_labels() {
        assert_eq!(encode_targets(&[9, 0, 4, 9], &[0, 4, 9]).unwrap(), vec![2, 0, 1, 2]);
        assert!(matches!(
            encode_targets(&[0, 5], &[0, 4, 9]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn coerces_numeric_and_string_labels() {
        assert_eq!(coerce_label(&json!(3)), Ok(3));
        assert_eq!(coerce_label(&json!(7.9)), Ok(7));
        assert_eq!(coerce_label(&json!("10")), Ok(10));
        assert_eq!(coerce_label(&json!(" 2.0 ")), Ok(2));
        assert_eq!(coerce_label(&json!(-0.5)), Ok(0));
    }

    #[test]
    fn rejects_bad_labels() {
        assert_eq!(coerce_label(&json!(11)), Err(RejectReason::LabelOutOfRange(11)));
        assert_eq!(coerce_label(&json!(-1)), Err(RejectReason::LabelOutOfRange(-1)));
        assert!(matches!(coerce_label(&json!("yüksek")), Err(RejectReason::InvalidLabel(_))));
        assert!(matches!(coerce_label(&json!(true)), Err(RejectReason::InvalidLabel(_))));
        assert!(matches!(coerce_label(&json!("nan")), Err(RejectReason::InvalidLabel(_))));
    }

    #[test]
    fn parse_entry_requires_text_and_label() {
        assert_eq!(
            parse_entry(&json!({"Body": "  haber  ", "Durum": 4})),
            Ok(LabeledRecord {
                text: "haber".to_string(),
                label: 4
            })
        );
        assert_eq!(parse_entry(&json!({"Durum": 4})), Err(RejectReason::MissingText));
        assert_eq!(
            parse_entry(&json!({"Body": "   ", "Durum": 4})),
            Err(RejectReason::MissingText)
        );
        assert_eq!(
            parse_entry(&json!({"Body": "haber", "Durum": null})),
            Err(RejectReason::MissingLabel)
        );
        assert_eq!(parse_entry(&json!([1, 2])), Err(RejectReason::NotAnObject));
    }
}
