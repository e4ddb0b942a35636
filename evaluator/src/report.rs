use anyhow::{Context, Result};
use judol_core::{Classification, ConfusionMatrix, EvaluationCategory, Label, Threshold};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One JSONL line of `evaluate` output.
#[derive(Debug, Serialize)]
pub struct RowResult {
    pub source: String,
    pub row: usize,
    pub text: Option<String>,
    pub processed_text: String,
    pub score: f32,
    pub label: Label,
    pub prediction: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EvaluationCategory>,
}

impl RowResult {
    pub fn new(
        source: String,
        row: usize,
        text: Option<String>,
        processed_text: String,
        classification: Classification,
        actual: Option<u8>,
    ) -> Self {
        let Classification { score, label } = classification;
        let category = actual.and_then(|a| EvaluationCategory::from_outcome(a, label));
        Self { source, row, text, processed_text, score, label, prediction: label.as_binary(), actual, category }
    }
}

#[derive(Debug, Serialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub scenario: String,
    pub threshold: Threshold,
    pub files: usize,
    pub rows: usize,
    pub labeled_rows: u64,
    pub predicted_positive: usize,
    pub confusion: ConfusionMatrix,
    /// Absent when no row carried a usable label.
    pub metrics: Option<Metrics>,
    pub created_at: String,
}

impl Summary {
    pub fn from_results(scenario: &str, threshold: Threshold, files: usize, results: &[RowResult]) -> Self {
        let mut confusion = ConfusionMatrix::default();
        confusion.extend(results.iter().filter_map(|r| r.category));
        let metrics = (confusion.total() > 0).then(|| Metrics {
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
        });
        Self {
            scenario: scenario.to_string(),
            threshold,
            files,
            rows: results.len(),
            labeled_rows: confusion.total(),
            predicted_positive: results.iter().filter(|r| r.label.is_positive()).count(),
            confusion,
            metrics,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
        }
    }
}

/// `results.jsonl` -> `results.jsonl.summary.json`.
pub fn summary_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".summary.json");
    PathBuf::from(name)
}

pub fn write_jsonl(path: &Path, results: &[RowResult]) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    for r in results {
        serde_json::to_writer(&mut w, r)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_summary(path: &Path, summary: &Summary) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, summary)?;
    w.flush()?;
    Ok(())
}
