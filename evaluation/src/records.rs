use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;

/// One row of a prediction file.
///
/// Empty `GT` or `output` cells are read as `None` and skipped by scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub task_id: String,
    #[serde(default)]
    pub input: String,
    #[serde(rename = "GT")]
    pub gt: Option<String>,
    pub output: Option<String>,
}

impl PredictionRecord {
    pub fn new(task_id: impl Into<String>, input: impl Into<String>, gt: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            input: input.into(),
            gt: Some(gt.into()),
            output: Some(output.into()),
        }
    }

    /// Ground truth and output, if both are present.
    pub fn pair(&self) -> Option<(&str, &str)> {
        Some((self.gt.as_deref()?, self.output.as_deref()?))
    }
}

/// All predictions of one model, as read from one CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    pub model_name: String,
    pub records: Vec<PredictionRecord>,
}

impl PredictionTable {
    pub fn new(model_name: impl Into<String>, records: Vec<PredictionRecord>) -> Self {
        Self {
            model_name: model_name.into(),
            records,
        }
    }

    /// Reads a `task_id,input,GT,output` file. Columns are located by header
    /// name and fall back to that position. Short rows keep their task id with
    /// the trailing cells missing; rows without a task id or that cannot be
    /// decoded are logged and skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let columns = Columns::from_headers(reader.headers()?);

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (row, result) in reader.records().enumerate() {
            match result.map(|r| columns.record(&r)) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {
                    skipped += 1;
                    warn!("{}: skipping row {}: no task id", path.display(), row + 1);
                }
                Err(e) => {
                    skipped += 1;
                    warn!("{}: skipping row {}: {}", path.display(), row + 1, e);
                }
            }
        }

        let model_name = model_name_from_path(path);
        info!(
            "Loaded {} predictions for {} from {} ({} rows skipped)",
            records.len(),
            model_name,
            path.display(),
            skipped
        );
        Ok(Self { model_name, records })
    }

    pub fn task_ids(&self) -> Vec<String> {
        distinct_task_ids(&self.records)
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    task_id: usize,
    input: usize,
    gt: usize,
    output: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str, default: usize| headers.iter().position(|h| h.trim() == name).unwrap_or(default);
        Self {
            task_id: find("task_id", 0),
            input: find("input", 1),
            gt: find("GT", 2),
            output: find("output", 3),
        }
    }

    fn record(&self, row: &csv::StringRecord) -> Option<PredictionRecord> {
        let cell = |idx: usize| row.get(idx).filter(|c| !c.is_empty()).map(str::to_string);
        Some(PredictionRecord {
            task_id: cell(self.task_id)?,
            input: cell(self.input).unwrap_or_default(),
            gt: cell(self.gt),
            output: cell(self.output),
        })
    }
}

/// Distinct task ids in order of first appearance.
pub fn distinct_task_ids<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a PredictionRecord>,
{
    let mut seen = Vec::<String>::new();
    for record in records {
        if !seen.contains(&record.task_id) {
            seen.push(record.task_id.clone());
        }
    }
    seen
}

/// The last `_`-separated segment of the file stem, e.g.
/// `eval_results_MedS-Bench_1_context_1_oriINS_Llama 3.csv` is `Llama 3`.
pub fn model_name_from_path(path: &Path) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    stem.rsplit('_').next().unwrap_or_default().to_string()
}
