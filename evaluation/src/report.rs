use std::path::Path;
use tracing::info;

use crate::engine::{ModelScores, ScoringPlan};
use crate::error::{EvalError, Result};

/// Comparison table with one row per model.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    /// Columns are `Model Name`, the plan's tasks, its groups, then `Avg.`.
    pub fn new(plan: &ScoringPlan, models: &[ModelScores]) -> Self {
        let header = std::iter::once("Model Name".to_string())
            .chain(plan.task_ids.iter().cloned())
            .chain(plan.groups.iter().map(|g| g.name.clone()))
            .chain(std::iter::once("Avg.".to_string()))
            .collect();

        let rows = models
            .iter()
            .map(|model| {
                std::iter::once(model.model_name.clone())
                    .chain(model.tasks.iter().map(|t| t.value.to_string()))
                    .chain(model.groups.iter().map(|g| g.value.to_string()))
                    .chain(std::iter::once(model.average.to_string()))
                    .collect()
            })
            .collect();

        Self { header, rows }
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        self.write_records(&mut writer)?;
        let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Writes the table as CSV, creating the parent directory if needed.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        self.write_records(&mut writer)?;
        writer.flush().map_err(|e| EvalError::io(path, e))?;
        info!("Wrote report for {} models to {}", self.rows.len(), path.display());
        Ok(())
    }

    fn write_records<W: std::io::Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{TaskGroup, TaskScore};
    use crate::metrics::MetricValue;
    use tempfile::tempdir;

    fn score(label: &str, value: MetricValue) -> TaskScore {
        TaskScore {
            label: label.to_string(),
            value,
            scored: 1,
            skipped: 0,
        }
    }

    #[test]
    fn test_pair_cells() {
        let plan = ScoringPlan::new(["task78"]).with_group(TaskGroup::new("CT", ["task83"]));
        let models = [ModelScores {
            model_name: "Llama 3".into(),
            tasks: vec![score("task78", MetricValue::Pair(66.666_7, 50.0))],
            groups: vec![score("CT", MetricValue::Pair(10.0, 12.5))],
            average: MetricValue::Pair(66.666_7, 50.0),
        }];

        let table = ReportTable::new(&plan, &models);
        assert_eq!(
            table.to_csv_string().unwrap(),
            "Model Name,task78,CT,Avg.\nLlama 3,66.67/50.00,10.00/12.50,66.67/50.00\n"
        );
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results").join("NER_metrics.csv");
        let plan = ScoringPlan::new(["task125"]);
        let models = [ModelScores {
            model_name: "GPT-4".into(),
            tasks: vec![score("task125", MetricValue::Scalar(66.666_666))],
            groups: vec![],
            average: MetricValue::Scalar(66.666_666),
        }];

        ReportTable::new(&plan, &models).write(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Model Name,task125,Avg.\nGPT-4,66.67,66.67\n");
    }
}
