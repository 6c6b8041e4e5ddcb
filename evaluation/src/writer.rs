use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::records::PredictionRecord;

const FLUSH_EVERY: usize = 64;

/// Streams prediction rows to a `task_id,input,GT,output` CSV file.
pub struct PredictionWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl PredictionWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create output directory")?;
        }
        let writer = csv::Writer::from_path(path).with_context(|| format!("Failed to create file: {:?}", path))?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    pub fn write(&mut self, record: &PredictionRecord) -> Result<()> {
        self.writer.serialize(record).context("Failed to write prediction row")?;
        self.rows += 1;
        if self.rows % FLUSH_EVERY == 0 {
            self.writer.flush()?;
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn close(mut self) -> Result<PathBuf> {
        self.writer.flush().context("Failed to flush prediction file")?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PredictionTable;

    #[test]
    fn test_prediction_writer() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("prediction_results").join("eval_results_test_Plain.csv");

        let mut writer = PredictionWriter::create(&path)?;
        for i in 0..5 {
            writer.write(&PredictionRecord::new(format!("task{i}"), "prompt, with comma", "gt", "answer\nline two"))?;
        }
        writer.write(&PredictionRecord {
            task_id: "task9".into(),
            input: "x".into(),
            gt: Some("y".into()),
            output: None,
        })?;
        assert_eq!(writer.rows(), 6);
        let path = writer.close()?;

        let table = PredictionTable::load(&path)?;
        assert_eq!(table.model_name, "Plain");
        assert_eq!(table.records.len(), 6);
        assert_eq!(table.records[0].input, "prompt, with comma");
        assert_eq!(table.records[0].output.as_deref(), Some("answer\nline two"));
        assert_eq!(table.records[5].output, None);
        Ok(())
    }
}
