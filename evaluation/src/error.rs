use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading benchmark inputs or scoring predictions.
///
/// Configuration problems are fatal. Per-row data problems never surface
/// here; they are skipped and logged where they are found.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Task {task_id} has no instruction definition")]
    MissingDefinition { task_id: String },

    #[error("{path}: required field `{field}` is missing or empty")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("No task documents found under {0}")]
    EmptyBenchmark(PathBuf),

    #[error("Unknown metric suite `{0}`")]
    UnknownSuite(String),

    #[error("Unknown language code `{0}`")]
    UnknownLanguage(String),

    #[error("Probability `{name}` must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        EvalError::Json { path: path.into(), source }
    }

    /// True for errors caused by the benchmark configuration rather than the environment.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EvalError::MissingDefinition { .. }
                | EvalError::MissingField { .. }
                | EvalError::EmptyBenchmark(_)
                | EvalError::UnknownSuite(_)
                | EvalError::UnknownLanguage(_)
                | EvalError::InvalidProbability { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
