pub mod chat_format;
pub mod config;
pub mod dataset;
pub mod driver;
pub mod engine;
pub mod error;
pub mod inference;
pub mod metrics;
pub mod progress;
pub mod prompt;
pub mod records;
pub mod report;
pub mod suites;
pub mod util;
pub mod writer;

pub use config::{DataConfig, OutputConfig, PromptConfig, TaskConfig};
pub use dataset::{Instance, RewriteCatalog, TaskCatalog, TaskDefinition};
pub use engine::{MetricEngine, ModelScores, ScoringPlan, TaskScore};
pub use error::{EvalError, Result};
pub use prompt::{PromptBuilder, PromptSample};
pub use records::{PredictionRecord, PredictionTable};
pub use report::ReportTable;
pub use suites::MetricSuite;
