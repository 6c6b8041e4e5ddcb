//! Named scoring presets for the benchmark's task categories.

use std::path::PathBuf;

use crate::engine::{MetricEngine, ScoringPlan, TaskGroup};
use crate::error::{EvalError, Result};
use crate::metrics::{
    BinaryOutcome, Containment, EntityF1, Generation, Language, MultiLabel, MultipleChoice, TaskMetric, TextNormalizer,
};

const RESULTS_DIR: &str = "results";

/// A metric family, its default columns and its default report path.
#[derive(Debug)]
pub struct MetricSuite {
    pub name: &'static str,
    pub metric: Box<dyn TaskMetric>,
    pub plan: ScoringPlan,
    pub output: PathBuf,
}

impl MetricSuite {
    pub const NAMES: [&'static str; 14] = [
        "clinical_outcome",
        "mcqa",
        "ner",
        "nli",
        "nli_generation",
        "information_extraction",
        "diagnosis",
        "treatment_planning",
        "fact_verification",
        "fact_verification_rationale",
        "explanation",
        "reasoning",
        "summarization",
        "text_classification",
    ];

    fn new(name: &'static str, metric: impl TaskMetric + 'static, task_ids: &[&str], report: &str) -> Self {
        Self {
            name,
            metric: Box::new(metric),
            plan: ScoringPlan::new(task_ids.iter().copied()),
            output: PathBuf::from(RESULTS_DIR).join(report),
        }
    }

    pub fn by_name(name: &str) -> Result<Self> {
        let suite = match name {
            "clinical_outcome" => Self::new(
                "clinical_outcome",
                BinaryOutcome,
                &["task117", "task118", "task119"],
                "Clinical_outcome_prediction_metrics.csv",
            ),
            "mcqa" => Self::new(
                "mcqa",
                MultipleChoice::default(),
                &[
                    "task4", "task5", "task6", "task8", "task9", "task57", "task58", "task59", "task60", "task61", "task122",
                    "task123", "task129",
                ],
                "MCQA_metrics.csv",
            ),
            "ner" => Self::new("ner", EntityF1, &["task125", "task126", "task127", "task128"], "Hard_NER_metrics.csv"),
            "nli" => Self::new(
                "nli",
                Containment::new(TextNormalizer::lowercase().removing(["."]), TextNormalizer::lowercase()),
                &["task41"],
                "NLI_metrics.csv",
            ),
            "nli_generation" => Self::new("nli_generation", Generation::default(), &["task42"], "NLI_GEN_metrics.csv"),
            "information_extraction" => {
                let quotes = || TextNormalizer::lowercase().removing(["\"", "'", "\n"]);
                Self::new(
                    "information_extraction",
                    Containment::new(quotes(), quotes()),
                    &["task1", "task2", "task3", "task29", "task74"],
                    "information_extraction_metrics.csv",
                )
            }
            "diagnosis" => Self::new(
                "diagnosis",
                Containment::new(
                    TextNormalizer::lowercase().removing([".", "the diagnosis result is"]),
                    TextNormalizer::lowercase(),
                ),
                &[],
                "Diagnosis_metrics.csv",
            ),
            "treatment_planning" => Self::new(
                "treatment_planning",
                Containment::new(
                    TextNormalizer::lowercase().removing([".", "the treatment planning is:"]),
                    TextNormalizer::lowercase(),
                ),
                &["task131"],
                "Treatment_planning_metrics.csv",
            ),
            "fact_verification" => Self::new(
                "fact_verification",
                Containment::new(TextNormalizer::lowercase().removing(["."]), TextNormalizer::lowercase().first_line()),
                &["task12", "task16"],
                "Fact_verification_metrics.csv",
            ),
            "fact_verification_rationale" => Self::new(
                "fact_verification_rationale",
                Generation::default()
                    .with_normalizers(TextNormalizer::lowercase().removing(["."]), TextNormalizer::lowercase()),
                &["task100"],
                "Fact_verification_rationale_metrics.csv",
            ),
            "explanation" => Self::new(
                "explanation",
                Generation::default(),
                &["task18", "task46", "task50"],
                "Explanation_metrics.csv",
            ),
            "reasoning" => Self::new(
                "reasoning",
                Generation::default()
                    .with_language("task51", Language::Chinese)
                    .with_language("task52", Language::English)
                    .with_language("task53", Language::French)
                    .with_language("task54", Language::Japanese)
                    .with_language("task55", Language::Russian)
                    .with_language("task56", Language::Spanish)
                    .skipping_empty(),
                &["task51", "task52", "task53", "task54", "task55", "task56"],
                "Reasoning_metrics.csv",
            ),
            "summarization" => {
                let mut suite = Self::new(
                    "summarization",
                    Generation::default(),
                    &["task78", "task114", "task112", "task110"],
                    "Summarization_metrics.csv",
                );
                suite.plan = suite
                    .plan
                    .with_group(TaskGroup::new("CT", ["task83", "task84", "task85", "task86", "task87", "task88"]))
                    .with_group(TaskGroup::new("MRI", ["task89", "task90", "task91", "task92", "task93", "task94"]));
                suite
            }
            "text_classification" => Self::new(
                "text_classification",
                MultiLabel::hallmarks_of_cancer(),
                &["task106"],
                "Text_classification_metrics.csv",
            ),
            other => return Err(EvalError::UnknownSuite(other.to_string())),
        };
        Ok(suite)
    }

    /// Replaces the default task columns. Groups are kept.
    pub fn with_task_ids(mut self, task_ids: Vec<String>) -> Self {
        self.plan.task_ids = task_ids;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn into_engine(self) -> MetricEngine {
        MetricEngine::new(self.metric, self.plan)
    }
}
