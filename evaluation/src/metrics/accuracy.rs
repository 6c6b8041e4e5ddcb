use std::collections::HashMap;

use super::{percentage, MetricValue, TaskMetric, TextNormalizer};
use crate::records::PredictionRecord;

fn accuracy<F>(records: &[&PredictionRecord], passes: F) -> MetricValue
where
    F: Fn(&str, &str) -> bool,
{
    let passed = records
        .iter()
        .filter_map(|r| r.pair())
        .filter(|&(gt, output)| passes(gt, output))
        .count();
    MetricValue::Scalar(percentage(passed, records.len()))
}

/// `true`/`false` outcome prediction. An output mentioning both never passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryOutcome;

impl BinaryOutcome {
    pub fn matches(gt: &str, output: &str) -> bool {
        let gt = gt.trim().to_lowercase();
        let output = output.trim().to_lowercase();
        let (says_true, says_false) = (output.contains("true"), output.contains("false"));
        match gt.as_str() {
            "true" => says_true && !says_false,
            "false" => says_false && !says_true,
            _ => false,
        }
    }
}

impl TaskMetric for BinaryOutcome {
    fn name(&self) -> &'static str {
        "binary-outcome"
    }

    fn empty(&self) -> MetricValue {
        MetricValue::Scalar(0.0)
    }

    fn score(&self, _task_id: &str, records: &[&PredictionRecord]) -> MetricValue {
        accuracy(records, Self::matches)
    }
}

/// Passes when the normalized ground truth occurs inside the normalized output.
#[derive(Debug, Clone)]
pub struct Containment {
    pub gt: TextNormalizer,
    pub output: TextNormalizer,
}

impl Containment {
    pub fn new(gt: TextNormalizer, output: TextNormalizer) -> Self {
        Self { gt, output }
    }

    pub fn matches(&self, gt: &str, output: &str) -> bool {
        self.output.apply(output).contains(&self.gt.apply(gt))
    }
}

impl Default for Containment {
    fn default() -> Self {
        Self::new(TextNormalizer::lowercase(), TextNormalizer::lowercase())
    }
}

impl TaskMetric for Containment {
    fn name(&self) -> &'static str {
        "containment"
    }

    fn empty(&self) -> MetricValue {
        MetricValue::Scalar(0.0)
    }

    fn score(&self, _task_id: &str, records: &[&PredictionRecord]) -> MetricValue {
        accuracy(records, |gt, output| self.matches(gt, output))
    }
}

const ANSWER_PREFIX: &str = "the right answer is";

/// Compares the first character of the answer, e.g. `b` in `B. Aspirin`.
#[derive(Debug, Clone)]
pub struct MultipleChoice {
    pub letters: String,
    /// Letter sets for tasks that are not four-option questions.
    pub overrides: HashMap<String, String>,
}

impl MultipleChoice {
    pub fn new(letters: impl Into<String>) -> Self {
        Self {
            letters: letters.into(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, task_id: impl Into<String>, letters: impl Into<String>) -> Self {
        self.overrides.insert(task_id.into(), letters.into());
        self
    }

    fn letters_for(&self, task_id: &str) -> &str {
        self.overrides.get(task_id).map(String::as_str).unwrap_or(&self.letters)
    }

    pub fn matches(&self, task_id: &str, gt: &str, output: &str) -> bool {
        let letters = self.letters_for(task_id);
        let first = |text: &str| text.to_lowercase().replace(ANSWER_PREFIX, "").trim().chars().next();
        match (first(gt), first(output)) {
            (Some(g), Some(o)) => letters.contains(g) && letters.contains(o) && g == o,
            _ => false,
        }
    }
}

impl Default for MultipleChoice {
    /// Options `a`-`d`; task123 is a yes/no question.
    fn default() -> Self {
        Self::new("abcd").with_override("task123", "yn")
    }
}

impl TaskMetric for MultipleChoice {
    fn name(&self) -> &'static str {
        "multiple-choice"
    }

    fn empty(&self) -> MetricValue {
        MetricValue::Scalar(0.0)
    }

    fn score(&self, task_id: &str, records: &[&PredictionRecord]) -> MetricValue {
        accuracy(records, |gt, output| self.matches(task_id, gt, output))
    }
}
