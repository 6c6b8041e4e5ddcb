//! Per-task scoring rules.
//!
//! Every family implements [`TaskMetric`]: it receives all prediction
//! records of one task (or one task group) whose ground truth and output are
//! both present, and returns a [`MetricValue`] on a 0-100 scale.

mod accuracy;
mod bleu;
mod classification;
mod entity;
mod generation;
mod rouge;
mod tokenize;

pub use accuracy::{BinaryOutcome, Containment, MultipleChoice};
pub use bleu::{BleuCalculator, SmoothingMethod};
pub use classification::MultiLabel;
pub use entity::{EntityCounts, EntityF1, EntitySet, NO_ENTITY, NO_ENTITY_ALIAS};
pub use generation::Generation;
pub use rouge::{RougeCalculator, RougeScore};
pub use tokenize::Language;

use std::fmt;

use crate::records::PredictionRecord;

/// A score on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Scalar(f64),
    /// BLEU-1 / ROUGE-L.
    Pair(f64, f64),
    /// Precision / recall / F1.
    Triple(f64, f64, f64),
}

impl MetricValue {
    pub fn components(&self) -> Vec<f64> {
        match *self {
            MetricValue::Scalar(a) => vec![a],
            MetricValue::Pair(a, b) => vec![a, b],
            MetricValue::Triple(a, b, c) => vec![a, b, c],
        }
    }

    /// The same shape with every component set to zero.
    pub fn zeroed(&self) -> Self {
        match self {
            MetricValue::Scalar(_) => MetricValue::Scalar(0.0),
            MetricValue::Pair(..) => MetricValue::Pair(0.0, 0.0),
            MetricValue::Triple(..) => MetricValue::Triple(0.0, 0.0, 0.0),
        }
    }

    /// Builds a value of the same shape from new components. Missing
    /// components are zero.
    pub fn with_components(&self, components: &[f64]) -> Self {
        let at = |i: usize| components.get(i).copied().unwrap_or(0.0);
        match self {
            MetricValue::Scalar(_) => MetricValue::Scalar(at(0)),
            MetricValue::Pair(..) => MetricValue::Pair(at(0), at(1)),
            MetricValue::Triple(..) => MetricValue::Triple(at(0), at(1), at(2)),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.components().iter().map(|c| format!("{c:.2}")).collect::<Vec<_>>();
        f.write_str(&parts.join("/"))
    }
}

pub trait TaskMetric: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// The value reported for a task with no scorable records.
    fn empty(&self) -> MetricValue;

    /// Scores the usable records of one task. `records` may be empty.
    fn score(&self, task_id: &str, records: &[&PredictionRecord]) -> MetricValue;
}

/// Text clean-up applied before comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextNormalizer {
    pub lowercase: bool,
    /// Substrings deleted after lowercasing.
    pub remove: Vec<String>,
    pub first_line_only: bool,
}

impl TextNormalizer {
    pub fn lowercase() -> Self {
        Self {
            lowercase: true,
            ..Self::default()
        }
    }

    pub fn removing<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn first_line(mut self) -> Self {
        self.first_line_only = true;
        self
    }

    pub fn apply(&self, text: &str) -> String {
        let text = if self.first_line_only { text.lines().next().unwrap_or("") } else { text };
        let mut text = if self.lowercase { text.to_lowercase() } else { text.to_string() };
        for pattern in &self.remove {
            text = text.replace(pattern.as_str(), "");
        }
        text.trim().to_string()
    }
}

/// Percentage of passing records; zero when there are none.
pub(crate) fn percentage(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * passed as f64 / total as f64
    }
}
