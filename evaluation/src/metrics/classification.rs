use super::{MetricValue, TaskMetric};
use crate::records::PredictionRecord;

/// Labels of the cancer hallmarks classification task (task106).
pub const HALLMARKS_OF_CANCER: [&str; 10] = [
    "sustaining proliferative signaling",
    "evading growth suppressors",
    "resisting cell death",
    "enabling replicative immortality",
    "inducing angiogenesis",
    "activating invasion and metastasis",
    "genomic instability and mutation",
    "tumor promoting inflammation",
    "cellular energetics",
    "avoiding immune destruction",
];

/// Macro-averaged precision, recall and F1 over a fixed label vocabulary.
///
/// A label is assigned to an answer when its name occurs in the lowercased
/// text. Every vocabulary label counts towards the average, including labels
/// that never occur; a label with an empty denominator scores zero.
#[derive(Debug, Clone)]
pub struct MultiLabel {
    vocabulary: Vec<String>,
}

impl MultiLabel {
    pub fn new<I, S>(vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            vocabulary: vocabulary.into_iter().map(|l| l.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn hallmarks_of_cancer() -> Self {
        Self::new(HALLMARKS_OF_CANCER)
    }

    fn labels(&self, text: &str) -> Vec<bool> {
        let text = text.trim().to_lowercase();
        self.vocabulary.iter().map(|label| text.contains(label.as_str())).collect()
    }
}

impl TaskMetric for MultiLabel {
    fn name(&self) -> &'static str {
        "multi-label"
    }

    fn empty(&self) -> MetricValue {
        MetricValue::Triple(0.0, 0.0, 0.0)
    }

    fn score(&self, _task_id: &str, records: &[&PredictionRecord]) -> MetricValue {
        if self.vocabulary.is_empty() {
            return self.empty();
        }

        // (tp, fp, fn) per label
        let mut counts = vec![(0usize, 0usize, 0usize); self.vocabulary.len()];
        for (gt, output) in records.iter().filter_map(|r| r.pair()) {
            let truth = self.labels(gt);
            let predicted = self.labels(output);
            for (count, (t, p)) in counts.iter_mut().zip(truth.into_iter().zip(predicted)) {
                match (t, p) {
                    (true, true) => count.0 += 1,
                    (false, true) => count.1 += 1,
                    (true, false) => count.2 += 1,
                    (false, false) => {}
                }
            }
        }

        let safe = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let n = counts.len() as f64;
        let precision = counts.iter().map(|&(tp, fp, _)| safe(tp, tp + fp)).sum::<f64>() / n;
        let recall = counts.iter().map(|&(tp, _, fn_)| safe(tp, tp + fn_)).sum::<f64>() / n;
        let f1 = counts.iter().map(|&(tp, fp, fn_)| safe(2 * tp, 2 * tp + fp + fn_)).sum::<f64>() / n;

        MetricValue::Triple(100.0 * precision, 100.0 * recall, 100.0 * f1)
    }
}
