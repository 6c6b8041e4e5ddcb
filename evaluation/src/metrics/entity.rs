use std::collections::BTreeSet;
use std::ops::AddAssign;

use super::{MetricValue, TaskMetric};
use crate::records::PredictionRecord;

/// Answer meaning "no entities". The misspelling is what the task data uses.
pub const NO_ENTITY: &str = "there is no related enetity";
pub const NO_ENTITY_ALIAS: &str = "there is no related entity";

/// Normalized entity mentions of one answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet(BTreeSet<String>);

impl EntitySet {
    /// Lowercases, trims, strips a trailing period and splits on `", "`.
    pub fn parse(text: &str) -> Self {
        let text = text.trim().to_lowercase();
        let text = text.strip_suffix('.').unwrap_or(&text).trim();
        if text == NO_ENTITY || text == NO_ENTITY_ALIAS {
            return Self::default();
        }
        Self(
            text.split(", ")
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.0.contains(entity)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl EntityCounts {
    pub fn compare(gt: &EntitySet, output: &EntitySet) -> Self {
        let tp = gt.0.intersection(&output.0).count();
        Self {
            tp,
            fp: output.len() - tp,
            fn_: gt.len() - tp,
        }
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }
}

impl AddAssign for EntityCounts {
    fn add_assign(&mut self, other: Self) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.fn_ += other.fn_;
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Micro-averaged F1 over every entity mention of a task.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityF1;

impl TaskMetric for EntityF1 {
    fn name(&self) -> &'static str {
        "entity-f1"
    }

    fn empty(&self) -> MetricValue {
        MetricValue::Scalar(0.0)
    }

    fn score(&self, _task_id: &str, records: &[&PredictionRecord]) -> MetricValue {
        let mut totals = EntityCounts::default();
        for (gt, output) in records.iter().filter_map(|r| r.pair()) {
            totals += EntityCounts::compare(&EntitySet::parse(gt), &EntitySet::parse(output));
        }
        MetricValue::Scalar(100.0 * totals.f1())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_entities() {
        let set = EntitySet::parse("Fever, Cough, chest pain.");
        assert_eq!(set.len(), 3);
        assert!(set.contains("chest pain"));
        assert!(EntitySet::parse("There is no related enetity.").is_empty());
        assert!(EntitySet::parse("there is no related entity").is_empty());
        assert!(EntitySet::parse("  ").is_empty());
    }

    #[test]
    fn test_partial_recall() {
        let counts = EntityCounts::compare(&EntitySet::parse("fever, cough"), &EntitySet::parse("cough"));
        assert_eq!(counts, EntityCounts { tp: 1, fp: 0, fn_: 1 });
        assert_relative_eq!(counts.precision(), 1.0);
        assert_relative_eq!(counts.recall(), 0.5);
        assert_relative_eq!(counts.f1(), 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_both_sentinel() {
        let counts = EntityCounts::compare(&EntitySet::parse(NO_ENTITY), &EntitySet::parse(NO_ENTITY_ALIAS));
        assert_eq!(counts, EntityCounts::default());
        assert_eq!(counts.f1(), 0.0);
    }

    #[test]
    fn test_micro_average_across_instances() {
        let records = [
            PredictionRecord::new("task125", "", "fever, cough.", "cough."),
            PredictionRecord::new("task125", "", "aspirin.", "aspirin, ibuprofen."),
            PredictionRecord::new("task125", "", NO_ENTITY, NO_ENTITY),
        ];
        let refs = records.iter().collect::<Vec<_>>();
        // tp 2, fp 1, fn 1: P = R = 2/3.
        let MetricValue::Scalar(f1) = EntityF1.score("task125", &refs) else {
            panic!("scalar expected");
        };
        assert_relative_eq!(f1, 200.0 / 3.0, epsilon = 1e-9);
    }
}
