use tracing::{debug, info, instrument, warn};

use crate::metrics::{MetricValue, TaskMetric};
use crate::records::{distinct_task_ids, PredictionRecord, PredictionTable};

/// Score of one task, or of one pooled task group.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskScore {
    pub label: String,
    pub value: MetricValue,
    /// Records that entered the score.
    pub scored: usize,
    /// Records dropped for a missing ground truth or output.
    pub skipped: usize,
}

/// Tasks scored together as one extra report column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGroup {
    pub name: String,
    pub task_ids: Vec<String>,
}

impl TaskGroup {
    pub fn new<I, S>(name: impl Into<String>, task_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            task_ids: task_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// The columns of a report: individual tasks, then pooled groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringPlan {
    /// Empty means every task found in the predictions.
    pub task_ids: Vec<String>,
    pub groups: Vec<TaskGroup>,
}

impl ScoringPlan {
    pub fn new<I, S>(task_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            task_ids: task_ids.into_iter().map(Into::into).collect(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: TaskGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Fills an empty task list with the distinct task ids of `tables`,
    /// in order of first appearance.
    pub fn resolve(&self, tables: &[PredictionTable]) -> Self {
        if !self.task_ids.is_empty() {
            return self.clone();
        }
        Self {
            task_ids: distinct_task_ids(tables.iter().flat_map(|t| &t.records)),
            groups: self.groups.clone(),
        }
    }
}

/// All scores of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelScores {
    pub model_name: String,
    pub tasks: Vec<TaskScore>,
    pub groups: Vec<TaskScore>,
    /// Unweighted mean over `tasks`; groups are not included.
    pub average: MetricValue,
}

fn score_records<'a, I>(label: &str, records: I, metric: &dyn TaskMetric) -> TaskScore
where
    I: IntoIterator<Item = &'a PredictionRecord>,
{
    let (usable, missing): (Vec<&PredictionRecord>, Vec<&PredictionRecord>) =
        records.into_iter().partition(|r| r.pair().is_some());
    if !missing.is_empty() {
        warn!("{}: skipping {} rows with a missing GT or output", label, missing.len());
    }

    let value = if usable.is_empty() {
        metric.empty()
    } else {
        metric.score(label, &usable)
    };
    debug!("{} {}: {} over {} rows", metric.name(), label, value, usable.len());

    TaskScore {
        label: label.to_string(),
        value,
        scored: usable.len(),
        skipped: missing.len(),
    }
}

/// Scores each task in `task_ids`, in that order. An empty list scores every
/// task present in `records`.
pub fn evaluate(records: &[PredictionRecord], task_ids: &[String], metric: &dyn TaskMetric) -> Vec<TaskScore> {
    let resolved;
    let task_ids: &[String] = if task_ids.is_empty() {
        resolved = distinct_task_ids(records);
        &resolved
    } else {
        task_ids
    };

    task_ids
        .iter()
        .map(|task_id| score_records(task_id, records.iter().filter(|r| &r.task_id == task_id), metric))
        .collect()
}

/// Unweighted mean, component-wise for pairs and triples. Empty input is zero.
pub fn aggregate(values: &[MetricValue]) -> MetricValue {
    let Some(first) = values.first() else {
        return MetricValue::Scalar(0.0);
    };

    let width = first.components().len();
    let mut sums = vec![0.0; width];
    for value in values {
        for (sum, component) in sums.iter_mut().zip(value.components()) {
            *sum += component;
        }
    }
    let means = sums.iter().map(|s| s / values.len() as f64).collect::<Vec<_>>();
    first.with_components(&means)
}

/// Applies one metric family to prediction tables according to a plan.
#[derive(Debug)]
pub struct MetricEngine {
    metric: Box<dyn TaskMetric>,
    plan: ScoringPlan,
}

impl MetricEngine {
    pub fn new(metric: Box<dyn TaskMetric>, plan: ScoringPlan) -> Self {
        Self { metric, plan }
    }

    pub fn plan(&self) -> &ScoringPlan {
        &self.plan
    }

    pub fn metric(&self) -> &dyn TaskMetric {
        self.metric.as_ref()
    }

    fn score_with(&self, table: &PredictionTable, plan: &ScoringPlan) -> ModelScores {
        let tasks = evaluate(&table.records, &plan.task_ids, self.metric.as_ref());
        let groups = plan
            .groups
            .iter()
            .map(|group| {
                let pooled = table.records.iter().filter(|r| group.task_ids.contains(&r.task_id));
                score_records(&group.name, pooled, self.metric.as_ref())
            })
            .collect::<Vec<_>>();

        let average = if tasks.is_empty() {
            self.metric.empty()
        } else {
            aggregate(&tasks.iter().map(|t| t.value).collect::<Vec<_>>())
        };

        ModelScores {
            model_name: table.model_name.clone(),
            tasks,
            groups,
            average,
        }
    }

    pub fn score_table(&self, table: &PredictionTable) -> ModelScores {
        let plan = self.plan.resolve(std::slice::from_ref(table));
        self.score_with(table, &plan)
    }

    /// Scores several models against the same columns.
    #[instrument(skip_all, fields(metric = self.metric.name(), models = tables.len()))]
    pub fn score_tables(&self, tables: &[PredictionTable]) -> (ScoringPlan, Vec<ModelScores>) {
        let plan = self.plan.resolve(tables);
        let scores = tables.iter().map(|t| self.score_with(t, &plan)).collect::<Vec<_>>();
        for model in &scores {
            info!("{}: average {}", model.model_name, model.average);
        }
        (plan, scores)
    }
}
