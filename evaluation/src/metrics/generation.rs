use std::collections::HashMap;
use tracing::debug;

use super::{BleuCalculator, Language, MetricValue, RougeCalculator, TaskMetric, TextNormalizer};
use crate::records::PredictionRecord;

/// Free-text answers scored by mean sentence BLEU-1 and ROUGE-L F1.
#[derive(Debug, Clone)]
pub struct Generation {
    pub default_language: Language,
    /// Per-task language, for multilingual task families.
    pub languages: HashMap<String, Language>,
    pub gt: TextNormalizer,
    pub output: TextNormalizer,
    /// Drop records whose normalized text is empty instead of scoring them zero.
    pub skip_empty: bool,
    bleu: BleuCalculator,
    rouge: RougeCalculator,
}

impl Generation {
    pub fn new(default_language: Language) -> Self {
        Self {
            default_language,
            languages: HashMap::new(),
            gt: TextNormalizer::default(),
            output: TextNormalizer::default(),
            skip_empty: false,
            bleu: BleuCalculator::unigram(),
            rouge: RougeCalculator,
        }
    }

    pub fn with_language(mut self, task_id: impl Into<String>, language: Language) -> Self {
        self.languages.insert(task_id.into(), language);
        self
    }

    pub fn with_normalizers(mut self, gt: TextNormalizer, output: TextNormalizer) -> Self {
        self.gt = gt;
        self.output = output;
        self
    }

    pub fn skipping_empty(mut self) -> Self {
        self.skip_empty = true;
        self
    }

    pub fn language_for(&self, task_id: &str) -> Language {
        self.languages.get(task_id).copied().unwrap_or(self.default_language)
    }

    /// BLEU-1 and ROUGE-L F1 of one answer, both in [0, 1].
    pub fn similarity(&self, language: Language, gt: &str, output: &str) -> (f64, f64) {
        let reference = language.tokenize(gt);
        let candidate = language.tokenize(output);
        (
            self.bleu.score(&candidate, &reference),
            self.rouge.rouge_l(&candidate, &reference).f1,
        )
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new(Language::English)
    }
}

impl TaskMetric for Generation {
    fn name(&self) -> &'static str {
        "bleu-rouge"
    }

    fn empty(&self) -> MetricValue {
        MetricValue::Pair(0.0, 0.0)
    }

    fn score(&self, task_id: &str, records: &[&PredictionRecord]) -> MetricValue {
        let language = self.language_for(task_id);
        let (mut bleu_sum, mut rouge_sum, mut count) = (0.0, 0.0, 0usize);

        for (gt, output) in records.iter().filter_map(|r| r.pair()) {
            let gt = self.gt.apply(gt);
            let output = self.output.apply(output);
            if gt.is_empty() || output.is_empty() {
                if self.skip_empty {
                    continue;
                }
                debug!("{}: empty answer scored as zero", task_id);
                count += 1;
                continue;
            }

            let (bleu, rouge) = self.similarity(language, &gt, &output);
            bleu_sum += bleu;
            rouge_sum += rouge;
            count += 1;
        }

        if count == 0 {
            return self.empty();
        }
        MetricValue::Pair(100.0 * bleu_sum / count as f64, 100.0 * rouge_sum / count as f64)
    }
}
