use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothingMethod {
    None,
    /// Replaces a zero n-gram match count with a small constant.
    Epsilon(f64),
}

/// Sentence-level BLEU against a single reference.
#[derive(Debug, Clone)]
pub struct BleuCalculator {
    pub weights: Vec<f64>,
    pub smoothing: SmoothingMethod,
}

impl BleuCalculator {
    pub fn new(weights: Vec<f64>) -> Self {
        Self {
            weights,
            smoothing: SmoothingMethod::None,
        }
    }

    /// BLEU-1: unigram precision only, epsilon 0.1 smoothing.
    pub fn unigram() -> Self {
        Self::new(vec![1.0, 0.0, 0.0, 0.0]).with_smoothing(SmoothingMethod::Epsilon(0.1))
    }

    pub fn with_smoothing(mut self, smoothing: SmoothingMethod) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Clipped n-gram matches and the candidate's n-gram count.
    fn modified_precision(&self, candidate: &[&str], reference: &[&str], n: usize) -> (usize, usize) {
        let candidate_counts = count_ngrams(candidate, n);
        let reference_counts = count_ngrams(reference, n);

        let clipped = candidate_counts
            .iter()
            .map(|(ngram, count)| (*count).min(reference_counts.get(*ngram).copied().unwrap_or(0)))
            .sum();
        let total = candidate.len().saturating_sub(n - 1).max(1);
        (clipped, total)
    }

    fn brevity_penalty(&self, candidate_len: usize, reference_len: usize) -> f64 {
        if candidate_len > reference_len {
            1.0
        } else {
            (1.0 - reference_len as f64 / candidate_len as f64).exp()
        }
    }

    /// Score in [0, 1]. Zero for an empty candidate or when no unigram matches.
    pub fn score(&self, candidate: &[&str], reference: &[&str]) -> f64 {
        if candidate.is_empty() {
            return 0.0;
        }

        let mut log_sum = 0.0;
        for (i, weight) in self.weights.iter().enumerate() {
            let n = i + 1;
            let (matches, total) = self.modified_precision(candidate, reference, n);
            if n == 1 && matches == 0 {
                return 0.0;
            }
            if *weight == 0.0 {
                continue;
            }

            let precision = match (matches, self.smoothing) {
                (0, SmoothingMethod::None) => return 0.0,
                (0, SmoothingMethod::Epsilon(epsilon)) => epsilon / total as f64,
                (m, _) => m as f64 / total as f64,
            };
            log_sum += weight * precision.ln();
        }

        self.brevity_penalty(candidate.len(), reference.len()) * log_sum.exp()
    }
}

impl Default for BleuCalculator {
    fn default() -> Self {
        Self::unigram()
    }
}

fn count_ngrams<'t, 's>(tokens: &'t [&'s str], n: usize) -> HashMap<&'t [&'s str], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn test_identical_sentences() {
        let bleu = BleuCalculator::unigram();
        let tokens = words("the patient has a fever");
        assert_relative_eq!(bleu.score(&tokens, &tokens), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_clipped_unigram_precision() {
        let bleu = BleuCalculator::unigram();
        // 2 of 4 candidate tokens match once clipped; no brevity penalty at equal length.
        let score = bleu.score(&words("the the the fever"), &words("the patient has fever"));
        assert_relative_eq!(score, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_brevity_penalty() {
        let bleu = BleuCalculator::unigram();
        let score = bleu.score(&words("fever"), &words("the patient has fever"));
        assert_relative_eq!(score, (1.0f64 - 4.0).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_no_overlap_and_empty() {
        let bleu = BleuCalculator::unigram();
        assert_eq!(bleu.score(&words("cough"), &words("fever")), 0.0);
        assert_eq!(bleu.score(&[], &words("fever")), 0.0);
    }

    #[test]
    fn test_epsilon_smoothing_on_higher_orders() {
        let reference = words("a b c d");
        let candidate = words("a c b d");
        let unsmoothed = BleuCalculator::new(vec![0.5, 0.5]);
        assert_eq!(unsmoothed.score(&candidate, &reference), 0.0);

        let smoothed = unsmoothed.with_smoothing(SmoothingMethod::Epsilon(0.1));
        let expected = (0.5 * 1.0f64.ln() + 0.5 * (0.1f64 / 3.0).ln()).exp();
        assert_relative_eq!(smoothed.score(&candidate, &reference), expected, epsilon = 1e-12);
    }
}
