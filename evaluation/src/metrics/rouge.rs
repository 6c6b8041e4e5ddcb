/// Precision, recall and F1 of a ROUGE comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RougeScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// ROUGE-L over pre-tokenized text, based on the longest common subsequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RougeCalculator;

impl RougeCalculator {
    fn lcs_length(&self, a: &[String], b: &[String]) -> usize {
        if a.is_empty() || b.is_empty() {
            return 0;
        }

        // Two rolling rows of the dp table.
        let mut prev = vec![0usize; b.len() + 1];
        let mut curr = vec![0usize; b.len() + 1];
        for x in a {
            for (j, y) in b.iter().enumerate() {
                curr[j + 1] = if x == y { prev[j] + 1 } else { prev[j + 1].max(curr[j]) };
            }
            std::mem::swap(&mut prev, &mut curr);
        }
        prev[b.len()]
    }

    /// Tokens are lowercased and punctuation-only tokens are ignored.
    pub fn rouge_l(&self, candidate: &[&str], reference: &[&str]) -> RougeScore {
        let candidate = normalize(candidate);
        let reference = normalize(reference);
        if candidate.is_empty() || reference.is_empty() {
            return RougeScore::default();
        }

        let lcs = self.lcs_length(&candidate, &reference) as f64;
        let precision = lcs / candidate.len() as f64;
        let recall = lcs / reference.len() as f64;
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        RougeScore { precision, recall, f1 }
    }
}

fn normalize(tokens: &[&str]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn test_rouge_l_subsequence() {
        let score = RougeCalculator.rouge_l(&words("the cat sat on the mat"), &words("the cat is on the mat"));
        assert_relative_eq!(score.precision, 5.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(score.recall, 5.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(score.f1, 5.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rouge_l_case_and_punctuation() {
        let score = RougeCalculator.rouge_l(&["No", "fever", "."], &["no", "fever"]);
        assert_relative_eq!(score.f1, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rouge_l_partial() {
        // LCS "a c" of length 2: P = 2/3, R = 2/2.
        let score = RougeCalculator.rouge_l(&words("a x c"), &words("a c"));
        assert_relative_eq!(score.precision, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(score.recall, 1.0, epsilon = 1e-12);
        assert_relative_eq!(score.f1, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_rouge_l_empty() {
        assert_eq!(RougeCalculator.rouge_l(&[], &words("a")), RougeScore::default());
        assert_eq!(RougeCalculator.rouge_l(&["."], &words("a")).f1, 0.0);
    }
}
