use anyhow::Result;
use std::collections::VecDeque;

use crate::TextGenerator;

/// Replays canned completions and remembers every prompt it was given.
///
/// Used for dry runs of the evaluation driver and in tests. Once the queue is
/// drained the fallback completion is returned.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: VecDeque<String>,
    fallback: String,
    pub prompts: Vec<String>,
}

impl MockRunner {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            responses: VecDeque::new(),
            fallback: fallback.into(),
            prompts: Vec::new(),
        }
    }

    pub fn with_responses<I, S>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.responses.extend(responses.into_iter().map(Into::into));
        self
    }
}

impl TextGenerator for MockRunner {
    fn generate(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        Ok(self
            .responses
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_then_falls_back() -> Result<()> {
        let mut runner = MockRunner::new("done").with_responses(["A", "B"]);
        assert_eq!(runner.generate("p1")?, "A");
        assert_eq!(runner.generate("p2")?, "B");
        assert_eq!(runner.generate("p3")?, "done");
        assert_eq!(runner.prompts, vec!["p1", "p2", "p3"]);
        Ok(())
    }
}
