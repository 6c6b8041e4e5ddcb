use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::info;

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) - {msg}";

pub struct ProgressTracker {
    bar: ProgressBar,
    start_time: Instant,
    tokens_generated: usize,
    completed_samples: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self::with_bar(bar)
    }

    /// A tracker that counts but never draws.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            start_time: Instant::now(),
            tokens_generated: 0,
            completed_samples: 0,
        }
    }

    pub fn update(&mut self, message: impl Into<String>) {
        self.completed_samples += 1;
        self.bar.inc(1);

        let elapsed = self.start_time.elapsed().as_secs_f64();
        if self.tokens_generated > 0 && elapsed > 0.0 {
            let rate = self.tokens_generated as f64 / elapsed;
            self.bar.set_message(format!("{} - {:.2} tokens/sec", message.into(), rate));
        } else {
            self.bar.set_message(message.into());
        }
    }

    pub fn add_tokens(&mut self, tokens: usize) {
        self.tokens_generated += tokens;
    }

    pub fn completed(&self) -> usize {
        self.completed_samples
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());

        let total_elapsed = self.start_time.elapsed().as_secs_f64();
        info!(
            "Processed {} samples in {:.2}s ({} tokens generated)",
            self.completed_samples, total_elapsed, self.tokens_generated
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_samples_and_tokens() {
        let mut progress = ProgressTracker::hidden();
        progress.add_tokens(12);
        progress.update("task41");
        progress.update("task42");
        assert_eq!(progress.completed(), 2);
        progress.finish("done");
    }
}
