use anyhow::Result;

pub mod config;
pub mod mock_runner;
#[cfg(feature = "llama-cpp")]
pub mod runner;

pub use config::LlamaConfig;
pub use mock_runner::MockRunner;
#[cfg(feature = "llama-cpp")]
pub use runner::LlamaRunner;

/// A blocking backend that turns one fully rendered prompt into a completion.
///
/// The prompt already carries any chat template, so implementations must not
/// wrap it again.
pub trait TextGenerator {
    fn generate(&mut self, prompt: &str) -> Result<String>;
}
