use anyhow::{bail, Result};
use llama_runner::TextGenerator;
use tracing::debug;

use crate::chat_format::{ChatFormat, HeaderFormat};

pub const DEFAULT_INSTRUCTION: &str = "If you are a doctor, please perform clinical consulting with the patient.";

/// Single-turn chat over a Llama 3 style medical model.
pub struct MedsChat<G> {
    generator: G,
    format: HeaderFormat,
}

impl<G: TextGenerator> MedsChat<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            format: HeaderFormat,
        }
    }

    /// Answers `query` under `instruction`. Multi-turn history is not
    /// supported, so `history` must be empty.
    pub fn chat(&mut self, history: &[(String, String)], query: &str, instruction: &str) -> Result<String> {
        if !history.is_empty() {
            bail!("Multi-turn chat is not supported; got {} previous turns", history.len());
        }

        let query = format!("Input:\n{query}\nOutput:\n");
        let prompt = self.format.render(instruction, &query).to_string();
        debug!("Chat prompt of {} chars", prompt.len());

        let completion = self.generator.generate(&prompt)?;
        Ok(completion.trim().to_string())
    }

    pub fn into_inner(self) -> G {
        self.generator
    }
}
