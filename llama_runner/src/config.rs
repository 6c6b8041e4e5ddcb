use std::num::NonZeroU32;

#[derive(Clone, Debug)]
pub struct LlamaConfig {
    pub model_path: Option<String>,
    pub seed: i64,
    pub threads: i32,
    pub context_size: NonZeroU32,
    /// Maximum number of newly generated tokens.
    pub max_new_tokens: i32,
    /// GPU ordinal the model weights are placed on. `None` keeps llama.cpp's default.
    pub gpu: Option<i32>,
}

impl LlamaConfig {
    pub fn new() -> Self {
        Self {
            model_path: None,
            seed: 1337,
            threads: 4,
            context_size: NonZeroU32::MIN.saturating_add(2047),
            max_new_tokens: 200,
            gpu: None,
        }
    }

    pub fn with_model_path(mut self, model_path: impl Into<String>) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    pub fn with_gpu(mut self, gpu: i32) -> Self {
        self.gpu = Some(gpu);
        self
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: i32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }
}

impl Default for LlamaConfig {
    fn default() -> Self {
        Self::new()
    }
}
