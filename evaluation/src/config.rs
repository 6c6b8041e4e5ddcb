use std::path::PathBuf;

use crate::chat_format::{BosPolicy, ChatFormatKind};
use crate::error::{EvalError, Result};

#[derive(Clone, Debug)]
pub struct PromptConfig {
    /// Chance of using the canonical instruction instead of a rewrite.
    pub original_instruction_probability: f64,
    /// Chance of rendering the query without few-shot exemplars.
    pub zero_shot_probability: f64,
    pub chat_format: ChatFormatKind,
    pub bos: BosPolicy,
    pub num_exemplars: usize,
    /// `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl PromptConfig {
    /// Benchmark defaults: canonical instructions with three-shot context.
    pub fn evaluation() -> Self {
        Self {
            original_instruction_probability: 1.0,
            zero_shot_probability: 0.0,
            chat_format: ChatFormatKind::Llama3,
            bos: BosPolicy::default(),
            num_exemplars: 3,
            seed: None,
        }
    }

    /// Canonical instruction and the raw input, no sampling at all.
    pub fn zero_shot() -> Self {
        Self {
            zero_shot_probability: 1.0,
            ..Self::evaluation()
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_probability("original_instruction_probability", self.original_instruction_probability)?;
        check_probability("zero_shot_probability", self.zero_shot_probability)
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EvalError::InvalidProbability { name, value })
    }
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    /// Directory holding one JSON task document per task.
    pub benchmark_root: PathBuf,
    /// Optional `RewriteDefinitions.json` with paraphrased instructions.
    pub definitions_path: Option<PathBuf>,
    pub limit: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub file_prefix: String,
}

impl OutputConfig {
    pub fn predictions() -> Self {
        Self {
            output_dir: PathBuf::from("prediction_results"),
            file_prefix: "eval_results".to_string(),
        }
    }

    /// `eval_results_{benchmark}_{ctx}_context_{ori}_oriINS_{model}.csv`
    ///
    /// The model type stays the last `_` segment so scoring can recover it.
    pub fn prediction_path(&self, benchmark: &str, prompt: &PromptConfig) -> PathBuf {
        let context = (1.0 - prompt.zero_shot_probability) as u32;
        let original = prompt.original_instruction_probability as u32;
        let model = prompt.chat_format.model_type().replace('_', "-");
        self.output_dir.join(format!(
            "{}_{}_{}_context_{}_oriINS_{}.csv",
            self.file_prefix, benchmark, context, original, model
        ))
    }
}

#[derive(Clone, Debug)]
pub struct TaskConfig {
    pub prompt: PromptConfig,
    pub data: DataConfig,
    pub output: OutputConfig,
}

impl TaskConfig {
    pub fn evaluation(benchmark_root: impl Into<PathBuf>) -> Self {
        Self {
            prompt: PromptConfig::evaluation(),
            data: DataConfig {
                benchmark_root: benchmark_root.into(),
                definitions_path: None,
                limit: None,
            },
            output: OutputConfig::predictions(),
        }
    }

    /// Name of the benchmark directory, used in prediction file names.
    pub fn benchmark_name(&self) -> String {
        self.data
            .benchmark_root
            .file_name()
            .map(|n| n.to_string_lossy().replace('_', "-"))
            .unwrap_or_else(|| "benchmark".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_validation() {
        assert!(PromptConfig::evaluation().validate().is_ok());
        let bad = PromptConfig {
            zero_shot_probability: 1.5,
            ..PromptConfig::evaluation()
        };
        assert!(matches!(
            bad.validate(),
            Err(EvalError::InvalidProbability { name: "zero_shot_probability", .. })
        ));
    }

    #[test]
    fn test_prediction_path_keeps_model_last() {
        let config = TaskConfig::evaluation("/data/Benchmarks/MedS_Bench");
        let path = config.output.prediction_path(&config.benchmark_name(), &config.prompt);
        assert_eq!(
            path,
            PathBuf::from("prediction_results/eval_results_MedS-Bench_1_context_1_oriINS_Llama 3.csv")
        );
    }
}
