use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use crate::chat_format::{ChatFormat, RenderedPrompt};
use crate::config::PromptConfig;
use crate::dataset::{Instance, TaskCatalog, TaskDefinition};
use crate::error::{EvalError, Result};

pub const FEW_SHOT_DIRECTIVE: &str = "Please learn from the few-shot cases to see what content you have to output.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionSource {
    Original,
    Rewrite,
}

/// One rendered model input together with the answer it is scored against.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSample {
    pub task_id: String,
    pub rendered_prompt: RenderedPrompt,
    pub expected_output: String,
    pub instruction_source: InstructionSource,
    /// Number of few-shot exemplars placed before the instruction.
    pub exemplars: usize,
    /// Rendered exemplars; empty for zero-shot prompts.
    pub few_shot_block: String,
}

/// Samples instructions and few-shot context for benchmark instances and
/// renders them in the configured chat format.
pub struct PromptBuilder<R> {
    catalog: TaskCatalog,
    config: PromptConfig,
    format: Box<dyn ChatFormat>,
    rng: R,
}

impl PromptBuilder<StdRng> {
    /// Seeds from `config.seed`, or from the operating system when unset.
    pub fn from_config(catalog: TaskCatalog, config: PromptConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(catalog, config, rng)
    }
}

impl<R: Rng> PromptBuilder<R> {
    pub fn new(catalog: TaskCatalog, config: PromptConfig, rng: R) -> Result<Self> {
        config.validate()?;
        if let Some(orphan) = catalog.instances().find(|i| catalog.definition(&i.task_id).is_none()) {
            return Err(EvalError::MissingDefinition { task_id: orphan.task_id.clone() });
        }
        let format = config.chat_format.build(&config.bos);
        debug!("Prompt builder using {} format for {}", format.name(), config.chat_format.model_type());
        Ok(Self { catalog, config, format, rng })
    }

    /// Replaces the format chosen by the configuration.
    pub fn with_format(mut self, format: Box<dyn ChatFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn build(&mut self, instance: &Instance) -> Result<PromptSample> {
        render_sample(&self.catalog, &self.config, &*self.format, &mut self.rng, instance)
    }

    /// Renders every instance of the catalog, in catalog order.
    #[instrument(skip(self))]
    pub fn build_all(&mut self, limit: Option<usize>) -> Result<Vec<PromptSample>> {
        let format = &*self.format;
        self.catalog
            .instances()
            .take(limit.unwrap_or(usize::MAX))
            .map(|instance| render_sample(&self.catalog, &self.config, format, &mut self.rng, instance))
            .collect()
    }
}

fn render_sample<R: Rng>(
    catalog: &TaskCatalog,
    config: &PromptConfig,
    format: &dyn ChatFormat,
    rng: &mut R,
    instance: &Instance,
) -> Result<PromptSample> {
    let definition = catalog
        .definition(&instance.task_id)
        .ok_or_else(|| EvalError::MissingDefinition { task_id: instance.task_id.clone() })?;

    let (mut instruction, instruction_source) = select_instruction(definition, config, rng);

    let mut query = instance.input.clone();
    let mut few_shot_block = String::new();
    let mut exemplars = 0;

    if rng.random::<f64>() > config.zero_shot_probability {
        let candidates = catalog
            .pool(&instance.task_id)
            .iter()
            .filter(|candidate| candidate.id != instance.id)
            .collect::<Vec<_>>();
        let chosen = candidates
            .choose_multiple(rng, config.num_exemplars.min(candidates.len()))
            .copied()
            .collect::<Vec<_>>();

        if !chosen.is_empty() {
            few_shot_block = render_exemplars(&chosen);
            instruction = format!("{few_shot_block}{instruction}{FEW_SHOT_DIRECTIVE}");
            query = format!("Input:\n{}\nOutput:\n", instance.input);
            exemplars = chosen.len();
        }
    }

    Ok(PromptSample {
        task_id: instance.task_id.clone(),
        rendered_prompt: format.render(&instruction, &query),
        expected_output: instance.output.canonical().to_string(),
        instruction_source,
        exemplars,
        few_shot_block,
    })
}

fn select_instruction<R: Rng>(
    definition: &TaskDefinition,
    config: &PromptConfig,
    rng: &mut R,
) -> (String, InstructionSource) {
    if rng.random::<f64>() <= config.original_instruction_probability {
        return (definition.original_instruction.clone(), InstructionSource::Original);
    }
    match definition.rewritten_instructions.choose(rng) {
        Some(rewrite) => (rewrite.clone(), InstructionSource::Rewrite),
        None => (definition.original_instruction.clone(), InstructionSource::Original),
    }
}

fn render_exemplars(exemplars: &[&Instance]) -> String {
    let cases = exemplars
        .iter()
        .map(|e| format!("Input:\n{}\n\nOutput:\n{}\n", e.input, e.output.canonical()))
        .collect::<Vec<_>>();
    format!("{}\n\n", cases.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_format::{ChatFormatKind, HeaderFormat, Role};
    use crate::dataset::GroundTruth;

    fn catalog(pool_size: usize) -> TaskCatalog {
        let definitions = vec![
            TaskDefinition::new("task41", "Decide the relation between the sentences.")
                .with_rewrites(["Classify entailment.", "Is it entailment, contradiction or neutral?"]),
            TaskDefinition::new("task7", "Answer."),
        ];
        let instances = (0..pool_size)
            .map(|i| Instance::new(i, "task41", format!("premise {i}"), format!("label {i}")))
            .chain(std::iter::once(Instance {
                id: 0,
                task_id: "task7".into(),
                input: "q".into(),
                output: GroundTruth::Choices(vec!["first".into(), "second".into()]),
            }))
            .collect::<Vec<_>>();
        TaskCatalog::new(definitions, instances).unwrap()
    }

    fn config(original: f64, zero_shot: f64) -> PromptConfig {
        PromptConfig {
            original_instruction_probability: original,
            zero_shot_probability: zero_shot,
            chat_format: ChatFormatKind::Llama3,
            ..PromptConfig::evaluation()
        }
    }

    fn turns(sample: &PromptSample) -> (String, String) {
        let turns = HeaderFormat::parse(sample.rendered_prompt.as_text().unwrap());
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[1].role, Role::User);
        (turns[0].content.clone(), turns[1].content.clone())
    }

    #[test]
    fn test_deterministic_when_both_probabilities_are_one() -> Result<()> {
        let catalog = catalog(5);
        let instance = catalog.pool("task41")[2].clone();
        for seed in [0u64, 7, 42, 1337] {
            let mut builder = PromptBuilder::new(catalog.clone(), config(1.0, 1.0), StdRng::seed_from_u64(seed))?;
            let sample = builder.build(&instance)?;
            assert_eq!(sample.instruction_source, InstructionSource::Original);
            assert_eq!(sample.exemplars, 0);
            assert_eq!(
                turns(&sample),
                ("Decide the relation between the sentences.".to_string(), "premise 2".to_string())
            );
        }
        Ok(())
    }

    #[test]
    fn test_few_shot_excludes_query_and_caps_at_three() -> Result<()> {
        let catalog = catalog(6);
        let instance = catalog.pool("task41")[4].clone();
        let mut builder = PromptBuilder::new(catalog, config(1.0, 0.0), StdRng::seed_from_u64(3))?;
        let sample = builder.build(&instance)?;

        assert_eq!(sample.exemplars, 3);
        assert_eq!(sample.few_shot_block.matches("Input:\n").count(), 3);
        assert!(!sample.few_shot_block.contains("premise 4"));
        assert!(sample.few_shot_block.ends_with("\n\n"));

        let (system, user) = turns(&sample);
        assert!(system.ends_with(&format!("Decide the relation between the sentences.{FEW_SHOT_DIRECTIVE}")));
        assert_eq!(user, "Input:\npremise 4\nOutput:");
        Ok(())
    }

    #[test]
    fn test_exemplar_layout() {
        let a = Instance::new(0, "t", "a in", "a out");
        let b = Instance::new(1, "t", "b in", GroundTruth::Choices(vec!["b out".into(), "alt".into()]));
        assert_eq!(
            render_exemplars(&[&a, &b]),
            "Input:\na in\n\nOutput:\na out\n\n\nInput:\nb in\n\nOutput:\nb out\n\n\n"
        );
    }

    #[test]
    fn test_single_instance_pool_falls_back_to_zero_shot() -> Result<()> {
        let catalog = catalog(1);
        let instance = catalog.pool("task41")[0].clone();
        let mut builder = PromptBuilder::new(catalog, config(1.0, 0.0), StdRng::seed_from_u64(11))?;
        let sample = builder.build(&instance)?;
        assert_eq!(sample.exemplars, 0);
        assert!(sample.few_shot_block.is_empty());
        assert_eq!(turns(&sample).1, "premise 0");
        Ok(())
    }

    #[test]
    fn test_rewrites_are_used_when_original_probability_is_zero() -> Result<()> {
        let catalog = catalog(3);
        let instance = catalog.pool("task41")[0].clone();
        let mut builder = PromptBuilder::new(catalog, config(0.0, 1.0), StdRng::seed_from_u64(5))?;
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            let sample = builder.build(&instance)?;
            assert_eq!(sample.instruction_source, InstructionSource::Rewrite);
            seen.insert(turns(&sample).0);
        }
        assert!(seen.iter().all(|s| s == "Classify entailment." || s == "Is it entailment, contradiction or neutral?"));
        assert_eq!(seen.len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_rewrite_pool_falls_back_to_original() -> Result<()> {
        let catalog = catalog(1);
        let instance = catalog.pool("task7")[0].clone();
        let mut builder = PromptBuilder::new(catalog, config(0.0, 1.0), StdRng::seed_from_u64(1))?;
        let sample = builder.build(&instance)?;
        assert_eq!(sample.instruction_source, InstructionSource::Original);
        assert_eq!(sample.expected_output, "first");
        Ok(())
    }

    #[test]
    fn test_same_seed_reproduces_prompts() -> Result<()> {
        let render = |seed| -> Result<Vec<PromptSample>> {
            let mut builder = PromptBuilder::new(catalog(8), config(0.5, 0.5), StdRng::seed_from_u64(seed))?;
            builder.build_all(None)
        };
        assert_eq!(render(99)?, render(99)?);
        assert_eq!(render(99)?.len(), 9);
        Ok(())
    }

    #[test]
    fn test_unknown_task_is_configuration_error() -> Result<()> {
        let mut builder = PromptBuilder::new(catalog(2), config(1.0, 1.0), StdRng::seed_from_u64(0))?;
        let err = builder.build(&Instance::new(0, "task999", "x", "y")).unwrap_err();
        assert!(err.is_configuration());
        Ok(())
    }

    #[test]
    fn test_build_all_respects_limit() -> Result<()> {
        let mut builder = PromptBuilder::from_config(catalog(4), PromptConfig { seed: Some(1), ..config(1.0, 0.0) })?;
        assert_eq!(builder.len(), 5);
        assert_eq!(builder.build_all(Some(2))?.len(), 2);
        Ok(())
    }
}
