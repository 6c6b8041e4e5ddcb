use anyhow::{Context, Result};
use llama_runner::TextGenerator;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::progress::ProgressTracker;
use crate::prompt::{PromptBuilder, PromptSample};
use crate::records::PredictionRecord;
use crate::writer::PredictionWriter;

fn record_for(sample: &PromptSample, output: Option<String>) -> PredictionRecord {
    PredictionRecord {
        task_id: sample.task_id.clone(),
        input: sample.rendered_prompt.to_string(),
        gt: Some(sample.expected_output.clone()),
        output,
    }
}

/// Writes every rendered prompt with its ground truth and an empty `output`
/// column, for scoring runs where generation happens elsewhere.
#[instrument(skip(builder))]
pub fn render_prompts<R: Rng>(builder: &mut PromptBuilder<R>, limit: Option<usize>, path: &Path) -> Result<PathBuf> {
    let samples = builder.build_all(limit).context("Failed to build prompts")?;
    let mut writer = PredictionWriter::create(path)?;
    for sample in &samples {
        writer.write(&record_for(sample, None))?;
    }
    info!("Wrote {} prompts to {}", writer.rows(), path.display());
    writer.close()
}

/// Sends every rendered prompt to `generator` and writes its trimmed
/// completion to the prediction file.
#[instrument(skip(builder, generator))]
pub fn generate_predictions<R, G>(
    builder: &mut PromptBuilder<R>,
    generator: &mut G,
    limit: Option<usize>,
    path: &Path,
) -> Result<PathBuf>
where
    R: Rng,
    G: TextGenerator,
{
    let samples = builder.build_all(limit).context("Failed to build prompts")?;
    let mut writer = PredictionWriter::create(path)?;
    let mut progress = ProgressTracker::new(samples.len());

    for sample in &samples {
        let prompt = sample.rendered_prompt.to_string();
        let completion = generator
            .generate(&prompt)
            .with_context(|| format!("Generation failed for {}", sample.task_id))?;
        debug!("{}: {} exemplars, {} chars generated", sample.task_id, sample.exemplars, completion.len());

        progress.add_tokens(completion.split_whitespace().count());
        writer.write(&record_for(sample, Some(completion.trim().to_string())))?;
        progress.update(&sample.task_id);
    }

    progress.finish("Generation complete");
    writer.close()
}
