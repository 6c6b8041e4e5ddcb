use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use meds_eval::chat_format::ChatFormatKind;
use meds_eval::{
    driver, MetricSuite, PredictionTable, PromptBuilder, ReportTable, RewriteCatalog, TaskCatalog, TaskConfig,
};

#[derive(Parser)]
#[command(name = "meds-eval", version, author, about = "Builds benchmark prompts and scores model predictions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score prediction files with one metric suite and write a comparison report
    Score {
        /// One of the named metric suites, e.g. `mcqa` or `summarization`
        #[arg(long, short)]
        suite: String,

        /// Prediction CSV files; the model name is the last `_` segment of each file name
        #[arg(long, short, num_args = 1.., required = true)]
        files: Vec<PathBuf>,

        /// Task ids to report instead of the suite defaults
        #[arg(long, alias = "task_ids", num_args = 1..)]
        task_ids: Vec<String>,

        /// Report path instead of the suite default under `results/`
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Render every benchmark prompt to a prediction file with an empty output column
    Prompts {
        #[command(flatten)]
        prompt: PromptArgs,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Run a local GGUF model over every benchmark prompt (needs the `llama` feature)
    Generate {
        #[command(flatten)]
        prompt: PromptArgs,

        #[arg(long, short)]
        model_path: String,

        /// GPU ordinal for the model weights
        #[arg(long)]
        gpu: Option<i32>,

        #[arg(long, default_value_t = 200)]
        max_new_tokens: i32,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct PromptArgs {
    /// Directory of JSON task documents
    #[arg(long, short)]
    benchmark_root: PathBuf,

    /// `RewriteDefinitions.json` with paraphrased instructions
    #[arg(long, short)]
    definitions: Option<PathBuf>,

    #[arg(long, default_value = "Llama 3")]
    model_type: String,

    #[arg(long, default_value_t = 1.0)]
    original_instruction_probability: f64,

    #[arg(long, default_value_t = 0.0)]
    zero_shot_probability: f64,

    #[arg(long, default_value_t = 3)]
    num_exemplars: usize,

    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many instances
    #[arg(long)]
    limit: Option<usize>,
}

impl PromptArgs {
    fn task_config(&self) -> TaskConfig {
        let mut config = TaskConfig::evaluation(&self.benchmark_root);
        config.data.definitions_path = self.definitions.clone();
        config.data.limit = self.limit;
        config.prompt.chat_format = ChatFormatKind::from_model_type(&self.model_type);
        config.prompt.original_instruction_probability = self.original_instruction_probability;
        config.prompt.zero_shot_probability = self.zero_shot_probability;
        config.prompt.num_exemplars = self.num_exemplars;
        config.prompt.seed = self.seed;
        config
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn prompt_builder(config: &TaskConfig) -> Result<PromptBuilder<rand::rngs::StdRng>> {
    let rewrites = config
        .data
        .definitions_path
        .as_deref()
        .map(RewriteCatalog::load)
        .transpose()
        .context("Failed to load instruction rewrites")?;
    let catalog = TaskCatalog::load(&config.data.benchmark_root, rewrites.as_ref())
        .with_context(|| format!("Failed to load benchmark from {}", config.data.benchmark_root.display()))?;
    Ok(PromptBuilder::from_config(catalog, config.prompt.clone())?)
}

fn prediction_path(config: &TaskConfig, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| config.output.prediction_path(&config.benchmark_name(), &config.prompt))
}

#[instrument(skip(task_ids, output))]
fn score(suite: &str, files: &[PathBuf], task_ids: Vec<String>, output: Option<PathBuf>) -> Result<()> {
    let tables = files
        .iter()
        .map(|path| PredictionTable::load(path).with_context(|| format!("Failed to load {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let mut suite = MetricSuite::by_name(suite)?;
    if !task_ids.is_empty() {
        suite = suite.with_task_ids(task_ids);
    }
    if let Some(output) = output {
        suite = suite.with_output(output);
    }

    let report_path = suite.output.clone();
    let engine = suite.into_engine();
    let (plan, scores) = engine.score_tables(&tables);
    let report = ReportTable::new(&plan, &scores);
    report.write(&report_path)?;

    print!("{}", report.to_csv_string()?);
    Ok(())
}

#[instrument(skip_all)]
fn prompts(args: &PromptArgs, output: Option<PathBuf>) -> Result<()> {
    let config = args.task_config();
    let mut builder = prompt_builder(&config)?;
    let path = prediction_path(&config, output);
    let path = driver::render_prompts(&mut builder, config.data.limit, &path)?;
    info!("Prompts written to {}", path.display());
    Ok(())
}

#[cfg(feature = "llama")]
#[instrument(skip_all)]
fn generate(args: &PromptArgs, model_path: String, gpu: Option<i32>, max_new_tokens: i32, output: Option<PathBuf>) -> Result<()> {
    use llama_runner::{LlamaConfig, LlamaRunner};

    let config = args.task_config();
    let mut builder = prompt_builder(&config)?;

    let mut llama_config = LlamaConfig::new()
        .with_model_path(model_path)
        .with_max_new_tokens(max_new_tokens);
    if let Some(gpu) = gpu {
        llama_config = llama_config.with_gpu(gpu);
    }
    let mut runner = LlamaRunner::new(llama_config);
    runner.load_model()?;

    let path = prediction_path(&config, output);
    let path = driver::generate_predictions(&mut builder, &mut runner, config.data.limit, &path)?;
    info!("Predictions written to {}", path.display());
    Ok(())
}

#[cfg(not(feature = "llama"))]
fn generate(_: &PromptArgs, _: String, _: Option<i32>, _: i32, _: Option<PathBuf>) -> Result<()> {
    anyhow::bail!("meds-eval was built without llama.cpp support; rebuild with `--features llama`")
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Score {
            suite,
            files,
            task_ids,
            output,
        } => score(&suite, &files, task_ids, output),
        Command::Prompts { prompt, output } => prompts(&prompt, output),
        Command::Generate {
            prompt,
            model_path,
            gpu,
            max_new_tokens,
            output,
        } => generate(&prompt, model_path, gpu, max_new_tokens, output),
    }
}
