use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{EvalError, Result};

/// Ground truth of an instance: one string, or several acceptable strings
/// where the first one is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroundTruth {
    Single(String),
    Choices(Vec<String>),
}

impl GroundTruth {
    pub fn canonical(&self) -> &str {
        match self {
            GroundTruth::Single(s) => s,
            GroundTruth::Choices(choices) => choices.first().map(String::as_str).unwrap_or(""),
        }
    }
}

impl From<&str> for GroundTruth {
    fn from(value: &str) -> Self {
        GroundTruth::Single(value.to_string())
    }
}

impl From<String> for GroundTruth {
    fn from(value: String) -> Self {
        GroundTruth::Single(value)
    }
}

/// Descriptive fields carried by task documents. Only used for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskMetadata {
    pub source: Option<String>,
    pub categories: Vec<String>,
    pub input_language: Vec<String>,
    pub output_language: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub task_id: String,
    pub original_instruction: String,
    pub rewritten_instructions: Vec<String>,
    pub metadata: TaskMetadata,
}

impl TaskDefinition {
    pub fn new(task_id: impl Into<String>, original_instruction: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            original_instruction: original_instruction.into(),
            rewritten_instructions: Vec::new(),
            metadata: TaskMetadata::default(),
        }
    }

    pub fn with_rewrites<I, S>(mut self, rewrites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rewritten_instructions = rewrites.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// Position inside the task's pool.
    pub id: usize,
    pub task_id: String,
    pub input: String,
    pub output: GroundTruth,
}

impl Instance {
    pub fn new(id: usize, task_id: impl Into<String>, input: impl Into<String>, output: impl Into<GroundTruth>) -> Self {
        Self {
            id,
            task_id: task_id.into(),
            input: input.into(),
            output: output.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskDocument {
    #[serde(rename = "Definition", default)]
    definition: Vec<String>,
    #[serde(rename = "Instances", default)]
    instances: Option<Vec<RawInstance>>,
    #[serde(rename = "Source", default)]
    source: Option<String>,
    #[serde(rename = "Categories", default)]
    categories: Vec<String>,
    #[serde(rename = "Input_language", default)]
    input_language: Vec<String>,
    #[serde(rename = "Output_language", default)]
    output_language: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    input: String,
    output: GroundTruth,
}

#[derive(Debug, Default, Deserialize)]
struct RewriteEntry {
    #[serde(default)]
    auto_rewrite_def: Vec<String>,
}

/// Paraphrased instructions keyed by task id, as stored in `RewriteDefinitions.json`.
#[derive(Debug, Default)]
pub struct RewriteCatalog {
    entries: HashMap<String, Vec<String>>,
}

impl RewriteCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let value: HashMap<String, RewriteEntry> = read_json(path)?;
        let entries = value
            .into_iter()
            .map(|(task_id, entry)| (task_id, entry.auto_rewrite_def))
            .collect::<HashMap<_, _>>();
        info!("Loaded instruction rewrites for {} tasks from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn rewrites(&self, task_id: &str) -> Option<&[String]> {
        self.entries.get(task_id).map(Vec::as_slice)
    }
}

/// Validated task definitions and instance pools for one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    definitions: BTreeMap<String, TaskDefinition>,
    pools: BTreeMap<String, Vec<Instance>>,
}

impl TaskCatalog {
    /// Builds a catalog, failing if any instance references an undefined task.
    pub fn new<D, I>(definitions: D, instances: I) -> Result<Self>
    where
        D: IntoIterator<Item = TaskDefinition>,
        I: IntoIterator<Item = Instance>,
    {
        let definitions = definitions
            .into_iter()
            .map(|d| (d.task_id.clone(), d))
            .collect::<BTreeMap<_, _>>();

        let mut pools: BTreeMap<String, Vec<Instance>> = BTreeMap::new();
        for instance in instances {
            if !definitions.contains_key(&instance.task_id) {
                return Err(EvalError::MissingDefinition { task_id: instance.task_id });
            }
            pools.entry(instance.task_id.clone()).or_default().push(instance);
        }

        Ok(Self { definitions, pools })
    }

    /// Loads every `*.json` task document under `root`, plus optional rewrites.
    ///
    /// The task id is the file name up to its first `_`, e.g.
    /// `task62_liveqa_medical_filtered_conversation.json` is `task62`.
    pub fn load(root: &Path, rewrites: Option<&RewriteCatalog>) -> Result<Self> {
        let mut paths = std::fs::read_dir(root)
            .map_err(|e| EvalError::io(root, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "json"))
            .collect::<Vec<_>>();
        paths.sort();

        if paths.is_empty() {
            return Err(EvalError::EmptyBenchmark(root.to_path_buf()));
        }

        let mut definitions = Vec::new();
        let mut instances = Vec::new();
        for path in &paths {
            let (definition, pool) = load_task_document(path, rewrites)?;
            debug!("{}: {} instances", definition.task_id, pool.len());
            if definitions.iter().any(|d: &TaskDefinition| d.task_id == definition.task_id) {
                warn!("Task {} is defined by more than one document; pools are merged", definition.task_id);
                let offset = instances.iter().filter(|i: &&Instance| i.task_id == definition.task_id).count();
                instances.extend(pool.into_iter().map(|mut i| {
                    i.id += offset;
                    i
                }));
                continue;
            }
            definitions.push(definition);
            instances.extend(pool);
        }

        let catalog = Self::new(definitions, instances)?;
        info!(
            "Loaded {} instances across {} tasks: {:?}",
            catalog.len(),
            catalog.definitions.len(),
            catalog.task_ids().collect::<Vec<_>>()
        );
        Ok(catalog)
    }

    pub fn definition(&self, task_id: &str) -> Option<&TaskDefinition> {
        self.definitions.get(task_id)
    }

    pub fn pool(&self, task_id: &str) -> &[Instance] {
        self.pools.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// All instances, ordered by task id and then by position in the pool.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.pools.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load_task_document(path: &Path, rewrites: Option<&RewriteCatalog>) -> Result<(TaskDefinition, Vec<Instance>)> {
    let task_id = task_id_from_path(path);
    let document: TaskDocument = read_json(path)?;

    let original_instruction = document
        .definition
        .first()
        .filter(|d| !d.trim().is_empty())
        .cloned()
        .ok_or_else(|| EvalError::MissingField { path: path.to_path_buf(), field: "Definition" })?;
    let raw_instances = document
        .instances
        .ok_or_else(|| EvalError::MissingField { path: path.to_path_buf(), field: "Instances" })?;

    let rewritten_instructions = match rewrites.and_then(|r| r.rewrites(&task_id)) {
        Some(rewrites) => rewrites.to_vec(),
        None => document.definition.clone(),
    };

    let definition = TaskDefinition {
        task_id: task_id.clone(),
        original_instruction,
        rewritten_instructions,
        metadata: TaskMetadata {
            source: document.source,
            categories: document.categories,
            input_language: document.input_language,
            output_language: document.output_language,
        },
    };

    let instances = raw_instances
        .into_iter()
        .enumerate()
        .map(|(id, raw)| Instance {
            id,
            task_id: task_id.clone(),
            input: raw.input,
            output: raw.output,
        })
        .collect();

    Ok((definition, instances))
}

fn task_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .split('_')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| EvalError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| EvalError::json(PathBuf::from(path), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, value: serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_ground_truth_canonical() {
        let single: GroundTruth = serde_json::from_value(json!("Pneumonia")).unwrap();
        let list: GroundTruth = serde_json::from_value(json!(["A: aspirin", "aspirin"])).unwrap();
        assert_eq!(single.canonical(), "Pneumonia");
        assert_eq!(list.canonical(), "A: aspirin");
        assert_eq!(GroundTruth::Choices(vec![]).canonical(), "");
    }

    #[test]
    fn test_instance_from_owned_strings() {
        let label = format!("label {}", 3);
        let instance = Instance::new(3, "task41", format!("premise {}", 3), label);
        assert_eq!(instance.output, GroundTruth::Single("label 3".to_string()));
        assert_eq!(instance.output.canonical(), "label 3");
    }

    #[test]
    fn test_load_benchmark_directory() -> Result<()> {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "task62_liveqa_medical_filtered_conversation.json",
            json!({
                "Source": "liveqa",
                "Categories": ["Question Answering"],
                "Definition": ["Answer the patient's question.", "Respond as a doctor."],
                "Instances": [
                    {"input": "Is aspirin safe?", "output": "It depends."},
                    {"input": "What is a fever?", "output": ["A raised temperature.", "High temperature."]}
                ]
            }),
        );
        write(
            dir.path(),
            "task4_mcqa.json",
            json!({"Definition": ["Pick the right option."], "Instances": [{"input": "Q", "output": "A"}]}),
        );
        std::fs::write(dir.path().join("README.md"), "not a task").unwrap();

        let catalog = TaskCatalog::load(dir.path(), None)?;
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.task_ids().collect::<Vec<_>>(), vec!["task4", "task62"]);

        let definition = catalog.definition("task62").unwrap();
        assert_eq!(definition.original_instruction, "Answer the patient's question.");
        assert_eq!(definition.rewritten_instructions.len(), 2);
        assert_eq!(definition.metadata.source.as_deref(), Some("liveqa"));

        let pool = catalog.pool("task62");
        assert_eq!(pool[1].id, 1);
        assert_eq!(pool[1].output.canonical(), "A raised temperature.");
        Ok(())
    }

    #[test]
    fn test_rewrite_catalog_overrides_rewrites_only() -> Result<()> {
        let dir = tempdir().unwrap();
        let bench = dir.path().join("bench");
        std::fs::create_dir(&bench).unwrap();
        write(&bench, "task4_mcqa.json", json!({"Definition": ["Pick the right option."], "Instances": []}));
        let rewrites_path = write(
            dir.path(),
            "RewriteDefinitions.json",
            json!({"task4": {"original_def": ["Old text"], "auto_rewrite_def": ["Choose one.", "Select the answer."]}}),
        );

        let rewrites = RewriteCatalog::load(&rewrites_path)?;
        let catalog = TaskCatalog::load(&bench, Some(&rewrites))?;
        let definition = catalog.definition("task4").unwrap();
        assert_eq!(definition.original_instruction, "Pick the right option.");
        assert_eq!(definition.rewritten_instructions, vec!["Choose one.", "Select the answer."]);
        assert!(catalog.pool("task4").is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_definition_is_configuration_error() {
        let dir = tempdir().unwrap();
        write(dir.path(), "task9_broken.json", json!({"Definition": [], "Instances": []}));
        let err = TaskCatalog::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, EvalError::MissingField { field: "Definition", .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_instances_is_configuration_error() {
        let dir = tempdir().unwrap();
        write(dir.path(), "task9_broken.json", json!({"Definition": ["Do it."]}));
        let err = TaskCatalog::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, EvalError::MissingField { field: "Instances", .. }));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let err = TaskCatalog::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, EvalError::EmptyBenchmark(_)));
    }

    #[test]
    fn test_instance_without_definition_is_rejected() {
        let err = TaskCatalog::new(
            vec![TaskDefinition::new("task1", "Extract.")],
            vec![Instance::new(0, "task2", "in", "out")],
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::MissingDefinition { ref task_id } if task_id == "task2"));
    }
}
