//! Model-family chat templates.
//!
//! Each family renders a system instruction and a user query into the input
//! its model expects. New families are added by implementing [`ChatFormat`]
//! and mapping a model type to it in [`ChatFormatKind`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::{format_header, format_turn, BEGIN_OF_TEXT, END_HEADER, END_OF_TURN, START_HEADER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// The model input produced by a chat format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RenderedPrompt {
    /// A raw string fed straight to the tokenizer.
    Text(String),
    /// A message list serialized by the caller's chat API.
    Messages(Vec<Message>),
    /// A system/user pair for hosted APIs.
    Fields { system: String, user: String },
}

impl RenderedPrompt {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RenderedPrompt::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Text form used for prediction files and text generators. Structured
/// prompts are written as JSON.
impl fmt::Display for RenderedPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderedPrompt::Text(text) => f.write_str(text),
            structured => {
                let json = serde_json::to_string(structured).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

pub trait ChatFormat: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, instruction: &str, query: &str) -> RenderedPrompt;
}

/// Whether the target tokenizer inserts its BOS token by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BosPolicy {
    pub tokenizer_adds_bos: bool,
    pub bos_token: String,
}

impl BosPolicy {
    fn prefix(&self) -> &str {
        if self.tokenizer_adds_bos {
            ""
        } else {
            &self.bos_token
        }
    }
}

impl Default for BosPolicy {
    fn default() -> Self {
        Self {
            tokenizer_adds_bos: true,
            bos_token: "<s>".to_string(),
        }
    }
}

/// Llama 3 header/turn format.
#[derive(Debug, Default, Clone)]
pub struct HeaderFormat;

impl HeaderFormat {
    /// Recovers the completed turns of a prompt rendered by this format.
    /// The trailing open assistant header is not a turn and is dropped.
    pub fn parse(rendered: &str) -> Vec<Message> {
        let mut turns = Vec::new();
        let mut rest = rendered.strip_prefix(BEGIN_OF_TEXT).unwrap_or(rendered);

        while let Some(start) = rest.find(START_HEADER) {
            rest = &rest[start + START_HEADER.len()..];
            let Some(role_end) = rest.find(END_HEADER) else { break };
            let role = &rest[..role_end];
            rest = &rest[role_end + END_HEADER.len()..];

            let Some(content_end) = rest.find(END_OF_TURN) else { break };
            let content = rest[..content_end].trim_start_matches('\n');
            if let Some(role) = Role::parse(role) {
                turns.push(Message::new(role, content));
            }
            rest = &rest[content_end + END_OF_TURN.len()..];
        }
        turns
    }
}

impl ChatFormat for HeaderFormat {
    fn name(&self) -> &'static str {
        "header"
    }

    fn render(&self, instruction: &str, query: &str) -> RenderedPrompt {
        let mut prompt = String::from(BEGIN_OF_TEXT);
        prompt.push_str(&format_turn(Role::System.as_str(), instruction));
        prompt.push_str(&format_turn(Role::User.as_str(), query));
        prompt.push_str(&format_header(Role::Assistant.as_str()));
        RenderedPrompt::Text(prompt)
    }
}

/// InternLM 2 `<|im_start|>` format.
#[derive(Debug, Default, Clone)]
pub struct ChatMlFormat {
    pub bos: BosPolicy,
}

impl ChatFormat for ChatMlFormat {
    fn name(&self) -> &'static str {
        "chatml"
    }

    fn render(&self, instruction: &str, query: &str) -> RenderedPrompt {
        let mut prompt = self.bos.prefix().to_string();
        if !instruction.is_empty() {
            prompt.push_str(&format!("<|im_start|>system\n{instruction}<|im_end|>\n"));
        }
        prompt.push_str(&format!("<|im_start|>user\n{query}<|im_end|>\n<|im_start|>assistant\n"));
        RenderedPrompt::Text(prompt)
    }
}

/// Mistral: instruction and query merged into a single user message.
#[derive(Debug, Default, Clone)]
pub struct SingleTurnFormat;

impl ChatFormat for SingleTurnFormat {
    fn name(&self) -> &'static str {
        "single-turn"
    }

    fn render(&self, instruction: &str, query: &str) -> RenderedPrompt {
        RenderedPrompt::Messages(vec![Message::new(Role::User, format!("{instruction}\n{query}"))])
    }
}

/// Hosted chat APIs (GPT-4, Claude) that take the system prompt separately.
#[derive(Debug, Default, Clone)]
pub struct KeyValueFormat;

impl ChatFormat for KeyValueFormat {
    fn name(&self) -> &'static str {
        "key-value"
    }

    fn render(&self, instruction: &str, query: &str) -> RenderedPrompt {
        RenderedPrompt::Fields {
            system: instruction.to_string(),
            user: query.to_string(),
        }
    }
}

/// Fallback for base models without a chat template.
#[derive(Debug, Default, Clone)]
pub struct PlainFormat {
    pub bos: BosPolicy,
}

impl ChatFormat for PlainFormat {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn render(&self, instruction: &str, query: &str) -> RenderedPrompt {
        let mut prompt = self.bos.prefix().to_string();
        if !instruction.is_empty() {
            prompt.push_str(instruction);
            prompt.push('\n');
        }
        prompt.push_str(query);
        RenderedPrompt::Text(prompt)
    }
}

/// Model families with a known chat format. Unknown model types fall back to [`ChatFormatKind::Plain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFormatKind {
    Llama3,
    MMedLlama3,
    InternLm2,
    Mistral,
    Gpt4,
    Claude,
    Plain,
}

impl ChatFormatKind {
    pub fn from_model_type(model_type: &str) -> Self {
        match model_type.trim() {
            "Llama 3" => ChatFormatKind::Llama3,
            "MMedLlama 3" => ChatFormatKind::MMedLlama3,
            "InternLM 2" => ChatFormatKind::InternLm2,
            "Mistral" => ChatFormatKind::Mistral,
            "GPT-4" => ChatFormatKind::Gpt4,
            "Claude" => ChatFormatKind::Claude,
            _ => ChatFormatKind::Plain,
        }
    }

    pub fn model_type(&self) -> &'static str {
        match self {
            ChatFormatKind::Llama3 => "Llama 3",
            ChatFormatKind::MMedLlama3 => "MMedLlama 3",
            ChatFormatKind::InternLm2 => "InternLM 2",
            ChatFormatKind::Mistral => "Mistral",
            ChatFormatKind::Gpt4 => "GPT-4",
            ChatFormatKind::Claude => "Claude",
            ChatFormatKind::Plain => "Plain",
        }
    }

    pub fn build(&self, bos: &BosPolicy) -> Box<dyn ChatFormat> {
        match self {
            ChatFormatKind::Llama3 | ChatFormatKind::MMedLlama3 => Box::new(HeaderFormat),
            ChatFormatKind::InternLm2 => Box::new(ChatMlFormat { bos: bos.clone() }),
            ChatFormatKind::Mistral => Box::new(SingleTurnFormat),
            ChatFormatKind::Gpt4 | ChatFormatKind::Claude => Box::new(KeyValueFormat),
            ChatFormatKind::Plain => Box::new(PlainFormat { bos: bos.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_format_layout() {
        let rendered = HeaderFormat.render("  Answer briefly. ", "What is a fever?");
        assert_eq!(
            rendered.as_text().unwrap(),
            "<|begin_of_text|>\
             <|start_header_id|>system<|end_header_id|>\n\nAnswer briefly.<|eot_id|>\
             <|start_header_id|>user<|end_header_id|>\n\nWhat is a fever?<|eot_id|>\
             <|start_header_id|>assistant<|end_header_id|>\n\n"
        );
    }

    #[test]
    fn test_header_format_round_trip() {
        let rendered = HeaderFormat.render("X", "Y");
        let turns = HeaderFormat::parse(rendered.as_text().unwrap());
        assert_eq!(turns, vec![Message::new(Role::System, "X"), Message::new(Role::User, "Y")]);

        let rendered = HeaderFormat.render("\n Summarize the report.\n", "Input:\nfindings\nOutput:\n");
        let turns = HeaderFormat::parse(rendered.as_text().unwrap());
        assert_eq!(turns[0].content, "Summarize the report.");
        assert_eq!(turns[1].content, "Input:\nfindings\nOutput:");
    }

    #[test]
    fn test_chatml_bos_policy() {
        let adds = ChatMlFormat::default().render("Sys", "Hi");
        assert_eq!(
            adds.as_text().unwrap(),
            "<|im_start|>system\nSys<|im_end|>\n<|im_start|>user\nHi<|im_end|>\n<|im_start|>assistant\n"
        );

        let manual = ChatMlFormat {
            bos: BosPolicy { tokenizer_adds_bos: false, bos_token: "<s>".into() },
        };
        let rendered = manual.render("", "Hi");
        assert_eq!(rendered.as_text().unwrap(), "<s><|im_start|>user\nHi<|im_end|>\n<|im_start|>assistant\n");
    }

    #[test]
    fn test_single_turn_merges_instruction_and_query() {
        let rendered = SingleTurnFormat.render("Classify.", "text");
        assert_eq!(rendered, RenderedPrompt::Messages(vec![Message::new(Role::User, "Classify.\ntext")]));
        assert_eq!(rendered.to_string(), r#"[{"role":"user","content":"Classify.\ntext"}]"#);
    }

    #[test]
    fn test_key_value_format() {
        let rendered = KeyValueFormat.render("Be a doctor.", "Headache?");
        assert_eq!(
            rendered,
            RenderedPrompt::Fields { system: "Be a doctor.".into(), user: "Headache?".into() }
        );
        assert_eq!(rendered.to_string(), r#"{"system":"Be a doctor.","user":"Headache?"}"#);
    }

    #[test]
    fn test_plain_format() {
        let with_bos = PlainFormat {
            bos: BosPolicy { tokenizer_adds_bos: false, bos_token: "<s>".into() },
        };
        assert_eq!(with_bos.render("Inst", "Query").as_text(), Some("<s>Inst\nQuery"));
        assert_eq!(PlainFormat::default().render("", "Query").as_text(), Some("Query"));
    }

    #[test]
    fn test_model_type_dispatch() {
        let bos = BosPolicy::default();
        assert_eq!(ChatFormatKind::from_model_type("MMedLlama 3").build(&bos).name(), "header");
        assert_eq!(ChatFormatKind::from_model_type("InternLM 2").build(&bos).name(), "chatml");
        assert_eq!(ChatFormatKind::from_model_type("Mistral").build(&bos).name(), "single-turn");
        assert_eq!(ChatFormatKind::from_model_type("Claude").build(&bos).name(), "key-value");
        assert_eq!(ChatFormatKind::from_model_type("BioGPT").build(&bos).name(), "plain");
        assert_eq!(ChatFormatKind::Gpt4.model_type(), "GPT-4");
    }
}
