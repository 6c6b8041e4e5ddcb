use jieba_rs::Jieba;
use lindera::dictionary::{load_dictionary_from_kind, DictionaryKind};
use lindera::mode::Mode;
use lindera::segmenter::Segmenter;
use lindera::tokenizer::Tokenizer;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::EvalError;

static WORDS: OnceLock<Regex> = OnceLock::new();
static JIEBA: OnceLock<Jieba> = OnceLock::new();
static IPADIC: OnceLock<Option<Tokenizer>> = OnceLock::new();

/// Languages with a tokenizer, keyed by the codes used in task configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Spanish,
    French,
    Russian,
    Chinese,
    Japanese,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "spa",
            Language::French => "fra",
            Language::Russian => "ru",
            Language::Chinese => "zh",
            Language::Japanese => "jp",
        }
    }

    pub fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            Language::English | Language::Spanish | Language::French | Language::Russian => word_tokens(text),
            Language::Chinese => JIEBA
                .get_or_init(Jieba::new)
                .cut(text, true)
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .collect(),
            Language::Japanese => morphemes(text),
        }
    }
}

impl FromStr for Language {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "en" => Ok(Language::English),
            "spa" => Ok(Language::Spanish),
            "fra" => Ok(Language::French),
            "ru" => Ok(Language::Russian),
            "zh" => Ok(Language::Chinese),
            "jp" => Ok(Language::Japanese),
            other => Err(EvalError::UnknownLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Words (with inner hyphens and apostrophes) and single punctuation marks.
fn word_tokens(text: &str) -> Vec<&str> {
    WORDS
        .get_or_init(|| Regex::new(r"\w+(?:[-']\w+)*|[^\w\s]").expect("word pattern is valid"))
        .find_iter(text)
        .map(|m| m.as_str())
        .collect()
}

fn ipadic() -> Option<&'static Tokenizer> {
    IPADIC
        .get_or_init(|| match load_dictionary_from_kind(DictionaryKind::IPADIC) {
            Ok(dictionary) => Some(Tokenizer::new(Segmenter::new(Mode::Normal, dictionary, None))),
            Err(e) => {
                warn!("IPADIC dictionary unavailable, Japanese falls back to whitespace: {}", e);
                None
            }
        })
        .as_ref()
}

/// IPADIC morphemes as slices of `text`. Whitespace morphemes are dropped.
fn morphemes(text: &str) -> Vec<&str> {
    let Some(tokenizer) = ipadic() else {
        return text.split_whitespace().collect();
    };
    let tokens = match tokenizer.tokenize(text) {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!("Japanese segmentation failed, splitting on whitespace: {}", e);
            return text.split_whitespace().collect();
        }
    };

    let mut surfaces = Vec::with_capacity(tokens.len());
    let mut offset = 0;
    for token in &tokens {
        let end = offset + token.text.len();
        if let Some(surface) = text.get(offset..end) {
            if !surface.trim().is_empty() {
                surfaces.push(surface);
            }
        }
        offset = end;
    }
    surfaces
}
