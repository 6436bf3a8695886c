use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LexreelResult;

mod json_source;

pub use json_source::JsonContentSource;

/// Kind of learnable unit a run is built from.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Word,
    Idiom,
    Sentence,
}

impl ContentKind {
    /// Suffix used in the deliverable file name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Word => "word",
            ContentKind::Idiom => "idiom",
            ContentKind::Sentence => "sentence",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "word" => Ok(ContentKind::Word),
            "idiom" => Ok(ContentKind::Idiom),
            "sentence" => Ok(ContentKind::Sentence),
            other => Err(format!("unknown content kind '{other}'")),
        }
    }
}

/// Which side of the learning pair a frame, audio track, or clip carries.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// The learner's own language (the translation).
    Native,
    /// The language being learned.
    Target,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Native => "native",
            Language::Target => "target",
        }
    }
}

/// One learnable unit. Immutable once fetched; owned by the pipeline run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ContentItem {
    /// Target-language text.
    pub primary: String,
    /// Optional second target-language line (long idioms/sentences).
    #[serde(default)]
    pub primary_line2: Option<String>,
    /// Native-language translation.
    pub secondary: String,
    #[serde(default)]
    pub secondary_line2: Option<String>,
    /// Pronunciation or usage hint, shown under the target text.
    pub tertiary: String,
}

impl ContentItem {
    /// Text handed to the speech synthesizer for one language side.
    ///
    /// Split lines are a display concern only; speech joins them with a
    /// space so the clip reads as one utterance.
    pub fn speech_text(&self, language: Language) -> String {
        let (first, second) = match language {
            Language::Target => (&self.primary, &self.primary_line2),
            Language::Native => (&self.secondary, &self.secondary_line2),
        };
        match second {
            Some(line2) if !line2.is_empty() => format!("{first} {line2}"),
            _ => first.clone(),
        }
    }
}

/// Source of date-keyed content, external to the pipeline core.
///
/// Implementations must return items in a stable, deterministic order for
/// the same `(date, kind)`; the order feeds directly into the final
/// sequence.
pub trait ContentSource {
    fn fetch_by_date(&self, date: NaiveDate, kind: ContentKind) -> LexreelResult<Vec<ContentItem>>;
}
