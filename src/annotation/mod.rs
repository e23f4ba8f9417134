//! Annotated documents as produced by upstream pipeline stages.
//!
//! Tokenization, sentence splitting, NER tagging, mention detection and timex
//! normalization all happen before linking. This module only models their
//! output so it can be deserialized, linked in place, and written back out.

mod display;
mod mention;

pub use display::SentenceDisplay;
pub use mention::{Mention, MentionAttrs, NumericValue, TokenSpan};

use serde::{Deserialize, Serialize};

/// Written on every token of a linked sentence before mentions are processed,
/// so unresolved tokens are marked explicitly rather than left blank.
pub const NO_LINK: &str = "O";

/// Entity-type tag for tokens outside of any named entity.
pub const OUTSIDE_TYPE: &str = "O";

/// A single token of a sentence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Token {
    /// Tokenized text.
    pub text: String,
    /// Untokenized text as it appeared in the source, when it differs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    /// Canonical id written by the linker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_id: Option<String>,
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            original_text: None,
            linked_id: None,
        }
    }
}

/// A sentence with its tokens and detected mentions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    /// `None` when mention detection never ran for this sentence.
    #[serde(default)]
    pub mentions: Option<Vec<Mention>>,
}

impl Sentence {
    /// Build a sentence from whitespace-separated tokens with no mentions yet.
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Token::new).collect(),
            mentions: Some(Vec::new()),
        }
    }

    /// Add a mention, creating the mentions list if it was absent.
    pub fn with_mention(mut self, mention: Mention) -> Self {
        self.mentions.get_or_insert_with(Vec::new).push(mention);
        self
    }

    /// Token texts joined by single spaces.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Linked ids of every token, in token order.
    pub fn token_links(&self) -> Vec<Option<&str>> {
        self.tokens
            .iter()
            .map(|token| token.linked_id.as_deref())
            .collect()
    }
}

/// A document split into sentences.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Full document text.
    #[serde(default)]
    pub text: String,
    pub sentences: Vec<Sentence>,
}

impl Document {
    pub fn new(text: impl Into<String>, sentences: Vec<Sentence>) -> Self {
        Self {
            text: text.into(),
            sentences,
        }
    }

    /// Get the number of sentences in the document.
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    /// Total number of mentions across sentences that have a mentions list.
    pub fn mention_count(&self) -> usize {
        self.sentences
            .iter()
            .filter_map(|sentence| sentence.mentions.as_ref())
            .map(Vec::len)
            .sum()
    }
}
