//! Error types for entity linking.
//!
//! Dictionary and configuration errors are fatal: an annotator with a missing
//! or corrupt dictionary must not start. Sentence errors are isolated to the
//! sentence that produced them and reported alongside the document.

use std::path::PathBuf;

use thiserror::Error;

use crate::annotator::Requirement;

/// Fatal errors while reading a Wikidict table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The dictionary could not be opened or read.
    #[error("failed to read wikidict {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row did not have exactly `<text, link, score>` fields.
    #[error("malformed wikidict row at {}:{line}: expected 3 tab-separated fields, found {fields}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        fields: usize,
    },

    /// The score field could not be parsed while thresholding was enabled.
    #[error("invalid score {value:?} in wikidict {}:{line}: {source}", .path.display())]
    InvalidScore {
        path: PathBuf,
        line: usize,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

/// Errors loading or validating a [`LinkerConfig`](crate::LinkerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Why a single sentence could not be linked.
///
/// A failed sentence keeps whatever attributes it had before the driver ran.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SentenceError {
    /// Mention detection never ran for this sentence.
    #[error("sentence has no mentions annotation")]
    MissingMentions,

    /// Neither the original nor the tokenized text is set on a mention.
    #[error("mention {mention} has no surface form")]
    MissingSurfaceForm { mention: usize },

    #[error("mention {mention} spans tokens {start}..={end} but the sentence has {token_count} tokens")]
    SpanOutOfRange {
        mention: usize,
        start: usize,
        end: usize,
        token_count: usize,
    },

    #[error("mention {mention} has an inverted token span {start}..={end}")]
    InvertedSpan {
        mention: usize,
        start: usize,
        end: usize,
    },

    #[error("sentence exceeded its time budget of {budget_ms}ms")]
    TimedOut { budget_ms: u128 },

    #[error("sentence processing panicked: {message}")]
    Panicked { message: String },
}

/// Errors constructing or composing a [`WikidictAnnotator`](crate::WikidictAnnotator).
#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("missing upstream annotations: {0:?}")]
    MissingRequirements(Vec<Requirement>),
}

/// Result type for dictionary loading.
pub type LoadResult<T> = Result<T, LoadError>;
