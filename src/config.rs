//! Linker configuration.
//!
//! Read from the `[entitylink]` table of a TOML file:
//!
//! ```toml
//! [entitylink]
//! threads = 4
//! dictionary_path = "wikidict.tsv"
//! score_threshold = 0.5
//! sentence_timeout_ms = 250
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::DriverOptions;
use crate::errors::ConfigError;

/// Where the Wikidict is read from when no path is configured.
pub const DEFAULT_WIKIDICT_PATH: &str = "models/kbp/wikidict.tab";

/// Configuration for a [`WikidictAnnotator`](crate::WikidictAnnotator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Number of sentences linked concurrently.
    pub threads: usize,
    /// Location of the `<text, link, score>` TSV file.
    #[serde(alias = "wikidict")]
    pub dictionary_path: PathBuf,
    /// Rows scoring below this are discarded; `0.0` keeps everything.
    #[serde(alias = "threshold")]
    pub score_threshold: f64,
    /// Time budget per sentence in milliseconds. Absent means no timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence_timeout_ms: Option<u64>,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            dictionary_path: PathBuf::from(DEFAULT_WIKIDICT_PATH),
            score_threshold: 0.0,
            sentence_timeout_ms: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    entitylink: LinkerConfig,
}

impl LinkerConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate the `[entitylink]` table of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.entitylink.validate()
    }

    pub fn with_dictionary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dictionary_path = path.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_sentence_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.sentence_timeout_ms = Some(timeout_ms);
        self
    }

    /// Reject values that cannot configure a working annotator.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if !self.score_threshold.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "score_threshold must be finite, got {}",
                self.score_threshold
            )));
        }
        Ok(self)
    }

    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            threads: self.threads,
            sentence_timeout: self.sentence_timeout_ms.map(Duration::from_millis),
        }
    }
}
