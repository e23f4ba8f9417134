//! The entity-linking pipeline stage.
//!
//! [`WikidictAnnotator`] owns the dictionary and the sentence driver, and
//! declares which upstream annotations it needs so a host pipeline can order
//! its stages.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::annotation::{Document, MentionAttrs};
use crate::config::LinkerConfig;
use crate::dictionary::Wikidict;
use crate::driver::{DocumentReport, SentenceDriver};
use crate::errors::AnnotatorError;
use crate::resolver::resolve;

/// Annotations exchanged between pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Requirement {
    Text,
    Tokens,
    Sentences,
    OriginalText,
    Mentions,
    /// The canonical id on mentions and tokens.
    WikipediaEntity,
}

const REQUIRES: &[Requirement] = &[
    Requirement::Text,
    Requirement::Tokens,
    Requirement::Sentences,
    Requirement::OriginalText,
    Requirement::Mentions,
];

const SATISFIES: &[Requirement] = &[Requirement::WikipediaEntity];

/// Links mentions to Wikipedia pages, dates and numbers.
#[derive(Debug)]
pub struct WikidictAnnotator {
    dictionary: Arc<Wikidict>,
    driver: SentenceDriver,
}

impl WikidictAnnotator {
    /// Read the configured dictionary and start the worker pool.
    ///
    /// Fails if the dictionary is missing or corrupt.
    pub fn from_config(config: &LinkerConfig) -> Result<Self, AnnotatorError> {
        let dictionary = Wikidict::load(&config.dictionary_path, config.score_threshold)?;
        let annotator = Self::new(Arc::new(dictionary), config)?;
        info!(
            "Wikidict annotator ready ({} entries, {} threads)",
            annotator.dictionary.len(),
            annotator.driver.options().threads
        );
        Ok(annotator)
    }

    /// Wrap an already loaded dictionary.
    pub fn new(dictionary: Arc<Wikidict>, config: &LinkerConfig) -> Result<Self, AnnotatorError> {
        let driver = SentenceDriver::new(dictionary.clone(), config.driver_options())?;
        Ok(Self { dictionary, driver })
    }

    pub fn dictionary(&self) -> &Wikidict {
        &self.dictionary
    }

    /// Annotations that must exist before this stage runs.
    pub fn requires(&self) -> &'static [Requirement] {
        REQUIRES
    }

    /// Annotations this stage produces.
    pub fn requirements_satisfied(&self) -> &'static [Requirement] {
        SATISFIES
    }

    /// Check that earlier stages produced everything this one needs.
    pub fn check_requirements(&self, available: &HashSet<Requirement>) -> Result<(), AnnotatorError> {
        let mut missing: Vec<Requirement> = REQUIRES
            .iter()
            .filter(|requirement| !available.contains(*requirement))
            .copied()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            missing.sort();
            Err(AnnotatorError::MissingRequirements(missing))
        }
    }

    /// Link a single mention.
    pub fn link(&self, mention: &MentionAttrs<'_>) -> Option<String> {
        resolve(mention, &*self.dictionary)
    }

    /// Link every sentence of the document in place.
    pub fn annotate(&self, doc: &mut Document) -> DocumentReport {
        self.driver.annotate(doc)
    }
}
