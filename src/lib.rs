#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Entity linking against a Wikidict surface form table.
//!
//! Given mentions already detected and typed by upstream stages, this crate
//! decides a canonical id for each one and writes it onto the mention and its
//! tokens:
//!
//! - DATE / TIME / SET mentions link to their normalized timex value, with
//!   the time of day removed
//! - ORDINAL mentions link to their numeric value
//! - Plain numbers link to themselves
//! - Other typed mentions link through the Wikidict, if their exact surface
//!   form is listed
//!
//! ## Modules
//!
//! - [`annotation`] - Documents, sentences, tokens and mentions
//! - [`dictionary`] - The immutable surface form table
//! - [`resolver`] - The per-mention decision
//! - [`driver`] - Parallel, failure-isolated sentence processing
//! - [`annotator`] - The pipeline stage tying them together
//! - [`config`] - TOML configuration
//! - [`errors`] - Error types
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use layered_wikidict::{
//!     Document, LinkerConfig, Mention, Sentence, SentenceDisplay, Wikidict, WikidictAnnotator,
//! };
//!
//! let dictionary = Wikidict::from_entries([("Barack Obama", "Barack_Obama")]);
//! let annotator =
//!     WikidictAnnotator::new(Arc::new(dictionary), &LinkerConfig::default()).unwrap();
//!
//! let sentence = Sentence::from_tokens(["Barack", "Obama", "won", "in", "2008"])
//!     .with_mention(Mention::new("Barack Obama", 0, 1).with_entity_type("PERSON"))
//!     .with_mention(Mention::new("2008", 4, 4).with_entity_type("DATE"));
//! let mut doc = Document::new("Barack Obama won in 2008", vec![sentence]);
//!
//! let report = annotator.annotate(&mut doc);
//! assert!(report.is_success());
//! assert_eq!(
//!     doc.sentences[0].token_links(),
//!     vec![Some("Barack_Obama"), Some("Barack_Obama"), Some("O"), Some("O"), Some("2008")]
//! );
//! println!("{}", SentenceDisplay::new(&doc.sentences[0]));
//! ```

pub mod annotation;
pub mod annotator;
pub mod config;
pub mod dictionary;
pub mod driver;
pub mod errors;
pub mod resolver;

pub use annotation::{
    Document, Mention, MentionAttrs, NumericValue, Sentence, SentenceDisplay, Token, TokenSpan,
    NO_LINK, OUTSIDE_TYPE,
};
pub use annotator::{Requirement, WikidictAnnotator};
pub use config::{LinkerConfig, DEFAULT_WIKIDICT_PATH};
pub use dictionary::{LoadStats, SurfaceFormLookup, Wikidict};
pub use driver::{DocumentReport, DriverOptions, SentenceDriver, SentenceOutcome};
pub use errors::{AnnotatorError, ConfigError, LoadError, LoadResult, SentenceError};
pub use resolver::{normalize_timex, resolve, MentionKind};
