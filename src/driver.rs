//! Linking every sentence of a document on a bounded worker pool.
//!
//! Sentences are independent units of work. Each one is claimed by exactly
//! one worker, which owns its tokens and mentions for the duration, so no
//! locking is needed; the dictionary is shared read-only.
//!
//! A sentence moves from pending to running to either completed or failed.
//! All mentions are resolved before anything is written, so a failed
//! sentence keeps the attributes it had before the driver ran.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::annotation::{Document, Sentence, NO_LINK};
use crate::dictionary::SurfaceFormLookup;
use crate::errors::{AnnotatorError, SentenceError};
use crate::resolver::resolve;

/// Worker pool and time budget settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Number of sentences linked concurrently. `1` links sequentially.
    pub threads: usize,
    /// Time budget per sentence; `None` never times out.
    pub sentence_timeout: Option<Duration>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            sentence_timeout: None,
        }
    }
}

/// Terminal state of one sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum SentenceOutcome {
    Completed { linked_mentions: usize },
    Failed(SentenceError),
}

impl SentenceOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SentenceOutcome::Completed { .. })
    }
}

/// Per-sentence outcomes of one [`SentenceDriver::annotate`] call, indexed
/// like the document's sentences.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReport {
    pub outcomes: Vec<SentenceOutcome>,
}

impl DocumentReport {
    /// Indices of sentences that were linked.
    pub fn completed(&self) -> impl Iterator<Item = usize> + '_ {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| outcome.is_completed())
            .map(|(idx, _)| idx)
    }

    /// Failed sentences and why they failed.
    pub fn failed(&self) -> impl Iterator<Item = (usize, &SentenceError)> + '_ {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(idx, outcome)| match outcome {
                SentenceOutcome::Failed(err) => Some((idx, err)),
                SentenceOutcome::Completed { .. } => None,
            })
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(SentenceOutcome::is_completed)
    }

    /// Mentions that received a link across all completed sentences.
    pub fn linked_mentions(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                SentenceOutcome::Completed { linked_mentions } => *linked_mentions,
                SentenceOutcome::Failed(_) => 0,
            })
            .sum()
    }
}

/// Applies mention resolution to every sentence of a document.
pub struct SentenceDriver {
    dictionary: Arc<dyn SurfaceFormLookup>,
    pool: rayon::ThreadPool,
    options: DriverOptions,
}

impl std::fmt::Debug for SentenceDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentenceDriver")
            .field("options", &self.options)
            .finish()
    }
}

impl SentenceDriver {
    pub fn new(
        dictionary: Arc<dyn SurfaceFormLookup>,
        options: DriverOptions,
    ) -> Result<Self, AnnotatorError> {
        let threads = options.threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("wikidict-link-{}", idx))
            .build()
            .map_err(|e| AnnotatorError::ThreadPool(e.to_string()))?;

        Ok(Self {
            dictionary,
            pool,
            options: DriverOptions { threads, ..options },
        })
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Link every sentence of `doc` in place.
    ///
    /// Failures are isolated per sentence and reported; they never abort the
    /// rest of the document.
    pub fn annotate(&self, doc: &mut Document) -> DocumentReport {
        let start = Instant::now();
        let dictionary = &*self.dictionary;
        let timeout = self.options.sentence_timeout;

        let outcomes: Vec<SentenceOutcome> = self.pool.install(|| {
            doc.sentences
                .par_iter_mut()
                .enumerate()
                .map(|(idx, sentence)| {
                    let outcome = link_isolated(sentence, dictionary, timeout);
                    if let SentenceOutcome::Failed(err) = &outcome {
                        warn!(
                            sentence = idx,
                            text = %sentence.text(),
                            "Failed to link sentence: {}",
                            err
                        );
                    }
                    outcome
                })
                .collect()
        });

        let report = DocumentReport { outcomes };
        debug!(
            "Linked {} mentions in {} sentences ({} failed; {:.1?} elapsed)",
            report.linked_mentions(),
            report.outcomes.len(),
            report.failed().count(),
            start.elapsed()
        );
        report
    }
}

/// Link one sentence, converting any fault into a failed outcome.
pub(crate) fn link_isolated(
    sentence: &mut Sentence,
    dictionary: &dyn SurfaceFormLookup,
    timeout: Option<Duration>,
) -> SentenceOutcome {
    match catch_unwind(AssertUnwindSafe(|| link_sentence(sentence, dictionary, timeout))) {
        Ok(Ok(linked_mentions)) => SentenceOutcome::Completed { linked_mentions },
        Ok(Err(err)) => SentenceOutcome::Failed(err),
        Err(panic_payload) => {
            let message = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            SentenceOutcome::Failed(SentenceError::Panicked { message })
        }
    }
}

fn link_sentence(
    sentence: &mut Sentence,
    dictionary: &dyn SurfaceFormLookup,
    timeout: Option<Duration>,
) -> Result<usize, SentenceError> {
    let links = plan_links(sentence, dictionary, timeout)?;
    Ok(commit(sentence, links))
}

/// Resolve every mention without touching the sentence.
fn plan_links(
    sentence: &Sentence,
    dictionary: &dyn SurfaceFormLookup,
    timeout: Option<Duration>,
) -> Result<Vec<(usize, String)>, SentenceError> {
    let started = Instant::now();
    let mentions = sentence
        .mentions
        .as_ref()
        .ok_or(SentenceError::MissingMentions)?;
    let token_count = sentence.tokens.len();

    let mut links = Vec::new();
    for (idx, mention) in mentions.iter().enumerate() {
        check_deadline(started, timeout)?;

        let span = mention.tokens;
        if span.start > span.end {
            return Err(SentenceError::InvertedSpan {
                mention: idx,
                start: span.start,
                end: span.end,
            });
        }
        if span.end >= token_count {
            return Err(SentenceError::SpanOutOfRange {
                mention: idx,
                start: span.start,
                end: span.end,
                token_count,
            });
        }

        let attrs = mention
            .attrs()
            .ok_or(SentenceError::MissingSurfaceForm { mention: idx })?;
        if let Some(link) = resolve(&attrs, dictionary) {
            links.push((idx, link));
        }
    }

    // The last resolution may have run past the budget too
    if !mentions.is_empty() {
        check_deadline(started, timeout)?;
    }
    Ok(links)
}

fn check_deadline(started: Instant, timeout: Option<Duration>) -> Result<(), SentenceError> {
    match timeout {
        Some(budget) if started.elapsed() >= budget => Err(SentenceError::TimedOut {
            budget_ms: budget.as_millis(),
        }),
        _ => Ok(()),
    }
}

/// Write planned links. Spans were validated by [`plan_links`].
fn commit(sentence: &mut Sentence, links: Vec<(usize, String)>) -> usize {
    let Sentence { tokens, mentions } = sentence;

    for token in tokens.iter_mut() {
        token.linked_id = Some(NO_LINK.to_string());
    }

    let mentions = match mentions {
        Some(mentions) => mentions,
        None => return 0,
    };

    let linked = links.len();
    for (idx, link) in links {
        let mention = &mut mentions[idx];
        for token in &mut tokens[mention.tokens.start..=mention.tokens.end] {
            token.linked_id = Some(link.clone());
        }
        mention.linked_id = Some(link);
    }
    linked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Mention, Token};
    use crate::dictionary::Wikidict;

    fn dictionary() -> Arc<dyn SurfaceFormLookup> {
        Arc::new(Wikidict::from_entries([
            ("Barack Obama", "Barack_Obama"),
            ("Hawaii", "Hawaii"),
        ]))
    }

    fn obama_sentence() -> Sentence {
        Sentence::from_tokens(["Barack", "Obama", "was", "born", "in", "Hawaii", "."])
            .with_mention(Mention::new("Barack Obama", 0, 1).with_entity_type("PERSON"))
            .with_mention(Mention::new("Hawaii", 5, 5).with_entity_type("STATE_OR_PROVINCE"))
    }

    #[test]
    fn test_link_sentence_writes_mentions_and_tokens() {
        let mut sentence = obama_sentence();
        let outcome = link_isolated(&mut sentence, &*dictionary(), None);

        assert_eq!(outcome, SentenceOutcome::Completed { linked_mentions: 2 });
        assert_eq!(
            sentence.token_links(),
            vec![
                Some("Barack_Obama"),
                Some("Barack_Obama"),
                Some("O"),
                Some("O"),
                Some("O"),
                Some("Hawaii"),
                Some("O"),
            ]
        );
        let mentions = sentence.mentions.as_ref().unwrap();
        assert_eq!(mentions[0].linked_id.as_deref(), Some("Barack_Obama"));
        assert_eq!(mentions[1].linked_id.as_deref(), Some("Hawaii"));
    }

    #[test]
    fn test_sentence_without_mentions_list_fails_untouched() {
        let mut sentence = Sentence {
            tokens: vec![Token::new("Hello")],
            mentions: None,
        };
        let outcome = link_isolated(&mut sentence, &*dictionary(), None);

        assert_eq!(outcome, SentenceOutcome::Failed(SentenceError::MissingMentions));
        assert_eq!(sentence.token_links(), vec![None]);
    }

    #[test]
    fn test_out_of_range_span_fails_without_partial_writes() {
        let mut sentence = obama_sentence().with_mention(Mention::new("Kenya", 7, 8));
        let before = sentence.clone();

        let outcome = link_isolated(&mut sentence, &*dictionary(), None);
        assert_eq!(
            outcome,
            SentenceOutcome::Failed(SentenceError::SpanOutOfRange {
                mention: 2,
                start: 7,
                end: 8,
                token_count: 7,
            })
        );
        assert_eq!(sentence, before);
    }

    #[test]
    fn test_inverted_span_fails() {
        let mut sentence = obama_sentence().with_mention(Mention::new("born in", 4, 3));
        let outcome = link_isolated(&mut sentence, &*dictionary(), None);
        assert!(matches!(
            outcome,
            SentenceOutcome::Failed(SentenceError::InvertedSpan { mention: 2, .. })
        ));
    }

    #[test]
    fn test_missing_surface_form_fails() {
        let mut mention = Mention::new("was", 2, 2);
        mention.text = None;
        let mut sentence = obama_sentence().with_mention(mention);

        let outcome = link_isolated(&mut sentence, &*dictionary(), None);
        assert_eq!(
            outcome,
            SentenceOutcome::Failed(SentenceError::MissingSurfaceForm { mention: 2 })
        );
    }

    #[test]
    fn test_exhausted_time_budget_fails_untouched() {
        let mut sentence = obama_sentence();
        let before = sentence.clone();

        let outcome = link_isolated(&mut sentence, &*dictionary(), Some(Duration::ZERO));
        assert_eq!(
            outcome,
            SentenceOutcome::Failed(SentenceError::TimedOut { budget_ms: 0 })
        );
        assert_eq!(sentence, before);
    }

    #[test]
    fn test_generous_time_budget_completes() {
        let mut sentence = obama_sentence();
        let outcome =
            link_isolated(&mut sentence, &*dictionary(), Some(Duration::from_secs(60)));
        assert!(outcome.is_completed());
    }

    struct PanickingLookup;

    impl SurfaceFormLookup for PanickingLookup {
        fn lookup(&self, surface_form: &str) -> Option<&str> {
            if surface_form == "boom" {
                panic!("lookup exploded on {}", surface_form);
            }
            None
        }
    }

    #[test]
    fn test_panic_is_contained_to_its_sentence() {
        let driver = SentenceDriver::new(
            Arc::new(PanickingLookup),
            DriverOptions {
                threads: 2,
                sentence_timeout: None,
            },
        )
        .unwrap();

        let exploding = Sentence::from_tokens(["boom"])
            .with_mention(Mention::new("boom", 0, 0).with_entity_type("MISC"));
        let fine = Sentence::from_tokens(["in", "1999"])
            .with_mention(Mention::new("1999", 1, 1).with_entity_type("DATE"));
        let mut doc = Document::new("boom in 1999", vec![exploding, fine]);

        let report = driver.annotate(&mut doc);

        match &report.outcomes[0] {
            SentenceOutcome::Failed(SentenceError::Panicked { message }) => {
                assert!(message.contains("lookup exploded on boom"), "{}", message);
            }
            other => panic!("expected a panic failure, got {:?}", other),
        }
        assert_eq!(report.outcomes[1], SentenceOutcome::Completed { linked_mentions: 1 });
        assert_eq!(doc.sentences[0].token_links(), vec![None]);
        assert_eq!(doc.sentences[1].token_links(), vec![Some("O"), Some("1999")]);
    }

    struct SlowLookup(Duration);

    impl SurfaceFormLookup for SlowLookup {
        fn lookup(&self, _surface_form: &str) -> Option<&str> {
            std::thread::sleep(self.0);
            Some("Slow_Link")
        }
    }

    #[test]
    fn test_overrun_on_last_mention_commits_nothing() {
        let lookup = SlowLookup(Duration::from_millis(100));
        let mut sentence = Sentence::from_tokens(["Tortoise"])
            .with_mention(Mention::new("Tortoise", 0, 0).with_entity_type("ANIMAL"));

        let outcome = link_isolated(&mut sentence, &lookup, Some(Duration::from_millis(10)));

        assert_eq!(
            outcome,
            SentenceOutcome::Failed(SentenceError::TimedOut { budget_ms: 10 })
        );
        assert_eq!(sentence.token_links(), vec![None]);
        assert!(sentence.mentions.as_ref().unwrap()[0].linked_id.is_none());
    }

    #[test]
    fn test_slow_sentence_within_budget_completes() {
        let lookup = SlowLookup(Duration::from_millis(1));
        let mut sentence = Sentence::from_tokens(["Tortoise"])
            .with_mention(Mention::new("Tortoise", 0, 0).with_entity_type("ANIMAL"));

        let outcome = link_isolated(&mut sentence, &lookup, Some(Duration::from_secs(30)));

        assert_eq!(outcome, SentenceOutcome::Completed { linked_mentions: 1 });
        assert_eq!(sentence.token_links(), vec![Some("Slow_Link")]);
    }

    #[test]
    fn test_zero_threads_means_sequential() {
        let driver = SentenceDriver::new(
            dictionary(),
            DriverOptions {
                threads: 0,
                sentence_timeout: None,
            },
        )
        .unwrap();
        assert_eq!(driver.options().threads, 1);
    }

    #[test]
    fn test_report_accessors() {
        let report = DocumentReport {
            outcomes: vec![
                SentenceOutcome::Completed { linked_mentions: 2 },
                SentenceOutcome::Failed(SentenceError::MissingMentions),
                SentenceOutcome::Completed { linked_mentions: 1 },
            ],
        };

        assert!(!report.is_success());
        assert_eq!(report.completed().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(
            report.failed().collect::<Vec<_>>(),
            vec![(1, &SentenceError::MissingMentions)]
        );
        assert_eq!(report.linked_mentions(), 3);
    }
}
