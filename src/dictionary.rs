//! The Wikidict: an immutable surface form to canonical id table.
//!
//! The table is read once from a `<text, link, score>` TSV file and then
//! shared read-only by every linking worker. Most entities have many surface
//! forms, so link strings are interned and each entry only stores a key into
//! the frozen interner.

use std::collections::HashMap;
use std::fs::File;
use std::hash::BuildHasher;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lasso::{Rodeo, RodeoReader, Spur};
use tracing::info;

use crate::errors::{LoadError, LoadResult};

/// Number of inserted entries between progress log lines.
const PROGRESS_INTERVAL: usize = 1_000_000;

/// Rough size of one `<text, link, score>` row, for pre-sizing the table.
const ESTIMATED_ROW_BYTES: u64 = 48;

/// Cap on the pre-sized table, so a huge or misreported file size cannot
/// request an absurd allocation up front.
const MAX_CAPACITY_HINT: usize = 64_000_000;

/// Read-only lookup from an exact surface form to its canonical id.
///
/// Implementations must be safe to query from any number of threads.
pub trait SurfaceFormLookup: Send + Sync {
    fn lookup(&self, surface_form: &str) -> Option<&str>;
}

impl<S: BuildHasher + Send + Sync> SurfaceFormLookup for HashMap<String, String, S> {
    fn lookup(&self, surface_form: &str) -> Option<&str> {
        self.get(surface_form).map(String::as_str)
    }
}

/// Counters gathered while reading a dictionary file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Rows read, excluding continuation lines.
    pub rows: usize,
    /// Tab-prefixed continuation lines that were skipped.
    pub continuation_lines: usize,
    /// Rows dropped for scoring under the threshold.
    pub below_threshold: usize,
    pub elapsed: Duration,
}

/// Immutable surface form dictionary with interned canonical ids.
pub struct Wikidict {
    entries: HashMap<Box<str>, Spur>,
    links: RodeoReader,
    stats: LoadStats,
}

impl std::fmt::Debug for Wikidict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wikidict")
            .field("entries", &self.entries.len())
            .field("distinct_links", &self.links.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Wikidict {
    /// Read a dictionary from a `<text, link, score>` TSV file.
    ///
    /// With a `threshold` above zero, rows scoring below it are dropped and
    /// every score must parse as a float. Any I/O failure or malformed row is
    /// fatal.
    pub fn load(path: impl AsRef<Path>, threshold: f64) -> LoadResult<Self> {
        let path = path.as_ref();
        info!("Reading Wikidict from {}", path.display());
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let capacity = file
            .metadata()
            .map(|metadata| capacity_hint(metadata.len()))
            .unwrap_or(0);
        read_rows(BufReader::new(file), path, threshold, capacity)
    }

    /// Read a dictionary from any buffered source.
    ///
    /// `origin` only names the source in errors and log lines.
    pub fn from_reader<R: BufRead>(
        reader: R,
        origin: impl AsRef<Path>,
        threshold: f64,
    ) -> LoadResult<Self> {
        read_rows(reader, origin.as_ref(), threshold, 0)
    }

    /// Build a dictionary from in-memory pairs. Later pairs overwrite earlier
    /// ones with the same surface form.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut builder = WikidictBuilder::with_capacity(0);
        for (surface_form, link) in entries {
            builder.insert(surface_form.as_ref(), link.as_ref());
        }
        builder.finish(LoadStats::default())
    }

    /// The canonical id for an exact surface form.
    pub fn lookup(&self, surface_form: &str) -> Option<&str> {
        self.entries
            .get(surface_form)
            .map(|key| self.links.resolve(key))
    }

    /// Number of surface forms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct canonical ids stored.
    pub fn distinct_links(&self) -> usize {
        self.links.len()
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }
}

impl SurfaceFormLookup for Wikidict {
    fn lookup(&self, surface_form: &str) -> Option<&str> {
        Wikidict::lookup(self, surface_form)
    }
}

fn read_rows<R: BufRead>(
    reader: R,
    origin: &Path,
    threshold: f64,
    capacity: usize,
) -> LoadResult<Wikidict> {
    let start = Instant::now();
    let mut builder = WikidictBuilder::with_capacity(capacity);
    let mut stats = LoadStats::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.map_err(|source| LoadError::Io {
            path: origin.to_path_buf(),
            source,
        })?;

        // Continuation of a multi-line value from the previous row
        if line.starts_with('\t') {
            stats.continuation_lines += 1;
            continue;
        }
        stats.rows += 1;

        let (surface_form, link, score) = split_row(&line, origin, line_number)?;

        if threshold > 0.0 {
            let score: f64 = score.trim().parse().map_err(|source| LoadError::InvalidScore {
                path: origin.to_path_buf(),
                line: line_number,
                value: score.to_string(),
                source,
            })?;
            if score < threshold {
                stats.below_threshold += 1;
                continue;
            }
        }

        builder.insert(surface_form, link);

        if builder.inserted % PROGRESS_INTERVAL == 0 {
            info!(
                "Loaded {} entries from Wikidict [{:.1?} elapsed]",
                builder.inserted,
                start.elapsed()
            );
        }
    }

    stats.elapsed = start.elapsed();
    let dict = builder.finish(stats);
    info!(
        "Done reading Wikidict ({} rows, {} links kept, {} distinct targets, {} continuation lines skipped, {} rows under threshold; {:.1?} elapsed)",
        stats.rows,
        dict.len(),
        dict.distinct_links(),
        stats.continuation_lines,
        stats.below_threshold,
        stats.elapsed
    );
    Ok(dict)
}

/// Expected entry count for a dictionary file of `file_len` bytes.
fn capacity_hint(file_len: u64) -> usize {
    usize::try_from(file_len / ESTIMATED_ROW_BYTES)
        .unwrap_or(MAX_CAPACITY_HINT)
        .min(MAX_CAPACITY_HINT)
}

/// Mutable staging area used while a dictionary is being read.
struct WikidictBuilder {
    entries: HashMap<Box<str>, Spur>,
    links: Rodeo,
    inserted: usize,
}

impl WikidictBuilder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            links: Rodeo::new(),
            inserted: 0,
        }
    }

    fn insert(&mut self, surface_form: &str, link: &str) {
        let key = self.links.get_or_intern(link);
        self.entries.insert(surface_form.into(), key);
        self.inserted += 1;
    }

    fn finish(mut self, stats: LoadStats) -> Wikidict {
        self.entries.shrink_to_fit();
        Wikidict {
            entries: self.entries,
            links: self.links.into_reader(),
            stats,
        }
    }
}

/// Split a row into exactly three tab-separated fields.
fn split_row<'l>(
    line: &'l str,
    origin: &Path,
    line_number: usize,
) -> LoadResult<(&'l str, &'l str, &'l str)> {
    let mut fields = line.split('\t');
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(surface_form), Some(link), Some(score), None) => Ok((surface_form, link, score)),
        _ => Err(LoadError::MalformedRow {
            path: PathBuf::from(origin),
            line: line_number,
            fields: line.split('\t').count(),
        }),
    }
}
