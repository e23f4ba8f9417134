//! Deciding the canonical id of a single mention.
//!
//! A mention is first classified into one [`MentionKind`], checking the kinds
//! in a fixed priority order, and the kind then determines the link. The
//! order matters: an ordinal whose surface form is all digits is still an
//! ordinal, and a date is never looked up in the dictionary.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::annotation::{MentionAttrs, NumericValue, OUTSIDE_TYPE};
use crate::dictionary::SurfaceFormLookup;

/// Surface forms made only of digits and decimal points.
static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9.]+$").expect("Invalid number regex"));

/// Entity types whose mentions carry a normalized timex value.
const TEMPORAL_TYPES: &[&str] = &["DATE", "TIME", "SET"];

const ORDINAL_TYPE: &str = "ORDINAL";

/// Timex values that refer to an open-ended point and have no fixed date.
const OPEN_ENDED_TIMEX: &[&str] = &[
    "PRESENT",
    "PRESENT_REF",
    "PAST",
    "PAST_REF",
    "FUTURE",
    "FUTURE_REF",
];

/// Separates the date from the time of day in a timex value.
const TIME_OF_DAY_MARKER: char = 'T';

/// How a mention gets linked, in priority order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MentionKind<'a> {
    /// DATE / TIME / SET with a concrete timex value.
    Temporal(&'a str),
    /// DATE / TIME / SET whose timex is open-ended, e.g. `PRESENT_REF`.
    /// Deliberately unlinked.
    OpenEndedTemporal,
    Ordinal(NumericValue),
    /// Digits and decimal points only.
    Number(&'a str),
    /// Typed mention found in the dictionary.
    Dictionary(&'a str),
    Unlinked,
}

impl<'a> MentionKind<'a> {
    /// Classify a mention. The first matching kind wins.
    pub fn classify<L>(mention: &MentionAttrs<'a>, dictionary: &'a L) -> Self
    where
        L: SurfaceFormLookup + ?Sized,
    {
        let entity_type = mention.entity_type;

        if let (Some(entity_type), Some(timex)) = (entity_type, mention.temporal_value) {
            if is_one_of(entity_type, TEMPORAL_TYPES) {
                return if OPEN_ENDED_TIMEX.contains(&timex) {
                    MentionKind::OpenEndedTemporal
                } else {
                    MentionKind::Temporal(timex)
                };
            }
        }

        if let (Some(entity_type), Some(value)) = (entity_type, mention.numeric_value) {
            if entity_type.eq_ignore_ascii_case(ORDINAL_TYPE) {
                return MentionKind::Ordinal(value);
            }
        }

        if NUMBER_PATTERN.is_match(mention.surface_form) {
            return MentionKind::Number(mention.surface_form);
        }

        match entity_type {
            Some(entity_type) if entity_type != OUTSIDE_TYPE => dictionary
                .lookup(mention.surface_form)
                .map(MentionKind::Dictionary)
                .unwrap_or(MentionKind::Unlinked),
            _ => MentionKind::Unlinked,
        }
    }

    /// The canonical id this kind of mention links to.
    pub fn into_link(self) -> Option<String> {
        match self {
            MentionKind::Temporal(timex) => Some(normalize_timex(timex).to_string()),
            MentionKind::Ordinal(value) => Some(value.to_string()),
            MentionKind::Number(surface_form) => Some(surface_form.to_string()),
            MentionKind::Dictionary(link) => Some(link.to_string()),
            MentionKind::OpenEndedTemporal | MentionKind::Unlinked => None,
        }
    }
}

/// Link a single mention, or `None` if it should stay unlinked.
///
/// Absence of a link is an expected outcome, not an error; callers must not
/// fall back to the raw surface form.
pub fn resolve<L>(mention: &MentionAttrs<'_>, dictionary: &L) -> Option<String>
where
    L: SurfaceFormLookup + ?Sized,
{
    MentionKind::classify(mention, dictionary).into_link()
}

/// Reduce a timex value to the form it takes in the knowledge base: dates
/// have their time of day removed.
///
/// ```
/// use layered_wikidict::normalize_timex;
///
/// assert_eq!(normalize_timex("2016-01-01T00:00"), "2016-01-01");
/// assert_eq!(normalize_timex("2016-01"), "2016-01");
/// ```
pub fn normalize_timex(timex: &str) -> &str {
    match timex.find(TIME_OF_DAY_MARKER) {
        Some(idx) if timex != "PRESENT" => &timex[..idx],
        _ => timex,
    }
}

fn is_one_of(tag: &str, candidates: &[&str]) -> bool {
    candidates
        .iter()
        .any(|candidate| tag.eq_ignore_ascii_case(candidate))
}
