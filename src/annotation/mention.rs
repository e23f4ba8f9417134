//! Entity mentions and the values upstream stages attach to them.

use serde::{Deserialize, Serialize};

/// An inclusive range of token indices within the owning sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenSpan {
    /// Inclusive start token index
    pub start: usize,
    /// Inclusive end token index
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of tokens covered, or zero for an inverted span.
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenSpan {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// A numeric value resolved by upstream number normalization.
///
/// Renders the way a plain number literal reads: `3` for integers, `2.5` or
/// `3.0` for decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericValue {
    Integer(i64),
    Decimal(f64),
}

impl std::fmt::Display for NumericValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumericValue::Integer(value) => write!(f, "{}", value),
            // Debug keeps the trailing `.0` on whole decimals
            NumericValue::Decimal(value) => write!(f, "{:?}", value),
        }
    }
}

impl From<i64> for NumericValue {
    fn from(value: i64) -> Self {
        NumericValue::Integer(value)
    }
}

impl From<f64> for NumericValue {
    fn from(value: f64) -> Self {
        NumericValue::Decimal(value)
    }
}

/// A detected entity mention.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mention {
    /// Tokenized text of the mention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Untokenized source text; preferred as the surface form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    /// NER tag, e.g. `PERSON`, `DATE`, `ORDINAL`, or `O`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// Normalized timex value, for DATE / TIME / SET mentions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_value: Option<String>,
    /// Normalized number, for ORDINAL mentions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<NumericValue>,
    /// Member tokens in the owning sentence.
    pub tokens: TokenSpan,
    /// Canonical id written by the linker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_id: Option<String>,
}

impl Mention {
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: Some(text.into()),
            tokens: TokenSpan::new(start, end),
            ..Self::default()
        }
    }

    pub fn with_original_text(mut self, original_text: impl Into<String>) -> Self {
        self.original_text = Some(original_text.into());
        self
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_temporal_value(mut self, value: impl Into<String>) -> Self {
        self.temporal_value = Some(value.into());
        self
    }

    pub fn with_numeric_value(mut self, value: impl Into<NumericValue>) -> Self {
        self.numeric_value = Some(value.into());
        self
    }

    /// The original text when present, otherwise the tokenized text.
    pub fn surface_form(&self) -> Option<&str> {
        self.original_text.as_deref().or(self.text.as_deref())
    }

    /// Borrow the attributes the resolver reads, if a surface form exists.
    pub fn attrs(&self) -> Option<MentionAttrs<'_>> {
        Some(MentionAttrs {
            surface_form: self.surface_form()?,
            entity_type: self.entity_type.as_deref(),
            temporal_value: self.temporal_value.as_deref(),
            numeric_value: self.numeric_value,
        })
    }
}

/// The read-only view of a mention that linking decisions are made from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MentionAttrs<'a> {
    pub surface_form: &'a str,
    pub entity_type: Option<&'a str>,
    pub temporal_value: Option<&'a str>,
    pub numeric_value: Option<NumericValue>,
}

impl<'a> MentionAttrs<'a> {
    pub fn new(surface_form: &'a str) -> Self {
        Self {
            surface_form,
            entity_type: None,
            temporal_value: None,
            numeric_value: None,
        }
    }

    pub fn with_entity_type(mut self, entity_type: &'a str) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn with_temporal_value(mut self, value: &'a str) -> Self {
        self.temporal_value = Some(value);
        self
    }

    pub fn with_numeric_value(mut self, value: impl Into<NumericValue>) -> Self {
        self.numeric_value = Some(value.into());
        self
    }
}
