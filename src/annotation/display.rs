use std::fmt::Write;

use unicode_width::UnicodeWidthStr;

use super::{Mention, Sentence};

/// Renders a sentence with the canonical id of each linked mention drawn
/// under its tokens.
///
/// ```text
/// Barack  Obama  visited  Paris  on  January  1  ,  2016
/// ╰───────────╯Barack_Obama
///                         ╰───╯Paris
///                                    ╰─────────────────╯2016-01-01
/// ```
pub struct SentenceDisplay<'a> {
    sentence: &'a Sentence,
    show_entity_types: bool,
}

impl<'a> std::fmt::Display for SentenceDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const SPACE_PADDING: usize = 2;
        let mut token_idx_to_start_display_char_idx = Vec::new();
        let mut token_idx_to_end_display_char_idx = Vec::new();

        let mut opening_line = String::new();
        for (idx, token) in self.sentence.tokens.iter().enumerate() {
            if idx > 0 {
                opening_line.extend(std::iter::repeat(' ').take(SPACE_PADDING));
            }
            token_idx_to_start_display_char_idx.push(UnicodeWidthStr::width(&*opening_line));
            opening_line.push_str(&token.text);
            token_idx_to_end_display_char_idx.push(UnicodeWidthStr::width(&*opening_line));
        }

        f.write_str(&opening_line)?;

        for mention in self.linked_mentions() {
            let (start_char_idx, end_char_idx) = match (
                token_idx_to_start_display_char_idx.get(mention.tokens.start),
                token_idx_to_end_display_char_idx.get(mention.tokens.end),
            ) {
                (Some(&start), Some(&end)) if start < end => (start, end),
                _ => continue,
            };

            f.write_char('\n')?;
            for _ in 0..start_char_idx {
                f.write_char(' ')?;
            }

            f.write_char('╰')?;
            for _ in (start_char_idx + 1)..end_char_idx.saturating_sub(1) {
                f.write_char('─')?;
            }
            if end_char_idx - start_char_idx > 1 {
                f.write_char('╯')?;
            }

            if self.show_entity_types {
                if let Some(entity_type) = &mention.entity_type {
                    write!(f, "[{}] ", entity_type)?;
                }
            }

            if let Some(linked_id) = &mention.linked_id {
                f.write_str(linked_id)?;
            }
        }

        Ok(())
    }
}

impl<'a> SentenceDisplay<'a> {
    pub fn new(sentence: &'a Sentence) -> Self {
        SentenceDisplay {
            sentence,
            show_entity_types: false,
        }
    }

    /// Prefix each linked id with the mention's entity type.
    pub fn with_entity_types(mut self) -> Self {
        self.show_entity_types = true;
        self
    }

    fn linked_mentions(&self) -> impl Iterator<Item = &'a Mention> {
        self.sentence
            .mentions
            .iter()
            .flatten()
            .filter(|mention| mention.linked_id.is_some())
    }
}
