// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-character boundary information.
//!
//! [`compute_log_attrs`] produces one [`LogAttr`] record per character
//! boundary (`n_chars + 1` for an `n_chars` buffer) from the Unicode
//! segmentation rules, then overlays break-affecting attributes.

use icu_segmenter::options::{
    LineBreakOptions, LineBreakWordOption, SentenceBreakInvariantOptions,
    WordBreakInvariantOptions,
};
use icu_segmenter::{
    GraphemeClusterSegmenter, GraphemeClusterSegmenterBorrowed, LineSegmenter,
    LineSegmenterBorrowed, SentenceSegmenter, WordSegmenter, WordSegmenterBorrowed,
};

use crate::attr::{AttrKind, AttrList};

bitflags::bitflags! {
    /// Boundary flags for one character position.
    ///
    /// A record at position `k` describes the boundary *between* character
    /// `k - 1` and character `k`; flags that describe a character (such as
    /// [`LogAttr::WHITE`]) refer to character `k`.
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
    pub struct LogAttr: u16 {
        /// The line can break before this character.
        const LINE_BREAK = 1 << 0;
        /// The line must break before this character.
        const MANDATORY_BREAK = 1 << 1;
        /// A character-granularity break is possible before this character.
        const CHAR_BREAK = 1 << 2;
        /// This character is whitespace.
        const WHITE = 1 << 3;
        /// The cursor can appear in front of this character.
        const CURSOR_POSITION = 1 << 4;
        /// A word starts here.
        const WORD_START = 1 << 5;
        /// A word ended before this position.
        const WORD_END = 1 << 6;
        /// A sentence boundary.
        const SENTENCE_BOUNDARY = 1 << 7;
        /// A sentence starts here.
        const SENTENCE_START = 1 << 8;
        /// A sentence ended before this position.
        const SENTENCE_END = 1 << 9;
        /// Backspace at this position deletes one character rather than the
        /// entire grapheme.
        const BACKSPACE_DELETES_CHARACTER = 1 << 10;
        /// This character is a space that stretches under justification.
        const EXPANDABLE_SPACE = 1 << 11;
        /// A word boundary (start, end, or both).
        const WORD_BOUNDARY = 1 << 12;
        /// Breaking here requires a hyphen to be inserted.
        const BREAK_INSERTS_HYPHEN = 1 << 13;
        /// Breaking here removes the preceding character.
        const BREAK_REMOVES_PRECEDING = 1 << 14;
    }
}

fn grapheme_segmenter() -> GraphemeClusterSegmenterBorrowed<'static> {
    const { GraphemeClusterSegmenter::new() }
}

fn word_segmenter() -> WordSegmenterBorrowed<'static> {
    const { WordSegmenter::new_for_non_complex_scripts(WordBreakInvariantOptions::default()) }
}

fn line_segmenter() -> LineSegmenterBorrowed<'static> {
    const {
        let mut options = LineBreakOptions::default();
        options.word_option = Some(LineBreakWordOption::Normal);
        LineSegmenter::new_for_non_complex_scripts(options)
    }
}

/// Maps byte offsets to character indices.
struct CharMap {
    /// Byte offset of each character, plus the total length.
    offsets: Vec<usize>,
}

impl CharMap {
    fn new(text: &str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self { offsets }
    }

    fn n_chars(&self) -> usize {
        self.offsets.len() - 1
    }

    /// The index of the character containing `byte` (mid-character offsets
    /// round down).
    fn char_index(&self, byte: usize) -> usize {
        match self.offsets.binary_search(&byte) {
            Ok(index) => index,
            Err(index) => index - 1,
        }
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.offsets[char_index]
    }
}

/// Computes boundary attributes for `text` from the Unicode segmentation
/// rules, then overlays the break-affecting attributes from `attrs`.
pub fn compute_log_attrs(text: &str, attrs: Option<&AttrList>) -> Vec<LogAttr> {
    let map = CharMap::new(text);
    let n_chars = map.n_chars();
    let mut log_attrs = vec![LogAttr::empty(); n_chars + 1];
    let chars: Vec<char> = text.chars().collect();

    // Grapheme boundaries give cursor positions and char breaks.
    let mut prev_boundary = 0;
    for byte in grapheme_segmenter().segment_str(text) {
        let i = map.char_index(byte);
        log_attrs[i] |= LogAttr::CURSOR_POSITION;
        if i > 0 {
            log_attrs[i] |= LogAttr::CHAR_BREAK;
            if i - prev_boundary == 1 {
                log_attrs[i] |= LogAttr::BACKSPACE_DELETES_CHARACTER;
            }
        }
        prev_boundary = i;
    }
    log_attrs[n_chars] |= LogAttr::CURSOR_POSITION;
    if n_chars > 0 {
        log_attrs[n_chars] |= LogAttr::CHAR_BREAK;
    }

    // Line break opportunities.
    for byte in line_segmenter().segment_str(text) {
        let i = map.char_index(byte);
        if i > 0 {
            log_attrs[i] |= LogAttr::LINE_BREAK;
        }
    }
    log_attrs[n_chars] |= LogAttr::LINE_BREAK;

    // Mandatory breaks after paragraph and line separators.
    for (i, &c) in chars.iter().enumerate() {
        let mandatory = match c {
            '\r' => chars.get(i + 1) != Some(&'\n'),
            '\n' | '\u{85}' | '\u{2028}' | '\u{2029}' => true,
            _ => false,
        };
        if mandatory {
            log_attrs[i + 1] |= LogAttr::MANDATORY_BREAK | LogAttr::LINE_BREAK;
        }
    }

    // Per-character whitespace classification.
    for (i, &c) in chars.iter().enumerate() {
        if c.is_whitespace() && c != '\u{a0}' && c != '\u{202f}' {
            log_attrs[i] |= LogAttr::WHITE;
        }
        if c == ' ' || c == '\u{a0}' {
            log_attrs[i] |= LogAttr::EXPANDABLE_SPACE;
        }
    }

    // Word boundaries. The segmenter reports the type of each segment as it
    // is crossed; word-like segments contribute start and end positions.
    {
        let segmenter = word_segmenter();
        let mut iter = segmenter.segment_str(text);
        let mut prev = match iter.next() {
            Some(b) => map.char_index(b),
            None => 0,
        };
        log_attrs[prev] |= LogAttr::WORD_BOUNDARY;
        while let Some(byte) = iter.next() {
            let i = map.char_index(byte);
            log_attrs[i] |= LogAttr::WORD_BOUNDARY;
            if iter.word_type().is_word_like() {
                log_attrs[prev] |= LogAttr::WORD_START;
                log_attrs[i] |= LogAttr::WORD_END;
            }
            prev = i;
        }
    }

    // Sentence boundaries.
    {
        let segmenter = SentenceSegmenter::new(SentenceBreakInvariantOptions::default());
        let boundaries: Vec<usize> = segmenter
            .segment_str(text)
            .map(|b| map.char_index(b))
            .collect();
        for (k, &i) in boundaries.iter().enumerate() {
            log_attrs[i] |= LogAttr::SENTENCE_BOUNDARY;
            if i < n_chars {
                log_attrs[i] |= LogAttr::SENTENCE_START;
            }
            if k > 0 {
                log_attrs[i] |= LogAttr::SENTENCE_END;
            }
        }
    }

    // Hyphenation: breaking inside a word wants a hyphen, except right
    // after an explicit hyphen. A soft hyphen becomes visible at the break
    // and replaces itself.
    for i in 1..n_chars {
        if !log_attrs[i].intersects(LogAttr::LINE_BREAK | LogAttr::CHAR_BREAK)
            || log_attrs[i].contains(LogAttr::MANDATORY_BREAK)
            || log_attrs[i].contains(LogAttr::WORD_BOUNDARY)
        {
            continue;
        }
        let prev = chars[i - 1];
        if prev == '\u{ad}' {
            log_attrs[i] |= LogAttr::BREAK_INSERTS_HYPHEN | LogAttr::BREAK_REMOVES_PRECEDING;
        } else if !matches!(prev, '-' | '\u{2010}' | '\u{2012}' | '\u{2013}') {
            log_attrs[i] |= LogAttr::BREAK_INSERTS_HYPHEN;
        }
    }

    if let Some(attrs) = attrs {
        tailor_attrs(&map, attrs, &mut log_attrs);
    }

    log_attrs
}

/// Applies break-affecting attributes on top of computed attributes.
fn tailor_attrs(map: &CharMap, attrs: &AttrList, log_attrs: &mut [LogAttr]) {
    let text_len = map.byte_offset(map.n_chars());

    // Character range strictly inside an attribute's byte range.
    let inner_range = |attr: &crate::attr::Attribute| {
        let start = (attr.start_index as usize).min(text_len);
        let end = (attr.end_index as usize).min(text_len);
        if start >= end {
            return None;
        }
        Some((map.char_index(start), map.char_index(end)))
    };

    for attr in attrs.attributes() {
        match attr.kind() {
            AttrKind::AllowBreaks if attr.value == crate::attr::AttrValue::AllowBreaks(false) => {
                if let Some((start, end)) = inner_range(attr) {
                    for la in &mut log_attrs[start + 1..end] {
                        if !la.contains(LogAttr::MANDATORY_BREAK) {
                            la.remove(LogAttr::LINE_BREAK | LogAttr::CHAR_BREAK);
                        }
                    }
                }
            }
            AttrKind::InsertHyphens
                if attr.value == crate::attr::AttrValue::InsertHyphens(false) =>
            {
                if let Some((start, end)) = inner_range(attr) {
                    for la in &mut log_attrs[start + 1..end] {
                        la.remove(LogAttr::BREAK_INSERTS_HYPHEN | LogAttr::BREAK_REMOVES_PRECEDING);
                    }
                }
            }
            AttrKind::Word => {
                if let Some((start, end)) = inner_range(attr) {
                    for la in &mut log_attrs[start + 1..end] {
                        la.remove(
                            LogAttr::WORD_START
                                | LogAttr::WORD_END
                                | LogAttr::WORD_BOUNDARY
                                | LogAttr::BREAK_INSERTS_HYPHEN,
                        );
                        if !la.contains(LogAttr::MANDATORY_BREAK) {
                            la.remove(LogAttr::LINE_BREAK | LogAttr::CHAR_BREAK);
                        }
                    }
                    log_attrs[start] |= LogAttr::WORD_START | LogAttr::WORD_BOUNDARY;
                    log_attrs[end] |= LogAttr::WORD_END | LogAttr::WORD_BOUNDARY;
                }
            }
            AttrKind::Sentence => {
                if let Some((start, end)) = inner_range(attr) {
                    for la in &mut log_attrs[start + 1..end] {
                        la.remove(
                            LogAttr::SENTENCE_START
                                | LogAttr::SENTENCE_END
                                | LogAttr::SENTENCE_BOUNDARY,
                        );
                    }
                    log_attrs[start] |= LogAttr::SENTENCE_START | LogAttr::SENTENCE_BOUNDARY;
                    log_attrs[end] |= LogAttr::SENTENCE_END | LogAttr::SENTENCE_BOUNDARY;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttrList, AttrValue, Attribute};

    #[test]
    fn record_count_is_chars_plus_one() {
        let attrs = compute_log_attrs("héllo", None);
        assert_eq!(attrs.len(), 6);
    }

    #[test]
    fn spaces_break_lines() {
        let attrs = compute_log_attrs("hello world", None);
        // Break opportunity before 'w'.
        assert!(attrs[6].contains(LogAttr::LINE_BREAK));
        assert!(!attrs[6].contains(LogAttr::MANDATORY_BREAK));
        assert!(attrs[5].contains(LogAttr::WHITE));
        assert!(attrs[5].contains(LogAttr::EXPANDABLE_SPACE));
    }

    #[test]
    fn newline_is_mandatory() {
        let attrs = compute_log_attrs("ab\ncd", None);
        assert!(attrs[3].contains(LogAttr::MANDATORY_BREAK));
        let crlf = compute_log_attrs("ab\r\ncd", None);
        assert!(crlf[4].contains(LogAttr::MANDATORY_BREAK));
        assert!(!crlf[3].contains(LogAttr::MANDATORY_BREAK));
    }

    #[test]
    fn words_and_sentences() {
        let attrs = compute_log_attrs("one two", None);
        assert!(attrs[0].contains(LogAttr::WORD_START));
        assert!(attrs[3].contains(LogAttr::WORD_END));
        assert!(attrs[4].contains(LogAttr::WORD_START));
        assert!(attrs[7].contains(LogAttr::WORD_END));
        assert!(attrs[0].contains(LogAttr::SENTENCE_START));
        assert!(attrs[7].contains(LogAttr::SENTENCE_END));
    }

    #[test]
    fn soft_hyphen_break_removes_preceding() {
        let text = "co\u{ad}operate";
        let attrs = compute_log_attrs(text, None);
        // Break opportunity after the soft hyphen (char index 3).
        assert!(attrs[3].contains(LogAttr::LINE_BREAK));
        assert!(attrs[3].contains(LogAttr::BREAK_INSERTS_HYPHEN));
        assert!(attrs[3].contains(LogAttr::BREAK_REMOVES_PRECEDING));
    }

    #[test]
    fn char_breaks_inside_words_insert_hyphens() {
        let attrs = compute_log_attrs("frag", None);
        assert!(attrs[2].contains(LogAttr::CHAR_BREAK));
        assert!(attrs[2].contains(LogAttr::BREAK_INSERTS_HYPHEN));
    }

    #[test]
    fn allow_breaks_false_suppresses_opportunities() {
        let mut attrs = AttrList::new();
        attrs.insert(Attribute::with_range(AttrValue::AllowBreaks(false), 0, 11));
        let la = compute_log_attrs("hello world", Some(&attrs));
        assert!(!la[6].contains(LogAttr::LINE_BREAK));
        // The sentinel position past the end stays breakable.
        assert!(la[11].contains(LogAttr::LINE_BREAK));
    }

    #[test]
    fn insert_hyphens_false_suppresses_hyphens() {
        let mut attrs = AttrList::new();
        attrs.insert(Attribute::with_range(AttrValue::InsertHyphens(false), 0, 4));
        let la = compute_log_attrs("frag", Some(&attrs));
        assert!(la[2].contains(LogAttr::CHAR_BREAK));
        assert!(!la[2].contains(LogAttr::BREAK_INSERTS_HYPHEN));
    }
}
