// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::env::{breaker, line_text, CHAR_W, HYPHEN_W};
use crate::attr::{AttrList, AttrValue, Attribute};
use crate::item::AnalysisFlags;
use crate::types::{Direction, EllipsizeMode, WrapMode, SCALE};

fn all_lines(
    breaker: &mut crate::line_breaker::LineBreaker,
    width: i32,
    wrap: WrapMode,
) -> Vec<crate::line::Line> {
    let mut lines = Vec::new();
    while let Some(line) = breaker.next_line(0, width, wrap, EllipsizeMode::None) {
        lines.push(line);
        assert!(lines.len() < 100, "runaway line production");
    }
    lines
}

#[test]
fn single_line_when_unconstrained() {
    let mut b = breaker();
    b.add_text("hello world", None);
    assert!(b.has_line());
    let lines = all_lines(&mut b, -1, WrapMode::Word);
    assert_eq!(lines.len(), 1);
    assert_eq!(line_text(&lines[0]), "hello world");
    assert!(!lines[0].wrapped());
    assert!(lines[0].starts_paragraph());
    assert!(lines[0].ends_paragraph());
    assert!(!b.has_line());
}

#[test]
fn simple_word_wrap() {
    let mut b = breaker();
    b.add_text("hello world", None);
    let lines = all_lines(&mut b, 5 * CHAR_W, WrapMode::Word);

    assert_eq!(lines.len(), 2);
    assert_eq!(line_text(&lines[0]), "hello ");
    assert_eq!(line_text(&lines[1]), "world");
    assert!(lines[0].wrapped());
    assert!(!lines[0].ends_paragraph());
    assert!(lines[1].ends_paragraph());

    // The trailing space was zeroed, so the line is exactly five chars
    // wide.
    assert_eq!(lines[0].width(), 5 * CHAR_W);
    assert_eq!(lines[1].width(), 5 * CHAR_W);
}

#[test]
fn breaker_conserves_text() {
    let mut b = breaker();
    let text = "aaa bbb ccc\nddd eee\nfff";
    b.add_text(text, None);
    let lines = all_lines(&mut b, 4 * CHAR_W, WrapMode::Word);

    let rebuilt: String = lines.iter().map(line_text).collect();
    let without_separators: String = text.chars().filter(|&c| c != '\n').collect();
    assert_eq!(rebuilt, without_separators);

    // Lines tile the text in order.
    let mut position = 0;
    for line in &lines {
        assert!(line.start_index() >= position);
        position = line.start_index() + line.length();
    }
    assert_eq!(position, text.len());
}

#[test]
fn explicit_newlines_end_paragraphs() {
    let mut b = breaker();
    b.add_text("one\ntwo\n\nthree", None);
    let lines = all_lines(&mut b, -1, WrapMode::Word);

    assert_eq!(lines.len(), 4);
    assert_eq!(line_text(&lines[0]), "one");
    assert_eq!(line_text(&lines[1]), "two");
    assert_eq!(line_text(&lines[2]), "");
    assert_eq!(line_text(&lines[3]), "three");
    assert!(lines.iter().all(|l| l.ends_paragraph()));
    assert!(lines.iter().all(|l| l.starts_paragraph()));
}

#[test]
fn line_separator_breaks_without_ending_paragraph() {
    let mut b = breaker();
    b.add_text("ab\u{2028}cd", None);
    let lines = all_lines(&mut b, -1, WrapMode::Word);

    assert_eq!(lines.len(), 2);
    assert_eq!(line_text(&lines[0]), "ab\u{2028}");
    assert_eq!(line_text(&lines[1]), "cd");
    assert!(lines[0].wrapped());
    assert!(!lines[0].ends_paragraph());
}

#[test]
fn multiple_sources_queue_up() {
    let mut b = breaker();
    b.add_text("first", None);
    b.add_text("second", None);
    let lines = all_lines(&mut b, -1, WrapMode::Word);
    assert_eq!(lines.len(), 2);
    assert_eq!(line_text(&lines[0]), "first");
    assert_eq!(line_text(&lines[1]), "second");
    assert!(lines[0].ends_paragraph());
}

#[test]
fn word_char_fallback_hyphenates() {
    let mut b = breaker();
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::new(AttrValue::InsertHyphens(true)));
    b.add_text("supercalifragilistic", Some(&attrs));

    // Just under the full width, so a char-level break is forced.
    let lines = all_lines(&mut b, 15 * CHAR_W, WrapMode::WordChar);
    assert!(lines.len() >= 2);
    assert!(lines[0].hyphenated());
    assert!(lines[0].wrapped());
    let last_run = lines[0].runs().last().unwrap();
    assert!(last_run
        .item
        .analysis
        .flags
        .contains(AnalysisFlags::NEED_HYPHEN));
    // The shaped hyphen is included in the line width.
    assert!(lines[0].width() <= 15 * CHAR_W);
    assert_eq!(
        lines[0].width(),
        lines[0].n_chars() as i32 * CHAR_W + HYPHEN_W
    );

    let rebuilt: String = lines.iter().map(line_text).collect();
    assert_eq!(rebuilt, "supercalifragilistic");
}

#[test]
fn insert_hyphens_false_suppresses_hyphenation() {
    let mut b = breaker();
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::new(AttrValue::InsertHyphens(false)));
    b.add_text("supercalifragilistic", Some(&attrs));

    let lines = all_lines(&mut b, 15 * CHAR_W, WrapMode::WordChar);
    assert!(lines.len() >= 2);
    assert!(!lines[0].hyphenated());
    assert_eq!(lines[0].width(), lines[0].n_chars() as i32 * CHAR_W);
}

#[test]
fn undo_line_and_rebreak() {
    let mut b = breaker();
    b.add_text("one two three", None);

    let first = b.next_line(0, 4 * CHAR_W, WrapMode::Word, EllipsizeMode::None).unwrap();
    assert_eq!(line_text(&first), "one ");
    let second = b.next_line(0, 4 * CHAR_W, WrapMode::Word, EllipsizeMode::None).unwrap();
    assert_eq!(line_text(&second), "two ");

    assert!(b.undo_line(&second));

    // Re-break the undone content with a generous width.
    let redone = b.next_line(0, 100 * CHAR_W, WrapMode::Word, EllipsizeMode::None).unwrap();
    assert_eq!(line_text(&redone), "two three");
    assert!(redone.ends_paragraph());
    assert!(!b.has_line());
}

#[test]
fn undo_is_inverse_of_next_line() {
    let mut b = breaker();
    b.add_text("alpha beta gamma", None);

    let line = b.next_line(0, 6 * CHAR_W, WrapMode::Word, EllipsizeMode::None).unwrap();
    assert!(b.undo_line(&line));
    let again = b.next_line(0, 6 * CHAR_W, WrapMode::Word, EllipsizeMode::None).unwrap();

    assert_eq!(line_text(&line), line_text(&again));
    assert_eq!(line.start_index(), again.start_index());
    assert_eq!(line.width(), again.width());
    assert_eq!(line.wrapped(), again.wrapped());
}

#[test]
fn undo_whole_source_requeues_it() {
    let mut b = breaker();
    b.add_text("short", None);
    let line = b.next_line(0, -1, WrapMode::Word, EllipsizeMode::None).unwrap();
    assert!(!b.has_line());

    assert!(b.undo_line(&line));
    assert!(b.has_line());
    let again = b.next_line(0, -1, WrapMode::Word, EllipsizeMode::None).unwrap();
    assert_eq!(line_text(&again), "short");
}

#[test]
fn undo_rejects_non_latest_line() {
    let mut b = breaker();
    b.add_text("one two three four", None);
    let first = b.next_line(0, 4 * CHAR_W, WrapMode::Word, EllipsizeMode::None).unwrap();
    let _second = b.next_line(0, 4 * CHAR_W, WrapMode::Word, EllipsizeMode::None).unwrap();

    // `first` no longer ends at the breaker boundary.
    assert!(!b.undo_line(&first));
}

#[test]
fn ellipsize_end_consumes_paragraph() {
    let mut b = breaker();
    b.add_text("hello world", None);
    let line = b.next_line(0, 6 * CHAR_W, WrapMode::Word, EllipsizeMode::End).unwrap();

    assert!(line.ellipsized());
    assert!(line.width() <= 6 * CHAR_W);
    let ellipsis = line.runs().last().unwrap();
    assert!(ellipsis
        .item
        .analysis
        .flags
        .contains(AnalysisFlags::IS_ELLIPSIS));
    // The whole paragraph was consumed onto this line.
    assert!(!b.has_line());
}

#[test]
fn ellipsize_start_keeps_the_tail() {
    let mut b = breaker();
    b.add_text("hello world", None);
    let line = b
        .next_line(0, 6 * CHAR_W, WrapMode::Word, EllipsizeMode::Start)
        .unwrap();

    assert!(line.ellipsized());
    let ellipsis = line.runs().first().unwrap();
    assert!(ellipsis
        .item
        .analysis
        .flags
        .contains(AnalysisFlags::IS_ELLIPSIS));
}

#[test]
fn letter_spacing_spreads_between_graphemes() {
    let spacing = 2 * SCALE;
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::new(AttrValue::LetterSpacing(spacing)));

    let mut b = breaker();
    b.add_text("abc", Some(&attrs));
    let lines = all_lines(&mut b, -1, WrapMode::Word);
    assert_eq!(lines.len(), 1);

    // Spacing lands between graphemes; the line edges are trimmed.
    assert_eq!(lines[0].width(), 3 * CHAR_W + 2 * spacing);
}

#[test]
fn rise_shifts_runs_vertically() {
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::with_range(AttrValue::Rise(2 * SCALE), 1, 2));

    let mut b = breaker();
    b.add_text("abc", Some(&attrs));
    let lines = all_lines(&mut b, -1, WrapMode::Word);
    assert_eq!(lines.len(), 1);

    let offsets: Vec<i32> = lines[0].runs().iter().map(|r| r.y_offset).collect();
    assert_eq!(offsets, vec![0, 2 * SCALE, 0]);
}

#[test]
fn baseline_shift_superscript_uses_font_positions() {
    use crate::types::baseline_shift;
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::with_range(
        AttrValue::BaselineShift(baseline_shift::SUPERSCRIPT),
        1,
        2,
    ));

    let mut b = breaker();
    b.add_text("abc", Some(&attrs));
    let lines = all_lines(&mut b, -1, WrapMode::Word);

    // MonoFont reports a 4-unit superscript offset.
    let offsets: Vec<i32> = lines[0].runs().iter().map(|r| r.y_offset).collect();
    assert_eq!(offsets, vec![0, 4 * SCALE, 0]);
}

#[test]
fn rtl_text_reorders_runs_visually() {
    let mut b = breaker();
    b.add_text("\u{5e9}\u{5dc}\u{5d5}\u{5dd} abc", None);
    let lines = all_lines(&mut b, -1, WrapMode::Word);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].direction(), Direction::Rtl);

    let runs = lines[0].runs();
    assert!(runs.len() >= 2);
    // Visual order on an RTL line puts the Latin run first.
    assert_eq!(runs[0].item.analysis.level % 2, 0);
    assert_eq!(runs.last().unwrap().item.analysis.level % 2, 1);

    // Reordering permutes, never drops.
    let total_chars: usize = runs.iter().map(|r| r.item.num_chars).sum();
    assert_eq!(total_chars, lines[0].n_chars());
}

#[test]
fn render_attributes_split_runs() {
    use crate::types::Color;
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::with_range(
        AttrValue::Foreground(Color::new(0xffff, 0, 0)),
        2,
        4,
    ));

    let mut b = breaker();
    b.add_text("abcdef", Some(&attrs));
    let lines = all_lines(&mut b, -1, WrapMode::Word);

    let runs = lines[0].runs();
    assert_eq!(runs.len(), 3);
    assert!(runs[0].item.analysis.extra_attrs.is_empty());
    assert_eq!(runs[1].item.analysis.extra_attrs.len(), 1);
    assert_eq!(runs[1].item.offset, 2);
    assert_eq!(runs[1].item.length, 2);
}

#[test]
fn forced_overflow_when_nothing_fits() {
    let mut b = breaker();
    b.add_text("abcdef", None);
    // One char wide, word wrapping: every line takes the minimum one char.
    let lines = all_lines(&mut b, CHAR_W / 2, WrapMode::Char);
    let rebuilt: String = lines.iter().map(line_text).collect();
    assert_eq!(rebuilt, "abcdef");
    assert!(lines.iter().all(|l| l.n_chars() >= 1));
}
