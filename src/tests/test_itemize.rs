// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::env::context;
use crate::attr::{AttrKind, AttrList, AttrValue, Attribute};
use crate::itemize::itemize;
use crate::line_breaker::LineBreaker;
use crate::types::{Direction, Gravity};
use icu_properties::props::Script;

fn items_for(text: &str, attrs: Option<&AttrList>) -> Vec<crate::item::Item> {
    let context = context();
    itemize(&context, Direction::Neutral, text, attrs)
}

fn assert_partition(text: &str, items: &[crate::item::Item]) {
    let mut offset = 0;
    let mut char_offset = 0;
    for item in items {
        assert_eq!(item.offset, offset);
        assert_eq!(item.char_offset, char_offset);
        assert_eq!(
            text[item.offset..item.offset + item.length].chars().count(),
            item.num_chars
        );
        offset += item.length;
        char_offset += item.num_chars;
    }
    assert_eq!(offset, text.len());
    assert_eq!(char_offset, text.chars().count());
}

#[test]
fn empty_text_yields_no_items() {
    assert!(items_for("", None).is_empty());
}

#[test]
fn plain_latin_is_one_item() {
    let text = "hello world";
    let items = items_for(text, None);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].analysis.level, 0);
    assert_eq!(items[0].analysis.script, Script::Latin);
    assert_partition(text, &items);
}

#[test]
fn mixed_bidi_splits_into_three() {
    // Latin, then Hebrew, then Latin again.
    let text = "abc\u{5e2}\u{5d1}\u{5e8}\u{5d9}\u{5ea}def";
    let items = items_for(text, None);

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].analysis.level, 0);
    assert_eq!(items[1].analysis.level, 1);
    assert_eq!(items[2].analysis.level, 0);
    assert_eq!(items[0].analysis.script, Script::Latin);
    assert_eq!(items[1].analysis.script, Script::Hebrew);
    assert_eq!(items[2].analysis.script, Script::Latin);
    assert_partition(text, &items);
}

#[test]
fn separators_are_isolated() {
    let text = "a\tb\ncd";
    let items = items_for(text, None);
    assert_eq!(items.len(), 5);
    assert_eq!(&text[items[1].offset..items[1].offset + items[1].length], "\t");
    assert_eq!(&text[items[3].offset..items[3].offset + items[3].length], "\n");
    assert_partition(text, &items);
}

#[test]
fn crlf_stays_one_item() {
    let text = "a\r\nb";
    let items = items_for(text, None);
    assert_eq!(items.len(), 3);
    assert_eq!(
        &text[items[1].offset..items[1].offset + items[1].length],
        "\r\n"
    );
    assert_partition(text, &items);
}

#[test]
fn brackets_inherit_the_surrounding_script() {
    let text = "(abc)";
    let items = items_for(text, None);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].analysis.script, Script::Latin);
}

#[test]
fn itemization_attrs_split_items() {
    let text = "abcdef";
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::with_range(AttrValue::LetterSpacing(512), 2, 4));

    let items = items_for(text, Some(&attrs));
    assert_eq!(items.len(), 3);
    assert_partition(text, &items);

    assert!(items[0].analysis.extra_attrs.is_empty());
    assert_eq!(items[1].analysis.extra_attrs.len(), 1);
    assert_eq!(
        items[1].analysis.extra_attrs[0].kind(),
        AttrKind::LetterSpacing
    );
    assert!(items[2].analysis.extra_attrs.is_empty());
}

#[test]
fn language_attribute_changes_items() {
    use crate::types::Language;
    let text = "abcdef";
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::with_range(
        AttrValue::Language(Language::from_string("fr")),
        0,
        3,
    ));

    let items = items_for(text, Some(&attrs));
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].analysis.language, Language::from_string("fr"));
    assert_eq!(items[1].analysis.language, Language::default());
}

#[test]
fn adjacent_identical_analyses_merge() {
    // An attribute covering the whole text forces no boundary at all: the
    // segment never changes.
    let text = "abc def";
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::new(AttrValue::LetterSpacing(256)));
    let items = items_for(text, Some(&attrs));
    assert_eq!(items.len(), 1);
}

#[test]
fn east_gravity_forces_ltr_levels() {
    let mut context = context();
    context.set_base_gravity(Gravity::East);
    // Hebrew-first text would resolve RTL, but a clockwise-rotated layout
    // reads left-to-right, so the paragraph is forced LTR.
    let text = "\u{5d0}\u{5d1}abc";
    let items = itemize(&context, Direction::Neutral, text, None);

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].analysis.level, 1);
    assert_eq!(items[1].analysis.level, 0);
    assert!(items.iter().all(|item| item.analysis.gravity == Gravity::East));
    assert_partition(text, &items);
}

#[test]
fn west_gravity_forces_rtl_levels() {
    let mut context = context();
    context.set_base_gravity(Gravity::West);
    // A counter-clockwise-rotated layout reads right-to-left even for
    // Latin text.
    let items = itemize(&context, Direction::Neutral, "abc def", None);

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].analysis.level, 2);
    assert_eq!(items[0].analysis.gravity, Gravity::West);
}

#[test]
fn north_gravity_swaps_the_paragraph_direction() {
    let mut context = context();
    context.set_base_gravity(Gravity::North);
    // Content resolves LTR; the upside-down layout swaps it to RTL.
    let text = "abc\u{5d0}\u{5d1}";
    let items = itemize(&context, Direction::Neutral, text, None);

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].analysis.level, 2);
    assert_eq!(items[1].analysis.level, 1);
}

#[test]
fn gravity_attribute_redirects_its_run() {
    let mut attrs = AttrList::new();
    attrs.insert(Attribute::with_range(
        AttrValue::Gravity(Gravity::West),
        0,
        3,
    ));
    let items = items_for("abcdef", Some(&attrs));

    assert_eq!(items.len(), 2);
    // The covered run is forced RTL by the dance; the rest keeps the
    // paragraph level.
    assert_eq!(items[0].analysis.level, 1);
    assert_eq!(items[0].analysis.gravity, Gravity::West);
    assert_eq!(items[1].analysis.level, 0);
}

#[test]
fn itemizer_and_breaker_agree_on_the_gravity_dance() {
    for gravity in [
        Gravity::South,
        Gravity::North,
        Gravity::East,
        Gravity::West,
    ] {
        let mut context = context();
        context.set_base_gravity(gravity);
        let text = "abc \u{5d0}\u{5d1}\u{5d2}";
        let items = itemize(&context, Direction::Neutral, text, None);

        let mut breaker = LineBreaker::new(context);
        breaker.add_text(text, None);
        let direction = breaker.direction();

        // The Latin run sits at the base level exactly when the resolved
        // line direction is LTR.
        let latin_level = items[0].analysis.level;
        match direction {
            Direction::Ltr => assert_eq!(latin_level, 0, "gravity {gravity:?}"),
            Direction::Rtl => assert_eq!(latin_level, 2, "gravity {gravity:?}"),
            other => panic!("unexpected direction {other:?} for gravity {gravity:?}"),
        }
    }
}

#[test]
fn numbers_in_rtl_context_get_even_levels() {
    let text = "\u{5d0}\u{5d1}123\u{5d2}";
    let items = items_for(text, None);
    assert!(items.len() >= 2);
    // The digit run has a higher, even embedding level.
    let digit_item = items
        .iter()
        .find(|item| text[item.offset..].starts_with('1'))
        .unwrap();
    assert_eq!(digit_item.analysis.level % 2, 0);
    assert!(digit_item.analysis.level > 0);
    assert_partition(text, &items);
}
