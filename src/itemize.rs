// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Itemization: partitioning text into runs of constant analysis.
//!
//! A new item starts whenever the bidirectional level, script, language,
//! resolved font, gravity or applicable itemization attributes change.
//! Separators and tabs are isolated into their own items so the line
//! breaker can treat them positionally.

use std::rc::Rc;

use icu_properties::props::{BidiMirroringGlyph, BidiPairedBracketType, GeneralCategory, Script};
use icu_properties::{CodePointMapData, CodePointMapDataBorrowed};
use tracing::trace;

use crate::attr::{AttrList, AttrValue, Attribute};
use crate::bidi;
use crate::context::Context;
use crate::font::{Font, Fontset};
use crate::item::{Analysis, AnalysisFlags, Item};
use crate::types::{Direction, Gravity, Language};

fn script_data() -> CodePointMapDataBorrowed<'static, Script> {
    const { CodePointMapData::new() }
}

fn general_category_data() -> CodePointMapDataBorrowed<'static, GeneralCategory> {
    const { CodePointMapData::new() }
}

fn bracket_data() -> CodePointMapDataBorrowed<'static, BidiMirroringGlyph> {
    const { CodePointMapData::new() }
}

/// Tracks the effective script across common and inherited characters,
/// propagating scripts over matched bracket pairs per UAX #24.
struct ScriptTracker {
    current: Script,
    /// Open brackets and the effective script when they were opened.
    stack: Vec<(char, Script)>,
}

impl ScriptTracker {
    fn new() -> Self {
        Self {
            current: Script::Common,
            stack: Vec::new(),
        }
    }

    fn update(&mut self, c: char) -> Script {
        let script = script_data().get(c);
        if script != Script::Common && script != Script::Inherited && script != Script::Unknown {
            self.current = script;
            return script;
        }

        let bracket = bracket_data().get(c);
        match bracket.paired_bracket_type {
            BidiPairedBracketType::Open => {
                self.stack.push((c, self.current));
            }
            BidiPairedBracketType::Close => {
                if let Some(open) = bracket.mirroring_glyph {
                    if let Some(pos) = self.stack.iter().rposition(|&(o, _)| o == open) {
                        self.current = self.stack[pos].1;
                        self.stack.truncate(pos);
                    }
                }
            }
            _ => {}
        }
        self.current
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn wants_centered_baseline(script: Script) -> bool {
    matches!(
        script,
        Script::Han | Script::Hangul | Script::Hiragana | Script::Katakana | Script::Yi
    )
}

/// The per-attribute-range state shared by consecutive characters.
struct Segment {
    end: u32,
    fontset: Rc<dyn Fontset>,
    language: Language,
    gravity: Gravity,
    fallback: bool,
    extra_attrs: Vec<Attribute>,
}

fn resolve_segment(
    iter: &crate::attr::AttrIterator<'_>,
    context: &Context,
) -> Segment {
    let mut description = context.font_description().clone();
    let mut language = None;
    let mut extra_attrs = Vec::new();
    iter.get_font(&mut description, &mut language, Some(&mut extra_attrs));
    let language = language.unwrap_or_else(|| context.language());

    let mut gravity = context.base_gravity();
    let mut fallback = true;
    for attr in &extra_attrs {
        match attr.value {
            AttrValue::Gravity(g) => gravity = g,
            AttrValue::Fallback(enabled) => fallback = enabled,
            _ => {}
        }
    }

    Segment {
        end: iter.range().1,
        fontset: context.font_map().load_fontset(&description, language),
        language,
        gravity: gravity.resolve(context.base_gravity()),
        fallback,
        extra_attrs,
    }
}

/// Divides `text` into [`Item`]s in logical order.
///
/// `attrs` should contain only itemization-affecting attributes (see
/// [`Attribute::affects_itemization`]); the caller reapplies the rest to
/// the produced items.
pub fn itemize(
    context: &Context,
    base_dir: Direction,
    text: &str,
    attrs: Option<&AttrList>,
) -> Vec<Item> {
    if text.is_empty() {
        return Vec::new();
    }

    // The paragraph direction goes through the direction vs. gravity dance
    // before it feeds the bidi algorithm; the line breaker resolves its
    // line direction through the same [`Direction::with_gravity`].
    let base_gravity = context.gravity();
    let paragraph_dir = bidi::resolve_direction(text, base_dir).with_gravity(base_gravity);
    let (levels, _) = bidi::embedding_levels(text, paragraph_dir);
    let empty;
    let list = match attrs {
        Some(list) => list,
        None => {
            empty = AttrList::new();
            &empty
        }
    };

    let mut iter = list.iterator();
    let mut segment = resolve_segment(&iter, context);
    let mut script_tracker = ScriptTracker::new();
    let gc = general_category_data();

    let mut items: Vec<Item> = Vec::new();
    let mut last_font: Option<Rc<dyn Font>> = None;
    let mut prev_char: Option<char> = None;

    for (char_index, (byte_index, c)) in text.char_indices().enumerate() {
        while byte_index as u32 >= segment.end {
            iter.advance();
            segment = resolve_segment(&iter, context);
        }

        let mut level = levels[char_index];
        // A gravity override on this range re-runs the dance for its
        // characters: forced directions land on the matching level parity.
        if segment.gravity != base_gravity {
            level = match segment.gravity {
                Gravity::South | Gravity::Auto => level,
                Gravity::North => level ^ 1,
                Gravity::East => level & !1,
                Gravity::West => level | 1,
            };
        }
        let script = script_tracker.update(c);

        // Separators and tabs get their own items, keeping \r\n together.
        let after_cr = prev_char == Some('\r') && c == '\n';
        let forced = (is_separator(c) || prev_char.is_some_and(is_separator)) && !after_cr;

        // Control-ish characters keep the running font.
        let category = gc.get(c);
        let skip_coverage = matches!(
            category,
            GeneralCategory::Control
                | GeneralCategory::Format
                | GeneralCategory::LineSeparator
                | GeneralCategory::ParagraphSeparator
        ) || c == '\t';

        let font = if skip_coverage {
            last_font
                .clone()
                .unwrap_or_else(|| segment.fontset.first_font())
        } else if !segment.fallback {
            segment.fontset.first_font()
        } else {
            segment
                .fontset
                .font(c)
                .unwrap_or_else(|| segment.fontset.first_font())
        };
        last_font = Some(font.clone());

        let gravity = segment.gravity;
        let mut flags = AnalysisFlags::empty();
        if gravity.is_vertical() && wants_centered_baseline(script) {
            flags |= AnalysisFlags::CENTERED_BASELINE;
        }

        let start_new = match items.last() {
            None => true,
            Some(last) => {
                forced
                    || last.analysis.level != level
                    || !script_compatible(last.analysis.script, script)
                    || last.analysis.language != segment.language
                    || last.analysis.gravity != gravity
                    || last.analysis.flags != flags
                    || !Rc::ptr_eq(&last.analysis.font, &font)
                    || last.analysis.extra_attrs != segment.extra_attrs
            }
        };

        if start_new {
            trace!(
                byte_index,
                level,
                ?script,
                "starting new item"
            );
            items.push(Item {
                offset: byte_index,
                length: 0,
                num_chars: 0,
                char_offset: char_index,
                analysis: Analysis {
                    font,
                    level,
                    gravity,
                    flags,
                    script,
                    language: segment.language,
                    extra_attrs: segment.extra_attrs.clone(),
                },
            });
        } else if let Some(last) = items.last_mut() {
            // A leading run of common script adopts the first real script.
            if matches!(last.analysis.script, Script::Common | Script::Unknown)
                && !matches!(script, Script::Common | Script::Unknown)
            {
                last.analysis.script = script;
            }
        }

        let item = items.last_mut().expect("an item was just pushed");
        item.length += c.len_utf8();
        item.num_chars += 1;
        prev_char = Some(c);
    }

    // Merge adjacent items whose analyses collapsed to the same values,
    // except across separator boundaries.
    let mut merged: Vec<Item> = Vec::with_capacity(items.len());
    for item in items {
        let first_char = text[item.offset..].chars().next();
        let keep_separate = first_char.is_some_and(is_separator);
        match merged.last_mut() {
            Some(prev)
                if !keep_separate
                    && !text[prev.offset..].chars().next().is_some_and(is_separator)
                    && prev.offset + prev.length == item.offset
                    && prev.analysis.can_merge(&item.analysis) =>
            {
                prev.length += item.length;
                prev.num_chars += item.num_chars;
            }
            _ => merged.push(item),
        }
    }

    merged
}

/// Whether two effective scripts may share an item.
fn script_compatible(a: Script, b: Script) -> bool {
    a == b
        || matches!(a, Script::Common | Script::Inherited | Script::Unknown)
        || matches!(b, Script::Common | Script::Inherited | Script::Unknown)
}
