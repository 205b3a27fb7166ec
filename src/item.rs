// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Items: maximal runs of text sharing a single analysis.

use std::rc::Rc;

use icu_properties::props::Script;

use crate::attr::{AttrIterator, AttrKind, AttrValue, Attribute, ShapeData};
use crate::font::Font;
use crate::types::{Gravity, Language, Show};

bitflags::bitflags! {
    /// Flags qualifying an [`Analysis`].
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
    pub struct AnalysisFlags: u8 {
        /// The run is laid out on a centered baseline (vertical gravity on
        /// wide characters).
        const CENTERED_BASELINE = 1 << 0;
        /// The run is an inserted ellipsis.
        const IS_ELLIPSIS = 1 << 1;
        /// The run ends at a break that requires a hyphen glyph.
        const NEED_HYPHEN = 1 << 2;
    }
}

/// Everything the shaper needs to know about an item.
#[derive(Clone)]
pub struct Analysis {
    /// The font to shape with.
    pub font: Rc<dyn Font>,
    /// Bidirectional embedding level; even is LTR, odd is RTL.
    pub level: u8,
    /// Resolved glyph orientation.
    pub gravity: Gravity,
    pub flags: AnalysisFlags,
    /// The script of the run per UAX #24.
    pub script: Script,
    pub language: Language,
    /// Attributes that apply to the run but did not affect itemization.
    pub extra_attrs: Vec<Attribute>,
}

impl Analysis {
    /// Whether the run is right-to-left.
    pub fn is_rtl(&self) -> bool {
        self.level & 1 != 0
    }

    /// Whether two analyses are indistinguishable, so their items can be
    /// merged back together.
    pub(crate) fn can_merge(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.font, &other.font)
            && self.level == other.level
            && self.gravity == other.gravity
            && self.flags == other.flags
            && self.script == other.script
            && self.language == other.language
            && self.extra_attrs.len() == other.extra_attrs.len()
            && self
                .extra_attrs
                .iter()
                .zip(other.extra_attrs.iter())
                .all(|(a, b)| a == b)
    }
}

impl core::fmt::Debug for Analysis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Analysis")
            .field("level", &self.level)
            .field("gravity", &self.gravity)
            .field("flags", &self.flags)
            .field("script", &self.script)
            .field("language", &self.language)
            .field("extra_attrs", &self.extra_attrs.len())
            .finish()
    }
}

/// A contiguous piece of text with a constant [`Analysis`].
#[derive(Clone, Debug)]
pub struct Item {
    /// Byte offset of the item in the paragraph text.
    pub offset: usize,
    /// Length of the item in bytes.
    pub length: usize,
    /// Number of characters in the item.
    pub num_chars: usize,
    /// Character offset of the item in the paragraph text.
    pub char_offset: usize,
    pub analysis: Analysis,
}

impl Item {
    /// Splits the item at `split_index` bytes / `split_offset` characters
    /// from its start, returning the prefix. `self` keeps the suffix.
    ///
    /// Both positions must be inside the item: `0 < split_index < length`
    /// and `0 < split_offset < num_chars`.
    pub fn split(&mut self, split_index: usize, split_offset: usize) -> Self {
        debug_assert!(split_index > 0 && split_index < self.length);
        debug_assert!(split_offset > 0 && split_offset < self.num_chars);

        let mut prefix = self.clone();
        prefix.length = split_index;
        prefix.num_chars = split_offset;

        self.offset += split_index;
        self.length -= split_index;
        self.num_chars -= split_offset;
        self.char_offset += split_offset;

        prefix
    }

    /// Undoes a [`split`](Self::split) with the same arguments, discarding
    /// the prefix item it returned.
    pub(crate) fn unsplit(&mut self, split_index: usize, split_offset: usize) {
        self.offset -= split_index;
        self.length += split_index;
        self.num_chars += split_offset;
        self.char_offset -= split_offset;
    }

    /// Copies the attributes overlapping this item from `iter` into
    /// `extra_attrs`, skipping exact duplicates.
    ///
    /// The iterator must be positioned at or before the item and is
    /// advanced past it, so it can be threaded through a loop over
    /// consecutive items.
    pub fn apply_attrs(&mut self, iter: &mut AttrIterator<'_>) {
        let mut collected: Vec<Attribute> = Vec::new();
        loop {
            let (start, end) = iter.range();
            if start as usize >= self.offset + self.length {
                break;
            }
            if end as usize >= self.offset {
                for attr in iter.attrs() {
                    let duplicate = collected
                        .iter()
                        .chain(self.analysis.extra_attrs.iter())
                        .any(|a| {
                            a.start_index == attr.start_index
                                && a.end_index == attr.end_index
                                && a.equal(&attr)
                        });
                    if !duplicate {
                        collected.push(attr);
                    }
                }
            }
            if end as usize >= self.offset + self.length {
                break;
            }
            if !iter.advance() {
                break;
            }
        }
        self.analysis.extra_attrs.extend(collected);
    }
}

/// Cached per-item properties the line breaker consults repeatedly,
/// extracted from `extra_attrs`.
#[derive(Clone, Debug, Default)]
pub struct ItemProperties {
    pub letter_spacing: i32,
    pub line_height: f64,
    pub absolute_line_height: i32,
    /// Placed content overriding the glyphs of the item.
    pub shape: Option<ShapeData>,
    /// Spaces are rendered visibly, so a tab glyph is drawn.
    pub showing_space: bool,
    /// Line breaks are rendered visibly, so paragraph separators do not end
    /// the paragraph.
    pub no_paragraph_break: bool,
}

impl ItemProperties {
    pub fn from_item(item: &Item) -> Self {
        let mut properties = Self::default();
        for attr in &item.analysis.extra_attrs {
            match (&attr.value, attr.kind()) {
                (AttrValue::LetterSpacing(v), _) => properties.letter_spacing = *v,
                (AttrValue::LineHeight(v), _) => properties.line_height = *v,
                (AttrValue::AbsoluteLineHeight(v), _) => properties.absolute_line_height = *v,
                (AttrValue::Show(flags), _) => {
                    properties.showing_space = flags.contains(Show::SPACES);
                    properties.no_paragraph_break = flags.contains(Show::LINE_BREAKS);
                }
                (AttrValue::Shape(data), AttrKind::Shape) => {
                    properties.shape = Some(data.clone());
                }
                _ => {}
            }
        }
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttrList;
    use crate::font::{FontDescription, FontMetrics};
    use crate::glyph::Glyph;

    struct NullFont;

    impl Font for NullFont {
        fn metrics(&self, _language: Language) -> FontMetrics {
            FontMetrics::default()
        }
        fn glyph(&self, _ch: char) -> Option<Glyph> {
            None
        }
        fn glyph_advance(&self, _glyph: Glyph) -> i32 {
            0
        }
        fn describe(&self) -> FontDescription {
            FontDescription::new()
        }
    }

    fn item(offset: usize, length: usize, num_chars: usize, char_offset: usize) -> Item {
        Item {
            offset,
            length,
            num_chars,
            char_offset,
            analysis: Analysis {
                font: Rc::new(NullFont),
                level: 0,
                gravity: Gravity::South,
                flags: AnalysisFlags::empty(),
                script: Script::Latin,
                language: Language::default(),
                extra_attrs: Vec::new(),
            },
        }
    }

    #[test]
    fn split_and_unsplit_round_trip() {
        let mut it = item(10, 8, 8, 5);
        let prefix = it.split(3, 3);
        assert_eq!((prefix.offset, prefix.length, prefix.num_chars), (10, 3, 3));
        assert_eq!((it.offset, it.length, it.num_chars), (13, 5, 5));
        assert_eq!(it.char_offset, 8);

        it.unsplit(3, 3);
        assert_eq!((it.offset, it.length, it.num_chars), (10, 8, 8));
        assert_eq!(it.char_offset, 5);
    }

    #[test]
    fn apply_attrs_copies_overlapping_ranges() {
        let mut list = AttrList::new();
        list.insert(Attribute::with_range(
            AttrValue::Rise(100),
            0,
            6,
        ));
        list.insert(Attribute::with_range(
            AttrValue::LetterSpacing(42),
            4,
            20,
        ));

        let mut iter = list.iterator();
        let mut first = item(0, 5, 5, 0);
        first.apply_attrs(&mut iter);
        let mut second = item(5, 10, 10, 5);
        second.apply_attrs(&mut iter);

        assert_eq!(first.analysis.extra_attrs.len(), 2);
        assert_eq!(second.analysis.extra_attrs.len(), 2);
        let kinds: Vec<_> = second
            .analysis
            .extra_attrs
            .iter()
            .map(|a| a.kind())
            .collect();
        assert!(kinds.contains(&AttrKind::LetterSpacing));
    }

    #[test]
    fn properties_extraction() {
        let mut it = item(0, 4, 4, 0);
        it.analysis
            .extra_attrs
            .push(Attribute::new(AttrValue::LetterSpacing(7)));
        it.analysis
            .extra_attrs
            .push(Attribute::new(AttrValue::Show(Show::SPACES)));
        let properties = ItemProperties::from_item(&it);
        assert_eq!(properties.letter_spacing, 7);
        assert!(properties.showing_space);
        assert!(!properties.no_paragraph_break);
    }
}
