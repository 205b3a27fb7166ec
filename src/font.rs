// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Font descriptions and the capability traits through which the layout
//! core talks to a font system.
//!
//! The core never parses or rasterizes fonts. It resolves attributed text to
//! a [`FontDescription`], asks a [`FontMap`] for a matching [`Fontset`], and
//! queries the fonts it gets back for coverage and metrics.

use std::rc::Rc;

use crate::glyph::Glyph;
use crate::types::Language;

use icu_properties::props::Script;

/// Visual slant of a font.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Oblique,
    Italic,
}

/// Capitalization variant of a font.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum FontVariant {
    #[default]
    Normal,
    SmallCaps,
}

/// Visual weight of a font.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const THIN: Self = Self(100);
    pub const LIGHT: Self = Self(300);
    pub const NORMAL: Self = Self(400);
    pub const MEDIUM: Self = Self(500);
    pub const SEMIBOLD: Self = Self(600);
    pub const BOLD: Self = Self(700);
    pub const HEAVY: Self = Self(900);
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Horizontal condensation or expansion of a font.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub enum FontStretch {
    UltraCondensed,
    ExtraCondensed,
    Condensed,
    SemiCondensed,
    #[default]
    Normal,
    SemiExpanded,
    Expanded,
    ExtraExpanded,
    UltraExpanded,
}

bitflags::bitflags! {
    /// The fields of a [`FontDescription`] that have been explicitly set.
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
    pub struct FontMask: u32 {
        const FAMILY = 1 << 0;
        const STYLE = 1 << 1;
        const VARIANT = 1 << 2;
        const WEIGHT = 1 << 3;
        const STRETCH = 1 << 4;
        const SIZE = 1 << 5;
    }
}

/// A description of the font to use for a piece of text.
///
/// Individual fields only take part in matching and merging when the
/// corresponding [`FontMask`] bit is set.
#[derive(Clone, PartialEq, Debug)]
pub struct FontDescription {
    family: String,
    style: FontStyle,
    variant: FontVariant,
    weight: FontWeight,
    stretch: FontStretch,
    size: i32,
    size_is_absolute: bool,
    mask: FontMask,
}

impl Default for FontDescription {
    fn default() -> Self {
        Self {
            family: String::new(),
            style: FontStyle::Normal,
            variant: FontVariant::Normal,
            weight: FontWeight::NORMAL,
            stretch: FontStretch::Normal,
            size: 0,
            size_is_absolute: false,
            mask: FontMask::empty(),
        }
    }
}

impl FontDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(&self) -> Option<&str> {
        self.mask
            .contains(FontMask::FAMILY)
            .then_some(self.family.as_str())
    }

    pub fn set_family(&mut self, family: &str) {
        self.family = family.to_owned();
        self.mask |= FontMask::FAMILY;
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }

    pub fn set_style(&mut self, style: FontStyle) {
        self.style = style;
        self.mask |= FontMask::STYLE;
    }

    pub fn variant(&self) -> FontVariant {
        self.variant
    }

    pub fn set_variant(&mut self, variant: FontVariant) {
        self.variant = variant;
        self.mask |= FontMask::VARIANT;
    }

    pub fn weight(&self) -> FontWeight {
        self.weight
    }

    pub fn set_weight(&mut self, weight: FontWeight) {
        self.weight = weight;
        self.mask |= FontMask::WEIGHT;
    }

    pub fn stretch(&self) -> FontStretch {
        self.stretch
    }

    pub fn set_stretch(&mut self, stretch: FontStretch) {
        self.stretch = stretch;
        self.mask |= FontMask::STRETCH;
    }

    /// The size in units. Whether the value is in points or device units is
    /// reported by [`size_is_absolute`](Self::size_is_absolute).
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Sets the size in `SCALE`-ths of a point.
    pub fn set_size(&mut self, size: i32) {
        self.size = size;
        self.size_is_absolute = false;
        self.mask |= FontMask::SIZE;
    }

    /// Sets the size in `SCALE`-ths of a device unit.
    pub fn set_absolute_size(&mut self, size: i32) {
        self.size = size;
        self.size_is_absolute = true;
        self.mask |= FontMask::SIZE;
    }

    pub fn size_is_absolute(&self) -> bool {
        self.size_is_absolute
    }

    pub fn set_fields(&self) -> FontMask {
        self.mask
    }

    /// Unsets the given fields, returning them to their default values.
    pub fn unset_fields(&mut self, mask: FontMask) {
        let default = Self::default();
        if mask.contains(FontMask::FAMILY) {
            self.family.clear();
        }
        if mask.contains(FontMask::STYLE) {
            self.style = default.style;
        }
        if mask.contains(FontMask::VARIANT) {
            self.variant = default.variant;
        }
        if mask.contains(FontMask::WEIGHT) {
            self.weight = default.weight;
        }
        if mask.contains(FontMask::STRETCH) {
            self.stretch = default.stretch;
        }
        if mask.contains(FontMask::SIZE) {
            self.size = default.size;
            self.size_is_absolute = default.size_is_absolute;
        }
        self.mask &= !mask;
    }

    /// Merges fields from `other` into `self`. Fields already set in `self`
    /// are only overwritten when `replace_existing` is true.
    pub fn merge(&mut self, other: &Self, replace_existing: bool) {
        let new_mask = if replace_existing {
            other.mask
        } else {
            other.mask & !self.mask
        };
        if new_mask.contains(FontMask::FAMILY) {
            self.family = other.family.clone();
        }
        if new_mask.contains(FontMask::STYLE) {
            self.style = other.style;
        }
        if new_mask.contains(FontMask::VARIANT) {
            self.variant = other.variant;
        }
        if new_mask.contains(FontMask::WEIGHT) {
            self.weight = other.weight;
        }
        if new_mask.contains(FontMask::STRETCH) {
            self.stretch = other.stretch;
        }
        if new_mask.contains(FontMask::SIZE) {
            self.size = other.size;
            self.size_is_absolute = other.size_is_absolute;
        }
        self.mask |= new_mask;
    }
}

/// Metrics describing a font as a whole, in units.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct FontMetrics {
    pub ascent: i32,
    pub descent: i32,
    pub approximate_char_width: i32,
    pub approximate_digit_width: i32,
    pub underline_position: i32,
    pub underline_thickness: i32,
    pub strikethrough_position: i32,
    pub strikethrough_thickness: i32,
}

/// Superscript and subscript positions of a font, in units.
///
/// Zero offsets mean the font does not provide the value; callers fall back
/// to a conventional default.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct BaselineShifts {
    pub superscript_x_offset: i32,
    pub superscript_y_offset: i32,
    pub subscript_x_offset: i32,
    pub subscript_y_offset: i32,
}

/// Baselines a [`Font`] may report for cross-script baseline alignment.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BaselineTag {
    /// The alphabetic baseline used by Latin-like scripts.
    Roman,
    /// The ideographic character face bottom edge.
    Ideographic,
    /// The center of the ideographic em box, used for vertical gravities.
    IdeoEmboxCentral,
    /// The hanging baseline used by Indic-like scripts.
    Hanging,
}

impl BaselineTag {
    /// The horizontal baseline conventionally used by a script.
    pub fn for_script(script: Script) -> Self {
        match script {
            Script::Han | Script::Hangul | Script::Hiragana | Script::Katakana => {
                Self::Ideographic
            }
            Script::Devanagari | Script::Bengali | Script::Gurmukhi => Self::Hanging,
            _ => Self::Roman,
        }
    }
}

/// A loaded font.
pub trait Font {
    /// Metrics for the font, possibly tailored to a language.
    fn metrics(&self, language: Language) -> FontMetrics;

    /// The glyph for a character, if the font covers it.
    fn glyph(&self, ch: char) -> Option<Glyph>;

    /// The horizontal advance of a glyph, in units.
    fn glyph_advance(&self, glyph: Glyph) -> i32;

    /// A description that would select this font.
    fn describe(&self) -> FontDescription;

    /// Superscript/subscript positions, for baseline-shift layout.
    fn baseline_shifts(&self) -> BaselineShifts {
        BaselineShifts::default()
    }

    /// The position of a baseline relative to the alphabetic baseline, or
    /// `None` if the font does not provide baseline data.
    fn baseline(&self, _tag: BaselineTag, _script: Script) -> Option<i32> {
        None
    }
}

/// An ordered set of fonts that together cover a description.
pub trait Fontset {
    /// The first font in the set that covers `ch`.
    fn font(&self, ch: char) -> Option<Rc<dyn Font>>;

    /// The first font in the set, used as a fallback when no font covers a
    /// character.
    fn first_font(&self) -> Rc<dyn Font>;
}

/// A collection of fonts that can resolve descriptions to fontsets.
pub trait FontMap {
    fn load_fontset(&self, description: &FontDescription, language: Language) -> Rc<dyn Fontset>;
}
