// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic types shared across the crate: units, directions, gravity,
//! wrapping modes and language tags.

use core::fmt;
use std::sync::Mutex;

/// The scale between dimensions used internally and device units.
///
/// All widths, offsets and sizes in this crate are expressed in units of
/// `1 / SCALE` of a device unit unless stated otherwise.
pub const SCALE: i32 = 1024;

/// Rounds a dimension to the nearest whole device unit.
#[inline]
pub fn units_round(d: i32) -> i32 {
    (d + (SCALE >> 1)) & !(SCALE - 1)
}

/// Converts a device unit value into units.
#[inline]
pub fn units_from_double(d: f64) -> i32 {
    (d * SCALE as f64).round() as i32
}

/// Converts units into a device unit value.
#[inline]
pub fn units_to_double(i: i32) -> f64 {
    i as f64 / SCALE as f64
}

/// The base direction of a piece of text.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Direction {
    /// Left-to-right.
    Ltr,
    /// Right-to-left.
    Rtl,
    /// Left-to-right unless the text itself resolves otherwise.
    WeakLtr,
    /// Right-to-left unless the text itself resolves otherwise.
    WeakRtl,
    /// No direction specified; determined from the content.
    #[default]
    Neutral,
}

impl Direction {
    /// Returns the simple LTR/RTL direction, treating weak and neutral
    /// directions as left-to-right.
    pub fn resolve(self) -> Self {
        match self {
            Self::Rtl | Self::WeakRtl => Self::Rtl,
            _ => Self::Ltr,
        }
    }

    /// The direction vs. gravity dance, applied to a resolved direction:
    ///   - South leaves the direction untouched.
    ///   - North switches it.
    ///   - East is a clockwise-rotated layout, so the rotated top is the
    ///     unrotated left: LTR.
    ///   - West is counter-clockwise: RTL.
    ///
    /// Both the itemizer and the line breaker resolve through here, so the
    /// paragraph levels and the line direction always agree.
    pub(crate) fn with_gravity(self, gravity: Gravity) -> Self {
        match gravity {
            Gravity::South | Gravity::Auto => self,
            Gravity::North => match self {
                Self::Ltr => Self::Rtl,
                _ => Self::Ltr,
            },
            Gravity::East => Self::Ltr,
            Gravity::West => Self::Rtl,
        }
    }
}

/// The orientation of glyphs in a run of text.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Gravity {
    /// Glyphs stand upright (the default for horizontal scripts).
    #[default]
    South,
    /// Glyphs are rotated 90 degrees counter-clockwise.
    East,
    /// Glyphs are upside-down.
    North,
    /// Glyphs are rotated 90 degrees clockwise.
    West,
    /// Gravity is resolved from the script of the text.
    Auto,
}

impl Gravity {
    /// Whether this gravity lays text out vertically.
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::East | Self::West)
    }

    /// Resolves [`Gravity::Auto`] against a base gravity.
    pub(crate) fn resolve(self, base: Self) -> Self {
        match self {
            Self::Auto => match base {
                Self::Auto => Self::South,
                other => other,
            },
            other => other,
        }
    }
}

/// How to prefer gravities when resolving [`Gravity::Auto`] for vertical
/// scripts.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum GravityHint {
    /// Scripts use their natural gravity.
    #[default]
    Natural,
    /// Always use the base gravity.
    Strong,
    /// Use a gravity that matches the line orientation.
    Line,
}

/// How a line is wrapped when it does not fit the available width.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum WrapMode {
    /// Wrap at word boundaries.
    #[default]
    Word,
    /// Wrap at character boundaries.
    Char,
    /// Wrap at word boundaries, falling back to character boundaries when a
    /// single word does not fit.
    WordChar,
}

/// Which part of a line is replaced by an ellipsis when it does not fit.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum EllipsizeMode {
    /// No ellipsization.
    #[default]
    None,
    /// Omit characters at the start of the line.
    Start,
    /// Omit characters in the middle of the line.
    Middle,
    /// Omit characters at the end of the line.
    End,
}

/// An RGB color with 16 bits per channel.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Color {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl Color {
    pub fn new(red: u16, green: u16, blue: u16) -> Self {
        Self { red, green, blue }
    }
}

/// A rectangle in units. `y` grows downward from the baseline.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

bitflags::bitflags! {
    /// Which otherwise-invisible characters are rendered visibly.
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
    pub struct Show: u32 {
        /// Render spaces with a visible glyph.
        const SPACES = 1 << 0;
        /// Render line breaks with a visible glyph.
        const LINE_BREAKS = 1 << 1;
        /// Render default-ignorable characters with a visible glyph.
        const IGNORABLES = 1 << 2;
    }
}

/// Well-known values for the baseline-shift attribute. Values outside
/// `-SCALE..=SCALE` are interpreted as a literal shift in units.
pub mod baseline_shift {
    /// No shift.
    pub const NONE: i32 = 0;
    /// Shift to the superscript position of the preceding run's font.
    pub const SUPERSCRIPT: i32 = 1;
    /// Shift to the subscript position of the preceding run's font.
    pub const SUBSCRIPT: i32 = 2;
}

/// Well-known values for the font-scale attribute.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum FontScale {
    /// No scaling.
    #[default]
    None,
    /// Scale to the size of superscripts.
    Superscript,
    /// Scale to the size of subscripts.
    Subscript,
    /// Scale to the size of small capitals.
    SmallCaps,
}

/// How text is transformed before shaping.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum TextTransform {
    #[default]
    None,
    Lowercase,
    Uppercase,
    Capitalize,
}

/// The kind of underline applied to a run.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    Low,
    Error,
}

/// The kind of overline applied to a run.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Overline {
    #[default]
    None,
    Single,
}

static LANGUAGES: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// An interned RFC 3066 language tag.
///
/// Language tags are canonicalized (lowercased, `_` replaced by `-`) and
/// interned process-wide, so `Language` itself is a small `Copy` handle that
/// compares in constant time.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Language(u32);

impl Language {
    /// Interns a language tag.
    pub fn from_string(tag: &str) -> Self {
        let canonical: String = tag
            .chars()
            .map(|c| if c == '_' { '-' } else { c.to_ascii_lowercase() })
            .collect();
        let mut languages = LANGUAGES.lock().unwrap();
        if let Some(index) = languages.iter().position(|l| *l == canonical) {
            return Self(index as u32);
        }
        languages.push(canonical);
        Self((languages.len() - 1) as u32)
    }

    /// Returns the canonical form of the tag.
    pub fn to_str(self) -> String {
        LANGUAGES.lock().unwrap()[self.0 as usize].clone()
    }

    /// The primary language subtag (the part before the first `-`).
    pub fn primary(self) -> String {
        let tag = self.to_str();
        match tag.split_once('-') {
            Some((primary, _)) => primary.to_owned(),
            None => tag,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::from_string("en")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_interning_canonicalizes() {
        let a = Language::from_string("ca_ES");
        let b = Language::from_string("ca-es");
        assert_eq!(a, b);
        assert_eq!(a.to_str(), "ca-es");
        assert_eq!(a.primary(), "ca");
    }

    #[test]
    fn units_rounding() {
        assert_eq!(units_round(SCALE + SCALE / 2), 2 * SCALE);
        assert_eq!(units_round(SCALE + SCALE / 2 - 1), SCALE);
        assert_eq!(units_from_double(1.5), SCALE + SCALE / 2);
    }
}
