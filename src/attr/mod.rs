// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ranged formatting attributes.
//!
//! An [`Attribute`] is a value from the [`AttrValue`] sum type plus the byte
//! range of text it applies to. Attributes are collected in an [`AttrList`]
//! and consumed through an [`AttrIterator`], which presents the list as a
//! sequence of ranges with a piecewise-constant attribute set.

mod iter;
mod list;

pub use iter::AttrIterator;
pub use list::AttrList;

use std::any::Any;
use std::rc::Rc;
use std::sync::Mutex;

use crate::font::{FontDescription, FontStretch, FontStyle, FontVariant, FontWeight};
use crate::types::{
    Color, FontScale, Gravity, GravityHint, Language, Overline, Rectangle, Show, TextTransform,
    Underline,
};

/// Start index sentinel meaning "from the beginning of the text".
pub const ATTR_INDEX_FROM_TEXT_BEGINNING: u32 = 0;
/// End index sentinel meaning "to the end of the text".
pub const ATTR_INDEX_TO_TEXT_END: u32 = u32::MAX;

bitflags::bitflags! {
    /// Which layout passes an attribute kind participates in.
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
    pub struct Affects: u32 {
        const ITEMIZATION = 1 << 0;
        const BREAKING = 1 << 1;
        const SHAPING = 1 << 2;
        const RENDERING = 1 << 3;
    }
}

/// Placed content that replaces the text in its range during layout.
///
/// The payload travels with the attribute so renderers can recover what to
/// draw; the core only looks at the rectangles.
#[derive(Clone)]
pub struct ShapeData {
    pub ink_rect: Rectangle,
    pub logical_rect: Rectangle,
    pub data: Option<Rc<dyn Any>>,
}

impl PartialEq for ShapeData {
    fn eq(&self, other: &Self) -> bool {
        self.ink_rect == other.ink_rect
            && self.logical_rect == other.logical_rect
            && match (&self.data, &other.data) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl core::fmt::Debug for ShapeData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShapeData")
            .field("ink_rect", &self.ink_rect)
            .field("logical_rect", &self.logical_rect)
            .field("data", &self.data.is_some())
            .finish()
    }
}

/// The value carried by an [`Attribute`].
#[derive(Clone, PartialEq, Debug)]
pub enum AttrValue {
    /// Language override.
    Language(Language),
    /// Font family name.
    Family(String),
    /// Font slant.
    Style(FontStyle),
    /// Font weight.
    Weight(FontWeight),
    /// Font capitalization variant.
    Variant(FontVariant),
    /// Font width.
    Stretch(FontStretch),
    /// Font size, with a flag for device units vs. points.
    Size { size: i32, absolute: bool },
    /// A full font description; set fields override the surrounding ones.
    FontDesc(FontDescription),
    /// Foreground color.
    Foreground(Color),
    /// Background color.
    Background(Color),
    /// Underline style.
    Underline(Underline),
    /// Underline color override.
    UnderlineColor(Color),
    /// Strikethrough.
    Strikethrough(bool),
    /// Strikethrough color override.
    StrikethroughColor(Color),
    /// Overline style.
    Overline(Overline),
    /// Overline color override.
    OverlineColor(Color),
    /// Base gravity override.
    Gravity(Gravity),
    /// Gravity hint override.
    GravityHint(GravityHint),
    /// Baseline displacement, in units.
    Rise(i32),
    /// Baseline shift; see [`crate::types::baseline_shift`].
    BaselineShift(i32),
    /// Font size scale relative to the surrounding text.
    FontScale(FontScale),
    /// Font size multiplier.
    Scale(f64),
    /// Whether font fallback is enabled.
    Fallback(bool),
    /// Extra advance between graphemes, in units.
    LetterSpacing(i32),
    /// OpenType font features.
    FontFeatures(String),
    /// Foreground alpha.
    ForegroundAlpha(u16),
    /// Background alpha.
    BackgroundAlpha(u16),
    /// Whether breaking is allowed inside the range.
    AllowBreaks(bool),
    /// Which invisible characters are rendered visibly.
    Show(Show),
    /// Whether hyphens may be inserted when breaking inside the range.
    InsertHyphens(bool),
    /// Line height multiplier.
    LineHeight(f64),
    /// Line height override, in units.
    AbsoluteLineHeight(i32),
    /// Extra leading between lines, in units.
    LineSpacing(i32),
    /// Text transformation applied before shaping.
    TextTransform(TextTransform),
    /// Marks the range as a single word.
    Word,
    /// Marks the range as a single sentence.
    Sentence,
    /// Marks the range as a single paragraph.
    Paragraph,
    /// Replaces the range with placed content of the given extents.
    Shape(ShapeData),
}

/// Discriminant of [`AttrValue`]; identifies an attribute kind.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AttrKind {
    Language,
    Family,
    Style,
    Weight,
    Variant,
    Stretch,
    Size,
    FontDesc,
    Foreground,
    Background,
    Underline,
    UnderlineColor,
    Strikethrough,
    StrikethroughColor,
    Overline,
    OverlineColor,
    Gravity,
    GravityHint,
    Rise,
    BaselineShift,
    FontScale,
    Scale,
    Fallback,
    LetterSpacing,
    FontFeatures,
    ForegroundAlpha,
    BackgroundAlpha,
    AllowBreaks,
    Show,
    InsertHyphens,
    LineHeight,
    AbsoluteLineHeight,
    LineSpacing,
    TextTransform,
    Word,
    Sentence,
    Paragraph,
    Shape,
}

impl AttrKind {
    /// The layout passes this kind participates in.
    pub fn affects(self) -> Affects {
        use AttrKind::*;
        match self {
            Language | Family | Style | Weight | Variant | Stretch | Size | FontDesc | Rise
            | Scale | Fallback | LetterSpacing | LineHeight | AbsoluteLineHeight | LineSpacing
            | TextTransform | BaselineShift | FontScale | Gravity | GravityHint => {
                Affects::ITEMIZATION
            }
            AllowBreaks | Word | Sentence | Paragraph => Affects::BREAKING,
            FontFeatures | Show | InsertHyphens | Shape => Affects::SHAPING,
            Foreground | Background | Underline | UnderlineColor | Strikethrough
            | StrikethroughColor | Overline | OverlineColor | ForegroundAlpha
            | BackgroundAlpha => Affects::RENDERING,
        }
    }

    /// Whether multiple attributes of this kind accumulate rather than the
    /// topmost one overriding the rest.
    pub fn accumulates(self) -> bool {
        matches!(
            self,
            Self::FontDesc | Self::FontFeatures | Self::BaselineShift | Self::FontScale
        )
    }
}

/// A value applied to a byte range of text.
///
/// The range is expressed with the half-open interval
/// `[start_index, end_index)`; [`ATTR_INDEX_FROM_TEXT_BEGINNING`] and
/// [`ATTR_INDEX_TO_TEXT_END`] act as "whole text" sentinels.
#[derive(Clone, PartialEq, Debug)]
pub struct Attribute {
    pub start_index: u32,
    pub end_index: u32,
    pub value: AttrValue,
}

impl Attribute {
    /// Creates an attribute covering the whole text.
    pub fn new(value: AttrValue) -> Self {
        Self {
            start_index: ATTR_INDEX_FROM_TEXT_BEGINNING,
            end_index: ATTR_INDEX_TO_TEXT_END,
            value,
        }
    }

    /// Creates an attribute covering `[start, end)`.
    pub fn with_range(value: AttrValue, start: u32, end: u32) -> Self {
        Self {
            start_index: start,
            end_index: end,
            value,
        }
    }

    pub fn kind(&self) -> AttrKind {
        use AttrValue as V;
        match self.value {
            V::Language(_) => AttrKind::Language,
            V::Family(_) => AttrKind::Family,
            V::Style(_) => AttrKind::Style,
            V::Weight(_) => AttrKind::Weight,
            V::Variant(_) => AttrKind::Variant,
            V::Stretch(_) => AttrKind::Stretch,
            V::Size { .. } => AttrKind::Size,
            V::FontDesc(_) => AttrKind::FontDesc,
            V::Foreground(_) => AttrKind::Foreground,
            V::Background(_) => AttrKind::Background,
            V::Underline(_) => AttrKind::Underline,
            V::UnderlineColor(_) => AttrKind::UnderlineColor,
            V::Strikethrough(_) => AttrKind::Strikethrough,
            V::StrikethroughColor(_) => AttrKind::StrikethroughColor,
            V::Overline(_) => AttrKind::Overline,
            V::OverlineColor(_) => AttrKind::OverlineColor,
            V::Gravity(_) => AttrKind::Gravity,
            V::GravityHint(_) => AttrKind::GravityHint,
            V::Rise(_) => AttrKind::Rise,
            V::BaselineShift(_) => AttrKind::BaselineShift,
            V::FontScale(_) => AttrKind::FontScale,
            V::Scale(_) => AttrKind::Scale,
            V::Fallback(_) => AttrKind::Fallback,
            V::LetterSpacing(_) => AttrKind::LetterSpacing,
            V::FontFeatures(_) => AttrKind::FontFeatures,
            V::ForegroundAlpha(_) => AttrKind::ForegroundAlpha,
            V::BackgroundAlpha(_) => AttrKind::BackgroundAlpha,
            V::AllowBreaks(_) => AttrKind::AllowBreaks,
            V::Show(_) => AttrKind::Show,
            V::InsertHyphens(_) => AttrKind::InsertHyphens,
            V::LineHeight(_) => AttrKind::LineHeight,
            V::AbsoluteLineHeight(_) => AttrKind::AbsoluteLineHeight,
            V::LineSpacing(_) => AttrKind::LineSpacing,
            V::TextTransform(_) => AttrKind::TextTransform,
            V::Word => AttrKind::Word,
            V::Sentence => AttrKind::Sentence,
            V::Paragraph => AttrKind::Paragraph,
            V::Shape(_) => AttrKind::Shape,
        }
    }

    /// Compares attributes by value, ignoring the ranges.
    pub fn equal(&self, other: &Self) -> bool {
        self.value == other.value
    }

    /// Whether this attribute participates in itemization.
    pub fn affects_itemization(&self) -> bool {
        self.kind().affects().intersects(Affects::ITEMIZATION)
    }

    /// Whether this attribute participates in line breaking or shaping.
    pub fn affects_break_or_shape(&self) -> bool {
        self.kind()
            .affects()
            .intersects(Affects::BREAKING | Affects::SHAPING)
    }
}

static ATTR_TYPES: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// The first identifier handed out by [`register_attr_type`].
pub const ATTR_TYPE_FIRST_CUSTOM: u32 = 0x0100_0000;

/// A registered custom attribute type identifier.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct AttrType(pub u32);

/// Registers a custom attribute type, allocating a fresh identifier for it.
///
/// The registry is process-wide; the same name may be registered more than
/// once and receives a distinct identifier each time.
pub fn register_attr_type(name: &str) -> AttrType {
    let mut types = ATTR_TYPES.lock().unwrap();
    types.push(name.to_owned());
    AttrType(ATTR_TYPE_FIRST_CUSTOM + (types.len() - 1) as u32)
}

/// The name a custom attribute type was registered with, or `None` for an
/// identifier that was never handed out.
pub fn attr_type_name(ty: AttrType) -> Option<String> {
    let types = ATTR_TYPES.lock().unwrap();
    let index = ty.0.checked_sub(ATTR_TYPE_FIRST_CUSTOM)? as usize;
    types.get(index).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_equality_ignores_range() {
        let a = Attribute::with_range(AttrValue::Family("serif".into()), 0, 5);
        let b = Attribute::with_range(AttrValue::Family("serif".into()), 7, 9);
        assert!(a.equal(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn classification() {
        let family = Attribute::new(AttrValue::Family("serif".into()));
        assert!(family.affects_itemization());
        assert!(!family.affects_break_or_shape());

        let hyphens = Attribute::new(AttrValue::InsertHyphens(false));
        assert!(!hyphens.affects_itemization());
        assert!(hyphens.affects_break_or_shape());

        let fg = Attribute::new(AttrValue::Foreground(Color::new(0, 0, 0)));
        assert!(!fg.affects_itemization());
        assert!(!fg.affects_break_or_shape());

        assert!(AttrKind::FontFeatures.accumulates());
        assert!(!AttrKind::Weight.accumulates());
    }

    #[test]
    fn custom_type_registry() {
        let ty = register_attr_type("extra-emphasis");
        assert!(ty.0 >= ATTR_TYPE_FIRST_CUSTOM);
        assert_eq!(attr_type_name(ty).as_deref(), Some("extra-emphasis"));
        assert_eq!(attr_type_name(AttrType(ty.0 + 1000)), None);
    }
}
