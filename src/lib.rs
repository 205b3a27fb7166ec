// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layline is a library for itemizing and breaking attributed text into
//! lines.
//!
//! Some key types are:
//! - [`AttrList`] holds ranged formatting [`Attribute`]s and supports
//!   in-place edits; [`AttrIterator`] walks it as a sequence of ranges with
//!   a constant attribute set.
//! - [`itemize`] divides text into [`Item`]s sharing direction, script,
//!   language and font, consulting a [`FontMap`] you provide.
//! - [`LineBreaker`] is a pull-model line producer: queue paragraph sources
//!   with [`add_text`](LineBreaker::add_text), then call
//!   [`next_line`](LineBreaker::next_line) repeatedly, choosing width, wrap
//!   mode and ellipsization per line. The most recent line can be undone to
//!   retry it with different parameters.
//! - [`TabArray`] describes alignment-aware tab stops consumed by the
//!   breaker.
//!
//! Fonts and shaping stay outside the crate: you supply the [`FontMap`],
//! [`Fontset`], [`Font`] and [`Shaper`] implementations (say, a HarfBuzz
//! binding) through a [`Context`], and the core drives them. All widths and
//! offsets are integers in units of [`SCALE`]ths of a device unit.
//!
//! ```no_run
//! use layline::{Context, EllipsizeMode, LineBreaker, WrapMode, SCALE};
//! # fn font_map() -> std::rc::Rc<dyn layline::FontMap> { unimplemented!() }
//! # fn shaper() -> std::rc::Rc<dyn layline::Shaper> { unimplemented!() }
//!
//! let context = Context::new(font_map(), shaper());
//! let mut breaker = LineBreaker::new(context);
//! breaker.add_text("Some text to lay out.", None);
//! while let Some(line) = breaker.next_line(0, 200 * SCALE, WrapMode::Word, EllipsizeMode::None) {
//!     for run in line.runs() {
//!         // Draw the run's glyphs.
//!     }
//! }
//! ```

#![warn(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod attr;
mod bidi;
mod breaks;
mod context;
mod font;
mod glyph;
mod glyph_item;
mod item;
mod itemize;
mod line;
mod line_breaker;
mod tabs;
mod types;

#[cfg(test)]
mod tests;

pub use attr::{
    attr_type_name, register_attr_type, Affects, AttrIterator, AttrKind, AttrList, AttrType,
    AttrValue, Attribute, ShapeData, ATTR_INDEX_FROM_TEXT_BEGINNING, ATTR_INDEX_TO_TEXT_END,
    ATTR_TYPE_FIRST_CUSTOM,
};
pub use bidi::{embedding_levels, find_base_dir};
pub use breaks::{compute_log_attrs, LogAttr};
pub use context::Context;
pub use font::{
    BaselineShifts, BaselineTag, Font, FontDescription, FontMap, FontMask, FontMetrics,
    FontStretch, FontStyle, FontVariant, FontWeight, Fontset,
};
pub use glyph::{Glyph, GlyphGeometry, GlyphInfo, GlyphString, ShapeFlags, Shaper};
pub use glyph_item::GlyphItem;
pub use item::{Analysis, AnalysisFlags, Item, ItemProperties};
pub use itemize::itemize;
pub use line::{Line, LineData};
pub use line_breaker::LineBreaker;
pub use tabs::{ParseTabArrayError, TabAlign, TabArray};
pub use types::{
    baseline_shift, units_from_double, units_round, units_to_double, Color, Direction,
    EllipsizeMode, FontScale, Gravity, GravityHint, Language, Overline, Rectangle, Show,
    TextTransform, Underline, WrapMode, SCALE,
};

// Re-export the script type used in analyses so callers don't need to
// depend on icu_properties directly.
pub use icu_properties::props::Script;
