// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shaped glyphs and the shaping interface.

use crate::breaks::LogAttr;
use crate::item::Item;
use crate::types::{units_round, SCALE};

/// A glyph identifier within a font.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Glyph(pub u32);

impl Glyph {
    /// A glyph that occupies no space and draws nothing.
    pub const EMPTY: Self = Self(0x0FFF_FFFF);
    /// Flag marking a placeholder glyph for an unrepresentable character.
    pub const UNKNOWN_FLAG: u32 = 0x1000_0000;

    /// The placeholder glyph for a character no font covers.
    pub fn unknown(c: char) -> Self {
        Self(c as u32 | Self::UNKNOWN_FLAG)
    }

    pub fn is_unknown(self) -> bool {
        self.0 & Self::UNKNOWN_FLAG != 0
    }
}

/// Position of a glyph within its run, in units.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct GlyphGeometry {
    /// Horizontal advance.
    pub width: i32,
    /// Horizontal offset from the pen position when drawing.
    pub x_offset: i32,
    /// Vertical offset from the baseline when drawing.
    pub y_offset: i32,
}

/// One glyph of a shaped run.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct GlyphInfo {
    pub glyph: Glyph,
    pub geometry: GlyphGeometry,
    /// Whether this glyph begins a cluster.
    pub is_cluster_start: bool,
    /// Whether this glyph renders in its own color (e.g. color emoji).
    pub is_color: bool,
}

impl Default for GlyphInfo {
    fn default() -> Self {
        Self {
            glyph: Glyph::EMPTY,
            geometry: GlyphGeometry::default(),
            is_cluster_start: true,
            is_color: false,
        }
    }
}

/// The output of shaping a single item.
///
/// `log_clusters` has one entry per glyph: the byte index, relative to the
/// start of the item's text, of the cluster the glyph belongs to. Glyphs are
/// stored in visual order.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct GlyphString {
    pub glyphs: Vec<GlyphInfo>,
    pub log_clusters: Vec<i32>,
}

impl GlyphString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes to `len` glyphs, default-initializing new entries.
    pub fn set_size(&mut self, len: usize) {
        self.glyphs.resize(len, GlyphInfo::default());
        self.log_clusters.resize(len, 0);
    }

    /// The total advance of the string.
    pub fn width(&self) -> i32 {
        self.glyphs.iter().map(|g| g.geometry.width).sum()
    }

    /// Distributes cluster widths evenly over the characters of each
    /// cluster, writing one width per character of the item into
    /// `logical_widths`.
    pub fn logical_widths(
        &self,
        item_text: &str,
        rtl: bool,
        logical_widths: &mut [i32],
    ) {
        for w in logical_widths.iter_mut() {
            *w = 0;
        }
        if self.glyphs.is_empty() {
            return;
        }

        // Character index of each byte offset in the item.
        let char_index = |byte: usize| item_text[..byte].chars().count();

        // Clusters in logical order: (byte offset, total width).
        let mut clusters: Vec<(usize, i32)> = Vec::new();
        let glyph_range: Box<dyn Iterator<Item = usize>> = if rtl {
            Box::new((0..self.glyphs.len()).rev())
        } else {
            Box::new(0..self.glyphs.len())
        };
        for i in glyph_range {
            let byte = self.log_clusters[i] as usize;
            match clusters.last_mut() {
                Some((last_byte, width)) if *last_byte == byte => {
                    *width += self.glyphs[i].geometry.width;
                }
                _ => clusters.push((byte, self.glyphs[i].geometry.width)),
            }
        }

        for (k, &(byte, width)) in clusters.iter().enumerate() {
            let start = char_index(byte);
            let end = match clusters.get(k + 1) {
                Some(&(next_byte, _)) => char_index(next_byte),
                None => logical_widths.len(),
            };
            let n = (end - start).max(1) as i32;
            let base = width / n;
            for w in logical_widths[start..end].iter_mut() {
                *w = base;
            }
            if end > start {
                logical_widths[start] += width - base * n;
            }
        }
    }

    /// Adds `letter_spacing` after every grapheme boundary inside the
    /// string. The outermost edges are handled by the caller, which also
    /// redistributes spacing visually once the line is assembled.
    pub fn letter_space(
        &mut self,
        item_text: &str,
        rtl: bool,
        log_attrs: &[LogAttr],
        letter_spacing: i32,
    ) {
        if letter_spacing == 0 || self.glyphs.len() < 2 {
            return;
        }
        let (space_left, space_right) = distribute_letter_spacing(letter_spacing);
        let char_index = |byte: usize| item_text[..byte].chars().count();

        for i in 1..self.glyphs.len() {
            if self.log_clusters[i] == self.log_clusters[i - 1] {
                continue;
            }
            // The logically-later side of the visual boundary.
            let later_byte = if rtl {
                self.log_clusters[i - 1]
            } else {
                self.log_clusters[i]
            } as usize;
            if !log_attrs[char_index(later_byte)].contains(LogAttr::CURSOR_POSITION) {
                continue;
            }
            if rtl {
                self.glyphs[i].geometry.width += space_right;
                self.glyphs[i - 1].geometry.width += space_left;
                self.glyphs[i - 1].geometry.x_offset += space_left;
            } else {
                self.glyphs[i - 1].geometry.width += space_right;
                self.glyphs[i].geometry.width += space_left;
                self.glyphs[i].geometry.x_offset += space_left;
            }
        }
    }
}

/// Splits letter spacing into the part placed before a grapheme and the
/// part placed after it, keeping whole-unit spacings on unit boundaries.
pub(crate) fn distribute_letter_spacing(letter_spacing: i32) -> (i32, i32) {
    let mut space_left = letter_spacing / 2;
    if letter_spacing & (SCALE - 1) == 0 {
        space_left = units_round(space_left);
    }
    (space_left, letter_spacing - space_left)
}

bitflags::bitflags! {
    /// Flags influencing the shaping process.
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
    pub struct ShapeFlags: u32 {
        /// Round glyph positions and widths to whole device units.
        const ROUND_POSITIONS = 1 << 0;
    }
}

/// The shaping engine the layout core drives.
///
/// `text` is the full paragraph; the slice to shape is described by `item`.
/// `log_attrs` starts at the item's first character and holds at least
/// `item.num_chars + 1` records. Implementations must honor
/// [`AnalysisFlags::NEED_HYPHEN`](crate::item::AnalysisFlags::NEED_HYPHEN)
/// by appending a hyphen to the shaped output, and must fill `log_clusters`
/// with item-relative byte offsets.
pub trait Shaper {
    fn shape(
        &self,
        text: &str,
        item: &Item,
        log_attrs: &[LogAttr],
        flags: ShapeFlags,
    ) -> GlyphString;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_string(widths: &[i32], clusters: &[i32]) -> GlyphString {
        let mut s = GlyphString::new();
        s.set_size(widths.len());
        for (i, &w) in widths.iter().enumerate() {
            s.glyphs[i].glyph = Glyph(i as u32 + 1);
            s.glyphs[i].geometry.width = w;
            s.log_clusters[i] = clusters[i];
        }
        s
    }

    #[test]
    fn width_sums_glyphs() {
        let s = simple_string(&[10, 20, 30], &[0, 1, 2]);
        assert_eq!(s.width(), 60);
    }

    #[test]
    fn logical_widths_divide_clusters() {
        // Two chars forming one 30-unit cluster, then a lone 12-unit char.
        let s = simple_string(&[30, 12], &[0, 2]);
        let mut widths = [0i32; 3];
        s.logical_widths("abc", false, &mut widths);
        assert_eq!(widths, [15, 15, 12]);
    }

    #[test]
    fn logical_widths_handle_rtl_storage() {
        // Visual order is reversed for RTL: the logically-first cluster is
        // stored last.
        let s = simple_string(&[12, 30], &[2, 0]);
        let mut widths = [0i32; 3];
        s.logical_widths("abc", true, &mut widths);
        assert_eq!(widths, [15, 15, 12]);
    }

    #[test]
    fn distribute_rounds_exact_multiples() {
        let (l, r) = distribute_letter_spacing(2 * SCALE);
        assert_eq!(l + r, 2 * SCALE);
        assert_eq!(l % SCALE, 0);
        let (l, r) = distribute_letter_spacing(3);
        assert_eq!((l, r), (1, 2));
    }

    #[test]
    fn letter_space_adds_between_graphemes() {
        let mut s = simple_string(&[10, 10, 10], &[0, 1, 2]);
        let log_attrs = vec![
            LogAttr::CURSOR_POSITION;
            4
        ];
        s.letter_space("abc", false, &log_attrs, 4);
        // Two internal boundaries, each carrying the full spacing.
        assert_eq!(s.width(), 30 + 8);
    }
}
