// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A shaped run: an item paired with its glyphs.

use crate::attr::AttrList;
use crate::glyph::GlyphString;
use crate::item::Item;

/// An [`Item`] and the result of shaping it, plus the per-run offsets
/// produced by baseline shifting.
#[derive(Clone, Debug)]
pub struct GlyphItem {
    pub item: Item,
    pub glyphs: GlyphString,
    /// Vertical displacement of the whole run from the line baseline.
    pub y_offset: i32,
    /// Horizontal displacement applied at the start of the run.
    pub start_x_offset: i32,
    /// Horizontal displacement applied at the end of the run.
    pub end_x_offset: i32,
}

impl GlyphItem {
    pub fn new(item: Item, glyphs: GlyphString) -> Self {
        Self {
            item,
            glyphs,
            y_offset: 0,
            start_x_offset: 0,
            end_x_offset: 0,
        }
    }

    /// The total advance of the run.
    pub fn width(&self) -> i32 {
        self.glyphs.width()
    }

    /// The largest cluster start at or before `index` (bytes relative to
    /// the item start), which is the closest legal split position.
    fn cluster_start_before(&self, index: usize) -> usize {
        let mut best = 0;
        for &cluster in &self.glyphs.log_clusters {
            let cluster = cluster as usize;
            if cluster <= index && cluster > best {
                best = cluster;
            }
        }
        best
    }

    /// Splits the run at `split_index` bytes from the start of the item,
    /// returning the logically-first part. The index must be a cluster
    /// boundary inside the run.
    pub fn split(&mut self, text: &str, split_index: usize) -> Self {
        debug_assert!(split_index > 0 && split_index < self.item.length);

        let split_offset = text[self.item.offset..self.item.offset + split_index]
            .chars()
            .count();
        let prefix_item = self.item.split(split_index, split_offset);

        let rtl = prefix_item.analysis.is_rtl();
        let (prefix_glyphs, suffix_glyphs) = if rtl {
            // Visual storage is reversed: the logically-first clusters are
            // at the end of the glyph array.
            let boundary = self
                .glyphs
                .log_clusters
                .iter()
                .position(|&c| (c as usize) < split_index)
                .unwrap_or(self.glyphs.log_clusters.len());
            let suffix = GlyphString {
                glyphs: self.glyphs.glyphs[..boundary].to_vec(),
                log_clusters: self.glyphs.log_clusters[..boundary].to_vec(),
            };
            let prefix = GlyphString {
                glyphs: self.glyphs.glyphs[boundary..].to_vec(),
                log_clusters: self.glyphs.log_clusters[boundary..].to_vec(),
            };
            (prefix, suffix)
        } else {
            let boundary = self
                .glyphs
                .log_clusters
                .iter()
                .position(|&c| (c as usize) >= split_index)
                .unwrap_or(self.glyphs.log_clusters.len());
            let prefix = GlyphString {
                glyphs: self.glyphs.glyphs[..boundary].to_vec(),
                log_clusters: self.glyphs.log_clusters[..boundary].to_vec(),
            };
            let suffix = GlyphString {
                glyphs: self.glyphs.glyphs[boundary..].to_vec(),
                log_clusters: self.glyphs.log_clusters[boundary..].to_vec(),
            };
            (prefix, suffix)
        };

        self.glyphs = suffix_glyphs;
        for cluster in &mut self.glyphs.log_clusters {
            *cluster -= split_index as i32;
        }

        Self {
            item: prefix_item,
            glyphs: prefix_glyphs,
            y_offset: self.y_offset,
            start_x_offset: self.start_x_offset,
            end_x_offset: self.end_x_offset,
        }
    }

    /// Splits the run at the boundaries of `list`'s ranges, attaching the
    /// attributes of each range to the piece it covers.
    ///
    /// Boundaries that fall inside a cluster are moved back to the cluster
    /// start, so attributes may spill over into the preceding boundary's
    /// piece rather than splitting a cluster.
    pub fn apply_attrs(mut self, text: &str, list: &AttrList) -> Vec<Self> {
        if list.is_empty() {
            return vec![self];
        }

        let mut result = Vec::new();
        let mut iter = list.iterator();

        // Skip segments entirely before the run.
        loop {
            let (_, end) = iter.range();
            if end as usize > self.item.offset {
                break;
            }
            if !iter.advance() {
                break;
            }
        }

        let mut pending = Vec::new();
        loop {
            let (start, end) = iter.range();
            let item_end = self.item.offset + self.item.length;
            if start as usize >= item_end {
                break;
            }

            let mut attrs = iter.attrs();
            if (end as usize) < item_end {
                let rel = self.cluster_start_before(end as usize - self.item.offset);
                if rel > 0 {
                    let mut prefix = self.split(text, rel);
                    prefix.item.analysis.extra_attrs.append(&mut pending);
                    prefix.item.analysis.extra_attrs.append(&mut attrs);
                    result.push(prefix);
                } else {
                    // Mid-cluster boundary at the very start; carry the
                    // attributes over to the piece that owns the cluster.
                    pending.append(&mut attrs);
                }
                if !iter.advance() {
                    break;
                }
            } else {
                pending.append(&mut attrs);
                break;
            }
        }

        self.item.analysis.extra_attrs.append(&mut pending);
        result.push(self);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttrValue, Attribute};
    use crate::font::{Font, FontDescription, FontMetrics};
    use crate::glyph::Glyph;
    use crate::item::{Analysis, AnalysisFlags};
    use crate::types::{Color, Gravity, Language};
    use icu_properties::props::Script;
    use std::rc::Rc;

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

    fn run(text: &str, level: u8) -> GlyphItem {
        let item = Item {
            offset: 0,
            length: text.len(),
            num_chars: text.chars().count(),
            char_offset: 0,
            analysis: Analysis {
                font: Rc::new(NullFont),
                level,
                gravity: Gravity::South,
                flags: AnalysisFlags::empty(),
                script: Script::Latin,
                language: Language::default(),
                extra_attrs: Vec::new(),
            },
        };
        let mut glyphs = GlyphString::new();
        glyphs.set_size(item.num_chars);
        let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        for (i, g) in glyphs.glyphs.iter_mut().enumerate() {
            g.glyph = Glyph(i as u32 + 1);
            g.geometry.width = 10;
            let logical = if level & 1 != 0 {
                offsets.len() - 1 - i
            } else {
                i
            };
            glyphs.log_clusters[i] = offsets[logical] as i32;
        }
        GlyphItem::new(item, glyphs)
    }

    #[test]
    fn split_ltr_divides_glyphs() {
        let mut r = run("abcde", 0);
        let prefix = r.split("abcde", 2);
        assert_eq!(prefix.item.length, 2);
        assert_eq!(prefix.glyphs.glyphs.len(), 2);
        assert_eq!(r.item.offset, 2);
        assert_eq!(r.glyphs.glyphs.len(), 3);
        assert_eq!(r.glyphs.log_clusters, vec![0, 1, 2]);
    }

    #[test]
    fn split_rtl_divides_glyphs_from_the_tail() {
        let mut r = run("abcde", 1);
        let prefix = r.split("abcde", 2);
        assert_eq!(prefix.glyphs.glyphs.len(), 2);
        // The logically-first glyphs sit at the end of the visual array.
        assert_eq!(prefix.glyphs.log_clusters, vec![1, 0]);
        assert_eq!(r.glyphs.glyphs.len(), 3);
        assert_eq!(r.glyphs.log_clusters, vec![2, 1, 0]);
    }

    #[test]
    fn apply_attrs_splits_at_boundaries() {
        let r = run("abcde", 0);
        let mut list = AttrList::new();
        list.insert(Attribute::with_range(
            AttrValue::Foreground(Color::new(1, 2, 3)),
            1,
            3,
        ));
        let pieces = r.apply_attrs("abcde", &list);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].item.length, 1);
        assert_eq!(pieces[1].item.length, 2);
        assert_eq!(pieces[2].item.length, 2);
        assert_eq!(pieces[1].item.analysis.extra_attrs.len(), 1);
        assert!(pieces[0].item.analysis.extra_attrs.is_empty());
        assert!(pieces[2].item.analysis.extra_attrs.is_empty());
    }
}
