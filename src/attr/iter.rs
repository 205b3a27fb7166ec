// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Piecewise-constant iteration over an attribute list.

use smallvec::SmallVec;

use super::{AttrKind, Attribute};
use crate::font::{FontDescription, FontMask};
use crate::types::Language;

/// Walks an [`AttrList`](super::AttrList) as a sequence of half-open byte
/// ranges within which the set of applicable attributes is constant.
///
/// The list must not be modified while an iterator borrows it.
#[derive(Clone)]
pub struct AttrIterator<'a> {
    attrs: &'a [Attribute],
    attr_index: usize,
    /// Attributes open at the current position, in the order they started.
    stack: SmallVec<[usize; 8]>,
    start_index: u32,
    end_index: u32,
}

impl<'a> AttrIterator<'a> {
    pub(crate) fn new(attrs: &'a [Attribute]) -> Self {
        let mut iter = Self {
            attrs,
            attr_index: 0,
            stack: SmallVec::new(),
            start_index: 0,
            end_index: 0,
        };
        if !iter.advance() {
            iter.end_index = u32::MAX;
        }
        iter
    }

    /// The byte range `[start, end)` of the current segment.
    pub fn range(&self) -> (u32, u32) {
        (self.start_index, self.end_index)
    }

    /// Advances to the next change of attributes.
    ///
    /// Returns false once the iterator has moved past the last attribute;
    /// the final segment then extends to `u32::MAX`.
    pub fn advance(&mut self) -> bool {
        if self.attr_index >= self.attrs.len() && self.stack.is_empty() {
            return false;
        }

        self.start_index = self.end_index;
        self.end_index = u32::MAX;

        let start_index = self.start_index;
        let attrs = self.attrs;
        self.stack.retain(|&mut idx| attrs[idx].end_index != start_index);
        for &idx in &self.stack {
            self.end_index = self.end_index.min(self.attrs[idx].end_index);
        }

        while let Some(attr) = self.attrs.get(self.attr_index) {
            if attr.start_index != self.start_index {
                break;
            }
            if attr.end_index > self.start_index {
                self.stack.push(self.attr_index);
                self.end_index = self.end_index.min(attr.end_index);
            }
            self.attr_index += 1;
        }

        if let Some(attr) = self.attrs.get(self.attr_index) {
            self.end_index = self.end_index.min(attr.start_index);
        }

        true
    }

    /// The current attribute of the given kind. When several overlap, the
    /// one whose range started closest to the current position wins.
    pub fn get(&self, kind: AttrKind) -> Option<&'a Attribute> {
        self.stack
            .iter()
            .rev()
            .map(|&idx| &self.attrs[idx])
            .find(|attr| attr.kind() == kind)
    }

    /// All attributes applying to the current range, one per kind, topmost
    /// first.
    pub fn attrs(&self) -> Vec<Attribute> {
        let mut result: Vec<Attribute> = Vec::new();
        for &idx in self.stack.iter().rev() {
            let attr = &self.attrs[idx];
            if result.iter().any(|a| a.kind() == attr.kind()) {
                continue;
            }
            result.push(attr.clone());
        }
        result
    }

    /// Collapses the font-affecting attributes on the stack into `desc`,
    /// the active language into `language`, and the remaining attributes
    /// into `extra_attrs` (one per kind, except for accumulating kinds
    /// which are all preserved).
    ///
    /// Overriding attribute kinds are resolved top-down with a field mask,
    /// so the most recently started value wins. A `Scale` attribute
    /// composes multiplicatively with the resolved size, preserving the
    /// absolute-size flag.
    pub fn get_font(
        &self,
        desc: &mut FontDescription,
        language: &mut Option<Language>,
        mut extra_attrs: Option<&mut Vec<Attribute>>,
    ) {
        use super::AttrValue as V;

        let mut mask = FontMask::empty();
        let mut have_language = false;
        let mut scale = None;

        for &idx in self.stack.iter().rev() {
            let attr = &self.attrs[idx];
            match &attr.value {
                V::FontDesc(other) => {
                    let new_mask = other.set_fields() & !mask;
                    mask |= new_mask;
                    desc.unset_fields(new_mask);
                    let mut masked = other.clone();
                    masked.unset_fields(other.set_fields() & !new_mask);
                    desc.merge(&masked, false);
                }
                V::Family(family) => {
                    if !mask.contains(FontMask::FAMILY) {
                        mask |= FontMask::FAMILY;
                        desc.set_family(family);
                    }
                }
                V::Style(style) => {
                    if !mask.contains(FontMask::STYLE) {
                        mask |= FontMask::STYLE;
                        desc.set_style(*style);
                    }
                }
                V::Variant(variant) => {
                    if !mask.contains(FontMask::VARIANT) {
                        mask |= FontMask::VARIANT;
                        desc.set_variant(*variant);
                    }
                }
                V::Weight(weight) => {
                    if !mask.contains(FontMask::WEIGHT) {
                        mask |= FontMask::WEIGHT;
                        desc.set_weight(*weight);
                    }
                }
                V::Stretch(stretch) => {
                    if !mask.contains(FontMask::STRETCH) {
                        mask |= FontMask::STRETCH;
                        desc.set_stretch(*stretch);
                    }
                }
                V::Size { size, absolute } => {
                    if !mask.contains(FontMask::SIZE) {
                        mask |= FontMask::SIZE;
                        if *absolute {
                            desc.set_absolute_size(*size);
                        } else {
                            desc.set_size(*size);
                        }
                    }
                }
                V::Scale(factor) => {
                    if scale.is_none() {
                        scale = Some(*factor);
                    }
                }
                V::Language(lang) => {
                    if !have_language {
                        have_language = true;
                        *language = Some(*lang);
                    }
                }
                _ => {
                    if let Some(extra) = extra_attrs.as_deref_mut() {
                        // Accumulating kinds are never collapsed; everything
                        // else keeps only the topmost value.
                        let found = !attr.kind().accumulates()
                            && extra.iter().any(|a| a.kind() == attr.kind());
                        if !found {
                            extra.push(attr.clone());
                        }
                    }
                }
            }
        }

        if let Some(scale) = scale {
            let size = (scale * desc.size() as f64).round() as i32;
            if desc.size_is_absolute() {
                desc.set_absolute_size(size);
            } else {
                desc.set_size(size);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttrList, AttrValue};
    use crate::font::FontWeight;
    use crate::types::SCALE;

    fn attr(value: AttrValue, start: u32, end: u32) -> Attribute {
        Attribute::with_range(value, start, end)
    }

    #[test]
    fn empty_list_is_one_segment() {
        let list = AttrList::new();
        let mut iter = list.iterator();
        assert_eq!(iter.range(), (0, u32::MAX));
        assert!(!iter.advance());
    }

    #[test]
    fn segments_tile_the_attribute_extent() {
        let mut list = AttrList::new();
        list.insert(attr(AttrValue::Family("serif".into()), 0, 10));
        list.insert(attr(AttrValue::Weight(FontWeight::BOLD), 5, 15));
        list.insert(attr(AttrValue::Rise(256), 8, 12));

        let mut iter = list.iterator();
        let mut segments = Vec::new();
        loop {
            let (start, end) = iter.range();
            segments.push((start, end));
            if !iter.advance() {
                break;
            }
        }
        // Consecutive and non-overlapping, with no gap up to the last end.
        for pair in segments.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        assert_eq!(
            segments,
            vec![(0, 5), (5, 8), (8, 10), (10, 12), (12, 15), (15, u32::MAX)]
        );
    }

    #[test]
    fn get_returns_topmost_of_kind() {
        let mut list = AttrList::new();
        list.insert(attr(AttrValue::Family("serif".into()), 0, 20));
        list.insert(attr(AttrValue::Family("mono".into()), 5, 10));

        let mut iter = list.iterator();
        assert_eq!(
            iter.get(AttrKind::Family).unwrap().value,
            AttrValue::Family("serif".into())
        );
        iter.advance();
        assert_eq!(iter.range(), (5, 10));
        assert_eq!(
            iter.get(AttrKind::Family).unwrap().value,
            AttrValue::Family("mono".into())
        );
        iter.advance();
        assert_eq!(
            iter.get(AttrKind::Family).unwrap().value,
            AttrValue::Family("serif".into())
        );
    }

    #[test]
    fn get_font_composes_scale_with_size() {
        let mut list = AttrList::new();
        list.insert(attr(
            AttrValue::Size {
                size: 10 * SCALE,
                absolute: false,
            },
            0,
            10,
        ));
        list.insert(attr(AttrValue::Scale(1.5), 0, 10));

        let iter = list.iterator();
        let mut desc = FontDescription::new();
        let mut language = None;
        iter.get_font(&mut desc, &mut language, None);
        assert_eq!(desc.size(), 15 * SCALE);
        assert!(!desc.size_is_absolute());
    }

    #[test]
    fn get_font_collects_extras_per_kind() {
        let mut list = AttrList::new();
        list.insert(attr(AttrValue::Rise(100), 0, 10));
        list.insert(attr(AttrValue::Rise(200), 2, 8));
        list.insert(attr(AttrValue::FontFeatures("liga=0".into()), 0, 10));
        list.insert(attr(AttrValue::FontFeatures("dlig=1".into()), 2, 8));

        let mut iter = list.iterator();
        iter.advance();
        let mut desc = FontDescription::new();
        let mut language = None;
        let mut extras = Vec::new();
        iter.get_font(&mut desc, &mut language, Some(&mut extras));

        // Rise collapses to the topmost value, font features accumulate.
        let rises: Vec<_> = extras
            .iter()
            .filter(|a| a.kind() == AttrKind::Rise)
            .collect();
        assert_eq!(rises.len(), 1);
        assert_eq!(rises[0].value, AttrValue::Rise(200));
        let features = extras
            .iter()
            .filter(|a| a.kind() == AttrKind::FontFeatures)
            .count();
        assert_eq!(features, 2);
    }

    #[test]
    fn get_font_language_prefers_topmost() {
        let ca = Language::from_string("ca");
        let en = Language::from_string("en");
        let mut list = AttrList::new();
        list.insert(attr(AttrValue::Language(en), 0, 10));
        list.insert(attr(AttrValue::Language(ca), 3, 7));

        let mut iter = list.iterator();
        iter.advance();
        let mut desc = FontDescription::new();
        let mut language = None;
        iter.get_font(&mut desc, &mut language, None);
        assert_eq!(language, Some(ca));
    }
}
