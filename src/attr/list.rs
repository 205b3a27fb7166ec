// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered collections of ranged attributes.

use super::{AttrIterator, Attribute};

/// A list of [`Attribute`]s kept sorted by nondecreasing `start_index`.
///
/// Attributes with equal start indices keep their insertion order:
/// [`insert`](AttrList::insert) places a new attribute after existing ones
/// with the same start, [`insert_before`](AttrList::insert_before) places it
/// before them.
#[derive(Clone, Default, Debug)]
pub struct AttrList {
    attributes: Vec<Attribute>,
}

impl AttrList {
    pub fn new() -> Self {
        Self::default()
    }

    /// The attributes in the list, in order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// An iterator over the piecewise-constant attribute ranges of the list.
    pub fn iterator(&self) -> AttrIterator<'_> {
        AttrIterator::new(&self.attributes)
    }

    fn insert_internal(&mut self, attr: Attribute, before: bool) {
        let start_index = attr.start_index;
        match self.attributes.last() {
            None => self.attributes.push(attr),
            Some(last)
                if last.start_index < start_index
                    || (!before && last.start_index == start_index) =>
            {
                self.attributes.push(attr);
            }
            _ => {
                let pos = self
                    .attributes
                    .iter()
                    .position(|cur| {
                        cur.start_index > start_index
                            || (before && cur.start_index == start_index)
                    })
                    .unwrap_or(self.attributes.len());
                self.attributes.insert(pos, attr);
            }
        }
    }

    /// Inserts `attr`, after all other attributes with a matching start
    /// index.
    pub fn insert(&mut self, attr: Attribute) {
        self.insert_internal(attr, false);
    }

    /// Inserts `attr`, before all other attributes with a matching start
    /// index.
    pub fn insert_before(&mut self, attr: Attribute) {
        self.insert_internal(attr, true);
    }

    /// Inserts `attr`, replacing any attributes of the same kind on the
    /// covered segment and merging with adjoining equal attributes.
    ///
    /// This is slower than [`insert`](Self::insert) but, unlike it, keeps
    /// the list free of redundant overlapping attributes, which makes it the
    /// right operation for continually updating a live attribute set.
    pub fn change(&mut self, attr: Attribute) {
        let start_index = attr.start_index;
        let end_index = attr.end_index;

        if start_index == end_index {
            // Empty range; nothing to do.
            return;
        }

        if self.attributes.is_empty() {
            self.insert(attr);
            return;
        }

        let kind = attr.kind();
        let initial_len = self.attributes.len();
        // Index of `attr` within the list once it has been placed.
        let mut attr_index = None;
        let mut i = 0;
        while i < initial_len {
            let tmp = &self.attributes[i];

            if tmp.start_index > start_index {
                self.attributes.insert(i, attr.clone());
                attr_index = Some(i);
                break;
            }

            if tmp.kind() != kind || tmp.end_index < start_index {
                // Different kind, or no overlap with the new attribute.
                i += 1;
                continue;
            }

            if tmp.equal(&attr) {
                if tmp.end_index >= end_index {
                    // Totally overlapped by an equal attribute.
                    return;
                }
                self.attributes[i].end_index = end_index;
                attr_index = Some(i);
                break;
            } else {
                // Split, truncate, or remove the old attribute.
                if tmp.end_index > end_index {
                    let mut end_attr = tmp.clone();
                    end_attr.start_index = end_index;
                    self.insert(end_attr);
                }
                if self.attributes[i].start_index == start_index {
                    self.attributes.remove(i);
                    break;
                } else {
                    self.attributes[i].end_index = start_index;
                    i += 1;
                }
            }
        }

        let attr_index = match attr_index {
            Some(index) => index,
            None => {
                self.insert(attr);
                return;
            }
        };

        // The attribute is in the list; sweep forward merging equal or
        // swallowed attributes and trimming partial overlaps.
        let mut i = attr_index + 1;
        while i < self.attributes.len() {
            if self.attributes[i].start_index > end_index {
                break;
            }
            if self.attributes[i].kind() != kind {
                i += 1;
                continue;
            }

            let tmp_end = self.attributes[i].end_index;
            let current_end = self.attributes[attr_index].end_index;
            if tmp_end <= current_end || self.attributes[i].equal(&self.attributes[attr_index]) {
                self.attributes[attr_index].end_index = current_end.max(tmp_end);
                self.attributes.remove(i);
            } else {
                // Trim the overlapped head; this may require moving the
                // attribute to keep starts nondecreasing.
                let mut moved = self.attributes.remove(i);
                moved.start_index = current_end;
                let mut j = i;
                while j < self.attributes.len()
                    && self.attributes[j].start_index < moved.start_index
                {
                    j += 1;
                }
                self.attributes.insert(j, moved);
                if j == i {
                    i += 1;
                }
            }
        }
    }

    /// Adjusts attribute indices for a text edit that removed `remove` bytes
    /// at `pos` and inserted `add` bytes in their place.
    ///
    /// Attributes entirely inside the removed range are dropped; attributes
    /// straddling it are clipped; attributes after it are translated.
    pub fn update(&mut self, pos: usize, remove: usize, add: usize) {
        let pos = pos as u64;
        let remove = remove as u64;
        let add = add as u64;
        let clamp = |v: u64| v.min(u32::MAX as u64) as u32;

        let mut i = 0;
        while i < self.attributes.len() {
            let start = self.attributes[i].start_index as u64;
            let end = self.attributes[i].end_index as u64;

            if start >= pos && end < pos + remove {
                self.attributes.remove(i);
                continue;
            }

            if start >= pos && start < pos + remove {
                self.attributes[i].start_index = clamp(pos + add);
            } else if start >= pos + remove {
                self.attributes[i].start_index = clamp(start + add - remove);
            }

            if end >= pos && end < pos + remove {
                self.attributes[i].end_index = clamp(pos);
            } else if end >= pos + remove {
                self.attributes[i].end_index = clamp(end + add - remove);
            }

            i += 1;
        }
    }

    /// Opens a `len`-byte hole at `pos`, stretching attributes that cross
    /// it, then overlays `other` (offset by `pos` and clipped to the hole)
    /// using [`change`](Self::change) semantics.
    pub fn splice(&mut self, other: &Self, pos: usize, len: usize) {
        let upos = pos.min(u32::MAX as usize) as u32;
        let ulen = len.min(u32::MAX as usize) as u32;
        let end = upos.saturating_add(ulen);

        for attr in &mut self.attributes {
            if attr.start_index <= upos {
                if attr.end_index > upos {
                    attr.end_index = attr.end_index.saturating_add(ulen);
                }
            } else {
                attr.start_index = attr.start_index.saturating_add(ulen);
                attr.end_index = attr.end_index.saturating_add(ulen);
            }
        }

        for attr in &other.attributes {
            let mut attr = attr.clone();
            attr.start_index = attr.start_index.saturating_add(upos).min(end);
            attr.end_index = attr.end_index.saturating_add(upos).min(end);
            // `change` discards the attribute if it was squashed to zero
            // length against the end of the hole.
            self.change(attr);
        }
    }

    /// Removes all attributes matching `predicate` into a new list,
    /// preserving order. Returns `None` if nothing matched.
    pub fn filter(&mut self, mut predicate: impl FnMut(&Attribute) -> bool) -> Option<Self> {
        let mut filtered = Vec::new();
        let mut i = 0;
        while i < self.attributes.len() {
            if predicate(&self.attributes[i]) {
                filtered.push(self.attributes.remove(i));
            } else {
                i += 1;
            }
        }
        (!filtered.is_empty()).then_some(Self {
            attributes: filtered,
        })
    }

    /// Whether both lists contain the same attributes covering the same
    /// ranges, regardless of order. Lists containing duplicates may compare
    /// incorrectly.
    pub fn equal(&self, other: &Self) -> bool {
        if self.attributes.len() != other.attributes.len() {
            return false;
        }

        let mut consumed = vec![false; other.attributes.len()];
        'outer: for attr in &self.attributes {
            for (other_attr, consumed) in other.attributes.iter().zip(consumed.iter_mut()) {
                if *consumed {
                    continue;
                }
                if attr.start_index == other_attr.start_index
                    && attr.end_index == other_attr.end_index
                    && attr.equal(other_attr)
                {
                    *consumed = true;
                    continue 'outer;
                }
            }
            return false;
        }
        true
    }
}
