// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Laid-out lines.

use std::rc::Rc;

use crate::attr::AttrList;
use crate::breaks;
use crate::context::Context;
use crate::glyph_item::GlyphItem;
use crate::item::{AnalysisFlags, Item};
use crate::types::{Direction, EllipsizeMode};

/// A paragraph source shared between the line breaker and the lines
/// produced from it.
#[derive(Debug)]
pub struct LineData {
    pub(crate) text: String,
    pub(crate) n_chars: usize,
    pub(crate) direction: Direction,
    pub(crate) attrs: Option<AttrList>,
}

impl LineData {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn n_chars(&self) -> usize {
        self.n_chars
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// One line of laid-out text: a slice of a [`LineData`] with its shaped
/// runs.
///
/// Runs are in logical order until the breaker's post-processing reorders
/// them into visual order.
#[derive(Clone, Debug)]
pub struct Line {
    pub(crate) data: Rc<LineData>,
    pub(crate) start_index: usize,
    pub(crate) start_offset: usize,
    pub(crate) length: usize,
    pub(crate) n_chars: usize,
    pub(crate) direction: Direction,
    pub(crate) wrapped: bool,
    pub(crate) ellipsized: bool,
    pub(crate) hyphenated: bool,
    pub(crate) starts_paragraph: bool,
    pub(crate) ends_paragraph: bool,
    pub(crate) runs: Vec<GlyphItem>,
}

impl Line {
    pub(crate) fn new(data: Rc<LineData>) -> Self {
        Self {
            data,
            start_index: 0,
            start_offset: 0,
            length: 0,
            n_chars: 0,
            direction: Direction::Ltr,
            wrapped: false,
            ellipsized: false,
            hyphenated: false,
            starts_paragraph: false,
            ends_paragraph: false,
            runs: Vec::new(),
        }
    }

    /// The paragraph source this line was produced from.
    pub fn data(&self) -> &Rc<LineData> {
        &self.data
    }

    /// The runs of the line, in visual order.
    pub fn runs(&self) -> &[GlyphItem] {
        &self.runs
    }

    /// Byte offset of the line within its source text.
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Character offset of the line within its source text.
    pub fn start_offset(&self) -> usize {
        self.start_offset
    }

    /// Length of the line in bytes, excluding any consumed paragraph
    /// separator.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn n_chars(&self) -> usize {
        self.n_chars
    }

    /// The resolved direction of the line; always LTR or RTL.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the line ends at a wrap rather than a paragraph boundary.
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    pub fn ellipsized(&self) -> bool {
        self.ellipsized
    }

    pub fn hyphenated(&self) -> bool {
        self.hyphenated
    }

    pub fn starts_paragraph(&self) -> bool {
        self.starts_paragraph
    }

    pub fn ends_paragraph(&self) -> bool {
        self.ends_paragraph
    }

    /// The total advance of the line.
    pub fn width(&self) -> i32 {
        self.runs.iter().map(GlyphItem::width).sum()
    }

    /// Reorders the runs from logical to visual order following the
    /// bidirectional levels.
    pub(crate) fn reorder(&mut self) {
        let mut level_or: u8 = 0;
        let mut level_and: u8 = 1;
        for run in &self.runs {
            level_or |= run.item.analysis.level;
            level_and &= run.item.analysis.level;
        }
        let all_even = level_or & 1 == 0;
        let all_odd = level_and & 1 == 1;

        if all_odd {
            self.runs.reverse();
        } else if !all_even {
            let runs = std::mem::take(&mut self.runs);
            self.runs = reorder_runs_recurse(runs);
        }
    }
}

/// The recursive minimum-level reordering from UAX #9: at each level, the
/// logical sequence is cut at minimum-level runs and the pieces are
/// concatenated in reverse order when the minimum level is odd.
fn reorder_runs_recurse(runs: Vec<GlyphItem>) -> Vec<GlyphItem> {
    if runs.is_empty() {
        return runs;
    }
    let min_level = runs
        .iter()
        .map(|r| r.item.analysis.level)
        .min()
        .expect("runs is non-empty");
    let reverse = min_level % 2 == 1;

    let mut pieces: Vec<Vec<GlyphItem>> = Vec::new();
    let mut group: Vec<GlyphItem> = Vec::new();
    for run in runs {
        if run.item.analysis.level == min_level {
            if !group.is_empty() {
                pieces.push(reorder_runs_recurse(std::mem::take(&mut group)));
            }
            pieces.push(vec![run]);
        } else {
            group.push(run);
        }
    }
    if !group.is_empty() {
        pieces.push(reorder_runs_recurse(group));
    }

    if reverse {
        pieces.reverse();
    }
    pieces.into_iter().flatten().collect()
}

/// Cluster boundaries of a run in logical order, as `(relative byte
/// offset, cluster width)` pairs.
fn logical_clusters(run: &GlyphItem) -> Vec<(usize, i32)> {
    let mut clusters: Vec<(usize, i32)> = Vec::new();
    let n = run.glyphs.glyphs.len();
    let indices: Box<dyn Iterator<Item = usize>> = if run.item.analysis.is_rtl() {
        Box::new((0..n).rev())
    } else {
        Box::new(0..n)
    };
    for i in indices {
        let byte = run.glyphs.log_clusters[i] as usize;
        let width = run.glyphs.glyphs[i].geometry.width;
        match clusters.last_mut() {
            Some((last, w)) if *last == byte => *w += width,
            _ => clusters.push((byte, width)),
        }
    }
    clusters
}

/// Splits `run` so that its logically-first part is at most `budget` wide,
/// returning the prefix (or `None` when not even one cluster fits).
fn split_to_fit(run: &mut GlyphItem, text: &str, budget: i32) -> Option<GlyphItem> {
    let clusters = logical_clusters(run);
    let mut acc = 0;
    let mut split_at = 0;
    for (k, &(byte, width)) in clusters.iter().enumerate() {
        // The boundary before this cluster.
        if k > 0 && acc <= budget {
            split_at = byte;
        }
        acc += width;
    }
    (split_at > 0).then(|| run.split(text, split_at))
}

/// Discards the smallest logical prefix of `run` that is at least
/// `min_discard` wide. Returns false when that would discard the whole
/// run.
fn split_discarding_prefix(run: &mut GlyphItem, text: &str, min_discard: i32) -> bool {
    if min_discard <= 0 {
        return true;
    }
    let clusters = logical_clusters(run);
    let mut acc = 0;
    for (k, &(byte, width)) in clusters.iter().enumerate() {
        if k > 0 && acc >= min_discard {
            let _prefix = run.split(text, byte);
            return true;
        }
        acc += width;
    }
    false
}

/// Replaces enough of the line's runs with an ellipsis run to bring the
/// line within `goal_width`. Returns whether anything was removed.
pub(crate) fn ellipsize(
    line: &mut Line,
    context: &Context,
    mode: EllipsizeMode,
    goal_width: i32,
) -> bool {
    if mode == EllipsizeMode::None || line.runs.is_empty() || line.width() <= goal_width {
        return false;
    }

    // Shape the ellipsis with the style of the run at the removal point.
    let model = match mode {
        EllipsizeMode::Start => line.runs.first(),
        _ => line.runs.last(),
    }
    .expect("line has runs");
    let font = model.item.analysis.font.clone();
    let ellipsis_text = if font.glyph('\u{2026}').is_some() {
        "\u{2026}"
    } else {
        "..."
    };
    let mut analysis = model.item.analysis.clone();
    analysis.flags |= AnalysisFlags::IS_ELLIPSIS;
    analysis.flags &= !AnalysisFlags::NEED_HYPHEN;
    analysis.level = if line.direction == Direction::Rtl { 1 } else { 0 };
    analysis.extra_attrs.clear();
    let ellipsis_item = Item {
        offset: line.start_index,
        length: 0,
        num_chars: 0,
        char_offset: line.start_offset,
        analysis,
    };
    let mut shape_item = ellipsis_item.clone();
    shape_item.length = ellipsis_text.len();
    shape_item.num_chars = ellipsis_text.chars().count();
    let log_attrs = breaks::compute_log_attrs(ellipsis_text, None);
    let glyphs = context
        .shaper()
        .shape(ellipsis_text, &shape_item, &log_attrs, Default::default());
    let ellipsis_width = glyphs.width();
    let ellipsis_run = GlyphItem::new(ellipsis_item, glyphs);

    let budget = (goal_width - ellipsis_width).max(0);
    let text = line.data.clone();
    let runs = std::mem::take(&mut line.runs);

    match mode {
        EllipsizeMode::End => {
            let mut kept: Vec<GlyphItem> = Vec::new();
            let mut acc = 0;
            for mut run in runs {
                let w = run.width();
                if acc + w <= budget {
                    acc += w;
                    kept.push(run);
                } else {
                    if let Some(prefix) = split_to_fit(&mut run, &text.text, budget - acc) {
                        kept.push(prefix);
                    }
                    break;
                }
            }
            kept.push(ellipsis_run);
            line.runs = kept;
        }
        EllipsizeMode::Start => {
            let mut kept: Vec<GlyphItem> = Vec::new();
            let mut acc = 0;
            for mut run in runs.into_iter().rev() {
                let w = run.width();
                if acc + w <= budget {
                    acc += w;
                    kept.push(run);
                } else {
                    // Keep the logical tail of the boundary run.
                    let remaining = budget - acc;
                    if split_discarding_prefix(&mut run, &text.text, w - remaining) {
                        kept.push(run);
                    }
                    break;
                }
            }
            kept.push(ellipsis_run);
            kept.reverse();
            line.runs = kept;
        }
        EllipsizeMode::Middle => {
            let half = budget / 2;
            let mut head: Vec<GlyphItem> = Vec::new();
            let mut acc = 0;
            let mut rest: Vec<GlyphItem> = Vec::new();
            let mut iter = runs.into_iter();
            for mut run in iter.by_ref() {
                let w = run.width();
                if acc + w <= half {
                    acc += w;
                    head.push(run);
                } else {
                    if let Some(prefix) = split_to_fit(&mut run, &text.text, half - acc) {
                        acc += prefix.width();
                        head.push(prefix);
                    }
                    rest.push(run);
                    break;
                }
            }
            rest.extend(iter);

            let tail_budget = budget - acc;
            let mut tail: Vec<GlyphItem> = Vec::new();
            let mut tail_acc = 0;
            for mut run in rest.into_iter().rev() {
                let w = run.width();
                if tail_acc + w <= tail_budget {
                    tail_acc += w;
                    tail.push(run);
                } else {
                    let remaining = tail_budget - tail_acc;
                    if split_discarding_prefix(&mut run, &text.text, w - remaining) {
                        tail.push(run);
                    }
                    break;
                }
            }
            tail.reverse();

            head.push(ellipsis_run);
            head.extend(tail);
            line.runs = head;
        }
        EllipsizeMode::None => unreachable!("checked above"),
    }

    line.ellipsized = true;
    true
}
