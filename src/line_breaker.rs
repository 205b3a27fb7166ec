// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pull-model line breaker.
//!
//! A [`LineBreaker`] consumes queued paragraph sources and hands out one
//! [`Line`] per [`next_line`](LineBreaker::next_line) call. Between calls it
//! keeps the shaping scratch for the partially-consumed head item, so
//! producing lines one at a time costs no more than producing them all at
//! once.

use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::attr::{AttrList, AttrValue, Attribute};
use crate::bidi;
use crate::breaks::{self, LogAttr};
use crate::context::Context;
use crate::glyph::{distribute_letter_spacing, Glyph, GlyphString, ShapeFlags};
use crate::glyph_item::GlyphItem;
use crate::item::{AnalysisFlags, Item, ItemProperties};
use crate::itemize::itemize;
use crate::line::{self, Line, LineData};
use crate::tabs::{TabAlign, TabArray};
use crate::types::{baseline_shift, Direction, EllipsizeMode, WrapMode, SCALE};
use crate::font::BaselineTag;

/// The tab stop most recently placed on the current line. Non-left-aligned
/// tabs keep moving as later runs are placed, until the stop is exhausted
/// (or, for decimal tabs, the decimal point has been seen).
#[derive(Clone)]
struct LastTab {
    /// Index of the tab run within the line.
    run_index: usize,
    /// Index of the stop within the tab array.
    index: usize,
    /// Line width when the tab was shaped.
    width: i32,
    /// Resolved position of the stop, relative to the line origin.
    pos: i32,
    align: TabAlign,
    decimal: char,
}

/// A pending baseline-shift attribute whose end has not been seen yet.
struct BaselineEntry {
    start_index: u32,
    end_index: u32,
    value: i32,
    x_offset: i32,
    y_offset: i32,
}

/// The outcome of trying to place the head item on the current line.
#[derive(Debug, PartialEq, Eq)]
enum BreakResult {
    /// Nothing fit.
    NoneFit,
    /// The item was broken in the middle.
    SomeFit,
    /// Everything fit.
    AllFit,
    /// Nothing fit, but a break at the first char makes that fine.
    EmptyFit,
    /// The item is a line separator; the line ends here, justifiable.
    LineSeparator,
    /// The item is a paragraph separator; consumed without producing a run.
    ParagraphSeparator { length: usize, num_chars: usize },
}

/// State retained for rolling the line back to its last break opportunity.
#[derive(Clone, Copy)]
struct BreakState {
    remaining_width: i32,
    start_offset: usize,
    /// Number of runs on the line up to (excluding) the run holding the
    /// break.
    runs_len: usize,
}

/// Breaks attributed text into lines, one at a time.
///
/// Feed input with [`add_text`](Self::add_text) (each call is a separate
/// paragraph-terminated source), then pull lines with
/// [`next_line`](Self::next_line). The most recently produced line can be
/// returned to the breaker with [`undo_line`](Self::undo_line) to try again
/// with different parameters.
pub struct LineBreaker {
    context: Context,
    base_dir: Direction,
    tabs: Option<TabArray>,

    /// Queued sources not yet being processed.
    datas: VecDeque<Rc<LineData>>,
    /// The source lines are currently produced from.
    data: Option<Rc<LineData>>,
    /// Boundary flags for `data`, one per character boundary.
    log_attrs: Vec<LogAttr>,
    /// Pristine items for `data`, kept for undo.
    data_items: Vec<Item>,
    /// Remaining unprocessed items for `data`.
    items: VecDeque<Item>,
    /// Attributes to reapply to the runs after breaking.
    render_attrs: Option<AttrList>,

    // Arguments of the next_line call being served.
    line_wrap: WrapMode,
    line_ellipsize: EllipsizeMode,
    line_x: i32,
    line_width: i32,
    remaining_width: i32,

    // Caches invalidated per source.
    tab_width: Option<i32>,
    hyphen_width: Option<i32>,

    // Shaping scratch for the head item.
    glyphs: Option<GlyphString>,
    properties: ItemProperties,
    log_widths: Vec<i32>,
    log_widths_offset: usize,
    /// Character offset of the head item within the source text.
    start_offset: usize,

    line_start_index: usize,
    line_start_offset: usize,
    at_paragraph_start: bool,

    n_lines: u32,
    baseline_shifts: Vec<BaselineEntry>,
    last_tab: Option<LastTab>,
}

impl LineBreaker {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            base_dir: Direction::Neutral,
            tabs: None,
            datas: VecDeque::new(),
            data: None,
            log_attrs: Vec::new(),
            data_items: Vec::new(),
            items: VecDeque::new(),
            render_attrs: None,
            line_wrap: WrapMode::Word,
            line_ellipsize: EllipsizeMode::None,
            line_x: 0,
            line_width: -1,
            remaining_width: -1,
            tab_width: None,
            hyphen_width: None,
            glyphs: None,
            properties: ItemProperties::default(),
            log_widths: Vec::new(),
            log_widths_offset: 0,
            start_offset: 0,
            line_start_index: 0,
            line_start_offset: 0,
            at_paragraph_start: true,
            n_lines: 0,
            baseline_shifts: Vec::new(),
            last_tab: None,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Sets the tab stops for subsequent lines. `None` restores the default
    /// stops (every 8 space-widths).
    pub fn set_tabs(&mut self, tabs: Option<&TabArray>) {
        self.tabs = tabs.cloned();
        if let Some(tabs) = &mut self.tabs {
            tabs.sort();
        }
    }

    pub fn tabs(&self) -> Option<&TabArray> {
        self.tabs.as_ref()
    }

    /// Sets the base direction for subsequent sources.
    /// [`Direction::Neutral`] (the default) resolves from the content.
    pub fn set_base_dir(&mut self, direction: Direction) {
        self.base_dir = direction;
    }

    pub fn base_dir(&self) -> Direction {
        self.base_dir
    }

    /// The number of lines produced so far.
    pub fn lines_so_far(&self) -> u32 {
        self.n_lines
    }

    /// Queues text to be broken into lines. The end of `text` is treated as
    /// a paragraph break. May be called repeatedly.
    pub fn add_text(&mut self, text: &str, attrs: Option<&AttrList>) {
        let direction = if self.base_dir == Direction::Neutral {
            match bidi::find_base_dir(text) {
                Direction::Neutral => self.context.base_dir(),
                resolved => resolved,
            }
        } else {
            self.base_dir
        };
        self.datas.push_back(Rc::new(LineData {
            text: text.to_owned(),
            n_chars: text.chars().count(),
            direction,
            attrs: attrs.cloned(),
        }));
    }

    /// Whether there is any text left to process.
    pub fn has_line(&mut self) -> bool {
        self.ensure_items();
        !self.items.is_empty()
    }

    /// The resolved direction of the next line, or [`Direction::Neutral`]
    /// when there is no more input.
    pub fn direction(&mut self) -> Direction {
        self.ensure_items();
        self.resolved_dir()
    }

    /// Produces the next line.
    ///
    /// Tab positions are resolved relative to `x`. `width` is the goal
    /// width in units, or negative for no limit. When `ellipsize` is not
    /// [`EllipsizeMode::None`] and `width` is nonnegative, the rest of the
    /// paragraph is placed on this line and ellipsized to fit.
    ///
    /// Returns `None` when all queued input has been consumed.
    pub fn next_line(
        &mut self,
        x: i32,
        width: i32,
        wrap: WrapMode,
        ellipsize: EllipsizeMode,
    ) -> Option<Line> {
        self.ensure_items();
        if self.items.is_empty() {
            return None;
        }
        let data = self.data.clone().expect("items imply an active source");

        let mut line = Line::new(data);
        line.start_index = self.line_start_index;
        line.start_offset = self.line_start_offset;
        line.starts_paragraph = self.at_paragraph_start;
        line.direction = self.resolved_dir();

        self.line_x = x;
        self.line_width = width;
        self.line_wrap = wrap;
        self.line_ellipsize = ellipsize;
        self.last_tab = None;

        self.remaining_width = if self.should_ellipsize() { -1 } else { width };

        self.process_line(&mut line);

        line.n_chars = line.runs.iter().map(|r| r.item.num_chars).sum();

        self.postprocess_line(&mut line);

        if self.items.is_empty() {
            line.ends_paragraph = true;
        }

        self.at_paragraph_start = line.ends_paragraph;
        self.n_lines += 1;
        self.line_start_index += line.length;
        self.line_start_offset = self.start_offset;

        if self.items.is_empty() {
            self.data = None;
            self.data_items.clear();
            self.render_attrs = None;
            self.log_attrs.clear();
        }

        debug!(
            start_index = line.start_index,
            length = line.length,
            wrapped = line.wrapped,
            ends_paragraph = line.ends_paragraph,
            "emitted line"
        );
        Some(line)
    }

    /// Returns the content of `line` to the unprocessed input, so it can be
    /// broken again with different parameters.
    ///
    /// Only the most recently produced line can be undone; when undoing
    /// several lines they must be undone in reverse production order.
    /// Returns false if the breaker determines the line cannot be undone.
    pub fn undo_line(&mut self, line: &Line) -> bool {
        if self.data.is_none()
            && line.start_index == 0
            && line.length == line.data.text.len()
        {
            debug_assert!(self.items.is_empty());
            self.datas.push_front(Rc::clone(&line.data));
            self.n_lines -= 1;
            // ensure_items rebuilds everything else.
            self.glyphs = None;
            return true;
        }

        let same_source = self
            .data
            .as_ref()
            .is_some_and(|data| Rc::ptr_eq(data, &line.data));
        if same_source && self.line_start_index == line.start_index + line.length {
            let text = &line.data.text;
            let mut recovered: Vec<Item> = Vec::new();

            for item in &self.data_items {
                if item.offset + item.length <= line.start_index {
                    continue;
                }
                if item.offset >= self.line_start_index {
                    break;
                }
                let mut item = item.clone();
                if item.offset < line.start_index {
                    let split_index = line.start_index - item.offset;
                    let split_offset = text[item.offset..line.start_index].chars().count();
                    let _prefix = item.split(split_index, split_offset);
                }
                if item.offset + item.length > self.line_start_index {
                    let split_index = self.line_start_index - item.offset;
                    let split_offset = text[item.offset..self.line_start_index].chars().count();
                    item = item.split(split_index, split_offset);
                }
                recovered.push(item);
            }

            for item in recovered.into_iter().rev() {
                self.items.push_front(item);
            }

            self.n_lines -= 1;
            self.at_paragraph_start = line.starts_paragraph;
            self.line_start_index = line.start_index;
            self.line_start_offset = line.start_offset;
            self.glyphs = None;
            self.start_offset = line.start_offset;
            self.log_widths_offset = 0;

            return true;
        }

        false
    }

    // Source management.

    fn ensure_items(&mut self) {
        if !self.items.is_empty() {
            return;
        }
        if self.data.is_none() {
            self.data = self.datas.pop_front();
        }
        let Some(data) = self.data.clone() else {
            return;
        };

        let mut render_attrs = data.attrs.clone();
        let (itemize_attrs, shape_attrs) = match &mut render_attrs {
            Some(attrs) => {
                let shape = attrs.filter(Attribute::affects_break_or_shape);
                let item = attrs.filter(Attribute::affects_itemization);
                (item, shape)
            }
            None => (None, None),
        };

        let mut items = itemize(
            &self.context,
            data.direction,
            &data.text,
            itemize_attrs.as_ref(),
        );

        if let Some(shape_attrs) = &shape_attrs {
            let mut iter = shape_attrs.iterator();
            for item in &mut items {
                item.apply_attrs(&mut iter);
            }
        }

        self.log_attrs = breaks::compute_log_attrs(&data.text, data.attrs.as_ref());

        debug_assert!(self.data_items.is_empty());
        self.data_items = items.clone();
        self.items = VecDeque::from(items);
        self.render_attrs = render_attrs;

        self.hyphen_width = None;
        self.tab_width = None;

        self.start_offset = 0;
        self.line_start_offset = 0;
        self.line_start_index = 0;

        self.baseline_shifts.clear();
        self.glyphs = None;
        self.log_widths.clear();
        self.log_widths_offset = 0;

        self.remaining_width = -1;
        self.at_paragraph_start = true;
    }

    /// The resolved direction for the next line; always LTR or RTL while
    /// there is input.
    fn resolved_dir(&mut self) -> Direction {
        self.ensure_items();
        let Some(data) = &self.data else {
            return Direction::Neutral;
        };
        // The itemizer resolves the paragraph direction through the same
        // [`Direction::with_gravity`] dance.
        data.direction.resolve().with_gravity(self.context.gravity())
    }

    fn should_ellipsize(&self) -> bool {
        self.line_ellipsize != EllipsizeMode::None && self.line_width >= 0
    }

    fn shape_flags(&self) -> ShapeFlags {
        if self.context.round_glyph_positions() {
            ShapeFlags::ROUND_POSITIONS
        } else {
            ShapeFlags::empty()
        }
    }

    // Cached measurements.

    fn decimal_point(&self) -> char {
        '.'
    }

    fn ensure_tab_width(&mut self) {
        if self.tab_width.is_some() {
            return;
        }
        // Find out how wide 8 spaces are in the current font.
        let data = self.data.clone().expect("tab shaping requires a source");
        let mut font_desc = self.context.font_description().clone();
        let mut language = None;
        if let Some(attrs) = &data.attrs {
            let iter = attrs.iterator();
            iter.get_font(&mut font_desc, &mut language, None);
        }
        let mut tmp_attrs = AttrList::new();
        tmp_attrs.insert_before(Attribute::new(AttrValue::FontDesc(font_desc)));
        if let Some(language) = language {
            tmp_attrs.insert_before(Attribute::new(AttrValue::Language(language)));
        }

        let spaces = "        ";
        let mut tab_width = 0;
        let items = itemize(&self.context, self.context.base_dir(), " ", Some(&tmp_attrs));
        if let Some(mut item) = items.into_iter().next() {
            item.length = spaces.len();
            item.num_chars = spaces.chars().count();
            let log_attrs = breaks::compute_log_attrs(spaces, None);
            let glyphs = self
                .context
                .shaper()
                .shape(spaces, &item, &log_attrs, self.shape_flags());
            tab_width = glyphs.width();
        }
        // Keep tab placement terminating even with a broken font.
        if tab_width <= 0 {
            tab_width = 50 * SCALE;
        }
        self.tab_width = Some(tab_width);
    }

    fn ensure_hyphen_width(&mut self, item: &Item) {
        if self.hyphen_width.is_some() {
            return;
        }
        // Approximate: the break may end up inserting a different hyphen,
        // and the full run should really be reshaped.
        let font = &item.analysis.font;
        let width = font
            .glyph('\u{2010}')
            .or_else(|| font.glyph('-'))
            .map(|glyph| font.glyph_advance(glyph))
            .unwrap_or(0);
        self.hyphen_width = Some(width);
    }

    // Tab handling.

    /// The position of tab stop `index` relative to the line origin, with
    /// its alignment and decimal point. The last flag reports whether the
    /// default (un-set) tab stops were used.
    fn tab_pos(&self, index: usize) -> (i32, TabAlign, Option<char>, bool) {
        let offset = self.line_x;
        let default_width = self.tab_width.unwrap_or(50 * SCALE);
        match &self.tabs {
            Some(tabs) if !tabs.is_empty() => {
                let n = tabs.len();
                let scale = if tabs.positions_in_pixels() { SCALE } else { 1 };
                if index < n {
                    let (align, pos) = tabs.tab(index);
                    (pos * scale - offset, align, tabs.decimal_point(index), false)
                } else {
                    // Extrapolate, repeating the last tab gap to infinity.
                    let (align, last_pos) = tabs.tab(n - 1);
                    let decimal = tabs.decimal_point(n - 1);
                    let next_to_last = if n > 1 { tabs.tab(n - 2).1 } else { 0 };
                    let last_pos = last_pos * scale;
                    let next_to_last = next_to_last * scale;
                    let tab_width = if last_pos > next_to_last {
                        last_pos - next_to_last
                    } else {
                        default_width
                    };
                    let pos = last_pos + tab_width * (index - n + 1) as i32;
                    (pos - offset, align, decimal, false)
                }
            }
            _ => (
                default_width * index as i32 - offset,
                TabAlign::Left,
                None,
                true,
            ),
        }
    }

    fn shape_tab(&mut self, line: &Line, current_width: i32, _item: &Item) -> GlyphString {
        let mut glyphs = GlyphString::new();
        glyphs.set_size(1);
        glyphs.glyphs[0].glyph = if self.properties.showing_space {
            Glyph::unknown('\t')
        } else {
            Glyph::EMPTY
        };
        glyphs.log_clusters[0] = 0;

        self.ensure_tab_width();
        let space_width = self.tab_width.expect("just ensured") / 8;

        let mut index = self.last_tab.as_ref().map_or(0, |tab| tab.index);
        let (tab_pos, tab_align, tab_decimal) = loop {
            let (pos, align, decimal, is_default) = self.tab_pos(index);
            // Leave at least a space-width between tab-aligned text and the
            // text before it, but only for default stops; explicit stops
            // are respected to the pixel.
            let margin = if is_default { space_width } else { 1 };
            if pos >= current_width + margin {
                glyphs.glyphs[0].geometry.width = pos - current_width;
                break (pos, align, decimal);
            }
            index += 1;
        };

        self.last_tab = Some(LastTab {
            run_index: line.runs.len(),
            index,
            width: current_width,
            pos: tab_pos,
            align: tab_align,
            decimal: tab_decimal.unwrap_or_else(|| self.decimal_point()),
        });

        glyphs
    }

    /// How much the pending tab's width has drifted since it was budgeted
    /// against `remaining_width`. Shaping updates the tab's glyph, so exact
    /// measurements must account for the difference.
    fn tab_width_change(&self, line: &Line) -> i32 {
        if let Some(tab) = &self.last_tab {
            if let Some(run) = line.runs.get(tab.run_index) {
                return run.glyphs.glyphs[0].geometry.width - (tab.pos - tab.width);
            }
        }
        0
    }

    // Run shaping.

    fn line_width_so_far(&self, line: &Line) -> i32 {
        if self.remaining_width > -1 {
            return self.line_width - self.remaining_width;
        }
        line.width()
    }

    /// Shapes `item` against the current line state. For tabs this
    /// stretches a single glyph to the next stop; for everything else it
    /// invokes the shaper, applies letter spacing, and updates the pending
    /// tab for the would-be placement of this run.
    fn shape_run(&mut self, line: &mut Line, item: &Item) -> GlyphString {
        let data = self.data.clone().expect("shaping requires a source");
        if data.text.as_bytes().get(item.offset) == Some(&b'\t') {
            let current_width = self.line_width_so_far(line);
            return self.shape_tab(line, current_width, item);
        }

        let mut glyphs = if let Some(shape) = self.properties.shape.clone() {
            let item_text = &data.text[item.offset..item.offset + item.length];
            shape_placeholder(item_text, shape.logical_rect.width)
        } else {
            self.context.shaper().shape(
                &data.text,
                item,
                &self.log_attrs[self.start_offset..],
                self.shape_flags(),
            )
        };

        if self.properties.letter_spacing != 0 && !glyphs.glyphs.is_empty() {
            let item_text = &data.text[item.offset..item.offset + item.length];
            glyphs.letter_space(
                item_text,
                item.analysis.is_rtl(),
                &self.log_attrs[self.start_offset..],
                self.properties.letter_spacing,
            );

            let (space_left, space_right) =
                distribute_letter_spacing(self.properties.letter_spacing);
            let first = glyphs.glyphs.first_mut().expect("non-empty");
            first.geometry.width += space_left;
            first.geometry.x_offset += space_left;
            let last = glyphs.glyphs.last_mut().expect("non-empty");
            last.geometry.width += space_right;
        }

        // Update the width of the pending tab to position this run.
        if let Some(tab) = self.last_tab.clone() {
            if line.runs.get(tab.run_index).is_some() {
                let mut width = tab.pos - tab.width;
                match tab.align {
                    TabAlign::Left => {}
                    TabAlign::Right => width -= glyphs.width(),
                    TabAlign::Center => width -= glyphs.width() / 2,
                    TabAlign::Decimal => {
                        let (prefix, _found) =
                            decimal_prefix_width(item, &glyphs, &data.text, tab.decimal);
                        width -= prefix;
                    }
                }
                line.runs[tab.run_index].glyphs.glyphs[0].geometry.width = width.max(0);
            }
        }

        glyphs
    }

    /// Appends a run for `run_item` to the line. `glyphs` may carry
    /// already-measured glyphs; otherwise the cached head-item glyphs are
    /// reused when valid, or the item is reshaped.
    fn insert_run(
        &mut self,
        line: &mut Line,
        run_item: Item,
        glyphs: Option<GlyphString>,
        last_run: bool,
    ) {
        let data = self.data.clone().expect("inserting requires a source");
        let glyphs = match glyphs {
            Some(glyphs) => glyphs,
            None => {
                if last_run
                    && self.log_widths_offset == 0
                    && !run_item.analysis.flags.contains(AnalysisFlags::NEED_HYPHEN)
                    && self.glyphs.is_some()
                {
                    self.glyphs.take().expect("just checked")
                } else {
                    self.shape_run(line, &run_item)
                }
            }
        };
        if last_run {
            self.glyphs = None;
        }

        line.length += run_item.length;
        line.runs.push(GlyphItem::new(run_item, glyphs));
        let new_index = line.runs.len() - 1;

        if let Some(tab) = self.last_tab.clone() {
            if tab.run_index != new_index {
                // Adjust the tab so further runs keep the alignment; a
                // decimal tab is done once the run with the point landed.
                let run = &line.runs[new_index];
                let mut found_decimal = false;
                let consumed = match tab.align {
                    TabAlign::Left => 0,
                    TabAlign::Right => run.glyphs.width(),
                    TabAlign::Center => run.glyphs.width() / 2,
                    TabAlign::Decimal => {
                        let (width, found) =
                            decimal_prefix_width(&run.item, &run.glyphs, &data.text, tab.decimal);
                        found_decimal = found;
                        width
                    }
                };
                let tab_state = self.last_tab.as_mut().expect("just cloned");
                tab_state.width += consumed;
                let width = (tab_state.pos - tab_state.width).max(0);
                line.runs[tab.run_index].glyphs.glyphs[0].geometry.width = width;
                if found_decimal || width == 0 {
                    self.last_tab = None;
                }
            }
        }
    }

    // Break queries.

    fn can_break_at(&self, offset: usize, wrap: WrapMode) -> bool {
        let data = self.data.as_ref().expect("breaking requires a source");
        if offset == data.n_chars {
            return true;
        }
        if wrap == WrapMode::Char {
            self.log_attrs[offset].contains(LogAttr::CHAR_BREAK)
        } else {
            self.log_attrs[offset].contains(LogAttr::LINE_BREAK)
        }
    }

    fn can_break_in(
        &self,
        start_offset: usize,
        num_chars: usize,
        allow_break_at_start: bool,
    ) -> bool {
        let start = if allow_break_at_start { 0 } else { 1 };
        (start..num_chars).any(|i| self.can_break_at(start_offset + i, self.line_wrap))
    }

    fn break_needs_hyphen(&self, pos: usize) -> bool {
        self.log_attrs[self.start_offset + pos]
            .intersects(LogAttr::BREAK_INSERTS_HYPHEN | LogAttr::BREAK_REMOVES_PRECEDING)
    }

    /// Width adjustment for breaking after `pos` chars of the head item:
    /// an inserted hyphen adds width, a collapsed trailing space removes
    /// it.
    fn find_break_extra_width(&mut self, item: &Item, pos: usize) -> i32 {
        let attrs = self.log_attrs[self.start_offset + pos];
        if attrs.contains(LogAttr::BREAK_INSERTS_HYPHEN) {
            self.ensure_hyphen_width(item);
            let hyphen_width = self.hyphen_width.expect("just ensured");
            if attrs.contains(LogAttr::BREAK_REMOVES_PRECEDING) && pos > 0 {
                return hyphen_width - self.log_widths[self.log_widths_offset + pos - 1];
            }
            return hyphen_width;
        }
        if pos > 0 && self.log_attrs[self.start_offset + pos - 1].contains(LogAttr::WHITE) {
            return -self.log_widths[self.log_widths_offset + pos - 1];
        }
        0
    }

    fn compute_log_widths(&mut self, item: &Item) {
        let data = self.data.clone().expect("measuring requires a source");
        debug_assert_eq!(self.log_widths_offset, 0);
        if self.log_widths.len() < item.num_chars {
            self.log_widths.resize(item.num_chars, 0);
        }
        let item_text = &data.text[item.offset..item.offset + item.length];
        self.glyphs
            .as_ref()
            .expect("head item is shaped")
            .logical_widths(
                item_text,
                item.analysis.is_rtl(),
                &mut self.log_widths[..item.num_chars],
            );
    }

    // The line-breaking core.

    /// Tries to place as much as possible of the head item onto `line`.
    ///
    /// With `force_fit`, [`BreakResult::NoneFit`] is never returned: a run
    /// is added even if the minimum overflows the line. With
    /// `no_break_at_end`, [`BreakResult::AllFit`] is never returned, since
    /// the end of the item is known not to be a break position.
    fn process_item(
        &mut self,
        line: &mut Line,
        force_fit: bool,
        no_break_at_end: bool,
        is_last_item: bool,
    ) -> BreakResult {
        let data = self.data.clone().expect("processing requires a source");
        let mut item = self.items.pop_front().expect("head item exists");

        // Shape once per item; partially-consumed items advance
        // log_widths_offset instead of reshaping. The widths derived from
        // log_widths are approximate: clusters are divided evenly, and
        // cluster formation can change when breaking mid-item.
        let mut processing_new_item = false;
        if self.glyphs.is_none() {
            self.properties = ItemProperties::from_item(&item);
            let glyphs = self.shape_run(line, &item);
            self.glyphs = Some(glyphs);
            self.log_widths_offset = 0;
            processing_new_item = true;
        }

        let first_char = data.text[item.offset..].chars().next();

        if !self.properties.no_paragraph_break
            && matches!(first_char, Some('\n' | '\r' | '\u{2029}'))
        {
            self.glyphs = None;
            return BreakResult::ParagraphSeparator {
                length: item.length,
                num_chars: item.num_chars,
            };
        }

        if first_char == Some('\u{2028}') && !self.should_ellipsize() {
            let num_chars = item.num_chars;
            self.insert_run(line, item, None, true);
            self.log_widths_offset += num_chars;
            return BreakResult::LineSeparator;
        }

        if self.remaining_width < 0 && !no_break_at_end {
            // Wrapping is off.
            self.insert_run(line, item, None, true);
            trace!("no wrapping, all-fit");
            return BreakResult::AllFit;
        }

        if processing_new_item {
            self.compute_log_widths(&item);
            processing_new_item = false;
        }

        let mut width: i32 = self.log_widths
            [self.log_widths_offset..self.log_widths_offset + item.num_chars]
            .iter()
            .sum();

        if data.text.as_bytes()[item.offset] == b'\t' {
            self.insert_run(line, item, None, true);
            self.remaining_width = (self.remaining_width - width).max(0);
            trace!("tab run, all-fit");
            return BreakResult::AllFit;
        }

        let mut wrap = self.line_wrap;
        let extra_width = if !no_break_at_end
            && self.can_break_at(self.start_offset + item.num_chars, wrap)
        {
            self.find_break_extra_width(&item, item.num_chars)
        } else {
            0
        };

        let tab_forces_measure = self
            .last_tab
            .as_ref()
            .is_some_and(|tab| tab.align != TabAlign::Left);
        if (width + extra_width <= self.remaining_width
            || (item.num_chars == 1 && line.runs.is_empty())
            || tab_forces_measure)
            && !no_break_at_end
        {
            // Looks like it fits; measure exactly.
            let glyphs = self.shape_run(line, &item);
            width = glyphs.width() + self.tab_width_change(line);

            if width + extra_width <= self.remaining_width
                || (item.num_chars == 1 && line.runs.is_empty())
            {
                self.insert_run(line, item, Some(glyphs), true);
                self.remaining_width = (self.remaining_width - width).max(0);
                trace!(remaining = self.remaining_width, "early accept, all-fit");
                return BreakResult::AllFit;
            }
            // Did not fit after shaping: look for a break in the item.
        }

        let orig_width = width;
        let orig_extra_width = extra_width;
        let mut break_width = width;
        let mut break_extra_width = extra_width;
        let mut break_num_chars = item.num_chars;
        let mut break_glyphs: Option<GlyphString> = None;

        // Breakpoints farther from the end of the line than this are not
        // examined closely.
        let metrics = item.analysis.font.metrics(item.analysis.language);
        let safe_distance = metrics.approximate_char_width * 3;

        if processing_new_item {
            self.compute_log_widths(&item);
        }

        loop {
            let limit = if no_break_at_end {
                item.num_chars
            } else {
                item.num_chars + 1
            };
            let mut width: i32 = 0;
            let mut num_chars = 0;
            while num_chars < limit {
                let mut extra_width = self.find_break_extra_width(&item, num_chars);

                // MIN(width, width + extra_width) is monotonically
                // increasing, so once past the budget with a break in hand
                // there is no point continuing.
                if width.min(width + extra_width) > self.remaining_width + safe_distance
                    && break_num_chars < item.num_chars
                {
                    break;
                }

                // With no previous runs the line must take at least one
                // char.
                if self.can_break_at(self.start_offset + num_chars, wrap)
                    && (num_chars > 0 || !line.runs.is_empty())
                {
                    if num_chars == 0
                        || width + extra_width < self.remaining_width - safe_distance
                    {
                        // Obviously fits.
                        break_num_chars = num_chars;
                        break_width = width;
                        break_extra_width = extra_width;
                    } else {
                        let length =
                            byte_offset_of_chars(&data.text, item.offset, num_chars)
                                - item.offset;

                        let splitting = num_chars < item.num_chars;
                        let glyphs;
                        if splitting {
                            let mut prefix = item.split(length, num_chars);
                            if self.break_needs_hyphen(num_chars) {
                                prefix.analysis.flags |= AnalysisFlags::NEED_HYPHEN;
                            } else {
                                prefix.analysis.flags &= !AnalysisFlags::NEED_HYPHEN;
                            }
                            glyphs = self.shape_run(line, &prefix);
                            item.unsplit(length, num_chars);
                        } else {
                            glyphs = self.shape_run(line, &item);
                        }
                        let new_break_width = glyphs.width() + self.tab_width_change(line);

                        if num_chars > 0
                            && (splitting || !is_last_item)
                            && self.log_attrs[self.start_offset + num_chars - 1]
                                .contains(LogAttr::WHITE)
                        {
                            // Space collapses at the line end.
                            extra_width =
                                -self.log_widths[self.log_widths_offset + num_chars - 1];
                        } else if !splitting
                            && !is_last_item
                            && self.break_needs_hyphen(num_chars)
                        {
                            extra_width = self.hyphen_width.unwrap_or(0);
                        } else {
                            extra_width = 0;
                        }

                        if break_num_chars == item.num_chars
                            || new_break_width + extra_width <= self.remaining_width
                            || new_break_width + extra_width < break_width + break_extra_width
                        {
                            break_num_chars = num_chars;
                            break_width = new_break_width;
                            break_extra_width = extra_width;
                            break_glyphs = Some(glyphs);
                        }
                    }
                }

                if num_chars < item.num_chars {
                    width += self.log_widths[self.log_widths_offset + num_chars];
                }
                num_chars += 1;
            }

            if wrap == WrapMode::WordChar
                && force_fit
                && break_width + break_extra_width > self.remaining_width
            {
                // Retry with looser conditions.
                trace!("does not fit, retry with char wrapping");
                wrap = WrapMode::Char;
                break_num_chars = item.num_chars;
                break_width = orig_width;
                break_extra_width = orig_extra_width;
                break_glyphs = None;
                continue;
            }
            break;
        }

        if force_fit || break_width + break_extra_width <= self.remaining_width {
            // Successfully broke the item.
            if self.remaining_width >= 0 {
                self.remaining_width -= break_width + break_extra_width;
                self.remaining_width = self.remaining_width.max(0);
            }

            if break_num_chars == item.num_chars {
                if self.can_break_at(self.start_offset + break_num_chars, wrap)
                    && self.break_needs_hyphen(break_num_chars)
                {
                    item.analysis.flags |= AnalysisFlags::NEED_HYPHEN;
                }
                self.insert_run(line, item, None, true);
                trace!(remaining = self.remaining_width, "all-fit");
                BreakResult::AllFit
            } else if break_num_chars == 0 {
                self.items.push_front(item);
                trace!(remaining = self.remaining_width, "empty-fit");
                BreakResult::EmptyFit
            } else {
                let length =
                    byte_offset_of_chars(&data.text, item.offset, break_num_chars) - item.offset;
                let prefix = item.split(length, break_num_chars);
                self.insert_run(line, prefix, break_glyphs, false);
                self.log_widths_offset += break_num_chars;
                self.items.push_front(item);
                trace!(remaining = self.remaining_width, "some-fit");
                BreakResult::SomeFit
            }
        } else {
            self.glyphs = None;
            self.items.push_front(item);
            trace!(remaining = self.remaining_width, "none-fit");
            BreakResult::NoneFit
        }
    }

    /// Assembles one line by processing head items until it wraps or the
    /// input runs out.
    fn process_line(&mut self, line: &mut Line) {
        let data = self.data.clone().expect("processing requires a source");
        let mut have_break: Option<BreakState> = None;
        let mut wrapped = false;

        while !self.items.is_empty() {
            let head = self.items.front().expect("loop condition");
            let old_num_chars = head.num_chars;
            let old_offset = head.offset;
            let old_remaining_width = self.remaining_width;
            let first_item_in_line = line.runs.is_empty();
            let last_item_in_line = self.items.len() == 1;
            let break_start_offset = self.start_offset;

            let result = self.process_item(line, have_break.is_none(), false, last_item_in_line);

            match result {
                BreakResult::AllFit => {
                    if data.text.as_bytes()[old_offset] != b'\t'
                        && self.can_break_in(break_start_offset, old_num_chars, !first_item_in_line)
                    {
                        have_break = Some(BreakState {
                            remaining_width: old_remaining_width,
                            start_offset: break_start_offset,
                            runs_len: line.runs.len() - 1,
                        });
                    }
                    self.start_offset += old_num_chars;
                }
                BreakResult::EmptyFit => {
                    wrapped = true;
                    break;
                }
                BreakResult::SomeFit => {
                    let head_num_chars = self.items.front().expect("suffix is queued").num_chars;
                    self.start_offset += old_num_chars - head_num_chars;
                    wrapped = true;
                    break;
                }
                BreakResult::NoneFit => {
                    let break_state = have_break.take().expect("NoneFit implies a break");

                    // Back out the runs past the break.
                    while line.runs.len() > break_state.runs_len {
                        if self
                            .last_tab
                            .as_ref()
                            .is_some_and(|tab| tab.run_index == line.runs.len() - 1)
                        {
                            self.last_tab = None;
                        }
                        let run = line.runs.pop().expect("loop condition");
                        line.length -= run.item.length;
                        self.items.push_front(run.item);
                    }

                    self.start_offset = break_state.start_offset;
                    self.remaining_width = break_state.remaining_width;
                    let last_item_in_line = self.items.len() == 1;

                    // Reprocess the break-holding item, forcing a split.
                    let old_num_chars = self.items.front().expect("items restored").num_chars;
                    let result = self.process_item(line, true, true, last_item_in_line);
                    debug_assert!(matches!(
                        result,
                        BreakResult::SomeFit | BreakResult::EmptyFit
                    ));
                    let head_num_chars = self.items.front().expect("head remains").num_chars;
                    self.start_offset += old_num_chars - head_num_chars;

                    wrapped = true;
                    break;
                }
                BreakResult::LineSeparator => {
                    self.start_offset += old_num_chars;
                    // A line separator is a forced break; mark the line
                    // wrapped so justification may still apply.
                    wrapped = true;
                    break;
                }
                BreakResult::ParagraphSeparator { length, num_chars } => {
                    // The separator produces no run, but the next line must
                    // start after it.
                    line.ends_paragraph = true;
                    self.line_start_index += length;
                    self.start_offset += num_chars;
                    break;
                }
            }
        }

        line.wrapped = wrapped;
    }

    // Post-processing.

    /// The natural end of the line may sit at a hyphen-inserting break even
    /// though the last run fit without being split; reshape it with the
    /// hyphen if so.
    fn add_missing_hyphen(&mut self, line: &mut Line) {
        if line.runs.is_empty() {
            return;
        }
        let last = line.runs.len() - 1;
        let item_num_chars = line.runs[last].item.num_chars;

        if self.log_attrs[self.line_start_offset + line.n_chars]
            .contains(LogAttr::BREAK_INSERTS_HYPHEN)
            && !line.runs[last]
                .item
                .analysis
                .flags
                .contains(AnalysisFlags::NEED_HYPHEN)
        {
            trace!("adding missing hyphen");
            let old_width = line.runs[last].glyphs.width();

            // shape_run consults start_offset for the log attrs, so rewind
            // it to the state before this run was inserted.
            let saved_offset = self.start_offset;
            self.start_offset = self.line_start_offset + line.n_chars - item_num_chars;

            line.runs[last].item.analysis.flags |= AnalysisFlags::NEED_HYPHEN;
            let item = line.runs[last].item.clone();
            let glyphs = self.shape_run(line, &item);
            line.runs[last].glyphs = glyphs;

            self.start_offset = saved_offset;
            self.remaining_width += line.runs[last].glyphs.width() - old_width;
        }

        line.hyphenated = line.runs[last]
            .item
            .analysis
            .flags
            .contains(AnalysisFlags::NEED_HYPHEN);
    }

    /// Zeroes the width of a trailing space the line was wrapped at.
    fn zero_line_final_space(&mut self, line: &mut Line) {
        let Some(run) = line.runs.last_mut() else {
            return;
        };
        let rtl = run.item.analysis.is_rtl();
        let glyphs = &mut run.glyphs;
        if glyphs.glyphs.is_empty() {
            return;
        }
        let glyph = if rtl { 0 } else { glyphs.glyphs.len() - 1 };

        if glyphs.glyphs[glyph].glyph == Glyph::unknown('\u{2028}') {
            return; // visible line separator
        }

        if self.start_offset == 0
            || !self.log_attrs[self.start_offset - 1].contains(LogAttr::WHITE)
        {
            return;
        }

        if glyphs.glyphs.len() >= 2 {
            let neighbor = if rtl { glyph + 1 } else { glyph - 1 };
            if glyphs.log_clusters[glyph] == glyphs.log_clusters[neighbor] {
                // The space joined a cluster; leave it alone.
                return;
            }
        }

        glyphs.glyphs[glyph].geometry.width = 0;
        glyphs.glyphs[glyph].glyph = Glyph::EMPTY;
    }

    /// Offsets from rise and baseline-shift attributes for one run, as
    /// `(start_x, start_y, end_x, end_y)`.
    fn collect_baseline_shift(
        &mut self,
        item: &Item,
        prev: Option<&Item>,
    ) -> (i32, i32, i32, i32) {
        let mut start_x_offset = 0;
        let mut start_y_offset = 0;
        let mut end_x_offset = 0;
        let mut end_y_offset = 0;

        for attr in &item.analysis.extra_attrs {
            match attr.value {
                AttrValue::Rise(value) => {
                    start_y_offset += value;
                    end_y_offset -= value;
                }
                AttrValue::BaselineShift(value) => {
                    if attr.start_index as usize == item.offset {
                        let mut entry = BaselineEntry {
                            start_index: attr.start_index,
                            end_index: attr.end_index,
                            value,
                            x_offset: 0,
                            y_offset: 0,
                        };

                        if !(-SCALE..=SCALE).contains(&value) {
                            entry.y_offset = value;
                        } else {
                            let shifts = prev
                                .map(|p| p.analysis.font.baseline_shifts())
                                .unwrap_or_default();
                            let superscript_y = if shifts.superscript_y_offset == 0 {
                                5000
                            } else {
                                shifts.superscript_y_offset
                            };
                            let subscript_y = if shifts.subscript_y_offset == 0 {
                                5000
                            } else {
                                shifts.subscript_y_offset
                            };
                            match value {
                                baseline_shift::SUPERSCRIPT => {
                                    entry.x_offset = shifts.superscript_x_offset;
                                    entry.y_offset = superscript_y;
                                }
                                baseline_shift::SUBSCRIPT => {
                                    entry.x_offset = shifts.subscript_x_offset;
                                    entry.y_offset = -subscript_y;
                                }
                                _ => {}
                            }
                        }

                        start_x_offset += entry.x_offset;
                        start_y_offset += entry.y_offset;
                        self.baseline_shifts.push(entry);
                    }

                    if attr.end_index as usize == item.offset + item.length {
                        match self.baseline_shifts.pop() {
                            Some(entry)
                                if entry.start_index == attr.start_index
                                    && entry.end_index == attr.end_index
                                    && entry.value == value =>
                            {
                                end_x_offset -= entry.x_offset;
                                end_y_offset -= entry.y_offset;
                            }
                            _ => warn!("baseline attributes mismatch"),
                        }
                    }
                }
                _ => {}
            }
        }

        (start_x_offset, start_y_offset, end_x_offset, end_y_offset)
    }

    fn apply_baseline_shift(&mut self, line: &mut Line) {
        let mut offsets = Vec::with_capacity(line.runs.len());
        {
            let mut baseline_tag: Option<BaselineTag> = None;
            let mut line_baseline = 0;
            let mut prev_index: Option<usize> = None;
            for i in 0..line.runs.len() {
                let item = line.runs[i].item.clone();
                let prev = prev_index.map(|p| line.runs[p].item.clone());

                let centered = item
                    .analysis
                    .flags
                    .contains(AnalysisFlags::CENTERED_BASELINE);
                let tag = *baseline_tag.get_or_insert_with(|| {
                    if centered {
                        BaselineTag::IdeoEmboxCentral
                    } else {
                        BaselineTag::for_script(item.analysis.script)
                    }
                });
                // Vertical runs do their own baseline shifting downstream.
                let baseline_adjustment =
                    match item.analysis.font.baseline(tag, item.analysis.script) {
                        Some(run_baseline) if !centered => {
                            if prev_index.is_none() {
                                line_baseline = run_baseline;
                            }
                            line_baseline - run_baseline
                        }
                        _ => 0,
                    };

                let shifts = self.collect_baseline_shift(&item, prev.as_ref());
                offsets.push((shifts, baseline_adjustment));
                prev_index = Some(i);
            }
        }

        let mut y_offset = 0;
        for (run, ((start_x, start_y, end_x, end_y), adjustment)) in
            line.runs.iter_mut().zip(offsets)
        {
            y_offset += start_y + adjustment;
            run.y_offset = y_offset;
            run.start_x_offset = start_x;
            run.end_x_offset = end_x;
            y_offset += end_y - adjustment;
        }
    }

    fn pad_glyphstring_right(&mut self, glyphs: &mut GlyphString, adjustment: i32) {
        let Some(glyph) = glyphs
            .glyphs
            .iter()
            .rposition(|g| g.geometry.width != 0)
        else {
            return;
        };
        self.remaining_width -= adjustment;
        glyphs.glyphs[glyph].geometry.width += adjustment;
        if glyphs.glyphs[glyph].geometry.width < 0 {
            self.remaining_width += glyphs.glyphs[glyph].geometry.width;
            glyphs.glyphs[glyph].geometry.width = 0;
        }
    }

    fn pad_glyphstring_left(&mut self, glyphs: &mut GlyphString, adjustment: i32) {
        let Some(glyph) = glyphs.glyphs.iter().position(|g| g.geometry.width != 0) else {
            return;
        };
        self.remaining_width -= adjustment;
        glyphs.glyphs[glyph].geometry.width += adjustment;
        glyphs.glyphs[glyph].geometry.x_offset += adjustment;
    }

    /// Shaping spreads letter spacing after every grapheme, which is
    /// visually asymmetric. Redistribute it between run edges, and trim it
    /// at line edges and around tabs, accumulating the trimmed space onto
    /// the following tab so alignment holds.
    fn adjust_line_letter_spacing(&mut self, line: &mut Line) {
        let data = self.data.clone().expect("post-processing requires a source");
        let text = &data.text;

        // With tab stops on an RTL line, walk visually so the tab
        // corrections follow the flow.
        let mut reversed = false;
        if line.direction == Direction::Rtl
            && line.runs.iter().any(|run| is_tab_run(text, run))
        {
            line.runs.reverse();
            reversed = true;
        }

        let mut tab_adjustment = 0;
        for i in 0..line.runs.len() {
            if is_tab_run(text, &line.runs[i]) {
                let mut glyphs = std::mem::take(&mut line.runs[i].glyphs);
                self.pad_glyphstring_right(&mut glyphs, tab_adjustment);
                line.runs[i].glyphs = glyphs;
                tab_adjustment = 0;
                continue;
            }

            let visual_last_is_edge = if reversed {
                i + 1 >= line.runs.len() || is_tab_run(text, &line.runs[i + 1])
            } else {
                i == 0 || is_tab_run(text, &line.runs[i - 1])
            };
            let visual_next_is_edge = if reversed {
                i == 0 || is_tab_run(text, &line.runs[i - 1])
            } else {
                i + 1 >= line.runs.len() || is_tab_run(text, &line.runs[i + 1])
            };

            let run_spacing = ItemProperties::from_item(&line.runs[i].item).letter_spacing;
            let (space_left, space_right) = distribute_letter_spacing(run_spacing);

            let mut glyphs = std::mem::take(&mut line.runs[i].glyphs);
            if glyphs.glyphs.is_empty() {
                line.runs[i].glyphs = glyphs;
                continue;
            }

            if glyphs.glyphs[0].geometry.width == 0 {
                // A zeroed space at the line edge; strip the spacing that
                // was added against it.
                self.pad_glyphstring_left(&mut glyphs, -space_left);
            } else if visual_last_is_edge {
                self.pad_glyphstring_left(&mut glyphs, -space_left);
                tab_adjustment += space_left;
            }

            if glyphs.glyphs[glyphs.glyphs.len() - 1].geometry.width == 0 {
                self.pad_glyphstring_right(&mut glyphs, -space_right);
            } else if visual_next_is_edge {
                self.pad_glyphstring_right(&mut glyphs, -space_right);
                tab_adjustment += space_right;
            }

            line.runs[i].glyphs = glyphs;
        }

        if reversed {
            line.runs.reverse();
        }
    }

    /// Reapplies the rendering-only attributes, splitting runs at their
    /// boundaries.
    fn apply_render_attributes(&mut self, line: &mut Line) {
        let Some(render_attrs) = self.render_attrs.clone() else {
            return;
        };
        if render_attrs.is_empty() {
            return;
        }
        let data = self.data.clone().expect("post-processing requires a source");
        let runs = std::mem::take(&mut line.runs);
        for run in runs {
            line.runs.extend(run.apply_attrs(&data.text, &render_attrs));
        }
    }

    fn postprocess_line(&mut self, line: &mut Line) {
        self.add_missing_hyphen(line);

        // Truncate the logically-final whitespace if the line broke at it.
        if line.wrapped {
            self.zero_line_final_space(line);
        }

        self.apply_baseline_shift(line);

        if self.should_ellipsize() {
            line::ellipsize(line, &self.context, self.line_ellipsize, self.line_width);
        }

        line.reorder();

        self.adjust_line_letter_spacing(line);

        self.apply_render_attributes(line);
    }
}

fn is_tab_run(text: &str, run: &GlyphItem) -> bool {
    !run.item
        .analysis
        .flags
        .contains(AnalysisFlags::IS_ELLIPSIS)
        && text.as_bytes().get(run.item.offset) == Some(&b'\t')
        && run.item.length > 0
}

/// Byte offset of the character `n` characters after `start`.
fn byte_offset_of_chars(text: &str, start: usize, n: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| start + i)
        .unwrap_or(text.len())
}

/// Glyphs for a shape attribute: every character covers the logical
/// rectangle.
fn shape_placeholder(item_text: &str, logical_width: i32) -> GlyphString {
    let mut glyphs = GlyphString::new();
    glyphs.set_size(item_text.chars().count());
    for glyph in &mut glyphs.glyphs {
        glyph.glyph = Glyph::EMPTY;
        glyph.geometry.width = logical_width;
    }
    for (slot, (byte, _)) in glyphs.log_clusters.iter_mut().zip(item_text.char_indices()) {
        *slot = byte as i32;
    }
    glyphs
}

/// Width of the part of a run before its decimal point (the point itself
/// counting half), and whether the point was found.
fn decimal_prefix_width(
    item: &Item,
    glyphs: &GlyphString,
    text: &str,
    decimal: char,
) -> (i32, bool) {
    let item_text = &text[item.offset..item.offset + item.length];
    let mut widths = vec![0; item.num_chars];
    glyphs.logical_widths(item_text, item.analysis.is_rtl(), &mut widths);

    let mut width = 0;
    for (i, c) in item_text.chars().enumerate() {
        if c == decimal {
            return (width + widths[i] / 2, true);
        }
        width += widths[i];
    }
    (width, false)
}
