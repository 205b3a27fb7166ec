// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Global state for itemization and layout.

use std::rc::Rc;

use crate::font::{FontDescription, FontMap};
use crate::glyph::Shaper;
use crate::types::{Direction, Gravity, GravityHint, Language};

/// Shared state consulted during itemization and line breaking: the font
/// map and shaper collaborators, plus defaults for everything an attribute
/// can override.
#[derive(Clone)]
pub struct Context {
    font_map: Rc<dyn FontMap>,
    shaper: Rc<dyn Shaper>,
    font_description: FontDescription,
    language: Language,
    base_dir: Direction,
    base_gravity: Gravity,
    gravity_hint: GravityHint,
    round_glyph_positions: bool,
}

impl Context {
    pub fn new(font_map: Rc<dyn FontMap>, shaper: Rc<dyn Shaper>) -> Self {
        let mut font_description = FontDescription::new();
        font_description.set_family("sans-serif");
        font_description.set_size(12 * crate::types::SCALE);
        Self {
            font_map,
            shaper,
            font_description,
            language: Language::default(),
            base_dir: Direction::WeakLtr,
            base_gravity: Gravity::South,
            gravity_hint: GravityHint::Natural,
            round_glyph_positions: true,
        }
    }

    pub fn font_map(&self) -> &Rc<dyn FontMap> {
        &self.font_map
    }

    pub fn shaper(&self) -> &Rc<dyn Shaper> {
        &self.shaper
    }

    pub fn font_description(&self) -> &FontDescription {
        &self.font_description
    }

    pub fn set_font_description(&mut self, description: FontDescription) {
        self.font_description = description;
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn base_dir(&self) -> Direction {
        self.base_dir
    }

    pub fn set_base_dir(&mut self, direction: Direction) {
        self.base_dir = direction;
    }

    pub fn base_gravity(&self) -> Gravity {
        self.base_gravity
    }

    pub fn set_base_gravity(&mut self, gravity: Gravity) {
        self.base_gravity = gravity;
    }

    /// The gravity to use for text, with [`Gravity::Auto`] resolved.
    pub fn gravity(&self) -> Gravity {
        self.base_gravity.resolve(Gravity::South)
    }

    pub fn gravity_hint(&self) -> GravityHint {
        self.gravity_hint
    }

    pub fn set_gravity_hint(&mut self, hint: GravityHint) {
        self.gravity_hint = hint;
    }

    pub fn round_glyph_positions(&self) -> bool {
        self.round_glyph_positions
    }

    pub fn set_round_glyph_positions(&mut self, round: bool) {
        self.round_glyph_positions = round;
    }
}
