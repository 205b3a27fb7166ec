// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tab stops with alignment.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// How text is positioned relative to a tab stop.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum TabAlign {
    /// Text appears to the right of the stop.
    #[default]
    Left,
    /// The stop is to the right of the text.
    Right,
    /// Text is centered at the stop.
    Center,
    /// Text is aligned so the first occurrence of the decimal point
    /// character appears at the stop.
    Decimal,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
struct Tab {
    location: i32,
    alignment: TabAlign,
    /// Decimal point for [`TabAlign::Decimal`]; `None` selects the
    /// conventional default.
    decimal_point: Option<char>,
}

/// An ordered set of tab stops.
///
/// Positions are in units unless `positions_in_pixels` is set, in which case
/// they are device units.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TabArray {
    tabs: Vec<Tab>,
    positions_in_pixels: bool,
}

/// Failure to parse a [`TabArray`] from its string form.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseTabArrayError {
    #[error("tab position is not a nonnegative integer")]
    InvalidPosition,
    #[error("tab arrays cannot mix pixel and unit positions")]
    MixedUnits,
    #[error("invalid decimal point codepoint")]
    InvalidDecimalPoint,
    #[error("unexpected trailing input")]
    TrailingInput,
}

impl TabArray {
    /// Creates an array of `size` left-aligned stops at position 0.
    pub fn new(size: usize, positions_in_pixels: bool) -> Self {
        Self {
            tabs: vec![Tab::default(); size],
            positions_in_pixels,
        }
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn positions_in_pixels(&self) -> bool {
        self.positions_in_pixels
    }

    pub fn set_positions_in_pixels(&mut self, in_pixels: bool) {
        self.positions_in_pixels = in_pixels;
    }

    /// Resizes the array. New stops are left-aligned at position 0.
    pub fn resize(&mut self, size: usize) {
        self.tabs.resize(size, Tab::default());
    }

    /// Sets the stop at `index`, growing the array as needed.
    pub fn set_tab(&mut self, index: usize, alignment: TabAlign, location: i32) {
        if index >= self.tabs.len() {
            self.resize(index + 1);
        }
        self.tabs[index].alignment = alignment;
        self.tabs[index].location = location;
    }

    /// The alignment and location of the stop at `index`.
    pub fn tab(&self, index: usize) -> (TabAlign, i32) {
        let tab = &self.tabs[index];
        (tab.alignment, tab.location)
    }

    /// Sets the decimal point character for the stop at `index`, growing
    /// the array as needed.
    pub fn set_decimal_point(&mut self, index: usize, decimal_point: Option<char>) {
        if index >= self.tabs.len() {
            self.resize(index + 1);
        }
        self.tabs[index].decimal_point = decimal_point;
    }

    pub fn decimal_point(&self, index: usize) -> Option<char> {
        self.tabs[index].decimal_point
    }

    /// Sorts the stops by location, keeping the order of equal locations.
    pub fn sort(&mut self) {
        self.tabs.sort_by_key(|tab| tab.location);
    }
}

impl fmt::Display for TabArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tab) in self.tabs.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            match tab.alignment {
                TabAlign::Left => {}
                TabAlign::Right => f.write_str("right:")?,
                TabAlign::Center => f.write_str("center:")?,
                TabAlign::Decimal => f.write_str("decimal:")?,
            }
            write!(f, "{}", tab.location)?;
            if self.positions_in_pixels {
                f.write_str("px")?;
            }
            if let Some(decimal_point) = tab.decimal_point {
                write!(f, ":{}", decimal_point as u32)?;
            }
        }
        Ok(())
    }
}

impl FromStr for TabArray {
    type Err = ParseTabArrayError;

    /// Parses the form produced by `Display`: comma- or newline-separated
    /// stops, each `[ALIGN:]POS[px][:DECIMAL]` where `ALIGN` is one of
    /// `left`, `right`, `center`, `decimal` (`left` when omitted), `POS` is
    /// a nonnegative integer, the `px` suffix marks pixel positions (all
    /// stops or none), and `DECIMAL` is a decimal point codepoint.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let pixels = text.contains("px");
        let mut array = Self::new(0, pixels);

        let mut p = text.trim_start();
        let mut i = 0;
        while !p.is_empty() {
            let alignment = if let Some(rest) = p.strip_prefix("left:") {
                p = rest;
                TabAlign::Left
            } else if let Some(rest) = p.strip_prefix("right:") {
                p = rest;
                TabAlign::Right
            } else if let Some(rest) = p.strip_prefix("center:") {
                p = rest;
                TabAlign::Center
            } else if let Some(rest) = p.strip_prefix("decimal:") {
                p = rest;
                TabAlign::Decimal
            } else {
                TabAlign::Left
            };

            let (position, rest) = parse_integer(p).ok_or(ParseTabArrayError::InvalidPosition)?;
            p = rest;
            array.set_tab(i, alignment, position);

            if pixels {
                p = p.strip_prefix("px").ok_or(ParseTabArrayError::MixedUnits)?;
            }

            if let Some(rest) = p.strip_prefix(':') {
                let (codepoint, rest) =
                    parse_integer(rest).ok_or(ParseTabArrayError::InvalidDecimalPoint)?;
                let decimal_point = char::from_u32(codepoint as u32)
                    .ok_or(ParseTabArrayError::InvalidDecimalPoint)?;
                array.set_decimal_point(i, Some(decimal_point));
                p = rest;
            }

            let trimmed = p.trim_start();
            p = match trimmed.strip_prefix(',') {
                Some(rest) => rest.trim_start(),
                None => {
                    if !trimmed.is_empty() && trimmed.len() == p.len() {
                        // Neither whitespace nor a separator followed the stop.
                        return Err(ParseTabArrayError::TrailingInput);
                    }
                    trimmed
                }
            };
            i += 1;
        }

        Ok(array)
    }
}

/// Parses a nonnegative decimal integer prefix. Returns the value and the
/// remaining input, or `None` if the input does not start with a digit.
fn parse_integer(s: &str) -> Option<(i32, &str)> {
    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let value = s[..digits].parse::<i32>().ok()?;
    Some((value, &s[digits..]))
}
