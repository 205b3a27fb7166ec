// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bidirectional embedding levels.

use icu_properties::props::BidiClass;
use icu_properties::{CodePointMapData, CodePointMapDataBorrowed};
use unicode_bidi::{BidiInfo, Level};

use crate::types::Direction;

fn bidi_class_data() -> CodePointMapDataBorrowed<'static, BidiClass> {
    const { CodePointMapData::new() }
}

/// The direction of the first character with strong directionality, or
/// [`Direction::Neutral`] when there is none.
pub fn find_base_dir(text: &str) -> Direction {
    let data = bidi_class_data();
    for c in text.chars() {
        match data.get(c) {
            BidiClass::LeftToRight => return Direction::Ltr,
            BidiClass::RightToLeft | BidiClass::ArabicLetter => return Direction::Rtl,
            _ => {}
        }
    }
    Direction::Neutral
}

/// Resolves a possibly weak or neutral direction against the text content:
/// the first strong character decides, falling back to the weak direction
/// itself (or LTR for neutral).
pub(crate) fn resolve_direction(text: &str, base_dir: Direction) -> Direction {
    match base_dir {
        Direction::Ltr => Direction::Ltr,
        Direction::Rtl => Direction::Rtl,
        Direction::WeakLtr | Direction::Neutral => match find_base_dir(text) {
            Direction::Rtl => Direction::Rtl,
            _ => Direction::Ltr,
        },
        Direction::WeakRtl => match find_base_dir(text) {
            Direction::Ltr => Direction::Ltr,
            _ => Direction::Rtl,
        },
    }
}

/// Computes the bidirectional embedding level of every character.
///
/// Weak and neutral base directions are resolved from the first strong
/// character, falling back to the weak direction itself (or LTR for
/// neutral). Returns one level per character and the resolved paragraph
/// direction.
pub fn embedding_levels(text: &str, base_dir: Direction) -> (Vec<u8>, Direction) {
    let resolved = resolve_direction(text, base_dir);

    let level = if resolved == Direction::Rtl {
        Level::rtl()
    } else {
        Level::ltr()
    };
    let info = BidiInfo::new(text, Some(level));
    let levels = text
        .char_indices()
        .map(|(i, _)| info.levels[i].number())
        .collect();
    (levels, resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_is_all_even() {
        let (levels, dir) = embedding_levels("abc def", Direction::Neutral);
        assert_eq!(dir, Direction::Ltr);
        assert!(levels.iter().all(|&l| l == 0));
    }

    #[test]
    fn hebrew_run_is_odd() {
        let (levels, dir) = embedding_levels("abc\u{5d0}\u{5d1}def", Direction::Neutral);
        assert_eq!(dir, Direction::Ltr);
        assert_eq!(levels[..3], [0, 0, 0]);
        assert_eq!(levels[3..5], [1, 1]);
        assert_eq!(levels[5..], [0, 0, 0]);
    }

    #[test]
    fn weak_rtl_applies_without_strong_chars() {
        let (_, dir) = embedding_levels("123", Direction::WeakRtl);
        assert_eq!(dir, Direction::Rtl);
        let (_, dir) = embedding_levels("abc", Direction::WeakRtl);
        assert_eq!(dir, Direction::Ltr);
    }
}
