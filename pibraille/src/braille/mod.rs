//! Braille cells and the symbols they stand for.

mod table;

pub use table::*;

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum PatternError {
    #[error("dot {0} is outside 1..=6")]
    InvalidDot(u8),
    #[error("dot {0} is listed more than once")]
    DuplicateDot(u8),
}

/// The raised dots of one six-dot braille cell.
///
/// Stored as a bit mask where bit `i` is dot `i + 1`:
/// ```text
/// 1 ⠁ ⠈ 4
/// 2 ⠂ ⠐ 5
/// 3 ⠄ ⠠ 6
/// ```
/// This is the same layout as the Unicode braille block, so `U+2800 + mask` is the glyph.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Pattern(u8);

impl Pattern {
    /// The number of dots in a cell.
    pub const DOT_COUNT: usize = 6;
    /// The number of distinct patterns, including the empty one.
    pub const COUNT: usize = 1 << Self::DOT_COUNT;

    pub const EMPTY: Pattern = Pattern(0);

    const MASK: u8 = (1 << Self::DOT_COUNT) - 1;

    /// Builds a pattern from dot numbers (1-6), for use in static tables.
    ///
    /// Panics on a dot outside 1..=6, which fails the build when used in a `const`.
    pub const fn dots(dots: &[u8]) -> Pattern {
        let mut bits = 0u8;
        let mut i = 0;
        while i < dots.len() {
            let dot = dots[i];
            assert!(dot >= 1 && dot <= 6, "braille dots are numbered 1 to 6");
            bits |= 1 << (dot - 1);
            i += 1;
        }
        Pattern(bits)
    }

    /// Builds a pattern from a bit mask, ignoring bits above dot 6.
    pub const fn from_bits_truncate(bits: u8) -> Pattern {
        Pattern(bits & Self::MASK)
    }

    /// Builds a pattern from the sampled switch states, dot 1 first.
    pub fn from_cell(cell: [bool; Self::DOT_COUNT]) -> Pattern {
        let bits = cell
            .iter()
            .enumerate()
            .filter(|&(_, &raised)| raised)
            .fold(0u8, |bits, (i, _)| bits | 1 << i);
        Pattern(bits)
    }

    pub fn try_from_dots(dots: &[u8]) -> Result<Pattern, PatternError> {
        let mut bits = 0u8;
        for &dot in dots {
            if !(1..=6).contains(&dot) {
                return Err(PatternError::InvalidDot(dot));
            }
            let bit = 1 << (dot - 1);
            if bits & bit != 0 {
                return Err(PatternError::DuplicateDot(dot));
            }
            bits |= bit;
        }
        Ok(Pattern(bits))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// The pattern as a table index in `0..Pattern::COUNT`.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn has_dot(self, dot: u8) -> bool {
        (1..=6).contains(&dot) && self.0 & (1 << (dot - 1)) != 0
    }

    /// Iterates the raised dot numbers in ascending order.
    pub fn raised_dots(self) -> impl Iterator<Item = u8> {
        (1..=Self::DOT_COUNT as u8).filter(move |&dot| self.has_dot(dot))
    }

    pub fn to_cell(self) -> [bool; Self::DOT_COUNT] {
        let mut cell = [false; Self::DOT_COUNT];
        for (i, raised) in cell.iter_mut().enumerate() {
            *raised = self.0 & (1 << i) != 0;
        }
        cell
    }

    /// Every pattern, empty one included.
    pub fn all() -> impl Iterator<Item = Pattern> {
        (0..Self::COUNT as u8).map(Pattern)
    }

    /// The Unicode braille glyph for this pattern.
    pub fn as_char(self) -> char {
        char::from_u32(0x2800 + self.0 as u32).unwrap_or('?')
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ", self.as_char())?;
        if self.is_empty() {
            return write!(f, "-");
        }
        for dot in self.raised_dots() {
            write!(f, "{}", dot)?;
        }
        Ok(())
    }
}

impl Debug for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pattern({})", self)
    }
}

impl TryFrom<Vec<u8>> for Pattern {
    type Error = PatternError;

    fn try_from(dots: Vec<u8>) -> Result<Self, Self::Error> {
        Pattern::try_from_dots(&dots)
    }
}

impl From<Pattern> for Vec<u8> {
    fn from(pattern: Pattern) -> Self {
        pattern.raised_dots().collect()
    }
}

/// What a cell decodes to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    /// A decimal digit, `0` to `9`.
    Digit(u8),
    /// An uppercase latin letter, `A` to `Z`.
    Letter(char),
    /// The braille capital sign; makes the next letter uppercase.
    Capital,
}

impl Symbol {
    pub fn is_valid(self) -> bool {
        match self {
            Symbol::Digit(digit) => digit <= 9,
            Symbol::Letter(letter) => letter.is_ascii_uppercase(),
            Symbol::Capital => true,
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Digit(digit) => write!(f, "{}", digit),
            Symbol::Letter(letter) => write!(f, "{}", letter),
            Symbol::Capital => write!(f, "<capital>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_positions_map_to_dots_in_order() {
        let pattern = Pattern::from_cell([true, false, false, true, true, false]);
        assert_eq!(pattern, Pattern::dots(&[1, 4, 5]));
        assert_eq!(pattern.bits(), 0b011001);
        assert_eq!(pattern.to_cell(), [true, false, false, true, true, false]);
    }

    #[test]
    fn glyph_matches_unicode_braille_block() {
        assert_eq!(Pattern::dots(&[1]).as_char(), '⠁');
        assert_eq!(Pattern::dots(&[1, 4, 5]).as_char(), '⠙');
        assert_eq!(Pattern::dots(&[6]).as_char(), '⠠');
        assert_eq!(Pattern::EMPTY.as_char(), '⠀');
    }

    #[test]
    fn display_lists_raised_dots() {
        assert_eq!(Pattern::dots(&[5, 1, 4]).to_string(), "⠙ 145");
        assert_eq!(Pattern::EMPTY.to_string(), "⠀ -");
    }

    #[test]
    fn dot_lists_are_validated() {
        assert_eq!(Pattern::try_from_dots(&[2, 4]), Ok(Pattern::dots(&[2, 4])));
        assert_eq!(Pattern::try_from_dots(&[0]), Err(PatternError::InvalidDot(0)));
        assert_eq!(Pattern::try_from_dots(&[7]), Err(PatternError::InvalidDot(7)));
        assert_eq!(Pattern::try_from_dots(&[3, 3]), Err(PatternError::DuplicateDot(3)));
    }

    #[test]
    fn truncation_drops_high_bits() {
        assert_eq!(Pattern::from_bits_truncate(0b1100_0001), Pattern::dots(&[1]));
    }

    #[test]
    fn all_patterns_are_distinct() {
        let all: Vec<_> = Pattern::all().collect();
        assert_eq!(all.len(), Pattern::COUNT);
        assert!(all.iter().enumerate().all(|(i, p)| p.index() == i));
    }

    #[test]
    fn pattern_serializes_as_dot_list() {
        let json = serde_json::to_string(&Pattern::dots(&[1, 3, 6])).unwrap();
        assert_eq!(json, "[1,3,6]");
        let parsed: Pattern = serde_json::from_str("[6,3,1]").unwrap();
        assert_eq!(parsed, Pattern::dots(&[1, 3, 6]));
        assert!(serde_json::from_str::<Pattern>("[9]").is_err());
    }

    #[test]
    fn symbol_validation() {
        assert!(Symbol::Digit(9).is_valid());
        assert!(!Symbol::Digit(10).is_valid());
        assert!(Symbol::Letter('Q').is_valid());
        assert!(!Symbol::Letter('q').is_valid());
        assert!(!Symbol::Letter('é').is_valid());
    }

    #[test]
    fn symbol_json_forms() {
        assert_eq!(serde_json::to_string(&Symbol::Digit(3)).unwrap(), r#"{"digit":3}"#);
        assert_eq!(serde_json::to_string(&Symbol::Letter('C')).unwrap(), r#"{"letter":"C"}"#);
        assert_eq!(serde_json::to_string(&Symbol::Capital).unwrap(), r#""capital""#);
    }
}
