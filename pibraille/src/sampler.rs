//! Reading the shortcut switch and the braille cell.

use crate::braille::Pattern;
use pibraille_gpio::{GpioBusInput, GpioResult};
use std::fmt::{Display, Formatter};

/// Lines sampled per tick: the shortcut line, then dots 1 to 6.
pub const LINE_COUNT: usize = 1 + Pattern::DOT_COUNT;

/// One tick's view of the switches.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct InputState {
    pub shortcut: bool,
    pub pattern: Pattern,
}

impl InputState {
    /// Splits line values in sampling order (shortcut first) into an input state.
    pub fn from_lines(lines: [bool; LINE_COUNT]) -> Self {
        let [shortcut, cell @ ..] = lines;
        InputState {
            shortcut,
            pattern: Pattern::from_cell(cell),
        }
    }

    /// Same as [`InputState::from_lines`], from a mask with the shortcut line in bit 0.
    pub fn from_mask(mask: u64) -> Self {
        InputState {
            shortcut: mask & 1 != 0,
            pattern: Pattern::from_bits_truncate((mask >> 1) as u8),
        }
    }

    /// Line values in sampling order, the inverse of [`InputState::from_lines`].
    pub fn to_lines(&self) -> [bool; LINE_COUNT] {
        let mut lines = [self.shortcut; LINE_COUNT];
        lines[1..].copy_from_slice(&self.pattern.to_cell());
        lines
    }
}

impl Display for InputState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "shortcut {} cell {}", if self.shortcut { "on" } else { "off" }, self.pattern)
    }
}

/// Samples every line with one bus read, so the shortcut line and the cell come from the same instant.
#[derive(Debug)]
pub struct InputSampler<'a> {
    lines: &'a dyn GpioBusInput<LINE_COUNT>,
}

impl<'a> InputSampler<'a> {
    pub fn new(lines: &'a dyn GpioBusInput<LINE_COUNT>) -> Self {
        InputSampler { lines }
    }

    pub fn sample(&self) -> GpioResult<InputState> {
        let mask = self.lines.read_mask()?;
        Ok(InputState::from_mask(mask))
    }
}
