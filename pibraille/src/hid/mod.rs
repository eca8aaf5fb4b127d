//! USB HID keyboard output.
//!
//! The device acts as a boot-protocol keyboard: every change in held keys is sent as a full
//! 8-byte report.

mod gadget;

pub use gadget::*;

use crate::braille::Symbol;
use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum HidError {
    #[error("more than {} keys held at once", KeyboardReport::KEY_SLOTS)]
    Rollover,
    #[error("no key for symbol {0}")]
    Unmapped(Symbol),
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for HidError {
    fn from(err: std::io::Error) -> Self {
        HidError::Io(err.kind())
    }
}

pub type HidResult<T> = Result<T, HidError>;

const KEY_SLOTS: usize = 6;

/// A USB HID keyboard usage id (usage page 0x07).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Keycode(pub u8);

impl Keycode {
    pub const A: Keycode = Keycode(0x04);
    pub const DIGIT_1: Keycode = Keycode(0x1E);
    pub const DIGIT_0: Keycode = Keycode(0x27);
    pub const ENTER: Keycode = Keycode(0x28);
    pub const ESCAPE: Keycode = Keycode(0x29);
    pub const BACKSPACE: Keycode = Keycode(0x2A);
    pub const TAB: Keycode = Keycode(0x2B);
    pub const SPACE: Keycode = Keycode(0x2C);

    pub const LEFT_CTRL: Keycode = Keycode(0xE0);
    pub const LEFT_SHIFT: Keycode = Keycode(0xE1);
    pub const LEFT_ALT: Keycode = Keycode(0xE2);
    pub const LEFT_GUI: Keycode = Keycode(0xE3);
    pub const RIGHT_CTRL: Keycode = Keycode(0xE4);
    pub const RIGHT_SHIFT: Keycode = Keycode(0xE5);
    pub const RIGHT_ALT: Keycode = Keycode(0xE6);
    pub const RIGHT_GUI: Keycode = Keycode(0xE7);

    const NAMED: [(&'static str, Keycode); 17] = [
        ("ENTER", Keycode::ENTER),
        ("ESC", Keycode::ESCAPE),
        ("BACKSPACE", Keycode::BACKSPACE),
        ("TAB", Keycode::TAB),
        ("SPACE", Keycode::SPACE),
        ("CTRL", Keycode::LEFT_CTRL),
        ("SHIFT", Keycode::LEFT_SHIFT),
        ("ALT", Keycode::LEFT_ALT),
        ("GUI", Keycode::LEFT_GUI),
        ("LEFT_CTRL", Keycode::LEFT_CTRL),
        ("LEFT_SHIFT", Keycode::LEFT_SHIFT),
        ("LEFT_ALT", Keycode::LEFT_ALT),
        ("LEFT_GUI", Keycode::LEFT_GUI),
        ("RIGHT_CTRL", Keycode::RIGHT_CTRL),
        ("RIGHT_SHIFT", Keycode::RIGHT_SHIFT),
        ("RIGHT_ALT", Keycode::RIGHT_ALT),
        ("RIGHT_GUI", Keycode::RIGHT_GUI),
    ];

    /// The key for an uppercase or lowercase latin letter.
    pub fn letter(letter: char) -> Option<Keycode> {
        let letter = letter.to_ascii_uppercase();
        letter
            .is_ascii_uppercase()
            .then(|| Keycode(Self::A.0 + (letter as u8 - b'A')))
    }

    /// The top-row key for a decimal digit.
    pub fn digit(digit: u8) -> Option<Keycode> {
        match digit {
            0 => Some(Self::DIGIT_0),
            1..=9 => Some(Keycode(Self::DIGIT_1.0 + digit - 1)),
            _ => None,
        }
    }

    /// Parses a key name such as `GUI`, `TAB`, `RIGHT_ALT`, `Q` or `7`, ignoring case.
    pub fn from_name(name: &str) -> Option<Keycode> {
        let name = name.trim().to_ascii_uppercase();
        if let Some(&(_, keycode)) = Self::NAMED.iter().find(|(n, _)| *n == name) {
            return Some(keycode);
        }

        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() => Self::digit(c as u8 - b'0'),
            (Some(c), None) => Self::letter(c),
            _ => None,
        }
    }

    /// Parses a chord such as `GUI+TAB`.
    pub fn parse_chord(chord: &str) -> Option<Vec<Keycode>> {
        let keys = chord
            .split('+')
            .map(Self::from_name)
            .collect::<Option<Vec<_>>>()?;
        (!keys.is_empty()).then_some(keys)
    }

    /// The bit this key occupies in the report's modifier byte, if it is a modifier.
    pub fn modifier_bit(self) -> Option<u8> {
        (Self::LEFT_CTRL.0..=Self::RIGHT_GUI.0)
            .contains(&self.0)
            .then(|| 1 << (self.0 - Self::LEFT_CTRL.0))
    }
}

impl Display for Keycode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some((name, _)) = Self::NAMED.iter().find(|(_, k)| k == self) {
            return f.write_str(name);
        }
        match self.0 {
            0x04..=0x1D => write!(f, "{}", (b'A' + self.0 - 0x04) as char),
            0x1E..=0x26 => write!(f, "{}", self.0 - 0x1E + 1),
            0x27 => f.write_str("0"),
            other => write!(f, "0x{:02X}", other),
        }
    }
}

impl Debug for Keycode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keycode({})", self)
    }
}

/// The output capability: something that can hold keys down and let them go.
///
/// Pressing a key that is already held keeps it held; a single release lets it go.
pub trait Keyboard: Debug {
    /// Adds `keys` to the held set and reports the new state to the host.
    fn press(&mut self, keys: &[Keycode]) -> HidResult<()>;
    /// Removes `keys` from the held set and reports the new state to the host.
    fn release(&mut self, keys: &[Keycode]) -> HidResult<()>;
}

/// Standard USB HID boot-protocol keyboard report.
///
/// ```text
/// Byte 0:   modifier bitfield (bit 0 = Left Ctrl ... bit 7 = Right GUI)
/// Byte 1:   reserved
/// Byte 2-7: up to 6 held key usages, 0 for an empty slot
/// ```
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifier: u8,
    pub keycodes: [u8; KEY_SLOTS],
}

impl KeyboardReport {
    pub const KEY_SLOTS: usize = KEY_SLOTS;
    pub const SIZE: usize = 8;

    /// Marks `key` as held.
    ///
    /// # Errors
    /// - `HidError::Rollover` if all key slots are taken. The report is left unchanged.
    pub fn add(&mut self, key: Keycode) -> HidResult<()> {
        if let Some(bit) = key.modifier_bit() {
            self.modifier |= bit;
            return Ok(());
        }
        if self.keycodes.contains(&key.0) {
            return Ok(());
        }
        let slot = self
            .keycodes
            .iter_mut()
            .find(|slot| **slot == 0)
            .ok_or(HidError::Rollover)?;
        *slot = key.0;
        Ok(())
    }

    /// Marks `key` as released. Releasing a key that is not held does nothing.
    pub fn remove(&mut self, key: Keycode) {
        if let Some(bit) = key.modifier_bit() {
            self.modifier &= !bit;
            return;
        }
        for slot in self.keycodes.iter_mut().filter(|slot| **slot == key.0) {
            *slot = 0;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes.iter().all(|&k| k == 0)
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = self.modifier;
        bytes[2..].copy_from_slice(&self.keycodes);
        bytes
    }
}
