//! Turning decoded actions into key taps.

use crate::braille::Symbol;
use crate::decode::Action;
use crate::hid::{HidError, HidResult, Keyboard, Keycode};
use log::{debug, warn};
use std::thread::sleep;
use std::time::Duration;

/// Presses `keys`, holds them for `hold`, then releases them.
///
/// The release is attempted even when the press failed, so nothing is left held on the host.
/// A press error takes precedence over a release error.
pub fn tap(keyboard: &mut dyn Keyboard, keys: &[Keycode], hold: Duration) -> HidResult<()> {
    let pressed = keyboard.press(keys);
    if pressed.is_ok() {
        sleep(hold);
    }

    let released = keyboard.release(keys);
    if let Err(err) = &released {
        warn!("Failed to release {:?}: {}", keys, err);
    }

    pressed.and(released)
}

pub struct OutputEmitter<'a> {
    keyboard: &'a mut dyn Keyboard,
    shortcut: Vec<Keycode>,
    press_duration: Duration,
    /// Set by the capital sign, consumed by the next emission.
    capital_pending: bool,
}

impl<'a> OutputEmitter<'a> {
    pub fn new(keyboard: &'a mut dyn Keyboard, shortcut: Vec<Keycode>) -> Self {
        OutputEmitter {
            keyboard,
            shortcut,
            press_duration: Duration::from_millis(100),
            capital_pending: false,
        }
    }

    pub fn with_press_duration(mut self, press_duration: Duration) -> Self {
        self.press_duration = press_duration;
        self
    }

    /// Whether the next letter will be sent shifted.
    pub fn capital_pending(&self) -> bool {
        self.capital_pending
    }

    /// Drops a pending capital sign, so the next letter goes out unshifted.
    pub fn clear_capital(&mut self) {
        if self.capital_pending {
            debug!("Pending capital sign dropped");
        }
        self.capital_pending = false;
    }

    /// The keys tapped for `symbol`, taking a pending capital sign into account.
    fn chord_for(&self, symbol: Symbol) -> HidResult<Vec<Keycode>> {
        let key = match symbol {
            Symbol::Digit(digit) => Keycode::digit(digit),
            Symbol::Letter(letter) => Keycode::letter(letter),
            Symbol::Capital => None,
        }
        .ok_or(HidError::Unmapped(symbol))?;

        if self.capital_pending && matches!(symbol, Symbol::Letter(_)) {
            Ok(vec![Keycode::LEFT_SHIFT, key])
        } else {
            Ok(vec![key])
        }
    }

    /// Sends `action` to the host. `NoAction` sends nothing.
    pub fn emit(&mut self, action: Action) -> HidResult<()> {
        match action {
            Action::NoAction => Ok(()),
            Action::EmitShortcut => {
                self.capital_pending = false;
                tap(self.keyboard, &self.shortcut, self.press_duration)
            }
            Action::EmitSymbol(Symbol::Capital) => {
                debug!("Capital sign, next letter will be shifted");
                self.capital_pending = true;
                Ok(())
            }
            Action::EmitSymbol(symbol) => {
                let chord = self.chord_for(symbol);
                self.capital_pending = false;
                tap(self.keyboard, &chord?, self.press_duration)
            }
        }
    }
}
