//! Turning one input snapshot into at most one thing to type.

use crate::braille::{Pattern, Symbol, SymbolTable};
use crate::config::DeviceConfig;

/// What a tick should send to the host.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// Tap the configured shortcut chord.
    EmitShortcut,
    /// Tap the key for a symbol.
    EmitSymbol(Symbol),
    /// Send nothing.
    NoAction,
}

/// Stateless mapping from an input snapshot to an [`Action`].
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    table: SymbolTable,
}

impl Decoder {
    pub fn new(table: SymbolTable) -> Self {
        Decoder { table }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// Decodes one snapshot.
    ///
    /// An active shortcut line always wins and the cell is not looked at.
    pub fn decode(&self, shortcut_active: bool, pattern: Pattern, config: &DeviceConfig) -> Action {
        if shortcut_active {
            return Action::EmitShortcut;
        }

        match self.table.lookup(pattern, config) {
            Some(symbol) => Action::EmitSymbol(symbol),
            None => Action::NoAction,
        }
    }
}
