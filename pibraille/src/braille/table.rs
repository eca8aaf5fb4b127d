use crate::braille::{Pattern, Symbol};
use crate::config::DeviceConfig;
use log::debug;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot read table file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed table file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{table} table: the empty pattern cannot carry a symbol")]
    EmptyPattern { table: TableKind },
    #[error("{table} table: pattern {pattern} is assigned to both {first} and {second}")]
    DuplicatePattern { table: TableKind, pattern: Pattern, first: Symbol, second: Symbol },
    #[error("{table} table: {symbol:?} does not belong in this table")]
    InvalidSymbol { table: TableKind, symbol: Symbol },
}

pub type TableResult<T> = Result<T, TableError>;

/// The independently enabled groups of symbols.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TableKind {
    Numbers,
    Letters,
    Capitals,
}

impl TableKind {
    fn accepts(self, symbol: Symbol) -> bool {
        let kind_matches = match self {
            TableKind::Numbers => matches!(symbol, Symbol::Digit(_)),
            TableKind::Letters => matches!(symbol, Symbol::Letter(_)),
            TableKind::Capitals => matches!(symbol, Symbol::Capital),
        };
        kind_matches && symbol.is_valid()
    }
}

impl Display for TableKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TableKind::Numbers => "numbers",
            TableKind::Letters => "letters",
            TableKind::Capitals => "capitals",
        })
    }
}

const NUMBER_ENTRIES: [(Pattern, Symbol); 10] = [
    (Pattern::dots(&[2, 4, 5]), Symbol::Digit(0)),
    (Pattern::dots(&[1]), Symbol::Digit(1)),
    (Pattern::dots(&[1, 2]), Symbol::Digit(2)),
    (Pattern::dots(&[1, 4]), Symbol::Digit(3)),
    (Pattern::dots(&[1, 4, 5]), Symbol::Digit(4)),
    (Pattern::dots(&[1, 5]), Symbol::Digit(5)),
    (Pattern::dots(&[1, 2, 4]), Symbol::Digit(6)),
    (Pattern::dots(&[1, 2, 4, 5]), Symbol::Digit(7)),
    (Pattern::dots(&[1, 2, 5]), Symbol::Digit(8)),
    (Pattern::dots(&[2, 4]), Symbol::Digit(9)),
];

const LETTER_ENTRIES: [(Pattern, Symbol); 26] = [
    (Pattern::dots(&[1]), Symbol::Letter('A')),
    (Pattern::dots(&[1, 2]), Symbol::Letter('B')),
    (Pattern::dots(&[1, 4]), Symbol::Letter('C')),
    (Pattern::dots(&[1, 4, 5]), Symbol::Letter('D')),
    (Pattern::dots(&[1, 5]), Symbol::Letter('E')),
    (Pattern::dots(&[1, 2, 4]), Symbol::Letter('F')),
    (Pattern::dots(&[1, 2, 4, 5]), Symbol::Letter('G')),
    (Pattern::dots(&[1, 2, 5]), Symbol::Letter('H')),
    (Pattern::dots(&[2, 4]), Symbol::Letter('I')),
    (Pattern::dots(&[2, 4, 5]), Symbol::Letter('J')),
    (Pattern::dots(&[1, 3]), Symbol::Letter('K')),
    (Pattern::dots(&[1, 2, 3]), Symbol::Letter('L')),
    (Pattern::dots(&[1, 3, 4]), Symbol::Letter('M')),
    (Pattern::dots(&[1, 3, 4, 5]), Symbol::Letter('N')),
    (Pattern::dots(&[1, 3, 5]), Symbol::Letter('O')),
    (Pattern::dots(&[1, 2, 3, 4]), Symbol::Letter('P')),
    (Pattern::dots(&[1, 2, 3, 4, 5]), Symbol::Letter('Q')),
    (Pattern::dots(&[1, 2, 3, 5]), Symbol::Letter('R')),
    (Pattern::dots(&[2, 3, 4]), Symbol::Letter('S')),
    (Pattern::dots(&[2, 3, 4, 5]), Symbol::Letter('T')),
    (Pattern::dots(&[1, 3, 6]), Symbol::Letter('U')),
    (Pattern::dots(&[1, 2, 3, 6]), Symbol::Letter('V')),
    (Pattern::dots(&[2, 4, 5, 6]), Symbol::Letter('W')),
    (Pattern::dots(&[1, 3, 4, 6]), Symbol::Letter('X')),
    (Pattern::dots(&[1, 3, 4, 5, 6]), Symbol::Letter('Y')),
    (Pattern::dots(&[1, 3, 5, 6]), Symbol::Letter('Z')),
];

const CAPITAL_ENTRIES: [(Pattern, Symbol); 1] = [
    (Pattern::dots(&[6]), Symbol::Capital),
];

/// One group of symbols, indexed directly by pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubTable {
    slots: [Option<Symbol>; Pattern::COUNT],
}

impl SubTable {
    pub const NUMBERS: SubTable = SubTable::from_static(&NUMBER_ENTRIES);
    pub const LETTERS: SubTable = SubTable::from_static(&LETTER_ENTRIES);
    pub const CAPITALS: SubTable = SubTable::from_static(&CAPITAL_ENTRIES);

    /// Builds a table from compiled-in entries.
    ///
    /// A duplicate or empty pattern panics, so a defective table in a `const` fails the build.
    pub const fn from_static(entries: &[(Pattern, Symbol)]) -> SubTable {
        let mut slots = [None; Pattern::COUNT];
        let mut i = 0;
        while i < entries.len() {
            let (pattern, symbol) = entries[i];
            assert!(!pattern.is_empty(), "the empty pattern cannot carry a symbol");
            assert!(slots[pattern.index()].is_none(), "pattern assigned twice");
            slots[pattern.index()] = Some(symbol);
            i += 1;
        }
        SubTable { slots }
    }

    /// Builds a table from runtime entries, checking every entry against `kind`.
    pub fn from_entries(
        kind: TableKind,
        entries: impl IntoIterator<Item = (Pattern, Symbol)>,
    ) -> TableResult<SubTable> {
        let mut slots = [None; Pattern::COUNT];
        for (pattern, symbol) in entries {
            if pattern.is_empty() {
                return Err(TableError::EmptyPattern { table: kind });
            }
            if !kind.accepts(symbol) {
                return Err(TableError::InvalidSymbol { table: kind, symbol });
            }
            if let Some(first) = slots[pattern.index()] {
                return Err(TableError::DuplicatePattern { table: kind, pattern, first, second: symbol });
            }
            slots[pattern.index()] = Some(symbol);
        }
        Ok(SubTable { slots })
    }

    pub fn get(&self, pattern: Pattern) -> Option<Symbol> {
        self.slots[pattern.index()]
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pattern, Symbol)> + '_ {
        Pattern::all().filter_map(|pattern| self.get(pattern).map(|symbol| (pattern, symbol)))
    }
}

/// The full decode vocabulary: numbers, letters and the capital sign.
///
/// Immutable once built; which groups take part is decided per lookup by [`DeviceConfig`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymbolTable {
    numbers: SubTable,
    letters: SubTable,
    capitals: SubTable,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    numbers: Option<Vec<TableEntry>>,
    letters: Option<Vec<TableEntry>>,
    capitals: Option<Vec<TableEntry>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TableEntry {
    dots: Pattern,
    symbol: Symbol,
}

impl SymbolTable {
    pub fn new(numbers: SubTable, letters: SubTable, capitals: SubTable) -> Self {
        SymbolTable { numbers, letters, capitals }
    }

    /// Standard six-dot braille: letters A-Z, digits 0-9 on the A-J patterns, capital sign on dot 6.
    pub fn builtin() -> Self {
        SymbolTable::new(SubTable::NUMBERS, SubTable::LETTERS, SubTable::CAPITALS)
    }

    /// Parses a JSON table description.
    ///
    /// Each of `numbers`, `letters` and `capitals` replaces the built-in group when present:
    /// ```json
    /// { "letters": [ { "dots": [1], "symbol": { "letter": "A" } } ] }
    /// ```
    pub fn from_json(json: &str) -> TableResult<Self> {
        let file: TableFile = serde_json::from_str(json)?;

        fn group(kind: TableKind, entries: Option<Vec<TableEntry>>, builtin: SubTable) -> TableResult<SubTable> {
            match entries {
                Some(entries) => SubTable::from_entries(
                    kind,
                    entries.into_iter().map(|entry| (entry.dots, entry.symbol)),
                ),
                None => Ok(builtin),
            }
        }

        Ok(SymbolTable::new(
            group(TableKind::Numbers, file.numbers, SubTable::NUMBERS)?,
            group(TableKind::Letters, file.letters, SubTable::LETTERS)?,
            group(TableKind::Capitals, file.capitals, SubTable::CAPITALS)?,
        ))
    }

    pub fn load(path: impl AsRef<Path>) -> TableResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_json(&json)?;
        debug!(
            "Loaded {} numbers, {} letters, {} capitals from {}",
            table.numbers.len(),
            table.letters.len(),
            table.capitals.len(),
            path.as_ref().display(),
        );
        Ok(table)
    }

    pub fn sub_table(&self, kind: TableKind) -> &SubTable {
        match kind {
            TableKind::Numbers => &self.numbers,
            TableKind::Letters => &self.letters,
            TableKind::Capitals => &self.capitals,
        }
    }

    /// Finds the symbol for `pattern` among the enabled groups.
    ///
    /// Numbers are consulted before letters, and letters before the capital sign.
    /// `None` is the ordinary "nothing typed" result.
    pub fn lookup(&self, pattern: Pattern, config: &DeviceConfig) -> Option<Symbol> {
        let groups = [
            (config.numbers_enabled, &self.numbers),
            (config.letters_enabled, &self.letters),
            (config.capitalization_enabled, &self.capitals),
        ];

        groups
            .into_iter()
            .filter(|&(enabled, _)| enabled)
            .find_map(|(_, table)| table.get(pattern))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::builtin()
    }
}
