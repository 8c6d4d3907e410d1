// Data model shared by the extractor, normalizer, joiner and exporters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Stat categories
// ---------------------------------------------------------------------------

/// One of the five statistic tables published per season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatCategory {
    #[serde(rename = "totals")]
    Totals,
    #[serde(rename = "per_game")]
    PerGame,
    #[serde(rename = "per_minute")]
    Per36Minutes,
    #[serde(rename = "per_poss")]
    Per100Possessions,
    #[serde(rename = "advanced")]
    Advanced,
}

impl StatCategory {
    pub const ALL: [StatCategory; 5] = [
        StatCategory::Totals,
        StatCategory::PerGame,
        StatCategory::Per36Minutes,
        StatCategory::Per100Possessions,
        StatCategory::Advanced,
    ];

    /// Identifier used in the source page URL.
    pub fn source_id(self) -> &'static str {
        match self {
            StatCategory::Totals => "totals",
            StatCategory::PerGame => "per_game",
            StatCategory::Per36Minutes => "per_minute",
            StatCategory::Per100Possessions => "per_poss",
            StatCategory::Advanced => "advanced",
        }
    }

    /// Folder the yearly CSV files of this category are exported into.
    pub fn folder(self) -> &'static str {
        match self {
            StatCategory::Totals => "Totals",
            StatCategory::PerGame => "PerGame",
            StatCategory::Per36Minutes => "Per36Min",
            StatCategory::Per100Possessions => "Per100Poss",
            StatCategory::Advanced => "Advanced",
        }
    }

    /// File name prefix of the yearly CSV files (`<prefix><year>.csv`).
    pub fn file_prefix(self) -> &'static str {
        match self {
            StatCategory::Totals => "tot",
            StatCategory::PerGame => "game",
            StatCategory::Per36Minutes => "36min",
            StatCategory::Per100Possessions => "100poss",
            StatCategory::Advanced => "adv",
        }
    }

    /// Short label appended to colliding column names when two categories
    /// are merged.
    pub fn label(self) -> &'static str {
        self.file_prefix()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StatCategory::Totals => "Totals",
            StatCategory::PerGame => "Per Game",
            StatCategory::Per36Minutes => "Per 36 Minutes",
            StatCategory::Per100Possessions => "Per 100 Possessions",
            StatCategory::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stat category `{0}` (expected one of totals, per_game, per_minute, per_poss, advanced)")]
pub struct CategoryParseError(pub String);

impl FromStr for StatCategory {
    type Err = CategoryParseError;

    /// Accepts the URL id, the export folder name or the file prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        StatCategory::ALL
            .into_iter()
            .find(|c| {
                [c.source_id(), c.folder(), c.file_prefix()]
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| CategoryParseError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A typed table cell. The type is decided once, per column, by the
/// normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }
}

impl fmt::Display for CellValue {
    /// Integral numbers print without a fractional part; everything else uses
    /// the shortest text that parses back to the same value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Missing => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

pub const PLAYER_COLUMN: &str = "Player";
pub const AGE_COLUMN: &str = "Age";

/// Unprocessed extraction result. `None` marks a cell the markup did not
/// contain at all (as opposed to an empty one).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Number,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// One normalized row, positionally aligned with its table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    cells: Vec<CellValue>,
}

impl PlayerRecord {
    pub(crate) fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }
}

/// The (Player, Age) pair identifying a player-season.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub player: String,
    pub age: String,
}

/// Read-only access shared by normalized and merged tables.
pub trait Tabular {
    fn columns(&self) -> &[Column];
    fn row_count(&self) -> usize;
    fn row(&self, index: usize) -> &[CellValue];

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.name == name)
    }

    fn column_names(&self) -> Vec<&str> {
        self.columns().iter().map(|c| c.name.as_str()).collect()
    }

    /// Identity of row `index`, if the table carries both identity columns.
    fn identity(&self, index: usize) -> Option<IdentityKey> {
        let player = self.column_index(PLAYER_COLUMN)?;
        let age = self.column_index(AGE_COLUMN)?;
        let row = self.row(index);
        Some(IdentityKey {
            player: row[player].to_string(),
            age: row[age].to_string(),
        })
    }
}

/// A table of one category for one season. No two records share an
/// identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    category: StatCategory,
    columns: Vec<Column>,
    records: Vec<PlayerRecord>,
}

impl NormalizedTable {
    pub(crate) fn new(category: StatCategory, columns: Vec<Column>, records: Vec<PlayerRecord>) -> Self {
        Self {
            category,
            columns,
            records,
        }
    }

    pub fn category(&self) -> StatCategory {
        self.category
    }

    pub fn records(&self) -> &[PlayerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cell of `record` in column `name`.
    pub fn value<'a>(&'a self, record: &'a PlayerRecord, name: &str) -> Option<&'a CellValue> {
        self.column_index(name).and_then(|i| record.cells.get(i))
    }

    /// Converts back to the unprocessed form, every cell rendered to text.
    /// Missing cells become absent cells.
    pub fn to_raw(&self) -> RawTable {
        RawTable {
            header: self.columns.iter().map(|c| c.name.clone()).collect(),
            rows: self
                .records
                .iter()
                .map(|r| {
                    r.cells
                        .iter()
                        .map(|c| match c {
                            CellValue::Missing => None,
                            other => Some(other.to_string()),
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

impl Tabular for NormalizedTable {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn row_count(&self) -> usize {
        self.records.len()
    }

    fn row(&self, index: usize) -> &[CellValue] {
        &self.records[index].cells
    }
}

/// Inner join of two normalized tables on the identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
    labels: (String, String),
}

impl MergedTable {
    pub(crate) fn new(columns: Vec<Column>, rows: Vec<Vec<CellValue>>, labels: (String, String)) -> Self {
        Self {
            columns,
            rows,
            labels,
        }
    }

    /// Labels used to disambiguate colliding columns, side A first.
    pub fn labels(&self) -> (&str, &str) {
        (&self.labels.0, &self.labels.1)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Tabular for MergedTable {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: usize) -> &[CellValue] {
        &self.rows[index]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
