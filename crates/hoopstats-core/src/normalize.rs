// Normalization: RawTable -> NormalizedTable.
//
// Steps run in a fixed order, each relying on the previous one:
//   1. rows fitted to the header width
//   2. category-specific spacer column removal
//   3. keep the first row per (Player, Age)
//   4. drop rows without a player
//   5. per-column type decision and coercion (empty text counts as zero)

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::model::{
    CellValue, Column, ColumnKind, NormalizedTable, PlayerRecord, RawTable, StatCategory,
    AGE_COLUMN, PLAYER_COLUMN,
};

// ---------------------------------------------------------------------------
// Spacer columns
// ---------------------------------------------------------------------------

/// Columns a category's table carries purely as visual spacing.
///
/// Positions refer to the header after the rank column is dropped. The page
/// leaves these headers blank; a named one means the layout moved.
#[derive(Debug, Clone, Copy)]
pub struct SpacerRule {
    pub category: StatCategory,
    pub positions: &'static [usize],
}

pub const SPACER_RULES: &[SpacerRule] = &[SpacerRule {
    category: StatCategory::Advanced,
    positions: &[18, 23],
}];

pub fn spacer_positions(category: StatCategory) -> &'static [usize] {
    SPACER_RULES
        .iter()
        .find(|rule| rule.category == category)
        .map(|rule| rule.positions)
        .unwrap_or(&[])
}

fn drop_spacer_columns(table: &mut RawTable, category: StatCategory) {
    let mut positions: Vec<usize> = spacer_positions(category)
        .iter()
        .copied()
        .filter(|&p| p < table.header.len())
        .collect();
    // Remove from the right so earlier positions stay valid.
    positions.sort_unstable_by(|a, b| b.cmp(a));

    for pos in positions {
        let name = table.header.remove(pos);
        if !name.trim().is_empty() {
            warn!(
                %category,
                position = pos,
                column = %name,
                "spacer column is not blank; page layout may have changed"
            );
        }
        for row in &mut table.rows {
            if pos < row.len() {
                row.remove(pos);
            }
        }
    }
}

/// Pad short rows with absent cells and cut long ones, so every row has
/// exactly one cell per header column.
fn fit_rows_to_header(table: &mut RawTable, category: StatCategory) {
    let width = table.header.len();
    let mut ragged = 0;
    for row in &mut table.rows {
        if row.len() != width {
            ragged += 1;
            row.resize(width, None);
        }
    }
    if ragged > 0 {
        warn!(%category, rows = ragged, width, "rows resized to header width");
    }
}

// ---------------------------------------------------------------------------
// Row filtering
// ---------------------------------------------------------------------------

/// Keep the first row seen for each (Player, Age). For a player who changed
/// teams the page lists the combined row before the per-team rows.
fn dedup_identities(rows: Vec<Vec<Option<String>>>, player: usize, age: Option<usize>) -> Vec<Vec<Option<String>>> {
    let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let key = (row[player].clone(), age.and_then(|a| row[a].clone()));
            seen.insert(key)
        })
        .collect()
}

fn has_player(row: &[Option<String>], player: usize) -> bool {
    row[player].as_deref().is_some_and(|p| !p.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Numeric reading of a present cell; empty text reads as zero.
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Decide one column's type. Absent cells do not count against a number
/// column.
fn column_kind(rows: &[Vec<Option<String>>], index: usize) -> ColumnKind {
    let all_numeric = rows
        .iter()
        .filter_map(|row| row[index].as_deref())
        .all(|cell| parse_number(cell).is_some());
    if all_numeric {
        ColumnKind::Number
    } else {
        ColumnKind::Text
    }
}

fn coerce(cell: Option<String>, kind: ColumnKind) -> CellValue {
    match (cell, kind) {
        (None, _) => CellValue::Missing,
        (Some(text), ColumnKind::Number) => match parse_number(&text) {
            Some(n) => CellValue::Number(n),
            None => CellValue::Text(text),
        },
        (Some(text), ColumnKind::Text) => CellValue::Text(text),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Normalize one extracted table. Never fails; an empty table stays empty.
pub fn normalize(mut raw: RawTable, category: StatCategory) -> NormalizedTable {
    fit_rows_to_header(&mut raw, category);
    drop_spacer_columns(&mut raw, category);
    let RawTable { header, mut rows } = raw;
    let before = rows.len();

    match header.iter().position(|h| h == PLAYER_COLUMN) {
        Some(player) => {
            let age = header.iter().position(|h| h == AGE_COLUMN);
            if age.is_none() {
                warn!(%category, "no Age column; de-duplicating on Player alone");
            }
            rows = dedup_identities(rows, player, age);
            rows.retain(|row| has_player(row, player));
        }
        None if !header.is_empty() => {
            warn!(%category, "no Player column; rows kept as extracted");
        }
        None => {}
    }

    let kinds: Vec<ColumnKind> = (0..header.len()).map(|i| column_kind(&rows, i)).collect();
    let columns = header
        .into_iter()
        .zip(&kinds)
        .map(|(name, &kind)| Column { name, kind })
        .collect();
    let records: Vec<PlayerRecord> = rows
        .into_iter()
        .map(|row| {
            PlayerRecord::new(
                row.into_iter()
                    .zip(&kinds)
                    .map(|(cell, &kind)| coerce(cell, kind))
                    .collect(),
            )
        })
        .collect();

    debug!(%category, rows_in = before, rows_out = records.len(), "normalized table");
    NormalizedTable::new(category, columns, records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
