// Dataset joiner: inner join of two normalized tables on (Player, Age).

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::{
    CellValue, Column, IdentityKey, MergedTable, NormalizedTable, Tabular, AGE_COLUMN,
    PLAYER_COLUMN,
};

const KEY_COLUMNS: [&str; 2] = [PLAYER_COLUMN, AGE_COLUMN];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => f.write_str("first"),
            Side::B => f.write_str("second"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("{side} table has no `{column}` column; nothing to join on")]
    SchemaMismatch { side: Side, column: &'static str },

    #[error("both tables use the label `{0}`; colliding columns cannot be told apart")]
    AmbiguousLabels(String),

    #[error("merged table would carry column `{0}` twice")]
    DuplicateColumn(String),
}

/// Join `a` and `b`, labelling colliding columns with each table's category.
pub fn merge(a: &NormalizedTable, b: &NormalizedTable) -> Result<MergedTable, MergeError> {
    merge_labeled(a, a.category().label(), b, b.category().label())
}

/// Join `a` and `b` on (Player, Age), keeping only identities present in
/// both, in `a`'s row order.
///
/// Key columns appear once, where `a` has them. A non-key column name that
/// both sides carry becomes `<name>_<label>` on each side.
pub fn merge_labeled(
    a: &NormalizedTable,
    label_a: &str,
    b: &NormalizedTable,
    label_b: &str,
) -> Result<MergedTable, MergeError> {
    require_keys(a, Side::A)?;
    require_keys(b, Side::B)?;
    if label_a == label_b {
        return Err(MergeError::AmbiguousLabels(label_a.to_string()));
    }

    let names_a: HashSet<&str> = a.column_names().into_iter().collect();
    let names_b: HashSet<&str> = b.column_names().into_iter().collect();
    let rename = |column: &Column, label: &str, other: &HashSet<&str>| -> Column {
        let name = column.name.as_str();
        if !KEY_COLUMNS.contains(&name) && other.contains(name) {
            Column {
                name: format!("{name}_{label}"),
                kind: column.kind,
            }
        } else {
            column.clone()
        }
    };

    let b_keep: Vec<usize> = b
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| !KEY_COLUMNS.contains(&c.name.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut columns: Vec<Column> = a.columns().iter().map(|c| rename(c, label_a, &names_b)).collect();
    columns.extend(b_keep.iter().map(|&i| rename(&b.columns()[i], label_b, &names_a)));

    // A suffixed name can land on a column the other side already has.
    let mut emitted: HashSet<&str> = HashSet::with_capacity(columns.len());
    if let Some(dup) = columns.iter().find(|c| !emitted.insert(c.name.as_str())) {
        return Err(MergeError::DuplicateColumn(dup.name.clone()));
    }

    let b_index: HashMap<IdentityKey, usize> = (0..b.row_count())
        .rev()
        .filter_map(|i| b.identity(i).map(|key| (key, i)))
        .collect();

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for i in 0..a.row_count() {
        let Some(key) = a.identity(i) else { continue };
        let Some(&j) = b_index.get(&key) else { continue };
        let b_row = b.row(j);
        let mut row = a.row(i).to_vec();
        row.extend(b_keep.iter().map(|&k| b_row[k].clone()));
        rows.push(row);
    }

    debug!(
        left = a.row_count(),
        right = b.row_count(),
        merged = rows.len(),
        "merged tables"
    );
    Ok(MergedTable::new(
        columns,
        rows,
        (label_a.to_string(), label_b.to_string()),
    ))
}

fn require_keys(table: &NormalizedTable, side: Side) -> Result<(), MergeError> {
    for column in KEY_COLUMNS {
        if table.column_index(column).is_none() {
            return Err(MergeError::SchemaMismatch { side, column });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
