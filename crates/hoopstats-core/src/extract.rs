// Table extraction: stats page markup -> RawTable.
//
// The first `tr` of the page carries the column names in its `th` cells; the
// leading one is the rank column and is dropped. Every later `tr` is a data
// row whose values sit in `td` cells (the rank is a `th` there, so it never
// shows up). Rows without any `td` are the repeated header / divider rows the
// page inserts every few dozen players.

use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::model::{RawTable, StatCategory};

/// Extract the primary stats table from `markup`.
///
/// Never fails: markup without a recognizable header yields an empty table,
/// which is what a season without this category looks like downstream.
pub fn extract(markup: &str, category: StatCategory) -> RawTable {
    let document = Html::parse_document(markup);
    let mut rows = document.select(selector!("tr"));

    let Some(header_row) = rows.next() else {
        debug!(%category, "no table rows in markup");
        return RawTable::default();
    };

    let header: Vec<String> = header_row
        .select(selector!("th"))
        .skip(1)
        .map(cell_text)
        .collect();
    if header.is_empty() {
        debug!(%category, "first row has no header cells beyond the rank");
        return RawTable::default();
    }

    let width = header.len();
    let mut data = Vec::new();
    for (index, row) in rows.enumerate() {
        let mut cells: Vec<Option<String>> =
            row.select(selector!("td")).map(|td| Some(cell_text(td))).collect();
        if cells.is_empty() {
            data.push(vec![None; width]);
            continue;
        }
        if cells.len() > width {
            warn!(
                %category,
                row = index,
                cells = cells.len(),
                width,
                "data row wider than header, extra cells dropped"
            );
        }
        cells.resize(width, None);
        data.push(cells);
    }

    debug!(%category, columns = width, rows = data.len(), "extracted table");
    RawTable { header, rows: data }
}

/// Visible text of a cell with non-breaking spaces folded and ends trimmed.
fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
