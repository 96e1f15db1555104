//! Table and metadata location inside a raw grid.
//!
//! A sheet holds one or more tables, each anchored by a cell containing
//! `RTO CLUSTER`. Tables can sit side by side, in which case the left
//! table's columns end where the right table's region column begins.
//! Second and later tables usually carry their own title a few rows above
//! the anchor, naming the product scope of that table.

use payout_extract::{TableSpan, extract, walker::HEADER_MARKER};
use payout_lexicon as lexicon;
use payout_types::Grid;

/// How many rows above a table anchor the title scan reaches.
const TITLE_SCAN_ROWS: usize = 5;
/// Horizontal reach of the title scan around the anchor column.
const TITLE_SCAN_SPREAD: usize = 5;
/// Slab-month scan window at the top-left of the sheet.
const SLAB_SCAN_ROWS: usize = 15;
const SLAB_SCAN_COLS: usize = 10;

/// Find every table in the grid, in reading order. An empty result means
/// the grid has no recognisable table at all.
pub fn locate_tables(grid: &Grid) -> Vec<TableSpan> {
    let mut anchors: Vec<(usize, usize)> = Vec::new();
    for row in 0..grid.row_count() {
        for col in 0..grid.col_count() {
            let text = lexicon::clean_text(grid.cell(row, col)).to_uppercase();
            if text.contains(HEADER_MARKER) {
                anchors.push((row, col));
            }
        }
    }

    anchors
        .iter()
        .enumerate()
        .map(|(i, &(row, col))| {
            let col_end = anchors
                .iter()
                .filter(|&&(r, c)| r == row && c > col)
                .map(|&(_, c)| c)
                .min()
                .unwrap_or_else(|| grid.col_count());
            TableSpan {
                header_row: row,
                region_col: col,
                col_end,
                title: if i > 0 { find_title(grid, row, col) } else { None },
            }
        })
        .collect()
}

/// Look for a title cell above a later table's anchor. Titles repeat the
/// grid banner plus a product scope, so a candidate must mention both.
fn find_title(grid: &Grid, anchor_row: usize, anchor_col: usize) -> Option<String> {
    let row_start = anchor_row.saturating_sub(TITLE_SCAN_ROWS);
    let col_start = anchor_col.saturating_sub(TITLE_SCAN_SPREAD);
    let col_stop = anchor_col + TITLE_SCAN_SPREAD;
    for row in row_start..anchor_row {
        let mut cols: Vec<usize> = (col_start..=col_stop).collect();
        if !cols.contains(&1) {
            cols.push(1);
        }
        for col in cols {
            let text = lexicon::clean_text(grid.cell(row, col)).to_uppercase();
            if text.contains("GRID") && is_product_scope(&text) {
                return Some(text);
            }
        }
    }
    None
}

fn is_product_scope(text: &str) -> bool {
    text.contains("MHCV")
        || text.contains("LCV")
        || text.contains("AOTP")
        || text.contains("TATA & AL ONLY")
}

/// Scan the top-left corner of the sheet for the effective-month banner
/// (`CV AGENCY GRID JUNE'24`).
pub fn find_slab_month(grid: &Grid) -> Option<String> {
    for row in 0..grid.row_count().min(SLAB_SCAN_ROWS) {
        for col in 0..grid.col_count().min(SLAB_SCAN_COLS) {
            if let Some(month) = extract::slab_month(grid.cell(row, col)) {
                return Some(month);
            }
        }
    }
    None
}
