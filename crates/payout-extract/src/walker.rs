//! Table traversal: one located table, driven row by row.
//!
//! A table starts at its `RTO CLUSTER` header row. Every non-empty cell to
//! the right of the header label is a product column; every row beneath it
//! names a region cluster in the first column and carries one rate cell per
//! product column. Traversal ends at the first empty region cell or at a
//! following table's header row.

use std::collections::BTreeMap;

use payout_lexicon as lexicon;
use payout_types::{Grid, PayoutRecord};

use crate::cell::{self, TableContext};
use crate::expand;
use crate::header::HeaderProfile;

/// Marker text identifying a table's header row.
pub const HEADER_MARKER: &str = "RTO CLUSTER";

/// A located table inside a grid. Column bounds are half-open; `col_end`
/// is the grid width for the rightmost table, or the next table's region
/// column when tables sit side by side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableSpan {
    pub header_row: usize,
    pub region_col: usize,
    pub col_end: usize,
    /// Title recovered above the table, present for second and later
    /// tables on a sheet.
    pub title: Option<String>,
}

/// Flatten a single table into records. `slab_month` stamps every record
/// with the grid's effective month when the sheet declares one.
pub fn walk_table(grid: &Grid, span: &TableSpan, slab_month: Option<&str>) -> Vec<PayoutRecord> {
    let ctx = span
        .title
        .as_deref()
        .map(TableContext::parse)
        .unwrap_or_default();

    // Headers parse once per column, not once per cell.
    let mut profiles: BTreeMap<usize, HeaderProfile> = BTreeMap::new();
    for col in span.region_col + 1..span.col_end {
        let text = grid.cell(span.header_row, col);
        if lexicon::clean_text(text).is_empty() {
            continue;
        }
        let mut profile = HeaderProfile::parse(text);
        profile.base.slab_month = slab_month.map(str::to_string);
        profiles.insert(col, profile);
    }
    if profiles.is_empty() {
        tracing::debug!(header_row = span.header_row, "table has no product columns");
        return Vec::new();
    }

    let mut out = Vec::new();
    for row in span.header_row + 1..grid.row_count() {
        let region = lexicon::clean_text(grid.cell(row, span.region_col)).to_uppercase();
        if region.is_empty() || region.contains(HEADER_MARKER) {
            break;
        }
        for (col, profile) in &profiles {
            let raw = grid.cell(row, *col);
            if lexicon::clean_text(raw).is_empty() {
                continue;
            }
            let records = cell::interpret_cell(raw, profile, &region, &ctx);
            out.extend(expand::expand_all(records, profile));
        }
    }
    tracing::debug!(
        header_row = span.header_row,
        columns = profiles.len(),
        records = out.len(),
        "flattened table"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn span(header_row: usize, region_col: usize, col_end: usize) -> TableSpan {
        TableSpan {
            header_row,
            region_col,
            col_end,
            title: None,
        }
    }

    #[test]
    fn walks_rows_and_columns() {
        let g = grid(&[
            &["RTO CLUSTER", "GCV New Diesel", "PCV Taxi"],
            &["MH01", "25%", "30%"],
            &["GJ1", "35%", "Decline"],
        ]);
        let recs = walk_table(&g, &span(0, 0, 3), Some("Jun24"));
        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0].cluster_code.as_deref(), Some("MH01"));
        assert_eq!(recs[0].po_percent.as_deref(), Some("25%"));
        assert_eq!(recs[0].fuel_type.as_deref(), Some("DIESEL"));
        assert_eq!(recs[0].slab_month.as_deref(), Some("Jun24"));
        assert_eq!(recs[1].veh_type.as_deref(), Some("PCV"));
        assert_eq!(recs[1].vehicle.as_deref(), Some("TAXI"));
        assert_eq!(recs[3].po_percent.as_deref(), Some("DECLINE"));
    }

    #[test]
    fn stops_at_empty_region_cell() {
        let g = grid(&[
            &["RTO CLUSTER", "GCV Diesel"],
            &["MH01", "25%"],
            &["", "ignored"],
            &["GJ1", "35%"],
        ]);
        let recs = walk_table(&g, &span(0, 0, 2), None);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].cluster_code.as_deref(), Some("MH01"));
    }

    #[test]
    fn stops_at_following_header_row() {
        let g = grid(&[
            &["RTO CLUSTER", "GCV Diesel"],
            &["MH01", "25%"],
            &["RTO CLUSTER", "PCV Bus"],
            &["GJ1", "35%"],
        ]);
        let recs = walk_table(&g, &span(0, 0, 2), None);
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn skips_blank_columns_and_cells() {
        let g = grid(&[
            &["RTO CLUSTER", "", "GCV Diesel"],
            &["MH01", "junk", "25%"],
            &["GJ1", "", ""],
        ]);
        let recs = walk_table(&g, &span(0, 0, 3), None);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].cluster_code.as_deref(), Some("MH01"));
    }

    #[test]
    fn title_context_shapes_every_record() {
        let g = grid(&[
            &["RTO CLUSTER", "New"],
            &["MH01", "25%"],
        ]);
        let mut s = span(0, 0, 2);
        s.title = Some("CV AGENCY GRID MHCV AOTP TATA & AL ONLY".to_string());
        let recs = walk_table(&g, &s, None);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].bike_make.as_deref(), Some("TATA"));
        assert_eq!(recs[1].bike_make.as_deref(), Some("AL"));
        assert_eq!(recs[0].veh_type.as_deref(), Some("GCV"));
        assert_eq!(recs[0].plan_type.as_deref(), Some("SATP"));
    }

    #[test]
    fn empty_table_yields_nothing() {
        let g = grid(&[&["RTO CLUSTER"], &["MH01", "25%"]]);
        let recs = walk_table(&g, &span(0, 0, 1), None);
        assert!(recs.is_empty());
    }
}
