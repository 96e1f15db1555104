//! Shared types for the payout-grid extraction engine.
//!
//! The output side is a fixed 20-field flat schema ([`PayoutRecord`]); the
//! input side is a rectangular grid of raw cell text ([`Grid`]) as handed over
//! by whatever loaded the spreadsheet. Field order in the schema is part of
//! the contract with downstream sinks, so it is spelled out once in
//! [`FIELD_NAMES`] and [`PayoutRecord::values`] and nowhere else.
//!
//! A field holding `None` means "not determined by parsing", not "explicitly
//! blank"; sinks serialise it as an empty column but never drop it.

use serde::{Deserialize, Serialize};

/// Column names of the output schema, in emission order.
pub const FIELD_NAMES: [&str; 20] = [
    "cluster_code",
    "bike_make",
    "model",
    "plan_type",
    "engine_type",
    "fuel_type",
    "plan_subtype",
    "add_on",
    "plan_term",
    "business_slab",
    "age",
    "po_percent",
    "slab_month",
    "remark",
    "product_type",
    "ncb",
    "vehicle",
    "veh_type",
    "seating_cap",
    "gvw",
];

/// One flattened payout rule: a single (region, attribute-combination, rate)
/// tuple. Records are value objects; once emitted they are never mutated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub cluster_code: Option<String>,
    pub bike_make: Option<String>,
    pub model: Option<String>,
    pub plan_type: Option<String>,
    pub engine_type: Option<String>,
    pub fuel_type: Option<String>,
    pub plan_subtype: Option<String>,
    pub add_on: Option<String>,
    pub plan_term: Option<String>,
    pub business_slab: Option<String>,
    pub age: Option<String>,
    pub po_percent: Option<String>,
    pub slab_month: Option<String>,
    pub remark: Option<String>,
    pub product_type: Option<String>,
    pub ncb: Option<String>,
    pub vehicle: Option<String>,
    pub veh_type: Option<String>,
    pub seating_cap: Option<String>,
    pub gvw: Option<String>,
}

impl PayoutRecord {
    /// Field values in [`FIELD_NAMES`] order, for tabular sinks.
    pub fn values(&self) -> [Option<&str>; 20] {
        [
            self.cluster_code.as_deref(),
            self.bike_make.as_deref(),
            self.model.as_deref(),
            self.plan_type.as_deref(),
            self.engine_type.as_deref(),
            self.fuel_type.as_deref(),
            self.plan_subtype.as_deref(),
            self.add_on.as_deref(),
            self.plan_term.as_deref(),
            self.business_slab.as_deref(),
            self.age.as_deref(),
            self.po_percent.as_deref(),
            self.slab_month.as_deref(),
            self.remark.as_deref(),
            self.product_type.as_deref(),
            self.ncb.as_deref(),
            self.vehicle.as_deref(),
            self.veh_type.as_deref(),
            self.seating_cap.as_deref(),
            self.gvw.as_deref(),
        ]
    }
}

/// Rectangular grid of raw cell text for one sheet. Blank cells are empty
/// strings; reads outside the stored rows/columns also yield the empty
/// string, so callers can address any coordinate without bounds checks.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row. Rows may be ragged as loaded; the walker
    /// treats the grid as rectangular at this width.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Total number of cells, for request-size limits at the service edge.
    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}
