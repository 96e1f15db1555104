//! Interpretation engine for commercial-vehicle payout grids.
//!
//! The pipeline runs in four stages over a located table:
//!
//! 1. [`header::HeaderProfile`] reads each product-column header into a
//!    partial record plus fan-out lists (makes, fuels, vehicles) and
//!    exclusions.
//! 2. [`cell::interpret_cell`] segments each rate cell into (condition,
//!    rate) pairs and merges attributes over the header and the table
//!    context, later layers winning.
//! 3. [`expand`] fans each interpreted record out over the header's fuel
//!    and vehicle lists and splits make/vehicle collisions.
//! 4. [`walker::walk_table`] drives the above across a whole table.
//!
//! The attribute extractors themselves live in [`extract`] and are shared
//! by headers, cells, and table titles.

pub mod cell;
pub mod expand;
pub mod extract;
pub mod header;
pub mod walker;

pub use cell::{TableContext, interpret_cell};
pub use expand::expand_all;
pub use header::HeaderProfile;
pub use walker::{HEADER_MARKER, TableSpan, walk_table};
