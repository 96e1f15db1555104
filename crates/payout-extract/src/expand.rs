//! Fan-out of interpreted records over header-level lists.
//!
//! A single column header can cover several fuel types and several specific
//! vehicles; each combination becomes its own output row. The expander also
//! enforces that a row never pins a make and a specific vehicle at once,
//! since the source grids treat those as alternative axes of the same slot.

use payout_types::PayoutRecord;

use crate::header::HeaderProfile;

/// Expand one interpreted record over the header's fuel and vehicle lists,
/// then split any make+vehicle collision into two rows.
pub fn expand(record: PayoutRecord, header: &HeaderProfile) -> Vec<PayoutRecord> {
    // A cell-level fuel condition beats the header list outright.
    let fuels: Vec<Option<String>> = if record.fuel_type.is_some() {
        vec![record.fuel_type.clone()]
    } else if header.fuel_types.is_empty() {
        vec![None]
    } else {
        header.fuel_types.iter().cloned().map(Some).collect()
    };

    let vehicles: Vec<Option<String>> = if header.vehicles.len() > 1 {
        header.vehicles.iter().cloned().map(Some).collect()
    } else {
        vec![record.vehicle.clone()]
    };

    let mut out = Vec::new();
    for fuel in &fuels {
        for vehicle in &vehicles {
            let mut r = record.clone();
            r.fuel_type.clone_from(fuel);
            r.vehicle.clone_from(vehicle);
            if r.bike_make.is_some() && r.vehicle.is_some() {
                let mut by_make = r.clone();
                by_make.vehicle = None;
                let mut by_vehicle = r;
                by_vehicle.bike_make = None;
                out.push(by_make);
                out.push(by_vehicle);
            } else {
                out.push(r);
            }
        }
    }
    out
}

/// Expand a whole batch of records against the same header.
pub fn expand_all(records: Vec<PayoutRecord>, header: &HeaderProfile) -> Vec<PayoutRecord> {
    records
        .into_iter()
        .flat_map(|r| expand(r, header))
        .collect()
}
