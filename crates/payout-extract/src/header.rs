//! Column-header interpretation.
//!
//! A product column header is a short free-text phrase ("GCV 3W Electric New
//! TATA & AL", "PCV BUS >18 upto 36 seater excluding school bus"). Parsing
//! it yields a partial record plus lists that later fan out each rate cell:
//! candidate bike makes, fuel types, specific vehicles, and exclusions.

use serde::Serialize;

use payout_lexicon as lexicon;
use payout_types::PayoutRecord;

use crate::extract::{self, VehicleCategory};

use once_cell::sync::Lazy;
use regex::Regex;

static EXCLUSION_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:EXCLUDING|EXCEPT)\b[^()]*").expect("valid regex"));
static PAREN_NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]*)\)").expect("valid regex"));

/// Everything a column header contributes to the rows beneath it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HeaderProfile {
    /// Partial record holding single-valued fields set by the header.
    pub base: PayoutRecord,
    /// Candidate makes named by the header, in order of appearance.
    pub bike_makes: Vec<String>,
    /// Fuel types the column covers; each expands to its own output row.
    pub fuel_types: Vec<String>,
    /// Specific vehicles the column covers; each expands to its own row.
    pub vehicles: Vec<String>,
    /// Makes ruled out by an EXCLUDING/EXCEPT clause.
    pub excluded_makes: Vec<String>,
    /// Vehicles ruled out by an EXCLUDING/EXCEPT clause.
    pub excluded_vehicles: Vec<String>,
}

impl HeaderProfile {
    /// Parse a raw header cell. Always succeeds; an unrecognisable header
    /// produces a profile whose base carries only the category default.
    pub fn parse(raw: &str) -> Self {
        let text = lexicon::clean_text(raw).to_uppercase();
        let mut profile = HeaderProfile::default();
        let mut remarks: Vec<String> = Vec::new();

        // Exclusion clauses come first so their makes/vehicles never land in
        // the positive lists below.
        for clause in EXCLUSION_CLAUSE.find_iter(&text) {
            let clause_text = clause.as_str();
            remarks.push(clause_text.trim().to_string());
            for make in lexicon::bike_makes().match_all(clause_text) {
                profile.excluded_makes.push(make.to_string());
            }
            for vehicle in lexicon::specific_vehicles().match_all(clause_text) {
                profile.excluded_vehicles.push(vehicle.to_string());
            }
        }
        let positive = EXCLUSION_CLAUSE.replace_all(&text, " ");

        let mut category = extract::vehicle_category(&positive);
        if let Some(cat) = category {
            profile.base.veh_type = Some(cat.as_str().to_string());
            // "MISC D CE" style headers also pin the vehicle itself.
            if cat == VehicleCategory::Misc && lexicon::contains_word(&positive, "CE") {
                profile.base.vehicle = Some("CE".to_string());
            }
        }

        // TAXI forces a passenger-carrying column even without a PCV token.
        if lexicon::contains_word(&positive, "TAXI")
            && !profile.excluded_vehicles.iter().any(|v| v == "TAXI")
        {
            profile.base.vehicle = Some("TAXI".to_string());
            if category.is_none() {
                category = Some(VehicleCategory::Pcv);
                profile.base.veh_type = Some("PCV".to_string());
            }
        }

        for vehicle in extract::specific_vehicles(&positive) {
            if profile.excluded_vehicles.iter().any(|v| *v == vehicle) {
                continue;
            }
            if profile.base.vehicle.is_none() {
                profile.base.vehicle = Some(vehicle.clone());
                if category.is_none()
                    && let Some(cat) = extract::category_for_vehicle(&vehicle)
                {
                    category = Some(cat);
                    profile.base.veh_type = Some(cat.as_str().to_string());
                }
            }
            profile.vehicles.push(vehicle);
        }
        if profile.base.vehicle.is_none()
            && let Some(w) = extract::wheeler(&positive)
        {
            profile.base.vehicle = Some(w.to_string());
        }

        profile.base.product_type = Some(
            category
                .map(VehicleCategory::product_type)
                .unwrap_or("COMMERCIAL VEHICLE")
                .to_string(),
        );

        // Headers only carry the literal NEW/OLD marker; numeric age bands
        // live in cells.
        profile.base.age = extract::literal_age(&positive).map(str::to_string);
        profile.fuel_types = extract::fuel_types(&positive);
        profile.base.gvw = extract::gvw_bucket(&positive);
        let pcv_context = category == Some(VehicleCategory::Pcv);
        profile.base.seating_cap = extract::seating_capacity(&positive, pcv_context);
        profile.base.engine_type = extract::engine_spec(&positive);
        profile.base.plan_type = extract::plan_type(&positive);

        // Parenthesised notes are remarks unless they are pure make lists.
        for note in PAREN_NOTE.captures_iter(&positive) {
            let inner = note[1].trim();
            if inner.is_empty() || is_pure_make_list(inner) {
                continue;
            }
            remarks.push(format!("({inner})"));
        }

        for make in lexicon::bike_makes().match_all(&positive) {
            if profile.excluded_makes.iter().any(|m| m == make) {
                continue;
            }
            profile.bike_makes.push(make.to_string());
        }

        remarks.dedup();
        if !remarks.is_empty() {
            profile.base.remark = Some(remarks.join(" | "));
        }
        profile
    }
}

/// A parenthesised note consisting only of make names and separators is a
/// make list, already captured by the make scan.
fn is_pure_make_list(inner: &str) -> bool {
    let mut rest = inner.to_string();
    for make in lexicon::bike_makes().match_all(inner) {
        rest = rest.replace(make, " ");
    }
    rest.chars()
        .all(|c| c.is_whitespace() || matches!(c, ',' | '&' | '/' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcv_header_sets_category_and_lists() {
        let p = HeaderProfile::parse("GCV 3W Electric New (TATA & AL)");
        assert_eq!(p.base.veh_type.as_deref(), Some("GCV"));
        assert_eq!(p.base.product_type.as_deref(), Some("COMMERCIAL VEHICLE"));
        assert_eq!(p.base.vehicle.as_deref(), Some("3W"));
        assert_eq!(p.base.age.as_deref(), Some("NEW"));
        assert_eq!(p.fuel_types, vec!["ELECTRIC".to_string()]);
        assert_eq!(p.bike_makes, vec!["TATA".to_string(), "AL".to_string()]);
        // Pure make list in parens is not a remark.
        assert_eq!(p.base.remark, None);
    }

    #[test]
    fn taxi_implies_pcv() {
        let p = HeaderProfile::parse("Taxi Petrol");
        assert_eq!(p.base.vehicle.as_deref(), Some("TAXI"));
        assert_eq!(p.base.veh_type.as_deref(), Some("PCV"));
        assert_eq!(
            p.base.product_type.as_deref(),
            Some("PASSENGER CARRYING VEHICLE")
        );
    }

    #[test]
    fn bus_header_reads_seating_after_keyword() {
        let p = HeaderProfile::parse("PCV BUS >18 upto 36 seater");
        assert_eq!(p.base.veh_type.as_deref(), Some("PCV"));
        assert_eq!(p.base.vehicle.as_deref(), Some("BUS"));
        assert_eq!(p.base.seating_cap.as_deref(), Some(">18 UPTO 36"));
    }

    #[test]
    fn exclusions_are_removed_from_positive_lists() {
        let p = HeaderProfile::parse("GCV Diesel excluding school bus & TATA");
        assert!(p.excluded_vehicles.iter().any(|v| v == "SCHOOL BUS"));
        assert!(p.excluded_makes.iter().any(|m| m == "TATA"));
        assert!(p.bike_makes.is_empty());
        assert!(p.vehicles.is_empty());
        let remark = p.base.remark.as_deref().unwrap_or("");
        assert!(remark.contains("EXCLUDING"));
    }

    #[test]
    fn misc_ce_header_pins_vehicle() {
        let p = HeaderProfile::parse("MISC D CE >50HP");
        assert_eq!(p.base.veh_type.as_deref(), Some("MISC"));
        assert_eq!(p.base.vehicle.as_deref(), Some("CE"));
        assert_eq!(p.base.engine_type.as_deref(), Some(">50HP"));
        assert_eq!(
            p.base.product_type.as_deref(),
            Some("MISCELLANEOUS VEHICLE")
        );
    }

    #[test]
    fn unknown_header_defaults_to_commercial() {
        let p = HeaderProfile::parse("growth slab");
        assert_eq!(p.base.product_type.as_deref(), Some("COMMERCIAL VEHICLE"));
        assert_eq!(p.base.veh_type, None);
        assert!(p.bike_makes.is_empty());
    }

    #[test]
    fn gvw_band_is_carried() {
        let p = HeaderProfile::parse("SCV <2450 GVW Diesel");
        assert_eq!(p.base.veh_type.as_deref(), Some("GCV"));
        assert_eq!(p.base.gvw.as_deref(), Some("<2450"));
        assert_eq!(p.fuel_types, vec!["DIESEL".to_string()]);
    }
}
