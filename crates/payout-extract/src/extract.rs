//! Attribute extractors: stateless functions mapping a text span to zero or
//! more typed attribute values.
//!
//! Each function covers one attribute family and is independent of the
//! others; header and cell interpretation call the same functions and differ
//! only in which results they let override previously-set fields. Patterns
//! are regular expressions over free text, not a grammar: the input corpus is
//! a set of known, evolving phrasings.

use once_cell::sync::Lazy;
use payout_lexicon as lexicon;
use regex::Regex;

/// Canonical vehicle category implied by header/cell keywords.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VehicleCategory {
    Gcv,
    Pcv,
    Misc,
}

impl VehicleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleCategory::Gcv => "GCV",
            VehicleCategory::Pcv => "PCV",
            VehicleCategory::Misc => "MISC",
        }
    }

    /// Product type implied by the category.
    pub fn product_type(self) -> &'static str {
        match self {
            VehicleCategory::Gcv => "COMMERCIAL VEHICLE",
            VehicleCategory::Pcv => "PASSENGER CARRYING VEHICLE",
            VehicleCategory::Misc => "MISCELLANEOUS VEHICLE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "GCV" => Some(VehicleCategory::Gcv),
            "PCV" => Some(VehicleCategory::Pcv),
            "MISC" => Some(VehicleCategory::Misc),
            _ => None,
        }
    }
}

/// Category keyword match (GCV/SCV/LCV/MHCV, PCV, MISC variants).
pub fn vehicle_category(text: &str) -> Option<VehicleCategory> {
    lexicon::vehicle_categories()
        .match_longest(text)
        .and_then(VehicleCategory::from_code)
}

/// All specific-vehicle keywords in the text, canonicalised, first
/// occurrence order, longest phrase winning (`SCHOOL BUS` over `BUS`).
pub fn specific_vehicles(text: &str) -> Vec<String> {
    lexicon::specific_vehicles()
        .match_all(text)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Category implied by a specific vehicle, if any. Bus and taxi variants are
/// passenger-carrying; plant and agricultural machines are miscellaneous.
pub fn category_for_vehicle(vehicle: &str) -> Option<VehicleCategory> {
    match vehicle {
        "TAXI" => Some(VehicleCategory::Pcv),
        v if v.contains("BUS") => Some(VehicleCategory::Pcv),
        "CRANES" | "TRACTOR" | "CE" | "BACKHOELOADER" => Some(VehicleCategory::Misc),
        _ => None,
    }
}

static WHEELER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b([23]W)\b").expect("valid regex"));

/// `2W`/`3W` token, used only when no more specific vehicle was found.
pub fn wheeler(text: &str) -> Option<&'static str> {
    let m = WHEELER.captures(text)?;
    match m.get(1)?.as_str().to_uppercase().as_str() {
        "2W" => Some("2W"),
        "3W" => Some("3W"),
        _ => None,
    }
}

/// Fuel-type keywords; a header can legitimately list several.
pub fn fuel_types(text: &str) -> Vec<String> {
    lexicon::fuel_types()
        .match_all(text)
        .into_iter()
        .map(str::to_string)
        .collect()
}

static AGE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+\s*-\s*\d+)\s*(?:YRS?|YEARS?|AGE)\b").expect("valid regex"));
static AGE_CMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([<>]=?)\s*(\d+)\s*(?:YRS?|YEARS?|AGE)\b").expect("valid regex"));
static AGE_ABOVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bABOVE\s*(\d+)\s*(?:YRS?|YEARS?|AGE)\b").expect("valid regex"));
static AGE_UPTO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bUPTO\s*(\d+)\s*(?:YRS?|YEARS?|AGE)\b").expect("valid regex"));
static AGE_PLUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*\+\s*(?:YRS?|YEARS?|AGE)\b").expect("valid regex"));
static AGE_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:ST|ND|RD|TH))\s*YEAR\b").expect("valid regex"));

/// Literal `NEW`/`OLD` age marker. Headers use only this form; numeric
/// ranges belong to cell-level parsing.
pub fn literal_age(text: &str) -> Option<&'static str> {
    if lexicon::contains_word(text, "NEW") {
        Some("NEW")
    } else if lexicon::contains_word(text, "OLD") {
        Some("OLD")
    } else {
        None
    }
}

/// Age bucket in any recognised phrasing, normalised to a canonical form:
/// unit words collapse to `YRS`, internal whitespace is stripped, and
/// `ABOVE n` becomes `>n`. E.g. `above 5 years` -> `>5YRS`.
pub fn age_bucket(text: &str) -> Option<String> {
    if let Some(lit) = literal_age(text) {
        return Some(lit.to_string());
    }
    if let Some(c) = AGE_RANGE.captures(text) {
        let range: String = c[1].chars().filter(|ch| !ch.is_whitespace()).collect();
        return Some(format!("{range}YRS"));
    }
    if let Some(c) = AGE_CMP.captures(text) {
        return Some(format!("{}{}YRS", &c[1], &c[2]));
    }
    if let Some(c) = AGE_ABOVE.captures(text) {
        return Some(format!(">{}YRS", &c[1]));
    }
    if let Some(c) = AGE_UPTO.captures(text) {
        return Some(format!("UPTO{}YRS", &c[1]));
    }
    if let Some(c) = AGE_PLUS.captures(text) {
        return Some(format!("{}+YRS", &c[1]));
    }
    if let Some(c) = AGE_ORDINAL.captures(text) {
        return Some(format!("{} YEAR", c[1].to_uppercase()));
    }
    None
}

static GVW_CMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([<>]=?)\s*(\d+(?:\.\d+)?)\s*GVW").expect("valid regex"));
static GVW_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?\s*-\s*\d+(?:\.\d+)?)\s*T\b").expect("valid regex"));
static GVW_T_CMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([<>]=?)\s*(\d+(?:\.\d+)?)\s*T\b").expect("valid regex"));

/// GVW banding: comparison with a `GVW` suffix, tonnage range, or tonnage
/// comparison. Unit suffixes are dropped; `<2450 GVW` -> `<2450`.
pub fn gvw_bucket(text: &str) -> Option<String> {
    if let Some(c) = GVW_CMP.captures(text) {
        return Some(format!("{}{}", &c[1], &c[2]));
    }
    if let Some(c) = GVW_RANGE.captures(text) {
        return Some(c[1].chars().filter(|ch| !ch.is_whitespace()).collect());
    }
    if let Some(c) = GVW_T_CMP.captures(text) {
        return Some(format!("{}{}", &c[1], &c[2]));
    }
    None
}

static HP_CMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([<>]=?)\s*(\d+)\s*HP\b").expect("valid regex"));
static HP_ABOVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bABOVE\s*(\d+)\s*HP\b").expect("valid regex"));
static CC_CMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([<>]=?)\s*(\d+)\s*CC\b").expect("valid regex"));

/// Engine spec: HP comparison checked before CC. `above 50HP` -> `>50HP`.
pub fn engine_spec(text: &str) -> Option<String> {
    if let Some(c) = HP_CMP.captures(text) {
        return Some(format!("{}{}HP", &c[1], &c[2]));
    }
    if let Some(c) = HP_ABOVE.captures(text) {
        return Some(format!(">{}HP", &c[1]));
    }
    if let Some(c) = CC_CMP.captures(text) {
        return Some(format!("{}{}CC", &c[1], &c[2]));
    }
    None
}

static SEAT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:BUS|SEATER)\b").expect("valid regex"));
static SEAT_COMPOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)>\s*(\d+)\s*UPTO\s*(\d+)\s*SEATER").expect("valid regex"));
static SEAT_CMP_SEATER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([<>]=?)\s*(\d+)\s*SEATER").expect("valid regex"));
static SEAT_CMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([<>]=?)\s*(\d+)\b").expect("valid regex"));
static SEAT_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\s*-\s*\d+)\b").expect("valid regex"));

/// Seating capacity, only meaningful in a passenger-carrying context
/// (`pcv_context`) or when the text itself mentions `BUS`/`SEATER`. When a
/// keyword is present, the search is restricted to the text after it so GVW
/// and engine numbers earlier in the span are not misread as seat counts.
pub fn seating_capacity(text: &str, pcv_context: bool) -> Option<String> {
    let keyword = SEAT_KEYWORD.find(text);
    if !pcv_context && keyword.is_none() {
        return None;
    }
    let scope = match keyword {
        Some(m) => &text[m.end()..],
        None => text,
    };
    if let Some(c) = SEAT_COMPOUND.captures(scope) {
        return Some(format!(">{} UPTO {}", &c[1], &c[2]));
    }
    if let Some(c) = SEAT_CMP_SEATER.captures(scope) {
        return Some(format!("{}{}", &c[1], &c[2]));
    }
    if let Some(c) = SEAT_CMP.captures(scope) {
        return Some(format!("{}{}", &c[1], &c[2]));
    }
    if let Some(c) = SEAT_RANGE.captures(scope) {
        return Some(c[1].chars().filter(|ch| !ch.is_whitespace()).collect());
    }
    None
}

/// Plan-type keyword mapped to its canonical code, first match wins.
pub fn plan_type(text: &str) -> Option<String> {
    lexicon::plan_types().match_longest(text).map(str::to_string)
}

/// Region-code override. A known cluster code mutates the record's region
/// only when the same span qualifies it with `ONLY` or an adjacent
/// `IN <code>`; a bare mention is descriptive text, not an override.
pub fn region_override(text: &str) -> Option<String> {
    let m = lexicon::cluster_codes().find(text)?;
    if lexicon::contains_word(text, "ONLY") || preceded_by_in(text, m.start) {
        Some(m.canonical.to_string())
    } else {
        None
    }
}

fn preceded_by_in(text: &str, code_start: usize) -> bool {
    let before = text[..code_start].trim_end().to_uppercase();
    before.ends_with("IN")
        && before[..before.len() - 2]
            .chars()
            .next_back()
            .map(|c| !c.is_ascii_alphanumeric())
            .unwrap_or(true)
}

static EXPLICIT_PCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?%").expect("valid regex"));
static BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*$").expect("valid regex"));

/// One percentage occurrence inside a line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Percent {
    pub start: usize,
    pub end: usize,
    pub value: String,
}

/// All explicit `N%`/`N.M%` occurrences in a line, left to right.
pub fn find_percentages(line: &str) -> Vec<Percent> {
    EXPLICIT_PCT
        .find_iter(line)
        .map(|m| Percent {
            start: m.start(),
            end: m.end(),
            value: m.as_str().to_string(),
        })
        .collect()
}

/// Payout value of a whole cell: an explicit percentage anywhere, or a bare
/// number making up the entire cell (the whole-cell requirement is the
/// unit-suffix guard: `2450 GVW` or `40T` never qualifies).
pub fn payout_value(text: &str) -> Option<String> {
    if let Some(m) = EXPLICIT_PCT.find(text) {
        return Some(m.as_str().to_string());
    }
    BARE_NUMBER
        .captures(text)
        .map(|c| format!("{}%", &c[1]))
}

/// Whether a payout value is actually a region-code name leaked into the
/// rate column (a known corruption in source grids). Such segments are
/// skipped rather than emitted as nonsense rates.
pub fn is_region_like_payout(po: &str, row_region: &str) -> bool {
    let norm = |s: &str| -> String {
        let mut t = s.to_uppercase();
        t = t.replace("RTOS", " ").replace("RTO", " ");
        t.trim().trim_end_matches('%').trim().to_string()
    };
    let candidate = norm(po);
    if candidate.is_empty() {
        return false;
    }
    if candidate == norm(row_region) {
        return true;
    }
    lexicon::cluster_codes()
        .canonical_values()
        .any(|code| norm(code) == candidate)
}

static SLAB_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)CV\s*AGENCY\s*GRID\s*([A-Z]+(?:UARY|BRUARY|RCH|RIL|MAY|JUNE|JULY|GUST|TEMBER|TOBER|VEMBER|CEMBER)?'?\s*\d{2,4})",
    )
    .expect("valid regex")
});
static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]+)(\d+)$").expect("valid regex"));

/// Slab month from a sheet title such as `CV AGENCY GRID JUNE'24`,
/// normalised to `Mmm` plus a two-digit year (`Jun24`).
pub fn slab_month(text: &str) -> Option<String> {
    let c = SLAB_MONTH.captures(text)?;
    let raw: String = c[1]
        .to_uppercase()
        .chars()
        .filter(|ch| *ch != '\'' && !ch.is_whitespace())
        .collect();
    let Some(my) = MONTH_YEAR.captures(&raw) else {
        return Some(raw);
    };
    let month = &my[1][..my[1].len().min(3)];
    let mut year = my[2].to_string();
    if year.len() == 4 {
        year = year[2..].to_string();
    }
    let mut chars = month.chars();
    let month_cap = match chars.next() {
        Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
        None => return Some(raw),
    };
    Some(format!("{month_cap}{year}"))
}
