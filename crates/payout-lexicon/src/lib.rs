//! Static vocabularies for commercial-vehicle payout grids and the matchers
//! that apply them.
//!
//! Every vocabulary maps surface forms (including misspellings seen in real
//! grids, e.g. `TRACTER`) to a canonical value. Matching is case-insensitive
//! and whole-word, and a longer surface form always beats a shorter one it
//! contains: `ASHOK LEYLAND` is never misread as `AL` plus leftover text.
//! Callers never depend on vocabulary declaration order.
//!
//! The compiled matcher is a single alternation with branches sorted by
//! descending surface length; the regex engine's leftmost-first semantics
//! then gives "earliest position wins, longest form wins at that position",
//! which is exactly the contract.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// A matched span in the searched text plus its canonical value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VocabMatch<'v> {
    pub start: usize,
    pub end: usize,
    pub canonical: &'v str,
}

/// A case-insensitive, whole-word, longest-match-first keyword matcher.
pub struct Vocabulary {
    pattern: Regex,
    canonical: HashMap<String, String>,
}

impl Vocabulary {
    /// Build from `(surface, canonical)` pairs. Surfaces may be multi-word
    /// phrases; they are matched with non-alphanumeric boundaries on both
    /// sides.
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let mut surfaces: Vec<String> = pairs.iter().map(|(s, _)| s.to_uppercase()).collect();
        surfaces.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        surfaces.dedup();

        let alternation = surfaces
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
            .expect("vocabulary surfaces compile to a valid regex");

        let canonical = pairs
            .iter()
            .map(|(s, c)| (s.to_uppercase(), c.to_uppercase()))
            .collect();

        Self { pattern, canonical }
    }

    /// Build from terms that are their own canonical value.
    pub fn from_terms(terms: &[&str]) -> Self {
        let pairs: Vec<(&str, &str)> = terms.iter().map(|t| (*t, *t)).collect();
        Self::new(&pairs)
    }

    /// Earliest match in the text, longest surface form winning at that
    /// position. Returns the canonical value.
    pub fn match_longest(&self, text: &str) -> Option<&str> {
        self.find(text).map(|m| m.canonical)
    }

    /// Earliest match with its span.
    pub fn find(&self, text: &str) -> Option<VocabMatch<'_>> {
        self.pattern.find(text).map(|m| VocabMatch {
            start: m.start(),
            end: m.end(),
            canonical: self.canonical_of(m.as_str()),
        })
    }

    /// All non-overlapping matches, left to right.
    pub fn find_iter<'v>(&'v self, text: &str) -> Vec<VocabMatch<'v>> {
        self.pattern
            .find_iter(text)
            .map(|m| VocabMatch {
                start: m.start(),
                end: m.end(),
                canonical: self.canonical_of(m.as_str()),
            })
            .collect()
    }

    /// Ordered set of canonical values: all matches left to right, duplicates
    /// removed keeping the first occurrence.
    pub fn match_all(&self, text: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for m in self.pattern.find_iter(text) {
            let canon = self.canonical_of(m.as_str());
            if !out.contains(&canon) {
                out.push(canon);
            }
        }
        out
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Canonical value for a known surface form (case-insensitive).
    pub fn canonical(&self, surface: &str) -> Option<&str> {
        self.canonical.get(&surface.to_uppercase()).map(String::as_str)
    }

    /// All canonical values, unordered and possibly repeated across synonyms.
    pub fn canonical_values(&self) -> impl Iterator<Item = &str> {
        self.canonical.values().map(String::as_str)
    }

    fn canonical_of(&self, matched: &str) -> &str {
        self.canonical
            .get(&matched.to_uppercase())
            .map(String::as_str)
            .expect("matched surface is in the vocabulary")
    }
}

/// OEM / bike makes seen in grid headers and cells.
pub fn bike_makes() -> &'static Vocabulary {
    static V: Lazy<Vocabulary> = Lazy::new(|| {
        Vocabulary::from_terms(&[
            "TATA",
            "AL",
            "ASHOK LEYLAND",
            "M&M",
            "MAHINDRA",
            "EICHER",
            "MARUTI",
            "MARUTI SUZUKI",
            "MARUTI SUPER CARRY",
            "PIAGGIO",
            "BAJAJ",
            "ATUL",
            "TVS",
            "TOYOTA",
            "FORCE MOTORS",
            "SML ISUZU",
            "SWARAJ MAZDA",
            "HINDUSTAN MOTORS",
            "MAHINDRA NAVISTAR",
            "BHARATBENZ",
            "SCANIA",
            "VOLVO",
        ])
    });
    &V
}

/// Special cluster / RTO codes that can label or override a row's region.
pub fn cluster_codes() -> &'static Vocabulary {
    static V: Lazy<Vocabulary> = Lazy::new(|| {
        Vocabulary::from_terms(&[
            "WB1",
            "DL",
            "NON DL RTO",
            "JK1 RTO",
            "GJ1 RTO",
            "UP1 EAST",
            "UK1 RTO",
            "UP EAST 1",
            "UP EAST1",
            "KA1 RTOS",
            "KA1 RTO",
            "TN10",
            "TN12",
            "TN02",
            "TN22",
            "TN04",
            "TN06",
            "TN09",
            "TN18",
            "TN19",
            "TN20",
            "TN11",
            "TN14",
            "KA01-05",
            "OD1",
            "PIMPRI",
            "PIMPRICHINCHWAD",
            "PIMPRI CHINCHWAD",
            "DELHI SURROUNDING RTO",
            "GJ1",
            "JK1",
        ])
    });
    &V
}

/// Vehicle-category codes mapped to their canonical category.
pub fn vehicle_categories() -> &'static Vocabulary {
    static V: Lazy<Vocabulary> = Lazy::new(|| {
        Vocabulary::new(&[
            ("GCV", "GCV"),
            ("SCV", "GCV"),
            ("LCV", "GCV"),
            ("MHCV", "GCV"),
            ("PCV", "PCV"),
            ("PCVTAXI", "PCV"),
            ("MISC D CE", "MISC"),
            ("MIS D CE", "MISC"),
            ("MISC", "MISC"),
        ])
    });
    &V
}

/// Specific vehicle keywords; the common `TRACTER` misspelling canonicalises
/// to `TRACTOR`.
pub fn specific_vehicles() -> &'static Vocabulary {
    static V: Lazy<Vocabulary> = Lazy::new(|| {
        Vocabulary::new(&[
            ("TANKER", "TANKER"),
            ("TIPPER", "TIPPER"),
            ("TRUCK", "TRUCK"),
            ("TRAILER", "TRAILER"),
            ("DUMPER", "DUMPER"),
            ("CRANES", "CRANES"),
            ("TRACTOR", "TRACTOR"),
            ("TRACTER", "TRACTOR"),
            ("SCHOOL BUS", "SCHOOL BUS"),
            ("STAFF BUS", "STAFF BUS"),
            ("BUS", "BUS"),
            ("TAXI", "TAXI"),
            ("CE", "CE"),
            ("BACKHOELOADER", "BACKHOELOADER"),
        ])
    });
    &V
}

pub fn fuel_types() -> &'static Vocabulary {
    static V: Lazy<Vocabulary> = Lazy::new(|| {
        Vocabulary::from_terms(&["ELECTRIC", "PETROL", "CNG", "BIFUEL", "DIESEL"])
    });
    &V
}

/// Plan-type keywords mapped to canonical plan codes.
pub fn plan_types() -> &'static Vocabulary {
    static V: Lazy<Vocabulary> = Lazy::new(|| {
        Vocabulary::new(&[
            ("AOTP", "SATP"),
            ("SATP", "SATP"),
            ("TP", "SATP"),
            ("ON OD", "SAOD"),
            ("OD", "SAOD"),
            ("COMP", "COMP"),
        ])
    });
    &V
}

/// Cell values that carry no payout data; they pass through verbatim.
pub const NON_DATA_TOKENS: [&str; 7] =
    ["DECLINE", "NO BUSINESS", "CC", "NO BIZ", "#REF!", "TBD", "IRDA"];

/// Whether a cleaned, upper-cased cell equals one of the non-data tokens.
pub fn is_non_data(cleaned_upper: &str) -> bool {
    NON_DATA_TOKENS.contains(&cleaned_upper)
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static LINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

/// Collapse all whitespace (including newlines) to single spaces and trim.
/// Idempotent: cleaning cleaned text is a no-op.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Normalise line endings and per-line whitespace, dropping blank lines.
/// Unlike [`clean_text`] this preserves the line structure that the cell
/// interpreter segments on.
pub fn clean_lines(text: &str) -> Vec<String> {
    text.replace('\r', "\n")
        .split('\n')
        .map(|line| LINE_SPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Case-insensitive whole-word containment check, without compiling a regex
/// per lookup. Boundaries are non-alphanumeric characters or text edges.
pub fn contains_word(text: &str, word: &str) -> bool {
    let haystack = text.to_uppercase();
    let needle = word.to_uppercase();
    if needle.is_empty() {
        return false;
    }
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        let left_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let right_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if left_ok && right_ok {
            return true;
        }
        from = start + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_form_wins_over_contained_code() {
        let makes = bike_makes();
        assert_eq!(
            makes.match_all("ASHOK LEYLAND AND AL AND TATA"),
            vec!["ASHOK LEYLAND", "AL", "TATA"]
        );
        // The span containing the long form is never attributed to "AL".
        let first = makes.find("rates for ASHOK LEYLAND only").unwrap();
        assert_eq!(first.canonical, "ASHOK LEYLAND");
        assert_eq!(
            &"rates for ASHOK LEYLAND only"[first.start..first.end],
            "ASHOK LEYLAND"
        );
    }

    #[test]
    fn matching_is_whole_word() {
        assert!(bike_makes().match_longest("METAL GRID").is_none());
        assert!(bike_makes().match_longest("TALC").is_none());
        assert_eq!(bike_makes().match_longest("m&m new"), Some("M&M"));
        assert_eq!(
            cluster_codes().match_longest("in NON DL RTO only"),
            Some("NON DL RTO")
        );
    }

    #[test]
    fn canonical_mapping_applies() {
        assert_eq!(vehicle_categories().match_longest("MHCV AOTP"), Some("GCV"));
        assert_eq!(specific_vehicles().match_longest("TRACTER 45%"), Some("TRACTOR"));
        assert_eq!(plan_types().match_longest("on od rates"), Some("SAOD"));
        assert_eq!(plan_types().match_longest("AOTP"), Some("SATP"));
    }

    #[test]
    fn match_all_dedupes_preserving_order() {
        let fuels = fuel_types();
        assert_eq!(
            fuels.match_all("Diesel/Petrol/CNG and diesel again"),
            vec!["DIESEL", "PETROL", "CNG"]
        );
    }

    #[test]
    fn school_bus_beats_bus() {
        let v = specific_vehicles();
        assert_eq!(v.match_longest("SCHOOL BUS <18 seater"), Some("SCHOOL BUS"));
        assert_eq!(v.match_all("SCHOOL BUS AND STAFF BUS"), vec!["SCHOOL BUS", "STAFF BUS"]);
    }

    #[test]
    fn cleaning_is_idempotent() {
        let raw = "  GCV\n<2450 GVW\r\n  New  Petrol ";
        let once = clean_text(raw);
        assert_eq!(once, "GCV <2450 GVW New Petrol");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn clean_lines_preserves_structure() {
        let lines = clean_lines("1-5 yrs  45%\r\n\r\n>5 yrs 55%\n");
        assert_eq!(lines, vec!["1-5 yrs 45%", ">5 yrs 55%"]);
    }

    #[test]
    fn non_data_tokens_are_exact() {
        assert!(is_non_data("DECLINE"));
        assert!(is_non_data("#REF!"));
        assert!(!is_non_data("DECLINED"));
    }

    #[test]
    fn contains_word_respects_boundaries() {
        assert!(contains_word("TATA only in WB1", "ONLY"));
        assert!(!contains_word("THE ONLYEST", "ONLY"));
        assert!(contains_word("taxi (excluding school bus)", "EXCLUDING"));
    }
}
