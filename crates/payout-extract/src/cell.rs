//! Rate-cell interpretation.
//!
//! A rate cell is anything from a bare `25%` to a multi-line rule block
//! ("45% on TATA\n50% on AL\nCNG only"). Interpretation segments the cell
//! into (condition text, percentage) pairs, parses each side's attributes,
//! and merges them over the column header and table context. Later layers
//! win: table context, then header, then cell-wide condition lines, then
//! the segment's own text.

use once_cell::sync::Lazy;
use regex::Regex;

use payout_lexicon as lexicon;
use payout_types::PayoutRecord;

use crate::extract;
use crate::header::HeaderProfile;

/// Attributes contributed by a table title such as
/// `CV AGENCY GRID JUNE'24 MHCV AOTP TATA & AL ONLY`. Second and later
/// tables on a sheet carry their own title; the first table has none.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableContext {
    pub bike_makes: Vec<String>,
    pub veh_type: Option<String>,
    pub age: Option<String>,
    pub plan_type: Option<String>,
    pub remarks: Vec<String>,
}

impl TableContext {
    pub fn parse(title: &str) -> Self {
        let text = lexicon::clean_text(title).to_uppercase();
        let mut ctx = TableContext::default();
        if text.is_empty() {
            return ctx;
        }
        ctx.bike_makes = lexicon::bike_makes()
            .match_all(&text)
            .into_iter()
            .map(str::to_string)
            .collect();
        ctx.veh_type = extract::vehicle_category(&text).map(|c| c.as_str().to_string());
        ctx.age = extract::literal_age(&text).map(str::to_string);
        ctx.plan_type = extract::plan_type(&text);
        ctx.remarks.push(text);
        ctx
    }
}

static OTHERS_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?P<primary>.*?)\bOTHERS\b\s*[-:]?\s*(?P<rate>\d+(?:\.\d+)?%?)")
        .expect("valid regex")
});
static LABELLED_RATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:RTOS?\b)?\s*[-:\u{2013}]?\s*(\d+(?:\.\d+)?)\s*%?").expect("valid regex")
});
static PAREN_NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]*)\)").expect("valid regex"));

/// One (condition text, rate) pair carved out of a cell.
#[derive(Clone, Debug, Default)]
struct Segment {
    text: String,
    percent: Option<String>,
    /// Region code that directly labels this rate, e.g. `DL-30%`.
    region: Option<String>,
    /// Make pinned by an OTHERS split: the primary segment pins the first
    /// make named before OTHERS; the OTHERS segment pins no make at all.
    forced_make: Option<Option<String>>,
}

/// Attribute overrides parsed from a condition span.
#[derive(Debug, Default)]
struct Conditions {
    age: Option<String>,
    plan_type: Option<String>,
    engine: Option<String>,
    fuel: Option<String>,
    gvw: Option<String>,
    seating: Option<String>,
    region: Option<String>,
    makes: Vec<String>,
    recognised: bool,
}

fn parse_conditions(text: &str, pcv_context: bool) -> Conditions {
    let mut c = Conditions {
        age: extract::age_bucket(text),
        plan_type: extract::plan_type(text),
        engine: extract::engine_spec(text),
        fuel: extract::fuel_types(text).into_iter().next(),
        gvw: extract::gvw_bucket(text),
        seating: extract::seating_capacity(text, pcv_context),
        region: extract::region_override(text),
        makes: lexicon::bike_makes()
            .match_all(text)
            .into_iter()
            .map(str::to_string)
            .collect(),
        recognised: false,
    };
    c.recognised = c.age.is_some()
        || c.plan_type.is_some()
        || c.engine.is_some()
        || c.fuel.is_some()
        || c.gvw.is_some()
        || c.seating.is_some()
        || c.region.is_some()
        || !c.makes.is_empty();
    c
}

fn set(dst: &mut Option<String>, src: &Option<String>) {
    if src.is_some() {
        dst.clone_from(src);
    }
}

/// Interpret one rate cell into zero or more partial records. Fuel and
/// vehicle fan-out over header lists happens afterwards in the expander;
/// this step emits one record per (segment, make candidate).
pub fn interpret_cell(
    raw: &str,
    header: &HeaderProfile,
    region: &str,
    ctx: &TableContext,
) -> Vec<PayoutRecord> {
    let cleaned = lexicon::clean_text(raw).to_uppercase();
    if cleaned.is_empty() {
        return Vec::new();
    }

    // Non-data markers pass through verbatim so downstream consumers can
    // see that the region/product slot was explicitly declined.
    if lexicon::is_non_data(&cleaned) {
        // One record per context make candidate, or exactly one without.
        let candidates: Vec<Option<String>> = if ctx.bike_makes.is_empty() {
            vec![None]
        } else {
            ctx.bike_makes.iter().cloned().map(Some).collect()
        };
        return candidates
            .into_iter()
            .map(|make| {
                let mut rec = layered_base(header, region, ctx);
                rec.po_percent = Some(cleaned.clone());
                rec.bike_make = make;
                finish_remark(&mut rec, &[], None);
                rec
            })
            .collect();
    }

    let (segments, condition_text, unparsed) = segment_cell(raw, &cleaned);
    if unparsed {
        if extract::is_region_like_payout(&cleaned, region) {
            return Vec::new();
        }
        let mut rec = layered_base(header, region, ctx);
        rec.po_percent = Some(cleaned.clone());
        finish_remark(&mut rec, &[format!("(Unparsed Cell: {cleaned})")], None);
        return vec![rec];
    }

    let pcv_context = header.base.veh_type.as_deref() == Some("PCV")
        || ctx.veh_type.as_deref() == Some("PCV");
    let cell_conds = parse_conditions(&condition_text, pcv_context);

    let mut out = Vec::new();
    for seg in &segments {
        let seg_conds = parse_conditions(&seg.text, pcv_context);

        if let Some(po) = &seg.percent
            && extract::is_region_like_payout(po, region)
        {
            continue;
        }

        let mut rec = layered_base(header, region, ctx);
        apply_conditions(&mut rec, &cell_conds);
        apply_conditions(&mut rec, &seg_conds);
        if let Some(code) = &seg.region {
            rec.cluster_code = Some(code.clone());
        }
        rec.po_percent = seg.percent.clone();

        let candidates = match &seg.forced_make {
            Some(None) => vec![None],
            Some(Some(make)) => vec![Some(make.clone())],
            None => {
                if !seg_conds.makes.is_empty() {
                    seg_conds.makes.iter().cloned().map(Some).collect()
                } else if !cell_conds.makes.is_empty() {
                    cell_conds.makes.iter().cloned().map(Some).collect()
                } else {
                    make_candidates_from(&ctx.bike_makes, header)
                }
            }
        };
        let candidates = filter_excluded(candidates, &header.excluded_makes);

        let mut extra = Vec::new();
        let cond_line = condition_text.trim();
        if !cond_line.is_empty() {
            extra.push(cond_line.to_string());
        }
        let assoc = seg.text.trim();
        if !assoc.is_empty() {
            extra.push(assoc.to_string());
            for note in PAREN_NOTE.captures_iter(assoc) {
                let inner = note[1].trim();
                if !inner.is_empty() {
                    extra.push(format!("({inner})"));
                }
            }
        }

        for make in candidates {
            let mut r = rec.clone();
            r.bike_make = make;
            if let Some(v) = &r.vehicle
                && header.excluded_vehicles.iter().any(|x| x == v)
            {
                r.vehicle = None;
            }
            finish_remark(&mut r, &extra, Some(&cleaned));
            out.push(r);
        }
    }
    out
}

/// Carve the cell into segments. Returns the segments, the cell-wide
/// condition text (lines carrying no rate), and whether the cell resisted
/// parsing entirely.
fn segment_cell(raw: &str, cleaned: &str) -> (Vec<Segment>, String, bool) {
    // A make split: "45% on TATA, OTHERS 30%". The primary half keeps its
    // own rate and first-named make; the OTHERS half covers every other
    // make with the trailing rate.
    if let Some(c) = OTHERS_SPLIT.captures(cleaned)
        && let Some(primary_pct) = extract::find_percentages(&c["primary"]).into_iter().next()
    {
        let primary = c["primary"].to_string();
        let primary_make = lexicon::bike_makes()
            .match_all(&primary)
            .first()
            .map(|m| m.to_string());
        let mut others_rate = c["rate"].to_string();
        if !others_rate.ends_with('%') {
            others_rate.push('%');
        }
        let before = primary[..primary_pct.start].trim().to_string();
        let after = primary[primary_pct.end..].trim().to_string();
        let primary_text = format!("{before} {after}").trim().to_string();
        return (
            vec![
                Segment {
                    text: primary_text,
                    percent: Some(primary_pct.value),
                    region: None,
                    forced_make: primary_make.map(Some),
                },
                Segment {
                    text: String::new(),
                    percent: Some(others_rate),
                    region: None,
                    forced_make: Some(None),
                },
            ],
            String::new(),
            false,
        );
    }

    // Region-labelled rates: "DL-30%, NON DL RTO-50%". Each code directly
    // labels a rate and overrides the row's cluster for its record.
    let labelled = labelled_rates(cleaned);
    if labelled.len() >= 2
        || labelled
            .first()
            .is_some_and(|(code, _)| code.contains("DL"))
    {
        let segments = labelled
            .into_iter()
            .map(|(code, rate)| Segment {
                text: String::new(),
                percent: Some(rate),
                region: Some(code),
                forced_make: None,
            })
            .collect();
        return (segments, String::new(), false);
    }

    // Generic path: rate lines are segmented at each percentage, the text
    // between rates conditioning the rate on its left; rate-free lines
    // condition the whole cell.
    let mut segments: Vec<Segment> = Vec::new();
    let mut condition_lines: Vec<String> = Vec::new();
    for line in lexicon::clean_lines(raw) {
        let line = line.to_uppercase();
        let pcts = extract::find_percentages(&line);
        if pcts.is_empty() {
            condition_lines.push(line);
            continue;
        }
        // Each rate owns the text from its own end to the next rate's
        // start; text before the first rate joins the first segment.
        for (i, pct) in pcts.iter().enumerate() {
            let end = pcts.get(i + 1).map_or(line.len(), |next| next.start);
            let after = line[pct.end..end].trim();
            let mut text = after.to_string();
            if i == 0 {
                let prefix = line[..pct.start].trim();
                if !prefix.is_empty() {
                    text = if after.is_empty() {
                        prefix.to_string()
                    } else {
                        format!("{prefix} {after}")
                    };
                }
            }
            segments.push(Segment {
                text,
                percent: Some(pct.value.clone()),
                region: None,
                forced_make: None,
            });
        }
    }
    let condition_text = condition_lines.join(" ");

    if segments.is_empty() {
        if let Some(po) = extract::payout_value(cleaned) {
            return (
                vec![Segment {
                    percent: Some(po),
                    ..Segment::default()
                }],
                String::new(),
                false,
            );
        }
        if parse_conditions(&condition_text, true).recognised {
            segments.push(Segment::default());
        } else {
            return (Vec::new(), condition_text, true);
        }
    }
    (segments, condition_text, false)
}

fn labelled_rates(cleaned: &str) -> Vec<(String, String)> {
    lexicon::cluster_codes()
        .find_iter(cleaned)
        .into_iter()
        .filter_map(|m| {
            let tail = &cleaned[m.end..];
            LABELLED_RATE.captures(tail).map(|c| {
                (m.canonical.to_string(), format!("{}%", &c[1]))
            })
        })
        .collect()
}

/// Base record with context-layer then header-layer fields applied.
fn layered_base(header: &HeaderProfile, region: &str, ctx: &TableContext) -> PayoutRecord {
    let mut rec = PayoutRecord::default();
    rec.veh_type.clone_from(&ctx.veh_type);
    rec.age.clone_from(&ctx.age);
    rec.plan_type.clone_from(&ctx.plan_type);

    let b = &header.base;
    set(&mut rec.veh_type, &b.veh_type);
    set(&mut rec.vehicle, &b.vehicle);
    set(&mut rec.product_type, &b.product_type);
    set(&mut rec.age, &b.age);
    set(&mut rec.plan_type, &b.plan_type);
    set(&mut rec.engine_type, &b.engine_type);
    set(&mut rec.fuel_type, &b.fuel_type);
    set(&mut rec.gvw, &b.gvw);
    set(&mut rec.seating_cap, &b.seating_cap);
    set(&mut rec.slab_month, &b.slab_month);

    let mut remark_parts: Vec<String> = Vec::new();
    if let Some(r) = &b.remark {
        remark_parts.push(r.clone());
    }
    remark_parts.extend(ctx.remarks.iter().cloned());
    rec.remark = if remark_parts.is_empty() {
        None
    } else {
        Some(remark_parts.join(" | "))
    };

    rec.cluster_code = Some(region.to_string());
    rec
}

fn apply_conditions(rec: &mut PayoutRecord, c: &Conditions) {
    set(&mut rec.age, &c.age);
    set(&mut rec.plan_type, &c.plan_type);
    set(&mut rec.engine_type, &c.engine);
    set(&mut rec.fuel_type, &c.fuel);
    set(&mut rec.gvw, &c.gvw);
    set(&mut rec.seating_cap, &c.seating);
    set(&mut rec.cluster_code, &c.region);
}

fn make_candidates_from(ctx_makes: &[String], header: &HeaderProfile) -> Vec<Option<String>> {
    if !header.bike_makes.is_empty() {
        header.bike_makes.iter().cloned().map(Some).collect()
    } else if !ctx_makes.is_empty() {
        ctx_makes.iter().cloned().map(Some).collect()
    } else {
        vec![None]
    }
}

fn filter_excluded(
    candidates: Vec<Option<String>>,
    excluded: &[String],
) -> Vec<Option<String>> {
    let kept: Vec<Option<String>> = candidates
        .into_iter()
        .filter(|c| match c {
            Some(make) => !excluded.iter().any(|e| e == make),
            None => true,
        })
        .collect();
    if kept.is_empty() {
        vec![None]
    } else {
        kept
    }
}

/// Append segment-level remark parts and the full-cell note, deduplicated.
fn finish_remark(rec: &mut PayoutRecord, extra: &[String], full_cell: Option<&str>) {
    let mut parts: Vec<String> = Vec::new();
    if let Some(existing) = rec.remark.take() {
        for p in existing.split(" | ") {
            parts.push(p.to_string());
        }
    }
    for e in extra {
        parts.push(e.clone());
    }
    if let Some(cell) = full_cell {
        let po = rec.po_percent.as_deref().unwrap_or("");
        let trivially_po = cell == po || format!("{cell}%") == po;
        let already_quoted = parts.iter().any(|p| p == cell);
        if !trivially_po && !already_quoted && !parts.is_empty() {
            parts.push(format!("(Full Cell: {cell})"));
        }
    }
    let mut seen: Vec<String> = Vec::new();
    for p in parts {
        let p = p.trim().to_string();
        if !p.is_empty() && !seen.contains(&p) {
            seen.push(p);
        }
    }
    rec.remark = if seen.is_empty() {
        None
    } else {
        Some(seen.join(" | "))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(text: &str) -> HeaderProfile {
        HeaderProfile::parse(text)
    }

    #[test]
    fn simple_percentage_cell() {
        let h = header("GCV New Diesel");
        let recs = interpret_cell("25%", &h, "MH01", &TableContext::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].po_percent.as_deref(), Some("25%"));
        assert_eq!(recs[0].cluster_code.as_deref(), Some("MH01"));
        assert_eq!(recs[0].veh_type.as_deref(), Some("GCV"));
        assert_eq!(recs[0].age.as_deref(), Some("NEW"));
        assert_eq!(recs[0].remark, None);
    }

    #[test]
    fn bare_number_cell_gains_percent_sign() {
        let h = header("GCV Diesel");
        let recs = interpret_cell("25", &h, "MH01", &TableContext::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].po_percent.as_deref(), Some("25%"));
        assert_eq!(recs[0].remark, None);
    }

    #[test]
    fn non_data_token_passes_through() {
        let h = header("GCV Diesel");
        let recs = interpret_cell("Decline", &h, "MH01", &TableContext::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].po_percent.as_deref(), Some("DECLINE"));
        assert_eq!(recs[0].cluster_code.as_deref(), Some("MH01"));
    }

    #[test]
    fn multi_rule_cell_splits_per_make() {
        let h = header("GCV New");
        let recs = interpret_cell(
            "45% on TATA\n50% on AL\nCNG only",
            &h,
            "MH01",
            &TableContext::default(),
        );
        assert_eq!(recs.len(), 2);
        // Text between rates conditions the rate on its left.
        assert_eq!(recs[0].po_percent.as_deref(), Some("45%"));
        assert_eq!(recs[0].bike_make.as_deref(), Some("TATA"));
        assert_eq!(recs[1].po_percent.as_deref(), Some("50%"));
        assert_eq!(recs[1].bike_make.as_deref(), Some("AL"));
        // The rate-free line conditions every record.
        assert_eq!(recs[0].fuel_type.as_deref(), Some("CNG"));
        assert_eq!(recs[1].fuel_type.as_deref(), Some("CNG"));
        let remark = recs[0].remark.as_deref().unwrap_or("");
        assert!(remark.contains("CNG ONLY"));
        assert!(remark.contains("(Full Cell:"));
    }

    #[test]
    fn single_line_pairs_each_rate_with_its_trailing_text() {
        let h = header("GCV Diesel");
        let recs = interpret_cell(
            "45% on TATA, 50% on AL",
            &h,
            "MH01",
            &TableContext::default(),
        );
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].po_percent.as_deref(), Some("45%"));
        assert_eq!(recs[0].bike_make.as_deref(), Some("TATA"));
        assert_eq!(recs[1].po_percent.as_deref(), Some("50%"));
        assert_eq!(recs[1].bike_make.as_deref(), Some("AL"));
    }

    #[test]
    fn others_split_pins_makes() {
        let h = header("GCV");
        let recs = interpret_cell(
            "TATA 45%, OTHERS 30%",
            &h,
            "MH01",
            &TableContext::default(),
        );
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].po_percent.as_deref(), Some("45%"));
        assert_eq!(recs[0].bike_make.as_deref(), Some("TATA"));
        assert_eq!(recs[1].po_percent.as_deref(), Some("30%"));
        assert_eq!(recs[1].bike_make, None);
    }

    #[test]
    fn age_banded_lines_pair_each_rate_with_its_band() {
        let h = header("GCV Diesel");
        let recs = interpret_cell(
            "1-5 yrs 45%\n>5 yrs 55%",
            &h,
            "MH01",
            &TableContext::default(),
        );
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].age.as_deref(), Some("1-5YRS"));
        assert_eq!(recs[0].po_percent.as_deref(), Some("45%"));
        assert_eq!(recs[1].age.as_deref(), Some(">5YRS"));
        assert_eq!(recs[1].po_percent.as_deref(), Some("55%"));
    }

    #[test]
    fn region_labelled_rates_override_cluster() {
        let h = header("GCV Diesel");
        let recs = interpret_cell(
            "DL-30%, NON DL RTO-50%",
            &h,
            "MH01",
            &TableContext::default(),
        );
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].cluster_code.as_deref(), Some("DL"));
        assert_eq!(recs[0].po_percent.as_deref(), Some("30%"));
        assert_eq!(recs[1].cluster_code.as_deref(), Some("NON DL RTO"));
        assert_eq!(recs[1].po_percent.as_deref(), Some("50%"));
    }

    #[test]
    fn bare_region_mention_does_not_override() {
        let h = header("GCV Diesel");
        let recs = interpret_cell(
            "45% applicable at WB1 branch",
            &h,
            "MH01",
            &TableContext::default(),
        );
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].cluster_code.as_deref(), Some("MH01"));
    }

    #[test]
    fn qualified_region_mention_overrides() {
        let h = header("GCV Diesel");
        let recs = interpret_cell("45% WB1 only", &h, "MH01", &TableContext::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].cluster_code.as_deref(), Some("WB1"));
    }

    #[test]
    fn age_condition_overrides_header_age() {
        let h = header("GCV New Diesel");
        let recs = interpret_cell("45% above 5 years", &h, "MH01", &TableContext::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].age.as_deref(), Some(">5YRS"));
    }

    #[test]
    fn unparsed_cell_becomes_fallback_record() {
        let h = header("GCV Diesel");
        let recs = interpret_cell(
            "refer branch manager",
            &h,
            "MH01",
            &TableContext::default(),
        );
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].po_percent.as_deref(), Some("REFER BRANCH MANAGER"));
        let remark = recs[0].remark.as_deref().unwrap_or("");
        assert!(remark.contains("(Unparsed Cell: REFER BRANCH MANAGER)"));
    }

    #[test]
    fn region_leak_in_rate_column_is_skipped() {
        let h = header("GCV Diesel");
        let recs = interpret_cell("WB1", &h, "MH01", &TableContext::default());
        assert!(recs.is_empty());
    }

    #[test]
    fn context_makes_fan_out_when_cell_names_none() {
        let h = header("GCV New Diesel");
        let ctx = TableContext::parse("MHCV AOTP TATA & AL ONLY");
        let recs = interpret_cell("25%", &h, "MH01", &ctx);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].bike_make.as_deref(), Some("TATA"));
        assert_eq!(recs[1].bike_make.as_deref(), Some("AL"));
        assert_eq!(recs[0].plan_type.as_deref(), Some("SATP"));
    }

    #[test]
    fn header_makes_fan_out() {
        let h = header("GCV Electric New (TATA & AL)");
        let recs = interpret_cell("30%", &h, "GJ1", &TableContext::default());
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].bike_make.as_deref(), Some("TATA"));
        assert_eq!(recs[1].bike_make.as_deref(), Some("AL"));
    }

    #[test]
    fn header_makes_outrank_context_makes() {
        let h = header("GCV (EICHER)");
        let ctx = TableContext::parse("MHCV GRID TATA & AL ONLY");
        let recs = interpret_cell("25%", &h, "MH01", &ctx);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].bike_make.as_deref(), Some("EICHER"));
    }

    #[test]
    fn condition_line_make_applies_without_qualifier() {
        let h = header("GCV Diesel");
        let recs = interpret_cell("45%\nTATA", &h, "MH01", &TableContext::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].po_percent.as_deref(), Some("45%"));
        assert_eq!(recs[0].bike_make.as_deref(), Some("TATA"));
    }

    #[test]
    fn excluded_make_condition_falls_back_to_none() {
        let h = header("GCV excluding TATA");
        let recs = interpret_cell("45% on TATA", &h, "MH01", &TableContext::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].bike_make, None);
    }

    #[test]
    fn condition_only_cell_has_no_rate() {
        let h = header("GCV Diesel");
        let recs = interpret_cell("CNG only", &h, "MH01", &TableContext::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].po_percent, None);
        assert_eq!(recs[0].fuel_type.as_deref(), Some("CNG"));
    }
}
