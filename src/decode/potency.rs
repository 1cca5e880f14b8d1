use crate::{
    diagnostics::{note, DiagnosticSink},
    error::ExtractError,
    report::{sort_by_pct_desc, AnalyteResult},
    text::normalize_line,
    vocabulary::AnalyteValidator,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    /// Name followed by LOD, LOQ, result (%) and result (mg/g).
    static ref FIVE_COLUMN: Regex = Regex::new(
        r"(?i)^(.+?)\s+(ND|<LO[QD]|\d+(?:\.\d+)?)\s+(ND|<LO[QD]|\d+(?:\.\d+)?)\s+(ND|<LO[QD]|\d+(?:\.\d+)?)\s+(ND|<LO[QD]|\d+(?:\.\d+)?)$"
    )
    .unwrap();

    /// Totals rows only carry result (%) and result (mg/g).
    static ref TOTALS: Regex = Regex::new(
        r"(?i)^(Total(?:\s+\S+)*?)\s+(ND|<LO[QD]|\d+(?:\.\d+)?)\s+(ND|<LO[QD]|\d+(?:\.\d+)?)$"
    )
    .unwrap();

    static ref VALUE_TOKEN: Regex = Regex::new(r"(?i)^(?:ND|<LO[QD]|\d+(?:\.\d+)?)$").unwrap();

    static ref HEADER: Regex =
        Regex::new(r"(?i)^(?:Analyte|LOD|LOQ|Result|\(mg/g\)|ND =|NT =)").unwrap();

    static ref NOT_DETECTED: Regex = Regex::new(r"(?i)^(?:ND|<LO[QD])$").unwrap();
}

/// One decoded potency-table row, values kept as printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotencyRow {
    pub name: String,
    pub lod: String,
    pub loq: String,
    pub result_pct: String,
    pub result_mg_g: String,
}

impl PotencyRow {
    pub fn is_detected(&self) -> bool {
        is_detected_value(&self.result_pct)
    }
}

/// A result token counts as detected only when it is a number above zero.
pub fn is_detected_value(token: &str) -> bool {
    let t = token.trim();
    if t.is_empty() || NOT_DETECTED.is_match(t) {
        return false;
    }
    crate::error::parse_number(t).is_ok_and(|v| v > 0.0)
}

pub type RowStrategy = fn(&str) -> Option<PotencyRow>;

/// Row patterns in priority order.
pub const ROW_STRATEGIES: &[(&str, RowStrategy)] =
    &[("five_column", five_column), ("totals", totals_row)];

fn five_column(line: &str) -> Option<PotencyRow> {
    let caps = FIVE_COLUMN.captures(line)?;
    Some(PotencyRow {
        name: caps[1].trim().to_string(),
        lod: caps[2].to_string(),
        loq: caps[3].to_string(),
        result_pct: caps[4].to_string(),
        result_mg_g: caps[5].to_string(),
    })
}

fn totals_row(line: &str) -> Option<PotencyRow> {
    let caps = TOTALS.captures(line)?;
    // A value column left in the name means the row has more than two values.
    if caps[1].split_whitespace().any(|w| VALUE_TOKEN.is_match(w)) {
        return None;
    }
    Some(PotencyRow {
        name: caps[1].trim().to_string(),
        lod: "0".into(),
        loq: "0".into(),
        result_pct: caps[2].to_string(),
        result_mg_g: caps[3].to_string(),
    })
}

pub fn is_header_line(line: &str) -> bool {
    HEADER.is_match(line)
}

pub fn decode_row(line: &str) -> Option<PotencyRow> {
    ROW_STRATEGIES.iter().find_map(|(_, strategy)| strategy(line))
}

/// Decode reconstructed table rows into detected analytes, highest result
/// first. Non-detects, unknown names and repeated analytes are dropped.
pub fn extract_table(
    rows: &[String],
    validator: &AnalyteValidator,
    sink: &dyn DiagnosticSink,
) -> Vec<AnalyteResult> {
    let mut results = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for raw in rows {
        let line = normalize_line(raw);
        if line.is_empty() || is_header_line(&line) {
            continue;
        }

        let Some(row) = decode_row(&line) else {
            let err = ExtractError::rejected(&line, "no row pattern");
            note(sink, "potency", &err.to_string());
            continue;
        };

        let Some(name) = validator.canonical(&row.name) else {
            let err = ExtractError::rejected(&line, "not an analyte");
            note(sink, "potency", &err.to_string());
            continue;
        };

        if !row.is_detected() {
            note(sink, "potency", &format!("skipped non-detect: {} {}", name, row.result_pct));
            continue;
        }

        if !seen.insert(name.clone()) {
            note(sink, "potency", &format!("skipped duplicate: {} {}", name, row.result_pct));
            continue;
        }

        note(sink, "potency", &format!("extracted: {} -> {}%", name, row.result_pct));
        results.push(AnalyteResult {
            analyte: name,
            result_pct: row.result_pct,
            result_mg_g: Some(row.result_mg_g),
            detected: true,
            retention_time: None,
            area: None,
            area_pct: None,
        });
    }

    sort_by_pct_desc(&mut results);
    results
}
