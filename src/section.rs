use crate::error::ExtractError;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref ANALYTE_HEADER: Regex = Regex::new(r"(?i)Analyte").unwrap();
    static ref LOD_TOKEN: Regex = Regex::new(r"(?i)LOD").unwrap();
    static ref TERPENE_HEADER: Regex = Regex::new(r"(?i)Terpenes? (?:by|Profile)").unwrap();
    static ref INTEGRATION_HEADER: Regex = Regex::new(r"(?i)Integration Results").unwrap();
    static ref TOTAL_LINE: Regex = Regex::new(r"(?i)^Total:\s*(\d+(?:\.\d+)?)?").unwrap();

    /// Headers of the sections that follow a potency table in lab reports.
    static ref POTENCY_END: Regex = Regex::new(
        r"(?i)Heavy Metals|Pesticides by|Residual Solvents|Microbials|KCA Laboratories|North Plaza|Summary"
    )
    .unwrap();
}

/// Phrase that opens a cannabinoid potency table.
pub const POTENCY_HEADER: &str = "Cannabinoids by";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Potency,
    Terpenes,
    Chromatography,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TableKind::Potency => "potency",
            TableKind::Terpenes => "terpene",
            TableKind::Chromatography => "chromatography",
        };
        f.write_str(s)
    }
}

/// Half-open line range `[start, end)` holding a table's data rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: TableKind,
    pub start: usize,
    pub end: usize,
    /// Total integrated area declared on a chromatography `Total:` line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_total: Option<f64>,
}

impl Section {
    pub fn lines<'a>(&self, lines: &[&'a str]) -> Vec<&'a str> {
        let start = self.start.min(lines.len());
        let end = self.end.clamp(start, lines.len());
        lines[start..end].to_vec()
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Compiled end markers: the built-in section headers plus configured extras.
#[derive(Debug, Clone, Default)]
pub struct EndMarkers {
    extra: Vec<Regex>,
}

impl EndMarkers {
    pub fn new(extra: &[String]) -> Self {
        let extra = extra
            .iter()
            .filter(|m| !m.trim().is_empty())
            .filter_map(|m| {
                RegexBuilder::new(&regex::escape(m.trim()))
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect();
        Self { extra }
    }

    pub fn is_end(&self, line: &str) -> bool {
        POTENCY_END.is_match(line) || self.extra.iter().any(|r| r.is_match(line))
    }
}

/// A table title line such as "Cannabinoids by HPLC" or "Terpenes by GC-MS".
pub fn is_table_title(line: &str) -> bool {
    line.contains(POTENCY_HEADER) || TERPENE_HEADER.is_match(line)
}

pub fn locate(lines: &[&str], kind: TableKind, ends: &EndMarkers) -> Result<Section, ExtractError> {
    match kind {
        TableKind::Potency => locate_potency(lines, ends),
        TableKind::Terpenes => locate_terpenes(lines, ends),
        TableKind::Chromatography => locate_integration(lines),
    }
}

/// The potency table starts at its "Cannabinoids by …" title or, failing
/// that, at an `Analyte` header with `LOD` on the same or the next line.
fn locate_potency(lines: &[&str], ends: &EndMarkers) -> Result<Section, ExtractError> {
    let start = lines
        .iter()
        .enumerate()
        .find(|(i, l)| {
            if l.contains(POTENCY_HEADER) {
                return true;
            }
            ANALYTE_HEADER.is_match(l)
                && (LOD_TOKEN.is_match(l)
                    || lines.get(i + 1).is_some_and(|next| LOD_TOKEN.is_match(next)))
        })
        .map(|(i, _)| i)
        .ok_or(ExtractError::TableNotFound(TableKind::Potency))?;

    let end = find_end(lines, start, ends);
    Ok(Section {
        kind: TableKind::Potency,
        start,
        end,
        declared_total: None,
    })
}

fn locate_terpenes(lines: &[&str], ends: &EndMarkers) -> Result<Section, ExtractError> {
    let start = lines
        .iter()
        .position(|l| TERPENE_HEADER.is_match(l))
        .ok_or(ExtractError::TableNotFound(TableKind::Terpenes))?;

    let end = lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, l)| ends.is_end(l) || l.contains(POTENCY_HEADER))
        .map(|(i, _)| i)
        .unwrap_or(lines.len());

    Ok(Section {
        kind: TableKind::Terpenes,
        start,
        end,
        declared_total: None,
    })
}

fn find_end(lines: &[&str], start: usize, ends: &EndMarkers) -> usize {
    lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, l)| ends.is_end(l) || TERPENE_HEADER.is_match(l))
        .map(|(i, _)| i)
        .unwrap_or(lines.len())
}

/// Data rows sit between the "Integration Results" title and the `Total:`
/// line, whose value is kept as the declared total area.
fn locate_integration(lines: &[&str]) -> Result<Section, ExtractError> {
    let title = lines
        .iter()
        .position(|l| INTEGRATION_HEADER.is_match(l))
        .ok_or(ExtractError::TableNotFound(TableKind::Chromatography))?;
    let start = title + 1;

    let mut end = lines.len();
    let mut declared_total = None;
    for (i, l) in lines.iter().enumerate().skip(start) {
        if let Some(caps) = TOTAL_LINE.captures(l.trim()) {
            declared_total = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .filter(|v| v.is_finite());
            end = i;
            break;
        }
    }

    Ok(Section {
        kind: TableKind::Chromatography,
        start,
        end,
        declared_total,
    })
}
