//! Positional decoder for peak rows printed without any field delimiters.
//!
//! A squashed row reads
//! `NAME RT AREA HEIGHT REL_AREA REL_HEIGHT AMOUNT` with every field glued to
//! its neighbour, e.g. `CBD6.075179.3791437.2739.0689.422032.7311`. Each
//! field holds exactly one decimal point, so the six points anchor the
//! fields; the fixed decimal widths in [`SquashedLayout`] then place every
//! boundary except the one between height and relative area, which is found
//! by trying each candidate height width and keeping the first that leaves a
//! plausible percentage.

use crate::{config::Chromatography, error::ExtractError};

/// Number of numeric fields in a squashed row.
pub const FIELD_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquashedLayout {
    pub retention_decimals: usize,
    pub area_decimals: usize,
    pub relative_decimals: usize,
    pub amount_decimals: usize,
    pub height_decimal_candidates: Vec<usize>,
}

impl Default for SquashedLayout {
    fn default() -> Self {
        Self::from_config(&Chromatography::default())
    }
}

impl SquashedLayout {
    pub fn from_config(cfg: &Chromatography) -> Self {
        Self {
            retention_decimals: cfg.retention_decimals,
            area_decimals: cfg.area_decimals,
            relative_decimals: cfg.relative_decimals,
            amount_decimals: cfg.amount_decimals,
            height_decimal_candidates: cfg.height_decimal_candidates.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SquashedRow {
    pub name: String,
    pub retention_time: f64,
    pub area: f64,
    pub height: f64,
    pub relative_area: f64,
    pub relative_height: f64,
    pub amount_ppm: f64,
    /// The name took its trailing digit back from the retention time.
    pub absorbed_digit: bool,
}

/// True when `body` carries exactly one decimal point per numeric field.
pub fn is_squashed(body: &str) -> bool {
    body.matches('.').count() == FIELD_COUNT
}

pub fn decode(body: &str, layout: &SquashedLayout) -> Result<SquashedRow, ExtractError> {
    let body = body.trim();
    let first_dot = body
        .find('.')
        .ok_or_else(|| ExtractError::rejected(body, "no decimal point"))?;

    let head = &body[..first_dot];
    let digits = head.bytes().rev().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(ExtractError::rejected(body, "retention time has no integer part"));
    }
    let mut rt_start = first_dot - digits;
    let mut name = body[..rt_start].trim().to_string();
    let mut absorbed_digit = false;

    // "Delta 9" printed flush against "8.692" reads as "Delta" at 98.692.
    // These retention times never have two integer digits, so hand the first
    // one back to the name.
    if name.eq_ignore_ascii_case("delta") && digits >= 2 {
        name = format!("{} {}", name, &body[rt_start..rt_start + 1]);
        rt_start += 1;
        absorbed_digit = true;
    }

    if name.is_empty() {
        return Err(ExtractError::rejected(body, "missing peak name"));
    }

    let tail: String = body[rt_start..].chars().filter(|c| !c.is_whitespace()).collect();
    if !tail.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(ExtractError::rejected(body, "non-numeric character in fields"));
    }

    let dots: Vec<usize> = tail
        .bytes()
        .enumerate()
        .filter(|(_, b)| *b == b'.')
        .map(|(i, _)| i)
        .collect();
    if dots.len() != FIELD_COUNT {
        return Err(ExtractError::rejected(body, "expected six numeric fields"));
    }

    let bounds = field_bounds(&tail, &dots, layout)
        .ok_or_else(|| ExtractError::rejected(body, "field widths do not fit"))?;

    let rel_area_end = bounds.relative_height_start;
    let (height_end, relative_area) = layout
        .height_decimal_candidates
        .iter()
        .find_map(|w| {
            let height_end = dots[2] + 1 + w;
            if height_end >= dots[3] {
                return None;
            }
            plausible_percentage(&tail[height_end..rel_area_end]).map(|v| (height_end, v))
        })
        .ok_or_else(|| ExtractError::AmbiguousFieldSplit(body.to_string()))?;

    Ok(SquashedRow {
        name,
        retention_time: number(&tail[..bounds.area_start])?,
        area: number(&tail[bounds.area_start..bounds.height_start])?,
        height: number(&tail[bounds.height_start..height_end])?,
        relative_area,
        relative_height: number(&tail[bounds.relative_height_start..bounds.amount_start])?,
        amount_ppm: number(&tail[bounds.amount_start..])?,
        absorbed_digit,
    })
}

struct FieldBounds {
    area_start: usize,
    height_start: usize,
    relative_height_start: usize,
    amount_start: usize,
}

/// Place every boundary fixed by a known decimal width. Each field must
/// keep at least one integer digit.
fn field_bounds(tail: &str, dots: &[usize], layout: &SquashedLayout) -> Option<FieldBounds> {
    let area_start = dots[0] + 1 + layout.retention_decimals;
    let height_start = dots[1] + 1 + layout.area_decimals;
    let relative_height_start = dots[3] + 1 + layout.relative_decimals;
    let amount_start = dots[4] + 1 + layout.relative_decimals;

    let fits = dots[0] > 0
        && area_start < dots[1]
        && height_start < dots[2]
        && relative_height_start < dots[4]
        && amount_start < dots[5]
        && dots[5] + 1 + layout.amount_decimals == tail.len();

    fits.then_some(FieldBounds {
        area_start,
        height_start,
        relative_height_start,
        amount_start,
    })
}

/// A relative area is a percentage between 0 and 100 whose integer part has
/// no padding zeros.
fn plausible_percentage(field: &str) -> Option<f64> {
    let (int, _) = field.split_once('.')?;
    if int.is_empty() || (int.len() > 1 && int.starts_with('0')) {
        return None;
    }
    let v = field.parse::<f64>().ok()?;
    (0.0..=100.0).contains(&v).then_some(v)
}

fn number(field: &str) -> Result<f64, ExtractError> {
    crate::error::parse_number(field)
}
