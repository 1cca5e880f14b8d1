use crate::{
    config::Chromatography,
    decode::squashed::{self, SquashedLayout},
    diagnostics::{note, DiagnosticSink},
    error::{parse_number, parse_or_zero, ExtractError},
    report::{sort_by_pct_desc, AnalyteResult, ChromatographyPeak},
    section::Section,
    text::normalize_line,
    util::fixed4,
};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

lazy_static! {
    static ref PEAK_ID: Regex = Regex::new(r"^\d{1,3}$").unwrap();
    static ref LEADING_ID: Regex = Regex::new(r"^(\d{1,3})\s+(.+)$").unwrap();
    static ref AMOUNT: Regex = Regex::new(r"^\d+\.\d+$").unwrap();
    static ref NOT_APPLICABLE: Regex = Regex::new(r"(?i)^n\.a\.?$").unwrap();

    /// Name, retention time and area with the amount left for the next line.
    static ref NAME_RT_AREA: Regex =
        Regex::new(r"^(?:(\d{1,3})\s+)?(.*?[^\d\s.])\s*(\d+\.\d{3})\s*(\d+\.\d{3})$").unwrap();

    static ref LEGACY_AMOUNT: Regex = Regex::new(
        r"^(\d+)\s+([A-Za-zΔ0-9\s\-(),]+?)\s+(\d+\.\d{3})\s+(\d+\.\d{3})\s+(\d+\.\d{1,4})$"
    )
    .unwrap();
    static ref LEGACY_NOT_APPLICABLE: Regex = Regex::new(
        r"(?i)^(\d+)\s+([A-Za-zΔ0-9\s\-(),]+?)\s+(\d+\.\d{3})\s+(\d+\.\d{3})\s+n\.a\.$"
    )
    .unwrap();
    static ref LEGACY_SQUASHED: Regex = Regex::new(
        r"(?i)^(\d+)\s+([A-Za-zΔ0-9\s\-(),]+?)(\d+\.\d{3})(\d+\.\d{3})\s*(\d+\.\d{4}|n\.a\.)$"
    )
    .unwrap();

    static ref TABLE_HEADER: Regex =
        Regex::new(r"(?i)^No\.\s+Peak Name|Retention Time|^min\s+mAU").unwrap();

    /// Whole-document pattern used when the table scan finds nothing.
    static ref DOCUMENT_ROW: Regex = Regex::new(
        r"(?i)(\d{1,3})\s{1,3}([A-Za-z0-9][A-Za-z0-9\s\-]*?)(\d+\.\d{3})(\d+\.\d{3})\s+(\d+\.\d{4}|n\.a\.)"
    )
    .unwrap();
}

/// Carry-over state of the line scan: the ordinal from an ID-only line and
/// a peak still waiting for its amount line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakContext {
    pub peak_no: Option<u32>,
    pub pending: Option<PendingPeak>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingPeak {
    pub name: String,
    pub retention_time: f64,
    pub area: f64,
    pub absorbed_digit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPeak {
    pub peak_no: Option<u32>,
    pub name: String,
    pub retention_time: f64,
    pub area: f64,
    /// `None` when the lab printed `n.a.`.
    pub amount_ppm: Option<f64>,
    pub height: Option<f64>,
    pub relative_area: Option<f64>,
    pub relative_height: Option<f64>,
    /// Set when a name digit was recovered from the retention time.
    pub absorbed_digit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// The line only updated the context.
    Context,
    Peak(DecodedPeak),
    Rejected(ExtractError),
}

/// Compiled chromatography settings shared by every strategy.
#[derive(Debug, Clone)]
pub struct PeakRules {
    layout: SquashedLayout,
    boilerplate: Regex,
    rt_threshold: f64,
    max_name_chars: usize,
    max_fallback_name_chars: usize,
}

impl PeakRules {
    pub fn new(cfg: &Chromatography) -> Result<Self, regex::Error> {
        let boilerplate = RegexBuilder::new(&cfg.boilerplate_name_pattern)
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            layout: SquashedLayout::from_config(cfg),
            boilerplate,
            rt_threshold: cfg.absorbed_digit_rt_threshold,
            max_name_chars: cfg.max_name_chars_line,
            max_fallback_name_chars: cfg.max_name_chars_fallback,
        })
    }

    pub fn layout(&self) -> &SquashedLayout {
        &self.layout
    }

    fn accepts_name(&self, name: &str, max_chars: usize) -> bool {
        !name.is_empty() && name.chars().count() <= max_chars && !self.boilerplate.is_match(name)
    }

    /// Retention times past the threshold are read as a name digit ("Delta 9")
    /// glued to the real value. This is a heuristic over observed reports and
    /// every use is recorded for review.
    fn absorb_digit(&self, name: &str, rt: &str) -> (String, String, bool) {
        if rt.len() > 1 && parse_or_zero(rt) > self.rt_threshold {
            (format!("{} {}", name, &rt[..1]), rt[1..].to_string(), true)
        } else {
            (name.to_string(), rt.to_string(), false)
        }
    }
}

pub type PeakStrategy = fn(&PeakContext, &str, &PeakRules) -> Option<(PeakContext, LineOutcome)>;

/// Line strategies in priority order. The first that claims a line wins.
pub const PEAK_STRATEGIES: &[(&str, PeakStrategy)] = &[
    ("pending_amount", pending_amount),
    ("peak_id", peak_id),
    ("squashed", squashed_row),
    ("name_rt_area", name_rt_area),
    ("legacy", legacy_row),
];

fn pending_amount(
    ctx: &PeakContext,
    line: &str,
    _rules: &PeakRules,
) -> Option<(PeakContext, LineOutcome)> {
    let pending = ctx.pending.as_ref()?;
    let amount_ppm = if NOT_APPLICABLE.is_match(line) {
        None
    } else if AMOUNT.is_match(line) {
        Some(parse_number(line).ok()?)
    } else {
        return None;
    };

    let peak = DecodedPeak {
        peak_no: ctx.peak_no,
        name: pending.name.clone(),
        retention_time: pending.retention_time,
        area: pending.area,
        amount_ppm,
        height: None,
        relative_area: None,
        relative_height: None,
        absorbed_digit: pending.absorbed_digit,
    };
    Some((PeakContext::default(), LineOutcome::Peak(peak)))
}

fn peak_id(_ctx: &PeakContext, line: &str, _rules: &PeakRules) -> Option<(PeakContext, LineOutcome)> {
    if !PEAK_ID.is_match(line) {
        return None;
    }
    let ctx = PeakContext {
        peak_no: line.parse().ok(),
        pending: None,
    };
    Some((ctx, LineOutcome::Context))
}

/// Split a leading `N ` peak ordinal from the rest of a row.
pub fn split_peak_id(line: &str) -> Option<(u32, &str)> {
    let caps = LEADING_ID.captures(line)?;
    let no = caps.get(1)?.as_str().parse().ok()?;
    Some((no, caps.get(2)?.as_str()))
}

fn squashed_row(ctx: &PeakContext, line: &str, rules: &PeakRules) -> Option<(PeakContext, LineOutcome)> {
    if !squashed::is_squashed(line) {
        return None;
    }
    let (peak_no, body) = match split_peak_id(line) {
        Some((no, body)) => (Some(no), body),
        None => (ctx.peak_no, line),
    };

    let outcome = match squashed::decode(body, &rules.layout) {
        Ok(row) if rules.accepts_name(&row.name, rules.max_name_chars) => {
            LineOutcome::Peak(DecodedPeak {
                peak_no,
                absorbed_digit: row.absorbed_digit,
                name: row.name,
                retention_time: row.retention_time,
                area: row.area,
                amount_ppm: Some(row.amount_ppm),
                height: Some(row.height),
                relative_area: Some(row.relative_area),
                relative_height: Some(row.relative_height),
            })
        }
        Ok(row) => LineOutcome::Rejected(ExtractError::rejected(
            line,
            format!("implausible peak name {:?}", row.name),
        )),
        Err(err) => LineOutcome::Rejected(err),
    };
    Some((PeakContext::default(), outcome))
}

fn name_rt_area(ctx: &PeakContext, line: &str, rules: &PeakRules) -> Option<(PeakContext, LineOutcome)> {
    let caps = NAME_RT_AREA.captures(line)?;
    let peak_no = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .or(ctx.peak_no);
    let (name, rt, absorbed_digit) = rules.absorb_digit(caps[2].trim(), &caps[3]);

    if !rules.accepts_name(&name, rules.max_name_chars) {
        let err = ExtractError::rejected(line, format!("implausible peak name {name:?}"));
        return Some((PeakContext::default(), LineOutcome::Rejected(err)));
    }

    let pending = PendingPeak {
        name,
        retention_time: parse_number(&rt).ok()?,
        area: parse_number(&caps[4]).ok()?,
        absorbed_digit,
    };
    let ctx = PeakContext {
        peak_no,
        pending: Some(pending),
    };
    Some((ctx, LineOutcome::Context))
}

/// One-line rows: ID, name, RT, area and an amount or `n.a.`, spaced or
/// glued together.
fn legacy_row(_ctx: &PeakContext, line: &str, rules: &PeakRules) -> Option<(PeakContext, LineOutcome)> {
    let caps = LEGACY_AMOUNT
        .captures(line)
        .or_else(|| LEGACY_NOT_APPLICABLE.captures(line))
        .or_else(|| LEGACY_SQUASHED.captures(line))?;

    let (name, rt, absorbed_digit) = rules.absorb_digit(caps[2].trim(), &caps[3]);
    if !rules.accepts_name(&name, rules.max_name_chars) {
        let err = ExtractError::rejected(line, format!("implausible peak name {name:?}"));
        return Some((PeakContext::default(), LineOutcome::Rejected(err)));
    }

    let amount_ppm = caps
        .get(5)
        .filter(|m| !NOT_APPLICABLE.is_match(m.as_str()))
        .and_then(|m| parse_number(m.as_str()).ok());

    let peak = DecodedPeak {
        peak_no: caps[1].parse().ok(),
        name,
        retention_time: parse_number(&rt).ok()?,
        area: parse_number(&caps[4]).ok()?,
        amount_ppm,
        height: None,
        relative_area: None,
        relative_height: None,
        absorbed_digit,
    };
    Some((PeakContext::default(), LineOutcome::Peak(peak)))
}

/// Run the strategy chain on one normalized line.
pub fn scan_line(
    ctx: &PeakContext,
    line: &str,
    rules: &PeakRules,
) -> Option<(&'static str, PeakContext, LineOutcome)> {
    PEAK_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(ctx, line, rules).map(|(c, o)| (*name, c, o)))
}

pub fn scan_section(lines: &[&str], rules: &PeakRules, sink: &dyn DiagnosticSink) -> Vec<DecodedPeak> {
    let mut ctx = PeakContext::default();
    let mut peaks = Vec::new();

    for raw in lines {
        let line = normalize_line(raw);
        if line.is_empty() || TABLE_HEADER.is_match(&line) {
            continue;
        }

        let Some((strategy, next, outcome)) = scan_line(&ctx, &line, rules) else {
            let err = ExtractError::rejected(&line, "no peak pattern");
            note(sink, "chromatography", &err.to_string());
            continue;
        };

        if strategy != "pending_amount" {
            if let Some(pending) = &ctx.pending {
                note(
                    sink,
                    "chromatography",
                    &format!("dropped peak without amount: {}", pending.name),
                );
            }
        }
        ctx = next;

        match outcome {
            LineOutcome::Context => {}
            LineOutcome::Peak(peak) => {
                record_peak(sink, strategy, &peak);
                peaks.push(peak);
            }
            LineOutcome::Rejected(err) => note(sink, "chromatography", &err.to_string()),
        }
    }

    if let Some(pending) = ctx.pending {
        note(
            sink,
            "chromatography",
            &format!("dropped peak without amount: {}", pending.name),
        );
    }
    peaks
}

fn record_peak(sink: &dyn DiagnosticSink, strategy: &str, peak: &DecodedPeak) {
    if peak.absorbed_digit {
        note(
            sink,
            "chromatography",
            &format!(
                "absorbed-digit heuristic applied: {} at RT {} (needs review)",
                peak.name, peak.retention_time
            ),
        );
    }
    let amount = match peak.amount_ppm {
        Some(ppm) => format!("{ppm}ppm"),
        None => "n.a.".to_string(),
    };
    note(
        sink,
        "chromatography",
        &format!(
            "{strategy}: {} -> {amount} (RT: {}min, Area: {})",
            peak.name, peak.retention_time, peak.area
        ),
    );
}

/// Regex scan over the whole document with line breaks flattened.
pub fn fallback_scan(text: &str, rules: &PeakRules, sink: &dyn DiagnosticSink) -> Vec<DecodedPeak> {
    let flat = text.replace(['\r', '\n'], " ");
    let mut peaks = Vec::new();

    for caps in DOCUMENT_ROW.captures_iter(&flat) {
        let (name, rt, absorbed_digit) = rules.absorb_digit(caps[2].trim(), &caps[3]);
        if !rules.accepts_name(&name, rules.max_fallback_name_chars) {
            note(sink, "chromatography", &format!("fallback skipped {name:?}"));
            continue;
        }
        let (Ok(retention_time), Ok(area)) = (parse_number(&rt), parse_number(&caps[4])) else {
            continue;
        };
        let amount_ppm = Some(&caps[5])
            .filter(|a| !NOT_APPLICABLE.is_match(a))
            .and_then(|a| parse_number(a).ok());

        let peak = DecodedPeak {
            peak_no: caps[1].parse().ok(),
            name,
            retention_time,
            area,
            amount_ppm,
            height: None,
            relative_area: None,
            relative_height: None,
            absorbed_digit,
        };
        record_peak(sink, "fallback", &peak);
        peaks.push(peak);
    }
    peaks
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromatographyTable {
    pub peaks: Vec<ChromatographyPeak>,
    /// Quantified peaks as analyte entries, highest amount first.
    pub analytes: Vec<AnalyteResult>,
    pub total_area: Option<f64>,
}

/// Decode the integration table. Without a located section, or when the
/// section yields nothing, the whole document is scanned instead.
pub fn extract_table(
    lines: &[&str],
    section: Option<&Section>,
    rules: &PeakRules,
    sink: &dyn DiagnosticSink,
) -> ChromatographyTable {
    let mut decoded = section
        .map(|s| scan_section(&s.lines(lines), rules, sink))
        .unwrap_or_default();
    if decoded.is_empty() {
        note(sink, "chromatography", "line scan found no peaks, trying document fallback");
        decoded = fallback_scan(&lines.join("\n"), rules, sink);
    }

    let total_area = section
        .and_then(|s| s.declared_total)
        .filter(|v| *v > 0.0)
        .or_else(|| (!decoded.is_empty()).then(|| decoded.iter().map(|p| p.area).sum()));

    let peaks: Vec<ChromatographyPeak> = decoded
        .iter()
        .enumerate()
        .map(|(i, p)| ChromatographyPeak {
            peak_no: p.peak_no.unwrap_or(i as u32 + 1),
            peak_name: p.name.clone(),
            retention_time: p.retention_time,
            area: p.area,
            amount_ppm: p.amount_ppm,
            amount_pct: p.amount_ppm.map(|ppm| fixed4(ppm / 10_000.0)),
            is_quantified: p.amount_ppm.is_some(),
            height: p.height,
            relative_area: p.relative_area,
            relative_height: p.relative_height,
        })
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut analytes = Vec::new();
    for p in &decoded {
        let Some(ppm) = p.amount_ppm.filter(|v| *v > 0.0) else {
            continue;
        };
        if !seen.insert(p.name.as_str()) {
            note(sink, "chromatography", &format!("skipped duplicate: {}", p.name));
            continue;
        }
        analytes.push(AnalyteResult {
            analyte: p.name.clone(),
            result_pct: fixed4(ppm / 10_000.0),
            result_mg_g: Some(fixed4(ppm / 1_000.0)),
            detected: true,
            retention_time: Some(p.retention_time),
            area: Some(p.area),
            area_pct: total_area
                .filter(|t| *t > 0.0)
                .map(|t| fixed4(p.area / t * 100.0)),
        });
    }
    sort_by_pct_desc(&mut analytes);

    ChromatographyTable {
        peaks,
        analytes,
        total_area,
    }
}
