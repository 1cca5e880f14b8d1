use crate::{
    config::Compliance,
    diagnostics::{note, DiagnosticSink},
    report::{AnalyteResult, ComplianceStatus, TestStatus},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref DELTA_PREFIX: Regex = Regex::new(r"^Δ\d").unwrap();
    static ref DELTA_WORD_PREFIX: Regex = Regex::new(r"(?i)^DELTA\s*\d").unwrap();
    static ref D_SHORTHAND: Regex = Regex::new(r"(?i)^D\d+-THC").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verification {
    Match,
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    #[serde(rename = "thcOver1")]
    pub thc_over_limit: bool,
    /// Reported total: the lab's own total when it gave one, else the sum.
    #[serde(rename = "calculatedTotalTHC")]
    pub calculated_total_thc: f64,
    pub verification: Verification,
    #[serde(rename = "summedTotalTHC")]
    pub summed_total_thc: f64,
    #[serde(rename = "officialTotalTHC", skip_serializing_if = "Option::is_none")]
    pub official_total_thc: Option<f64>,
}

impl ComplianceResult {
    /// True when total THC stays within the limit.
    pub fn is_compliant(&self) -> bool {
        !self.thc_over_limit
    }

    pub fn status(&self) -> ComplianceStatus {
        if self.thc_over_limit {
            ComplianceStatus::Fail
        } else {
            ComplianceStatus::Pass
        }
    }
}

/// A THC-family analyte that counts toward total THC. Lab-reported totals
/// are excluded so they are not counted twice.
pub fn is_thc_variant(analyte: &str) -> bool {
    let upper = analyte.to_uppercase();
    (DELTA_PREFIX.is_match(analyte)
        || DELTA_WORD_PREFIX.is_match(analyte)
        || upper.contains("THC")
        || D_SHORTHAND.is_match(analyte))
        && !upper.starts_with("TOTAL")
}

fn is_official_total(analyte: &str) -> bool {
    let upper = analyte.to_uppercase();
    upper.starts_with("TOTAL") && upper.contains("THC")
}

fn conversion_factor(cfg: &Compliance, analyte: &str) -> f64 {
    if analyte.to_uppercase().contains("THCA") {
        cfg.thca_factor
    } else {
        1.0
    }
}

pub fn calculate(
    cfg: &Compliance,
    cannabinoids: &[AnalyteResult],
    sink: &dyn DiagnosticSink,
) -> ComplianceResult {
    let mut summed = 0.0;
    let mut official: Option<f64> = None;

    for it in cannabinoids {
        if it.analyte.is_empty() {
            continue;
        }
        let value = it.pct();

        if is_official_total(&it.analyte) {
            official = Some(value);
            continue;
        }

        if is_thc_variant(&it.analyte) {
            let factor = conversion_factor(cfg, &it.analyte);
            summed += value * factor;
            note(
                sink,
                "thc",
                &format!("{}: {}% x {} = {:.4}%", it.analyte, value, factor, value * factor),
            );
        }
    }

    let official_value = official.unwrap_or(0.0);
    let final_total = if official_value > 0.0 {
        official_value
    } else {
        summed
    };
    let verification = if (official_value - summed).abs() < cfg.verification_tolerance_pct {
        Verification::Match
    } else {
        Verification::Mismatch
    };

    note(
        sink,
        "thc",
        &format!(
            "summed {:.4}% official {:.4}% final {:.4}% {:?}",
            summed, official_value, final_total, verification
        ),
    );

    ComplianceResult {
        thc_over_limit: final_total > cfg.thc_limit_pct,
        calculated_total_thc: final_total,
        verification,
        summed_total_thc: summed,
        official_total_thc: official,
    }
}

/// Ancillary test categories whose presence is detected in report text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    HeavyMetals,
    Pesticides,
    ResidualSolvents,
    ForeignMatter,
    Terpenes,
}

impl Category {
    fn rule(&self) -> &'static StatusRule {
        match self {
            Category::HeavyMetals => &*HEAVY_METALS,
            Category::Pesticides => &*PESTICIDES,
            Category::ResidualSolvents => &*RESIDUAL_SOLVENTS,
            Category::ForeignMatter => &*FOREIGN_MATTER,
            Category::Terpenes => &*TERPENES,
        }
    }
}

struct StatusRule {
    not_tested: Regex,
    failed: Regex,
    passed: Vec<Regex>,
    method: Option<Regex>,
    /// Analytes that must also appear before a method title counts as a run.
    method_requires: Option<Regex>,
}

impl StatusRule {
    fn new(label: &str, method: Option<&str>, method_requires: Option<&str>) -> Self {
        let re = |p: String| Regex::new(&p).unwrap();
        Self {
            not_tested: re(format!(r"(?i){label}.*?Not Tested")),
            failed: re(format!(r"(?i){label}.*?Failed")),
            passed: vec![
                re(format!(r"(?i){label}.*?Tested")),
                re(format!(r"(?i){label}.*?Pass(?:ed)?")),
                re(format!(r"(?is){label}.{{0,100}}Passed")),
            ],
            method: method.map(|m| re(format!(r"(?i){m}"))),
            method_requires: method_requires.map(|m| re(format!(r"(?i){m}"))),
        }
    }

    fn check(&self, text: &str) -> TestStatus {
        if self.not_tested.is_match(text) {
            return TestStatus::NotTested;
        }
        if self.failed.is_match(text) {
            return TestStatus::Fail;
        }
        if self.passed.iter().any(|r| r.is_match(text)) {
            return TestStatus::Pass;
        }
        if let Some(method) = &self.method {
            let required = self
                .method_requires
                .as_ref()
                .is_none_or(|r| r.is_match(text));
            if method.is_match(text) && required {
                return TestStatus::Pass;
            }
        }
        TestStatus::NotTested
    }
}

lazy_static! {
    static ref HEAVY_METALS: StatusRule = StatusRule::new(
        "Heavy Metals",
        Some(r"Heavy Metals by ICP-MS"),
        Some(r"Arsenic|Cadmium|Lead|Mercury"),
    );
    static ref PESTICIDES: StatusRule =
        StatusRule::new("Pesticides", Some(r"Pesticides by LC-MS/MS"), None);
    static ref RESIDUAL_SOLVENTS: StatusRule =
        StatusRule::new("Residual Solvents", Some(r"Residual Solvents by HS-GC-MS"), None);
    static ref FOREIGN_MATTER: StatusRule = StatusRule::new("Foreign Matter", None, None);
    static ref TERPENES: StatusRule = StatusRule::new("Terpenes", Some(r"Terpenes by GC"), None);
}

/// Presence check for one ancillary category. This reads marker phrases
/// only; it never evaluates the category's numbers.
pub fn check_status(category: Category, text: &str) -> TestStatus {
    category.rule().check(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AncillaryStatuses {
    pub heavy_metals: TestStatus,
    pub pesticides: TestStatus,
    pub residual_solvents: TestStatus,
    pub foreign_matter: TestStatus,
    pub terpenes: TestStatus,
}

impl AncillaryStatuses {
    pub fn from_text(text: &str) -> Self {
        Self {
            heavy_metals: check_status(Category::HeavyMetals, text),
            pesticides: check_status(Category::Pesticides, text),
            residual_solvents: check_status(Category::ResidualSolvents, text),
            foreign_matter: check_status(Category::ForeignMatter, text),
            terpenes: check_status(Category::Terpenes, text),
        }
    }
}
