//! Known analyte names and the shape rules used to reject table noise.

use crate::text::unify_delta;
use lazy_static::lazy_static;
use regex::Regex;

const CANNABINOIDS: &[&str] = &[
    "CBC",
    "CBCA",
    "CBCV",
    "CBD",
    "CBDA",
    "CBDB",
    "CBDP",
    "CBDV",
    "CBDVA",
    "CBG",
    "CBGA",
    "CBL",
    "CBLA",
    "CBN",
    "CBNA",
    "CBT",
    "Δ8-THC",
    "Δ8-THCA",
    "Δ8-THCB",
    "Δ8-THC-C8",
    "Δ8-THCH",
    "Δ8-THCP",
    "Δ8-THCV",
    "Δ9-THC",
    "Δ9-THCA",
    "Δ9-THCB",
    "Δ9-THC-C8",
    "Δ9-THCH",
    "Δ9-THCP",
    "Δ9-THCV",
    "Δ9-THCVA",
    "Δ4,8-iso-THC",
    "Δ8-iso-THC",
    "Δ10-THC",
    "Δ6a,10a-THC",
    "Δ7-THC",
    "THC",
    "THCA",
    "THCVA",
    "THCOA",
    "THCBA",
    "THCB",
    "THCH",
    "THCP",
    "THCPV",
    "(6aR,9R,10aR)-HHC",
    "(6aR,9S,10aR)-HHC",
    "HHC",
    "(6aR,9R,10aR)-HHCo",
    "(6aR,9S,10aR)-HHCo",
    "HHCo",
    "HHC-o",
    "HHC-O",
    "9R-HHCP",
    "9S-HHCP",
    "HHCP",
    "(6aR,9R,10aR)-HHC acetate",
    "(6aR,9S,10aR)-HHC acetate",
    "9R-HHCP acetate",
    "9S-HHCP acetate",
    "CBN acetate",
    "CBC acetate",
    "CBD acetate",
    "CBG acetate",
    "Δ8-THC acetate",
    "Δ9-THC acetate",
    "THCA acetate",
    "CBDA acetate",
    "CBGA acetate",
    "Total Δ9-THC",
    "Total Δ8-THC",
    "Total THC",
    "Total CBD",
    "Total CBG",
    "Total CBN",
    "Total CBC",
    "Total Cannabinoids",
    "Total",
];

const TERPENES: &[&str] = &[
    "α-Pinene",
    "β-Pinene",
    "β-Myrcene",
    "Myrcene",
    "Limonene",
    "D-Limonene",
    "Linalool",
    "β-Caryophyllene",
    "Caryophyllene Oxide",
    "α-Humulene",
    "Humulene",
    "Terpinolene",
    "Ocimene",
    "β-Ocimene",
    "α-Bisabolol",
    "Bisabolol",
    "trans-Nerolidol",
    "cis-Nerolidol",
    "Nerolidol",
    "Guaiol",
    "Eucalyptol",
    "Geraniol",
    "Camphene",
    "Borneol",
    "Fenchol",
    "Valencene",
    "Sabinene",
    "Pulegone",
    "Isopulegol",
    "Cedrol",
    "Phytol",
    "α-Terpineol",
    "Terpineol",
    "3-Carene",
    "α-Phellandrene",
    "Fenchone",
    "Menthol",
    "Citronellol",
    "Nerol",
    "Geranyl acetate",
    "Isoborneol",
    "trans-β-Farnesene",
    "Camphor",
    "Total Terpenes",
];

lazy_static! {
    static ref CANNABINOID_SHAPE: Regex =
        Regex::new(r"(?i)^(?:Total|CB[ACDLGNTB]|THC|HHC|Δ\d-|\(|9R-|9S-)").unwrap();
    static ref ACETATE_SUFFIX: Regex = Regex::new(r"(?i)acetate$").unwrap();
    static ref TERPENE_SHAPE: Regex =
        Regex::new(r"(?i)^(?:[αβγΔ]-|cis-|trans-|\d-)*[A-Za-z][A-Za-z\- ]*(?:ene|ol|one|oxide|acetate)$")
            .unwrap();
}

/// A curated name list kept sorted longest first, so a qualified compound
/// such as `Δ9-THC-C8` is always considered before any shorter name it
/// contains.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: Vec<String>,
}

impl Vocabulary {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<String> = names
            .into_iter()
            .map(|n| unify_delta(n.as_ref()))
            .collect();
        entries.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        entries.dedup();
        Self { entries }
    }

    pub fn cannabinoids() -> Self {
        Self::new(CANNABINOIDS)
    }

    pub fn terpenes() -> Self {
        Self::new(TERPENES)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The vocabulary entry equal to `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let name = unify_delta(name.trim());
        self.entries
            .iter()
            .find(|e| e.as_str() == name)
            .map(String::as_str)
    }

    /// The longest vocabulary entry that `text` starts with.
    pub fn longest_prefix(&self, text: &str) -> Option<&str> {
        let text = unify_delta(text.trim());
        self.entries
            .iter()
            .find(|e| text.starts_with(e.as_str()))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRule {
    Cannabinoid,
    Terpene,
}

impl ShapeRule {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ShapeRule::Cannabinoid => {
                CANNABINOID_SHAPE.is_match(name) || ACETATE_SUFFIX.is_match(name)
            }
            ShapeRule::Terpene => TERPENE_SHAPE.is_match(name),
        }
    }
}

/// Accepts a decoded row name when it is a known analyte or looks like one.
#[derive(Debug, Clone)]
pub struct AnalyteValidator {
    vocabulary: Vocabulary,
    shape: ShapeRule,
}

impl AnalyteValidator {
    pub fn new(vocabulary: Vocabulary, shape: ShapeRule) -> Self {
        Self { vocabulary, shape }
    }

    pub fn cannabinoids() -> Self {
        Self::new(Vocabulary::cannabinoids(), ShapeRule::Cannabinoid)
    }

    pub fn terpenes() -> Self {
        Self::new(Vocabulary::terpenes(), ShapeRule::Terpene)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.canonical(name).is_some()
    }

    /// The name to report for a decoded row, or `None` for noise.
    ///
    /// Footnote marks glued to a known name (`Δ9-THC-C8*`) resolve to the
    /// longest vocabulary entry the name starts with.
    pub fn canonical(&self, name: &str) -> Option<String> {
        if let Some(known) = self.vocabulary.lookup(name) {
            return Some(known.to_string());
        }
        if let Some(prefix) = self.vocabulary.longest_prefix(name) {
            let unified = unify_delta(name.trim());
            let rest = &unified[prefix.len()..];
            if !rest.is_empty() && rest.chars().all(is_footnote_mark) {
                return Some(prefix.to_string());
            }
        }
        if self.shape.matches(name) {
            return Some(name.trim().to_string());
        }
        None
    }
}

fn is_footnote_mark(c: char) -> bool {
    matches!(c, '*' | '†' | '‡' | '^' | ' ')
}
