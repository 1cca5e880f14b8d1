use crate::config::{Normalize, Tabular};
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    /// A continuation line holding only the LOD/LOQ/result columns of a row.
    static ref VALUES_ONLY: Regex = Regex::new(
        r"(?i)^(?:<LO[QD]|\d+(?:\.\d+)?)\s+(?:<LO[QD]|\d+(?:\.\d+)?)(?:\s+(?:ND|<LO[QD]|\d+(?:\.\d+)?)){1,2}$"
    )
    .unwrap();

    static ref HAS_VALUE: Regex = Regex::new(r"(?i)(?:\d+\.\d+|\bND\b|<LO[QD])").unwrap();
}

/// Canonical glyph for the Greek delta used in analyte names.
pub const DELTA: char = 'Δ';

/// Prepare decoded document text before any line-level work.
pub fn prepare_document(cfg: &Normalize, raw: &str) -> String {
    let mut s = if cfg.normalize_newlines {
        raw.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        raw.to_string()
    };

    if cfg.normalize_unicode {
        s = s.nfkc().collect::<String>();
    }

    if cfg.strip_control_chars {
        s = strip_control_chars(&s);
    }

    s
}

fn strip_control_chars(s: &str) -> String {
    s.chars()
        .filter(|&ch| ch == '\n' || ch == '\t' || !ch.is_control())
        .collect()
}

pub fn unify_delta(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'Δ' | 'δ' | '∆' => DELTA,
            other => other,
        })
        .collect()
}

/// Trim, unify delta glyphs and collapse whitespace runs to one space.
pub fn normalize_line(line: &str) -> String {
    let unified = unify_delta(line.trim());
    WHITESPACE_RUN.replace_all(&unified, " ").into_owned()
}

pub fn has_value_token(s: &str) -> bool {
    HAS_VALUE.is_match(s)
}

pub fn is_values_only(s: &str) -> bool {
    VALUES_ONLY.is_match(s)
}

fn is_name_fragment(s: &str, max_chars: usize) -> bool {
    s.chars().count() <= max_chars && !s.chars().any(|c| c.is_ascii_digit())
}

/// Merge table lines that PDF text extraction split apart, one logical row
/// per output string.
///
/// A row is closed when a values-only line follows a name that has no
/// numbers yet. Short non-numeric lines are wrapped name suffixes and are
/// glued on without a space. Look-ahead stops once the row carries numbers.
pub fn reconstruct_rows(lines: &[&str], cfg: &Tabular) -> Vec<String> {
    let mut merged = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let cur = normalize_line(lines[i]);
        if cur.is_empty() {
            i += 1;
            continue;
        }

        let mut acc = cur;
        let mut j = i + 1;
        let mut consumed = 0;

        while j < lines.len() && consumed < cfg.lookahead_lines {
            let next = normalize_line(lines[j]);
            if next.is_empty() {
                j += 1;
                consumed += 1;
                continue;
            }

            let has_numbers = has_value_token(&acc);

            if !has_numbers && is_values_only(&next) {
                acc.push(' ');
                acc.push_str(&next);
                i = j;
                break;
            }

            if is_name_fragment(&next, cfg.max_fragment_chars) {
                acc.push_str(&next);
                i = j;
                j += 1;
                consumed += 1;
                continue;
            }

            if has_numbers {
                break;
            }

            j += 1;
            consumed += 1;
        }

        merged.push(acc);
        i += 1;
    }

    merged
}
