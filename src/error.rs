use crate::section::TableKind;
use thiserror::Error;

/// Extraction problems. Every variant except `NoDocuments` is recoverable:
/// the pipeline records it as a diagnostic and keeps whatever else it found.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("{0} table not found")]
    TableNotFound(TableKind),

    #[error("row rejected ({reason}): {line}")]
    RowRejected { line: String, reason: String },

    #[error("no plausible relative-area split: {0}")]
    AmbiguousFieldSplit(String),

    #[error("invalid numeric token: {0:?}")]
    InvalidNumericToken(String),

    #[error("no documents supplied")]
    NoDocuments,
}

impl ExtractError {
    pub fn rejected(line: &str, reason: impl Into<String>) -> Self {
        ExtractError::RowRejected {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a numeric token, falling back to zero for markers and garbage.
pub fn parse_or_zero(token: &str) -> f64 {
    parse_number(token).unwrap_or(0.0)
}

pub fn parse_number(token: &str) -> Result<f64, ExtractError> {
    let t = token.trim();
    match t.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ExtractError::InvalidNumericToken(t.to_string())),
    }
}
