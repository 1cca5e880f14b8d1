use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub normalize: Normalize,
    #[serde(default)]
    pub tabular: Tabular,
    #[serde(default)]
    pub chromatography: Chromatography,
    #[serde(default)]
    pub compliance: Compliance,
    #[serde(default)]
    pub diagnostics: Diagnostics,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Normalize {
    pub normalize_newlines: bool,
    pub normalize_unicode: bool,
    pub strip_control_chars: bool,
}
impl Default for Normalize {
    fn default() -> Self {
        Self {
            normalize_newlines: true,
            normalize_unicode: true,
            strip_control_chars: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tabular {
    /// How many following lines the row reconstructor may inspect.
    pub lookahead_lines: usize,
    /// Longest non-numeric fragment treated as a wrapped analyte-name suffix.
    pub max_fragment_chars: usize,
    /// Extra case-insensitive phrases that close the potency table.
    pub extra_end_markers: Vec<String>,
    pub known_labs: Vec<String>,
    pub unknown_lab_name: String,
}
impl Default for Tabular {
    fn default() -> Self {
        Self {
            lookahead_lines: 5,
            max_fragment_chars: 3,
            extra_end_markers: Vec::new(),
            known_labs: vec!["KCA Laboratories".into(), "Confident Cannabis".into()],
            unknown_lab_name: "Unknown Lab".into(),
        }
    }
}

/// Field-width assumptions of the delimiter-free ("squashed") peak row and
/// the plausibility limits applied to chromatography rows.
///
/// A squashed row reads `name RT area height rel_area rel_height amount`
/// with every field glued to the next. Only the decimal widths below make
/// the boundaries recoverable; `height_decimal_candidates` is the single
/// ambiguous width and is resolved by trying each candidate in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Chromatography {
    pub retention_decimals: usize,
    pub area_decimals: usize,
    pub relative_decimals: usize,
    pub amount_decimals: usize,
    pub height_decimal_candidates: Vec<usize>,
    /// Retention times above this are assumed to have swallowed a name digit.
    pub absorbed_digit_rt_threshold: f64,
    pub max_name_chars_line: usize,
    pub max_name_chars_fallback: usize,
    /// Case-insensitive regex for report chrome that can look like a peak name.
    pub boilerplate_name_pattern: String,
    pub lab_name: String,
}
impl Default for Chromatography {
    fn default() -> Self {
        Self {
            retention_decimals: 3,
            area_decimals: 3,
            relative_decimals: 2,
            amount_decimals: 4,
            height_decimal_candidates: vec![2, 3, 4],
            absorbed_digit_rt_threshold: 30.0,
            max_name_chars_line: 30,
            max_name_chars_fallback: 50,
            boilerplate_name_pattern: "Reporte|Chromeleon|Injection|Page|Method".into(),
            lab_name: "Chromeleon".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Compliance {
    pub thca_factor: f64,
    pub thc_limit_pct: f64,
    pub verification_tolerance_pct: f64,
}
impl Default for Compliance {
    fn default() -> Self {
        Self {
            thca_factor: 0.877,
            thc_limit_pct: 1.0,
            verification_tolerance_pct: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    pub enabled: bool,
    pub file_path: String,
}
impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            enabled: false,
            file_path: "debug_extraction.log".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_input_bytes: u64,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}
