use serde::{Deserialize, Serialize};

/// Section title printed above chromatography data-system peak tables.
pub const INTEGRATION_TITLE: &str = "Integration Results";
/// Concentration unit reported by integration tables.
pub const CONCENTRATION_UNIT: &str = "ppm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    TabularPotency,
    ChromatographyIntegration,
}

/// Pick the extraction pipeline for a document.
///
/// Anything that is not an integration report goes down the tabular path,
/// which yields an empty analyte list for text it cannot read.
pub fn detect(text: &str) -> DocumentFormat {
    if text.contains(INTEGRATION_TITLE) && text.contains(CONCENTRATION_UNIT) {
        DocumentFormat::ChromatographyIntegration
    } else {
        DocumentFormat::TabularPotency
    }
}
