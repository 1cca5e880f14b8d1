use crate::{compliance::Verification, format::DocumentFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyteResult {
    pub analyte: String,
    pub result_pct: String,
    pub result_mg_g: Option<String>,
    pub detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    /// Share of the total integrated area, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_pct: Option<String>,
}

impl AnalyteResult {
    pub fn pct(&self) -> f64 {
        crate::error::parse_or_zero(&self.result_pct)
    }

    pub fn mg_g(&self) -> f64 {
        self.result_mg_g
            .as_deref()
            .map(crate::error::parse_or_zero)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromatographyPeak {
    pub peak_no: u32,
    pub peak_name: String,
    pub retention_time: f64,
    pub area: f64,
    pub amount_ppm: Option<f64>,
    pub amount_pct: Option<String>,
    pub is_quantified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture_content: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_activity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_mass_g: Option<f64>,
}

impl SampleInfo {
    pub fn is_empty(&self) -> bool {
        self.sample_type.is_none()
            && self.moisture_content.is_none()
            && self.water_activity.is_none()
            && self.unit_mass_g.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureType {
    #[serde(rename = "Generated By")]
    GeneratedBy,
    #[serde(rename = "Tested By")]
    TestedBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub signature_type: SignatureType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub address: String,
    pub city_state_zip: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InjectionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wavelength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dilution_factor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_weight: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Pass,
    Fail,
    NotTested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub verification: Verification,
    #[serde(rename = "calculatedTotalTHC")]
    pub calculated_total_thc: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_details: Option<InjectionDetails>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peaks: Vec<ChromatographyPeak>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub averaged_files: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub format: DocumentFormat,
    pub lab_name: String,
    pub analysis_date: Option<String>,
    pub batch_id: String,
    pub cannabinoids: Vec<AnalyteResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terpenes: Option<Vec<AnalyteResult>>,
    pub heavy_metals_status: TestStatus,
    pub pesticides_status: TestStatus,
    pub residual_solvents_status: TestStatus,
    pub foreign_matter_status: TestStatus,
    pub terpenes_status: TestStatus,
    pub thc_compliance_flag: bool,
    pub compliance_status: ComplianceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_info: Option<SampleInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technicians: Vec<Technician>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_info: Option<ClientInfo>,
    pub metadata: ExtractionMetadata,
}

/// Sort analytes by reported percentage, highest first. Stable, so equal
/// values keep their table order.
pub fn sort_by_pct_desc(list: &mut [AnalyteResult]) {
    list.sort_by(|a, b| b.pct().total_cmp(&a.pct()));
}
