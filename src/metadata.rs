//! Labelled document fields outside the result tables.

use crate::{
    config::Tabular,
    error::parse_number,
    report::{ClientInfo, InjectionDetails, SampleInfo, SignatureType, Technician},
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BATCH_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)Certificate of Analysis\s*\n([^\n]+)").unwrap(),
        Regex::new(r"(?m)^([A-Z]{2,4}[-.0-9]+\.?\d*)$").unwrap(),
        Regex::new(r"(?i)Batch\s*:\s*([^\n]+)").unwrap(),
        Regex::new(r"(?i)Batch:\s*(\S+)").unwrap(),
    ];
    static ref DATE: Regex = Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})|(\d{4}-\d{2}-\d{2})").unwrap();
    static ref DATE_LINE: Regex =
        Regex::new(r"(?i)^(?:Date\s*:?\s*)?(?:\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2})").unwrap();

    static ref SAMPLE_TYPE: Regex = Regex::new(r"(?im)^\s*Sample Type\s*:\s*(.+?)\s*$").unwrap();
    static ref MOISTURE: Regex =
        Regex::new(r"(?i)Moisture(?: Content)?\s*:\s*(\d+(?:\.\d+)?)").unwrap();
    static ref WATER_ACTIVITY: Regex =
        Regex::new(r"(?i)Water Activity\s*:\s*(\d+(?:\.\d+)?)").unwrap();
    static ref UNIT_MASS: Regex =
        Regex::new(r"(?i)Unit Mass(?:\s*\(g\))?\s*:\s*(\d+(?:\.\d+)?)").unwrap();

    static ref SIGNATURE: Regex = Regex::new(r"(?i)^(Generated By|Tested By)\s*:?\s*(.*)$").unwrap();
    static ref CLIENT_HEADER: Regex =
        Regex::new(r"(?i)^(?:Client|Analyzed For)\s*(?::\s*(.*))?$").unwrap();
    static ref LICENSE: Regex =
        Regex::new(r"(?i)^(?:License|Lic\.?)\s*(?:#|No\.?|Number)?\s*:?\s*(.+)$").unwrap();
    static ref LABELED: Regex = Regex::new(r"^[A-Za-z][A-Za-z ()/#]{0,30}:").unwrap();

    static ref INJECTION_NAME: Regex = Regex::new(r"(?i)Injection Name:\s*([^\n\r]+)").unwrap();
    static ref VIAL_NUMBER: Regex = Regex::new(r"(?i)Vial Number:\s*([^\n\r]+)").unwrap();
    static ref INJECTION_TYPE: Regex = Regex::new(r"(?i)Injection Type:\s*([^\n\r]+)").unwrap();
    static ref INSTRUMENT_METHOD: Regex =
        Regex::new(r"(?i)Instrument Method:\s*([^\n\r]+)").unwrap();
    static ref PROCESSING_METHOD: Regex =
        Regex::new(r"(?i)Processing Method:\s*([^\n\r]+)").unwrap();
    static ref INJECTION_DATETIME: Regex =
        Regex::new(r"(?i)Injection Date/Time:\s*([^\n\r]+)").unwrap();
    static ref RUN_TIME: Regex = Regex::new(r"(?i)Run Time \(min\):\s*([\d.]+)").unwrap();
    static ref INJECTION_VOLUME: Regex = Regex::new(r"(?i)Injection Volume:\s*([\d.]+)").unwrap();
    static ref CHANNEL: Regex = Regex::new(r"(?i)Channel:\s*([^\n\r]+)").unwrap();
    static ref WAVELENGTH: Regex = Regex::new(r"(?i)Wavelength:\s*([\d.]+)").unwrap();
    static ref BANDWIDTH: Regex = Regex::new(r"(?i)Bandwidth:\s*([\d.]+)").unwrap();
    static ref DILUTION_FACTOR: Regex = Regex::new(r"(?i)Dilution Factor:\s*([\d.]+)").unwrap();
    static ref SAMPLE_WEIGHT: Regex = Regex::new(r"(?i)Sample Weight:\s*([\d.]+)").unwrap();
}

const CLIENT_BLOCK_LINES: usize = 6;
const SIGNATURE_WINDOW: usize = 4;

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First batch-id candidate that is not a mislabelled sample field.
pub fn batch_id(text: &str) -> String {
    BATCH_PATTERNS
        .iter()
        .filter_map(|re| capture(re, text))
        .find(|v| !v.contains("Sample") && !v.contains("Type"))
        .unwrap_or_default()
}

pub fn lab_name(text: &str, cfg: &Tabular) -> String {
    cfg.known_labs
        .iter()
        .find(|lab| text.contains(lab.as_str()))
        .cloned()
        .unwrap_or_else(|| cfg.unknown_lab_name.clone())
}

pub fn analysis_date(text: &str) -> Option<String> {
    DATE.find(text).map(|m| m.as_str().to_string())
}

pub fn sample_info(text: &str) -> Option<SampleInfo> {
    let number = |re: &Regex| capture(re, text).and_then(|v| parse_number(&v).ok());
    let info = SampleInfo {
        sample_type: capture(&SAMPLE_TYPE, text),
        moisture_content: number(&MOISTURE),
        water_activity: number(&WATER_ACTIVITY),
        unit_mass_g: number(&UNIT_MASS),
    };
    (!info.is_empty()).then_some(info)
}

/// Signature blocks: the name inline or on the next line, then a role line,
/// with a date somewhere in the block. At most one per signature type.
pub fn technicians(lines: &[&str]) -> Vec<Technician> {
    let mut out: Vec<Technician> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = SIGNATURE.captures(line.trim()) else {
            continue;
        };
        let signature_type = if caps[1].eq_ignore_ascii_case("generated by") {
            SignatureType::GeneratedBy
        } else {
            SignatureType::TestedBy
        };
        if out.iter().any(|t| t.signature_type == signature_type) {
            continue;
        }

        let window: Vec<&str> = lines[i + 1..]
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .take_while(|l| !SIGNATURE.is_match(l))
            .take(SIGNATURE_WINDOW)
            .collect();
        let mut rest = window.iter().copied();

        let inline = caps[2].trim();
        let name = if inline.is_empty() {
            rest.by_ref().find(|l| !DATE_LINE.is_match(l)).unwrap_or("")
        } else {
            inline
        };
        if name.is_empty() {
            continue;
        }
        let role = rest
            .find(|l| !DATE_LINE.is_match(l) && !LABELED.is_match(l))
            .unwrap_or("");
        let date = std::iter::once(inline)
            .chain(window.iter().copied())
            .find_map(|l| DATE.find(l))
            .map(|m| m.as_str().to_string());

        out.push(Technician {
            name: name.to_string(),
            role: role.to_string(),
            date,
            signature_type,
        });
    }
    out
}

/// The address block under a `Client` or `Analyzed For` header. Lines are
/// positional: name, street, city/state/zip, country. License lines are
/// collected separately and any other labelled line ends the block.
pub fn client_info(lines: &[&str]) -> Option<ClientInfo> {
    let (i, caps) = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| CLIENT_HEADER.captures(l.trim()).map(|c| (i, c)))?;

    let mut fields: Vec<String> = Vec::new();
    if let Some(inline) = caps.get(1).map(|m| m.as_str().trim()).filter(|s| !s.is_empty()) {
        fields.push(inline.to_string());
    }
    let mut licenses = Vec::new();

    for line in lines[i + 1..]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .take(CLIENT_BLOCK_LINES)
    {
        if let Some(lic) = LICENSE.captures(line) {
            licenses.push(lic[1].trim().to_string());
            continue;
        }
        if LABELED.is_match(line) || SIGNATURE.is_match(line) {
            break;
        }
        fields.push(line.to_string());
    }

    let mut fields = fields.into_iter();
    let info = ClientInfo {
        name: fields.next().unwrap_or_default(),
        address: fields.next().unwrap_or_default(),
        city_state_zip: fields.next().unwrap_or_default(),
        country: fields.next().unwrap_or_default(),
        licenses,
    };
    (!info.name.is_empty()).then_some(info)
}

pub fn injection_details(text: &str) -> InjectionDetails {
    InjectionDetails {
        injection_name: capture(&INJECTION_NAME, text),
        vial_number: capture(&VIAL_NUMBER, text),
        injection_type: capture(&INJECTION_TYPE, text),
        instrument_method: capture(&INSTRUMENT_METHOD, text),
        processing_method: capture(&PROCESSING_METHOD, text),
        injection_datetime: capture(&INJECTION_DATETIME, text),
        run_time: capture(&RUN_TIME, text),
        injection_volume: capture(&INJECTION_VOLUME, text),
        channel: capture(&CHANNEL, text),
        wavelength: capture(&WAVELENGTH, text),
        bandwidth: capture(&BANDWIDTH, text),
        dilution_factor: capture(&DILUTION_FACTOR, text),
        sample_weight: capture(&SAMPLE_WEIGHT, text),
    }
}
