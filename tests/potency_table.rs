use coa_extract::{
    config::Config,
    decode::potency::{decode_row, extract_table, is_detected_value},
    diagnostics::{MemorySink, NullSink},
    format::DocumentFormat,
    pipeline::Pipeline,
    report::{ComplianceStatus, SignatureType, TestStatus},
    vocabulary::AnalyteValidator,
};
use pretty_assertions::assert_eq;

const KCA: &str = include_str!("fixtures/kca_potency.txt");

fn names(list: &[coa_extract::report::AnalyteResult]) -> Vec<&str> {
    list.iter().map(|a| a.analyte.as_str()).collect()
}

#[test]
fn extracts_full_potency_report() {
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract(KCA);

    assert_eq!(res.format, DocumentFormat::TabularPotency);
    assert_eq!(res.lab_name, "KCA Laboratories");
    assert_eq!(res.batch_id, "KN-240115-01");
    assert_eq!(res.analysis_date.as_deref(), Some("01/15/2024"));
    assert_eq!(names(&res.cannabinoids), vec!["THCA", "Total THC", "CBD", "Δ9-THC"]);

    let thca = &res.cannabinoids[0];
    assert_eq!(thca.result_pct, "10.0");
    assert_eq!(thca.result_mg_g.as_deref(), Some("100.0"));
    assert!(thca.detected);

    assert_eq!(res.heavy_metals_status, TestStatus::Pass);
    assert_eq!(res.pesticides_status, TestStatus::NotTested);
    assert_eq!(res.residual_solvents_status, TestStatus::NotTested);
    assert_eq!(res.foreign_matter_status, TestStatus::NotTested);
    assert_eq!(res.terpenes_status, TestStatus::Pass);

    assert!((res.metadata.calculated_total_thc - 9.27).abs() < 1e-9);
    assert!(!res.thc_compliance_flag);
    assert_eq!(res.compliance_status, ComplianceStatus::Fail);
    assert_eq!(res.metadata.averaged_files, None);
}

#[test]
fn terpene_profile_is_separate_from_potency() {
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract(KCA);

    let terpenes = res.terpenes.expect("terpene table");
    assert_eq!(names(&terpenes), vec!["β-Myrcene", "Limonene"]);
    assert!(!names(&res.cannabinoids).contains(&"Limonene"));
}

#[test]
fn non_detects_are_excluded() {
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract(KCA);

    let found = names(&res.cannabinoids);
    assert!(!found.contains(&"CBN"));
    assert!(!found.contains(&"CBG"));
    assert!(res.cannabinoids.iter().all(|a| a.detected && a.pct() > 0.0));
}

#[test]
fn rows_after_heavy_metals_header_are_ignored() {
    let doc = "\
Cannabinoids by HPLC-UV
Analyte LOD LOQ Result Result
CBD 0.01 0.05 0.80 8.0
Heavy Metals by ICP-MS Passed
CBC 0.01 0.05 0.90 9.0
Lead 0.01 0.05 0.02 0.2
";
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract(doc);

    assert_eq!(names(&res.cannabinoids), vec!["CBD"]);
    assert_eq!(res.heavy_metals_status, TestStatus::Pass);
}

#[test]
fn longer_names_are_not_shadowed() {
    let rows = vec![
        "THC 0.01 0.05 0.30 3.0".to_string(),
        "Δ9-THC-C8 0.01 0.05 0.20 2.0".to_string(),
        "Δ9-THC-C8* 0.01 0.05 0.10 1.0".to_string(),
    ];
    let res = extract_table(&rows, &AnalyteValidator::cannabinoids(), &NullSink);

    assert_eq!(names(&res), vec!["THC", "Δ9-THC-C8"]);
    assert_eq!(res[1].result_pct, "0.20");
}

#[test]
fn wrapped_rows_are_rejoined() {
    let doc = "\
Cannabinoids by HPLC-UV
Analyte LOD LOQ Result Result
Δ9-THC
0.01 0.05 0.75 7.5
CBD
V
0.01 0.05 0.40 4.0
Summary
";
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract(doc);

    assert_eq!(names(&res.cannabinoids), vec!["Δ9-THC", "CBDV"]);
}

#[test]
fn lowercase_delta_terpenes_are_recognized() {
    let doc = "\
Terpenes by GC-MS
δ-Cadinene 0.01 0.05 0.20 2.0
Limonene 0.01 0.05 0.30 3.0
";
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract(doc);

    let terpenes = res.terpenes.expect("terpene table");
    assert_eq!(names(&terpenes), vec!["Limonene", "Δ-Cadinene"]);
}

#[test]
fn lowercase_and_increment_delta_glyphs_unify() {
    let doc = "\
Cannabinoids by HPLC-UV
δ9-THC 0.01 0.05 0.75 7.5
∆8-THC 0.01 0.05 0.25 2.5
";
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract(doc);

    assert_eq!(names(&res.cannabinoids), vec!["Δ9-THC", "Δ8-THC"]);
}

#[test]
fn noise_rows_are_rejected_and_recorded() {
    let rows = vec![
        "Page 1 of 3 0.01 0.05 1.0 10.0".to_string(),
        "CBD 0.01 0.05 1.0 10.0".to_string(),
        "CBD 0.01 0.05 2.0 20.0".to_string(),
    ];
    let sink = MemorySink::new();
    let res = extract_table(&rows, &AnalyteValidator::cannabinoids(), &sink);

    assert_eq!(names(&res), vec!["CBD"]);
    assert_eq!(res[0].result_pct, "1.0");
    assert!(sink.contains("potency", "not an analyte"));
    assert!(sink.contains("potency", "skipped duplicate"));
}

#[test]
fn totals_rows_default_limits_to_zero() {
    let row = decode_row("Total Δ9-THC 0.62 6.2").expect("totals row");
    assert_eq!(row.name, "Total Δ9-THC");
    assert_eq!(row.lod, "0");
    assert_eq!(row.loq, "0");
    assert_eq!(row.result_pct, "0.62");
    assert_eq!(row.result_mg_g, "6.2");
}

#[test]
fn totals_row_with_extra_value_column_is_rejected() {
    assert_eq!(decode_row("Total THC 0.05 9.27 92.7"), None);
    assert_eq!(decode_row("Total Cannabinoids 0.01 10.5 105.0"), None);
    assert_eq!(decode_row("Total THC ND 9.27 92.7"), None);

    let doc = "\
Cannabinoids by HPLC-UV
CBD 0.01 0.05 1.0 10.0
Total THC 0.05 9.27 92.7
";
    let sink = MemorySink::new();
    let pipeline = Pipeline::new(&Config::default(), &sink).unwrap();
    let res = pipeline.extract(doc);

    assert_eq!(names(&res.cannabinoids), vec!["CBD"]);
    assert!(sink.contains("potency", "no row pattern"));
}

#[test]
fn detection_requires_a_positive_number() {
    assert!(is_detected_value("0.01"));
    assert!(!is_detected_value("0"));
    assert!(!is_detected_value("0.000"));
    assert!(!is_detected_value("ND"));
    assert!(!is_detected_value("<LOQ"));
    assert!(!is_detected_value("<lod"));
    assert!(!is_detected_value("n/a"));
}

#[test]
fn document_fields_outside_tables() {
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract(KCA);

    let sample = res.sample_info.expect("sample info");
    assert_eq!(sample.sample_type.as_deref(), Some("Flower"));
    assert_eq!(sample.moisture_content, Some(4.2));
    assert_eq!(sample.water_activity, Some(0.45));
    assert_eq!(sample.unit_mass_g, Some(3.5));

    let client = res.client_info.expect("client block");
    assert_eq!(client.name, "Green Valley Farms");
    assert_eq!(client.address, "123 Main St");
    assert_eq!(client.city_state_zip, "Denver, CO 80202");
    assert_eq!(client.country, "USA");
    assert_eq!(client.licenses, vec!["402R-00123".to_string()]);

    assert_eq!(res.technicians.len(), 2);
    let generated = &res.technicians[0];
    assert_eq!(generated.signature_type, SignatureType::GeneratedBy);
    assert_eq!(generated.name, "Jane Smith");
    assert_eq!(generated.role, "Laboratory Director");
    assert_eq!(generated.date.as_deref(), Some("01/16/2024"));
    let tested = &res.technicians[1];
    assert_eq!(tested.signature_type, SignatureType::TestedBy);
    assert_eq!(tested.name, "John Doe");
    assert_eq!(tested.role, "Analyst");
    assert_eq!(tested.date.as_deref(), Some("01/15/2024"));
}

#[test]
fn unrecognized_text_yields_empty_result() {
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract("scanned image\n\u{fffd}\u{fffd}\u{fffd}");

    assert_eq!(res.format, DocumentFormat::TabularPotency);
    assert!(res.cannabinoids.is_empty());
    assert!(res.terpenes.is_none());
    assert_eq!(res.lab_name, "Unknown Lab");
    assert_eq!(res.batch_id, "");
    assert_eq!(res.heavy_metals_status, TestStatus::NotTested);
    assert_eq!(res.compliance_status, ComplianceStatus::Pass);
    assert!(res.sample_info.is_none());
    assert!(res.client_info.is_none());
    assert!(res.technicians.is_empty());
}
