use coa_extract::{
    average::{average, average_analytes},
    config::{Compliance, Config},
    diagnostics::{MemorySink, NullSink},
    error::ExtractError,
    pipeline::Pipeline,
    report::{AnalyteResult, ComplianceStatus, TestStatus},
};
use pretty_assertions::assert_eq;

const INTEGRATION: &str = include_str!("fixtures/chromeleon_integration.txt");
const KCA: &str = include_str!("fixtures/kca_potency.txt");

const REPLICATE_A: &str = "\
Cannabinoids by HPLC-UV
Analyte LOD LOQ Result Result
THCA 0.01 0.05 10.0 100.0
CBD 0.01 0.05 1.0 10.0
Heavy Metals by ICP-MS Passed
Pesticides Passed
";

const REPLICATE_B: &str = "\
Cannabinoids by HPLC-UV
Analyte LOD LOQ Result Result
THCA 0.01 0.05 ND ND
CBD 0.01 0.05 0.5 5.0
Heavy Metals Failed
";

fn names(list: &[AnalyteResult]) -> Vec<&str> {
    list.iter().map(|a| a.analyte.as_str()).collect()
}

#[test]
fn identical_replicates_average_to_themselves() {
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();

    for doc in [INTEGRATION, KCA] {
        let single = pipeline.extract(doc);
        for n in 2..=4 {
            let texts = vec![doc; n];
            let averaged = pipeline.extract_replicates(&texts).unwrap();

            let mut expected = single.clone();
            expected.metadata.averaged_files = Some(n);
            assert_eq!(averaged, expected);
        }
    }
}

#[test]
fn printed_precision_survives_identical_replicates() {
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract_replicates(&[KCA, KCA]).unwrap();

    let thca = &res.cannabinoids[0];
    assert_eq!(thca.analyte, "THCA");
    assert_eq!(thca.result_pct, "10.0");
    assert_eq!(thca.result_mg_g.as_deref(), Some("100.0"));
    let cbd = res.cannabinoids.iter().find(|a| a.analyte == "CBD").unwrap();
    assert_eq!(cbd.result_pct, "1.250");
}

#[test]
fn differing_print_is_averaged() {
    let lists = [
        vec![AnalyteResult {
            analyte: "CBD".to_string(),
            result_pct: "1.0".to_string(),
            result_mg_g: Some("10.0".to_string()),
            detected: true,
            retention_time: None,
            area: None,
            area_pct: None,
        }],
        vec![AnalyteResult {
            analyte: "CBD".to_string(),
            result_pct: "1.00".to_string(),
            result_mg_g: Some("10.0".to_string()),
            detected: true,
            retention_time: None,
            area: None,
            area_pct: None,
        }],
    ];
    let out = average_analytes(lists.iter().map(Vec::as_slice), 2);
    assert_eq!(out[0].result_pct, "1.0000");
    assert_eq!(out[0].result_mg_g.as_deref(), Some("10.0"));
}

#[test]
fn a_single_text_is_returned_as_extracted() {
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract_replicates(&[INTEGRATION]).unwrap();
    assert_eq!(res, pipeline.extract(INTEGRATION));
    assert_eq!(res.metadata.averaged_files, None);
}

#[test]
fn missing_analytes_count_as_zero() {
    let sink = MemorySink::new();
    let pipeline = Pipeline::new(&Config::default(), &sink).unwrap();
    let res = pipeline.extract_replicates(&[REPLICATE_A, REPLICATE_B]).unwrap();

    assert_eq!(names(&res.cannabinoids), vec!["THCA", "CBD"]);
    assert_eq!(res.cannabinoids[0].result_pct, "5.0000");
    assert_eq!(res.cannabinoids[0].result_mg_g.as_deref(), Some("50.0000"));
    assert_eq!(res.cannabinoids[1].result_pct, "0.7500");
    assert_eq!(res.cannabinoids[1].result_mg_g.as_deref(), Some("7.5000"));

    assert!((res.metadata.calculated_total_thc - 4.385).abs() < 1e-9);
    assert_eq!(res.compliance_status, ComplianceStatus::Fail);
    assert_eq!(res.metadata.averaged_files, Some(2));
    assert!(sink.contains("average", "over 2 files"));
}

#[test]
fn any_failing_replicate_fails_the_category() {
    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let res = pipeline.extract_replicates(&[REPLICATE_A, REPLICATE_B]).unwrap();

    assert_eq!(res.heavy_metals_status, TestStatus::Fail);
    assert_eq!(res.pesticides_status, TestStatus::Pass);
    assert_eq!(res.foreign_matter_status, TestStatus::NotTested);
}

#[test]
fn undetected_everywhere_is_dropped() {
    let detected = AnalyteResult {
        analyte: "CBG".to_string(),
        result_pct: "0.4".to_string(),
        result_mg_g: None,
        detected: true,
        retention_time: Some(5.5),
        area: Some(10.0),
        area_pct: None,
    };
    let never = AnalyteResult {
        analyte: "CBC".to_string(),
        detected: false,
        result_pct: "0".to_string(),
        ..detected.clone()
    };

    let first = vec![detected.clone(), never.clone()];
    let second = vec![never];
    let out = average_analytes([first.as_slice(), second.as_slice()], 2);

    assert_eq!(names(&out), vec!["CBG"]);
    assert_eq!(out[0].result_pct, "0.2000");
    assert_eq!(out[0].result_mg_g, None);
    // Retention time and area only average where they were reported.
    assert_eq!(out[0].retention_time, Some(5.5));
    assert_eq!(out[0].area, Some(10.0));
}

#[test]
fn nothing_to_average() {
    let err = average(&[], &Compliance::default(), &NullSink).unwrap_err();
    assert_eq!(err, ExtractError::NoDocuments);

    let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
    let none: [&str; 0] = [];
    assert_eq!(pipeline.extract_replicates(&none).unwrap_err(), ExtractError::NoDocuments);
}
