use coa_extract::{
    config::Config,
    diagnostics::{DiagnosticSink, FileSink, MemorySink, NullSink},
    pipeline::Pipeline,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const KCA: &str = include_str!("fixtures/kca_potency.txt");
const INTEGRATION: &str = include_str!("fixtures/chromeleon_integration.txt");

#[test]
fn sink_choice_does_not_change_results() {
    let quiet = Pipeline::new(&Config::default(), NullSink).unwrap();
    let sink = MemorySink::new();
    let recording = Pipeline::new(&Config::default(), &sink).unwrap();

    for doc in [KCA, INTEGRATION] {
        assert_eq!(quiet.extract(doc), recording.extract(doc));
    }
    assert!(!sink.entries().is_empty());
}

#[test]
fn potency_decisions_are_recorded_by_stage() {
    let sink = MemorySink::new();
    let pipeline = Pipeline::new(&Config::default(), &sink).unwrap();
    pipeline.extract(KCA);

    assert!(sink.contains("format", "TabularPotency"));
    assert!(sink.contains("rows", "THCA"));
    assert!(sink.contains("potency", "extracted"));
    assert!(sink.contains("potency", "skipped non-detect"));
    assert!(sink.contains("thc", "final"));
}

#[test]
fn missing_table_is_recorded() {
    let pipeline = Pipeline::new(&Config::default(), MemorySink::new()).unwrap();
    pipeline.extract("Cannabinoids by HPLC\nCBD 0.01 0.05 1.0 10.0\n");

    assert!(pipeline.sink().contains("section", "terpene table not found"));
    assert_eq!(pipeline.config().tabular.lookahead_lines, 5);
}

#[test]
fn file_sink_appends_lines() {
    let path = std::env::temp_dir().join(format!("coa-extract-diag-{}.log", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let sink = FileSink::new(&path);
    assert_eq!(sink.path(), path.as_path());
    sink.record("rows", "CBD 0.01 0.05 1.0 10.0");
    sink.record("thc", "final 0.0000%");

    let written = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("] rows: CBD 0.01 0.05 1.0 10.0"));
    assert!(lines[1].ends_with("] thc: final 0.0000%"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn unwritable_file_sink_is_silent() {
    let path = std::env::temp_dir()
        .join("coa-extract-missing-dir")
        .join("nested")
        .join("diag.log");
    let sink = FileSink::new(&path);
    sink.record("rows", "dropped");
    assert!(!path.exists());
}

#[test]
fn boxed_sinks_forward() {
    let boxed: Box<dyn DiagnosticSink> = Box::new(MemorySink::new());
    let pipeline = Pipeline::new(&Config::default(), boxed).unwrap();
    let res = pipeline.extract(INTEGRATION);
    assert_eq!(res.cannabinoids.len(), 3);
}

#[test]
fn bad_boilerplate_pattern_is_a_config_error() {
    let mut cfg = Config::default();
    cfg.chromatography.boilerplate_name_pattern = "(".to_string();
    let err = match Pipeline::new(&cfg, NullSink) {
        Ok(_) => panic!("expected a config error"),
        Err(err) => err,
    };
    assert!(format!("{err:#}").contains("boilerplate_name_pattern"));
}

proptest! {
    #[test]
    fn extraction_never_panics(text in "\\PC{0,400}") {
        let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
        let _ = pipeline.extract(&text);
    }

    #[test]
    fn table_shaped_noise_never_panics(
        body in prop::collection::vec("[A-Za-z0-9Δ .:<-]{0,40}", 0..30),
        chromatography in any::<bool>(),
    ) {
        let title = if chromatography {
            "Integration Results ppm"
        } else {
            "Cannabinoids by HPLC"
        };
        let text = format!("{title}\n{}", body.join("\n"));
        let pipeline = Pipeline::new(&Config::default(), NullSink).unwrap();
        let res = pipeline.extract(&text);
        prop_assert!(res.cannabinoids.iter().all(|a| a.detected));
    }
}
