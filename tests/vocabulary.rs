use coa_extract::{
    config::Tabular,
    metadata::{analysis_date, batch_id, lab_name, sample_info},
    vocabulary::{AnalyteValidator, ShapeRule, Vocabulary},
};
use pretty_assertions::assert_eq;

#[test]
fn entries_are_longest_first() {
    let vocab = Vocabulary::new(["THC", "Δ9-THC-C8", "δ9-THC"]);
    assert_eq!(vocab.entries(), ["Δ9-THC-C8", "Δ9-THC", "THC"]);
    assert_eq!(vocab.lookup(" δ9-THC "), Some("Δ9-THC"));
    assert_eq!(vocab.longest_prefix("Δ9-THC-C8*"), Some("Δ9-THC-C8"));
    assert_eq!(vocab.longest_prefix("CBD"), None);
}

#[test]
fn footnote_marks_resolve_to_known_name() {
    let v = AnalyteValidator::new(Vocabulary::new(["THC", "Δ9-THC-C8"]), ShapeRule::Cannabinoid);
    assert_eq!(v.canonical("Δ9-THC-C8*").as_deref(), Some("Δ9-THC-C8"));
    assert_eq!(v.canonical("Δ9-THC-C8 †").as_deref(), Some("Δ9-THC-C8"));
    assert_eq!(v.canonical("THC").as_deref(), Some("THC"));
}

#[test]
fn cannabinoid_shape_admits_unlisted_compounds() {
    let v = AnalyteValidator::cannabinoids();
    assert!(v.vocabulary().lookup("Δ9-THC").is_some());
    assert!(v.accepts("CBDV-X"));
    assert!(v.accepts("HHC acetate"));
    assert!(v.accepts("(6aR,9R)-Δ10-THC"));
    assert!(!v.accepts("Page 1 of 3"));
    assert!(!v.accepts("Lead"));
    assert!(!v.accepts("Moisture"));
}

#[test]
fn terpene_shape_follows_suffixes() {
    let v = AnalyteValidator::terpenes();
    assert!(v.accepts("β-Myrcene"));
    assert!(v.accepts("Linalool"));
    assert!(v.accepts("cis-Nerolidol"));
    assert!(!v.accepts("Arsenic"));
    assert!(!v.accepts("Total THC"));
}

#[test]
fn batch_id_skips_sample_fields() {
    assert_eq!(batch_id("Batch: Sample Type Flower\n"), "");
    assert_eq!(batch_id("Batch: AB-77\n"), "AB-77");
    assert_eq!(batch_id("header\nAB-123.4\nfooter"), "AB-123.4");
    assert_eq!(batch_id("Certificate of Analysis\nLOT 9\n"), "LOT 9");
}

#[test]
fn lab_and_date() {
    let tabular = Tabular::default();
    assert_eq!(lab_name("by Confident Cannabis", &tabular), "Confident Cannabis");
    assert_eq!(lab_name("by Somewhere Labs", &tabular), "Unknown Lab");
    assert_eq!(
        analysis_date("Tested 2024-03-05, reported 01/02/2024").as_deref(),
        Some("2024-03-05")
    );
    assert_eq!(analysis_date("no dates"), None);
}

#[test]
fn sample_fields_are_optional() {
    assert_eq!(sample_info("nothing here"), None);
    let info = sample_info("Water Activity: 0.52").expect("sample info");
    assert_eq!(info.water_activity, Some(0.52));
    assert_eq!(info.sample_type, None);
}
