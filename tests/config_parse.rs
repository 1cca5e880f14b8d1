use coa_extract::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../coa-extract.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.chromatography.height_decimal_candidates, vec![2, 3, 4]);
    assert_eq!(cfg.compliance.thca_factor, 0.877);
    assert!(cfg.tabular.known_labs.iter().any(|l| l == "KCA Laboratories"));
}

#[test]
fn missing_sections_take_defaults() {
    let cfg: Config = toml::from_str("[compliance]\nthc_limit_pct = 0.3\n").expect("parse TOML");
    assert_eq!(cfg.compliance.thc_limit_pct, 0.3);
    assert_eq!(cfg.tabular.lookahead_lines, 5);
    assert_eq!(cfg.chromatography.amount_decimals, 4);
    assert!(!cfg.diagnostics.enabled);
}
