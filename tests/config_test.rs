use std::collections::HashMap;
use std::io::Write;

use aztro_patterns::{ConfigError, EngineConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn defaults_are_valid() {
    let config = EngineConfig::default();
    assert!(config.validate().is_ok());
    assert!(!config.aspects.node_special_aspects);
    assert_eq!(config.extraction.min_events, 3);
    assert_eq!(config.extraction.degree_min_occurrences, 3);
    assert_eq!(config.extraction.aspect_min_occurrences, 3);
    assert_eq!(config.extraction.nakshatra_min_occurrences, 2);
    assert_eq!(config.extraction.combined_min_occurrences, 2);
    assert_eq!(config.extraction.sign_min_deviation, 1.0);
    assert_eq!(config.extraction.max_patterns_per_family, None);
    assert!(config.extraction.parallel);
    assert_eq!(config.risk.min_training_rows, 5);
}

#[test]
fn partial_toml_keeps_remaining_defaults() {
    let config = EngineConfig::from_toml_str(
        r#"
        [aspects]
        node_special_aspects = true

        [extraction]
        min_events = 10
        max_patterns_per_family = 25
        "#,
    )
    .unwrap();
    assert!(config.aspects.node_special_aspects);
    assert_eq!(config.extraction.min_events, 10);
    assert_eq!(config.extraction.max_patterns_per_family, Some(25));
    assert_eq!(config.extraction.nakshatra_min_occurrences, 2);
    assert_eq!(config.risk.min_training_rows, 5);
}

#[test]
fn zero_thresholds_are_rejected() {
    let err = EngineConfig::from_toml_str("[extraction]\nmin_events = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "extraction.min_events"));

    let err = EngineConfig::from_toml_str("[extraction]\nnakshatra_min_occurrences = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "extraction.nakshatra_min_occurrences"));

    let err = EngineConfig::from_toml_str("[extraction]\nsign_min_deviation = -1.0\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));

    let err = EngineConfig::from_toml_str("[risk]\nmin_training_rows = 1\n").unwrap_err();
    assert!(err.to_string().contains("risk.min_training_rows"));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = EngineConfig::from_toml_str("[extraction\nmin_events = 3").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));

    let err = EngineConfig::from_toml_str("[extraction]\nmin_events = \"three\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn env_overrides_win_over_file_values() {
    let mut config = EngineConfig::from_toml_str("[extraction]\nmin_events = 10\nparallel = true\n").unwrap();
    config.apply_overrides(lookup(&[
        ("AZTRO_NODE_SPECIAL_ASPECTS", "yes"),
        ("AZTRO_MIN_EVENTS", " 7 "),
        ("AZTRO_PARALLEL", "off"),
    ]));
    assert!(config.aspects.node_special_aspects);
    assert_eq!(config.extraction.min_events, 7);
    assert!(!config.extraction.parallel);
}

#[test]
fn unparseable_env_values_are_ignored() {
    let mut config = EngineConfig::default();
    config.apply_overrides(lookup(&[
        ("AZTRO_NODE_SPECIAL_ASPECTS", "maybe"),
        ("AZTRO_MIN_EVENTS", "many"),
    ]));
    assert!(!config.aspects.node_special_aspects);
    assert_eq!(config.extraction.min_events, 3);
}

#[test]
fn load_reads_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[extraction]\ndegree_min_occurrences = 4\n\n[risk]\nmin_training_rows = 9").unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.extraction.degree_min_occurrences, 4);
    assert_eq!(config.risk.min_training_rows, 9);
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    let err = EngineConfig::load(&missing).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn config_errors_convert_into_astrology_errors() {
    let err: aztro_patterns::AstrologyError = EngineConfig::from_toml_str("[extraction]\nmin_events = 0\n")
        .unwrap_err()
        .into();
    assert!(matches!(err, aztro_patterns::AstrologyError::Config(_)));
}
