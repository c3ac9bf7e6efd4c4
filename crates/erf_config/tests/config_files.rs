//! 配置文件读写测试

use erf_config::{ConfigError, CorrectionConfig, CorrectionKind, ForecastConfig, ParamValue};
use erf_foundation::EfError;
use std::io::Write;

#[test]
fn save_and_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forecast.json");

    let mut config = ForecastConfig::default();
    config.name = "roundtrip".to_string();
    config.duration_years = 30.0;
    config.corrections = vec![
        CorrectionConfig {
            kind: CorrectionKind::None,
            weight: 0.25,
        },
        CorrectionConfig {
            kind: CorrectionKind::Fractile { fractile: 0.5 },
            weight: 0.75,
        },
    ];
    config
        .parameters
        .insert("background".to_string(), ParamValue::Text("include".into()));

    config.save_to_file(&path).unwrap();
    let loaded = ForecastConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_file_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = ForecastConfig::from_file(&path).unwrap_err();
    match &err {
        ConfigError::FileNotFound(p) => assert_eq!(p, &path),
        other => panic!("unexpected error: {other}"),
    }
    let err: EfError = err.into();
    assert!(matches!(err, EfError::FileNotFound { .. }));
}

#[test]
fn directory_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ForecastConfig::from_file(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn malformed_json_is_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let err = ForecastConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn invalid_values_rejected_on_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"grid": {{"spacing_deg": -0.1}}}}"#).unwrap();
    let err = ForecastConfig::from_file(file.path()).unwrap_err();
    match err {
        ConfigError::InvalidValue { key, .. } => assert_eq!(key, "grid.spacing_deg"),
        other => panic!("unexpected error: {other}"),
    }
}
