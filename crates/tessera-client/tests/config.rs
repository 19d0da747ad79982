//! Configuration loading from files.

use std::io::Write;
use std::time::Duration;

use tessera_client::ClientConfig;
use tessera_client::ConfigError;

#[test]
fn partial_toml_file_takes_defaults_for_missing_fields() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "operation_timeout_ms = 250").unwrap();
    writeln!(file, "scan_batch_size = 16").unwrap();

    let config = ClientConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.operation_timeout(), Duration::from_millis(250));
    assert_eq!(config.scan_batch_size, 16);
    assert_eq!(config.max_fetch_count, ClientConfig::default().max_fetch_count);
}

#[test]
fn zero_limit_in_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_fetch_size = 0").unwrap();

    let err = ClientConfig::from_toml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_fetch_size"));
}

#[test]
fn malformed_file_reports_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "operation_timeout_ms = \"soon\"").unwrap();

    let err = ClientConfig::from_toml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ClientConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn optional_file_prefers_an_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("client.toml");
    std::fs::write(&path, "multi_remove_max_count = 7\n").unwrap();

    let config = ClientConfig::load_with_optional_file(Some(&path)).unwrap();
    assert_eq!(config.multi_remove_max_count, 7);
}

#[test]
fn config_round_trips_through_toml() {
    let config = ClientConfig {
        operation_timeout_ms: 42,
        ..ClientConfig::default()
    };
    let text = toml::to_string(&config).unwrap();
    let parsed: ClientConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}
