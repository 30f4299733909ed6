// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_airdata::config::Config;
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

fn assert_rejected_with_sample(yaml: &str) -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, yaml)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );

    // The sample holds the defaults and is itself valid
    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config, Config::default());
    Ok(())
}

#[test]
fn test_type_mismatch_creates_sample_file() -> Result<()> {
    setup();
    assert_rejected_with_sample(
        r#"
sensor:
  port: "not-an-integer"
  simulate: "yes"
database:
  host: 12345
"#,
    )
}

#[test]
fn test_unknown_key_is_rejected() -> Result<()> {
    setup();
    assert_rejected_with_sample(
        r#"
sensor:
  hostname: "127.0.0.1"
"#,
    )
}

#[test]
fn test_schema_range_violation() -> Result<()> {
    setup();
    assert_rejected_with_sample(
        r#"
sensor:
  measurement_interval: 1
"#,
    )
}

#[test]
fn test_specific_rule_violation() -> Result<()> {
    setup();
    // Within the schema bounds, outside the compensation range
    assert_rejected_with_sample(
        r#"
sensor:
  pressure_mbar: 500
"#,
    )
}

#[test]
fn test_malformed_yaml_is_an_error() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "sensor: [unclosed")?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse YAML"));
    Ok(())
}

#[test]
fn test_pressure_zero_disables_compensation() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "sensor:\n  pressure_mbar: 0\n")?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.sensor.pressure_mbar, 0);
    assert!(!config_path.with_extension("sample.yaml").exists());
    Ok(())
}
