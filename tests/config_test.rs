// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_airdata::config::{
    validate_specific_rules, Config, ConfigOverrides, DatabaseConfig, LoggingConfig, SensorConfig,
};
use rust_airdata::scd30::Scd30Settings;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let config = Config {
        sensor: SensorConfig {
            host: "192.168.1.20".to_string(),
            pressure_mbar: 1013,
            measurement_interval: 30,
            auto_self_calibration: Some(true),
            ..SensorConfig::default()
        },
        database: DatabaseConfig {
            host: "influx.local".to_string(),
            name: "airdata".to_string(),
            ..DatabaseConfig::default()
        },
        logging: LoggingConfig {
            dir: "/var/log/airdata".to_string(),
            verbose: true,
            quiet: false,
        },
    };

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config, config);

    Ok(())
}

#[test]
fn test_missing_file_creates_default() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("non_existent.yaml");

    let config = Config::from_file(&config_path)?;
    assert!(config_path.exists());
    assert_eq!(config, Config::default());

    assert_eq!(config.sensor.host, "127.0.0.1");
    assert_eq!(config.sensor.port, 8888);
    assert_eq!(config.sensor.bus, 1);
    assert_eq!(config.sensor.address, 0x61);
    assert_eq!(config.sensor.pressure_mbar, 944);
    assert_eq!(config.sensor.measurement_interval, 2);
    assert_eq!(config.sensor.failure_ceiling, 20);
    assert_eq!(config.sensor.retry_backoff_ms, 100);
    assert_eq!(config.sensor.auto_self_calibration, None);
    assert!(config.database.enabled);
    assert_eq!(config.database.host, "localhost");
    assert_eq!(config.database.port, 8086);
    assert_eq!(config.database.user, "admin");
    assert_eq!(config.database.password, "admin");
    assert_eq!(config.database.name, "mydb");
    assert_eq!(config.logging.dir, "./logging");

    // The written default loads back unchanged
    assert_eq!(Config::from_file(&config_path)?, config);
    Ok(())
}

#[test]
fn test_partial_file_uses_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("partial.yaml");
    fs::write(
        &config_path,
        r#"
sensor:
  host: "10.0.0.5"
  measurement_interval: 60
database:
  enabled: false
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.sensor.host, "10.0.0.5");
    assert_eq!(config.sensor.measurement_interval, 60);
    assert_eq!(config.sensor.pressure_mbar, 944);
    assert!(!config.database.enabled);
    assert_eq!(config.database.name, "mydb");
    assert_eq!(config.logging, LoggingConfig::default());
    Ok(())
}

#[test]
fn test_empty_file_is_default() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("empty.yaml");
    fs::write(&config_path, "")?;

    assert_eq!(Config::from_file(&config_path)?, Config::default());
    Ok(())
}

#[test]
fn test_yaml_scalars_are_deserialized() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("scalars.yaml");
    fs::write(
        &config_path,
        "sensor:\n  address: 0x62\n  auto_self_calibration: ~\n  simulate: yes_please\n",
    )?;
    // Not a YAML 1.2 boolean
    assert!(Config::from_file(&config_path).is_err());

    fs::write(
        &config_path,
        "sensor:\n  address: 0x62\n  auto_self_calibration: ~\n  simulate: true\n",
    )?;
    let config = Config::from_file(&config_path)?;
    assert_eq!(config.sensor.address, 0x62);
    assert_eq!(config.sensor.auto_self_calibration, None);
    assert!(config.sensor.simulate);
    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();
    config.apply_args(ConfigOverrides {
        log_dir: Some("/tmp/airdata".to_string()),
        measurement_interval: Some(120),
        sensor_host: Some("raspberrypi.local".to_string()),
        sensor_port: Some(8889),
        pressure_mbar: Some(1013),
        db_host: Some("db".to_string()),
        db_port: Some(9086),
        db_user: Some("writer".to_string()),
        db_password: Some("secret".to_string()),
        db_name: Some("air".to_string()),
        no_database: true,
        simulate: true,
        verbose: true,
        quiet: false,
    });

    assert_eq!(config.logging.dir, "/tmp/airdata");
    assert!(config.logging.verbose);
    assert_eq!(config.sensor.measurement_interval, 120);
    assert_eq!(config.sensor.host, "raspberrypi.local");
    assert_eq!(config.sensor.port, 8889);
    assert_eq!(config.sensor.pressure_mbar, 1013);
    assert!(config.sensor.simulate);
    assert_eq!(config.database.host, "db");
    assert_eq!(config.database.port, 9086);
    assert_eq!(config.database.user, "writer");
    assert_eq!(config.database.password, "secret");
    assert_eq!(config.database.name, "air");
    assert!(!config.database.enabled);
    assert!(validate_specific_rules(&config).is_ok());
}

#[test]
fn test_apply_args_keeps_unset_values() {
    let mut config = Config::default();
    config.apply_args(ConfigOverrides::default());
    assert_eq!(config, Config::default());
}

#[test]
fn test_override_out_of_range_is_caught() {
    let mut config = Config::default();
    config.apply_args(ConfigOverrides {
        measurement_interval: Some(1801),
        ..ConfigOverrides::default()
    });
    assert!(validate_specific_rules(&config).is_err());
}

#[test]
fn test_sensor_settings_from_config() {
    let sensor = SensorConfig {
        failure_ceiling: 7,
        retry_backoff_ms: 40,
        command_delay_ms: 3,
        ..SensorConfig::default()
    };
    let settings = Scd30Settings::from(&sensor);
    assert_eq!(settings.retry.ceiling, 7);
    assert_eq!(settings.retry.backoff, Duration::from_millis(40));
    assert_eq!(settings.command_delay, Duration::from_millis(3));
}
