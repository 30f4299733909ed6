// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! Schema access and the validation rules the JSON schema cannot express.

use anyhow::{Context, Result};
use log::debug;

use super::Config;
use crate::scd30::measurement::{MEASUREMENT_INTERVAL_RANGE, PRESSURE_RANGE_MBAR};

/// JSON schema of the configuration file, embedded at build time
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Valid range of 7-bit I2C device addresses
const I2C_ADDRESS_RANGE: std::ops::RangeInclusive<u8> = 0x03..=0x77;

/// Output the embedded JSON schema to the console.
///
/// Called for the `--show-config-schema` flag.
///
/// # Example
///
/// ```bash
/// ./rust_airdata --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;
    println!("{}", formatted_schema);
    Ok(())
}

/// Validates the configuration against rules that aren't covered by the JSON schema.
///
/// Command line overrides bypass the schema, so this is also run after
/// [`Config::apply_args`].
///
/// # Validation Rules
///
/// - **Measurement interval**: 2 to 1800 seconds
/// - **Pressure**: 700 to 1400 mbar, or 0 to disable compensation
/// - **Failure ceiling**: at least one attempt
/// - **I2C address**: a non-reserved 7-bit address
/// - **Ports**: sensor and database ports are non-zero
/// - **Hosts**: not empty
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");
    let sensor = &config.sensor;

    if !MEASUREMENT_INTERVAL_RANGE.contains(&sensor.measurement_interval) {
        anyhow::bail!(
            "Invalid measurement interval: {} s (expected {}..={})",
            sensor.measurement_interval,
            MEASUREMENT_INTERVAL_RANGE.start(),
            MEASUREMENT_INTERVAL_RANGE.end()
        );
    }

    if sensor.pressure_mbar != 0 && !PRESSURE_RANGE_MBAR.contains(&sensor.pressure_mbar) {
        anyhow::bail!(
            "Invalid pressure: {} mbar (expected 0 or {}..={})",
            sensor.pressure_mbar,
            PRESSURE_RANGE_MBAR.start(),
            PRESSURE_RANGE_MBAR.end()
        );
    }

    if sensor.failure_ceiling == 0 {
        anyhow::bail!("Failure ceiling must allow at least one attempt");
    }

    if !I2C_ADDRESS_RANGE.contains(&sensor.address) {
        anyhow::bail!("Invalid I2C address: {:#04x}", sensor.address);
    }

    if sensor.port == 0 {
        anyhow::bail!("Invalid sensor port number: {}", sensor.port);
    }
    if sensor.host.trim().is_empty() && !sensor.simulate {
        anyhow::bail!("Sensor host must not be empty");
    }

    if config.database.enabled {
        if config.database.port == 0 {
            anyhow::bail!("Invalid database port number: {}", config.database.port);
        }
        if config.database.host.trim().is_empty() {
            anyhow::bail!("Database host must not be empty");
        }
        if config.database.name.trim().is_empty() {
            anyhow::bail!("Database name must not be empty");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn test_pressure_rules() {
        let mut config = Config::default();
        config.sensor.pressure_mbar = 0;
        assert!(validate_specific_rules(&config).is_ok());
        config.sensor.pressure_mbar = 1400;
        assert!(validate_specific_rules(&config).is_ok());
        config.sensor.pressure_mbar = 699;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_interval_and_address_rules() {
        let mut config = Config::default();
        config.sensor.measurement_interval = 1;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.sensor.address = 0x78;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.sensor.failure_ceiling = 0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_database_rules_only_when_enabled() {
        let mut config = Config::default();
        config.database.name = String::new();
        assert!(validate_specific_rules(&config).is_err());
        config.database.enabled = false;
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn test_embedded_schema_is_json() {
        let schema: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA).unwrap();
        assert!(schema["properties"]["sensor"].is_object());
    }
}
