// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the air quality daemon
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before being deserialized.
//!
//! ## Configuration Structure
//!
//! - `sensor`: SCD30 link (pigpio host, I2C bus/address) and measurement settings
//! - `database`: InfluxDB the readings are published to
//! - `logging`: log directory and verbosity
//!
//! ## Usage
//!
//! ```no_run
//! use rust_airdata::config::{Config, ConfigOverrides};
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file("config.yaml").unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(ConfigOverrides {
//!     measurement_interval: Some(30),
//!     sensor_host: Some("192.168.1.20".to_string()),
//!     ..ConfigOverrides::default()
//! });
//!
//! println!("Sampling every {} s", config.sensor.measurement_interval);
//! ```

pub mod database;
pub mod logging;
pub mod sensor;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use database::DatabaseConfig;
pub use logging::LoggingConfig;
pub use sensor::SensorConfig;
pub use utils::{output_config_schema, validate_specific_rules, CONFIG_SCHEMA};

/// Root configuration structure of the daemon.
///
/// Each section falls back to its defaults when it is absent from the file,
/// so an empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SCD30 sensor and bus link settings.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Telemetry database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values given on the command line, overriding the configuration file.
///
/// `None` (or `false` for the switches) leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_dir: Option<String>,
    pub measurement_interval: Option<u16>,
    pub sensor_host: Option<String>,
    pub sensor_port: Option<u16>,
    pub pressure_mbar: Option<u16>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_name: Option<String>,
    pub no_database: bool,
    pub simulate: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl Config {
    /// Write a default configuration next to `path` for the user to edit
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let sample_path = path.as_ref().with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// A missing file is created with the default values, which are returned.
    /// A file failing the schema, deserialization or the specific rules leaves
    /// a `<name>.sample.yaml` next to it and yields an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let mut yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;
        // An empty document parses to null, treat it as an empty mapping
        if yaml_value.is_null() {
            yaml_value = serde_yml::Value::Mapping(serde_yml::Mapping::new());
        }

        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = match serde_yml::from_value(yaml_value) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided override the loaded configuration.
    /// The result is not re-validated here; call [`validate_specific_rules`]
    /// afterwards.
    pub fn apply_args(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.log_dir {
            debug!("Overriding log directory from command line: {}", dir);
            self.logging.dir = dir;
        }
        if let Some(interval) = overrides.measurement_interval {
            debug!("Overriding measurement interval from command line: {}", interval);
            self.sensor.measurement_interval = interval;
        }
        if let Some(host) = overrides.sensor_host {
            debug!("Overriding sensor host from command line: {}", host);
            self.sensor.host = host;
        }
        if let Some(port) = overrides.sensor_port {
            debug!("Overriding sensor port from command line: {}", port);
            self.sensor.port = port;
        }
        if let Some(pressure) = overrides.pressure_mbar {
            debug!("Overriding pressure from command line: {}", pressure);
            self.sensor.pressure_mbar = pressure;
        }
        if overrides.simulate {
            debug!("Using simulated sensor");
            self.sensor.simulate = true;
        }

        if let Some(host) = overrides.db_host {
            debug!("Overriding database host from command line: {}", host);
            self.database.host = host;
        }
        if let Some(port) = overrides.db_port {
            debug!("Overriding database port from command line: {}", port);
            self.database.port = port;
        }
        if let Some(user) = overrides.db_user {
            debug!("Overriding database user from command line: {}", user);
            self.database.user = user;
        }
        if let Some(password) = overrides.db_password {
            debug!("Overriding database password from command line");
            self.database.password = password;
        }
        if let Some(name) = overrides.db_name {
            debug!("Overriding database name from command line: {}", name);
            self.database.name = name;
        }
        if overrides.no_database {
            debug!("Database publishing disabled from command line");
            self.database.enabled = false;
        }

        if overrides.verbose {
            self.logging.verbose = true;
        }
        if overrides.quiet {
            self.logging.quiet = true;
        }
    }
}
