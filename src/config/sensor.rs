// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! SCD30 sensor configuration
//!
//! This module defines how the daemon reaches the SCD30 (pigpio daemon host
//! and port, I2C bus and address) and how the measurement is driven.

use serde::{Deserialize, Serialize};

use crate::scd30::retry::{DEFAULT_FAILURE_CEILING, DEFAULT_RETRY_BACKOFF};
use crate::scd30::{DEFAULT_I2C_ADDRESS, DEFAULT_I2C_BUS};
use crate::transport::pigpio::DEFAULT_PIGPIO_PORT;

/// Configuration of the SCD30 sensor and its bus link.
///
/// # Example
///
/// ```
/// use rust_airdata::config::SensorConfig;
///
/// let sensor = SensorConfig {
///     host: "192.168.1.20".to_string(),
///     pressure_mbar: 1013,
///     measurement_interval: 30,
///     ..SensorConfig::default()
/// };
/// assert_eq!(sensor.address, 0x61);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Host running the pigpio daemon the sensor is wired to.
    pub host: String,

    /// TCP port of the pigpio daemon socket interface (default 8888).
    pub port: u16,

    /// I2C bus index on the host.
    pub bus: u8,

    /// 7-bit I2C address of the SCD30 (0x61 unless strapped otherwise).
    pub address: u8,

    /// Ambient pressure used for compensation, in mbar.
    ///
    /// Valid values are 700 to 1400; 0 disables pressure compensation.
    pub pressure_mbar: u16,

    /// Sampling interval in seconds, 2 to 1800.
    ///
    /// The daemon reads the interval from the sensor at start-up and writes it
    /// only when the two differ.
    pub measurement_interval: u16,

    /// Consecutive failed polls tolerated before the sensor is declared
    /// unresponsive.
    pub failure_ceiling: u32,

    /// Pause after a failed poll, in milliseconds.
    pub retry_backoff_ms: u64,

    /// Pause between a command and the read of its response, in milliseconds.
    pub command_delay_ms: u64,

    /// Automatic self-calibration to apply at start-up.
    ///
    /// When unset, the setting stored in the sensor is left unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_self_calibration: Option<bool>,

    /// Replace the real sensor by the in-memory simulation.
    pub simulate: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PIGPIO_PORT,
            bus: DEFAULT_I2C_BUS,
            address: DEFAULT_I2C_ADDRESS,
            pressure_mbar: 944,
            measurement_interval: 2,
            failure_ceiling: DEFAULT_FAILURE_CEILING,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF.as_millis() as u64,
            command_delay_ms: 5,
            auto_self_calibration: None,
            simulate: false,
        }
    }
}
