// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensirion SCD30 driver
//!
//! The SCD30 measures CO2 concentration, temperature and relative humidity.
//! This module implements its I2C command/response protocol on top of any
//! [`I2cTransport`]:
//!
//! - `crc`: CRC-8 of the 16-bit data words
//! - `float`: big-endian float reconstruction from pairs of words
//! - `command`: command opcodes and wire encoding
//! - `retry`: bounded retry policy for measurement polling
//! - `connection`: session open/probe/close and shutdown paths
//! - `measurement`: start/poll/read/stop cycle and interval negotiation
//!
//! ## Usage
//!
//! ```no_run
//! use rust_airdata::scd30::{Scd30, Scd30Settings, ShutdownMode};
//! use rust_airdata::transport::PigpioTransport;
//!
//! async fn sample() -> anyhow::Result<()> {
//!     let transport = PigpioTransport::new("127.0.0.1", 8888);
//!     let mut sensor = Scd30::open(transport, Scd30Settings::default()).await?;
//!
//!     sensor.start(944).await?;
//!     let reading = sensor.read_measurement().await?;
//!     println!("CO2: {:.1} ppm", reading.co2_ppm);
//!
//!     sensor.shutdown(ShutdownMode::Graceful).await;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod connection;
pub mod crc;
pub mod error;
pub mod float;
pub mod measurement;
pub mod retry;

pub use command::Command;
pub use connection::ShutdownMode;
pub use crc::RawWord;
pub use error::Scd30Error;
pub use retry::{FailureCounter, RetryDecision, RetryPolicy};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::SensorConfig;
use crate::transport::I2cTransport;

/// Default I2C bus of the sensor
pub const DEFAULT_I2C_BUS: u8 = 1;
/// Default I2C address of the SCD30
pub const DEFAULT_I2C_ADDRESS: u8 = 0x61;

/// Session state of the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Measuring,
}

/// Progress of the measurement cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementState {
    Idle,
    Started,
    Polling,
    NotReady,
    ReadingReady,
    Failed,
    Decoded,
    Fatal,
}

/// One decoded sample
///
/// Only produced once all six words of a measurement passed their checksum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub co2_ppm: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    /// Completion time of the read
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CO2_ppm: {:.1} | T: {:.1} °C | rH: {:.1} %",
            self.co2_ppm, self.temperature_c, self.humidity_pct
        )
    }
}

/// Firmware version reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Static parameters of a sensor session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scd30Settings {
    pub bus: u8,
    pub address: u8,
    pub retry: RetryPolicy,
    /// Pause between writing a command and reading its response
    pub command_delay: Duration,
}

impl Default for Scd30Settings {
    fn default() -> Self {
        Self {
            bus: DEFAULT_I2C_BUS,
            address: DEFAULT_I2C_ADDRESS,
            retry: RetryPolicy::default(),
            command_delay: Duration::from_millis(5),
        }
    }
}

impl From<&SensorConfig> for Scd30Settings {
    fn from(config: &SensorConfig) -> Self {
        Self {
            bus: config.bus,
            address: config.address,
            retry: RetryPolicy::new(
                config.failure_ceiling,
                Duration::from_millis(config.retry_backoff_ms),
            ),
            command_delay: Duration::from_millis(config.command_delay_ms),
        }
    }
}

/// An SCD30 reached through an I2C transport
///
/// The driver exclusively owns the transport and the failure counter; all
/// operations take `&mut self`, so requests never overlap.
pub struct Scd30<T: I2cTransport> {
    transport: T,
    settings: Scd30Settings,
    state: ConnectionState,
    phase: MeasurementState,
    failures: FailureCounter,
}

impl<T: I2cTransport> Scd30<T> {
    /// Wrap a transport without touching the bus
    pub fn new(transport: T, settings: Scd30Settings) -> Self {
        Self {
            transport,
            failures: settings.retry.counter(),
            settings,
            state: ConnectionState::Disconnected,
            phase: MeasurementState::Idle,
        }
    }

    pub fn settings(&self) -> &Scd30Settings {
        &self.settings
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn measurement_state(&self) -> MeasurementState {
        self.phase
    }

    pub fn failure_counter(&self) -> &FailureCounter {
        &self.failures
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Fail unless a session is open (measuring or not)
    fn require_session(&self) -> Result<(), Scd30Error> {
        match self.state {
            ConnectionState::Connected | ConnectionState::Measuring => Ok(()),
            ConnectionState::Disconnected => Err(Scd30Error::InvalidState {
                expected: ConnectionState::Connected,
                actual: self.state,
            }),
        }
    }

    fn require_state(&self, expected: ConnectionState) -> Result<(), Scd30Error> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Scd30Error::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    async fn send(&mut self, command: Command) -> Result<(), Scd30Error> {
        debug!("Sending '{}'", command);
        self.transport.write(&command.encode()).await.map_err(|e| {
            debug!("Writing '{}' to I2C failed: {}", command, e);
            Scd30Error::Transport(e)
        })
    }

    /// Send a command and read back its checksum-validated response words
    async fn query(&mut self, command: Command) -> Result<Vec<RawWord>, Scd30Error> {
        self.send(command).await?;
        if !self.settings.command_delay.is_zero() {
            tokio::time::sleep(self.settings.command_delay).await;
        }
        let length = command.response_len();
        let data = self.transport.read(length).await?;
        debug!("read {} bytes for '{}'", data.len(), command);
        let words = crc::split_words(&data)?;
        if words.len() * crc::RAW_WORD_LEN != length {
            return Err(Scd30Error::InvalidLength {
                expected: length,
                actual: data.len(),
            });
        }
        Ok(words)
    }
}
