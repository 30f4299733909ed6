// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session management for the SCD30
//!
//! Opening a session opens the bus handle and probes the sensor by reading
//! its firmware version; a sensor that does not answer is reported as
//! [`Scd30Error::DeviceNotFound`] and the handle is released again.
//!
//! Two shutdown paths exist. The graceful one stops continuous measurement
//! before closing the handle. The hard one soft-resets the sensor first, so
//! that it is left in a clean state whatever was in flight.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    Command, ConnectionState, FirmwareVersion, MeasurementState, Scd30, Scd30Error,
    Scd30Settings,
};
use crate::transport::I2cTransport;

/// Time the sensor needs to come back after a soft reset
pub const SOFT_RESET_SETTLE: Duration = Duration::from_millis(500);

/// How a session is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShutdownMode {
    /// Stop measuring, then close
    Graceful,
    /// Soft reset, then close
    Hard,
}

impl<T: I2cTransport> Scd30<T> {
    /// Open a session on `transport` and probe the sensor.
    ///
    /// # Errors
    ///
    /// * [`Scd30Error::Transport`] if the bus handle cannot be opened
    /// * [`Scd30Error::DeviceNotFound`] if the sensor does not answer the probe
    pub async fn open(transport: T, settings: Scd30Settings) -> Result<Self, Scd30Error> {
        let mut sensor = Self::new(transport, settings);
        sensor.connect().await?;
        Ok(sensor)
    }

    /// Open the bus handle and probe the sensor
    pub async fn connect(&mut self) -> Result<FirmwareVersion, Scd30Error> {
        self.require_state(ConnectionState::Disconnected)?;
        let (bus, address) = (self.settings.bus, self.settings.address);

        self.transport.open(bus, address).await.map_err(|e| {
            error!("I2C opening of connection failed: {}", e);
            Scd30Error::Transport(e)
        })?;

        match self.fetch_firmware_version().await {
            Ok(version) => {
                self.state = ConnectionState::Connected;
                self.phase = MeasurementState::Idle;
                self.failures.reset();
                info!(
                    "Found SCD30 (firmware {}) at {:#04x} on I2C bus {} via {}",
                    version,
                    address,
                    bus,
                    self.transport.transport_type()
                );
                Ok(version)
            }
            Err(e) => {
                error!("SCD30 ({:#04x}) not found on I2C bus {}", address, bus);
                if let Err(close_err) = self.transport.close().await {
                    debug!("Closing after failed probe also failed: {}", close_err);
                }
                Err(Scd30Error::DeviceNotFound {
                    bus,
                    address,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Release the bus handle.
    ///
    /// Safe to call on a closed session; failures are logged, never returned.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Disconnected && !self.transport.is_open() {
            debug!("SCD30 session already closed");
            return;
        }
        if let Err(e) = self.transport.close().await {
            error!("I2C closing of connection failed: {}", e);
        }
        self.state = ConnectionState::Disconnected;
        self.phase = MeasurementState::Idle;
        debug!("SCD30 session closed");
    }

    /// Tear the session down along the requested path and close it.
    ///
    /// Always runs to completion: errors on the way are logged and the
    /// handle is closed regardless.
    pub async fn shutdown(&mut self, mode: ShutdownMode) {
        info!("Shutting down SCD30 session ({:?})", mode);
        match (mode, self.state) {
            (_, ConnectionState::Disconnected) => {}
            (ShutdownMode::Graceful, ConnectionState::Measuring) => {
                if let Err(e) = self.stop_measurement().await {
                    error!("Sending stop measurement command unsuccessful: {}", e);
                }
            }
            (ShutdownMode::Graceful, ConnectionState::Connected) => {}
            (ShutdownMode::Hard, _) => match self.soft_reset().await {
                Ok(()) => info!("Performed reset"),
                Err(e) => warn!("Reset unsuccessful: {}", e),
            },
        }
        self.close().await;
    }

    /// Read the firmware version of the connected sensor
    pub async fn read_firmware_version(&mut self) -> Result<FirmwareVersion, Scd30Error> {
        self.require_session()?;
        let version = self.fetch_firmware_version().await?;
        info!("Firmware version: {}", version);
        Ok(version)
    }

    async fn fetch_firmware_version(&mut self) -> Result<FirmwareVersion, Scd30Error> {
        let words = self.query(Command::ReadFirmwareVersion).await?;
        let [major, minor] = words[0].payload();
        Ok(FirmwareVersion { major, minor })
    }

    /// Restart the sensor. Continuous measurement has to be started again.
    pub async fn soft_reset(&mut self) -> Result<(), Scd30Error> {
        self.require_session()?;
        self.send(Command::SoftReset).await?;
        tokio::time::sleep(SOFT_RESET_SETTLE).await;
        self.state = ConnectionState::Connected;
        self.phase = MeasurementState::Idle;
        Ok(())
    }

    /// Whether automatic self-calibration is enabled
    pub async fn read_asc_status(&mut self) -> Result<bool, Scd30Error> {
        self.require_session()?;
        let words = self.query(Command::GetAutoSelfCalibration).await?;
        debug!("ASC read answer: {:#06x}", words[0].value());
        match words[0].value() {
            1 => {
                info!("ASC enabled");
                Ok(true)
            }
            0 => {
                info!("ASC disabled");
                Ok(false)
            }
            value => Err(Scd30Error::UnexpectedResponse {
                command: Command::GetAutoSelfCalibration.to_string(),
                value,
            }),
        }
    }

    /// Enable or disable automatic self-calibration
    pub async fn set_asc(&mut self, enabled: bool) -> Result<(), Scd30Error> {
        self.require_session()?;
        self.send(Command::SetAutoSelfCalibration { enabled }).await?;
        info!(
            "Automatic self-calibration {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scd30::command::{OPCODE_SOFT_RESET, OPCODE_STOP_MEASUREMENT};
    use crate::scd30::RetryPolicy;
    use crate::transport::{MockScd30State, MockScd30Transport};

    fn settings() -> Scd30Settings {
        Scd30Settings {
            retry: RetryPolicy::new(3, Duration::ZERO),
            command_delay: Duration::ZERO,
            ..Scd30Settings::default()
        }
    }

    #[tokio::test]
    async fn test_open_probes_firmware() {
        let transport = MockScd30Transport::new();
        let state = transport.state();

        let sensor = Scd30::open(transport, settings()).await.unwrap();
        assert_eq!(sensor.connection_state(), ConnectionState::Connected);

        let state = state.lock().unwrap();
        assert_eq!(state.commands, vec![Command::ReadFirmwareVersion]);
        assert!(state.open);
    }

    #[tokio::test]
    async fn test_missing_device_is_reported_and_released() {
        let transport = MockScd30Transport::with_state(MockScd30State {
            address: 0x62,
            ..MockScd30State::default()
        });
        let state = transport.state();

        let result = Scd30::open(transport, settings()).await;
        assert!(matches!(
            result,
            Err(Scd30Error::DeviceNotFound {
                bus: 1,
                address: 0x61,
                ..
            })
        ));
        let state = state.lock().unwrap();
        assert_eq!(state.close_count, 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transport = MockScd30Transport::new();
        let state = transport.state();
        let mut sensor = Scd30::open(transport, settings()).await.unwrap();

        sensor.close().await;
        sensor.close().await;
        assert_eq!(sensor.connection_state(), ConnectionState::Disconnected);
        assert_eq!(state.lock().unwrap().close_count, 1);

        assert!(matches!(
            sensor.read_firmware_version().await,
            Err(Scd30Error::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_graceful_shutdown_stops_measurement() {
        let transport = MockScd30Transport::new();
        let state = transport.state();
        let mut sensor = Scd30::open(transport, settings()).await.unwrap();
        sensor.start(944).await.unwrap();

        sensor.shutdown(ShutdownMode::Graceful).await;

        let state = state.lock().unwrap();
        assert_eq!(state.count_commands(OPCODE_STOP_MEASUREMENT), 1);
        assert_eq!(state.count_commands(OPCODE_SOFT_RESET), 0);
        assert!(!state.measuring);
        assert!(!state.open);
    }

    #[tokio::test]
    async fn test_hard_shutdown_resets_sensor() {
        let transport = MockScd30Transport::new();
        let state = transport.state();
        let mut sensor = Scd30::open(transport, settings()).await.unwrap();
        sensor.start(944).await.unwrap();

        sensor.shutdown(ShutdownMode::Hard).await;

        let state = state.lock().unwrap();
        assert_eq!(state.reset_count, 1);
        assert_eq!(state.count_commands(OPCODE_STOP_MEASUREMENT), 0);
        assert!(!state.open);
        drop(state);
        assert_eq!(sensor.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_shutdown_completes_when_bus_is_gone() {
        let transport = MockScd30Transport::new();
        let state = transport.state();
        let mut sensor = Scd30::open(transport, settings()).await.unwrap();
        sensor.start(944).await.unwrap();

        state.lock().unwrap().fail_writes = true;
        sensor.shutdown(ShutdownMode::Graceful).await;

        assert_eq!(sensor.connection_state(), ConnectionState::Disconnected);
        assert_eq!(state.lock().unwrap().close_count, 1);
    }

    #[tokio::test]
    async fn test_asc_status_round_trip() {
        let transport = MockScd30Transport::new();
        let mut sensor = Scd30::open(transport, settings()).await.unwrap();

        assert!(!sensor.read_asc_status().await.unwrap());
        sensor.set_asc(true).await.unwrap();
        assert!(sensor.read_asc_status().await.unwrap());
    }
}
