// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Measurement cycle of the SCD30
//!
//! ```text
//! Idle -> Started -> Polling -> ReadingReady -> Decoded
//!                       ^  |
//!                       |  +-> NotReady / Failed --(budget left)--+
//!                       +-----------------------------------------+
//!                          Failed --(budget exhausted)--> Fatal
//! ```
//!
//! A polling cycle asks for the data-ready flag and, when it is set, reads
//! the six measurement words. Checksum failures and not-ready answers are
//! counted against the session's [`FailureCounter`](super::FailureCounter)
//! and retried after a fixed backoff; any success refills the counter.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::ops::RangeInclusive;

use super::float::decode_words;
use super::{
    Command, ConnectionState, MeasurementState, RetryDecision, Scd30, Scd30Error, SensorReading,
};
use crate::transport::{I2cTransport, TransportError};

/// Sampling intervals accepted by the sensor, in seconds
pub const MEASUREMENT_INTERVAL_RANGE: RangeInclusive<u16> = 2..=1800;
/// Ambient pressure compensation range, in mbar. 0 disables compensation.
pub const PRESSURE_RANGE_MBAR: RangeInclusive<u16> = 700..=1400;

const DATA_READY: u16 = 1;

impl<T: I2cTransport> Scd30<T> {
    /// Start continuous measurement with ambient pressure compensation.
    ///
    /// A transport failure leaves the session unusable; the caller should
    /// close it.
    pub async fn start(&mut self, pressure_mbar: u16) -> Result<(), Scd30Error> {
        self.require_state(ConnectionState::Connected)?;
        if pressure_mbar != 0 && !PRESSURE_RANGE_MBAR.contains(&pressure_mbar) {
            return Err(Scd30Error::InvalidArgument(format!(
                "pressure {} mbar outside {}..={} (or 0 to disable)",
                pressure_mbar,
                PRESSURE_RANGE_MBAR.start(),
                PRESSURE_RANGE_MBAR.end()
            )));
        }

        info!("Starting measuring with {} mbar", pressure_mbar);
        if let Err(e) = self.send(Command::StartMeasurement { pressure_mbar }).await {
            error!("Sending start measurement command unsuccessful: {}", e);
            return Err(e);
        }
        self.state = ConnectionState::Measuring;
        self.phase = MeasurementState::Started;
        self.failures.reset();
        Ok(())
    }

    /// Stop continuous measurement
    pub async fn stop_measurement(&mut self) -> Result<(), Scd30Error> {
        self.require_state(ConnectionState::Measuring)?;
        self.send(Command::StopMeasurement).await?;
        info!("Stopped measuring");
        self.state = ConnectionState::Connected;
        self.phase = MeasurementState::Idle;
        Ok(())
    }

    /// Run a single polling cycle without retrying.
    ///
    /// Returns [`Scd30Error::DataNotReady`] when the flag is not set,
    /// [`Scd30Error::Checksum`] when any received word is corrupted and
    /// [`Scd30Error::IncompleteRead`] when the sensor answers with fewer bytes
    /// than asked for. The failure counter is left untouched.
    pub async fn poll_cycle(&mut self) -> Result<SensorReading, Scd30Error> {
        self.require_state(ConnectionState::Measuring)?;
        self.phase = MeasurementState::Polling;

        let ready = match self.query(Command::GetDataReady).await {
            Ok(words) => words[0].value(),
            Err(e) => {
                self.phase = MeasurementState::Failed;
                return Err(incomplete_as_transient(e));
            }
        };
        if ready != DATA_READY {
            debug!("Data ready flag: {:#06x}", ready);
            self.phase = MeasurementState::NotReady;
            return Err(Scd30Error::DataNotReady);
        }

        self.phase = MeasurementState::ReadingReady;
        let words = match self.query(Command::ReadMeasurement).await {
            Ok(words) => words,
            Err(e) => {
                self.phase = MeasurementState::Failed;
                return Err(incomplete_as_transient(e));
            }
        };

        let reading = SensorReading {
            co2_ppm: f64::from(decode_words(&words[0..2])?),
            temperature_c: f64::from(decode_words(&words[2..4])?),
            humidity_pct: f64::from(decode_words(&words[4..6])?),
            timestamp: Utc::now(),
        };
        self.phase = MeasurementState::Decoded;
        Ok(reading)
    }

    /// Poll until a reading is decoded or the failure budget runs out.
    ///
    /// # Errors
    ///
    /// * [`Scd30Error::SensorUnresponsive`] once the failure counter reaches
    ///   zero; no further retries are made and the session should end
    /// * [`Scd30Error::Transport`] as soon as the bus fails
    pub async fn read_measurement(&mut self) -> Result<SensorReading, Scd30Error> {
        self.require_state(ConnectionState::Measuring)?;
        if self.failures.is_exhausted() {
            self.phase = MeasurementState::Fatal;
            return Err(Scd30Error::SensorUnresponsive {
                failures: self.failures.ceiling(),
            });
        }

        loop {
            match self.poll_cycle().await {
                Ok(reading) => {
                    self.failures.reset();
                    return Ok(reading);
                }
                Err(e) if e.is_transient() => match self.failures.record_failure() {
                    RetryDecision::Retry { remaining } => {
                        match e {
                            Scd30Error::DataNotReady => {
                                debug!("Data not ready, {} attempts left", remaining)
                            }
                            _ => warn!("{}, {} attempts left", e, remaining),
                        }
                        let backoff = self.settings.retry.backoff;
                        if !backoff.is_zero() {
                            tokio::time::sleep(backoff).await;
                        }
                    }
                    RetryDecision::GiveUp => {
                        error!(
                            "No valid reading after {} consecutive attempts, last error: {}",
                            self.failures.ceiling(),
                            e
                        );
                        self.phase = MeasurementState::Fatal;
                        return Err(Scd30Error::SensorUnresponsive {
                            failures: self.failures.ceiling(),
                        });
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Write the sampling interval and verify it by reading it back
    pub async fn set_interval(&mut self, seconds: u16) -> Result<(), Scd30Error> {
        self.require_session()?;
        if !MEASUREMENT_INTERVAL_RANGE.contains(&seconds) {
            return Err(Scd30Error::InvalidArgument(format!(
                "measurement interval {} s outside {}..={}",
                seconds,
                MEASUREMENT_INTERVAL_RANGE.start(),
                MEASUREMENT_INTERVAL_RANGE.end()
            )));
        }

        self.send(Command::SetMeasurementInterval { seconds }).await?;
        if !self.settings.command_delay.is_zero() {
            tokio::time::sleep(self.settings.command_delay).await;
        }

        let actual = self.read_interval().await?;
        if actual != seconds {
            error!(
                "Setting measurement interval to {} s unsuccessful, sensor reports {} s",
                seconds, actual
            );
            return Err(Scd30Error::IntervalNotApplied {
                requested: seconds,
                actual,
            });
        }
        info!("Measurement interval set to {} s", seconds);
        Ok(())
    }

    /// Current sampling interval in seconds
    pub async fn read_interval(&mut self) -> Result<u16, Scd30Error> {
        self.require_session()?;
        let words = self.query(Command::GetMeasurementInterval).await?;
        let seconds = words[0].value();
        debug!("Measurement interval: {} s", seconds);
        Ok(seconds)
    }
}

/// Short answers on the polling path count against the budget like checksum
/// failures. Other bus errors stay fatal.
fn incomplete_as_transient(error: Scd30Error) -> Scd30Error {
    match error {
        Scd30Error::Transport(TransportError::ShortRead { expected, actual })
        | Scd30Error::InvalidLength { expected, actual } => {
            Scd30Error::IncompleteRead { expected, actual }
        }
        other => other,
    }
}
