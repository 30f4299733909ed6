// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::shutdown::ShutdownFlag;
use crate::config::Config;
use crate::scd30::{Scd30, Scd30Error, Scd30Settings, ShutdownMode};
use crate::telemetry::{is_plausible, AirQualityPoint, InfluxDbSink, LogSink, TelemetrySink};
use crate::transport::{I2cTransport, MockScd30Transport, PigpioTransport};

/// Margin taken off the measurement interval between two reads
pub const READ_MARGIN: Duration = Duration::from_millis(100);

/// Pause between two reads when the sensor samples every `seconds`
pub fn read_delay_for(seconds: u16) -> Duration {
    Duration::from_secs(u64::from(seconds)).saturating_sub(READ_MARGIN)
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaemonReport {
    /// Readings decoded from the sensor
    pub readings: u64,
    /// Readings accepted by the sink
    pub published: u64,
    /// Readings dropped as implausible
    pub suppressed: u64,
    /// Readings the sink failed to store
    pub publish_failures: u64,
    /// Path taken to close the session
    pub shutdown: ShutdownMode,
}

/// Sampling daemon: one sensor session feeding one telemetry sink
pub struct Daemon {
    config: Config,
    shutdown: Arc<ShutdownFlag>,
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new(config: Config) -> Self {
        Self {
            config,
            shutdown: Arc::new(ShutdownFlag::new()),
        }
    }

    /// Flag stopping the daemon, to hand to the signal listener
    pub fn shutdown_flag(&self) -> Arc<ShutdownFlag> {
        Arc::clone(&self.shutdown)
    }

    /// Request a stop; the current cycle completes first
    pub fn shutdown(&self, mode: ShutdownMode) {
        info!("Shutting down daemon ({:?})", mode);
        self.shutdown.request(mode);
    }

    /// Pause between two reads at the configured interval
    pub fn read_delay(&self) -> Duration {
        read_delay_for(self.config.sensor.measurement_interval)
    }

    /// Build the transport and sink from the configuration and run
    pub async fn launch(&self) -> Result<DaemonReport> {
        let sensor = &self.config.sensor;
        let transport: Box<dyn I2cTransport> = if sensor.simulate {
            info!("Using simulated SCD30");
            Box::new(MockScd30Transport::new())
        } else {
            info!("Using pigpio daemon at {}:{}", sensor.host, sensor.port);
            Box::new(PigpioTransport::new(sensor.host.clone(), sensor.port))
        };

        let sink: Box<dyn TelemetrySink> = if self.config.database.enabled {
            Box::new(InfluxDbSink::new(&self.config.database)?)
        } else {
            Box::new(LogSink::new())
        };

        self.run(transport, sink).await
    }

    /// Run the sampling loop until a shutdown request or a fatal error.
    ///
    /// The sink is initialized first, so an unreachable database aborts
    /// before the sensor is touched. Once the session is open it is always
    /// shut down, along the requested path or the hard path after a fatal
    /// sensor error.
    pub async fn run<T, S>(&self, transport: T, mut sink: S) -> Result<DaemonReport>
    where
        T: I2cTransport,
        S: TelemetrySink,
    {
        sink.initialize()
            .await
            .with_context(|| format!("Telemetry sink '{}' unavailable", sink.sink_type()))?;

        let settings = Scd30Settings::from(&self.config.sensor);
        let mut sensor = Scd30::open(transport, settings)
            .await
            .context("Sensor not available")?;

        let interval = match self.prepare(&mut sensor).await {
            Ok(interval) => interval,
            Err(e) => {
                error!("Sensor set-up failed: {}", e);
                sensor.shutdown(ShutdownMode::Hard).await;
                return Err(e).context("Sensor set-up failed");
            }
        };

        let delay = read_delay_for(interval);
        info!("Reading every {} ms", delay.as_millis());
        let (report, fatal) = self.sample(&mut sensor, &mut sink, delay).await;
        sensor.shutdown(report.shutdown).await;
        if let Err(e) = sink.shutdown().await {
            warn!("Telemetry sink shutdown failed: {}", e);
        }

        info!(
            "Daemon stopped: {} readings, {} published, {} suppressed, {} publish failures",
            report.readings, report.published, report.suppressed, report.publish_failures
        );
        match fatal {
            Some(e) => Err(e).context("Sensor session ended"),
            None => Ok(report),
        }
    }

    /// Bring the sensor to the configured settings and start measuring.
    ///
    /// Returns the measurement interval the sensor actually runs at.
    async fn prepare<T: I2cTransport>(&self, sensor: &mut Scd30<T>) -> Result<u16, Scd30Error> {
        let config = &self.config.sensor;

        let current = sensor.read_interval().await?;
        let interval = if current == config.measurement_interval {
            info!("Measurement interval already {} s", current);
            current
        } else {
            match sensor.set_interval(config.measurement_interval).await {
                Ok(()) => config.measurement_interval,
                Err(Scd30Error::IntervalNotApplied { requested, actual }) => {
                    warn!(
                        "Sensor kept a {} s interval instead of {} s, sampling at {} s",
                        actual, requested, actual
                    );
                    actual
                }
                Err(e) => return Err(e),
            }
        };

        if let Some(enabled) = config.auto_self_calibration {
            sensor.set_asc(enabled).await?;
        }
        if let Err(e) = sensor.read_asc_status().await {
            warn!("Reading ASC status unsuccessful: {}", e);
        }

        sensor.start(config.pressure_mbar).await?;
        Ok(interval)
    }

    async fn sample<T, S>(
        &self,
        sensor: &mut Scd30<T>,
        sink: &mut S,
        delay: Duration,
    ) -> (DaemonReport, Option<Scd30Error>)
    where
        T: I2cTransport,
        S: TelemetrySink,
    {
        let mut report = DaemonReport {
            readings: 0,
            published: 0,
            suppressed: 0,
            publish_failures: 0,
            shutdown: ShutdownMode::Graceful,
        };

        loop {
            if let Some(mode) = self.shutdown.requested() {
                report.shutdown = mode;
                return (report, None);
            }

            match sensor.read_measurement().await {
                Ok(reading) => {
                    report.readings += 1;
                    if is_plausible(&reading) {
                        info!("Sensor read: {}", reading);
                        match sink.publish(&AirQualityPoint::from(&reading)).await {
                            Ok(()) => report.published += 1,
                            Err(e) => {
                                report.publish_failures += 1;
                                debug!("Publishing to {} failed: {:#}", sink.sink_type(), e);
                            }
                        }
                    } else {
                        report.suppressed += 1;
                        debug!("Implausible sensor readout dropped: {}", reading);
                    }
                }
                Err(e) => {
                    error!("Measurement aborted: {}", e);
                    report.shutdown = ShutdownMode::Hard;
                    return (report, Some(e));
                }
            }

            self.shutdown.sleep(delay).await;
        }
    }
}
