// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Telemetry output
//!
//! Decoded readings leave the daemon as [`AirQualityPoint`] records handed
//! to a [`TelemetrySink`]. Readings that cannot be physical (NaN, zero or
//! negative concentration or humidity) are dropped by [`is_plausible`]
//! before they reach a sink; they are not errors.
//!
//! ## Available sinks
//!
//! - [`influxdb::InfluxDbSink`]: InfluxDB 1.x HTTP API, line protocol
//! - [`LogSink`]: writes the records to the log only

pub mod influxdb;

pub use influxdb::InfluxDbSink;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::scd30::SensorReading;

/// Measurement name of the published records
pub const MEASUREMENT: &str = "air_quality";
/// Value of the `sensor` tag
pub const SENSOR_TAG: &str = "scd30";

/// Whether a decoded reading is physically meaningful
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use rust_airdata::scd30::SensorReading;
/// use rust_airdata::telemetry::is_plausible;
///
/// let mut reading = SensorReading {
///     co2_ppm: 450.0,
///     temperature_c: 21.3,
///     humidity_pct: 40.0,
///     timestamp: Utc::now(),
/// };
/// assert!(is_plausible(&reading));
/// reading.co2_ppm = 0.0;
/// assert!(!is_plausible(&reading));
/// ```
pub fn is_plausible(reading: &SensorReading) -> bool {
    reading.co2_ppm.is_finite()
        && reading.temperature_c.is_finite()
        && reading.humidity_pct.is_finite()
        && reading.co2_ppm > 0.0
        && reading.humidity_pct > 0.0
}

/// Field set of an [`AirQualityPoint`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityFields {
    #[serde(rename = "CO2_ppm")]
    pub co2_ppm: f64,
    #[serde(rename = "temperature_degC")]
    pub temperature_degc: f64,
    #[serde(rename = "humidity_relPC")]
    pub humidity_relpc: f64,
}

/// One published record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityPoint {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    /// Completion time of the sensor read
    pub time: DateTime<Utc>,
    pub fields: AirQualityFields,
}

impl From<&SensorReading> for AirQualityPoint {
    fn from(reading: &SensorReading) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("sensor".to_string(), SENSOR_TAG.to_string());
        Self {
            measurement: MEASUREMENT.to_string(),
            tags,
            time: reading.timestamp,
            fields: AirQualityFields {
                co2_ppm: reading.co2_ppm,
                temperature_degc: reading.temperature_c,
                humidity_relpc: reading.humidity_pct,
            },
        }
    }
}

impl AirQualityPoint {
    /// Render the record in InfluxDB line protocol, nanosecond precision
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape(key, &[',', '=', ' ']));
            line.push('=');
            line.push_str(&escape(value, &[',', '=', ' ']));
        }
        line.push_str(&format!(
            " CO2_ppm={},temperature_degC={},humidity_relPC={}",
            self.fields.co2_ppm, self.fields.temperature_degc, self.fields.humidity_relpc
        ));
        // Out of range timestamps are left to the server clock
        if let Some(nanos) = self.time.timestamp_nanos_opt() {
            line.push_str(&format!(" {}", nanos));
        }
        line
    }
}

fn escape(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Destination of the published records
///
/// Publishing failures are reported to the caller, which decides whether
/// they matter; the sampling loop only logs them.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Check the destination is reachable. A failure aborts start-up.
    async fn initialize(&mut self) -> Result<()>;

    /// Publish one record
    async fn publish(&mut self, point: &AirQualityPoint) -> Result<()>;

    /// Status summary for logging
    async fn get_status(&self) -> Result<Value>;

    /// Sink identifier for logging
    fn sink_type(&self) -> &str;

    /// Flush and release resources
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for Box<dyn TelemetrySink> {
    async fn initialize(&mut self) -> Result<()> {
        (**self).initialize().await
    }

    async fn publish(&mut self, point: &AirQualityPoint) -> Result<()> {
        (**self).publish(point).await
    }

    async fn get_status(&self) -> Result<Value> {
        (**self).get_status().await
    }

    fn sink_type(&self) -> &str {
        (**self).sink_type()
    }

    async fn shutdown(&mut self) -> Result<()> {
        (**self).shutdown().await
    }
}

/// Sink writing records to the log, used when no database is configured
#[derive(Debug, Default)]
pub struct LogSink {
    published: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

#[async_trait]
impl TelemetrySink for LogSink {
    async fn initialize(&mut self) -> Result<()> {
        info!("Database disabled, readings are only logged");
        Ok(())
    }

    async fn publish(&mut self, point: &AirQualityPoint) -> Result<()> {
        info!("{}", point.to_line_protocol());
        self.published += 1;
        Ok(())
    }

    async fn get_status(&self) -> Result<Value> {
        Ok(json!({
            "sink_type": self.sink_type(),
            "published": self.published,
        }))
    }

    fn sink_type(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(co2_ppm: f64, temperature_c: f64, humidity_pct: f64) -> SensorReading {
        SensorReading {
            co2_ppm,
            temperature_c,
            humidity_pct,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_plausibility_filter() {
        assert!(is_plausible(&reading(450.0, 21.3, 40.0)));
        assert!(is_plausible(&reading(450.0, -5.0, 40.0)));
        assert!(!is_plausible(&reading(f64::NAN, 21.3, 40.0)));
        assert!(!is_plausible(&reading(450.0, f64::NAN, 40.0)));
        assert!(!is_plausible(&reading(0.0, 21.3, 40.0)));
        assert!(!is_plausible(&reading(450.0, 21.3, -1.0)));
        assert!(!is_plausible(&reading(450.0, 21.3, 0.0)));
    }

    #[test]
    fn test_line_protocol() {
        let point = AirQualityPoint::from(&reading(450.0, 21.5, 40.25));
        assert_eq!(
            point.to_line_protocol(),
            "air_quality,sensor=scd30 CO2_ppm=450,temperature_degC=21.5,humidity_relPC=40.25 1740830400000000000"
        );
    }

    #[test]
    fn test_record_layout() {
        let point = AirQualityPoint::from(&reading(450.0, 21.5, 40.25));
        let value = serde_json::to_value(&point).unwrap();
        assert_eq!(value["measurement"], "air_quality");
        assert_eq!(value["tags"]["sensor"], "scd30");
        assert_eq!(value["time"], "2025-03-01T12:00:00Z");
        assert_eq!(value["fields"]["CO2_ppm"], 450.0);
        assert_eq!(value["fields"]["temperature_degC"], 21.5);
        assert_eq!(value["fields"]["humidity_relPC"], 40.25);
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape("a b,c=d", &[',', '=', ' ']), "a\\ b\\,c\\=d");
    }

    #[tokio::test]
    async fn test_log_sink_counts() {
        let mut sink = LogSink::new();
        sink.initialize().await.unwrap();
        sink.publish(&AirQualityPoint::from(&reading(450.0, 21.3, 40.0)))
            .await
            .unwrap();
        assert_eq!(sink.published(), 1);
        assert_eq!(sink.get_status().await.unwrap()["published"], 1);
    }
}
