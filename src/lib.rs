// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Airdata library
//!
//! This library reads CO2 concentration, temperature and relative humidity
//! from a Sensirion SCD30 reached over I2C through a pigpio daemon, and
//! publishes the readings to InfluxDB.
//!
//! - [`scd30`]: sensor protocol, session and measurement cycle
//! - [`transport`]: I2C transports (pigpio socket, simulated sensor)
//! - [`telemetry`]: plausibility filter and telemetry sinks
//! - [`daemon`]: sampling loop and cooperative shutdown
//! - [`config`]: YAML configuration
//! - [`utility`]: logger setup

pub mod config;
pub mod daemon;
pub mod scd30;
pub mod telemetry;
pub mod transport;
pub mod utility;

pub use scd30::SensorReading;
