// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! Periodic sampling of the SCD30 and publication of the readings.
//!
//! ## Components
//!
//! * **Launch Daemon**: opens the sensor session, reconciles the measurement
//!   interval, then reads, filters and publishes until asked to stop
//! * **Shutdown**: signal listener and the flag the sampling loop checks
//!   between cycles
//!
//! ## Usage
//!
//! ```no_run
//! use rust_airdata::{config::Config, daemon::{spawn_signal_listener, Daemon}};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let daemon = Daemon::new(config);
//!     spawn_signal_listener(daemon.shutdown_flag())?;
//!
//!     // Returns after SIGINT/SIGTERM/SIGQUIT, or with an error
//!     let report = daemon.launch().await?;
//!     println!("{} readings published", report.published);
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;
pub mod shutdown;

pub use launch_daemon::{read_delay_for, Daemon, DaemonReport};
pub use shutdown::{spawn_signal_listener, ShutdownFlag};
