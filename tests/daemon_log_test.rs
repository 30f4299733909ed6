// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Log lines of the sampling loop, in their own test binary so the
//! capturing logger is the only one installed

use log::{Level, LevelFilter, Log, Metadata, Record};
use rust_airdata::config::Config;
use rust_airdata::daemon::Daemon;
use rust_airdata::telemetry::LogSink;
use rust_airdata::transport::{MockScd30Transport, ScriptedPoll};
use std::sync::Mutex;

struct CaptureLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    lines: Mutex::new(Vec::new()),
};

#[tokio::test(start_paused = true)]
async fn test_only_plausible_readings_are_logged_as_reads() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Debug);

    let mut config = Config::default();
    config.sensor.simulate = true;
    config.sensor.retry_backoff_ms = 1;
    config.database.enabled = false;
    let daemon = Daemon::new(config);

    let transport = MockScd30Transport::new();
    transport.script([
        ScriptedPoll::ready(f32::NAN, 21.0, 40.0),
        ScriptedPoll::ready(450.0, 21.3, 40.0),
    ]);

    let flag = daemon.shutdown_flag();
    let runner = tokio::spawn(async move { daemon.run(transport, LogSink::new()).await });
    // Two cycles at a 1.9 s pace
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    flag.request(rust_airdata::scd30::ShutdownMode::Graceful);
    let report = runner.await.unwrap().unwrap();
    assert_eq!(report.readings, 2);
    assert_eq!(report.suppressed, 1);

    let lines = LOGGER.lines.lock().unwrap();
    let reads: Vec<&(Level, String)> = lines
        .iter()
        .filter(|(_, message)| message.starts_with("Sensor read:"))
        .collect();
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0].0, Level::Info);
    assert!(reads[0].1.contains("CO2_ppm: 450.0"));
    assert!(lines
        .iter()
        .any(|(level, message)| *level == Level::Debug
            && message.starts_with("Implausible sensor readout dropped")));
}
