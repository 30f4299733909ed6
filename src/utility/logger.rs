// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logger setup
//!
//! Log records go to stderr and, unless logging is disabled, are appended
//! to `<log dir>/info.log`. Lines read `timestamp - target - LEVEL - message`.

use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::LoggingConfig;

/// Name of the log file inside the log directory
pub const LOG_FILE_NAME: &str = "info.log";

/// Writer duplicating everything to two outputs
#[derive(Debug)]
pub struct TeeWriter<A: Write, B: Write> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.primary, self.secondary)
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        self.secondary.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}

fn builder(level: LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level).format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.target(),
            record.level(),
            record.args()
        )
    });
    builder
}

/// Create the log directory and return the log file path
pub fn prepare_log_file<P: AsRef<Path>>(dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;
    Ok(dir.join(LOG_FILE_NAME))
}

/// Install the global logger for the daemon.
///
/// Returns the path of the log file, `None` when logging is disabled.
pub fn init_logger(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    let level = config.level();
    let mut builder = builder(level);

    let log_path = if level == LevelFilter::Off {
        None
    } else {
        let path = prepare_log_file(&config.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(TeeWriter::new(
            io::stderr(),
            file,
        ))));
        Some(path)
    };

    builder
        .try_init()
        .context("A logger is already installed")?;
    Ok(log_path)
}

/// Install a stderr-only logger, for the one-shot command line modes
pub fn init_console_logger(level: LevelFilter) -> Result<()> {
    builder(level)
        .try_init()
        .context("A logger is already installed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tee_writer_duplicates() {
        let mut tee = TeeWriter::new(Vec::new(), Vec::new());
        write!(tee, "CO2_ppm: {:.1}", 450.0).unwrap();
        tee.flush().unwrap();
        let (a, b) = tee.into_inner();
        assert_eq!(a, b"CO2_ppm: 450.0");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prepare_log_file_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("logging");
        let path = prepare_log_file(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(path, dir.join("info.log"));
    }
}
