// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logging configuration

use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Where and how much the daemon logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory receiving `info.log`. Created when missing.
    pub dir: String,

    /// Log debug messages, including protocol traces.
    pub verbose: bool,

    /// Disable logging entirely. Takes precedence over `verbose`.
    pub quiet: bool,
}

impl LoggingConfig {
    /// Level filter selected by the verbosity flags
    pub fn level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Off
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "./logging".to_string(),
            verbose: false,
            quiet: false,
        }
    }
}
