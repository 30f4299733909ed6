// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! InfluxDB configuration
//!
//! Settings of the time-series database the readings are published to.

use serde::{Deserialize, Serialize};

/// Connection settings of the InfluxDB 1.x HTTP API.
///
/// When `enabled` is false the readings are only written to the log.
///
/// # Example
///
/// ```
/// use rust_airdata::config::DatabaseConfig;
///
/// let db = DatabaseConfig::default();
/// assert_eq!(db.base_url(), "http://localhost:8086");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Publish readings to InfluxDB.
    pub enabled: bool,

    /// Database host name or address.
    pub host: String,

    /// HTTP API port (default 8086).
    pub port: u16,

    /// User for basic authentication.
    pub user: String,

    /// Password for basic authentication.
    pub password: String,

    /// Database name.
    pub name: String,

    /// Timeout applied to each HTTP request, in seconds.
    pub timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Root URL of the HTTP API
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 8086,
            user: "admin".to_string(),
            password: "admin".to_string(),
            name: "mydb".to_string(),
            timeout_seconds: 10,
        }
    }
}
