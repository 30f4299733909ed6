// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! InfluxDB 1.x sink
//!
//! Records are posted in line protocol to `/write?db=<name>&precision=ns`
//! with basic authentication. Reachability is checked at start-up against
//! `/ping`, which answers `204 No Content` on a healthy server.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::time::Duration;

use super::{AirQualityPoint, TelemetrySink};
use crate::config::DatabaseConfig;

/// InfluxDB HTTP API sink
#[derive(Debug)]
pub struct InfluxDbSink {
    /// API root, e.g. `http://localhost:8086`
    base_url: String,
    database: String,
    user: String,
    password: String,
    client: reqwest::Client,
    /// Additional attempts after a failed write
    retry_count: u32,
    /// Last known connection status
    connection_status: String,
    written: u64,
}

impl InfluxDbSink {
    /// Create a sink for the configured database
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .user_agent(concat!("rust-airdata/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.base_url(),
            database: config.name.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            client,
            retry_count: 0,
            connection_status: "Initializing".to_string(),
            written: 0,
        })
    }

    /// Point the sink at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set retry count for failed writes
    ///
    /// # Arguments
    /// * `count` - Number of retry attempts (0-10)
    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count.min(10);
        self
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    async fn write_with_retry(&mut self, body: String) -> Result<()> {
        let url = format!("{}/write", self.base_url);
        let max_attempts = self.retry_count + 1;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let result = self
                .client
                .post(&url)
                .query(&[("db", self.database.as_str()), ("precision", "ns")])
                .basic_auth(&self.user, Some(&self.password))
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    self.connection_status = format!(
                        "Connected - Last success: {}",
                        chrono::Local::now().to_rfc3339()
                    );
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    let error_text = response.text().await.unwrap_or_default();
                    self.connection_status = format!("Error: HTTP {}", status);
                    if attempts >= max_attempts {
                        anyhow::bail!(
                            "InfluxDB write failed after {} attempts: {} - {}",
                            attempts,
                            status,
                            error_text.trim()
                        );
                    }
                    warn!(
                        "InfluxDB write failed (attempt {}/{}): {} - {}",
                        attempts,
                        max_attempts,
                        status,
                        error_text.trim()
                    );
                }
                Err(e) => {
                    self.connection_status = format!("Error: {}", e);
                    if attempts >= max_attempts {
                        anyhow::bail!("InfluxDB write failed after {} attempts: {}", attempts, e);
                    }
                    warn!(
                        "InfluxDB write failed (attempt {}/{}): {}",
                        attempts, max_attempts, e
                    );
                }
            }

            // 50ms, 100ms, 200ms, ...
            let backoff_ms = 50 * 2_u64.pow(attempts - 1);
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }
}

#[async_trait]
impl TelemetrySink for InfluxDbSink {
    async fn initialize(&mut self) -> Result<()> {
        let url = format!("{}/ping", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("InfluxDB not reachable at {}", self.base_url))?;

        if !response.status().is_success() {
            self.connection_status = format!("Error: HTTP {}", response.status());
            anyhow::bail!(
                "InfluxDB ping at {} answered {}",
                self.base_url,
                response.status()
            );
        }

        let version = response
            .headers()
            .get("X-Influxdb-Version")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        info!(
            "Connected to InfluxDB {} at {} (database '{}')",
            version, self.base_url, self.database
        );
        self.connection_status = "Connected".to_string();
        Ok(())
    }

    async fn publish(&mut self, point: &AirQualityPoint) -> Result<()> {
        let line = point.to_line_protocol();
        debug!("Writing to InfluxDB: {}", line);
        self.write_with_retry(line).await?;
        self.written += 1;
        Ok(())
    }

    async fn get_status(&self) -> Result<Value> {
        Ok(json!({
            "sink_type": self.sink_type(),
            "url": self.base_url,
            "database": self.database,
            "retry_count": self.retry_count,
            "connection_status": self.connection_status,
            "written": self.written,
        }))
    }

    fn sink_type(&self) -> &str {
        "influxdb"
    }
}
