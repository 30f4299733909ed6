// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the SCD30 air quality logger
use anyhow::Result;
use clap::Parser;
use log::{info, LevelFilter};
use std::path::PathBuf;

use rust_airdata::config::{self, Config, ConfigOverrides};
use rust_airdata::daemon::{spawn_signal_listener, Daemon};
use rust_airdata::utility::{init_console_logger, init_logger};

/// CO2, temperature and humidity logger for the Sensirion SCD30
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Directory receiving info.log
    #[arg(long)]
    logdir: Option<String>,

    /// Measurement interval in seconds (2-1800)
    #[arg(long)]
    meas_interval: Option<u16>,

    /// Host running the pigpio daemon
    #[arg(long)]
    sensorhost: Option<String>,

    /// pigpio daemon port
    #[arg(long)]
    sensorport: Option<u16>,

    /// Ambient pressure in mbar (700-1400, 0 disables compensation)
    #[arg(long)]
    pressure: Option<u16>,

    /// InfluxDB host
    #[arg(long)]
    dbhost: Option<String>,

    /// InfluxDB port
    #[arg(long)]
    dbport: Option<u16>,

    /// InfluxDB user
    #[arg(long)]
    dbuser: Option<String>,

    /// InfluxDB password
    #[arg(long)]
    dbpassword: Option<String>,

    /// InfluxDB database name
    #[arg(long)]
    dbname: Option<String>,

    /// Only log the readings, do not publish them
    #[arg(long)]
    no_database: bool,

    /// Use the simulated sensor instead of the pigpio link
    #[arg(long)]
    simulate: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            log_dir: self.logdir.clone(),
            measurement_interval: self.meas_interval,
            sensor_host: self.sensorhost.clone(),
            sensor_port: self.sensorport,
            pressure_mbar: self.pressure,
            db_host: self.dbhost.clone(),
            db_port: self.dbport,
            db_user: self.dbuser.clone(),
            db_password: self.dbpassword.clone(),
            db_name: self.dbname.clone(),
            no_database: self.no_database,
            simulate: self.simulate,
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }

    fn console_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Off
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = &args.validate_config {
        init_console_logger(args.console_level())?;
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // Load configuration, the logger settings come from it
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;
    config.apply_args(args.overrides());
    config::validate_specific_rules(&config)?;

    if let Some(log_path) = init_logger(&config.logging)? {
        info!("Logging to {}", log_path.display());
    }
    info!(
        "rust-airdata {} starting, configuration {}",
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    let daemon = Daemon::new(config);
    spawn_signal_listener(daemon.shutdown_flag())?;

    let report = daemon.launch().await?;
    info!("Stopped after {} readings ({:?} shutdown)", report.readings, report.shutdown);
    Ok(())
}
