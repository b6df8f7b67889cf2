// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the force sensor to PLC bridge
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use rust_force_bridge::acquisition::{sensor_factory_from_config, Measurement};
use rust_force_bridge::config::{self, Config};
use rust_force_bridge::daemon::BridgeDaemon;
use std::path::PathBuf;
use tokio::signal;

/// Read an ATI Net F/T sensor and bridge its force to a PLC
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// IP address of the sensor (overrides sensor.address)
    #[arg(value_name = "IP")]
    ip: Option<String>,

    /// Show force values
    #[arg(short = 'f', long = "force")]
    force: bool,

    /// Show torque values
    #[arg(short = 't', long = "torque")]
    torque: bool,

    /// The number of samples to print
    #[arg(short = 's', long = "samples", value_name = "N")]
    samples: Option<u32>,

    /// Tare the sensor with N datapoints before showing data (default 10)
    #[arg(
        short = 'm',
        long = "mean",
        value_name = "N",
        num_args = 0..=1,
        default_missing_value = "10"
    )]
    mean: Option<u32>,

    /// Stream the force to the PLC and log on PLC request until Ctrl+C
    #[arg(short = 'c', long = "continuous")]
    continuous: bool,

    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// PLC address (overrides plc.address)
    #[arg(long)]
    plc_address: Option<String>,

    /// PLC port (overrides plc.port)
    #[arg(long)]
    plc_port: Option<u16>,

    /// Directory receiving the logging sessions (overrides recording.output_dir)
    #[arg(long)]
    output_dir: Option<String>,

    /// Use a simulated sensor
    #[arg(long)]
    mock: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

/// What the invocation does
#[derive(Debug, PartialEq, Eq)]
enum Mode {
    /// Print one reading
    Single,
    /// Print N readings; takes precedence over `-c`
    Samples(u32),
    /// Run the PLC bridge
    Continuous,
}

impl Args {
    fn mode(&self) -> Mode {
        match (self.samples, self.continuous) {
            (Some(count), _) => Mode::Samples(count),
            (None, true) => Mode::Continuous,
            (None, false) => Mode::Single,
        }
    }

    /// Force and torque selection; neither flag shows both
    fn selection(&self) -> (bool, bool) {
        let neither = !self.force && !self.torque;
        (self.force || neither, self.torque || neither)
    }
}

fn format_measurement(measurement: &Measurement, show_force: bool, show_torque: bool) -> String {
    let values = match (show_force, show_torque) {
        (true, false) => measurement.force(),
        (false, true) => measurement.torque(),
        _ => measurement.values(),
    };
    format!("{:?}", values)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = &args.validate_config {
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

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.ip.clone(),
        args.mock.then_some(true),
        args.plc_address.clone(),
        args.plc_port,
        args.output_dir.clone(),
    );

    let sensors = sensor_factory_from_config(&config.sensor);
    let mode = args.mode();

    if mode == Mode::Continuous {
        info!("Starting force bridge");
        let mut daemon = BridgeDaemon::new(config, sensors);
        if let Some(samples) = args.mean {
            daemon = daemon.with_tare(samples);
        }

        let run_state = daemon.run_state();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received shutdown signal, terminating bridge");
                    run_state.request_shutdown("Ctrl+C");
                }
                Err(err) => error!("Error waiting for shutdown signal: {}", err),
            }
        });

        let summary = daemon.run().await?;
        for session in &summary.sessions {
            if let Some(path) = &session.path {
                info!(
                    "Session {}: {} rows in {}",
                    session.id,
                    session.rows_written,
                    path.display()
                );
            }
        }
        if let Some(failure) = summary.failure {
            return Err(anyhow::anyhow!("Bridge stopped on link failure: {}", failure));
        }
        return Ok(());
    }

    let (show_force, show_torque) = args.selection();
    let mut sensor = sensors.open().await.context("Failed to open force sensor")?;
    if let Some(samples) = args.mean {
        sensor
            .tare(samples)
            .await
            .context("Failed to tare force sensor")?;
    }

    match mode {
        Mode::Samples(count) => {
            let measurements = sensor
                .read_measurements(count)
                .await
                .context("Failed to read samples")?;
            for measurement in &measurements {
                println!("{}", format_measurement(measurement, show_force, show_torque));
            }
        }
        _ => {
            let measurement = sensor
                .read_measurement()
                .await
                .context("Failed to read sensor")?;
            println!("{}", format_measurement(&measurement, show_force, show_torque));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_defaults_to_both() {
        let args = Args::parse_from(["rust_force_bridge"]);
        assert_eq!(args.selection(), (true, true));
        let args = Args::parse_from(["rust_force_bridge", "-f"]);
        assert_eq!(args.selection(), (true, false));
        let args = Args::parse_from(["rust_force_bridge", "-t"]);
        assert_eq!(args.selection(), (false, true));
    }

    #[test]
    fn test_mean_default_value() {
        let args = Args::parse_from(["rust_force_bridge", "-m"]);
        assert_eq!(args.mean, Some(10));
        let args = Args::parse_from(["rust_force_bridge", "-m", "25", "192.168.1.5"]);
        assert_eq!(args.mean, Some(25));
        assert_eq!(args.ip.as_deref(), Some("192.168.1.5"));
        let args = Args::parse_from(["rust_force_bridge", "-c"]);
        assert_eq!(args.mean, None);
        assert!(args.continuous);
    }

    #[test]
    fn test_samples_take_precedence_over_continuous() {
        let args = Args::parse_from(["rust_force_bridge", "-c", "-s", "5"]);
        assert_eq!(args.mode(), Mode::Samples(5));
        let args = Args::parse_from(["rust_force_bridge", "-c"]);
        assert_eq!(args.mode(), Mode::Continuous);
        let args = Args::parse_from(["rust_force_bridge", "192.168.1.5"]);
        assert_eq!(args.mode(), Mode::Single);
    }

    #[test]
    fn test_format_selection() {
        let m = Measurement::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(format_measurement(&m, true, false), "[1.0, 2.0, 3.0]");
        assert_eq!(format_measurement(&m, false, true), "[4.0, 5.0, 6.0]");
        assert_eq!(format_measurement(&m, true, true), "[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]");
    }
}
