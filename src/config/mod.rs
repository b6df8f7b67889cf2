// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the force bridge
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! - `sensor`: Net F/T sensor address and timeouts
//! - `plc`: PLC address, link timeouts and loop cadences
//! - `recording`: CSV logging sessions
//! - `daemon`: lifecycle settings
//!
//! ## Usage
//!
//! ```no_run
//! use rust_force_bridge::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("192.168.1.10".to_string()), // Sensor address
//!     None,                             // Mock sensor
//!     Some("192.168.0.1".to_string()),  // PLC address
//!     Some(2000),                       // PLC port
//!     None,                             // Output directory
//! );
//!
//! println!("PLC: {}", config.plc.socket_address());
//! ```

pub mod daemon;
pub mod plc;
pub mod recording;
pub mod sensor;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use daemon::DaemonConfig;
pub use plc::PlcConfig;
pub use recording::RecordingConfig;
pub use sensor::SensorConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// Root configuration structure of the bridge.
///
/// Every section falls back to its defaults when missing from the file, so
/// an empty YAML document is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Force/torque sensor settings.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// PLC link settings.
    #[serde(default)]
    pub plc: PlcConfig,

    /// CSV logging session settings.
    #[serde(default)]
    pub recording: RecordingConfig,

    /// Daemon lifecycle settings.
    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file that fails
    /// schema validation, deserialization or the specific rules produces an
    /// error and a `*.sample.yaml` file next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // An empty document is an empty mapping
        let json_value = if contents.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            let yaml_value: serde_yml::Value = serde_yml::from_str(&contents).with_context(|| {
                format!("Failed to parse YAML configuration from {:?}", path)
            })?;
            match serde_json::to_value(&yaml_value).with_context(|| {
                format!("Failed to convert YAML to JSON for validation: {:?}", path)
            })? {
                serde_json::Value::Null => serde_json::Value::Object(Default::default()),
                value => value,
            }
        };

        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_json::from_value(json_value) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that were provided override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `sensor_address` - Address of the Net F/T sensor
    /// * `mock_sensor` - Use the simulated sensor
    /// * `plc_address` - Address of the PLC
    /// * `plc_port` - TCP port of the PLC
    /// * `output_dir` - Directory for CSV logging sessions
    pub fn apply_args(
        &mut self,
        sensor_address: Option<String>,
        mock_sensor: Option<bool>,
        plc_address: Option<String>,
        plc_port: Option<u16>,
        output_dir: Option<String>,
    ) {
        if let Some(address) = sensor_address {
            debug!("Overriding sensor address from command line: {}", address);
            self.sensor.address = address;
        }
        if let Some(mock) = mock_sensor {
            debug!("Overriding mock sensor from command line: {}", mock);
            self.sensor.mock = mock;
        }
        if let Some(address) = plc_address {
            debug!("Overriding PLC address from command line: {}", address);
            self.plc.address = address;
        }
        if let Some(port) = plc_port {
            debug!("Overriding PLC port from command line: {}", port);
            self.plc.port = port;
        }
        if let Some(dir) = output_dir {
            debug!("Overriding output directory from command line: {}", dir);
            self.recording.output_dir = dir;
        }
    }
}
