// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::Config;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_force_bridge --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Ports**: sensor and PLC ports must be in 1-65535
/// - **Cadences**: every loop period and timeout must be strictly positive
/// - **Recording**: output directory and file prefix must not be empty
/// - **Addresses**: a host name instead of an IP literal only logs a warning
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.sensor.port == 0 {
        anyhow::bail!("Invalid sensor port number: {}", config.sensor.port);
    }
    if config.plc.port == 0 {
        anyhow::bail!("Invalid PLC port number: {}", config.plc.port);
    }

    let periods = [
        ("sensor.receive_timeout_ms", config.sensor.receive_timeout_ms),
        ("plc.connect_timeout_ms", config.plc.connect_timeout_ms),
        ("plc.stream_interval_ms", config.plc.stream_interval_ms),
        (
            "plc.status_poll_interval_ms",
            config.plc.status_poll_interval_ms,
        ),
        ("recording.interval_ms", config.recording.interval_ms),
        ("daemon.join_timeout_ms", config.daemon.join_timeout_ms),
    ];
    for (name, value) in periods {
        if value == 0 {
            anyhow::bail!("{} must be greater than 0", name);
        }
    }
    if config.plc.write_timeout_ms == Some(0) {
        anyhow::bail!("plc.write_timeout_ms must be greater than 0 or omitted");
    }

    if config.recording.output_dir.trim().is_empty() {
        anyhow::bail!("recording.output_dir must not be empty");
    }
    if config.recording.file_prefix.trim().is_empty() {
        anyhow::bail!("recording.file_prefix must not be empty");
    }
    if config
        .recording
        .file_prefix
        .contains(std::path::is_separator)
    {
        anyhow::bail!(
            "recording.file_prefix must not contain a path separator: {}",
            config.recording.file_prefix
        );
    }

    // Host names are resolved at connection time
    for address in [&config.sensor.address, &config.plc.address] {
        if !is_valid_ip_address(address) {
            warn!("Address is not an IP literal, it will be resolved: {}", address);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_ip_address() {
        assert!(is_valid_ip_address("192.168.0.1"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(!is_valid_ip_address("not an address"));
    }

    #[test]
    fn test_default_config_passes() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = Config::default();
        config.plc.stream_interval_ms = 0;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.plc.port = 0;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.plc.write_timeout_ms = Some(0);
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.plc.write_timeout_ms = None;
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn test_file_prefix_rules() {
        let mut config = Config::default();
        config.recording.file_prefix = "a/b".to_string();
        assert!(validate_specific_rules(&config).is_err());

        config.recording.file_prefix = " ".to_string();
        assert!(validate_specific_rules(&config).is_err());
    }
}
