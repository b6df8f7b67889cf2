// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_force_bridge::config::{Config, PlcConfig};
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

#[test]
fn test_config_load_and_save() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let config = Config {
        plc: PlcConfig {
            address: "10.0.0.2".to_string(),
            port: 2001,
            write_timeout_ms: None,
            ..Default::default()
        },
        ..Default::default()
    };
    config.save_to_file(&config_path)?;

    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config.plc.address, "10.0.0.2");
    assert_eq!(loaded_config.plc.port, 2001);
    assert_eq!(loaded_config.plc.write_timeout_ms, None);
    assert_eq!(loaded_config.plc.stream_interval_ms, 40);

    // Missing file: the default configuration is written
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;
    assert!(non_existent_path.exists());
    assert_eq!(default_config.sensor.address, "192.168.1.1");
    assert_eq!(default_config.sensor.port, 49152);
    assert_eq!(default_config.plc.socket_address(), "192.168.0.1:2000");
    assert_eq!(default_config.plc.write_timeout_ms, Some(1000));
    assert_eq!(default_config.recording.output_dir, "data_logging");
    assert_eq!(default_config.recording.interval_ms, 10);
    assert_eq!(default_config.daemon.join_timeout_ms, 500);

    Ok(())
}

#[test]
fn test_partial_sections_use_defaults() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
plc:
  port: 3000
recording:
  output_dir: "/var/log/force"
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.plc.port, 3000);
    assert_eq!(config.plc.address, "192.168.0.1");
    assert_eq!(config.plc.status_poll_interval_ms, 10);
    assert_eq!(config.recording.output_dir, "/var/log/force");
    assert_eq!(config.recording.file_prefix, "output");
    assert!(!config.sensor.mock);

    // An empty document is a valid configuration
    fs::write(&config_path, "")?;
    let config = Config::from_file(&config_path)?;
    assert_eq!(config.plc.port, 2000);

    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();
    config.apply_args(None, None, None, None, None);
    assert_eq!(config.sensor.address, "192.168.1.1");
    assert!(!config.sensor.mock);

    config.apply_args(
        Some("192.168.1.20".to_string()),
        Some(true),
        Some("192.168.0.50".to_string()),
        Some(2100),
        Some("/tmp/sessions".to_string()),
    );
    assert_eq!(config.sensor.address, "192.168.1.20");
    assert!(config.sensor.mock);
    assert_eq!(config.plc.socket_address(), "192.168.0.50:2100");
    assert_eq!(config.recording.output_dir, "/tmp/sessions");
}

#[test]
fn test_schema_violation_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
plc:
  port: 99999
  stream_interval_ms: 40
"#,
    )?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );
    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config.plc.port, 2000);

    Ok(())
}

#[test]
fn test_unknown_field_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
sensor:
  adress: "192.168.1.1"
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}

#[test]
fn test_type_mismatch_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
plc:
  address: 12345
  stream_interval_ms: "fast"
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    assert!(config_path.with_extension("sample.yaml").exists());
    Ok(())
}

#[test]
fn test_zero_interval_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
recording:
  interval_ms: 0
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}
