// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_weighbridge::config::{Config, ModbusConfig, SerialConfig};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    // Create a temporary directory
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Create a custom config
    let config = Config {
        serial: SerialConfig {
            device: "/dev/ttyS1".to_string(),
            baud_rate: 9600,
            ..SerialConfig::default()
        },
        modbus: ModbusConfig {
            address: "192.168.200.35".to_string(),
            poll_interval_ms: 100,
            ..ModbusConfig::default()
        },
        ..Config::default()
    };

    // Save config to file
    config.save_to_file(&config_path)?;

    // Load config from file
    let loaded_config = Config::from_file(&config_path)?;

    // Verify loaded config matches original
    assert_eq!(loaded_config.serial.device, "/dev/ttyS1");
    assert_eq!(loaded_config.serial.baud_rate, 9600);
    assert_eq!(loaded_config.modbus.address, "192.168.200.35");
    assert_eq!(loaded_config.modbus.poll_interval_ms, 100);
    assert_eq!(loaded_config.gateway.port, 8080);

    // Test loading default config for non-existent file
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;

    // Verify default config was created
    assert!(non_existent_path.exists());
    assert_eq!(default_config.gateway.port, 8080);
    assert_eq!(default_config.gateway.address, "127.0.0.1");
    assert_eq!(default_config.serial.baud_rate, 2400);
    assert_eq!(default_config.modbus.unit_id, 1);

    Ok(())
}

#[test]
fn test_apply_args_overrides() -> Result<()> {
    let mut config = Config::default();
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.serial.device, "/dev/ttyUSB0");

    // Apply command-line arguments
    config.apply_args(
        Some(9000),
        Some("0.0.0.0".to_string()),
        Some("/dev/ttyAMA0".to_string()),
        Some(19200),
        Some("192.168.200.35".to_string()),
        Some(1502),
        Some(250),
    );

    // Verify values were overridden
    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.gateway.address, "0.0.0.0");
    assert_eq!(config.serial.device, "/dev/ttyAMA0");
    assert_eq!(config.serial.baud_rate, 19200);
    assert_eq!(config.modbus.address, "192.168.200.35");
    assert_eq!(config.modbus.port, 1502);
    assert_eq!(config.modbus.poll_interval_ms, 250);

    // No arguments leaves everything untouched
    let before = config.clone();
    config.apply_args(None, None, None, None, None, None, None);
    assert_eq!(config.gateway.port, before.gateway.port);
    assert_eq!(config.serial.device, before.serial.device);
    assert_eq!(config.modbus.poll_interval_ms, before.modbus.poll_interval_ms);

    Ok(())
}

#[test]
fn test_schema_rejection_creates_sample() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // An unknown section must fail schema validation
    fs::write(&config_path, "unknown_section:\n  foo: 1\n")?;
    let result = Config::from_file(&config_path);
    assert!(result.is_err());

    // A sample file is written alongside for the user to edit
    let sample_path = temp_dir.path().join("config.sample.yaml");
    assert!(sample_path.exists());

    Ok(())
}

#[test]
fn test_specific_rule_rejection() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // The polled block must cover the capture bit indices
    let config = Config {
        modbus: ModbusConfig {
            quantity: 2,
            ..ModbusConfig::default()
        },
        ..Config::default()
    };
    config.save_to_file(&config_path)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .to_lowercase()
        .contains("quantity"));

    Ok(())
}

#[test]
fn test_partial_file_uses_section_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Only override the gateway port; everything else defaults
    fs::write(&config_path, "gateway:\n  port: 8888\n")?;
    let config = Config::from_file(&config_path)?;

    assert_eq!(config.gateway.port, 8888);
    assert_eq!(config.gateway.address, "127.0.0.1");
    assert_eq!(config.serial.baud_rate, 2400);
    assert_eq!(config.modbus.quantity, 8);

    // Partially specified sections fill the remaining fields from defaults
    fs::write(
        &config_path,
        "serial:\n  device: /dev/ttyS1\nmodbus:\n  address: 192.168.200.35\n",
    )?;
    let config = Config::from_file(&config_path)?;

    assert_eq!(config.serial.device, "/dev/ttyS1");
    assert_eq!(config.serial.baud_rate, 2400);
    assert!(config.serial.enabled);
    assert_eq!(config.modbus.address, "192.168.200.35");
    assert_eq!(config.modbus.port, 502);
    assert_eq!(config.modbus.poll_interval_ms, 1000);

    Ok(())
}
