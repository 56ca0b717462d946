// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the weighbridge gateway
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings for the gateway. The configuration is backed by a
//! YAML file and validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The application's configuration is organized as a nested structure with
//! sections:
//! - `serial`: Settings for the RS-232 scale link
//! - `modbus`: Settings for the Modbus/TCP signal panel
//! - `gateway`: Settings for the observer WebSocket gateway
//!
//! There is no runtime reconfiguration: addresses, ports and cadences are
//! fixed for the life of the process.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_weighbridge::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8081),                         // Gateway port
//!     Some("0.0.0.0".to_string()),        // Gateway address
//!     Some("/dev/ttyS1".to_string()),     // Serial device
//!     Some(9600),                         // Baud rate
//!     Some("192.168.200.35".to_string()), // Modbus address
//!     Some(502),                          // Modbus port
//!     Some(1000),                         // Poll interval (ms)
//! );
//!
//! // Access configuration values
//! println!("Gateway port: {}", config.gateway.port);
//! ```

pub mod gateway;
pub mod modbus;
pub mod serial;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use gateway::GatewayConfig;
pub use modbus::ModbusConfig;
pub use serial::SerialConfig;
pub use utils::{is_valid_ip_address, output_config_schema, ConfigValidationError};

/// Root configuration structure for the weighbridge gateway.
///
/// This structure serves as the main container for all configuration
/// sections of the application.
///
/// # Structure
///
/// The configuration is designed to be deserialized from and serialized to
/// YAML using the serde framework. The structure is validated against a
/// JSON schema to ensure all required fields are present and have valid
/// values.
///
/// # Default Values
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, allowing for minimal configuration when custom
/// settings are not required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the RS-232 link to the weighing scale.
    ///
    /// If not specified in the configuration file, default values are used.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Settings for the Modbus/TCP connection to the signal panel.
    ///
    /// This section controls the device address, unit identifier, the
    /// discrete-input block to read, and the polling cadence.
    /// If not specified, default values will be used.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Settings for the observer WebSocket gateway.
    ///
    /// These settings control network binding of the server observers
    /// connect to. If not specified, default values will be used.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        debug!("Creating sample configuration file at {:?}", path);
        let sample_path = path.with_extension("sample.yaml");

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                std::fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        let sample_config = Self::default();
        sample_config
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
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

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        // Load and validate with the schema
        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        // Create the validator
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        // Validate before deserializing to Config
        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            // We generate a config.sample.yaml file with the default values
            // for the user to edit
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        // Now that YAML has been validated, deserialize to Config
        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                // Generate a sample config file just like we do for schema
                // validation failures
                match Self::create_sample_config(path) {
                    Ok(_) => debug!("Successfully created sample config"),
                    Err(e) => error!("Failed to create sample config: {}", e),
                }

                // Return the original error enhanced with context
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        // Perform additional specific validations
        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            // Generate a sample config file
            Self::create_sample_config(path)?;
            return Err(err.into());
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
    /// Only values that are explicitly provided will override the existing
    /// configuration.
    ///
    /// # Parameters
    ///
    /// * `gateway_port` - TCP port for the observer gateway
    /// * `gateway_address` - Network address for the observer gateway to bind to
    /// * `serial_device` - Serial device path of the scale
    /// * `baud_rate` - Baud rate of the scale link
    /// * `modbus_address` - IP address of the Modbus device
    /// * `modbus_port` - TCP port of the Modbus device
    /// * `poll_interval_ms` - Modbus polling cadence in milliseconds
    pub fn apply_args(
        &mut self,
        gateway_port: Option<u16>,
        gateway_address: Option<String>,
        serial_device: Option<String>,
        baud_rate: Option<u32>,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
        poll_interval_ms: Option<u64>,
    ) {
        // Only override if command-line arguments are provided
        if let Some(port) = gateway_port {
            debug!("Overriding gateway port from command line: {}", port);
            self.gateway.port = port;
        }

        if let Some(address) = gateway_address {
            debug!("Overriding gateway address from command line: {}", address);
            self.gateway.address = address;
        }

        if let Some(device) = serial_device {
            debug!("Overriding serial device from command line: {}", device);
            self.serial.device = device;
        }

        if let Some(baud) = baud_rate {
            debug!("Overriding baud rate from command line: {}", baud);
            self.serial.baud_rate = baud;
        }

        if let Some(address) = modbus_address {
            debug!("Overriding Modbus address from command line: {}", address);
            self.modbus.address = address;
        }

        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }

        if let Some(interval) = poll_interval_ms {
            debug!("Overriding poll interval from command line: {}", interval);
            self.modbus.poll_interval_ms = interval;
        }
    }
}
