// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;
use thiserror::Error;

use super::Config;
use crate::modbus::TARE_INPUT_INDEX;

/// Cross-field configuration rules not expressible in the JSON schema.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("serial baud rate must be non-zero")]
    ZeroBaudRate,

    #[error("modbus poll interval must be non-zero")]
    ZeroPollInterval,

    #[error("modbus quantity {0} does not cover the gross/tare capture indices")]
    QuantityTooSmall(u16),

    #[error("invalid modbus device address: {0}")]
    InvalidModbusAddress(String),
}

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// # Example
///
/// ```bash
/// ./rust_weighbridge --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    // Load the schema from the embedded string
    let schema_str = include_str!("../../resources/config.schema.json");

    // Parse the schema to a JSON Value to pretty-format it
    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    // Pretty-print the schema
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    // Output to stdout
    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
///
/// # Arguments
///
/// * `addr` - The address string to validate
///
/// # Returns
///
/// `true` if the address is valid, `false` otherwise
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered
/// by the JSON schema.
///
/// # Validation Rules
///
/// - **Serial link**: the baud rate must be non-zero
/// - **Poll cadence**: the Modbus poll interval must be non-zero
/// - **Register window**: the polled discrete-input block must contain the
///   gross and tare capture indices, otherwise no trigger could ever fire
/// - **Modbus address**: must be an IP address the TCP client can dial
pub fn validate_specific_rules(config: &Config) -> Result<(), ConfigValidationError> {
    debug!("Performing additional validation checks");

    if config.serial.enabled && config.serial.baud_rate == 0 {
        return Err(ConfigValidationError::ZeroBaudRate);
    }

    if config.modbus.enabled {
        if config.modbus.poll_interval_ms == 0 {
            return Err(ConfigValidationError::ZeroPollInterval);
        }

        // The capture bits live at fixed positions within the polled block
        if config.modbus.quantity <= TARE_INPUT_INDEX as u16 {
            return Err(ConfigValidationError::QuantityTooSmall(
                config.modbus.quantity,
            ));
        }

        if config.modbus.address.parse::<std::net::IpAddr>().is_err() {
            return Err(ConfigValidationError::InvalidModbusAddress(
                config.modbus.address.clone(),
            ));
        }
    }

    if !is_valid_ip_address(&config.gateway.address) {
        debug!(
            "Potentially invalid gateway address format: {}",
            config.gateway.address
        );
        // Just issue a warning but don't block
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn quantity_must_cover_capture_bits() {
        let mut config = Config::default();
        config.modbus.quantity = 2;
        assert!(matches!(
            validate_specific_rules(&config),
            Err(ConfigValidationError::QuantityTooSmall(_))
        ));
    }

    #[test]
    fn modbus_address_must_be_an_ip() {
        let mut config = Config::default();
        config.modbus.address = "panel.local".to_string();
        assert!(matches!(
            validate_specific_rules(&config),
            Err(ConfigValidationError::InvalidModbusAddress(_))
        ));
    }

    #[test]
    fn disabled_sections_are_not_checked() {
        let mut config = Config::default();
        config.modbus.enabled = false;
        config.modbus.address = "not an address".to_string();
        assert!(validate_specific_rules(&config).is_ok());
    }
}
