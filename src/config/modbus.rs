// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus/TCP panel configuration
//!
//! The panel exposes the station's push-buttons as discrete inputs. The
//! gateway acts as the Modbus client: it connects to the panel, selects a
//! unit identifier, and polls one block of discrete inputs on a fixed
//! cadence.

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus/TCP connection to the signal panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// Flag to enable or disable the Modbus poller.
    ///
    /// When disabled, weight readings still flow to observers but no
    /// capture triggers are ever emitted.
    pub enabled: bool,

    /// IP address of the Modbus device (192.168.200.35 in the reference
    /// deployment)
    pub address: String,

    /// TCP port of the Modbus device. Default is 502, the standard
    /// Modbus/TCP port.
    pub port: u16,

    /// Unit identifier selected after connecting
    pub unit_id: u8,

    /// First discrete input address of the polled block
    pub start_address: u16,

    /// Number of discrete inputs read per poll. Must cover the gross and
    /// tare capture indices (1 and 2).
    pub quantity: u16,

    /// Poll cadence in milliseconds.
    ///
    /// 1000 ms is the cadence in active use; lower values catch button
    /// presses quicker at the cost of bus traffic.
    pub poll_interval_ms: u64,

    /// Timeout in milliseconds applied to each connect and read request
    pub request_timeout_ms: u64,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1".to_string(),
            port: 502,
            unit_id: 1,
            start_address: 0,
            quantity: 8,
            poll_interval_ms: 1000,
            request_timeout_ms: 1000,
        }
    }
}
