// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! RS-232 scale link configuration

use serde::{Deserialize, Serialize};

/// Configuration for the serial connection to the weighing scale.
///
/// The scale pushes weight readings continuously as CR-LF delimited text
/// lines; only the device path and baud rate are negotiated, framing is
/// fixed at the scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Flag to enable or disable the serial reader.
    ///
    /// When disabled, no weight readings are acquired and capture signals
    /// will never produce trigger events.
    pub enabled: bool,

    /// Serial device path of the scale (e.g. `/dev/ttyUSB0` or `COM2`)
    pub device: String,

    /// Baud rate of the scale link. The deployed scale transmits at 2400.
    pub baud_rate: u32,

    /// Backoff in milliseconds before retrying after a failed port open
    pub open_retry_ms: u64,

    /// Backoff in milliseconds before reopening after a mid-stream error
    /// or an unexpected close
    pub reconnect_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 2400,
            open_retry_ms: 5000,
            reconnect_ms: 2000,
        }
    }
}
