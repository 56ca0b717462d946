// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Observer gateway configuration

use serde::{Deserialize, Serialize};

/// Configuration for the observer WebSocket gateway.
///
/// Observers connect to `/events` and receive weight and trigger events
/// as JSON messages; they are pure message sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Flag to enable or disable the gateway server
    pub enabled: bool,

    /// Network address the gateway binds to.
    ///
    /// Use "0.0.0.0" to accept observers from other hosts.
    pub address: String,

    /// TCP port the gateway listens on
    pub port: u16,

    /// Server identification string sent in HTTP responses
    pub name: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1".to_string(),
            port: 8080,
            name: format!("WeighbridgeGateway/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
