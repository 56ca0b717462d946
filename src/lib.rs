// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Weighbridge gateway library
//!
//! This library bridges an industrial weighing station to WebSocket
//! observers. It reads a continuous weight stream from a serial scale
//! indicator, polls a Modbus/TCP panel for gross and tare capture requests,
//! and fans the resulting events out to every connected observer as JSON.

pub mod broadcast;
pub mod config;
pub mod daemon;
pub mod gateway;
pub mod modbus;
pub mod serial;
pub mod transport;
pub mod weight;
