// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module provides the Modbus/TCP client side of the gateway: the
//! station's push-buttons are wired to a Modbus device as discrete inputs,
//! and the poller reads them on a fixed cadence to detect capture requests.
//!
//! ## Key Components
//!
//! - `ModbusPoller`: the polling loop owning the client connection.
//! - `DiscreteInputSnapshot`: one polled block of input bits.
//!
//! ## Input Map
//!
//! Within the polled block (default start address 0, quantity 8):
//!
//! - Index 1: gross-weight capture requested
//! - Index 2: tare-weight capture requested
//!
//! The remaining positions are wired but carry no meaning for the gateway.

pub mod poller;

pub use poller::{DiscreteInputSnapshot, ModbusPoller, GROSS_INPUT_INDEX, TARE_INPUT_INDEX};
