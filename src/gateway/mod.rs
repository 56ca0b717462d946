// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Observer gateway module
//!
//! This module provides the web surface of the gateway: a WebSocket
//! endpoint observers connect to for weight and trigger events, and a
//! small status endpoint for commissioning.
//!
//! The gateway is a thin wrapper around the broadcaster: it registers one
//! observer channel per WebSocket connection and forwards whatever the
//! broadcaster queues. Observers send no interpreted payload; only the
//! connection lifecycle matters.

pub mod server;

pub use server::build_rocket;
