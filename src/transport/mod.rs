// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Transport link state
//!
//! Both input transports (serial scale and Modbus panel) run an explicit
//! connection state machine driven from a single control loop:
//! `Closed → Connecting → Open → Faulted → Connecting → …`
//!
//! Each transport writes its state exclusively; the weight store and the
//! broadcaster never observe it. The [`LinkState`] handle lets the status
//! endpoint read the current state for diagnostics without touching the
//! control loop.

use std::fmt;
use std::sync::{Arc, RwLock};

/// Lifecycle state of one transport link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying to be (initial and terminal state)
    Closed,
    /// Connection establishment in progress
    Connecting,
    /// Link is up and carrying traffic
    Open,
    /// Link was lost or could not be established; a retry is pending
    Faulted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Shared handle to one transport's current connection state.
///
/// The owning control loop is the only writer; any number of readers may
/// sample the state for diagnostics. Holds a plain `RwLock` over the
/// `Copy` enum, never across an await.
#[derive(Debug, Clone)]
pub struct LinkState {
    inner: Arc<RwLock<ConnectionState>>,
}

impl LinkState {
    /// New handle starting in `Closed`
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ConnectionState::Closed)),
        }
    }

    /// Record a state transition
    pub fn set(&self, state: ConnectionState) {
        *self.inner.write().unwrap() = state;
    }

    /// Sample the current state
    pub fn get(&self) -> ConnectionState {
        *self.inner.read().unwrap()
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}
