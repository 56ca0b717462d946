// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Last-known-weight store
//!
//! This module holds the single most recent weight reading parsed from the
//! scale. The serial reader is the only writer; the Modbus poller and the
//! observer gateway read it. The store starts empty and, once a reading has
//! been accepted, is only ever overwritten by a newer one: a serial outage
//! must not invalidate the weight that capture signals rely on.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A successfully parsed weight reading from the scale.
///
/// The value is kept as transmitted by the scale (kilograms in this
/// deployment); observers receive the two-decimal rendering of
/// [`WeightReading::display_value`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightReading {
    /// Weight value in the unit the scale transmits
    pub value: f64,
}

impl WeightReading {
    /// Create a reading from a parsed value
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    /// Two-decimal rendering used on the observer wire
    pub fn display_value(&self) -> String {
        format!("{:.2}", self.value)
    }
}

/// Shared single-value store for the most recent weight reading.
///
/// Reads and writes are frequent and cheap (one float), so a plain
/// `RwLock` over the optional reading is sufficient. No I/O ever happens
/// while the lock is held.
#[derive(Debug)]
pub struct WeightStore {
    reading: RwLock<Option<WeightReading>>,
}

impl WeightStore {
    /// Create an empty store; no reading is valid until the first
    /// successful parse.
    pub fn new() -> Self {
        Self {
            reading: RwLock::new(None),
        }
    }

    /// The most recent reading, or `None` if no line has parsed yet
    pub async fn get(&self) -> Option<WeightReading> {
        *self.reading.read().await
    }

    /// Overwrite the current reading with a newer parsed value
    pub async fn set(&self, value: f64) {
        let mut reading = self.reading.write().await;
        *reading = Some(WeightReading::new(value));
    }
}

impl Default for WeightStore {
    fn default() -> Self {
        Self::new()
    }
}
