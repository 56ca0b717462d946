// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Outbound observer events
//!
//! Every message sent to an observer is a single JSON object tagged by a
//! `type` field. Weight values travel as strings with exactly two
//! fractional digits, matching what the station's display clients expect.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a capture request signal on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Total measured weight capture
    Gross,
    /// Empty-container weight capture
    Tare,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Gross => f.write_str("gross"),
            SignalKind::Tare => f.write_str("tare"),
        }
    }
}

/// A message fanned out to every connected observer.
///
/// Immutable once constructed and serialized identically for every
/// observer. `weightUpdate` means "latest known value"; `signalTrigger`
/// means "a capture happened, using the weight enclosed in this message" —
/// observers must use the enclosed value, never a separately fetched one,
/// so correctness does not depend on delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundEvent {
    /// A new weight reading was parsed from the scale
    WeightUpdate {
        /// Weight as a decimal string with two fractional digits
        value: String,
    },
    /// A capture request bit was observed while a valid weight existed
    SignalTrigger {
        /// Which capture button was asserted
        signal: SignalKind,
        /// Weight at the moment of evaluation, two fractional digits
        weight: String,
    },
}

impl OutboundEvent {
    /// Build a `weightUpdate` event from a parsed weight
    pub fn weight_update(value: f64) -> Self {
        OutboundEvent::WeightUpdate {
            value: format!("{value:.2}"),
        }
    }

    /// Build a `signalTrigger` event carrying the current weight
    pub fn signal_trigger(signal: SignalKind, weight: f64) -> Self {
        OutboundEvent::SignalTrigger {
            signal,
            weight: format!("{weight:.2}"),
        }
    }
}
