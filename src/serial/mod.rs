// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! RS-232 scale reader
//!
//! This module owns the serial link to the weighing scale. The scale pushes
//! readings continuously as CR-LF delimited text lines; each line carries
//! one numeric token, possibly surrounded by status characters
//! (`"ST,GS,+  00012.50 kg"`). The reader extracts the first float-looking
//! substring of each line, overwrites the shared weight store and publishes
//! a `weightUpdate` event.
//!
//! The link is expected to drop: cables get unplugged, scales get power
//! cycled. Any open failure, read error or unexpected close moves the link
//! to `Faulted`, and the reader retries forever on a timed backoff. The
//! last accepted weight is never cleared by an outage, so capture signals
//! keep working while the scale is away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use log::{debug, error, info, warn};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time::{sleep, Duration};
use tokio_serial::SerialPortBuilderExt;

use crate::broadcast::{EventBroadcaster, OutboundEvent};
use crate::config::SerialConfig;
use crate::transport::{ConnectionState, LinkState};
use crate::weight::WeightStore;

/// Why line consumption stopped on an otherwise healthy stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The stream reached EOF; the peer closed the link
    PeerClosed,
    /// The shared running flag was cleared
    ShutdownRequested,
}

static WEIGHT_PATTERN: OnceLock<Regex> = OnceLock::new();

fn weight_pattern() -> &'static Regex {
    // Optional sign, digits, optional decimal point, digits
    WEIGHT_PATTERN.get_or_init(|| {
        Regex::new(r"[-+]?[0-9]*\.?[0-9]+").expect("weight pattern is a valid regex")
    })
}

/// Extract the first float-looking substring of a scale line.
///
/// Scale protocols prefix and suffix the numeric payload with status
/// characters, so the whole line is never required to be a clean number.
/// A line with no numeric token yields `None`. Note that a sign separated
/// from the digits (as in `"+  00012.50"`) is not part of the match; the
/// unsigned number is parsed, which is what the deployed scales transmit.
pub fn extract_weight(line: &str) -> Option<f64> {
    weight_pattern()
        .find(line)
        .and_then(|token| token.as_str().parse().ok())
}

/// Reader task owning the serial connection to the scale.
///
/// The connection state machine (`Closed → Connecting → Open → Faulted →
/// Connecting → …`) is driven entirely from [`SerialLineReader::run`];
/// other components only observe it through the shared [`LinkState`].
pub struct SerialLineReader {
    config: SerialConfig,
    store: Arc<WeightStore>,
    broadcaster: Arc<EventBroadcaster>,
    running: Arc<AtomicBool>,
    link: LinkState,
}

impl SerialLineReader {
    /// Create a reader; nothing is opened until [`SerialLineReader::run`].
    /// Transitions are published through `link` for the status endpoint.
    pub fn new(
        config: SerialConfig,
        store: Arc<WeightStore>,
        broadcaster: Arc<EventBroadcaster>,
        running: Arc<AtomicBool>,
        link: LinkState,
    ) -> Self {
        Self {
            config,
            store,
            broadcaster,
            running,
            link,
        }
    }

    /// Run the reader until the shared running flag is cleared.
    ///
    /// Open failures retry after `open_retry_ms`; mid-stream faults and
    /// unexpected closes retry after the shorter `reconnect_ms`. There is
    /// no retry limit: the link is expected to recover once the physical
    /// device is restored.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Serial reader starting for {} at {} baud",
            self.config.device, self.config.baud_rate
        );

        while self.running.load(Ordering::SeqCst) {
            self.link.set(ConnectionState::Connecting);
            let port = match tokio_serial::new(&self.config.device, self.config.baud_rate)
                .open_native_async()
            {
                Ok(port) => port,
                Err(e) => {
                    error!("Serial port open error on {}: {}", self.config.device, e);
                    self.link.set(ConnectionState::Faulted);
                    sleep(Duration::from_millis(self.config.open_retry_ms)).await;
                    continue;
                }
            };

            info!(
                "Connected to serial port {} at {} baud",
                self.config.device, self.config.baud_rate
            );
            self.link.set(ConnectionState::Open);

            match self.consume_lines(port).await {
                // A shutdown is not a fault: no warning, no backoff
                Ok(StreamEnd::ShutdownRequested) => break,
                Ok(StreamEnd::PeerClosed) => warn!("Serial port closed by peer, reconnecting"),
                Err(e) => error!("Serial port error: {}, reconnecting", e),
            }

            self.link.set(ConnectionState::Faulted);
            sleep(Duration::from_millis(self.config.reconnect_ms)).await;
        }

        self.link.set(ConnectionState::Closed);
        info!("Serial reader stopped");
        Ok(())
    }

    /// Consume CR-LF delimited lines from an open byte stream until it
    /// ends, errors or shutdown is requested.
    ///
    /// Generic over the stream so the framing and parse policy can be
    /// exercised against an in-memory pipe. The returned [`StreamEnd`]
    /// tells the reconnect loop whether a reopen is due.
    pub async fn consume_lines<R>(&self, stream: R) -> Result<StreamEnd>
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(stream).lines();
        while self.running.load(Ordering::SeqCst) {
            match lines.next_line().await? {
                Some(line) => self.process_line(&line).await,
                // EOF: the peer closed the stream
                None => return Ok(StreamEnd::PeerClosed),
            }
        }
        Ok(StreamEnd::ShutdownRequested)
    }

    /// Parse one scale line and propagate the reading.
    ///
    /// Lines without a numeric token are discarded with a warning; they
    /// never fault the link and never touch the stored weight.
    async fn process_line(&self, line: &str) {
        debug!("Scale line: {:?}", line);
        match extract_weight(line) {
            Some(value) => {
                self.store.set(value).await;
                debug!("Parsed weight: {:.2}", value);
                if let Err(e) = self
                    .broadcaster
                    .publish(&OutboundEvent::weight_update(value))
                    .await
                {
                    warn!("Failed to broadcast weight update: {}", e);
                }
            }
            None => warn!(
                "Could not extract weight from scale line: {:?}",
                line.trim()
            ),
        }
    }
}
