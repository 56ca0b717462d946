// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Discrete-input poller
//!
//! The poller connects to the signal panel on demand, reads one block of
//! discrete inputs per tick and evaluates the gross/tare capture bits
//! against the shared weight store. Connect and read failures close the
//! connection and piggyback the reconnect on the next scheduled tick; the
//! poll loop itself never terminates on error.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use log::{debug, error, info, warn};
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use crate::broadcast::{EventBroadcaster, OutboundEvent, SignalKind};
use crate::config::ModbusConfig;
use crate::transport::{ConnectionState, LinkState};
use crate::weight::WeightStore;

/// Position of the gross-weight capture bit within the polled block
pub const GROSS_INPUT_INDEX: usize = 1;

/// Position of the tare-weight capture bit within the polled block
pub const TARE_INPUT_INDEX: usize = 2;

/// One block of discrete inputs read during a single poll cycle.
///
/// Recreated on every cycle and discarded after evaluation; never cached
/// across ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscreteInputSnapshot {
    inputs: Vec<bool>,
}

impl DiscreteInputSnapshot {
    /// Wrap one polled bit block
    pub fn new(inputs: Vec<bool>) -> Self {
        Self { inputs }
    }

    /// State of the bit at `index`; positions outside the block read unset
    pub fn is_set(&self, index: usize) -> bool {
        self.inputs.get(index).copied().unwrap_or(false)
    }

    /// Gross-weight capture requested this cycle
    pub fn gross_requested(&self) -> bool {
        self.is_set(GROSS_INPUT_INDEX)
    }

    /// Tare-weight capture requested this cycle
    pub fn tare_requested(&self) -> bool {
        self.is_set(TARE_INPUT_INDEX)
    }
}

/// Polling task owning the Modbus/TCP client connection.
///
/// Like the serial reader, the connection state machine is driven from a
/// single control loop; the context is dropped on any fault and re-dialed
/// on the next tick.
pub struct ModbusPoller {
    config: ModbusConfig,
    store: Arc<WeightStore>,
    broadcaster: Arc<EventBroadcaster>,
    running: Arc<AtomicBool>,
    link: LinkState,
    ctx: Option<Context>,
}

impl ModbusPoller {
    /// Create a poller; nothing is dialed until [`ModbusPoller::run`]
    pub fn new(
        config: ModbusConfig,
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
            ctx: None,
        }
    }

    /// Run the poll loop until the shared running flag is cleared.
    ///
    /// Each tick ensures the connection is open, reads the input block and
    /// evaluates the capture bits. A failed cycle logs, closes the
    /// connection and waits for the next tick; there is no separate
    /// backoff.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Modbus poller starting against {}:{} unit {} every {} ms",
            self.config.address, self.config.port, self.config.unit_id,
            self.config.poll_interval_ms
        );

        let mut ticker = interval(Duration::from_millis(self.config.poll_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                error!("Modbus polling error: {:#}", e);
                self.disconnect().await;
            }
        }

        self.disconnect().await;
        self.link.set(ConnectionState::Closed);
        info!("Modbus poller stopped");
        Ok(())
    }

    /// One complete poll cycle: connect if needed, read, evaluate
    async fn poll_once(&mut self) -> Result<()> {
        self.ensure_connected().await?;
        let snapshot = self.read_inputs().await?;
        debug!("Discrete inputs: {:?}", snapshot);
        self.evaluate_triggers(&snapshot).await;
        Ok(())
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if self.ctx.is_some() {
            return Ok(());
        }

        self.link.set(ConnectionState::Connecting);
        let socket_addr: SocketAddr = format!("{}:{}", self.config.address, self.config.port)
            .parse()
            .with_context(|| format!("Invalid Modbus socket address {}", self.config.address))?;

        let request_timeout = Duration::from_millis(self.config.request_timeout_ms);
        let ctx = timeout(
            request_timeout,
            tcp::connect_slave(socket_addr, Slave(self.config.unit_id)),
        )
        .await
        .context("Modbus connect timed out")?
        .context("Modbus connect failed")?;

        info!(
            "Connected to Modbus device at {} (unit {})",
            socket_addr, self.config.unit_id
        );
        self.ctx = Some(ctx);
        self.link.set(ConnectionState::Open);
        Ok(())
    }

    async fn read_inputs(&mut self) -> Result<DiscreteInputSnapshot> {
        let ctx = self
            .ctx
            .as_mut()
            .context("Modbus connection not established")?;

        let request_timeout = Duration::from_millis(self.config.request_timeout_ms);
        let inputs = timeout(
            request_timeout,
            ctx.read_discrete_inputs(self.config.start_address, self.config.quantity),
        )
        .await
        .context("Modbus read timed out")?
        .context("Modbus read failed")?
        .map_err(|exception| anyhow!("Modbus exception response: {}", exception))?;

        Ok(DiscreteInputSnapshot::new(inputs))
    }

    /// Evaluate the capture bits against the current weight.
    ///
    /// Detection is level-triggered: every cycle in which a bit reads set
    /// emits a fresh trigger event, repeating at the poll cadence for as
    /// long as the physical button stays asserted. Consumers must tolerate
    /// consecutive duplicates for one capture request. A bit set before
    /// any weight was received is logged and skipped; the weight enclosed
    /// in the event is the value at the moment of evaluation.
    ///
    /// Takes `&mut self`: a shared borrow held across an await would pin
    /// the non-`Sync` client context into the future and make the poll
    /// loop unspawnable.
    async fn evaluate_triggers(&mut self, snapshot: &DiscreteInputSnapshot) {
        let reading = self.store.get().await;

        for (signal, index) in [
            (SignalKind::Gross, GROSS_INPUT_INDEX),
            (SignalKind::Tare, TARE_INPUT_INDEX),
        ] {
            if !snapshot.is_set(index) {
                continue;
            }
            match reading {
                Some(reading) => {
                    info!(
                        "{} capture signal detected, weight {:.2}",
                        signal, reading.value
                    );
                    if let Err(e) = self
                        .broadcaster
                        .publish(&OutboundEvent::signal_trigger(signal, reading.value))
                        .await
                    {
                        warn!("Failed to broadcast {} trigger: {}", signal, e);
                    }
                }
                None => warn!(
                    "{} capture signal set before any weight was received, skipped",
                    signal
                ),
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            let _ = ctx.disconnect().await;
            info!("Modbus connection closed, will reconnect on next poll");
        }
        self.link.set(ConnectionState::Faulted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn poller_fixture() -> (Arc<WeightStore>, ModbusPoller) {
        let store = Arc::new(WeightStore::new());
        let broadcaster = Arc::new(EventBroadcaster::new(store.clone()));
        let poller = ModbusPoller::new(
            ModbusConfig::default(),
            store.clone(),
            broadcaster,
            Arc::new(AtomicBool::new(true)),
            LinkState::new(),
        );
        (store, poller)
    }

    async fn observer(poller: &ModbusPoller) -> UnboundedReceiver<String> {
        let (_id, rx) = poller.broadcaster.register().await;
        rx
    }

    #[test]
    fn snapshot_positions() {
        let snapshot = DiscreteInputSnapshot::new(vec![false, true, false, true]);
        assert!(snapshot.gross_requested());
        assert!(!snapshot.tare_requested());
        assert!(snapshot.is_set(3));
        // Positions outside the block read unset
        assert!(!snapshot.is_set(7));
    }

    #[tokio::test]
    async fn trigger_with_weight_emits_event() {
        let (store, mut poller) = poller_fixture();
        store.set(12.5).await;
        let mut rx = observer(&poller).await;
        // Drain the registration snapshot
        rx.try_recv().unwrap();

        let snapshot = DiscreteInputSnapshot::new(vec![false, true, false, false]);
        poller.evaluate_triggers(&snapshot).await;

        assert_eq!(
            rx.try_recv().unwrap(),
            r#"{"type":"signalTrigger","signal":"gross","weight":"12.50"}"#
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn both_bits_emit_both_events() {
        let (store, mut poller) = poller_fixture();
        store.set(7.0).await;
        let mut rx = observer(&poller).await;
        rx.try_recv().unwrap();

        let snapshot = DiscreteInputSnapshot::new(vec![false, true, true, false]);
        poller.evaluate_triggers(&snapshot).await;

        assert_eq!(
            rx.try_recv().unwrap(),
            r#"{"type":"signalTrigger","signal":"gross","weight":"7.00"}"#
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"{"type":"signalTrigger","signal":"tare","weight":"7.00"}"#
        );
    }

    #[tokio::test]
    async fn trigger_without_weight_is_skipped() {
        let (_store, mut poller) = poller_fixture();
        let mut rx = observer(&poller).await;

        let snapshot = DiscreteInputSnapshot::new(vec![false, true, true, false]);
        poller.evaluate_triggers(&snapshot).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn level_triggering_repeats_every_cycle() {
        let (store, mut poller) = poller_fixture();
        store.set(3.0).await;
        let mut rx = observer(&poller).await;
        rx.try_recv().unwrap();

        let snapshot = DiscreteInputSnapshot::new(vec![false, false, true, false]);
        poller.evaluate_triggers(&snapshot).await;
        poller.evaluate_triggers(&snapshot).await;

        // Two cycles with the bit held produce two independent events
        assert!(rx.try_recv().unwrap().contains("tare"));
        assert!(rx.try_recv().unwrap().contains("tare"));
    }

    #[test]
    fn poll_loop_future_is_send() {
        fn assert_send<T: Send>(_: T) {}

        // The client context is Send but not Sync; the loop must never
        // borrow it shared across an await or the daemon cannot spawn it
        let (_store, mut poller) = poller_fixture();
        assert_send(poller.run());
    }
}
