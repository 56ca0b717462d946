// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module provides functionality for running and managing background
//! tasks (daemons) in the weighbridge gateway. It handles the lifecycle of
//! various services including:
//!
//! - Observer gateway web server (WebSocket fan-out)
//! - Serial scale line reader
//! - Modbus capture-request poller
//! - System health monitoring (heartbeat)
//!
//! The daemon system allows for graceful startup and shutdown of these
//! services, with proper error handling and task coordination.
//!
//! ## Architecture
//!
//! The daemon system uses Tokio's asynchronous runtime to manage concurrent
//! tasks. Each service runs as an independent task, and the main daemon
//! structure tracks and coordinates these tasks. All services share a single
//! [`WeightStore`] and [`EventBroadcaster`] so the Modbus poller attaches the
//! serial reader's last-known weight to capture events, and every observer
//! sees the same event stream.

use anyhow::Result;
use log::{debug, error, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::broadcast::EventBroadcaster;
use crate::config::Config;
use crate::gateway::build_rocket;
use crate::modbus::ModbusPoller;
use crate::serial::SerialLineReader;
use crate::transport::LinkState;
use crate::weight::WeightStore;
use rocket::config::LogLevel;

/// Represents a daemon task manager that coordinates multiple background services
///
/// This structure maintains a collection of asynchronous tasks and provides
/// methods to start, stop, and monitor them. It handles the coordination
/// between the gateway web server, the serial reader, the Modbus poller and
/// the heartbeat monitor.
///
/// # Fields
///
/// * `tasks` - Collection of handles to running tasks for management and cleanup
/// * `running` - Atomic flag shared between tasks to coordinate shutdown
///
/// # Thread Safety
///
/// The `running` flag is wrapped in an `Arc` to allow safe sharing between
/// multiple tasks. Each task checks this flag periodically to determine if it
/// should continue running or gracefully terminate.
///
/// The `store` and `broadcaster` are the shared state every service reads
/// from or writes to. The two [`LinkState`] handles are written by the
/// serial and Modbus loops and read by the `/api/status` endpoint.
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    store: Arc<WeightStore>,
    broadcaster: Arc<EventBroadcaster>,
    serial_link: LinkState,
    modbus_link: LinkState,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// Initializes a new daemon manager with an empty task list, the running
    /// flag set to `true`, an empty weight store and a broadcaster with no
    /// observers.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_weighbridge::daemon::Daemon;
    ///
    /// let daemon = Daemon::new();
    /// // Daemon is now ready to launch tasks
    /// ```
    pub fn new() -> Self {
        let store = Arc::new(WeightStore::new());
        let broadcaster = Arc::new(EventBroadcaster::new(store.clone()));
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            store,
            broadcaster,
            serial_link: LinkState::new(),
            modbus_link: LinkState::new(),
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// Starts the various daemon services according to the provided
    /// configuration. Only services that are enabled in the configuration
    /// will be started. Each service runs as a separate asynchronous task.
    ///
    /// The following services may be started:
    /// * Observer gateway web server - If `config.gateway.enabled` is `true`
    /// * Serial scale reader - If `config.serial.enabled` is `true`
    /// * Modbus poller - If `config.modbus.enabled` is `true`
    /// * Heartbeat monitoring - Always started for system health monitoring
    ///
    /// # Errors
    ///
    /// This function can fail if any of the services fail to start, such as
    /// the web server failing to bind to the specified port.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        if config.gateway.enabled {
            self.start_gateway_server(config).await?;
        }

        if config.serial.enabled {
            self.start_serial_reader(config)?;
        }

        if config.modbus.enabled {
            self.start_modbus_poller(config)?;
        }

        // Start heartbeat task for monitoring
        self.start_heartbeat()?;

        Ok(())
    }

    /// Start the Rocket web server for observer connections
    ///
    /// Initializes and launches a Rocket web server hosting the `/events`
    /// WebSocket endpoint and the `/api/status` snapshot. The server is
    /// configured according to the provided configuration, including address
    /// and port.
    ///
    /// This method spawns an asynchronous task that runs the web server in
    /// the background.
    async fn start_gateway_server(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting observer gateway on {}:{}",
            config.gateway.address, config.gateway.port
        );

        let figment = rocket::Config::figment()
            .merge(("ident", config.gateway.name.clone()))
            .merge(("address", config.gateway.address.clone()))
            .merge(("port", config.gateway.port))
            .merge(("log_level", LogLevel::Normal));

        let rocket = build_rocket(
            figment,
            self.store.clone(),
            self.broadcaster.clone(),
            self.serial_link.clone(),
            self.modbus_link.clone(),
        )
        .await;

        let task = tokio::spawn(async move {
            let ignited = rocket.ignite().await?;
            ignited.launch().await?;
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start the serial scale reader task
    ///
    /// Spawns the [`SerialLineReader`] loop that opens the configured serial
    /// device, consumes CR-LF framed indicator lines and publishes weight
    /// updates. The reader owns its reconnect cycle; a failure of the loop
    /// itself is logged here.
    fn start_serial_reader(&mut self, config: &Config) -> Result<()> {
        info!("Starting serial reader task");

        let mut reader = SerialLineReader::new(
            config.serial.clone(),
            self.store.clone(),
            self.broadcaster.clone(),
            self.running.clone(),
            self.serial_link.clone(),
        );
        let task = tokio::spawn(async move {
            if let Err(e) = reader.run().await {
                error!("Serial reader stopped with error: {:#}", e);
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start the Modbus capture-request poller task
    ///
    /// Spawns the [`ModbusPoller`] loop that connects to the weighing panel,
    /// reads the discrete-input block on the configured interval and emits
    /// capture events while the gross or tare request bits are raised.
    fn start_modbus_poller(&mut self, config: &Config) -> Result<()> {
        info!("Starting Modbus poller task");

        let mut poller = ModbusPoller::new(
            config.modbus.clone(),
            self.store.clone(),
            self.broadcaster.clone(),
            self.running.clone(),
            self.modbus_link.clone(),
        );
        let task = tokio::spawn(async move {
            if let Err(e) = poller.run().await {
                error!("Modbus poller stopped with error: {:#}", e);
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    ///
    /// The heartbeat task runs every 60 seconds and continues until the
    /// daemon's `running` flag is set to `false`. In a production environment
    /// these messages can be monitored externally to detect if the daemon has
    /// stopped functioning.
    fn start_heartbeat(&mut self) -> Result<()> {
        info!("Starting heartbeat monitor");

        let running = self.running.clone();
        let broadcaster = self.broadcaster.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                debug!(
                    "Daemon heartbeat: running, {} observer(s) connected",
                    broadcaster.observer_count().await
                );
                time::sleep(Duration::from_secs(60)).await;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Get the shared last-known-weight store
    pub fn weight_store(&self) -> Arc<WeightStore> {
        self.store.clone()
    }

    /// Get the shared event broadcaster
    pub fn broadcaster(&self) -> Arc<EventBroadcaster> {
        self.broadcaster.clone()
    }

    /// Stop all running tasks gracefully
    ///
    /// Signals all spawned tasks to terminate by setting the shared `running`
    /// flag to `false`. Each task checks this flag and performs a clean
    /// shutdown when it becomes `false`.
    ///
    /// This method only signals the tasks to stop; it does not wait for them
    /// to complete. To wait for all tasks to finish, call `join()` after this
    /// method.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        // Tasks should check the running flag and terminate gracefully
    }

    /// Wait for all tasks to complete
    ///
    /// Consumes the daemon and waits for all spawned tasks to finish
    /// execution. This method should be called after `shutdown()` to ensure a
    /// clean application exit.
    ///
    /// If any task panics or exceeds the shutdown timeout, the problem is
    /// logged, but this method still waits for the remaining tasks.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(result) => {
                    if let Err(e) = result {
                        log::error!("Task panicked: {}", e);
                    }
                }
                Err(_) => {
                    log::warn!("Task did not complete within timeout period, may be hung");
                }
            }
        }
        Ok(())
    }
}
