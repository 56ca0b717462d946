// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests for the serial scale reader's line handling
//!
//! These tests drive `SerialLineReader::consume_lines` over an in-memory
//! duplex pipe standing in for the serial port, feeding it the CR-LF framed
//! lines a real indicator transmits, and check the weight store and the
//! events fanned out to observers.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time;

use rust_weighbridge::broadcast::EventBroadcaster;
use rust_weighbridge::config::SerialConfig;
use rust_weighbridge::serial::{SerialLineReader, StreamEnd};
use rust_weighbridge::transport::LinkState;
use rust_weighbridge::weight::WeightStore;

// This allows us to use #[tokio::test]
extern crate tokio;

fn make_reader() -> (
    SerialLineReader,
    Arc<WeightStore>,
    Arc<EventBroadcaster>,
    Arc<AtomicBool>,
) {
    let store = Arc::new(WeightStore::new());
    let broadcaster = Arc::new(EventBroadcaster::new(store.clone()));
    let running = Arc::new(AtomicBool::new(true));
    let reader = SerialLineReader::new(
        SerialConfig::default(),
        store.clone(),
        broadcaster.clone(),
        running.clone(),
        LinkState::new(),
    );
    (reader, store, broadcaster, running)
}

#[tokio::test]
async fn test_framed_line_updates_store_and_observers() -> Result<(), Box<dyn std::error::Error>> {
    let (reader, store, broadcaster, _running) = make_reader();
    let (mut tx, rx) = tokio::io::duplex(256);
    let (_id, mut events) = broadcaster.register().await;

    let consumer = tokio::spawn(async move {
        let _ = reader.consume_lines(rx).await;
    });

    tx.write_all(b"ST,GS,+  00012.50 kg\r\n").await?;
    drop(tx);
    consumer.await?;

    assert_eq!(store.get().await.map(|r| r.value), Some(12.5));
    let event = time::timeout(Duration::from_secs(1), events.recv())
        .await?
        .unwrap();
    assert_eq!(event, r#"{"type":"weightUpdate","value":"12.50"}"#);
    Ok(())
}

#[tokio::test]
async fn test_each_line_overwrites_previous_weight() -> Result<(), Box<dyn std::error::Error>> {
    let (reader, store, _broadcaster, _running) = make_reader();
    let (mut tx, rx) = tokio::io::duplex(256);

    let consumer = tokio::spawn(async move {
        let _ = reader.consume_lines(rx).await;
    });

    tx.write_all(b"ST,GS,+  00012.50 kg\r\nST,GS,+  00013.75 kg\r\n")
        .await?;
    drop(tx);
    consumer.await?;

    assert_eq!(store.get().await.map(|r| r.value), Some(13.75));
    Ok(())
}

#[tokio::test]
async fn test_garbage_line_is_skipped_without_fault() -> Result<(), Box<dyn std::error::Error>> {
    let (reader, store, broadcaster, _running) = make_reader();
    let (mut tx, rx) = tokio::io::duplex(256);
    let (_id, mut events) = broadcaster.register().await;

    let consumer = tokio::spawn(async move { reader.consume_lines(rx).await });

    // Garbage first, then a valid line: the garbage must not break framing
    tx.write_all(b"OVERLOAD\r\nST,GS,+  00004.20 kg\r\n").await?;
    drop(tx);
    let result = consumer.await?;
    assert!(result.is_ok(), "a garbage line must not fault the link");

    assert_eq!(store.get().await.map(|r| r.value), Some(4.2));
    // The only event is the valid line's update
    let event = time::timeout(Duration::from_secs(1), events.recv())
        .await?
        .unwrap();
    assert_eq!(event, r#"{"type":"weightUpdate","value":"4.20"}"#);
    assert!(events.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_store_survives_stream_close() -> Result<(), Box<dyn std::error::Error>> {
    let (reader, store, _broadcaster, _running) = make_reader();
    let (mut tx, rx) = tokio::io::duplex(256);

    let consumer = tokio::spawn(async move { reader.consume_lines(rx).await });

    tx.write_all(b"ST,GS,+  00099.90 kg\r\n").await?;
    drop(tx);

    // EOF reports a peer close; the last weight stays valid for captures
    assert_eq!(consumer.await??, StreamEnd::PeerClosed);
    assert_eq!(store.get().await.map(|r| r.value), Some(99.9));
    Ok(())
}

#[tokio::test]
async fn test_running_flag_stops_consumption() -> Result<(), Box<dyn std::error::Error>> {
    let (reader, _store, _broadcaster, running) = make_reader();
    let (tx, rx) = tokio::io::duplex(256);

    running.store(false, Ordering::SeqCst);
    let consumer = tokio::spawn(async move { reader.consume_lines(rx).await });

    // The reader must return without waiting for more input, and report
    // the shutdown so the reconnect loop exits without a backoff
    assert_eq!(consumer.await??, StreamEnd::ShutdownRequested);
    drop(tx);
    Ok(())
}
