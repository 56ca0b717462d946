// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use clap::Parser;
use std::error::Error;
use std::net::SocketAddr;
use tokio::time::{timeout, Duration};
use tokio_modbus::prelude::*;

use rust_weighbridge::modbus::{GROSS_INPUT_INDEX, TARE_INPUT_INDEX};

/// Modbus probe for reading the discrete-input block of a weighing panel
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus panel address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus panel port
    #[clap(long, default_value = "502")]
    port: u16,

    /// Modbus unit identifier
    #[clap(long, default_value = "1")]
    unit_id: u8,

    /// Starting discrete-input address
    #[clap(long, default_value = "0")]
    start_address: u16,

    /// Number of inputs to read
    #[clap(long, default_value = "8")]
    quantity: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    // Parse command line arguments
    let args = Args::parse();

    // Format panel address
    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;
    println!("Connecting to Modbus panel at {}", socket_addr);

    // Create TCP transport
    let mut ctx = timeout(
        Duration::from_secs(1),
        tcp::connect_slave(socket_addr, Slave(args.unit_id)),
    )
    .await??;

    // Read discrete inputs
    println!(
        "Reading {} discrete inputs starting at address {}",
        args.quantity, args.start_address
    );
    let response = timeout(
        Duration::from_secs(1),
        ctx.read_discrete_inputs(args.start_address, args.quantity),
    )
    .await???;

    // Display raw results
    println!("Raw input values: {:?}", response);

    // Display formatted results based on the panel's input map
    for (i, value) in response.iter().enumerate() {
        let index = args.start_address as usize + i;
        let state = if *value { "ON" } else { "off" };
        match index {
            GROSS_INPUT_INDEX => println!("Input {}: Gross capture request = {}", index, state),
            TARE_INPUT_INDEX => println!("Input {}: Tare capture request = {}", index, state),
            _ => println!("Input {}: {}", index, state),
        }
    }

    ctx.disconnect().await?;
    Ok(())
}
