// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Debug test for configuration validation
use anyhow::Result;
use clap::Parser;
use rust_weighbridge::config::Config;
use std::path::{Path, PathBuf};
#[derive(Debug, Parser)]
#[command(author, version, about = "Check config.yaml for detecting errors", long_about = None)]
struct Args {
    /// Input file path (.yaml)
    ///
    /// The path where the configuration file is located.
    /// should be .yaml or .yml format.
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Check if input file exists
    if !Path::new(&args.input).exists() {
        eprintln!(
            "Error: Input file '{}' does not exist",
            args.input.display()
        );
        std::process::exit(1);
    }

    let path = Path::new(args.input.as_path());

    println!("Testing file: {:?}", path);
    println!("File exists: {}", path.exists());

    let result = Config::from_file(path);

    match result {
        Ok(config) => {
            println!("Validation succeeded for file: {:?}", path);
            println!(
                "Serial: {} at {} baud (enabled: {})",
                config.serial.device, config.serial.baud_rate, config.serial.enabled
            );
            println!(
                "Modbus: {}:{} unit {} every {} ms (enabled: {})",
                config.modbus.address,
                config.modbus.port,
                config.modbus.unit_id,
                config.modbus.poll_interval_ms,
                config.modbus.enabled
            );
            println!(
                "Gateway: {}:{} (enabled: {})",
                config.gateway.address, config.gateway.port, config.gateway.enabled
            );
        }
        Err(e) => println!("Validation failed: {}", e),
    }

    Ok(())
}
