/*
 * This file is part of fpbridge.
 *
 * Copyright (C) 2025 fpbridge contributors
 *
 * fpbridge is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * fpbridge is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with fpbridge. If not, see <https://www.gnu.org/licenses/>.
 */

use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info};

use fpbridge::config::{self, BridgeConfig};
use fpbridge::constants::modules::CANDIDATES;
use fpbridge::device::DeviceManager;
use fpbridge::hal::ModuleLoader;
use fpbridge::logger::{self, LogSink};
use fpbridge::router;
use fpbridge::sensor::CapabilityReporter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    eprintln!("fpbridged {} - legacy fingerprint HAL bridge", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    fpbridged [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -p, --props         Print the sensor properties as JSON (default)");
    eprintln!("    -c, --config PATH   Config file (default: $FPBRIDGE_CONFIG or XDG config dir)");
    eprintln!("    -v, --version       Print version");
    eprintln!("    -h, --help          Print this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    FPBRIDGE_CONFIG     Config file path");
    eprintln!("    RUST_LOG            Overrides the configured log level");
}

#[cfg(feature = "libhardware")]
fn module_loader() -> Box<dyn ModuleLoader> {
    Box::new(fpbridge::hal::libhardware::NativeLoader)
}

#[cfg(not(feature = "libhardware"))]
fn module_loader() -> Box<dyn ModuleLoader> {
    Box::new(fpbridge::hal::NoModules)
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<BridgeConfig> {
    let path = path.unwrap_or_else(config::config_path);
    config::load_config_from(&path).with_context(|| format!("loading {}", path.display()))
}

fn print_props(config: &BridgeConfig) -> anyhow::Result<()> {
    let loader = module_loader();
    // No udfps vendor library is linked into the binary.
    let device = DeviceManager::open(loader.as_ref(), CANDIDATES, router::notify, || None);
    let reporter = CapabilityReporter::new(
        device.sensor_type(),
        config.max_enrollments_per_user,
        config.property_store(),
    );

    let props = vec![reporter.sensor_props()];
    println!("{}", serde_json::to_string_pretty(&props)?);

    // Dropping the manager destroys the touch handler and closes the device.
    drop(device);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_override = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-v" | "--version" => {
                println!("fpbridged {}", VERSION);
                return Ok(());
            }
            "-p" | "--props" => {}
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_override = Some(PathBuf::from(&args[i]));
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match load_config(config_override) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let sink = logger::init_logging(&config.log_level);
    info!(
        "fpbridged {} starting, logging to {}",
        VERSION,
        if sink == LogSink::Journald { "systemd journal" } else { "stderr" }
    );

    if let Err(e) = print_props(&config) {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
