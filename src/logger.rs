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

use std::path::Path;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::constants::paths::JOURNALD_SOCKET;

/// Where log records end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Journald,
    Stderr,
    /// A global subscriber was already installed; records go there.
    AlreadyInstalled,
}

fn filter(level: &str) -> EnvFilter {
    // RUST_LOG wins over the configured level.
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(crate::constants::logging::DEFAULT_LEVEL))
}

/// Install the global subscriber. Prefers the systemd journal when it is
/// running and falls back to stderr, leaving stdout to command output.
/// Safe to call more than once.
pub fn init_logging(level: &str) -> LogSink {
    if Path::new(JOURNALD_SOCKET).exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                let installed = tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(filter(level))
                    .try_init();
                return match installed {
                    Ok(()) => LogSink::Journald,
                    Err(_) => LogSink::AlreadyInstalled,
                };
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stderr", e);
            }
        }
    }

    let installed = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(filter(level))
        .try_init();
    match installed {
        Ok(()) => LogSink::Stderr,
        Err(_) => LogSink::AlreadyInstalled,
    }
}
