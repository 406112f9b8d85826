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

//! fpbridge - legacy fingerprint HAL bridge
//!
//! Exposes a device that speaks the legacy libhardware fingerprint
//! interface through the modern sensor-props/session surface: module
//! discovery, capability reporting, single-session admission and routing
//! of hardware notifications to the open session.

pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod fingerprint;
pub mod hal;
pub mod locator;
pub mod logger;
pub mod props;
pub mod router;
pub mod sensor;
pub mod session;
pub mod udfps;

pub use error::{BridgeError, Result};
pub use fingerprint::{Collaborators, Fingerprint};

#[cfg(test)]
pub mod test_utils;
