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

//! Hardware module discovery
//!
//! Walks the candidate list in order and returns the first module that
//! opens, reports the supported device version and accepts the notify
//! callback. Every failure is local to its candidate.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::constants::modules::SUPPORTED_VERSION;
use crate::error::{BridgeError, Result};
use crate::hal::{FingerprintDevice, ModuleLoader, NotifyFn};
use crate::sensor::FingerprintSensorType;

/// One entry of the module fallback list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateModule {
    pub id: &'static str,
    pub class: Option<&'static str>,
    pub sensor_type: FingerprintSensorType,
}

impl CandidateModule {
    fn class_name(&self) -> &'static str {
        self.class.unwrap_or("(null)")
    }
}

/// A validated device with its notify callback registered.
pub struct LocatedDevice {
    pub device: Arc<dyn FingerprintDevice>,
    pub sensor_type: FingerprintSensorType,
    pub module_id: &'static str,
}

impl std::fmt::Debug for LocatedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocatedDevice")
            .field("module_id", &self.module_id)
            .field("sensor_type", &self.sensor_type)
            .finish_non_exhaustive()
    }
}

/// Open a single candidate and validate it.
///
/// A device that opened but is then rejected is closed again before
/// returning, so an abandoned candidate never keeps the module busy.
pub fn open_hal(
    loader: &dyn ModuleLoader,
    candidate: &CandidateModule,
    notify: NotifyFn,
) -> Result<Arc<dyn FingerprintDevice>> {
    debug!("Opening fingerprint hal library {}...", candidate.id);
    let module = loader.get_module_by_class(candidate.id, candidate.class)?;
    let device = module.open()?;

    let version = device.version();
    if version != SUPPORTED_VERSION {
        close_abandoned(device.as_ref(), candidate);
        return Err(BridgeError::VersionMismatch {
            expected: SUPPORTED_VERSION,
            actual: version,
        });
    }

    let err = device.set_notify(notify);
    if err != 0 {
        close_abandoned(device.as_ref(), candidate);
        return Err(BridgeError::NotifyRegistration(err));
    }

    Ok(device)
}

fn close_abandoned(device: &dyn FingerprintDevice, candidate: &CandidateModule) {
    let err = device.close();
    if err != 0 {
        warn!("Can't close rejected module {}, error: {}", candidate.id, err);
    }
}

/// Probe `candidates` in order; later candidates are never touched once one
/// succeeds. Returns `None` when every candidate fails.
pub fn locate(
    loader: &dyn ModuleLoader,
    candidates: &[CandidateModule],
    notify: NotifyFn,
) -> Option<LocatedDevice> {
    for candidate in candidates {
        match open_hal(loader, candidate, notify) {
            Ok(device) => {
                info!(
                    "Opened fingerprint HAL, id {}, class {}",
                    candidate.id,
                    candidate.class_name()
                );
                return Some(LocatedDevice {
                    device,
                    sensor_type: candidate.sensor_type,
                    module_id: candidate.id,
                });
            }
            Err(e) if e.is_configuration_error() => {
                // Not a per-module problem, but the scan still moves on.
                error!("{} (id {})", e, candidate.id);
            }
            Err(e) => {
                error!(
                    "Can't open HAL module, id {}, class {}: {}",
                    candidate.id,
                    candidate.class_name(),
                    e
                );
            }
        }
    }

    error!("Can't open any HAL module");
    None
}
