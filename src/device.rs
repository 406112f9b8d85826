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

//! Device lifecycle
//!
//! Owns the opened hardware device and the optional under-display handler.
//! Teardown order is fixed: the handler is destroyed before the device it
//! was bound to is closed.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

use crate::error::{BridgeError, Result};
use crate::hal::{FingerprintDevice, ModuleLoader, NotifyFn};
use crate::locator::{locate, CandidateModule};
use crate::sensor::FingerprintSensorType;
use crate::udfps::{UdfpsHandler, UdfpsHandlerFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Open,
    Closed,
    /// `close` returned this status. The device is in an unknown state and
    /// is never closed a second time.
    CloseFailed(i32),
}

/// The process's single opened device, with an explicit, idempotent release.
pub struct HardwareHandle {
    device: Arc<dyn FingerprintDevice>,
    state: Mutex<HandleState>,
}

impl HardwareHandle {
    pub fn new(device: Arc<dyn FingerprintDevice>) -> Self {
        Self {
            device,
            state: Mutex::new(HandleState::Open),
        }
    }

    pub fn device(&self) -> &Arc<dyn FingerprintDevice> {
        &self.device
    }

    pub fn state(&self) -> HandleState {
        *self.state.lock()
    }

    /// Close the device. Only the first call reaches the hardware; later
    /// calls report the outcome of that first attempt.
    pub fn release(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            HandleState::Open => {
                let err = self.device.close();
                if err != 0 {
                    *state = HandleState::CloseFailed(err);
                    return Err(BridgeError::CloseFailed(err));
                }
                *state = HandleState::Closed;
                Ok(())
            }
            HandleState::Closed => Ok(()),
            HandleState::CloseFailed(err) => Err(BridgeError::CloseFailed(err)),
        }
    }
}

struct UdfpsBinding {
    factory: Arc<dyn UdfpsHandlerFactory>,
    handler: Arc<dyn UdfpsHandler>,
}

pub struct DeviceManager {
    handle: Option<HardwareHandle>,
    sensor_type: FingerprintSensorType,
    module_id: Option<&'static str>,
    udfps: Mutex<Option<UdfpsBinding>>,
}

impl DeviceManager {
    /// Locate and open the device. `resolve_udfps` is only consulted when
    /// the located sensor is an under-display one.
    pub fn open<R>(
        loader: &dyn ModuleLoader,
        candidates: &[CandidateModule],
        notify: NotifyFn,
        resolve_udfps: R,
    ) -> Self
    where
        R: FnOnce() -> Option<Arc<dyn UdfpsHandlerFactory>>,
    {
        let Some(located) = locate(loader, candidates, notify) else {
            return Self::without_device();
        };

        let udfps = if located.sensor_type.is_under_display() {
            bind_udfps(resolve_udfps, &located.device)
        } else {
            None
        };

        Self {
            handle: Some(HardwareHandle::new(located.device)),
            sensor_type: located.sensor_type,
            module_id: Some(located.module_id),
            udfps: Mutex::new(udfps),
        }
    }

    /// A manager that found no usable module.
    pub fn without_device() -> Self {
        Self {
            handle: None,
            sensor_type: FingerprintSensorType::Unknown,
            module_id: None,
            udfps: Mutex::new(None),
        }
    }

    pub fn device(&self) -> Option<Arc<dyn FingerprintDevice>> {
        self.handle
            .as_ref()
            .filter(|h| h.state() == HandleState::Open)
            .map(|h| Arc::clone(h.device()))
    }

    pub fn has_device(&self) -> bool {
        self.device().is_some()
    }

    pub fn sensor_type(&self) -> FingerprintSensorType {
        self.sensor_type
    }

    pub fn module_id(&self) -> Option<&'static str> {
        self.module_id
    }

    pub fn handle_state(&self) -> Option<HandleState> {
        self.handle.as_ref().map(HardwareHandle::state)
    }

    pub fn udfps_handler(&self) -> Option<Arc<dyn UdfpsHandler>> {
        self.udfps.lock().as_ref().map(|b| Arc::clone(&b.handler))
    }

    /// Destroy the under-display handler, then close the device. Safe to
    /// call more than once; `Drop` calls it as well.
    pub fn shutdown(&self) {
        trace!("DeviceManager::shutdown()");
        // Released before destroy so the factory may call back in.
        let binding = self.udfps.lock().take();
        if let Some(binding) = binding {
            binding.factory.destroy(binding.handler);
            debug!("Destroyed UdfpsHandler");
        }

        let Some(handle) = self.handle.as_ref() else {
            error!("No valid device");
            return;
        };
        if handle.state() != HandleState::Open {
            debug!("Fingerprint device already released ({:?})", handle.state());
            return;
        }
        match handle.release() {
            Ok(()) => info!("Closed fingerprint module"),
            Err(e) => error!("{}", e),
        }
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn bind_udfps<R>(resolve: R, device: &Arc<dyn FingerprintDevice>) -> Option<UdfpsBinding>
where
    R: FnOnce() -> Option<Arc<dyn UdfpsHandlerFactory>>,
{
    let Some(factory) = resolve() else {
        error!("Can't get UdfpsHandlerFactory");
        return None;
    };
    let Some(handler) = factory.create() else {
        error!("Can't create UdfpsHandler");
        return None;
    };
    handler.init(Arc::clone(device));
    Some(UdfpsBinding { factory, handler })
}
