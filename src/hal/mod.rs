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

//! Legacy fingerprint hardware module seam
//!
//! The traits here mirror the `hw_module_t` / `fingerprint_device_t` vtables
//! closely enough that the native backend is a thin shim, while tests can
//! substitute in-process fakes.
//!
//! Status codes are passed through untouched: `0` is success, anything else
//! is a negative errno reported by the vendor module.

#[cfg(feature = "libhardware")]
pub mod libhardware;
mod msg;

use std::sync::Arc;

use crate::error::{BridgeError, Result};

pub use msg::{FingerId, FingerprintMsg, HwAuthToken};

/// Encode a module API version the way `HARDWARE_MODULE_API_VERSION` does.
pub const fn hardware_module_api_version(major: u8, minor: u8) -> u32 {
    ((major as u32) << 8) | minor as u32
}

/// Context-free notification entry point registered with the device.
///
/// The legacy ABI hands the callback nothing but the message, so whatever
/// is registered here has to find its own way to the active session.
pub type NotifyFn = fn(&FingerprintMsg);

/// Resolves hardware modules by identifier, like `hw_get_module_by_class`.
pub trait ModuleLoader: Send + Sync {
    fn get_module_by_class(&self, id: &str, class: Option<&str>) -> Result<Box<dyn HwModule>>;
}

/// A resolved, not yet opened, hardware module.
pub trait HwModule: Send + Sync {
    /// Open the fingerprint device. Fails with [`BridgeError::NoOpenMethod`]
    /// when the module does not export an open function.
    fn open(&self) -> Result<Arc<dyn FingerprintDevice>>;
}

/// An opened `fingerprint_device_t`.
///
/// Every method takes `&self`: the vendor module is called both from the
/// service thread and from within its own notification context.
#[cfg_attr(test, mockall::automock)]
pub trait FingerprintDevice: Send + Sync {
    /// `hw_device_t::version`
    fn version(&self) -> u32;

    fn set_notify(&self, notify: NotifyFn) -> i32;

    fn pre_enroll(&self) -> u64;

    fn enroll(&self, hat: &HwAuthToken, gid: u32, timeout_sec: u32) -> i32;

    fn post_enroll(&self) -> i32;

    fn get_authenticator_id(&self) -> u64;

    fn cancel(&self) -> i32;

    fn enumerate(&self) -> i32;

    fn remove(&self, gid: u32, fid: u32) -> i32;

    fn set_active_group(&self, gid: u32, store_path: &str) -> i32;

    fn authenticate(&self, operation_id: u64, gid: u32) -> i32;

    /// `hw_device_t::close`; must be called at most once per opened device.
    fn close(&self) -> i32;
}

/// Loader for hosts without a fingerprint module. Every lookup fails, which
/// leaves the service in its "no device" state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModules;

impl ModuleLoader for NoModules {
    fn get_module_by_class(&self, id: &str, class: Option<&str>) -> Result<Box<dyn HwModule>> {
        // -ENOENT, matching what libhardware reports for a missing module
        Err(BridgeError::module_not_found(id, class, -2))
    }
}
