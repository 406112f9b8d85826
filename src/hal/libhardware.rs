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

//! Native `libhardware` backend
//!
//! `#[repr(C)]` mirrors of the structures in `hardware/hardware.h` and
//! `hardware/fingerprint.h`, plus the C trampoline the module calls for
//! every notification.

use std::ffi::CString;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;
use libc::{c_char, c_int, c_void};
use parking_lot::RwLock;
use tracing::{error, warn};

use super::{
    FingerId, FingerprintDevice, FingerprintMsg, HwAuthToken, HwModule, ModuleLoader, NotifyFn,
};
use crate::error::{BridgeError, Result};

#[repr(C)]
pub struct HwModuleMethods {
    pub open: Option<
        unsafe extern "C" fn(
            module: *const HwModuleT,
            id: *const c_char,
            device: *mut *mut HwDeviceT,
        ) -> c_int,
    >,
}

#[repr(C)]
pub struct HwModuleT {
    pub tag: u32,
    pub module_api_version: u16,
    pub hal_api_version: u16,
    pub id: *const c_char,
    pub name: *const c_char,
    pub author: *const c_char,
    pub methods: *mut HwModuleMethods,
    pub dso: *mut c_void,
    // uint64_t on LP64, uint32_t otherwise
    pub reserved: [usize; 32 - 7],
}

#[repr(C)]
pub struct HwDeviceT {
    pub tag: u32,
    pub version: u32,
    pub module: *mut HwModuleT,
    pub reserved: [usize; 12],
    pub close: Option<unsafe extern "C" fn(device: *mut HwDeviceT) -> c_int>,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct FingerIdT {
    pub gid: u32,
    pub fid: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct HwAuthTokenT {
    pub version: u8,
    pub challenge: u64,
    pub user_id: u64,
    pub authenticator_id: u64,
    pub authenticator_type: u32,
    pub timestamp: u64,
    pub hmac: [u8; 32],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct EnrollT {
    pub finger: FingerIdT,
    pub samples_remaining: u32,
    pub msg: u64,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct IteratorT {
    pub finger: FingerIdT,
    pub remaining_templates: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct AuthenticatedT {
    pub finger: FingerIdT,
    pub hat: HwAuthTokenT,
}

#[repr(C)]
pub union FingerprintMsgData {
    pub error: c_int,
    pub enroll: EnrollT,
    pub enumerated: IteratorT,
    pub removed: IteratorT,
    pub acquired: c_int,
    pub authenticated: AuthenticatedT,
}

#[repr(C)]
pub struct FingerprintMsgT {
    pub msg_type: c_int,
    pub data: FingerprintMsgData,
}

pub type FingerprintNotifyT = Option<unsafe extern "C" fn(msg: *const FingerprintMsgT)>;

#[repr(C)]
pub struct FingerprintDeviceT {
    pub common: HwDeviceT,
    pub set_notify: Option<
        unsafe extern "C" fn(dev: *mut FingerprintDeviceT, notify: FingerprintNotifyT) -> c_int,
    >,
    pub pre_enroll: Option<unsafe extern "C" fn(dev: *mut FingerprintDeviceT) -> u64>,
    pub enroll: Option<
        unsafe extern "C" fn(
            dev: *mut FingerprintDeviceT,
            hat: *const HwAuthTokenT,
            gid: u32,
            timeout_sec: u32,
        ) -> c_int,
    >,
    pub post_enroll: Option<unsafe extern "C" fn(dev: *mut FingerprintDeviceT) -> c_int>,
    pub get_authenticator_id: Option<unsafe extern "C" fn(dev: *mut FingerprintDeviceT) -> u64>,
    pub cancel: Option<unsafe extern "C" fn(dev: *mut FingerprintDeviceT) -> c_int>,
    pub enumerate: Option<unsafe extern "C" fn(dev: *mut FingerprintDeviceT) -> c_int>,
    pub remove:
        Option<unsafe extern "C" fn(dev: *mut FingerprintDeviceT, gid: u32, fid: u32) -> c_int>,
    pub set_active_group: Option<
        unsafe extern "C" fn(
            dev: *mut FingerprintDeviceT,
            gid: u32,
            store_path: *const c_char,
        ) -> c_int,
    >,
    pub authenticate: Option<
        unsafe extern "C" fn(dev: *mut FingerprintDeviceT, operation_id: u64, gid: u32) -> c_int,
    >,
    /// Filled in by the module's `set_notify`; never written from here.
    pub notify: FingerprintNotifyT,
    pub reserved: [*mut c_void; 4],
}

#[link(name = "hardware")]
extern "C" {
    fn hw_get_module_by_class(
        class_id: *const c_char,
        inst: *const c_char,
        module: *mut *const HwModuleT,
    ) -> c_int;
}

lazy_static! {
    /// Where the C trampoline forwards decoded messages. The legacy callback
    /// carries no context pointer, so this is process-wide.
    static ref NOTIFY_TARGET: RwLock<Option<NotifyFn>> = RwLock::new(None);
}

unsafe extern "C" fn notify_trampoline(msg: *const FingerprintMsgT) {
    if msg.is_null() {
        warn!("Fingerprint module delivered a null message");
        return;
    }
    let target = *NOTIFY_TARGET.read();
    if let Some(target) = target {
        // SAFETY: the module guarantees `msg` is valid for the duration of the call.
        let decoded = decode_msg(&*msg);
        // Unwinding into the module's C frames is undefined behaviour.
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| target(&decoded)));
        if delivered.is_err() {
            error!("Session panicked handling fingerprint message type {}", decoded.msg_type());
        }
    }
}

fn finger(id: FingerIdT) -> FingerId {
    FingerId { gid: id.gid, fid: id.fid }
}

fn auth_token(hat: HwAuthTokenT) -> HwAuthToken {
    // Copy out of the packed struct field by field; no references into it.
    HwAuthToken {
        version: hat.version,
        challenge: hat.challenge,
        user_id: hat.user_id,
        authenticator_id: hat.authenticator_id,
        authenticator_type: hat.authenticator_type,
        timestamp: hat.timestamp,
        hmac: hat.hmac,
    }
}

fn raw_auth_token(hat: &HwAuthToken) -> HwAuthTokenT {
    HwAuthTokenT {
        version: hat.version,
        challenge: hat.challenge,
        user_id: hat.user_id,
        authenticator_id: hat.authenticator_id,
        authenticator_type: hat.authenticator_type,
        timestamp: hat.timestamp,
        hmac: hat.hmac,
    }
}

/// # Safety
///
/// The union member read must be the one selected by `msg.msg_type`, which
/// is the module's contract for `fingerprint_msg_t`.
unsafe fn decode_msg(msg: &FingerprintMsgT) -> FingerprintMsg {
    match msg.msg_type {
        FingerprintMsg::ERROR => FingerprintMsg::Error { error: msg.data.error },
        FingerprintMsg::ACQUIRED => FingerprintMsg::Acquired { acquired_info: msg.data.acquired },
        FingerprintMsg::TEMPLATE_ENROLLING => FingerprintMsg::TemplateEnrolling {
            finger: finger(msg.data.enroll.finger),
            samples_remaining: msg.data.enroll.samples_remaining,
        },
        FingerprintMsg::TEMPLATE_REMOVED => FingerprintMsg::TemplateRemoved {
            finger: finger(msg.data.removed.finger),
            remaining_templates: msg.data.removed.remaining_templates,
        },
        FingerprintMsg::AUTHENTICATED => FingerprintMsg::Authenticated {
            finger: finger(msg.data.authenticated.finger),
            hat: auth_token(msg.data.authenticated.hat),
        },
        FingerprintMsg::TEMPLATE_ENUMERATING => FingerprintMsg::TemplateEnumerating {
            finger: finger(msg.data.enumerated.finger),
            remaining_templates: msg.data.enumerated.remaining_templates,
        },
        other => FingerprintMsg::Unknown { msg_type: other },
    }
}

/// Resolves modules through `hw_get_module_by_class`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl ModuleLoader for NativeLoader {
    fn get_module_by_class(&self, id: &str, class: Option<&str>) -> Result<Box<dyn HwModule>> {
        let c_id =
            CString::new(id).map_err(|_| BridgeError::module_not_found(id, class, -libc::EINVAL))?;
        let c_class = class
            .map(CString::new)
            .transpose()
            .map_err(|_| BridgeError::module_not_found(id, class, -libc::EINVAL))?;

        let mut raw: *const HwModuleT = ptr::null();
        // SAFETY: both strings outlive the call and `raw` is a valid out pointer.
        let err = unsafe {
            hw_get_module_by_class(
                c_id.as_ptr(),
                c_class.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
                &mut raw,
            )
        };
        if err != 0 {
            return Err(BridgeError::module_not_found(id, class, err));
        }
        if raw.is_null() {
            error!("No valid fingerprint module");
            return Err(BridgeError::module_not_found(id, class, -libc::ENOENT));
        }

        Ok(Box::new(NativeModule { raw, id: id.to_string() }))
    }
}

struct NativeModule {
    raw: *const HwModuleT,
    id: String,
}

// SAFETY: a loaded hw_module_t is immutable static data owned by the dso,
// which libhardware never unloads.
unsafe impl Send for NativeModule {}
unsafe impl Sync for NativeModule {}

impl HwModule for NativeModule {
    fn open(&self) -> Result<Arc<dyn FingerprintDevice>> {
        // SAFETY: `raw` was returned non-null by hw_get_module_by_class.
        let open = unsafe { (*self.raw).methods.as_ref().and_then(|m| m.open) };
        let Some(open) = open else {
            return Err(BridgeError::NoOpenMethod(self.id.clone()));
        };

        let mut device: *mut HwDeviceT = ptr::null_mut();
        // SAFETY: `open` comes from the module's own method table.
        let err = unsafe { open(self.raw, ptr::null(), &mut device) };
        if err != 0 {
            return Err(BridgeError::OpenFailed(err));
        }
        if device.is_null() {
            return Err(BridgeError::OpenFailed(-libc::ENODEV));
        }

        Ok(Arc::new(NativeDevice {
            raw: device.cast::<FingerprintDeviceT>(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// An opened `fingerprint_device_t`. Calls after a successful close report
/// `-ENODEV` instead of touching freed memory.
pub struct NativeDevice {
    raw: *mut FingerprintDeviceT,
    closed: AtomicBool,
}

// SAFETY: legacy fingerprint modules are required to be callable from any
// thread; the pointer itself is only freed by `close`, which is guarded.
unsafe impl Send for NativeDevice {}
unsafe impl Sync for NativeDevice {}

impl NativeDevice {
    fn call<R>(&self, unavailable: R, f: impl FnOnce(*mut FingerprintDeviceT) -> Option<R>) -> R {
        if self.closed.load(Ordering::Acquire) {
            return unavailable;
        }
        f(self.raw).unwrap_or(unavailable)
    }
}

impl FingerprintDevice for NativeDevice {
    fn version(&self) -> u32 {
        // SAFETY: `raw` is valid until closed; version is plain data.
        self.call(0, |dev| Some(unsafe { (*dev).common.version }))
    }

    fn set_notify(&self, notify: NotifyFn) -> i32 {
        *NOTIFY_TARGET.write() = Some(notify);
        // SAFETY: function pointers come from the module's vtable.
        self.call(-libc::ENODEV, |dev| unsafe {
            (*dev).set_notify.map(|f| f(dev, Some(notify_trampoline)))
        })
    }

    fn pre_enroll(&self) -> u64 {
        self.call(0, |dev| unsafe { (*dev).pre_enroll.map(|f| f(dev)) })
    }

    fn enroll(&self, hat: &HwAuthToken, gid: u32, timeout_sec: u32) -> i32 {
        let raw_hat = raw_auth_token(hat);
        self.call(-libc::ENODEV, |dev| unsafe {
            (*dev).enroll.map(|f| f(dev, &raw_hat, gid, timeout_sec))
        })
    }

    fn post_enroll(&self) -> i32 {
        self.call(-libc::ENODEV, |dev| unsafe { (*dev).post_enroll.map(|f| f(dev)) })
    }

    fn get_authenticator_id(&self) -> u64 {
        self.call(0, |dev| unsafe { (*dev).get_authenticator_id.map(|f| f(dev)) })
    }

    fn cancel(&self) -> i32 {
        self.call(-libc::ENODEV, |dev| unsafe { (*dev).cancel.map(|f| f(dev)) })
    }

    fn enumerate(&self) -> i32 {
        self.call(-libc::ENODEV, |dev| unsafe { (*dev).enumerate.map(|f| f(dev)) })
    }

    fn remove(&self, gid: u32, fid: u32) -> i32 {
        self.call(-libc::ENODEV, |dev| unsafe { (*dev).remove.map(|f| f(dev, gid, fid)) })
    }

    fn set_active_group(&self, gid: u32, store_path: &str) -> i32 {
        let Ok(path) = CString::new(store_path) else {
            return -libc::EINVAL;
        };
        self.call(-libc::ENODEV, |dev| unsafe {
            (*dev).set_active_group.map(|f| f(dev, gid, path.as_ptr()))
        })
    }

    fn authenticate(&self, operation_id: u64, gid: u32) -> i32 {
        self.call(-libc::ENODEV, |dev| unsafe {
            (*dev).authenticate.map(|f| f(dev, operation_id, gid))
        })
    }

    fn close(&self) -> i32 {
        if self.closed.load(Ordering::Acquire) {
            return -libc::ENODEV;
        }
        // SAFETY: fingerprint_device_t starts with hw_device_t.
        let err = unsafe {
            let common = self.raw.cast::<HwDeviceT>();
            match (*common).close {
                Some(close) => close(common),
                None => -libc::ENOSYS,
            }
        };
        if err == 0 {
            self.closed.store(true, Ordering::Release);
        }
        err
    }
}
