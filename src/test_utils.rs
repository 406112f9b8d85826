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

//! In-process fakes for the hardware module, sessions, client callbacks and
//! the under-display handler, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{BridgeError, Result};
use crate::hal::{
    FingerprintDevice, FingerprintMsg, HwAuthToken, HwModule, ModuleLoader, NotifyFn,
};
use crate::session::{
    DeathRecipient, LockoutMode, LockoutTracker, RemotePeer, Session, SessionBinding,
    SessionFactory,
};
use crate::udfps::{UdfpsHandler, UdfpsHandlerFactory};

pub fn noop_notify(_msg: &FingerprintMsg) {}

/// Ordered record of side effects across fakes, e.g. "fingerprint:close".
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBehavior {
    Opens,
    NoOpenMethod,
    Fails(i32),
}

/// How a fake module and its device behave.
#[derive(Debug, Clone, Copy)]
pub struct DeviceBehavior {
    open: OpenBehavior,
    version: u32,
    notify_status: i32,
    close_status: i32,
}

impl DeviceBehavior {
    /// Opens at the supported version and accepts everything.
    pub fn ok() -> Self {
        Self {
            open: OpenBehavior::Opens,
            version: crate::constants::modules::SUPPORTED_VERSION,
            notify_status: 0,
            close_status: 0,
        }
    }

    pub fn no_open_method() -> Self {
        Self { open: OpenBehavior::NoOpenMethod, ..Self::ok() }
    }

    pub fn open_fails(code: i32) -> Self {
        Self { open: OpenBehavior::Fails(code), ..Self::ok() }
    }

    pub fn version(self, version: u32) -> Self {
        Self { version, ..self }
    }

    pub fn notify_status(self, notify_status: i32) -> Self {
        Self { notify_status, ..self }
    }

    pub fn close_status(self, close_status: i32) -> Self {
        Self { close_status, ..self }
    }
}

pub struct FakeDevice {
    id: String,
    behavior: DeviceBehavior,
    log: EventLog,
    notify: Mutex<Option<NotifyFn>>,
    close_calls: AtomicUsize,
}

impl FakeDevice {
    /// Simulate the module raising a notification. Returns false if no
    /// callback was registered.
    pub fn fire(&self, msg: &FingerprintMsg) -> bool {
        let notify = *self.notify.lock();
        match notify {
            Some(notify) => {
                notify(msg);
                true
            }
            None => false,
        }
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl FingerprintDevice for FakeDevice {
    fn version(&self) -> u32 {
        self.behavior.version
    }

    fn set_notify(&self, notify: NotifyFn) -> i32 {
        self.log.push(format!("{}:set_notify", self.id));
        if self.behavior.notify_status == 0 {
            *self.notify.lock() = Some(notify);
        }
        self.behavior.notify_status
    }

    fn pre_enroll(&self) -> u64 {
        0
    }

    fn enroll(&self, _hat: &HwAuthToken, _gid: u32, _timeout_sec: u32) -> i32 {
        0
    }

    fn post_enroll(&self) -> i32 {
        0
    }

    fn get_authenticator_id(&self) -> u64 {
        0
    }

    fn cancel(&self) -> i32 {
        0
    }

    fn enumerate(&self) -> i32 {
        0
    }

    fn remove(&self, _gid: u32, _fid: u32) -> i32 {
        0
    }

    fn set_active_group(&self, _gid: u32, _store_path: &str) -> i32 {
        0
    }

    fn authenticate(&self, _operation_id: u64, _gid: u32) -> i32 {
        0
    }

    fn close(&self) -> i32 {
        self.log.push(format!("{}:close", self.id));
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.close_status
    }
}

struct FakeModule {
    id: String,
    behavior: DeviceBehavior,
    log: EventLog,
    opened: Arc<Mutex<HashMap<String, Arc<FakeDevice>>>>,
}

impl HwModule for FakeModule {
    fn open(&self) -> Result<Arc<dyn FingerprintDevice>> {
        match self.behavior.open {
            OpenBehavior::NoOpenMethod => Err(BridgeError::NoOpenMethod(self.id.clone())),
            OpenBehavior::Fails(code) => Err(BridgeError::OpenFailed(code)),
            OpenBehavior::Opens => {
                self.log.push(format!("{}:open", self.id));
                let device = Arc::new(FakeDevice {
                    id: self.id.clone(),
                    behavior: self.behavior,
                    log: self.log.clone(),
                    notify: Mutex::new(None),
                    close_calls: AtomicUsize::new(0),
                });
                self.opened.lock().insert(self.id.clone(), Arc::clone(&device));
                Ok(device)
            }
        }
    }
}

/// Resolves only the modules registered with `with_module`.
pub struct FakeLoader {
    log: EventLog,
    modules: HashMap<String, DeviceBehavior>,
    attempts: Mutex<Vec<(String, Option<String>)>>,
    opened: Arc<Mutex<HashMap<String, Arc<FakeDevice>>>>,
}

impl FakeLoader {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            modules: HashMap::new(),
            attempts: Mutex::new(Vec::new()),
            opened: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_module(mut self, id: &str, behavior: DeviceBehavior) -> Self {
        self.modules.insert(id.to_string(), behavior);
        self
    }

    /// Module ids looked up, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn classes(&self) -> Vec<Option<String>> {
        self.attempts.lock().iter().map(|(_, class)| class.clone()).collect()
    }

    /// Most recently opened device for `id`.
    pub fn device(&self, id: &str) -> Option<Arc<FakeDevice>> {
        self.opened.lock().get(id).cloned()
    }
}

impl ModuleLoader for FakeLoader {
    fn get_module_by_class(&self, id: &str, class: Option<&str>) -> Result<Box<dyn HwModule>> {
        self.attempts.lock().push((id.to_string(), class.map(str::to_string)));
        let behavior = self
            .modules
            .get(id)
            .copied()
            .ok_or_else(|| BridgeError::module_not_found(id, class, -2))?;
        Ok(Box::new(FakeModule {
            id: id.to_string(),
            behavior,
            log: self.log.clone(),
            opened: Arc::clone(&self.opened),
        }))
    }
}

/// Records every message it is notified with.
pub struct FakeSession {
    user_id: i32,
    closed: AtomicBool,
    linked: AtomicBool,
    received: Mutex<Vec<FingerprintMsg>>,
    binding: Option<SessionBinding>,
}

impl FakeSession {
    pub fn new(user_id: i32) -> Arc<Self> {
        Arc::new(Self::build(user_id, None))
    }

    pub fn with_binding(binding: SessionBinding) -> Arc<Self> {
        Arc::new(Self::build(binding.user_id, Some(binding)))
    }

    fn build(user_id: i32, binding: Option<SessionBinding>) -> Self {
        Self {
            user_id,
            closed: AtomicBool::new(false),
            linked: AtomicBool::new(false),
            received: Mutex::new(Vec::new()),
            binding,
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<FingerprintMsg> {
        self.received.lock().clone()
    }

    pub fn user_id(&self) -> i32 {
        self.user_id
    }

    pub fn is_linked(&self) -> bool {
        self.linked.load(Ordering::SeqCst)
    }

    pub fn binding(&self) -> Option<&SessionBinding> {
        self.binding.as_ref()
    }
}

impl Session for FakeSession {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn notify(&self, msg: &FingerprintMsg) {
        self.received.lock().push(msg.clone());
    }

    fn link_to_death(self: Arc<Self>, peer: &dyn RemotePeer) -> Result<()> {
        let weak = Arc::downgrade(&self);
        peer.link_to_death(Box::new(move || {
            if let Some(session) = weak.upgrade() {
                session.close();
            }
        }))?;
        self.linked.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Client callback whose process can be "killed".
#[derive(Default)]
pub struct FakeCallback {
    dead: AtomicBool,
    recipients: Mutex<Vec<DeathRecipient>>,
}

impl FakeCallback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A callback whose peer died before it was handed over.
    pub fn already_dead() -> Arc<Self> {
        let cb = Self::default();
        cb.dead.store(true, Ordering::SeqCst);
        Arc::new(cb)
    }

    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
        let recipients: Vec<_> = self.recipients.lock().drain(..).collect();
        for recipient in recipients {
            recipient();
        }
    }
}

impl RemotePeer for FakeCallback {
    fn link_to_death(&self, recipient: DeathRecipient) -> Result<()> {
        if self.dead.load(Ordering::SeqCst) {
            return Err(BridgeError::DeadPeer);
        }
        self.recipients.lock().push(recipient);
        Ok(())
    }
}

pub struct FakeSessionFactory;

impl SessionFactory for FakeSessionFactory {
    type Callback = FakeCallback;
    type Session = FakeSession;

    fn create_session(
        &self,
        binding: SessionBinding,
        _callback: Arc<FakeCallback>,
    ) -> Arc<FakeSession> {
        FakeSession::with_binding(binding)
    }
}

#[derive(Debug, Default)]
pub struct FakeLockout {
    failed: AtomicU32,
}

impl LockoutTracker for FakeLockout {
    fn reset(&self, _clear_attempt_counter: bool) {
        self.failed.store(0, Ordering::SeqCst);
    }

    fn mode(&self) -> LockoutMode {
        if self.failed.load(Ordering::SeqCst) >= 5 {
            LockoutMode::Timed
        } else {
            LockoutMode::None
        }
    }

    fn lockout_time_left_ms(&self) -> i64 {
        0
    }

    fn add_failed_attempt(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeUdfpsHandler {
    log: EventLog,
    device: Mutex<Option<Arc<dyn FingerprintDevice>>>,
}

impl FakeUdfpsHandler {
    pub fn bound_to_device(&self) -> bool {
        self.device.lock().is_some()
    }
}

impl UdfpsHandler for FakeUdfpsHandler {
    fn init(&self, device: Arc<dyn FingerprintDevice>) {
        self.log.push("udfps:init");
        *self.device.lock() = Some(device);
    }

    fn on_finger_down(&self, _x: u32, _y: u32, _minor: f32, _major: f32) {}

    fn on_finger_up(&self) {}

    fn on_acquired(&self, _result: i32, _vendor_code: i32) {}

    fn cancel(&self) {}
}

pub struct FakeUdfpsFactory {
    log: EventLog,
    handler: Mutex<Option<Arc<FakeUdfpsHandler>>>,
}

impl FakeUdfpsFactory {
    pub fn new(log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            log: log.clone(),
            handler: Mutex::new(None),
        })
    }

    pub fn handler(&self) -> Option<Arc<FakeUdfpsHandler>> {
        self.handler.lock().clone()
    }
}

impl UdfpsHandlerFactory for FakeUdfpsFactory {
    fn create(&self) -> Option<Arc<dyn UdfpsHandler>> {
        self.log.push("udfps:create");
        let handler = Arc::new(FakeUdfpsHandler {
            log: self.log.clone(),
            device: Mutex::new(None),
        });
        *self.handler.lock() = Some(Arc::clone(&handler));
        Some(handler)
    }

    fn destroy(&self, _handler: Arc<dyn UdfpsHandler>) {
        self.log.push("udfps:destroy");
        // Drop the handler's device reference like a real destroy would.
        if let Some(handler) = self.handler.lock().as_ref() {
            handler.device.lock().take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_callback_runs_recipients_once() {
        let cb = FakeCallback::new();
        let session = FakeSession::new(3);
        Arc::clone(&session).link_to_death(cb.as_ref()).unwrap();
        assert!(session.is_linked());

        cb.kill();
        cb.kill();
        assert!(session.is_closed());
        assert!(matches!(
            FakeSession::new(3).link_to_death(cb.as_ref()),
            Err(BridgeError::DeadPeer)
        ));
    }

    #[test]
    fn test_fake_device_without_notify_does_not_fire() {
        let log = EventLog::default();
        let loader = FakeLoader::new(&log).with_module("fp", DeviceBehavior::ok());
        let device = loader.get_module_by_class("fp", None).unwrap().open().unwrap();
        assert_eq!(device.version(), 0x0201);

        let fake = loader.device("fp").unwrap();
        assert!(!fake.fire(&FingerprintMsg::Acquired { acquired_info: 0 }));
        assert_eq!(device.set_notify(noop_notify), 0);
        assert!(fake.fire(&FingerprintMsg::Acquired { acquired_info: 0 }));
    }
}
