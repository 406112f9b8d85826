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

//! Service entry point
//!
//! [`Fingerprint`] ties the pieces together: it binds the notification
//! router, opens the device, answers property queries and admits at most
//! one open session at a time.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::config::BridgeConfig;
use crate::constants::sensor::SENSOR_ID;
use crate::device::DeviceManager;
use crate::error::{BridgeError, Result};
use crate::hal::ModuleLoader;
use crate::locator::CandidateModule;
use crate::props::PropertyStore;
use crate::router::{self, SessionRouter};
use crate::sensor::{CapabilityReporter, FingerprintSensorType, SensorProps};
use crate::session::{LockoutTracker, Session, SessionBinding, SessionFactory};
use crate::udfps::UdfpsHandlerFactory;

/// External pieces the service is assembled from.
pub struct Collaborators<F, R> {
    pub props: Arc<dyn PropertyStore>,
    pub lockout: Arc<dyn LockoutTracker>,
    pub sessions: F,
    /// Resolves the under-display handler factory; only called for
    /// under-display sensors.
    pub udfps: R,
}

pub struct Fingerprint<F: SessionFactory> {
    router: Arc<SessionRouter>,
    device: DeviceManager,
    capabilities: CapabilityReporter,
    lockout: Arc<dyn LockoutTracker>,
    sessions: F,
    session: Mutex<Option<Arc<F::Session>>>,
}

impl<F: SessionFactory> Fingerprint<F> {
    /// Build the service. Never fails: without a usable module the service
    /// still answers property queries, reporting an unknown sensor type.
    pub fn new<R>(
        config: &BridgeConfig,
        loader: &dyn ModuleLoader,
        candidates: &[CandidateModule],
        collaborators: Collaborators<F, R>,
    ) -> Self
    where
        R: FnOnce() -> Option<Arc<dyn UdfpsHandlerFactory>>,
    {
        let Collaborators { props, lockout, sessions, udfps } = collaborators;

        // Bound before the device is opened so no early event is lost.
        let router = SessionRouter::new();
        router::bind(&router);

        let device = DeviceManager::open(loader, candidates, router::notify, udfps);
        match device.module_id() {
            Some(id) => info!("Using fingerprint module {} ({})", id, device.sensor_type()),
            None => error!("No fingerprint module available"),
        }

        let capabilities =
            CapabilityReporter::new(device.sensor_type(), config.max_enrollments_per_user, props);

        Self {
            router,
            device,
            capabilities,
            lockout,
            sessions,
            session: Mutex::new(None),
        }
    }

    /// Always exactly one record.
    pub fn get_sensor_props(&self) -> Vec<SensorProps> {
        vec![self.capabilities.sensor_props()]
    }

    pub fn sensor_type(&self) -> FingerprintSensorType {
        self.device.sensor_type()
    }

    pub fn has_device(&self) -> bool {
        self.device.has_device()
    }

    pub fn has_open_session(&self) -> bool {
        self.session.lock().as_ref().is_some_and(|s| !s.is_closed())
    }

    /// Open a session, failing with `SessionBusy` while another one is open.
    pub fn try_create_session(
        &self,
        sensor_id: i32,
        user_id: i32,
        callback: Arc<F::Callback>,
    ) -> Result<Arc<F::Session>> {
        if sensor_id != SENSOR_ID {
            warn!("Unexpected sensor id {}, only {} is supported", sensor_id, SENSOR_ID);
        }

        let session = {
            let mut slot = self.session.lock();
            if slot.as_ref().is_some_and(|s| !s.is_closed()) {
                return Err(BridgeError::SessionBusy);
            }
            let device = self.device.device().ok_or(BridgeError::NoDevice)?;

            let binding = SessionBinding {
                device,
                udfps: self.device.udfps_handler(),
                user_id,
                lockout: Arc::clone(&self.lockout),
            };
            let session = self.sessions.create_session(binding, Arc::clone(&callback));
            self.router.set_active(&session);
            *slot = Some(Arc::clone(&session));
            session
        };

        if let Err(e) = Arc::clone(&session).link_to_death(callback.as_ref()) {
            error!("Can't link to death: {}", e);
        }
        info!("Created session for user {}", user_id);
        Ok(session)
    }

    /// Open a session.
    ///
    /// # Panics
    ///
    /// If a session is still open. Callers must close the previous session
    /// first; use [`Fingerprint::try_create_session`] to check instead.
    pub fn create_session(
        &self,
        sensor_id: i32,
        user_id: i32,
        callback: Arc<F::Callback>,
    ) -> Result<Arc<F::Session>> {
        match self.try_create_session(sensor_id, user_id, callback) {
            Err(BridgeError::SessionBusy) => panic!("Open session already exists!"),
            other => other,
        }
    }

    /// Tear down the touch handler and close the device. Open sessions stop
    /// receiving events.
    pub fn shutdown(&self) {
        self.device.shutdown();
    }
}

impl<F: SessionFactory> Drop for Fingerprint<F> {
    fn drop(&mut self) {
        router::unbind(&self.router);
    }
}
