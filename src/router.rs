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

//! Hardware notification routing
//!
//! The legacy module calls a single context-free function for every event.
//! [`notify`] is that function: it finds the most recently bound
//! [`SessionRouter`] through a process-wide slot and hands the message to
//! the active session, if there is one and it is still open.
//!
//! Only one service instance is expected per process. Binding a second
//! router replaces the first, after which the first one's sessions no
//! longer receive hardware events.

use std::sync::{Arc, Weak};

use lazy_static::lazy_static;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::hal::FingerprintMsg;
use crate::session::Session;

lazy_static! {
    static ref INSTANCE: RwLock<Weak<SessionRouter>> = RwLock::new(Weak::new());
}

/// Observes the active session on behalf of the service. The session is
/// owned by whoever admitted it; the router only holds a weak reference.
#[derive(Default)]
pub struct SessionRouter {
    active: RwLock<Option<Weak<dyn Session>>>,
}

impl SessionRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the active session.
    pub fn set_active<S: Session + 'static>(&self, session: &Arc<S>) {
        let weak: Weak<S> = Arc::downgrade(session);
        *self.active.write() = Some(weak as Weak<dyn Session>);
    }

    /// The active session, if it is still alive.
    pub fn active(&self) -> Option<Arc<dyn Session>> {
        self.active.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn has_open_session(&self) -> bool {
        self.active().is_some_and(|s| !s.is_closed())
    }

    /// Forward `msg` to the active session. Returns whether it was delivered.
    pub fn deliver(&self, msg: &FingerprintMsg) -> bool {
        // Upgrade out so no lock is held while the session runs.
        let Some(session) = self.active() else {
            debug!("Receiving callbacks before a session is opened (msg type {})", msg.msg_type());
            return false;
        };
        if session.is_closed() {
            debug!("Dropping callback for closed session (msg type {})", msg.msg_type());
            return false;
        }
        session.notify(msg);
        true
    }
}

/// Make `router` the target of hardware notifications. The most recent
/// binding wins.
pub fn bind(router: &Arc<SessionRouter>) {
    let mut slot = INSTANCE.write();
    if slot.upgrade().is_some_and(|current| !Arc::ptr_eq(&current, router)) {
        warn!("Replacing bound fingerprint instance; previous sessions lose hardware events");
    }
    *slot = Arc::downgrade(router);
}

/// Clear the binding, but only if `router` is still the bound instance.
pub fn unbind(router: &Arc<SessionRouter>) {
    let mut slot = INSTANCE.write();
    if slot.upgrade().is_some_and(|current| Arc::ptr_eq(&current, router)) {
        *slot = Weak::new();
    }
}

pub fn bound() -> Option<Arc<SessionRouter>> {
    INSTANCE.read().upgrade()
}

/// Entry point registered with the hardware module.
pub fn notify(msg: &FingerprintMsg) {
    match bound() {
        Some(router) => {
            router.deliver(msg);
        }
        None => debug!("Receiving callbacks before a session is opened (no instance)"),
    }
}
