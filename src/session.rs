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

//! Session collaborator contracts
//!
//! The enroll/authenticate state machine, its callback fan-out and the
//! lockout policy live outside this crate. These traits are the surface the
//! bridge needs from them.

use std::sync::Arc;

use crate::error::Result;
use crate::hal::{FingerprintDevice, FingerprintMsg};
use crate::udfps::UdfpsHandler;

/// Invoked once when the remote peer dies.
pub type DeathRecipient = Box<dyn FnOnce() + Send + 'static>;

/// The caller's end of a session. Only its liveness matters here.
pub trait RemotePeer: Send + Sync {
    /// Register `recipient` to run when the peer's process dies. Fails with
    /// `BridgeError::DeadPeer` if it is already gone.
    fn link_to_death(&self, recipient: DeathRecipient) -> Result<()>;
}

/// One open enroll/authenticate interaction.
pub trait Session: Send + Sync {
    fn is_closed(&self) -> bool;

    /// Handle one hardware notification. Called from the module's
    /// notification context.
    fn notify(&self, msg: &FingerprintMsg);

    /// Tie this session's lifetime to `peer`, so a dead client closes it.
    fn link_to_death(self: Arc<Self>, peer: &dyn RemotePeer) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutMode {
    None,
    Timed,
    Permanent,
}

/// Failed-attempt accounting shared by every session of the service.
pub trait LockoutTracker: Send + Sync {
    fn reset(&self, clear_attempt_counter: bool);

    fn mode(&self) -> LockoutMode;

    /// Remaining timed lockout in milliseconds, 0 when not locked out.
    fn lockout_time_left_ms(&self) -> i64;

    fn add_failed_attempt(&self);
}

/// Everything a new session is bound to.
#[derive(Clone)]
pub struct SessionBinding {
    pub device: Arc<dyn FingerprintDevice>,
    pub udfps: Option<Arc<dyn UdfpsHandler>>,
    pub user_id: i32,
    pub lockout: Arc<dyn LockoutTracker>,
}

/// Builds sessions for the service.
pub trait SessionFactory: Send + Sync {
    /// Client callback interface handed to each session.
    type Callback: RemotePeer + 'static;
    type Session: Session + 'static;

    fn create_session(
        &self,
        binding: SessionBinding,
        callback: Arc<Self::Callback>,
    ) -> Arc<Self::Session>;
}
