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

//! Under-display sensor touch/illumination handler contract
//!
//! Vendors ship a handler that reacts to finger-down/up on the display and
//! drives the illumination layer. Only optical and ultrasonic sensors use it.

use std::sync::Arc;

use crate::hal::FingerprintDevice;

#[cfg_attr(test, mockall::automock)]
pub trait UdfpsHandler: Send + Sync {
    /// Bind the handler to the opened device; called once after creation.
    fn init(&self, device: Arc<dyn FingerprintDevice>);

    fn on_finger_down(&self, x: u32, y: u32, minor: f32, major: f32);

    fn on_finger_up(&self);

    fn on_acquired(&self, result: i32, vendor_code: i32);

    fn cancel(&self);
}

/// Creates and destroys handlers; a handler must be destroyed through the
/// factory that created it.
#[cfg_attr(test, mockall::automock)]
pub trait UdfpsHandlerFactory: Send + Sync {
    fn create(&self) -> Option<Arc<dyn UdfpsHandler>>;

    fn destroy(&self, handler: Arc<dyn UdfpsHandler>);
}
