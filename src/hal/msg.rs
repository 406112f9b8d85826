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

//! Hardware notification payloads
//!
//! A safe rendition of `fingerprint_msg_t`. Error and acquired codes are kept
//! as raw integers (vendor codes start at 1000); decoding them belongs to the
//! session.

/// `fingerprint_finger_id_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FingerId {
    pub gid: u32,
    pub fid: u32,
}

/// `hw_auth_token_t`, fields as delivered by the module (timestamp and
/// authenticator type stay in network byte order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HwAuthToken {
    pub version: u8,
    pub challenge: u64,
    pub user_id: u64,
    pub authenticator_id: u64,
    pub authenticator_type: u32,
    pub timestamp: u64,
    pub hmac: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintMsg {
    Error {
        error: i32,
    },
    Acquired {
        acquired_info: i32,
    },
    TemplateEnrolling {
        finger: FingerId,
        samples_remaining: u32,
    },
    TemplateRemoved {
        finger: FingerId,
        remaining_templates: u32,
    },
    Authenticated {
        finger: FingerId,
        hat: HwAuthToken,
    },
    TemplateEnumerating {
        finger: FingerId,
        remaining_templates: u32,
    },
    /// A message type this build does not know. Only the type is forwarded:
    /// without knowing which union member the module filled in, the payload
    /// cannot be read and is dropped.
    Unknown {
        msg_type: i32,
    },
}

impl FingerprintMsg {
    pub const ERROR: i32 = -1;
    pub const ACQUIRED: i32 = 1;
    pub const TEMPLATE_ENROLLING: i32 = 3;
    pub const TEMPLATE_REMOVED: i32 = 4;
    pub const AUTHENTICATED: i32 = 5;
    pub const TEMPLATE_ENUMERATING: i32 = 6;

    /// The `fingerprint_msg_type_t` value this message was decoded from.
    pub fn msg_type(&self) -> i32 {
        match self {
            Self::Error { .. } => Self::ERROR,
            Self::Acquired { .. } => Self::ACQUIRED,
            Self::TemplateEnrolling { .. } => Self::TEMPLATE_ENROLLING,
            Self::TemplateRemoved { .. } => Self::TEMPLATE_REMOVED,
            Self::Authenticated { .. } => Self::AUTHENTICATED,
            Self::TemplateEnumerating { .. } => Self::TEMPLATE_ENUMERATING,
            Self::Unknown { msg_type } => *msg_type,
        }
    }
}
