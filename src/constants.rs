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

//! Constants and compiled-in policy for fpbridge
//!
//! Everything the bridge reports about the sensor that does not come from
//! the hardware module or from platform properties lives here.

/// Hardware module discovery policy
pub mod modules {
    use crate::hal::hardware_module_api_version;
    use crate::locator::CandidateModule;
    use crate::sensor::FingerprintSensorType;

    /// The only device API version accepted. Older modules are rejected
    /// because the session layer relies on 2.1 semantics.
    pub const SUPPORTED_VERSION: u32 = hardware_module_api_version(2, 1);

    /// Modules probed in order; the first one that opens wins.
    pub const CANDIDATES: &[CandidateModule] = &[
        CandidateModule {
            id: "fingerprint.goodix_fod",
            class: None,
            sensor_type: FingerprintSensorType::UnderDisplayOptical,
        },
        CandidateModule {
            id: "fingerprint",
            class: None,
            sensor_type: FingerprintSensorType::UnderDisplayOptical,
        },
    ];
}

/// Static sensor identity
pub mod sensor {
    use crate::sensor::SensorStrength;

    pub const SENSOR_ID: i32 = 0;
    pub const SENSOR_STRENGTH: SensorStrength = SensorStrength::Strong;
    pub const MAX_ENROLLMENTS_PER_USER: i32 = 7;

    /// Set with the `navigation-gestures` cargo feature
    pub const SUPPORTS_NAVIGATION_GESTURES: bool = cfg!(feature = "navigation-gestures");

    pub const HW_COMPONENT_ID: &str = "fingerprintSensor";
    pub const HW_VERSION: &str = "vendor/model/revision";
    pub const FW_VERSION: &str = "1.01";
    pub const SERIAL_NUMBER: &str = "00000001";
    pub const SW_COMPONENT_ID: &str = "matchingAlgorithm";
    pub const SW_VERSION: &str = "vendor/version/revision";
}

/// Platform property keys
pub mod props {
    pub const SENSOR_LOCATION_X: &str = "ro.vendor.feature.fingerprint_sensorui_position_center_x";
    pub const SENSOR_LOCATION_Y: &str = "ro.vendor.feature.fingerprint_sensorui_position_center_y";
    pub const SENSOR_RADIUS: &str = "ro.vendor.feature.fingerprint_sensorui_position_center_r";

    /// Returned for any location key that is unset
    pub const UNSET: i32 = -1;

    /// Longest value `__system_property_get` can return, including the NUL
    pub const PROP_VALUE_MAX: usize = 92;
}

/// Configuration file locations
pub mod paths {
    /// Environment variable overriding the config file path
    pub const CONFIG_ENV: &str = "FPBRIDGE_CONFIG";

    pub const CONFIG_DIR_NAME: &str = "fpbridge";
    pub const CONFIG_FILE: &str = "config.json";

    /// Used when no user or XDG config directory can be determined
    pub const SYSTEM_CONFIG: &str = "/etc/fpbridge/config.json";

    /// Present when systemd-journald is running
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";
}

/// Logging defaults
pub mod logging {
    pub const DEFAULT_LEVEL: &str = "info";
}
