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

//! Sensor capability reporting
//!
//! Builds the single [`SensorProps`] record the service exposes. Identity is
//! fixed at construction; the on-screen location is read from platform
//! properties on every query because vendors publish it late in boot.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::constants::{props as keys, sensor as consts};
use crate::props::PropertyStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FingerprintSensorType {
    #[default]
    Unknown,
    Rear,
    UnderDisplayUltrasonic,
    UnderDisplayOptical,
    PowerButton,
    HomeButton,
}

impl FingerprintSensorType {
    /// Under-display sensors need the touch/illumination handler.
    pub fn is_under_display(self) -> bool {
        matches!(self, Self::UnderDisplayOptical | Self::UnderDisplayUltrasonic)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Rear => "REAR",
            Self::UnderDisplayUltrasonic => "UNDER_DISPLAY_ULTRASONIC",
            Self::UnderDisplayOptical => "UNDER_DISPLAY_OPTICAL",
            Self::PowerButton => "POWER_BUTTON",
            Self::HomeButton => "HOME_BUTTON",
        }
    }
}

impl fmt::Display for FingerprintSensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorStrength {
    Convenience,
    Weak,
    Strong,
}

/// Version record for one hardware or software component. Fields that do
/// not apply to the component are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub component_id: String,
    pub hardware_version: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub software_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonProps {
    pub sensor_id: i32,
    pub sensor_strength: SensorStrength,
    pub max_enrollments_per_user: i32,
    pub component_info: Vec<ComponentInfo>,
}

/// Sensor centre and radius in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorLocation {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

impl fmt::Display for SensorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensorLocation{{x: {}, y: {}, radius: {}}}", self.x, self.y, self.radius)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchDetectionParameters {
    pub target_size: f32,
    pub min_overlap: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorProps {
    pub common_props: CommonProps,
    pub sensor_type: FingerprintSensorType,
    /// Empty when the location is not configured.
    pub sensor_locations: Vec<SensorLocation>,
    pub supports_navigation_gestures: bool,
    pub supports_detect_interaction: bool,
    pub hal_handles_display_touches: bool,
    pub hal_controls_illumination: bool,
    pub touch_detection_parameters: Option<TouchDetectionParameters>,
}

/// Identity block built from compiled-in constants.
pub fn common_props(max_enrollments_per_user: i32) -> CommonProps {
    CommonProps {
        sensor_id: consts::SENSOR_ID,
        sensor_strength: consts::SENSOR_STRENGTH,
        max_enrollments_per_user,
        component_info: vec![
            ComponentInfo {
                component_id: consts::HW_COMPONENT_ID.to_string(),
                hardware_version: consts::HW_VERSION.to_string(),
                firmware_version: consts::FW_VERSION.to_string(),
                serial_number: consts::SERIAL_NUMBER.to_string(),
                software_version: String::new(),
            },
            ComponentInfo {
                component_id: consts::SW_COMPONENT_ID.to_string(),
                hardware_version: String::new(),
                firmware_version: String::new(),
                serial_number: String::new(),
                software_version: consts::SW_VERSION.to_string(),
            },
        ],
    }
}

/// Read the sensor location; `None` if any coordinate is unset or negative.
pub fn read_sensor_location(props: &dyn PropertyStore) -> Option<SensorLocation> {
    let x = props.get_i32(keys::SENSOR_LOCATION_X, keys::UNSET);
    let y = props.get_i32(keys::SENSOR_LOCATION_Y, keys::UNSET);
    let radius = props.get_i32(keys::SENSOR_RADIUS, keys::UNSET);

    if x >= 0 && y >= 0 && radius >= 0 {
        Some(SensorLocation { x, y, radius })
    } else {
        error!("Failed to get sensor location: {}, {}, {}", x, y, radius);
        None
    }
}

pub struct CapabilityReporter {
    common_props: CommonProps,
    sensor_type: FingerprintSensorType,
    supports_gestures: bool,
    props: Arc<dyn PropertyStore>,
}

impl CapabilityReporter {
    pub fn new(
        sensor_type: FingerprintSensorType,
        max_enrollments_per_user: i32,
        props: Arc<dyn PropertyStore>,
    ) -> Self {
        Self {
            common_props: common_props(max_enrollments_per_user),
            sensor_type,
            supports_gestures: consts::SUPPORTS_NAVIGATION_GESTURES,
            props,
        }
    }

    pub fn sensor_type(&self) -> FingerprintSensorType {
        self.sensor_type
    }

    /// Assemble the property record. Infallible.
    pub fn sensor_props(&self) -> SensorProps {
        let location = read_sensor_location(self.props.as_ref());
        match &location {
            Some(loc) => info!("Sensor type: {}, location: {}", self.sensor_type, loc),
            None => info!("Sensor type: {}, location: unknown", self.sensor_type),
        }

        SensorProps {
            common_props: self.common_props.clone(),
            sensor_type: self.sensor_type,
            sensor_locations: location.into_iter().collect(),
            supports_navigation_gestures: self.supports_gestures,
            supports_detect_interaction: false,
            hal_handles_display_touches: false,
            hal_controls_illumination: false,
            touch_detection_parameters: None,
        }
    }
}
