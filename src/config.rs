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

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{logging, paths, sensor};
use crate::error::{BridgeError, Result};
use crate::props::{PropFile, PropertyStore};

/// Upper bound accepted for `max_enrollments_per_user`
pub const MAX_ENROLLMENTS_LIMIT: i32 = 20;

fn default_log_level() -> String {
    logging::DEFAULT_LEVEL.to_string()
}

fn default_max_enrollments() -> i32 {
    sensor::MAX_ENROLLMENTS_PER_USER
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// `tracing` filter directive, e.g. "info" or "fpbridge=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_max_enrollments")]
    pub max_enrollments_per_user: i32,
    /// build.prop-style file consulted for the sensor location. Without it
    /// the platform property service is used when available.
    #[serde(default)]
    pub properties_path: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_enrollments_per_user: default_max_enrollments(),
            properties_path: None,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            return Err(BridgeError::invalid_config("log_level", "must not be empty"));
        }
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.log_level) {
            return Err(BridgeError::invalid_config("log_level", e.to_string()));
        }
        if !(1..=MAX_ENROLLMENTS_LIMIT).contains(&self.max_enrollments_per_user) {
            return Err(BridgeError::invalid_config(
                "max_enrollments_per_user",
                format!(
                    "must be 1..={}, got {}",
                    MAX_ENROLLMENTS_LIMIT, self.max_enrollments_per_user
                ),
            ));
        }
        if let Some(path) = &self.properties_path {
            if path.as_os_str().is_empty() {
                return Err(BridgeError::invalid_config("properties_path", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Property store backing the sensor location queries.
    pub fn property_store(&self) -> Arc<dyn PropertyStore> {
        if let Some(path) = &self.properties_path {
            return Arc::new(PropFile::new(path.clone()));
        }
        system_property_store()
    }
}

#[cfg(feature = "android")]
fn system_property_store() -> Arc<dyn PropertyStore> {
    Arc::new(crate::props::SystemProperties)
}

#[cfg(not(feature = "android"))]
fn system_property_store() -> Arc<dyn PropertyStore> {
    debug!("No property service on this platform; sensor location will be unknown");
    Arc::new(crate::props::MemoryProperties::new())
}

/// Config file location, first match wins:
/// `$FPBRIDGE_CONFIG`, `$XDG_CONFIG_HOME/fpbridge/config.json`,
/// the platform config dir, then `/etc/fpbridge/config.json`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var(paths::CONFIG_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    let base = match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => Some(PathBuf::from(xdg)),
        _ => dirs::config_dir(),
    };
    match base {
        Some(base) => base.join(paths::CONFIG_DIR_NAME).join(paths::CONFIG_FILE),
        None => PathBuf::from(paths::SYSTEM_CONFIG),
    }
}

pub fn load_config() -> Result<BridgeConfig> {
    load_config_from(&config_path())
}

/// A missing file yields defaults; an unreadable, malformed or invalid one
/// is an error.
pub fn load_config_from(path: &Path) -> Result<BridgeConfig> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No config at {}, using defaults", path.display());
            return Ok(BridgeConfig::default());
        }
        Err(source) => {
            return Err(BridgeError::FileRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let config: BridgeConfig = serde_json::from_str(&data)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.max_enrollments_per_user, 7);
        assert!(config.properties_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = write_config(r#"{ "max_enrollments_per_user": 5 }"#);
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.max_enrollments_per_user, 5);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let file = write_config(r#"{ "max_enrolments": 5 }"#);
        assert!(matches!(load_config_from(file.path()), Err(BridgeError::JsonParse(_))));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let file = write_config("{ not json");
        assert!(load_config_from(file.path()).is_err());
    }

    #[test]
    fn test_enrollment_limit_validated() {
        for bad in [0, -1, MAX_ENROLLMENTS_LIMIT + 1] {
            let config = BridgeConfig {
                max_enrollments_per_user: bad,
                ..BridgeConfig::default()
            };
            match config.validate() {
                Err(BridgeError::InvalidConfig { field, .. }) => {
                    assert_eq!(field, "max_enrollments_per_user")
                }
                other => panic!("expected InvalidConfig, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_empty_log_level_rejected() {
        let file = write_config(r#"{ "log_level": "  " }"#);
        assert!(matches!(
            load_config_from(file.path()),
            Err(BridgeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_directory_is_read_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_config_from(dir.path()),
            Err(BridgeError::FileRead { .. })
        ));
    }

    #[test]
    fn test_property_store_from_file() {
        let mut props = NamedTempFile::new().unwrap();
        writeln!(props, "ro.vendor.feature.fingerprint_sensorui_position_center_x=540").unwrap();
        let config = BridgeConfig {
            properties_path: Some(props.path().to_path_buf()),
            ..BridgeConfig::default()
        };
        let store = config.property_store();
        assert_eq!(
            store.get_i32("ro.vendor.feature.fingerprint_sensorui_position_center_x", -1),
            540
        );
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        env::set_var(paths::CONFIG_ENV, "/tmp/custom/fpbridge.json");
        assert_eq!(config_path(), PathBuf::from("/tmp/custom/fpbridge.json"));
        env::remove_var(paths::CONFIG_ENV);
    }

    #[test]
    #[serial]
    fn test_config_path_with_xdg() {
        env::remove_var(paths::CONFIG_ENV);
        let previous = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", "/custom/config");
        assert_eq!(config_path(), PathBuf::from("/custom/config/fpbridge/config.json"));
        match previous {
            Some(value) => env::set_var("XDG_CONFIG_HOME", value),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
    }
}
