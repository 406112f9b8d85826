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

//! Platform property stores
//!
//! Sensor geometry is published by the vendor as system properties, which
//! may be set after the service starts. Stores therefore never cache: every
//! lookup goes back to the source.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::{debug, warn};

/// Read access to platform properties.
pub trait PropertyStore: Send + Sync {
    /// Raw string value, `None` when unset.
    fn get(&self, key: &str) -> Option<String>;

    /// Integer value parsed the way `property_get_int32` does: leading
    /// whitespace and one sign allowed, `0x` selects hex and a leading `0`
    /// octal. Trailing characters, an empty value or overflow yield
    /// `default`.
    fn get_i32(&self, key: &str, default: i32) -> i32 {
        match self.get(key) {
            Some(raw) => parse_i32(&raw).unwrap_or_else(|| {
                warn!("Property {} has non-integer value '{}'", key, raw);
                default
            }),
            None => default,
        }
    }
}

/// `strtoimax(raw, &end, 0)` narrowed to `i32`, accepted only when the
/// whole string was consumed.
pub fn parse_i32(raw: &str) -> Option<i32> {
    let value = raw.trim_start();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let hex = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"));
    let (radix, digits) = if let Some(hex) = hex {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    // from_str_radix would accept a second sign here.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    let signed = if negative { -magnitude } else { magnitude };
    i32::try_from(signed).ok()
}

/// In-process property map. Used on hosts without a property service and
/// by tests that need to change properties between queries.
#[derive(Debug, Default)]
pub struct MemoryProperties {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn clear(&self, key: &str) {
        self.values.write().remove(key);
    }
}

impl PropertyStore for MemoryProperties {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

/// A `build.prop`-style file: `key=value` per line, `#` starts a comment.
/// Re-read on every lookup.
#[derive(Debug, Clone)]
pub struct PropFile {
    path: PathBuf,
}

impl PropFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

fn lookup_line<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    // Later definitions override earlier ones, as with build.prop imports.
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
        .last()
}

impl PropertyStore for PropFile {
    fn get(&self, key: &str) -> Option<String> {
        match self.read() {
            Ok(content) => lookup_line(&content, key).map(str::to_string),
            Err(e) => {
                debug!("Can't read property file {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

#[cfg(feature = "android")]
pub use self::android::SystemProperties;

#[cfg(feature = "android")]
mod android {
    use std::ffi::{CStr, CString};

    use libc::{c_char, c_int};

    use super::PropertyStore;
    use crate::constants::props::PROP_VALUE_MAX;

    extern "C" {
        fn __system_property_get(name: *const c_char, value: *mut c_char) -> c_int;
    }

    /// Bionic system properties.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemProperties;

    impl PropertyStore for SystemProperties {
        fn get(&self, key: &str) -> Option<String> {
            let name = CString::new(key).ok()?;
            let mut buf = [0 as c_char; PROP_VALUE_MAX];
            // SAFETY: `buf` is PROP_VALUE_MAX bytes as the API requires.
            let len = unsafe { __system_property_get(name.as_ptr(), buf.as_mut_ptr()) };
            if len <= 0 {
                return None;
            }
            // SAFETY: bionic always NUL-terminates within PROP_VALUE_MAX.
            let value = unsafe { CStr::from_ptr(buf.as_ptr()) };
            Some(value.to_string_lossy().into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_i32_accepts_decimal_hex_and_octal() {
        assert_eq!(parse_i32("100"), Some(100));
        assert_eq!(parse_i32("  -1"), Some(-1));
        assert_eq!(parse_i32("+42"), Some(42));
        assert_eq!(parse_i32("0"), Some(0));
        assert_eq!(parse_i32("0x10"), Some(16));
        assert_eq!(parse_i32("-0X10"), Some(-16));
        assert_eq!(parse_i32("010"), Some(8));
        assert_eq!(parse_i32("-010"), Some(-8));
        assert_eq!(parse_i32("-2147483648"), Some(i32::MIN));
    }

    #[test]
    fn test_parse_i32_rejects_unconsumed_input() {
        assert_eq!(parse_i32("10 "), None);
        assert_eq!(parse_i32("08"), None);
        assert_eq!(parse_i32("0x"), None);
        assert_eq!(parse_i32("0xg"), None);
        assert_eq!(parse_i32("   "), None);
    }

    #[test]
    fn test_parse_i32_rejects_garbage_and_overflow() {
        assert_eq!(parse_i32(""), None);
        assert_eq!(parse_i32("abc"), None);
        assert_eq!(parse_i32("12px"), None);
        assert_eq!(parse_i32("--1"), None);
        assert_eq!(parse_i32("0x-1"), None);
        assert_eq!(parse_i32("4294967296"), None);
        assert_eq!(parse_i32("2147483647"), Some(i32::MAX));
    }

    #[test]
    fn test_memory_properties_default_when_unset() {
        let props = MemoryProperties::new();
        assert_eq!(props.get_i32("ro.test", -1), -1);

        props.set("ro.test", "540");
        assert_eq!(props.get_i32("ro.test", -1), 540);

        props.set("ro.test", "wide");
        assert_eq!(props.get_i32("ro.test", -1), -1);

        props.clear("ro.test");
        assert_eq!(props.get("ro.test"), None);
    }

    #[test]
    fn test_prop_file_lookup() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# sensor geometry").unwrap();
        writeln!(file, "ro.vendor.x = 100").unwrap();
        writeln!(file, "ro.vendor.y=200").unwrap();
        writeln!(file, "ro.vendor.y=250").unwrap();
        writeln!(file, "malformed line").unwrap();
        file.flush().unwrap();

        let props = PropFile::new(file.path());
        assert_eq!(props.get_i32("ro.vendor.x", -1), 100);
        assert_eq!(props.get_i32("ro.vendor.y", -1), 250);
        assert_eq!(props.get_i32("ro.vendor.r", -1), -1);
        assert_eq!(props.get("malformed line"), None);
    }

    #[test]
    fn test_prop_file_rereads_on_every_lookup() {
        let file = NamedTempFile::new().unwrap();
        let props = PropFile::new(file.path());
        assert_eq!(props.get_i32("ro.vendor.r", -1), -1);

        fs::write(file.path(), "ro.vendor.r=50\n").unwrap();
        assert_eq!(props.get_i32("ro.vendor.r", -1), 50);
    }

    #[test]
    fn test_prop_file_missing_is_unset() {
        let dir = tempfile::tempdir().unwrap();
        let props = PropFile::new(dir.path().join("absent.prop"));
        assert_eq!(props.get("anything"), None);
        assert_eq!(props.get_i32("anything", 7), 7);
    }
}
