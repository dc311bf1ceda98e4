//! Overall application settings, not specific to any one control.
//!
//! Stored in `settings.cfg` under the base directory with the same lenient
//! policy as every other file: a field the file gets wrong falls back to
//! its default rather than taking the system down.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::error::{PersistenceError, Result};

/// The overall settings.  Defaults are a working configuration.
///
/// Serialization is only used to write the bootstrap defaults; loading
/// goes through the lenient field-by-field path so a damaged file never
/// fails wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// IANA time zone name used for report-day boundaries.
    pub time_zone_name: String,
    /// Message bus host and port.
    pub mqtt_host: String,
    pub mqtt_port: u16,
    /// Control loop tick interval.
    pub tick_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_zone_name: String::new(),
            mqtt_host: "localhost".to_string(),
            mqtt_port: 12183,
            tick_interval_ms: 100,
        }
    }
}

impl Settings {
    /// Parse settings from a file.  Missing file: hard error (bootstrap
    /// first).  Malformed content: defaults, logged.
    pub fn parse_from_file(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                error!("Could not find settings file '{}'.", path.display());
                return Err(PersistenceError::NotFound(path.to_path_buf()).into());
            }
            Err(e) => return Err(PersistenceError::Io(e).into()),
        };

        let mut settings = Self::default();
        let filename = path.display();

        let root: Value = match serde_json::from_str(&text) {
            Ok(root) => root,
            Err(_) => {
                error!("JSON error decoding settings file '{filename}'.");
                return Ok(settings);
            }
        };

        if let Some(value) = root.get("timeZoneName") {
            match value.as_str() {
                Some(name) => settings.time_zone_name = name.to_string(),
                None => warn!("Invalid time zone name '{value}' in settings file '{filename}'."),
            }
        }

        if let Some(value) = root.get("mqttHost") {
            match value.as_str() {
                Some(host) if !host.is_empty() => settings.mqtt_host = host.to_string(),
                _ => warn!("Invalid MQTT host '{value}' in settings file '{filename}'."),
            }
        }

        if let Some(value) = root.get("mqttPort") {
            match value.as_i64() {
                Some(port) if (1..=i64::from(u16::MAX)).contains(&port) => {
                    settings.mqtt_port = port as u16;
                }
                _ => warn!("Invalid MQTT port '{value}' in settings file '{filename}'."),
            }
        }

        if let Some(value) = root.get("tickIntervalMs") {
            match value.as_i64() {
                Some(ms) if ms > 0 => settings.tick_interval_ms = ms as u64,
                _ => warn!("Invalid tick interval '{value}' in settings file '{filename}'."),
            }
        }

        Ok(settings)
    }
}

/// Ensure `settings.cfg` exists under the base directory, writing the
/// defaults when missing.  Returns its path.
pub fn bootstrap_settings(base_dir: &Path) -> PathBuf {
    let settings_path = base_dir.join("settings.cfg");
    if settings_path.exists() {
        return settings_path;
    }

    info!(
        "Creating missing settings file '{}'.",
        settings_path.display()
    );
    let text = serde_json::to_string_pretty(&Settings::default()).unwrap_or_default();
    if let Err(e) = fs::write(&settings_path, text) {
        warn!(
            "Failed to create settings file '{}': {e}.",
            settings_path.display()
        );
    }
    settings_path
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
