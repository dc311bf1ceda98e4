//! Control configuration files.
//!
//! One JSON file per control (extension `.ctl`) in `controls/` under the
//! application base directory: `name`, `upGpioLine`, `downGpioLine`,
//! `movingDurationMs`, `coolDownDurationMs`.  The same lenient policy as
//! routine files applies — missing keys keep defaults, mistyped or
//! out-of-range values are logged and skipped — and
//! [`Control::initialize`](crate::control::Control::initialize) re-checks
//! everything anyway before touching hardware.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde_json::Value;

use crate::error::{PersistenceError, Result};

/// File extension for control configuration files.
pub const CONTROL_FILE_EXTENSION: &str = "ctl";

/// Specifies the configuration of a control.  Defaults are invalid on
/// purpose: a field the file does not supply must not validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlConfig {
    pub name: String,
    pub up_line: i32,
    pub down_line: i32,
    pub moving_duration_ms: i64,
    pub cool_down_duration_ms: i64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            up_line: -1,
            down_line: -1,
            moving_duration_ms: 0,
            cool_down_duration_ms: -1,
        }
    }
}

impl ControlConfig {
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && self.up_line >= 0
            && self.down_line >= 0
            && self.up_line != self.down_line
            && self.moving_duration_ms > 0
            && self.cool_down_duration_ms >= 0
    }

    /// Parse a configuration from a file.  Missing file: hard error.
    /// Malformed content: default (invalid) configuration, logged.
    pub fn parse_from_file(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                error!(
                    "Could not find control configuration file '{}'.",
                    path.display()
                );
                return Err(PersistenceError::NotFound(path.to_path_buf()).into());
            }
            Err(e) => return Err(PersistenceError::Io(e).into()),
        };

        let mut config = Self::default();
        let filename = path.display();

        let root: Value = match serde_json::from_str(&text) {
            Ok(root) => root,
            Err(_) => {
                error!("JSON error decoding control configuration file '{filename}'.");
                return Ok(config);
            }
        };

        match root.get("name") {
            None => warn!("Missing 'name' key in control configuration file '{filename}'."),
            Some(value) => match value.as_str() {
                Some("") => warn!("Empty name in control configuration file '{filename}'."),
                Some(name) => config.name = name.to_string(),
                None => {
                    warn!("Invalid name '{value}' in control configuration file '{filename}'.");
                }
            },
        }

        config.up_line = read_line_field(&root, "upGpioLine", config.up_line, &filename);
        config.down_line = read_line_field(&root, "downGpioLine", config.down_line, &filename);

        if let Some(value) = root.get("movingDurationMs") {
            match value.as_i64() {
                Some(ms) if ms > 0 => config.moving_duration_ms = ms,
                _ => warn!(
                    "Invalid moving duration '{value}' in control configuration file \
                     '{filename}'."
                ),
            }
        }

        if let Some(value) = root.get("coolDownDurationMs") {
            match value.as_i64() {
                Some(ms) if ms >= 0 => config.cool_down_duration_ms = ms,
                _ => warn!(
                    "Invalid cool down duration '{value}' in control configuration file \
                     '{filename}'."
                ),
            }
        }

        Ok(config)
    }
}

fn read_line_field(
    root: &Value,
    key: &str,
    default: i32,
    filename: &std::path::Display<'_>,
) -> i32 {
    let Some(value) = root.get(key) else {
        warn!("Missing '{key}' key in control configuration file '{filename}'.");
        return default;
    };
    match value.as_i64() {
        Some(line) if (0..=i64::from(i32::MAX)).contains(&line) => line as i32,
        _ => {
            warn!("Invalid '{key}' value '{value}' in control configuration file '{filename}'.");
            default
        }
    }
}

/// Ensure the controls directory exists under the base directory, creating
/// it when missing.  Returns its path.
pub fn bootstrap_controls(base_dir: &Path) -> PathBuf {
    let controls_path = base_dir.join("controls");
    if !controls_path.exists() {
        info!(
            "Creating missing controls directory '{}'.",
            controls_path.display()
        );
        if let Err(e) = fs::create_dir_all(&controls_path) {
            warn!(
                "Failed to create controls directory '{}': {e}.",
                controls_path.display()
            );
        }
    }
    controls_path
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
