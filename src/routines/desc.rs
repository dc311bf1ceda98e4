//! Routine descriptions and their on-disk form.
//!
//! One JSON file per routine (extension `.rtn`) with fields `name`,
//! `isLooping` and `steps[{delayMs, controlName, direction}]`.  Parsing is
//! deliberately lenient: a missing file is a hard error, but malformed
//! content degrades — unknown fields are ignored, wrong-typed values are
//! logged and their defaults retained, and an individually corrupt step is
//! dropped without losing the rest of the file.  Users edit these by hand;
//! one typo must not take the whole routine set down.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde_json::{Value, json};

use crate::app::commands::MoveDirection;
use crate::error::{PersistenceError, Result};

/// File extension for routine description files.
pub const ROUTINE_FILE_EXTENSION: &str = "rtn";

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One step of a routine: after `delay_ms` (measured from the previous
/// step's firing, or from routine start for the first step) move
/// `control_name` in `direction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Delay relative to the previous step, in milliseconds.  Negative
    /// means "not set" (invalid).
    pub delay_ms: i64,
    pub control_name: String,
    /// `None` means "not set" (invalid) — a step can only ever command
    /// motion, never idle or cool-down.
    pub direction: Option<MoveDirection>,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            delay_ms: -1,
            control_name: String::new(),
            direction: None,
        }
    }
}

impl Step {
    pub fn new(delay_ms: i64, control_name: &str, direction: MoveDirection) -> Self {
        Self {
            delay_ms,
            control_name: control_name.to_string(),
            direction: Some(direction),
        }
    }

    /// A step is valid only when all three fields are set and in range.
    pub fn is_valid(&self) -> bool {
        self.delay_ms >= 0 && !self.control_name.is_empty() && self.direction.is_some()
    }

    /// Lenient per-field load; fields that are missing or mistyped keep
    /// their (invalid) defaults.
    fn from_json(step_json: &Value, path: &Path) -> Self {
        let mut step = Self::default();
        let filename = path.display();

        match step_json.get("delayMs") {
            None => warn!("Missing 'delayMs' key in step in routine description file '{filename}'."),
            Some(value) => match value.as_i64() {
                Some(delay_ms) if delay_ms >= 0 => step.delay_ms = delay_ms,
                Some(delay_ms) => warn!(
                    "Invalid delay '{delay_ms}' in step in routine description file '{filename}'."
                ),
                None => warn!(
                    "Delay '{value}' in step must be an integer in routine description file \
                     '{filename}'."
                ),
            },
        }

        match step_json.get("controlName") {
            None => {
                warn!("Missing 'controlName' key in step in routine description file '{filename}'.");
            }
            Some(value) => match value.as_str() {
                Some("") => warn!(
                    "Empty control name in step in routine description file '{filename}'."
                ),
                Some(name) => step.control_name = name.to_string(),
                None => warn!(
                    "Control name '{value}' in step must be a string in routine description \
                     file '{filename}'."
                ),
            },
        }

        match step_json.get("direction") {
            None => {
                warn!("Missing 'direction' key in step in routine description file '{filename}'.");
            }
            Some(value) => match value.as_str().and_then(MoveDirection::from_wire) {
                Some(direction) => step.direction = Some(direction),
                None => warn!(
                    "Invalid direction '{value}' in step in routine description file \
                     '{filename}'."
                ),
            },
        }

        step
    }

    fn to_json(&self) -> Value {
        json!({
            "delayMs": self.delay_ms,
            "controlName": self.control_name,
            "direction": self.direction.map(|d| d.to_string()).unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// RoutineDesc
// ---------------------------------------------------------------------------

/// Describes a routine: a named, optionally looping sequence of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutineDesc {
    pub name: String,
    pub is_looping: bool,
    pub steps: Vec<Step>,
}

impl RoutineDesc {
    /// Valid when the name is non-empty and every step is valid.  Zero
    /// steps is valid.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.steps.iter().all(Step::is_valid)
    }

    /// Parse a description from a file.
    ///
    /// A missing file is a hard error, propagated to the caller.  Anything
    /// else degrades: malformed JSON yields a default (invalid)
    /// description, mistyped fields keep their defaults, and invalid steps
    /// are dropped while the remaining steps survive.
    pub fn parse_from_file(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                error!(
                    "Could not find routine description file '{}'.",
                    path.display()
                );
                return Err(PersistenceError::NotFound(path.to_path_buf()).into());
            }
            Err(e) => return Err(PersistenceError::Io(e).into()),
        };

        let mut desc = Self::default();
        let filename = path.display();

        let root: Value = match serde_json::from_str(&text) {
            Ok(root) => root,
            Err(_) => {
                error!("JSON error decoding routine description file '{filename}'.");
                return Ok(desc);
            }
        };

        match root.get("name") {
            None => warn!("Missing 'name' key in routine description file '{filename}'."),
            Some(value) => match value.as_str() {
                Some("") => warn!("Empty name in routine description file '{filename}'."),
                Some(name) => desc.name = name.to_string(),
                None => warn!("Invalid name '{value}' in routine description file '{filename}'."),
            },
        }

        // A missing looping flag is not an error.
        if let Some(value) = root.get("isLooping") {
            match value.as_bool() {
                Some(is_looping) => desc.is_looping = is_looping,
                None => warn!(
                    "Invalid looping '{value}' in routine description file '{filename}'."
                ),
            }
        }

        // Missing steps are not an error either.
        if let Some(value) = root.get("steps") {
            match value.as_array() {
                Some(steps) => {
                    for step_json in steps {
                        let step = Step::from_json(step_json, path);
                        if step.is_valid() {
                            desc.steps.push(step);
                        }
                    }
                }
                None => warn!("Steps in routine description file '{filename}' is not a list."),
            }
        }

        Ok(desc)
    }

    /// Write the description to a file.
    ///
    /// Refuses to write (no file created, no error) when the description is
    /// currently invalid; an unwritable path is an I/O error.  A valid
    /// description round-trips: writing and re-parsing yields an equal
    /// value.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if !self.is_valid() {
            warn!(
                "Refusing to save invalid routine description '{}' to '{}'.",
                self.name,
                path.display()
            );
            return Ok(());
        }

        let root = json!({
            "name": self.name,
            "isLooping": self.is_looping,
            "steps": self.steps.iter().map(Step::to_json).collect::<Vec<_>>(),
        });
        let text = serde_json::to_string_pretty(&root).map_err(|e| {
            PersistenceError::Io(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
        })?;

        fs::write(path, text).map_err(PersistenceError::Io)?;
        info!(
            "Saved routine description '{}' to '{}'.",
            self.name,
            path.display()
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Ensure the routines directory exists under the base directory, creating
/// it when missing.  Returns its path.
pub fn bootstrap_routines(base_dir: &Path) -> PathBuf {
    let routines_path = base_dir.join("routines");
    if !routines_path.exists() {
        info!(
            "Creating missing routines directory '{}'.",
            routines_path.display()
        );
        if let Err(e) = fs::create_dir_all(&routines_path) {
            warn!(
                "Failed to create routines directory '{}': {e}.",
                routines_path.display()
            );
        }
    }
    routines_path
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn sample_desc() -> RoutineDesc {
        RoutineDesc {
            name: "wake".to_string(),
            is_looping: true,
            steps: vec![
                Step::new(0, "back", MoveDirection::Up),
                Step::new(2000, "legs", MoveDirection::Down),
            ],
        }
    }

    #[test]
    fn missing_file_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RoutineDesc::parse_from_file(&dir.path().join("ghost.rtn"));
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn malformed_json_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.rtn", "{not json");
        let desc = RoutineDesc::parse_from_file(&path).unwrap();
        assert_eq!(desc, RoutineDesc::default());
        assert!(!desc.is_valid());
    }

    #[test]
    fn missing_keys_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.rtn", "{}");
        let desc = RoutineDesc::parse_from_file(&path).unwrap();
        assert_eq!(desc, RoutineDesc::default());
    }

    #[test]
    fn mistyped_fields_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "odd.rtn",
            r#"{"name": 5, "isLooping": "yes", "steps": "nope"}"#,
        );
        let desc = RoutineDesc::parse_from_file(&path).unwrap();
        assert_eq!(desc.name, "");
        assert!(!desc.is_looping);
        assert!(desc.steps.is_empty());
    }

    #[test]
    fn empty_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "anon.rtn", r#"{"name": ""}"#);
        let desc = RoutineDesc::parse_from_file(&path).unwrap();
        assert_eq!(desc.name, "");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "extra.rtn",
            r#"{"name": "wake", "colour": "red", "isLooping": false}"#,
        );
        let desc = RoutineDesc::parse_from_file(&path).unwrap();
        assert_eq!(desc.name, "wake");
        assert!(desc.is_valid());
    }

    #[test]
    fn corrupt_step_is_dropped_others_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "mixed.rtn",
            r#"{
                "name": "wake",
                "steps": [
                    {"delayMs": 100, "controlName": "back", "direction": "up"},
                    {"delayMs": -5, "controlName": "back", "direction": "up"},
                    {"delayMs": 100, "controlName": "", "direction": "up"},
                    {"delayMs": 100, "controlName": "legs", "direction": "idle"},
                    {"delayMs": 200, "controlName": "legs", "direction": "down"}
                ]
            }"#,
        );
        let desc = RoutineDesc::parse_from_file(&path).unwrap();
        assert_eq!(
            desc.steps,
            vec![
                Step::new(100, "back", MoveDirection::Up),
                Step::new(200, "legs", MoveDirection::Down),
            ]
        );
        assert!(desc.is_valid());
    }

    #[test]
    fn step_with_wrong_types_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "typed.rtn",
            r#"{
                "name": "wake",
                "steps": [{"delayMs": "soon", "controlName": 7, "direction": 1}]
            }"#,
        );
        let desc = RoutineDesc::parse_from_file(&path).unwrap();
        assert!(desc.steps.is_empty());
    }

    #[test]
    fn zero_steps_is_valid() {
        let desc = RoutineDesc {
            name: "rest".to_string(),
            ..Default::default()
        };
        assert!(desc.is_valid());
    }

    #[test]
    fn round_trip_preserves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wake.rtn");

        let desc = sample_desc();
        desc.save_to_file(&path).unwrap();
        let parsed = RoutineDesc::parse_from_file(&path).unwrap();
        assert_eq!(parsed, desc);
    }

    #[test]
    fn save_refuses_invalid_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.rtn");

        let desc = RoutineDesc::default();
        desc.save_to_file(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn save_to_unwritable_path_is_an_io_error() {
        let desc = sample_desc();
        assert!(desc.save_to_file(Path::new("")).is_err());
    }

    #[test]
    fn bootstrap_creates_directory_once() {
        let dir = tempfile::tempdir().unwrap();
        let routines = bootstrap_routines(dir.path());
        assert!(routines.is_dir());
        // Idempotent.
        assert_eq!(bootstrap_routines(dir.path()), routines);
    }
}
