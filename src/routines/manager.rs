//! Ownership and lifecycle of routines.
//!
//! The manager owns the loaded descriptions and at most one running
//! instance per description name.  The control loop drives it twice per
//! tick: [`process_command`](RoutineManager::process_command) for start /
//! stop requests and [`process_routines`](RoutineManager::process_routines)
//! to advance every running instance.
//!
//! Everything the user hears back comes out of here as exact notification
//! strings — wording is part of the external contract.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::app::commands::{Command, RoutineAction};
use crate::routines::desc::{ROUTINE_FILE_EXTENSION, RoutineDesc};
use crate::routines::runtime::Routine;

/// Owns routine descriptions and their running instances.
///
/// Every running entry has a matching loaded description; instances are
/// held by exclusive ownership in a map keyed by description name, so no
/// back-reference from a routine to its manager exists.
pub struct RoutineManager {
    /// Loaded descriptions, keyed by description name.
    descs: BTreeMap<String, RoutineDesc>,
    /// Running instances, keyed by description name.  `BTreeMap` keeps the
    /// per-tick processing order deterministic.
    running: BTreeMap<String, Routine>,
}

impl RoutineManager {
    pub fn new() -> Self {
        Self {
            descs: BTreeMap::new(),
            running: BTreeMap::new(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load every routine description file in `dir`.
    ///
    /// On a name collision the first-loaded description wins (load order
    /// is sorted by filename, so collisions resolve deterministically);
    /// repeat calls never duplicate already-loaded names.  Returns the
    /// number of loaded descriptions.
    pub fn initialize(&mut self, dir: &Path) -> usize {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read routines directory '{}': {e}.", dir.display());
                return self.descs.len();
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().and_then(OsStr::to_str) == Some(ROUTINE_FILE_EXTENSION)
            })
            .collect();
        paths.sort();

        for path in paths {
            let desc = match RoutineDesc::parse_from_file(&path) {
                Ok(desc) => desc,
                Err(e) => {
                    warn!(
                        "Failed to load routine description file '{}': {e}.",
                        path.display()
                    );
                    continue;
                }
            };
            if !desc.is_valid() {
                warn!(
                    "Ignoring invalid routine description file '{}'.",
                    path.display()
                );
                continue;
            }
            if self.descs.contains_key(&desc.name) {
                info!(
                    "Ignoring duplicate routine description '{}' from '{}'.",
                    desc.name,
                    path.display()
                );
                continue;
            }

            info!("Loaded routine description '{}'.", desc.name);
            self.descs.insert(desc.name.clone(), desc);
        }

        self.descs.len()
    }

    /// Stop and discard all running instances and loaded descriptions.
    pub fn uninitialize(&mut self) {
        self.running.clear();
        self.descs.clear();
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn loaded_count(&self) -> usize {
        self.descs.len()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains_key(name)
    }

    // ── Commands ──────────────────────────────────────────────

    /// Start or stop the named routine, returning the notification to
    /// announce.
    pub fn process_command(
        &mut self,
        routine_name: &str,
        action: RoutineAction,
        now_ms: u64,
    ) -> String {
        match action {
            RoutineAction::Start => {
                let Some(desc) = self.descs.get(routine_name) else {
                    warn!("No routine description named '{routine_name}'.");
                    return format!("There is no {routine_name} routine.");
                };
                if self.running.contains_key(routine_name) {
                    return format!("The {routine_name} routine is already running.");
                }

                let routine = Routine::new(desc.clone(), now_ms);
                self.running.insert(routine_name.to_string(), routine);
                info!("Started routine '{routine_name}'.");
                format!("Started the {routine_name} routine.")
            }
            RoutineAction::Stop => {
                if self.running.remove(routine_name).is_none() {
                    return format!("The {routine_name} routine is not running.");
                }
                info!("Stopped routine '{routine_name}'.");
                format!("Stopped the {routine_name} routine.")
            }
        }
    }

    // ── Per-tick processing ───────────────────────────────────

    /// Advance every running instance, appending emitted move commands to
    /// `commands` and a finish announcement for every instance that
    /// completed this tick.  Looping routines are never removed.
    pub fn process_routines(
        &mut self,
        now_ms: u64,
        commands: &mut Vec<Command>,
        notifications: &mut Vec<String>,
    ) {
        for routine in self.running.values_mut() {
            routine.process(now_ms, commands);
        }

        let finished: Vec<_> = self
            .running
            .iter()
            .filter(|(_, routine)| routine.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        for name in finished {
            self.running.remove(&name);
            info!("Routine '{name}' finished.");
            notifications.push(format!("The {name} routine finished."));
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
