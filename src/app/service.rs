//! Bed service — the hexagonal core.
//!
//! [`BedService`] owns the controls and the routine manager and exposes a
//! clean, hardware-agnostic API.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  Command ──▶ ┌──────────────────────────┐ ──▶ NotificationSink
//!              │        BedService        │
//!  GpioPort ◀──│  Controls · Routines     │
//!              └──────────────────────────┘
//! ```
//!
//! Per tick the enclosing loop applies externally received commands via
//! [`handle_command`](BedService::handle_command) and then calls
//! [`tick`](BedService::tick), which feeds routine-generated commands back
//! through the same path before advancing every control.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::control::Control;
use crate::control::config::{CONTROL_FILE_EXTENSION, ControlConfig, bootstrap_controls};
use crate::routines::desc::bootstrap_routines;
use crate::routines::manager::RoutineManager;

use super::commands::Command;
use super::ports::{GpioPort, NotificationSink};

/// The application service orchestrating all domain logic.
pub struct BedService {
    /// Controls keyed by name, advanced in deterministic order.
    controls: BTreeMap<String, Control>,
    routines: RoutineManager,
}

impl BedService {
    /// Construct an empty service.  Call [`initialize`](Self::initialize)
    /// before the first tick.
    pub fn new() -> Self {
        Self {
            controls: BTreeMap::new(),
            routines: RoutineManager::new(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bootstrap the base directory layout, then load and initialize every
    /// configured control and routine description.
    ///
    /// A control whose configuration is invalid or whose lines cannot be
    /// acquired is skipped with a warning — one broken segment must not
    /// take down the rest of the bed.
    pub fn initialize(&mut self, gpio: &mut impl GpioPort, base_dir: &Path) {
        let controls_dir = bootstrap_controls(base_dir);
        let routines_dir = bootstrap_routines(base_dir);

        let mut paths: Vec<_> = match fs::read_dir(&controls_dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.extension().and_then(OsStr::to_str) == Some(CONTROL_FILE_EXTENSION)
                })
                .collect(),
            Err(e) => {
                warn!(
                    "Failed to read controls directory '{}': {e}.",
                    controls_dir.display()
                );
                Vec::new()
            }
        };
        paths.sort();

        for path in paths {
            let config = match ControlConfig::parse_from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "Failed to load control configuration file '{}': {e}.",
                        path.display()
                    );
                    continue;
                }
            };
            if !config.is_valid() {
                warn!(
                    "Ignoring invalid control configuration file '{}'.",
                    path.display()
                );
                continue;
            }
            if self.controls.contains_key(&config.name) {
                info!(
                    "Ignoring duplicate control configuration '{}' from '{}'.",
                    config.name,
                    path.display()
                );
                continue;
            }

            let mut control = Control::new(&config.name);
            if !control.initialize(
                gpio,
                config.up_line,
                config.down_line,
                config.moving_duration_ms,
                config.cool_down_duration_ms,
            ) {
                warn!("Failed to initialize control '{}'.", config.name);
                continue;
            }
            self.controls.insert(config.name.clone(), control);
        }

        let loaded = self.routines.initialize(&routines_dir);
        info!(
            "Bed service initialized with {} control(s) and {} routine(s).",
            self.controls.len(),
            loaded
        );
    }

    /// Release every control's lines and discard all state.
    pub fn uninitialize(&mut self, gpio: &mut impl GpioPort) {
        for control in self.controls.values_mut() {
            control.uninitialize(gpio);
        }
        self.controls.clear();
        self.routines.uninitialize();
        info!("Bed service uninitialized.");
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn control(&self, name: &str) -> Option<&Control> {
        self.controls.get(name)
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    pub fn routines(&self) -> &RoutineManager {
        &self.routines
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one inbound command.  The `source` tag on move commands is
    /// forwarded by the caller (reports record it); the core attaches no
    /// meaning to it.
    pub fn handle_command(
        &mut self,
        command: Command,
        now_ms: u64,
        sink: &mut impl NotificationSink,
    ) {
        match command {
            // Answered by the caller, not the core.
            Command::Status => debug!("Ignoring status query."),

            Command::MoveControl {
                control_name,
                direction,
                source,
            } => {
                let Some(control) = self.controls.get_mut(&control_name) else {
                    warn!("There is no control named '{control_name}'.");
                    return;
                };
                debug!("Move command for '{control_name}' ({direction}) from {source:?}.");
                if let Err(e) = control.set_desired_state(direction.into()) {
                    warn!("Move command for '{control_name}' failed: {e}.");
                }
            }

            Command::RoutineControl {
                routine_name,
                action,
            } => {
                let reply = self.routines.process_command(&routine_name, action, now_ms);
                sink.notify(&reply);
            }
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: advance routines, feed their commands back
    /// in, advance every control, and forward all notifications in order.
    pub fn tick(
        &mut self,
        now_ms: u64,
        gpio: &mut impl GpioPort,
        sink: &mut impl NotificationSink,
    ) {
        let mut commands = Vec::new();
        let mut notifications = Vec::new();

        self.routines
            .process_routines(now_ms, &mut commands, &mut notifications);
        for command in commands {
            self.handle_command(command, now_ms, sink);
        }

        for control in self.controls.values_mut() {
            if let Err(e) = control.process(now_ms, gpio, &mut notifications) {
                warn!("Control '{}' failed to process: {e}.", control.name());
            }
        }

        for text in notifications {
            sink.notify(&text);
        }
    }
}
