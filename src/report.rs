//! Activity reports.
//!
//! One JSON-lines file per report day in `reports/` under the base
//! directory.  A report day starts at 17:00 local time (so a full night of
//! activity lands in one file) and the file is named for that start date.
//! The first line is a header; every subsequent line is one event.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, Local, Timelike};
use log::{info, warn};
use serde_json::{Value, json};

use crate::app::commands::{CommandSource, MoveDirection};

/// Manages recording events into per-day report files.
pub struct ReportManager {
    reports_dir: PathBuf,
    /// Local hour at which a report day begins.
    report_start_hour: u32,
}

impl ReportManager {
    pub const REPORT_VERSION: u32 = 4;

    pub fn new(base_dir: &Path) -> Self {
        Self {
            reports_dir: base_dir.join("reports"),
            report_start_hour: 17,
        }
    }

    /// Make sure the current report file exists.  Called once per tick.
    pub fn process(&self) {
        self.ensure_report_file(Local::now());
    }

    // ── Event recording ───────────────────────────────────────

    pub fn add_status_event(&self) {
        self.add_event(json!({"type": "status"}));
    }

    pub fn add_move_event(&self, control_name: &str, direction: MoveDirection, source: CommandSource) {
        let source = match source {
            CommandSource::External => "external",
            CommandSource::Routine => "routine",
        };
        self.add_event(json!({
            "type": "move",
            "control": control_name,
            "direction": direction.to_string(),
            "source": source,
        }));
    }

    pub fn add_routine_event(&self, routine_name: &str, what: &str) {
        self.add_event(json!({
            "type": "routine",
            "routine": routine_name,
            "event": what,
        }));
    }

    fn add_event(&self, info: Value) {
        let now = Local::now();
        let path = self.ensure_report_file(now);
        let line = json!({"when": now.to_rfc3339(), "info": info}).to_string();
        let result = OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            warn!("Failed to append to report file '{}': {e}.", path.display());
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// The report-day start for a given moment: today at the start hour,
    /// or yesterday's start if the hour has not been reached yet.
    fn start_time_for(&self, time: DateTime<Local>) -> DateTime<Local> {
        let day = if time.hour() < self.report_start_hour {
            time - Duration::days(1)
        } else {
            time
        };
        day.with_hour(self.report_start_hour)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(day)
    }

    fn report_path_for(&self, time: DateTime<Local>) -> PathBuf {
        let start = self.start_time_for(time);
        self.reports_dir.join(format!(
            "reclina{:04}-{:02}-{:02}.rpt",
            start.year(),
            start.month(),
            start.day()
        ))
    }

    /// Create the report file for `now` with its header line if it does
    /// not exist yet.  Returns its path.
    fn ensure_report_file(&self, now: DateTime<Local>) -> PathBuf {
        let path = self.report_path_for(now);
        if path.exists() {
            return path;
        }

        let header = json!({
            "version": Self::REPORT_VERSION,
            "start": self.start_time_for(now).to_rfc3339(),
        });
        match fs::write(&path, format!("{header}\n")) {
            Ok(()) => info!("Created report file '{}'.", path.display()),
            Err(e) => warn!("Failed to create report file '{}': {e}.", path.display()),
        }
        path
    }
}

/// Ensure the reports directory exists under the base directory, creating
/// it when missing.  Returns its path.
pub fn bootstrap_reports(base_dir: &Path) -> PathBuf {
    let reports_path = base_dir.join("reports");
    if !reports_path.exists() {
        info!(
            "Creating missing reports directory '{}'.",
            reports_path.display()
        );
        if let Err(e) = fs::create_dir_all(&reports_path) {
            warn!(
                "Failed to create reports directory '{}': {e}.",
                reports_path.display()
            );
        }
    }
    reports_path
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
