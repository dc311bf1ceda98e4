//! Reclina Firmware — Main Entry Point
//!
//! Hexagonal architecture with a cooperative, tick-driven control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  EspGpioAdapter     MqttIntake        MonotonicTimer         │
//! │  (GpioPort)         (commands+notify) (time sample)          │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │            BedService (pure logic)                 │      │
//! │  │  Controls · Routines                               │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is single-threaded from the loop's point of view: once per
//! tick it samples the timer, drains bus commands, advances the service,
//! and lets the report manager catch up.  No operation blocks or spans
//! ticks.

#![deny(unused_must_use)]

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use reclina::adapters::gpio::EspGpioAdapter;
use reclina::adapters::mqtt::MqttIntake;
use reclina::adapters::time::MonotonicTimer;
use reclina::app::commands::{Command, RoutineAction};
use reclina::app::ports::NotificationSink;
use reclina::app::service::BedService;
use reclina::report::{self, ReportManager};
use reclina::settings::{self, Settings};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Starting Reclina v{}...", env!("CARGO_PKG_VERSION"));

    // ── 2. Filesystem + settings ──────────────────────────────
    mount_spiffs()?;
    let base_dir = Path::new("/spiffs");

    let settings_path = settings::bootstrap_settings(base_dir);
    let settings = match Settings::parse_from_file(&settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Failed to load settings ({e}), using defaults.");
            Settings::default()
        }
    };
    if !settings.time_zone_name.is_empty() {
        info!("Using time zone '{}'.", settings.time_zone_name);
    }

    report::bootstrap_reports(base_dir);
    let reports = ReportManager::new(base_dir);

    // ── 3. Adapters + service ─────────────────────────────────
    let timer = MonotonicTimer::new();
    let mut gpio = EspGpioAdapter::new();

    let mut service = BedService::new();
    service.initialize(&mut gpio, base_dir);

    let mut mqtt = MqttIntake::connect(&settings.mqtt_host, settings.mqtt_port)?;

    info!("System ready. Entering control loop.");

    // ── 4. Control loop ───────────────────────────────────────
    loop {
        std::thread::sleep(Duration::from_millis(settings.tick_interval_ms));
        let now_ms = timer.now_ms();

        // Apply every command that arrived on the bus since last tick.
        while let Some(command) = mqtt.pop_command() {
            record_command(&reports, &command);
            if command == Command::Status {
                // The status query is answered here, not by the core.
                mqtt.notify("Reclina is running.");
                continue;
            }
            service.handle_command(command, now_ms, &mut mqtt);
        }

        service.tick(now_ms, &mut gpio, &mut mqtt);
        reports.process();
    }
}

/// Record an externally received command into the activity report.
fn record_command(reports: &ReportManager, command: &Command) {
    match command {
        Command::Status => reports.add_status_event(),
        Command::MoveControl {
            control_name,
            direction,
            source,
        } => reports.add_move_event(control_name, *direction, *source),
        Command::RoutineControl {
            routine_name,
            action,
        } => {
            let what = match action {
                RoutineAction::Start => "start requested",
                RoutineAction::Stop => "stop requested",
            };
            reports.add_routine_event(routine_name, what);
        }
    }
}

/// Mount the SPIFFS data partition at `/spiffs`.
fn mount_spiffs() -> Result<()> {
    use esp_idf_svc::sys::{ESP_OK, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};

    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 8,
        format_if_mount_failed: true,
    };

    // SAFETY: called once from the main task before any filesystem access;
    // the configuration struct only needs to live for the duration of the
    // call.
    let ret = unsafe { esp_vfs_spiffs_register(&conf) };
    if ret != ESP_OK {
        anyhow::bail!("failed to mount SPIFFS (error {ret})");
    }
    info!("SPIFFS mounted at /spiffs.");
    Ok(())
}
