//! Integration tests: files on disk → BedService → GPIO lines and
//! notifications.

use std::fs;
use std::path::Path;

use reclina::adapters::gpio::SimGpioAdapter;
use reclina::app::commands::{Command, CommandSource, MoveDirection, RoutineAction};
use reclina::app::ports::{GpioPort, NotificationSink};
use reclina::app::service::BedService;
use reclina::control::ControlState;

// ── Mock implementations ──────────────────────────────────────

struct RecordingSink {
    notifications: Vec<String>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            notifications: Vec::new(),
        }
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&mut self, text: &str) {
        self.notifications.push(text.to_string());
    }
}

// ── Fixture ───────────────────────────────────────────────────

fn write_control(base_dir: &Path, filename: &str, name: &str, up: u32, down: u32) {
    let contents = format!(
        r#"{{
            "name": "{name}",
            "upGpioLine": {up},
            "downGpioLine": {down},
            "movingDurationMs": 10,
            "coolDownDurationMs": 5
        }}"#
    );
    fs::write(base_dir.join("controls").join(filename), contents).unwrap();
}

fn write_routine(base_dir: &Path, filename: &str, contents: &str) {
    fs::write(base_dir.join("routines").join(filename), contents).unwrap();
}

/// A base directory with two controls and one non-looping routine.
fn make_base_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("controls")).unwrap();
    fs::create_dir(dir.path().join("routines")).unwrap();

    write_control(dir.path(), "back.ctl", "back", 4, 5);
    write_control(dir.path(), "legs.ctl", "legs", 6, 7);
    write_routine(
        dir.path(),
        "wake.rtn",
        r#"{
            "name": "wake",
            "isLooping": false,
            "steps": [
                {"delayMs": 1, "controlName": "back", "direction": "up"},
                {"delayMs": 2, "controlName": "legs", "direction": "down"}
            ]
        }"#,
    );
    dir
}

fn make_service(dir: &tempfile::TempDir) -> (BedService, SimGpioAdapter) {
    let mut gpio = SimGpioAdapter::new();
    let mut service = BedService::new();
    service.initialize(&mut gpio, dir.path());
    (service, gpio)
}

fn move_command(control_name: &str, direction: MoveDirection) -> Command {
    Command::MoveControl {
        control_name: control_name.to_string(),
        direction,
        source: CommandSource::External,
    }
}

fn routine_command(routine_name: &str, action: RoutineAction) -> Command {
    Command::RoutineControl {
        routine_name: routine_name.to_string(),
        action,
    }
}

// ── Loading ───────────────────────────────────────────────────

#[test]
fn loads_controls_and_routines_from_disk() {
    let dir = make_base_dir();
    let (service, gpio) = make_service(&dir);

    assert_eq!(service.control_count(), 2);
    assert_eq!(service.routines().loaded_count(), 1);
    assert_eq!(gpio.acquired_lines(), vec![4, 5, 6, 7]);
}

#[test]
fn broken_control_files_do_not_take_down_the_rest() {
    let dir = make_base_dir();
    // Invalid configuration (equal lines) and unparsable garbage.
    write_control(dir.path(), "head.ctl", "head", 9, 9);
    fs::write(dir.path().join("controls").join("junk.ctl"), "][").unwrap();

    let (service, _gpio) = make_service(&dir);
    assert_eq!(service.control_count(), 2);
    assert!(service.control("head").is_none());
}

// ── External move commands ────────────────────────────────────

#[test]
fn voice_command_drives_a_full_motion_cycle() {
    let dir = make_base_dir();
    let (mut service, mut gpio) = make_service(&dir);
    let mut sink = RecordingSink::new();

    service.handle_command(move_command("back", MoveDirection::Up), 0, &mut sink);
    service.tick(0, &mut gpio, &mut sink);

    let back = service.control("back").unwrap();
    assert_eq!(back.state(), ControlState::MovingUp);
    assert!(gpio.is_line_active(4));
    assert!(!gpio.is_line_active(5));
    assert_eq!(sink.notifications, vec!["Raising the back.".to_string()]);

    // The motion bound forces a cool-down, then idle; lines go quiet.
    service.tick(10, &mut gpio, &mut sink);
    assert_eq!(
        service.control("back").unwrap().state(),
        ControlState::CoolingDown
    );
    assert!(!gpio.is_line_active(4));

    service.tick(15, &mut gpio, &mut sink);
    assert_eq!(service.control("back").unwrap().state(), ControlState::Idle);
    // No further announcements after the initial one.
    assert_eq!(sink.notifications.len(), 1);
}

#[test]
fn controls_move_independently() {
    let dir = make_base_dir();
    let (mut service, mut gpio) = make_service(&dir);
    let mut sink = RecordingSink::new();

    service.handle_command(move_command("back", MoveDirection::Up), 0, &mut sink);
    service.handle_command(move_command("legs", MoveDirection::Down), 0, &mut sink);
    service.tick(0, &mut gpio, &mut sink);

    assert!(gpio.is_line_active(4));
    assert!(gpio.is_line_active(7));
    // Controls advance in name order, so the notifications do too.
    assert_eq!(
        sink.notifications,
        vec![
            "Raising the back.".to_string(),
            "Lowering the legs.".to_string(),
        ]
    );
}

// ── Routines end to end ───────────────────────────────────────

#[test]
fn routine_runs_to_completion() {
    let dir = make_base_dir();
    let (mut service, mut gpio) = make_service(&dir);
    let mut sink = RecordingSink::new();

    service.handle_command(routine_command("wake", RoutineAction::Start), 0, &mut sink);
    assert_eq!(
        sink.notifications,
        vec!["Started the wake routine.".to_string()]
    );
    assert!(service.routines().is_running("wake"));

    // t=1: the first step fires and the back starts raising.
    service.tick(1, &mut gpio, &mut sink);
    assert_eq!(
        service.control("back").unwrap().state(),
        ControlState::MovingUp
    );
    assert!(sink.notifications.contains(&"Raising the back.".to_string()));

    // t=3: the second step fires, the routine finishes and announces it.
    service.tick(3, &mut gpio, &mut sink);
    assert_eq!(
        service.control("legs").unwrap().state(),
        ControlState::MovingDown
    );
    assert!(
        sink.notifications
            .contains(&"The wake routine finished.".to_string())
    );
    assert!(!service.routines().is_running("wake"));
}

#[test]
fn starting_an_unknown_routine_changes_nothing() {
    let dir = make_base_dir();
    let (mut service, mut gpio) = make_service(&dir);
    let mut sink = RecordingSink::new();

    service.handle_command(routine_command("ghost", RoutineAction::Start), 0, &mut sink);
    assert_eq!(
        sink.notifications,
        vec!["There is no ghost routine.".to_string()]
    );
    assert_eq!(service.routines().loaded_count(), 1);
    assert_eq!(service.routines().running_count(), 0);

    service.tick(1, &mut gpio, &mut sink);
    assert_eq!(service.control("back").unwrap().state(), ControlState::Idle);
}

#[test]
fn stopping_a_routine_mid_flight_halts_its_schedule() {
    let dir = make_base_dir();
    let (mut service, mut gpio) = make_service(&dir);
    let mut sink = RecordingSink::new();

    service.handle_command(routine_command("wake", RoutineAction::Start), 0, &mut sink);
    service.tick(1, &mut gpio, &mut sink);

    service.handle_command(routine_command("wake", RoutineAction::Stop), 1, &mut sink);
    assert!(
        sink.notifications
            .contains(&"Stopped the wake routine.".to_string())
    );

    // The second step never fires.
    service.tick(3, &mut gpio, &mut sink);
    assert_eq!(service.control("legs").unwrap().state(), ControlState::Idle);
}

// ── Teardown ──────────────────────────────────────────────────

#[test]
fn uninitialize_releases_every_line() {
    let dir = make_base_dir();
    let (mut service, mut gpio) = make_service(&dir);

    service.uninitialize(&mut gpio);
    assert_eq!(service.control_count(), 0);
    assert_eq!(service.routines().loaded_count(), 0);
    assert!(gpio.acquired_lines().is_empty());

    // The lines are reusable afterwards.
    let mut service2 = BedService::new();
    service2.initialize(&mut gpio, dir.path());
    assert_eq!(service2.control_count(), 2);
}
