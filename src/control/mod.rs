//! Per-actuator motion control.
//!
//! Each bed segment is driven by one [`Control`]: a small tick-driven state
//! machine that turns a desired direction into a bounded motion cycle with
//! a mandatory rest interval.
//!
//! ```text
//!          ┌──[desired up]──▶ MOVING UP ◀──[desired up]──┐
//!          │                      │                      │
//!   IDLE ──┤                 [desired down]         MOVING DOWN ◀─[desired down]─ IDLE
//!    ▲     │                      ▼                      │
//!    │     └─[desired down]─▶ MOVING DOWN                │
//!    │                                                   │
//!    │   [desired idle, or moving_duration elapsed]      │
//!    │                      ▼                            ▼
//!    └──[cool_down elapsed]── COOLING DOWN ◀─────────────┘
//! ```
//!
//! Reversal between the two moving states is immediate — the only
//! direction change without a stop.  Every path out of motion goes through
//! the cool-down, which ignores all requests until it expires; rapid
//! direction flapping therefore cannot over-drive the actuator motor.
//!
//! A control owns its two output lines exclusively between `initialize`
//! and `uninitialize`, and is inert (usage error on `set_desired_state` /
//! `process`) outside that window.

pub mod config;

use log::{info, warn};

use crate::app::commands::MoveDirection;
use crate::app::ports::GpioPort;
use crate::error::{Result, UsageError};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// The states a control can be in.
///
/// Only `Idle`, `MovingUp` and `MovingDown` are legal *desired* states;
/// `CoolingDown` is entered by the state machine alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Idle,
    MovingUp,
    MovingDown,
    CoolingDown,
}

impl ControlState {
    /// Human-readable name used in log lines.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::MovingUp => "move up",
            Self::MovingDown => "move down",
            Self::CoolingDown => "cool down",
        }
    }
}

impl From<MoveDirection> for ControlState {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Self::MovingUp,
            MoveDirection::Down => Self::MovingDown,
        }
    }
}

// ---------------------------------------------------------------------------
// Line configuration (set once per initialize)
// ---------------------------------------------------------------------------

/// Validated hardware configuration.  Present only while initialized.
#[derive(Debug, Clone, Copy)]
struct LineConfig {
    up_line: u32,
    down_line: u32,
    moving_duration_ms: u64,
    cool_down_duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Control
// ---------------------------------------------------------------------------

/// The state and logic for a control that manages one part of the bed.
pub struct Control {
    name: String,
    state: ControlState,
    desired_state: ControlState,
    /// Timestamp at which the current state was entered.
    state_started_ms: u64,
    /// `Some` between a successful `initialize` and `uninitialize`.
    config: Option<LineConfig>,
}

impl Control {
    /// Construct an inert control.  It accepts no requests until
    /// [`initialize`](Self::initialize) succeeds.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: ControlState::Idle,
            desired_state: ControlState::Idle,
            state_started_ms: 0,
            config: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn desired_state(&self) -> ControlState {
        self.desired_state
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Validate the configuration and acquire both output lines.
    ///
    /// Returns `false` with no side effect if any value is out of range
    /// (negative line, equal lines, non-positive moving duration, negative
    /// cool-down) or the control is already initialized.  A partial line
    /// acquisition is rolled back before reporting failure.
    pub fn initialize(
        &mut self,
        gpio: &mut impl GpioPort,
        up_line: i32,
        down_line: i32,
        moving_duration_ms: i64,
        cool_down_duration_ms: i64,
    ) -> bool {
        if self.config.is_some() {
            warn!("Control '{}' is already initialized.", self.name);
            return false;
        }
        if up_line < 0 || down_line < 0 {
            warn!("Control '{}': GPIO lines must be non-negative.", self.name);
            return false;
        }
        if up_line == down_line {
            warn!("Control '{}': GPIO lines must differ.", self.name);
            return false;
        }
        if moving_duration_ms <= 0 {
            warn!(
                "Control '{}': moving duration must be positive.",
                self.name
            );
            return false;
        }
        if cool_down_duration_ms < 0 {
            warn!(
                "Control '{}': cool down duration must be non-negative.",
                self.name
            );
            return false;
        }

        let up_line = up_line as u32;
        let down_line = down_line as u32;

        if !gpio.acquire_output_line(up_line) {
            warn!(
                "Control '{}': failed to acquire up line {}.",
                self.name, up_line
            );
            return false;
        }
        if !gpio.acquire_output_line(down_line) {
            warn!(
                "Control '{}': failed to acquire down line {}.",
                self.name, down_line
            );
            // Roll back the half-acquired configuration.
            gpio.release_output_line(up_line);
            return false;
        }

        gpio.set_line_inactive(up_line);
        gpio.set_line_inactive(down_line);

        self.config = Some(LineConfig {
            up_line,
            down_line,
            moving_duration_ms: moving_duration_ms as u64,
            cool_down_duration_ms: cool_down_duration_ms as u64,
        });
        self.state = ControlState::Idle;
        self.desired_state = ControlState::Idle;

        info!(
            "Control '{}' initialized (up={}, down={}, moving={}ms, cool down={}ms).",
            self.name, up_line, down_line, moving_duration_ms, cool_down_duration_ms
        );
        true
    }

    /// Release both lines and return to the inert state.
    ///
    /// Returns `false` if the control is not initialized; a second call
    /// after a successful one therefore fails.
    pub fn uninitialize(&mut self, gpio: &mut impl GpioPort) -> bool {
        let Some(cfg) = self.config.take() else {
            warn!("Control '{}' is not initialized.", self.name);
            return false;
        };

        gpio.set_line_inactive(cfg.up_line);
        gpio.set_line_inactive(cfg.down_line);
        if !gpio.release_output_line(cfg.up_line) {
            warn!(
                "Control '{}': failed to release up line {}.",
                self.name, cfg.up_line
            );
        }
        if !gpio.release_output_line(cfg.down_line) {
            warn!(
                "Control '{}': failed to release down line {}.",
                self.name, cfg.down_line
            );
        }

        self.state = ControlState::Idle;
        self.desired_state = ControlState::Idle;
        info!("Control '{}' uninitialized.", self.name);
        true
    }

    // ── Requests ──────────────────────────────────────────────

    /// Record the next state to move toward.
    ///
    /// Takes effect on the next [`process`](Self::process) call.  A
    /// `CoolingDown` request is silently ignored — cool-down cannot be
    /// requested externally.
    pub fn set_desired_state(&mut self, state: ControlState) -> Result<()> {
        if self.config.is_none() {
            return Err(UsageError::NotInitialized.into());
        }
        if state == ControlState::CoolingDown {
            return Ok(());
        }

        self.desired_state = state;
        info!(
            "Control '{}': set desired state to '{}'.",
            self.name,
            state.name()
        );
        Ok(())
    }

    // ── Per-tick processing ───────────────────────────────────

    /// Advance the state machine by one tick.
    ///
    /// `now_ms` is the control loop's monotonic time sample.  At most one
    /// notification string is appended per call, on a state transition.
    pub fn process(
        &mut self,
        now_ms: u64,
        gpio: &mut impl GpioPort,
        notifications: &mut Vec<String>,
    ) -> Result<()> {
        let Some(cfg) = self.config else {
            return Err(UsageError::NotInitialized.into());
        };

        match self.state {
            ControlState::Idle => self.process_idle(cfg, now_ms, gpio, notifications),
            ControlState::MovingUp | ControlState::MovingDown => {
                self.process_moving(cfg, now_ms, gpio, notifications);
            }
            ControlState::CoolingDown => {
                self.process_cooling_down(cfg, now_ms, gpio, notifications);
            }
        }
        Ok(())
    }

    fn process_idle(
        &mut self,
        cfg: LineConfig,
        now_ms: u64,
        gpio: &mut impl GpioPort,
        notifications: &mut Vec<String>,
    ) {
        match self.desired_state {
            ControlState::Idle => {}
            ControlState::MovingUp | ControlState::MovingDown => {
                self.enter_state(self.desired_state, cfg, now_ms, gpio, notifications);
            }
            // Not reachable through the public API; coerce back to idle.
            ControlState::CoolingDown => self.desired_state = ControlState::Idle,
        }
    }

    fn process_moving(
        &mut self,
        cfg: LineConfig,
        now_ms: u64,
        gpio: &mut impl GpioPort,
        notifications: &mut Vec<String>,
    ) {
        if self.desired_state != self.state {
            match self.desired_state {
                // The one path that changes direction without a stop.
                ControlState::MovingUp | ControlState::MovingDown => {
                    self.enter_state(self.desired_state, cfg, now_ms, gpio, notifications);
                }
                ControlState::Idle => {
                    self.enter_state(ControlState::CoolingDown, cfg, now_ms, gpio, notifications);
                }
                ControlState::CoolingDown => {}
            }
            return;
        }

        // Bound the motion regardless of what was last requested.
        if now_ms.saturating_sub(self.state_started_ms) >= cfg.moving_duration_ms {
            self.desired_state = ControlState::Idle;
            self.enter_state(ControlState::CoolingDown, cfg, now_ms, gpio, notifications);
        }
    }

    fn process_cooling_down(
        &mut self,
        cfg: LineConfig,
        now_ms: u64,
        gpio: &mut impl GpioPort,
        notifications: &mut Vec<String>,
    ) {
        // Cool-down cannot be pre-empted: desired-state requests are held
        // until the interval expires, then overwritten.
        if now_ms.saturating_sub(self.state_started_ms) >= cfg.cool_down_duration_ms {
            self.desired_state = ControlState::Idle;
            self.enter_state(ControlState::Idle, cfg, now_ms, gpio, notifications);
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Execute a state transition: log it, re-drive the output lines,
    /// record the entry timestamp, and announce motion.
    fn enter_state(
        &mut self,
        next: ControlState,
        cfg: LineConfig,
        now_ms: u64,
        gpio: &mut impl GpioPort,
        notifications: &mut Vec<String>,
    ) {
        info!(
            "Control '{}': state transition from '{}' to '{}'.",
            self.name,
            self.state.name(),
            next.name()
        );

        // Never let both lines be active together, even transiently.
        match next {
            ControlState::MovingUp => {
                gpio.set_line_inactive(cfg.down_line);
                gpio.set_line_active(cfg.up_line);
                notifications.push(format!("Raising the {}.", self.name));
            }
            ControlState::MovingDown => {
                gpio.set_line_inactive(cfg.up_line);
                gpio.set_line_active(cfg.down_line);
                notifications.push(format!("Lowering the {}.", self.name));
            }
            ControlState::CoolingDown | ControlState::Idle => {
                gpio.set_line_inactive(cfg.up_line);
                gpio.set_line_inactive(cfg.down_line);
            }
        }

        self.state = next;
        self.state_started_ms = now_ms;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gpio::SimGpioAdapter;

    const UP: i32 = 4;
    const DOWN: i32 = 5;
    const MOVING_MS: i64 = 10;
    const COOL_MS: i64 = 5;

    fn make_control(gpio: &mut SimGpioAdapter) -> Control {
        let mut control = Control::new("back");
        assert!(control.initialize(gpio, UP, DOWN, MOVING_MS, COOL_MS));
        control
    }

    #[test]
    fn initialize_rejects_bad_configuration() {
        let mut gpio = SimGpioAdapter::new();
        let mut control = Control::new("back");

        assert!(!control.initialize(&mut gpio, -1, DOWN, MOVING_MS, COOL_MS));
        assert!(!control.initialize(&mut gpio, UP, -2, MOVING_MS, COOL_MS));
        assert!(!control.initialize(&mut gpio, UP, UP, MOVING_MS, COOL_MS));
        assert!(!control.initialize(&mut gpio, UP, DOWN, 0, COOL_MS));
        assert!(!control.initialize(&mut gpio, UP, DOWN, -10, COOL_MS));
        assert!(!control.initialize(&mut gpio, UP, DOWN, MOVING_MS, -1));

        assert!(!control.is_initialized());
        assert!(gpio.acquired_lines().is_empty());
    }

    #[test]
    fn initialize_succeeds_exactly_once() {
        let mut gpio = SimGpioAdapter::new();
        let mut control = make_control(&mut gpio);

        assert!(!control.initialize(&mut gpio, UP, DOWN, MOVING_MS, COOL_MS));
        assert_eq!(gpio.acquired_lines(), vec![UP as u32, DOWN as u32]);
    }

    #[test]
    fn initialize_rolls_back_partial_acquisition() {
        let mut gpio = SimGpioAdapter::new();
        // Something else already holds the down line.
        assert!(gpio.acquire_output_line(DOWN as u32));

        let mut control = Control::new("back");
        assert!(!control.initialize(&mut gpio, UP, DOWN, MOVING_MS, COOL_MS));
        assert!(!control.is_initialized());
        // The up line must not be left behind.
        assert_eq!(gpio.acquired_lines(), vec![DOWN as u32]);
    }

    #[test]
    fn initialize_fails_without_chip() {
        let mut gpio = SimGpioAdapter::disconnected();
        let mut control = Control::new("back");
        assert!(!control.initialize(&mut gpio, UP, DOWN, MOVING_MS, COOL_MS));
        assert!(!control.is_initialized());
    }

    #[test]
    fn uninitialize_releases_lines_and_is_idempotent_failure() {
        let mut gpio = SimGpioAdapter::new();
        let mut control = make_control(&mut gpio);

        assert!(control.uninitialize(&mut gpio));
        assert!(gpio.acquired_lines().is_empty());
        assert!(!control.uninitialize(&mut gpio));

        // Reusable after uninitialize.
        assert!(control.initialize(&mut gpio, UP, DOWN, MOVING_MS, COOL_MS));
    }

    #[test]
    fn requests_fail_when_uninitialized() {
        let mut gpio = SimGpioAdapter::new();
        let mut control = Control::new("back");
        let mut notifications = Vec::new();

        assert!(control.set_desired_state(ControlState::MovingUp).is_err());
        assert!(
            control
                .process(0, &mut gpio, &mut notifications)
                .is_err()
        );
    }

    #[test]
    fn cool_down_cannot_be_requested() {
        let mut gpio = SimGpioAdapter::new();
        let mut control = make_control(&mut gpio);

        control.set_desired_state(ControlState::CoolingDown).unwrap();
        assert_eq!(control.desired_state(), ControlState::Idle);
    }

    #[test]
    fn full_motion_cycle() {
        // Scenario: request up at t=0; moving bound at t=10; idle at t=15.
        let mut gpio = SimGpioAdapter::new();
        let mut control = make_control(&mut gpio);
        let mut notifications = Vec::new();

        control.set_desired_state(ControlState::MovingUp).unwrap();
        control.process(0, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::MovingUp);
        assert_eq!(notifications, vec!["Raising the back.".to_string()]);
        assert!(gpio.is_line_active(UP as u32));
        assert!(!gpio.is_line_active(DOWN as u32));

        // Still moving just before the bound.
        control.process(9, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::MovingUp);

        control.process(10, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::CoolingDown);
        assert!(!gpio.is_line_active(UP as u32));

        control.process(14, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::CoolingDown);

        control.process(15, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::Idle);
        assert_eq!(control.desired_state(), ControlState::Idle);
        // Only the motion start was announced.
        assert_eq!(notifications.len(), 1);
    }

    #[test]
    fn reversal_skips_cool_down() {
        let mut gpio = SimGpioAdapter::new();
        let mut control = make_control(&mut gpio);
        let mut notifications = Vec::new();

        control.set_desired_state(ControlState::MovingDown).unwrap();
        control.process(0, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::MovingDown);

        // Reverse mid-motion with no time passing.
        control.set_desired_state(ControlState::MovingUp).unwrap();
        control.process(0, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::MovingUp);
        assert!(gpio.is_line_active(UP as u32));
        assert!(!gpio.is_line_active(DOWN as u32));
        assert_eq!(
            notifications,
            vec![
                "Lowering the back.".to_string(),
                "Raising the back.".to_string(),
            ]
        );

        // The reversal reset the bound: still moving at t=9 and until t=9+10.
        control.process(9, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::MovingUp);
    }

    #[test]
    fn stop_request_enters_cool_down() {
        let mut gpio = SimGpioAdapter::new();
        let mut control = make_control(&mut gpio);
        let mut notifications = Vec::new();

        control.set_desired_state(ControlState::MovingUp).unwrap();
        control.process(0, &mut gpio, &mut notifications).unwrap();

        control.set_desired_state(ControlState::Idle).unwrap();
        control.process(3, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::CoolingDown);
        assert!(!gpio.is_line_active(UP as u32));
    }

    #[test]
    fn cool_down_ignores_requests_until_expiry() {
        let mut gpio = SimGpioAdapter::new();
        let mut control = make_control(&mut gpio);
        let mut notifications = Vec::new();

        control.set_desired_state(ControlState::MovingUp).unwrap();
        control.process(0, &mut gpio, &mut notifications).unwrap();
        control.process(10, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::CoolingDown);

        // Request motion during the cool-down; it must not pre-empt...
        control.set_desired_state(ControlState::MovingDown).unwrap();
        control.process(12, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::CoolingDown);

        // ...and it is discarded when the cool-down expires.
        control.process(15, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::Idle);
        assert_eq!(control.desired_state(), ControlState::Idle);
    }

    #[test]
    fn zero_cool_down_returns_to_idle_next_tick() {
        let mut gpio = SimGpioAdapter::new();
        let mut control = Control::new("legs");
        assert!(control.initialize(&mut gpio, UP, DOWN, MOVING_MS, 0));
        let mut notifications = Vec::new();

        control.set_desired_state(ControlState::MovingUp).unwrap();
        control.process(0, &mut gpio, &mut notifications).unwrap();
        control.process(10, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::CoolingDown);
        control.process(10, &mut gpio, &mut notifications).unwrap();
        assert_eq!(control.state(), ControlState::Idle);
    }
}
