//! Inbound commands to the bed service.
//!
//! These represent actions requested by the outside world (voice intents
//! over MQTT) or generated by the routine engine, interpreted by the
//! [`BedService`](super::service::BedService).  The control loop switches
//! over the variants exhaustively — there is no duck typing at this
//! boundary.

use core::fmt;

/// A direction a control can be asked to move in.
///
/// Deliberately narrower than [`ControlState`](crate::control::ControlState):
/// commands can never request the cool-down or idle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

impl MoveDirection {
    /// Parse the wire spelling used by routine files and intent slots.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

/// Where a move command originated.  The core forwards this tag (reports
/// record it) but attaches no other meaning to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    /// Issued externally (voice intent, message bus).
    External,
    /// Issued by a running routine.
    Routine,
}

/// What a routine-control command asks the manager to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineAction {
    Start,
    Stop,
}

/// Commands that cross into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A status query.  The core ignores it; the caller answers.
    Status,

    /// Move a named control in a direction.
    MoveControl {
        control_name: String,
        direction: MoveDirection,
        source: CommandSource,
    },

    /// Start or stop a named routine.
    RoutineControl {
        routine_name: String,
        action: RoutineAction,
    },
}
