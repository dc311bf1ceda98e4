//! Voice-intent parsing.
//!
//! The announcer stack publishes recognized intents as JSON on
//! `hermes/intent/<name>`; this module turns those payloads into
//! [`Command`]s and builds the dialogue-manager payload used to speak
//! notifications back.  It is pure JSON-to-data code — the MQTT transport
//! lives in [`adapters::mqtt`](crate::adapters) — so the whole recognition
//! surface is testable on the host.

use log::{info, warn};
use serde_json::{Value, json};

use crate::app::commands::{Command, CommandSource, MoveDirection, RoutineAction};

/// Topic filter the intake subscribes to.
pub const INTENT_TOPIC_FILTER: &str = "hermes/intent/#";

/// Topic notifications are spoken through.
pub const DIALOGUE_TOPIC: &str = "hermes/dialogueManager/startSession";

/// Parse an intent payload.  Returns a command if one is recognized.
pub fn parse_intent(payload: &str) -> Option<Command> {
    let root: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!("JSON error decoding intent message: {e}.");
            return None;
        }
    };

    let Some(intent_name) = root
        .get("intent")
        .and_then(|intent| intent.get("intentName"))
        .and_then(Value::as_str)
    else {
        warn!("Invalid intent message received.");
        return None;
    };

    match intent_name {
        "GetStatus" => {
            info!("Received a get status intent.");
            Some(Command::Status)
        }
        "MovePart" => {
            info!("Received a move control intent.");
            parse_move_control(&root)
        }
        "StartRoutine" => {
            info!("Received a start routine intent.");
            parse_routine_control(&root, RoutineAction::Start)
        }
        "StopRoutine" => {
            info!("Received a stop routine intent.");
            parse_routine_control(&root, RoutineAction::Stop)
        }
        other => {
            warn!("Unrecognized intent '{other}'.");
            None
        }
    }
}

/// Build the dialogue-manager session payload that speaks `text`.
pub fn notification_payload(text: &str) -> String {
    json!({
        "init": {"type": "notification", "text": text},
        "siteId": "default",
    })
    .to_string()
}

// ── Internal ──────────────────────────────────────────────────

/// Iterate the intent's slots as `(slotName, rawValue)` pairs.  Slots
/// missing either field are skipped.
fn slots(root: &Value) -> impl Iterator<Item = (&str, &str)> {
    root.get("slots")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|slot| {
            let name = slot.get("slotName").and_then(Value::as_str)?;
            let value = slot.get("rawValue").and_then(Value::as_str)?;
            Some((name, value))
        })
}

fn parse_move_control(root: &Value) -> Option<Command> {
    let mut control_name = None;
    let mut direction = None;

    for (slot_name, slot_value) in slots(root) {
        match slot_name {
            "name" => control_name = Some(slot_value.to_string()),
            "direction" => {
                direction = match slot_value {
                    "raise" => Some(MoveDirection::Up),
                    "lower" => Some(MoveDirection::Down),
                    _ => direction,
                };
            }
            _ => {}
        }
    }

    let Some(control_name) = control_name else {
        warn!("Invalid move control intent: missing control name.");
        return None;
    };
    let Some(direction) = direction else {
        warn!("Invalid move control intent: missing direction.");
        return None;
    };

    info!("Recognized move control intent: move '{control_name}' '{direction}'.");
    Some(Command::MoveControl {
        control_name,
        direction,
        source: CommandSource::External,
    })
}

fn parse_routine_control(root: &Value, action: RoutineAction) -> Option<Command> {
    let routine_name = slots(root)
        .find(|(slot_name, _)| *slot_name == "name")
        .map(|(_, value)| value.to_string());

    let Some(routine_name) = routine_name else {
        warn!("Invalid routine control intent: missing routine name.");
        return None;
    };

    Some(Command::RoutineControl {
        routine_name,
        action,
    })
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
