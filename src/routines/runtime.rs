//! A running routine instance.
//!
//! Timing is cumulative and relative: each step's delay is measured from
//! the anchor — the moment the previous step fired, or routine start for
//! the first step — so editing one step's delay never reflows the rest of
//! the sequence.

use crate::app::commands::{Command, CommandSource};
use crate::routines::desc::RoutineDesc;

/// Runtime state advancing through one [`RoutineDesc`].
pub struct Routine {
    desc: RoutineDesc,
    /// Index of the next step to fire.
    next_step: usize,
    /// Timestamp the current step's delay is measured from.
    anchor_ms: u64,
    finished: bool,
}

impl Routine {
    /// Create an instance anchored at `now_ms`.
    pub fn new(desc: RoutineDesc, now_ms: u64) -> Self {
        Self {
            desc,
            next_step: 0,
            anchor_ms: now_ms,
            finished: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance against the clock, emitting one move command per step whose
    /// delay has elapsed.  No-op once finished.
    pub fn process(&mut self, now_ms: u64, commands: &mut Vec<Command>) {
        if self.finished {
            return;
        }

        if self.desc.steps.is_empty() {
            // Nothing to run: a non-looping instance finishes on its first
            // process call; a looping one stays perpetually unfinished.
            if !self.desc.is_looping {
                self.finished = true;
            }
            return;
        }

        let mut fired = 0;
        loop {
            let step = &self.desc.steps[self.next_step];
            if now_ms.saturating_sub(self.anchor_ms) < step.delay_ms as u64 {
                break;
            }

            if let Some(direction) = step.direction {
                commands.push(Command::MoveControl {
                    control_name: step.control_name.clone(),
                    direction,
                    source: CommandSource::Routine,
                });
            }

            // Resetting the anchor to now (not anchor + delay) means a
            // late tick fires one step, not a burst of catch-up steps.
            self.next_step += 1;
            self.anchor_ms = now_ms;
            fired += 1;

            if self.next_step >= self.desc.steps.len() {
                if !self.desc.is_looping {
                    self.finished = true;
                    break;
                }
                self.next_step = 0;
                // A zero-delay step at the head may fire again in the same
                // tick; bound a description whose steps are *all*
                // zero-delay to one full pass per tick.
                if fired >= self.desc.steps.len() {
                    break;
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
