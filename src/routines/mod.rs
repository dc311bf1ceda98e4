//! Routines: user-authored, optionally looping command sequences.
//!
//! A [`RoutineDesc`](desc::RoutineDesc) is the declarative, persisted form;
//! a [`Routine`](runtime::Routine) is one running instance advancing
//! against the wall clock; the [`RoutineManager`](manager::RoutineManager)
//! owns both sides and is what the control loop talks to.

pub mod desc;
pub mod manager;
pub mod runtime;

pub use desc::{RoutineDesc, Step};
pub use manager::RoutineManager;
pub use runtime::Routine;
