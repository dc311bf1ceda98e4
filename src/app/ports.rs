//! Port traits — the hexagonal boundary between domain logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BedService (domain)
//! ```
//!
//! Driven adapters (GPIO lines, notification sinks) implement these traits.
//! The [`BedService`](super::service::BedService) consumes them via
//! generics, so the domain core never touches hardware directly.

// ───────────────────────────────────────────────────────────────
// GPIO resource contract (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Exclusive acquisition and binary drive of numbered output lines.
///
/// Every method is total: failure is reported with `false` rather than a
/// panic or an error type, because callers (the control state machine)
/// probe and roll back as part of normal configuration flow.  A line is
/// owned by at most one holder at a time; the acquired set is the sole
/// mutual-exclusion mechanism in the system.
pub trait GpioPort {
    /// Acquire a line for output.  `false` if the chip is unavailable or
    /// the line is already held.
    fn acquire_output_line(&mut self, line: u32) -> bool;

    /// Release a previously acquired line.  `false` if the line is not held.
    fn release_output_line(&mut self, line: u32) -> bool;

    /// Drive a held line to its active level.  `false` if the line is not
    /// held.
    fn set_line_active(&mut self, line: u32) -> bool;

    /// Drive a held line to its inactive level.  `false` if the line is not
    /// held.
    fn set_line_inactive(&mut self, line: u32) -> bool;

    /// The set of currently held lines, in ascending order.
    fn acquired_lines(&self) -> Vec<u32>;
}

// ───────────────────────────────────────────────────────────────
// Notification sink (driven adapter: domain → announcer)
// ───────────────────────────────────────────────────────────────

/// The domain emits user-facing notification strings through this port.
/// Adapters decide where they go (serial log, the MQTT dialogue manager).
/// Wording is part of the external contract — sinks must forward the text
/// verbatim.
pub trait NotificationSink {
    fn notify(&mut self, text: &str);
}
