//! Log-based notification sink adapter.
//!
//! Implements [`NotificationSink`] by writing every notification to the
//! logger (UART / USB-CDC in production).  The MQTT adapter implements the
//! same trait to reach the voice announcer; this one is the fallback when
//! the bus is down and the default in tests.

use log::info;

use crate::app::ports::NotificationSink;

/// Adapter that logs every notification string.
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for LogNotificationSink {
    fn notify(&mut self, text: &str) {
        info!("NOTIFY | {text}");
    }
}
