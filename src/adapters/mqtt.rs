//! MQTT adapter (ESP-IDF only).
//!
//! Bridges the hermes message bus to the application core: intent payloads
//! arriving on [`INTENT_TOPIC_FILTER`](crate::intent::INTENT_TOPIC_FILTER)
//! are parsed into [`Command`]s and queued for the control loop, and
//! notifications are spoken by publishing dialogue-manager sessions.
//!
//! The ESP-IDF MQTT client delivers events on its own task; the pending
//! queue is the only state shared with the control loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::sys::EspError;
use log::{info, warn};

use crate::app::commands::Command;
use crate::app::ports::NotificationSink;
use crate::intent::{self, DIALOGUE_TOPIC, INTENT_TOPIC_FILTER};

/// How many times to retry the initial subscription while the broker
/// connection is still coming up.
const SUBSCRIBE_ATTEMPTS: u32 = 30;

/// MQTT command intake and notification publisher.
pub struct MqttIntake {
    client: EspMqttClient<'static>,
    pending: Arc<Mutex<VecDeque<Command>>>,
}

impl MqttIntake {
    /// Connect to the broker and subscribe to the intent topics.
    pub fn connect(host: &str, port: u16) -> Result<Self, EspError> {
        let url = format!("mqtt://{host}:{port}");
        let config = MqttClientConfiguration {
            client_id: Some("reclina"),
            ..Default::default()
        };

        let pending = Arc::new(Mutex::new(VecDeque::new()));
        let queue = Arc::clone(&pending);

        let client = EspMqttClient::new_cb(&url, &config, move |event| {
            match event.payload() {
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => {
                    let payload = String::from_utf8_lossy(data);
                    log::debug!("Received a message on topic '{topic}'.");
                    if let Some(command) = intent::parse_intent(&payload) {
                        if let Ok(mut queue) = queue.lock() {
                            queue.push_back(command);
                        }
                    }
                }
                EventPayload::Connected(_) => info!("Finished connecting to MQTT host."),
                EventPayload::Disconnected => warn!("Disconnected from MQTT host."),
                _ => {}
            }
        })?;

        let mut intake = Self { client, pending };
        intake.subscribe_with_retry()?;
        Ok(intake)
    }

    /// Pop the next pending command off the queue, if there is one.
    pub fn pop_command(&self) -> Option<Command> {
        self.pending.lock().ok()?.pop_front()
    }

    fn subscribe_with_retry(&mut self) -> Result<(), EspError> {
        // The client connects in the background; keep attempting the
        // subscription a bounded number of times before giving up.
        for attempt in 1..=SUBSCRIBE_ATTEMPTS {
            match self.client.subscribe(INTENT_TOPIC_FILTER, QoS::AtMostOnce) {
                Ok(_) => {
                    info!("Subscribed to '{INTENT_TOPIC_FILTER}'.");
                    return Ok(());
                }
                Err(e) if attempt == SUBSCRIBE_ATTEMPTS => {
                    warn!(
                        "Failed to subscribe to intent topics after {SUBSCRIBE_ATTEMPTS} attempts."
                    );
                    return Err(e);
                }
                Err(_) => {
                    info!("Subscription attempt {attempt} failed; broker not ready yet.");
                    std::thread::sleep(Duration::from_secs(2));
                }
            }
        }
        Ok(())
    }
}

impl NotificationSink for MqttIntake {
    fn notify(&mut self, text: &str) {
        let payload = intent::notification_payload(text);
        if let Err(e) = self.client.enqueue(
            DIALOGUE_TOPIC,
            QoS::AtMostOnce,
            false,
            payload.as_bytes(),
        ) {
            warn!("Failed to publish notification: {e}.");
        }
    }
}
