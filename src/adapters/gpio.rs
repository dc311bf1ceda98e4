//! GPIO adapters.
//!
//! - **`target_os = "espidf"`** — [`EspGpioAdapter`] drives real pins
//!   through `esp-idf-hal`, one `PinDriver` per acquired line.
//! - **`not(target_os = "espidf")`** — [`SimGpioAdapter`] tracks line
//!   state in-memory for host-side testing and simulation.
//!
//! Both enforce the resource contract: a line is held by at most one
//! owner, and only held lines can be driven.

// ═══════════════════════════════════════════════════════════════
//  ESP-IDF backend
// ═══════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
mod esp {
    use std::collections::BTreeMap;

    use embedded_hal::digital::OutputPin;
    use esp_idf_hal::gpio::{AnyIOPin, Output, PinDriver};
    use log::{info, warn};

    use crate::app::ports::GpioPort;

    /// Adapter that owns one output `PinDriver` per acquired line.
    pub struct EspGpioAdapter {
        lines: BTreeMap<u32, PinDriver<'static, AnyIOPin, Output>>,
    }

    impl EspGpioAdapter {
        pub fn new() -> Self {
            Self {
                lines: BTreeMap::new(),
            }
        }
    }

    impl GpioPort for EspGpioAdapter {
        fn acquire_output_line(&mut self, line: u32) -> bool {
            if self.lines.contains_key(&line) {
                info!(
                    "Ignoring request to acquire output line {line} because it has \
                     already been acquired."
                );
                return false;
            }

            // SAFETY: exclusive ownership of the pin number is enforced by
            // the acquired map — each line becomes a driver at most once at
            // a time, and the pin object never escapes this adapter.
            let pin = unsafe { AnyIOPin::new(line as i32) };
            match PinDriver::output(pin) {
                Ok(driver) => {
                    self.lines.insert(line, driver);
                    true
                }
                Err(e) => {
                    warn!("Failed to acquire output line {line}: {e}.");
                    false
                }
            }
        }

        fn release_output_line(&mut self, line: u32) -> bool {
            if self.lines.remove(&line).is_none() {
                info!("Tried to release output line {line}, but it was not acquired.");
                return false;
            }
            // Dropping the PinDriver resets the pin to its input default.
            true
        }

        fn set_line_active(&mut self, line: u32) -> bool {
            let Some(driver) = self.lines.get_mut(&line) else {
                warn!("Tried to drive output line {line}, but it is not acquired.");
                return false;
            };
            match driver.set_high() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to drive output line {line} active: {e}.");
                    false
                }
            }
        }

        fn set_line_inactive(&mut self, line: u32) -> bool {
            let Some(driver) = self.lines.get_mut(&line) else {
                warn!("Tried to drive output line {line}, but it is not acquired.");
                return false;
            };
            match driver.set_low() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to drive output line {line} inactive: {e}.");
                    false
                }
            }
        }

        fn acquired_lines(&self) -> Vec<u32> {
            self.lines.keys().copied().collect()
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::EspGpioAdapter;

// ═══════════════════════════════════════════════════════════════
//  Simulation backend (host)
// ═══════════════════════════════════════════════════════════════

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::collections::BTreeSet;

    use log::{info, warn};

    use crate::app::ports::GpioPort;

    /// In-memory line state for host tests.
    pub struct SimGpioAdapter {
        chip_available: bool,
        acquired: BTreeSet<u32>,
        active: BTreeSet<u32>,
    }

    impl SimGpioAdapter {
        /// A healthy simulated chip.
        pub fn new() -> Self {
            Self {
                chip_available: true,
                acquired: BTreeSet::new(),
                active: BTreeSet::new(),
            }
        }

        /// A chip that failed to open: every acquisition fails.
        pub fn disconnected() -> Self {
            Self {
                chip_available: false,
                ..Self::new()
            }
        }

        /// Test inspection: is the line currently driven active?
        pub fn is_line_active(&self, line: u32) -> bool {
            self.active.contains(&line)
        }
    }

    impl GpioPort for SimGpioAdapter {
        fn acquire_output_line(&mut self, line: u32) -> bool {
            if !self.chip_available {
                warn!("Tried to acquire output line {line}, but there is no chip.");
                return false;
            }
            if !self.acquired.insert(line) {
                info!(
                    "Ignoring request to acquire output line {line} because it has \
                     already been acquired."
                );
                return false;
            }
            true
        }

        fn release_output_line(&mut self, line: u32) -> bool {
            if !self.acquired.remove(&line) {
                info!("Tried to release output line {line}, but it was not acquired.");
                return false;
            }
            self.active.remove(&line);
            true
        }

        fn set_line_active(&mut self, line: u32) -> bool {
            if !self.acquired.contains(&line) {
                warn!("Tried to drive output line {line}, but it is not acquired.");
                return false;
            }
            self.active.insert(line);
            true
        }

        fn set_line_inactive(&mut self, line: u32) -> bool {
            if !self.acquired.contains(&line) {
                warn!("Tried to drive output line {line}, but it is not acquired.");
                return false;
            }
            self.active.remove(&line);
            true
        }

        fn acquired_lines(&self) -> Vec<u32> {
            self.acquired.iter().copied().collect()
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::SimGpioAdapter;
