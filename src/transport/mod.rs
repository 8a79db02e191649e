//! LED and buzzer transports.
//!
//! The state machine only ever sees the [`Transport`] capability: command one
//! LED (optionally exclusively), command them all, and poll for at most one
//! buzz event. Three backends satisfy it: direct GPIO pins, a
//! request/response serial board, and a pure simulation. The backend is
//! chosen once at startup; an unreachable serial device demotes to the
//! simulation rather than failing the show.

#[cfg(feature = "gpio")]
pub mod gpio;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sim;

use thiserror::Error;
use tracing::warn;

use crate::config::{AppConfig, Platform};
use crate::state::session::Seat;

pub use self::sim::{SimHandle, SimTransport};

/// Error raised by transport backends.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying device i/o failed.
    #[error("transport i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// Serial device could not be opened or driven.
    #[cfg(feature = "serial")]
    #[error("serial transport failed: {0}")]
    Serial(#[from] serialport::Error),
    /// GPIO subsystem could not be opened or driven.
    #[cfg(feature = "gpio")]
    #[error("gpio transport failed: {0}")]
    Gpio(#[from] rppal::gpio::Error),
    /// Serial device path does not exist.
    #[error("serial device {device} does not exist")]
    DeviceMissing {
        /// The configured device path.
        device: String,
    },
    /// The board never reported its reset handshake.
    #[error("no RESET OK handshake from {device}")]
    HandshakeTimeout {
        /// The configured device path.
        device: String,
    },
}

/// Abstract capability to drive the LED bank and report buzz-ins.
pub trait Transport {
    /// Write one LED's raw state. Backends implement only this primitive;
    /// the exclusive and all-LED forms are derived from it.
    fn write_led(&mut self, seat: Seat, on: bool) -> Result<(), TransportError>;

    /// Non-blocking: the next buffered buzz event, at most one per call.
    /// Simultaneous presses stay buffered and drain one per subsequent poll.
    fn poll_buzz_event(&mut self) -> Option<Seat>;

    /// Flush any queued device writes. No-op for backends without buffering.
    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Short backend name for logging.
    fn label(&self) -> &'static str;

    /// Command one LED; with `exclusive` every other LED is turned off
    /// first, atomically from the state machine's point of view.
    fn set_led(&mut self, seat: Seat, on: bool, exclusive: bool) -> Result<(), TransportError> {
        if exclusive {
            self.set_all_leds(false)?;
        }
        self.write_led(seat, on)
    }

    /// Command every LED to the same state.
    fn set_all_leds(&mut self, on: bool) -> Result<(), TransportError> {
        for seat in Seat::all() {
            self.write_led(seat, on)?;
        }
        Ok(())
    }
}

/// Bind the configured transport, demoting to the simulation when the
/// hardware is unavailable. This never fails: a buzzer board that cannot be
/// reached is a degradation, not a reason to cancel the show.
pub fn build(config: &AppConfig) -> Box<dyn Transport> {
    match config.platform {
        Platform::Sim => Box::new(SimTransport::new()),
        Platform::Serial => build_serial(config),
        Platform::Gpio => build_gpio(config),
    }
}

#[cfg(feature = "serial")]
fn build_serial(config: &AppConfig) -> Box<dyn Transport> {
    match serial::SerialTransport::open(&config.serial_device) {
        Ok(transport) => Box::new(transport),
        Err(err) => {
            warn!(
                device = %config.serial_device,
                error = %err,
                "serial board unavailable; falling back to simulated transport"
            );
            Box::new(SimTransport::new())
        }
    }
}

#[cfg(not(feature = "serial"))]
fn build_serial(_config: &AppConfig) -> Box<dyn Transport> {
    warn!("serial support not compiled in; using simulated transport");
    Box::new(SimTransport::new())
}

#[cfg(feature = "gpio")]
fn build_gpio(config: &AppConfig) -> Box<dyn Transport> {
    match gpio::GpioTransport::open(&config.button_pins, &config.led_pins) {
        Ok(transport) => Box::new(transport),
        Err(err) => {
            warn!(
                error = %err,
                "gpio unavailable; falling back to simulated transport"
            );
            Box::new(SimTransport::new())
        }
    }
}

#[cfg(not(feature = "gpio"))]
fn build_gpio(_config: &AppConfig) -> Box<dyn Transport> {
    warn!("gpio support not compiled in; using simulated transport");
    Box::new(SimTransport::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_platform_binds_the_simulation() {
        let config = AppConfig {
            platform: Platform::Sim,
            ..AppConfig::default()
        };
        assert_eq!(build(&config).label(), "sim");
    }

    #[cfg(feature = "serial")]
    #[test]
    fn missing_serial_device_demotes_to_sim() {
        let config = AppConfig {
            platform: Platform::Serial,
            serial_device: "/dev/definitely-not-a-buzzer-board".into(),
            ..AppConfig::default()
        };
        assert_eq!(build(&config).label(), "sim");
    }

    #[test]
    fn exclusive_set_led_clears_the_rest() {
        let mut transport = SimTransport::new();
        let handle = transport.handle();
        for seat in Seat::all() {
            transport.write_led(seat, true).unwrap();
        }

        let target = Seat::new(2).unwrap();
        transport.set_led(target, true, true).unwrap();

        assert_eq!(handle.leds(), [false, false, true, false]);
    }
}
