//! Raspberry Pi GPIO transport: buttons on input pins with pull-ups, LEDs on
//! output pins.
//!
//! Buttons pull their pin to ground when pressed. The control loop polls at
//! frame rate, which comfortably outpaces a human press; edges are detected
//! in software with a 50 ms debounce and buffered so simultaneous presses
//! drain one per poll, the same contract as the other backends.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::info;

use crate::state::session::{SEATS, Seat};
use crate::transport::{Transport, TransportError};

const DEBOUNCE: Duration = Duration::from_millis(50);

/// Transport wired straight to the Pi's GPIO header.
pub struct GpioTransport {
    buttons: Vec<InputPin>,
    leds: Vec<OutputPin>,
    pressed: [bool; SEATS],
    last_edge: [Instant; SEATS],
    pending: VecDeque<Seat>,
}

impl GpioTransport {
    /// Claim the configured pins: buttons as pulled-up inputs, LEDs as
    /// outputs driven low.
    pub fn open(
        button_pins: &[u8; SEATS],
        led_pins: &[u8; SEATS],
    ) -> Result<Self, TransportError> {
        let gpio = Gpio::new()?;

        let mut buttons = Vec::with_capacity(SEATS);
        for pin in button_pins {
            buttons.push(gpio.get(*pin)?.into_input_pullup());
        }

        let mut leds = Vec::with_capacity(SEATS);
        for pin in led_pins {
            let mut led = gpio.get(*pin)?.into_output();
            led.set_low();
            leds.push(led);
        }

        info!(?button_pins, ?led_pins, "gpio transport ready");

        Ok(Self {
            buttons,
            leds,
            pressed: [false; SEATS],
            last_edge: [Instant::now(); SEATS],
            pending: VecDeque::new(),
        })
    }

    /// Scan all buttons for debounced falling edges.
    fn scan(&mut self) {
        let now = Instant::now();
        for (index, button) in self.buttons.iter().enumerate() {
            let down = button.is_low();
            if down == self.pressed[index] {
                continue;
            }
            if now.duration_since(self.last_edge[index]) < DEBOUNCE {
                continue;
            }
            self.pressed[index] = down;
            self.last_edge[index] = now;
            if down {
                if let Some(seat) = Seat::new(index) {
                    self.pending.push_back(seat);
                }
            }
        }
    }
}

impl Transport for GpioTransport {
    fn write_led(&mut self, seat: Seat, on: bool) -> Result<(), TransportError> {
        let led = &mut self.leds[seat.index()];
        if on {
            led.set_high();
        } else {
            led.set_low();
        }
        Ok(())
    }

    fn poll_buzz_event(&mut self) -> Option<Seat> {
        self.scan();
        self.pending.pop_front()
    }

    fn label(&self) -> &'static str {
        "gpio"
    }
}
