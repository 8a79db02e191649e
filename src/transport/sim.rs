//! Pure-simulation transport: no hardware, LEDs as state, buzz-ins injected
//! by the keyboard layer or by tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::state::session::{SEATS, Seat};
use crate::transport::{Transport, TransportError};

#[derive(Debug, Default)]
struct SimState {
    leds: [bool; SEATS],
    pending: VecDeque<Seat>,
}

/// Simulated buzzer board. Used directly on the `sim` platform and as the
/// demotion target when real hardware is unreachable.
#[derive(Debug, Default)]
pub struct SimTransport {
    state: Rc<RefCell<SimState>>,
}

/// Shared view of a [`SimTransport`], for injecting buzz events and
/// inspecting the LED bank from outside the control loop.
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Rc<RefCell<SimState>>,
}

impl SimTransport {
    /// Fresh board with all LEDs off and no pending presses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for injecting presses and reading LED state.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Rc::clone(&self.state),
        }
    }
}

impl SimHandle {
    /// Simulate a button press. Buffered; the loop drains one per poll.
    pub fn push_buzz(&self, seat: Seat) {
        self.state.borrow_mut().pending.push_back(seat);
    }

    /// Current LED bank, in seat order.
    pub fn leds(&self) -> [bool; SEATS] {
        self.state.borrow().leds
    }
}

impl Transport for SimTransport {
    fn write_led(&mut self, seat: Seat, on: bool) -> Result<(), TransportError> {
        self.state.borrow_mut().leds[seat.index()] = on;
        Ok(())
    }

    fn poll_buzz_event(&mut self) -> Option<Seat> {
        self.state.borrow_mut().pending.pop_front()
    }

    fn label(&self) -> &'static str {
        "sim"
    }
}
