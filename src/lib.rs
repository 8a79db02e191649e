//! Four-player game-show buzzer controller: countdown clock, score board,
//! LED indicator bank, and buzz-in arbitration driven by GPIO pins, a
//! serial-connected button board, or simulated keyboard input.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod present;
pub mod sound;
pub mod state;
pub mod store;
pub mod transport;
