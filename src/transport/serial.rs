//! Serial transport: a microcontroller board speaking a line protocol over
//! USB serial.
//!
//! Outbound LED commands are ASCII `LED <n> <0|1>` lines with 1-based seat
//! numbers; the board reports presses as `SWITCH <n> PRESSED`. Opening the
//! port resets the board, which announces itself with a single `RESET OK`
//! line before normal traffic begins. Anything else on the wire is ignored
//! with a warning; a garbled line must never take the control loop down.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, info, warn};

use crate::state::session::Seat;
use crate::transport::{Transport, TransportError};

const BAUD_RATE: u32 = 115_200;
/// Per-read timeout while waiting on the reset handshake.
const READ_TIMEOUT: Duration = Duration::from_millis(50);
/// The board resets on open; give it this long to come back.
const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(10);

/// Transport backed by the serial buzzer board.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    rx_buffer: Vec<u8>,
    pending: VecDeque<Seat>,
    device: String,
}

impl SerialTransport {
    /// Open the board, wait for its reset handshake, and start clean.
    pub fn open(device: &str) -> Result<Self, TransportError> {
        if !Path::new(device).exists() {
            return Err(TransportError::DeviceMissing {
                device: device.into(),
            });
        }

        let port = serialport::new(device, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()?;

        let mut transport = Self {
            port,
            rx_buffer: Vec::new(),
            pending: VecDeque::new(),
            device: device.into(),
        };

        info!(device, "serial port open; waiting for board reset");
        transport.await_reset()?;
        // Start the game with no stale traffic from before the reset.
        transport.port.clear(ClearBuffer::All)?;
        transport.rx_buffer.clear();
        info!(device, "board reset complete");

        Ok(transport)
    }

    /// Block (bounded) until the board announces `RESET OK`.
    fn await_reset(&mut self) -> Result<(), TransportError> {
        let deadline = Instant::now() + HANDSHAKE_DEADLINE;
        let mut chunk = [0u8; 256];

        while Instant::now() < deadline {
            match self.port.read(&mut chunk) {
                Ok(0) => {}
                Ok(n) => self.rx_buffer.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {}
                Err(err) => return Err(err.into()),
            }

            while let Some(line) = self.take_line() {
                if line.trim_end() == "RESET OK" {
                    return Ok(());
                }
                debug!(line = %line.trim_end(), "ignoring pre-reset line");
            }
        }

        Err(TransportError::HandshakeTimeout {
            device: self.device.clone(),
        })
    }

    /// Pull whatever the board has sent and queue any recognized presses.
    fn pump(&mut self) {
        let available = match self.port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(err) => {
                warn!(device = %self.device, error = %err, "serial poll failed");
                return;
            }
        };
        if available > 0 {
            let mut chunk = vec![0u8; available];
            match self.port.read(&mut chunk) {
                Ok(n) => self.rx_buffer.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {}
                Err(err) => {
                    warn!(device = %self.device, error = %err, "serial read failed");
                    return;
                }
            }
        }

        while let Some(line) = self.take_line() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_switch_line(trimmed) {
                Some(seat) => self.pending.push_back(seat),
                None => warn!(line = %trimmed, "ignoring unrecognized serial line"),
            }
        }
    }

    /// Pop one complete line (through `\n`) off the receive buffer.
    fn take_line(&mut self) -> Option<String> {
        let newline = self.rx_buffer.iter().position(|byte| *byte == b'\n')?;
        let line: Vec<u8> = self.rx_buffer.drain(..=newline).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Parse a `SWITCH <n> PRESSED` line into a seat.
///
/// Tokenization is whitespace-delimited and tolerant of trailing tokens; a
/// switch number outside 1..=4 does not parse (the caller drops the line
/// with a warning rather than crashing on a miswired channel).
pub fn parse_switch_line(line: &str) -> Option<Seat> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 || tokens[0] != "SWITCH" || tokens[2] != "PRESSED" {
        return None;
    }
    tokens[1].parse::<u32>().ok().and_then(Seat::from_wire)
}

impl Transport for SerialTransport {
    fn write_led(&mut self, seat: Seat, on: bool) -> Result<(), TransportError> {
        let command = format!("LED {} {}\n", seat.wire(), u8::from(on));
        self.port.write_all(command.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    fn poll_buzz_event(&mut self) -> Option<Seat> {
        self.pump();
        self.pending.pop_front()
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.port.flush()?;
        Ok(())
    }

    fn label(&self) -> &'static str {
        "serial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_lines_map_one_based_numbers_to_seats() {
        assert_eq!(parse_switch_line("SWITCH 1 PRESSED"), Seat::new(0));
        assert_eq!(parse_switch_line("SWITCH 4 PRESSED"), Seat::new(3));
    }

    #[test]
    fn out_of_range_switch_numbers_do_not_parse() {
        assert_eq!(parse_switch_line("SWITCH 0 PRESSED"), None);
        assert_eq!(parse_switch_line("SWITCH 5 PRESSED"), None);
        assert_eq!(parse_switch_line("SWITCH -1 PRESSED"), None);
    }

    #[test]
    fn garbled_lines_do_not_parse() {
        assert_eq!(parse_switch_line(""), None);
        assert_eq!(parse_switch_line("SWITCH PRESSED"), None);
        assert_eq!(parse_switch_line("SWITCH two PRESSED"), None);
        assert_eq!(parse_switch_line("LED 1 1"), None);
        assert_eq!(parse_switch_line("RESET OK"), None);
    }

    #[test]
    fn trailing_tokens_are_tolerated() {
        assert_eq!(parse_switch_line("SWITCH 2 PRESSED debounce=3"), Seat::new(1));
    }
}
