//! Operator input: the key vocabulary, the MC key map, and event sources.
//!
//! The control loop never reads the terminal directly; it drains an
//! [`EventSource`], which lets tests script exact key sequences and lets the
//! production binary read crossterm events from a raw-mode terminal.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::warn;

use crate::state::session::Seat;
use crate::state::state_machine::KeyCommand;

/// A decoded keypress, independent of the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    /// Which key.
    pub code: KeyCode,
    /// Whether SHIFT was held.
    pub shift: bool,
}

/// The subset of keys the game cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// A printable character, case preserved.
    Char(char),
    /// Return key.
    Enter,
    /// Escape key.
    Esc,
    /// Backspace key.
    Backspace,
    /// Cursor up.
    Up,
    /// Cursor down.
    Down,
    /// Tab key.
    Tab,
}

impl Key {
    /// Convenience constructor for a plain character key.
    pub fn char(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            shift: false,
        }
    }
}

/// Translate a keypress into an operator command.
///
/// Returns `None` for keys outside the MC surface; the dispatcher decides
/// whether unmapped keys still matter (they dismiss help/splash, and any
/// keypress releases a buzzed-in seat).
pub fn map_operator_key(key: &Key) -> Option<KeyCommand> {
    match key.code {
        KeyCode::Esc if key.shift => Some(KeyCommand::Quit),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            '1' => Some(KeyCommand::AddPoint(Seat::new(0)?)),
            '2' => Some(KeyCommand::AddPoint(Seat::new(1)?)),
            '3' => Some(KeyCommand::AddPoint(Seat::new(2)?)),
            '4' => Some(KeyCommand::AddPoint(Seat::new(3)?)),
            'q' => Some(KeyCommand::DeductPoint(Seat::new(0)?)),
            'w' => Some(KeyCommand::DeductPoint(Seat::new(1)?)),
            'e' => Some(KeyCommand::DeductPoint(Seat::new(2)?)),
            'r' => Some(KeyCommand::DeductPoint(Seat::new(3)?)),
            ' ' => Some(KeyCommand::Space),
            'p' => Some(KeyCommand::AddTime),
            'l' => Some(KeyCommand::SubtractTime),
            'a' if key.shift => Some(KeyCommand::ResetGame),
            'z' if key.shift => Some(KeyCommand::ResetClock),
            'z' => Some(KeyCommand::SimulatedBuzz(Seat::new(0)?)),
            'x' => Some(KeyCommand::SimulatedBuzz(Seat::new(1)?)),
            'c' => Some(KeyCommand::SimulatedBuzz(Seat::new(2)?)),
            'v' => Some(KeyCommand::SimulatedBuzz(Seat::new(3)?)),
            'h' | '?' => Some(KeyCommand::Help),
            'i' => Some(KeyCommand::ToggleInvert),
            'n' => Some(KeyCommand::EditNames),
            's' => Some(KeyCommand::Splash),
            'b' => Some(KeyCommand::TestBuzzCue),
            't' => Some(KeyCommand::TestTimesUpCue),
            _ => None,
        },
        _ => None,
    }
}

/// Source of operator keypresses, drained non-blocking once per frame.
pub trait EventSource {
    /// Next pending keypress, or `None` when the queue is empty.
    fn poll_key(&mut self) -> Option<Key>;
}

/// Production source reading crossterm events from a raw-mode terminal.
///
/// Raw mode is enabled for the lifetime of the value and restored on drop so
/// a clean exit leaves the operator's terminal usable.
pub struct TerminalEvents {
    raw_mode: bool,
}

impl TerminalEvents {
    /// Switch the terminal into raw mode and start reading keys.
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { raw_mode: true })
    }
}

impl Drop for TerminalEvents {
    fn drop(&mut self) {
        if self.raw_mode {
            if let Err(err) = terminal::disable_raw_mode() {
                warn!(error = %err, "failed to restore terminal mode");
            }
        }
    }
}

impl EventSource for TerminalEvents {
    fn poll_key(&mut self) -> Option<Key> {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => {
                    warn!(error = %err, "terminal poll failed");
                    return None;
                }
            }

            let read = match event::read() {
                Ok(read) => read,
                Err(err) => {
                    warn!(error = %err, "terminal read failed");
                    return None;
                }
            };

            let Event::Key(key) = read else {
                continue; // resize, focus, paste: not ours
            };
            if key.kind == KeyEventKind::Release {
                continue;
            }

            let shift = key.modifiers.contains(KeyModifiers::SHIFT);
            // Case is preserved: the name editor wants it, and the command
            // map folds case itself.
            let code = match key.code {
                event::KeyCode::Char(c) => KeyCode::Char(c),
                event::KeyCode::Enter => KeyCode::Enter,
                event::KeyCode::Esc => KeyCode::Esc,
                event::KeyCode::Backspace => KeyCode::Backspace,
                event::KeyCode::Up => KeyCode::Up,
                event::KeyCode::Down => KeyCode::Down,
                event::KeyCode::Tab => KeyCode::Tab,
                _ => continue,
            };
            return Some(Key { code, shift });
        }
    }
}

/// Scripted source for tests and headless runs: keys are pushed through a
/// [`ScriptHandle`] and drained in order.
#[derive(Debug, Default)]
pub struct ScriptedEvents {
    queue: Rc<RefCell<VecDeque<Key>>>,
}

/// Writer side of a [`ScriptedEvents`] queue.
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    queue: Rc<RefCell<VecDeque<Key>>>,
}

impl ScriptedEvents {
    /// Build an empty scripted source plus the handle used to feed it.
    pub fn new() -> (Self, ScriptHandle) {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        (
            Self {
                queue: Rc::clone(&queue),
            },
            ScriptHandle { queue },
        )
    }
}

impl ScriptHandle {
    /// Queue one keypress.
    pub fn press(&self, key: Key) {
        self.queue.borrow_mut().push_back(key);
    }

    /// Queue a run of plain character keys.
    pub fn type_str(&self, text: &str) {
        for c in text.chars() {
            self.press(Key::char(c));
        }
    }
}

impl EventSource for ScriptedEvents {
    fn poll_key(&mut self) -> Option<Key> {
        self.queue.borrow_mut().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_add_points_in_seat_order() {
        for (c, index) in [('1', 0), ('2', 1), ('3', 2), ('4', 3)] {
            assert_eq!(
                map_operator_key(&Key::char(c)),
                Some(KeyCommand::AddPoint(Seat::new(index).unwrap()))
            );
        }
    }

    #[test]
    fn shift_distinguishes_resets_from_buzz_and_nothing() {
        let plain_z = Key::char('z');
        let shift_z = Key {
            code: KeyCode::Char('z'),
            shift: true,
        };
        assert_eq!(
            map_operator_key(&plain_z),
            Some(KeyCommand::SimulatedBuzz(Seat::new(0).unwrap()))
        );
        assert_eq!(map_operator_key(&shift_z), Some(KeyCommand::ResetClock));

        let plain_a = Key::char('a');
        let shift_a = Key {
            code: KeyCode::Char('a'),
            shift: true,
        };
        assert_eq!(map_operator_key(&plain_a), None);
        assert_eq!(map_operator_key(&shift_a), Some(KeyCommand::ResetGame));
    }

    #[test]
    fn quit_requires_shift_escape() {
        let esc = Key {
            code: KeyCode::Esc,
            shift: false,
        };
        let shift_esc = Key {
            code: KeyCode::Esc,
            shift: true,
        };
        assert_eq!(map_operator_key(&esc), None);
        assert_eq!(map_operator_key(&shift_esc), Some(KeyCommand::Quit));
    }

    #[test]
    fn help_answers_to_both_bindings() {
        assert_eq!(map_operator_key(&Key::char('h')), Some(KeyCommand::Help));
        assert_eq!(map_operator_key(&Key::char('?')), Some(KeyCommand::Help));
    }

    #[test]
    fn scripted_events_drain_in_order() {
        let (mut source, handle) = ScriptedEvents::new();
        handle.type_str("1q");
        assert_eq!(source.poll_key(), Some(Key::char('1')));
        assert_eq!(source.poll_key(), Some(Key::char('q')));
        assert_eq!(source.poll_key(), None);
    }
}
