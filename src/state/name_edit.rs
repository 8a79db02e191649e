//! Modal editing session for the four player names.
//!
//! The text-input *widget* (cursor drawing, fonts) lives with the renderer;
//! this is only the editing model the dispatcher routes keys into while the
//! game sits in [`GamePhase::EditingNames`]. Field moves commit the current
//! buffer and persist immediately, matching the rest of the crate's
//! write-on-every-mutation policy. There is no cancel path: leaving the
//! editor keeps whatever was typed.

use crate::input::{Key, KeyCode};
use crate::state::session::{GamePhase, GameSession, Seat};
use crate::state::state_machine::Effect;

/// In-progress name editing: the active row and its working buffer.
#[derive(Debug)]
pub struct NameEdit {
    active: Seat,
    buffer: String,
}

impl NameEdit {
    /// Begin editing at the first seat, seeded with its current name.
    pub fn begin(session: &GameSession) -> Self {
        let active = Seat::new(0).expect("seat 0 exists");
        Self {
            buffer: session.players[active.index()].name.clone(),
            active,
        }
    }

    /// Seat whose name is currently being edited.
    pub fn active(&self) -> Seat {
        self.active
    }

    /// The working buffer for the active seat.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Route one key into the editor.
    ///
    /// Returns `true` while the modal stays open; `false` once it closed and
    /// the caller should drop this value. ESC closes, UP moves a row back,
    /// DOWN/TAB/ENTER move a row forward, wrapping in both directions.
    pub fn handle_key(
        &mut self,
        session: &mut GameSession,
        key: &Key,
        effects: &mut Vec<Effect>,
    ) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.commit(session, effects);
                session.phase = GamePhase::Idle;
                false
            }
            KeyCode::Up => {
                self.commit(session, effects);
                self.move_to(session, self.active.index().checked_sub(1).unwrap_or(3));
                true
            }
            KeyCode::Down | KeyCode::Tab | KeyCode::Enter => {
                self.commit(session, effects);
                self.move_to(session, (self.active.index() + 1) % 4);
                true
            }
            KeyCode::Backspace => {
                self.buffer.pop();
                true
            }
            KeyCode::Char(c) if !c.is_control() => {
                self.buffer.push(c);
                true
            }
            _ => true,
        }
    }

    fn commit(&mut self, session: &mut GameSession, effects: &mut Vec<Effect>) {
        session.players[self.active.index()].name = self.buffer.trim().to_string();
        effects.push(Effect::Persist);
    }

    fn move_to(&mut self, session: &GameSession, index: usize) {
        self.active = Seat::new(index).expect("wrapped seat index");
        self.buffer = session.players[index].name.clone();
    }
}
