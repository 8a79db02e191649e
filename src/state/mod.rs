//! Game state: the session aggregate, the phase machine, and modal editing.

pub mod name_edit;
pub mod session;
pub mod state_machine;

pub use self::name_edit::NameEdit;
pub use self::session::{GamePhase, GameSession, Player, SEATS, Seat, SessionRules};
pub use self::state_machine::{Effect, KeyCommand, handle_buzz, handle_key, handle_tick};
