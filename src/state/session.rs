//! The session aggregate: seats, players, clock state, and the phase tag.

use serde::{Deserialize, Serialize};

use crate::store::PersistedState;

/// Number of player seats on the board. The rest of the crate is written
/// against this constant, but the buzzer wire protocol, the key map, and the
/// persisted record all assume exactly four.
pub const SEATS: usize = 4;

/// One of the four fixed player slots, identified by a stable 0-based index.
///
/// The index *is* player identity for buzzer mapping purposes; the 1-based
/// numbering used on the serial wire exists only at that boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seat(u8);

impl Seat {
    /// Build a seat from a 0-based index, rejecting anything past the board.
    pub fn new(index: usize) -> Option<Self> {
        (index < SEATS).then(|| Self(index as u8))
    }

    /// Build a seat from the 1-based numbering used by the serial protocol.
    pub fn from_wire(number: u32) -> Option<Self> {
        (1..=SEATS as u32)
            .contains(&number)
            .then(|| Self((number - 1) as u8))
    }

    /// 0-based index into per-seat arrays.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// 1-based seat number as written on the serial wire.
    pub fn wire(self) -> u32 {
        u32::from(self.0) + 1
    }

    /// All seats in board order.
    pub fn all() -> impl Iterator<Item = Seat> {
        (0..SEATS as u8).map(Seat)
    }

    /// The next seat, wrapping 3 back to 0. Drives the attract-mode chase.
    pub fn next_wrapping(self) -> Seat {
        Seat((self.0 + 1) % SEATS as u8)
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seat {}", self.wire())
    }
}

/// One contestant slot: display name, running score, and the last LED state
/// commanded for this seat.
///
/// `led_on` is observational only (it feeds the on-screen debug overlay); the
/// authoritative LED truth is whatever was last pushed through the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Display name, editable through the name editor.
    pub name: String,
    /// Running score. Deliberately unbounded in both directions: a deduction
    /// on a zero score yields −1, which is intended venue behavior.
    pub score: i64,
    /// Mirror of the last commanded LED state for this seat.
    pub led_on: bool,
}

/// Clock and sound rules fixed at startup from the loaded configuration.
#[derive(Debug, Clone, Copy)]
pub struct SessionRules {
    /// Countdown starting value in milliseconds.
    pub max_clock_ms: u64,
    /// Amount removed per clock tick, in milliseconds.
    pub clock_step_ms: u64,
    /// When false the countdown neither runs nor gates the idle state.
    pub clock_enabled: bool,
    /// Play a per-seat cue on buzz-in instead of the shared buzzer cue.
    pub unique_player_sounds: bool,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            max_clock_ms: 60_000,
            clock_step_ms: 1_000,
            clock_enabled: true,
            unique_player_sounds: false,
        }
    }
}

/// The finite set of states the game can be in. Exactly one is active at any
/// moment and every input path is gated on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Waiting to start; LEDs run the attract chase.
    Idle,
    /// Countdown live, buzzers armed.
    Running,
    /// A seat has buzzed in; play is suspended until the MC resumes.
    BuzzedIn,
    /// Countdown reached zero.
    TimeUp,
    /// Modal: operator is editing player names.
    EditingNames,
    /// Modal: help screen is up.
    ShowingHelp,
    /// Modal: splash screen is up.
    ShowingSplash,
}

/// Root aggregate for one process lifetime: the roster, the countdown, and
/// the current phase. Created once at startup, optionally overlaid with the
/// persisted record, then mutated exclusively by the control loop.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Current phase.
    pub phase: GamePhase,
    /// Countdown remainder in milliseconds. Never negative; all decrements
    /// saturate at zero.
    pub clock_remaining_ms: u64,
    /// Last whole-second value observed by the tick handler. Used to
    /// edge-trigger the warning beep once per distinct second.
    pub prev_second: u64,
    /// The four contestant slots, in seat order.
    pub players: [Player; SEATS],
    /// The seat that buzzed in. `Some` exactly while `phase == BuzzedIn`.
    pub buzzed_in: Option<Seat>,
    /// Cursor for the idle attract chase.
    pub led_attract_index: Seat,
    /// Display orientation flag, persisted across runs.
    pub invert_display: bool,
    /// Debug overlay flag; never consulted by transition logic.
    pub button_test_mode: bool,
    /// Rules fixed at startup.
    pub rules: SessionRules,
}

impl GameSession {
    /// Build a fresh session with default names and zero scores.
    ///
    /// With the clock disabled there is nothing for Idle to wait on, so the
    /// session starts directly in `Running` with buzzers armed.
    pub fn new(rules: SessionRules) -> Self {
        let players = std::array::from_fn(|i| Player {
            name: format!("Player {}", i + 1),
            score: 0,
            led_on: false,
        });

        Self {
            phase: if rules.clock_enabled {
                GamePhase::Idle
            } else {
                GamePhase::Running
            },
            clock_remaining_ms: rules.max_clock_ms,
            prev_second: 0,
            players,
            buzzed_in: None,
            led_attract_index: Seat::new(0).expect("seat 0 exists"),
            invert_display: true,
            button_test_mode: false,
            rules,
        }
    }

    /// Zero all scores and reset the round. Idempotent.
    pub fn reset_game(&mut self) {
        for player in &mut self.players {
            player.score = 0;
        }
        self.reset_clock();
    }

    /// Reset the countdown and return to Idle, releasing any buzzed-in seat.
    /// Scores are untouched. Idempotent.
    pub fn reset_clock(&mut self) {
        self.clock_remaining_ms = self.rules.max_clock_ms;
        self.prev_second = 0;
        self.phase = GamePhase::Idle;
        self.buzzed_in = None;
    }

    /// Overlay the durable subset of state from a restored record.
    pub fn apply_persisted(&mut self, record: PersistedState) {
        for (player, name) in self.players.iter_mut().zip(record.player_names) {
            player.name = name;
        }
        for (player, score) in self.players.iter_mut().zip(record.scores) {
            player.score = score;
        }
        self.invert_display = record.invert_display;
    }

    /// Snapshot the durable subset of state for a synchronous save.
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            player_names: std::array::from_fn(|i| self.players[i].name.clone()),
            scores: std::array::from_fn(|i| self.players[i].score),
            invert_display: self.invert_display,
        }
    }

    /// Whole seconds left on the countdown.
    pub fn whole_seconds(&self) -> u64 {
        self.clock_remaining_ms / 1_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_wire_numbering_is_one_based() {
        let seat = Seat::from_wire(1).unwrap();
        assert_eq!(seat.index(), 0);
        assert_eq!(seat.wire(), 1);
        assert!(Seat::from_wire(0).is_none());
        assert!(Seat::from_wire(5).is_none());
    }

    #[test]
    fn attract_cursor_wraps() {
        let mut seat = Seat::new(0).unwrap();
        let mut visited = Vec::new();
        for _ in 0..5 {
            visited.push(seat.index());
            seat = seat.next_wrapping();
        }
        assert_eq!(visited, vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn new_session_starts_idle_with_full_clock() {
        let session = GameSession::new(SessionRules::default());
        assert_eq!(session.phase, GamePhase::Idle);
        assert_eq!(session.clock_remaining_ms, 60_000);
        assert!(session.buzzed_in.is_none());
        assert!(session.players.iter().all(|p| p.score == 0));
    }

    #[test]
    fn disabled_clock_starts_running() {
        let rules = SessionRules {
            clock_enabled: false,
            ..SessionRules::default()
        };
        assert_eq!(GameSession::new(rules).phase, GamePhase::Running);
    }

    #[test]
    fn reset_game_is_idempotent() {
        let mut session = GameSession::new(SessionRules::default());
        session.players[2].score = 7;
        session.clock_remaining_ms = 1_234;
        session.phase = GamePhase::BuzzedIn;
        session.buzzed_in = Seat::new(2);

        session.reset_game();
        let once = session.clone();
        session.reset_game();

        assert_eq!(session.phase, once.phase);
        assert_eq!(session.clock_remaining_ms, once.clock_remaining_ms);
        assert_eq!(session.players, once.players);
        assert_eq!(session.buzzed_in, once.buzzed_in);
    }

    #[test]
    fn reset_clock_keeps_scores() {
        let mut session = GameSession::new(SessionRules::default());
        session.players[0].score = 3;
        session.clock_remaining_ms = 500;
        session.reset_clock();
        assert_eq!(session.players[0].score, 3);
        assert_eq!(session.clock_remaining_ms, 60_000);
        assert_eq!(session.phase, GamePhase::Idle);
    }

    #[test]
    fn persisted_snapshot_round_trips_through_session() {
        let mut session = GameSession::new(SessionRules::default());
        session.players[1].name = "Dot".into();
        session.players[1].score = -2;
        session.invert_display = false;

        let record = session.to_persisted();
        let mut fresh = GameSession::new(SessionRules::default());
        fresh.apply_persisted(record);

        assert_eq!(fresh.players[1].name, "Dot");
        assert_eq!(fresh.players[1].score, -2);
        assert!(!fresh.invert_display);
    }
}
