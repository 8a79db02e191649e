//! Transition logic for the game phase machine.
//!
//! Handlers mutate the [`GameSession`] in place and report side effects as
//! explicit [`Effect`] values. The control loop executes the effects after the
//! transition, which keeps the machine free of transport, audio, and storage
//! handles and makes every transition assertable in tests.

use crate::sound::Cue;
use crate::state::session::{GamePhase, GameSession, Seat};

/// Operator commands produced by the key map.
///
/// This is the full MC command surface; raw-character input for the name
/// editor modal is routed separately and never reaches these handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Add one point to a seat (digit keys).
    AddPoint(Seat),
    /// Deduct one point from a seat (Q/W/E/R).
    DeductPoint(Seat),
    /// Space bar: the main start/stop/resume transition.
    Space,
    /// Add five seconds to the countdown.
    AddTime,
    /// Remove five seconds from the countdown, flooring at zero.
    SubtractTime,
    /// Zero all scores and reset the round (SHIFT+A).
    ResetGame,
    /// Reset the countdown only (SHIFT+Z).
    ResetClock,
    /// Open the help modal.
    Help,
    /// Toggle the persisted display-inversion flag.
    ToggleInvert,
    /// Open the name-editor modal.
    EditNames,
    /// Show the splash screen (Idle only).
    Splash,
    /// Audition the buzzer cue without touching game state.
    TestBuzzCue,
    /// Audition the time's-up cue without touching game state.
    TestTimesUpCue,
    /// Keyboard-simulated buzz-in for a seat (non-GPIO platforms).
    SimulatedBuzz(Seat),
    /// Clean shutdown (SHIFT+ESC).
    Quit,
}

/// A side effect requested by a transition, executed by the control loop in
/// the order emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Play an audio cue.
    PlayCue(Cue),
    /// Command one LED; `exclusive` turns every other LED off first.
    SetLed {
        /// Target seat.
        seat: Seat,
        /// Desired LED state.
        on: bool,
        /// Turn all other LEDs off before setting this one.
        exclusive: bool,
    },
    /// Command every LED to the same state.
    SetAllLeds(bool),
    /// Synchronously write the durable subset of session state.
    Persist,
    /// Fire the celebratory visual hook for a seat (rendering-side).
    Celebrate(Seat),
    /// End the control loop cleanly.
    Quit,
}

/// Apply one operator command.
///
/// Any keypress releases a buzzed-in seat before the command itself is
/// interpreted, so a stray key during `BuzzedIn` lands the game back in
/// `Idle` while SPACE falls through to the resume path.
pub fn handle_key(session: &mut GameSession, command: KeyCommand) -> Vec<Effect> {
    let mut effects = Vec::new();

    if matches!(command, KeyCommand::Quit) {
        effects.push(Effect::Quit);
        return effects;
    }

    // Help and splash are dismissed by any key.
    if matches!(
        session.phase,
        GamePhase::ShowingHelp | GamePhase::ShowingSplash
    ) {
        session.phase = GamePhase::Idle;
        return effects;
    }

    if session.phase == GamePhase::BuzzedIn {
        session.phase = GamePhase::Idle;
        session.buzzed_in = None;
    }

    match command {
        KeyCommand::AddPoint(seat) => {
            session.players[seat.index()].score += 1;
            effects.push(Effect::Persist);
        }
        KeyCommand::DeductPoint(seat) => {
            session.players[seat.index()].score -= 1;
            effects.push(Effect::Persist);
        }
        KeyCommand::Space => {
            effects.push(Effect::SetAllLeds(false));
            session.buzzed_in = None;
            match session.phase {
                GamePhase::Idle => {
                    effects.push(Effect::PlayCue(Cue::Beep));
                    session.phase = GamePhase::Running;
                }
                GamePhase::TimeUp => {
                    // The MC can add time first and continue from the
                    // remainder; only an untouched zero restarts at max.
                    if session.clock_remaining_ms == 0 {
                        session.clock_remaining_ms = session.rules.max_clock_ms;
                    }
                    session.phase = GamePhase::Running;
                }
                GamePhase::Running => {
                    session.phase = GamePhase::Idle;
                }
                // BuzzedIn was already folded into Idle above and the modal
                // phases never route here.
                _ => {}
            }
        }
        KeyCommand::AddTime => {
            session.clock_remaining_ms += 5_000;
        }
        KeyCommand::SubtractTime => {
            session.clock_remaining_ms = session.clock_remaining_ms.saturating_sub(5_000);
        }
        KeyCommand::ResetGame => {
            session.reset_game();
            effects.push(Effect::Persist);
        }
        KeyCommand::ResetClock => {
            session.reset_clock();
        }
        KeyCommand::Help => {
            session.phase = GamePhase::ShowingHelp;
        }
        KeyCommand::ToggleInvert => {
            session.invert_display = !session.invert_display;
            effects.push(Effect::Persist);
        }
        KeyCommand::EditNames => {
            session.phase = GamePhase::EditingNames;
        }
        KeyCommand::Splash => {
            if session.phase == GamePhase::Idle {
                session.phase = GamePhase::ShowingSplash;
            }
        }
        KeyCommand::TestBuzzCue => {
            effects.push(Effect::PlayCue(Cue::Buzz));
        }
        KeyCommand::TestTimesUpCue => {
            effects.push(Effect::PlayCue(Cue::TimesUp));
        }
        // Buzz simulation is resolved by the dispatcher while Running; in any
        // other phase the keypress has already done its release work above.
        KeyCommand::SimulatedBuzz(_) => {}
        KeyCommand::Quit => unreachable!("handled before phase routing"),
    }

    effects
}

/// Apply a keypress that maps to no command.
///
/// Unmapped keys still count as "any keypress": they release a buzzed-in
/// seat back to Idle. Help and splash dismissal for unmapped keys is routed
/// through [`handle_key`] by the dispatcher.
pub fn handle_unmapped_key(session: &mut GameSession) {
    if session.phase == GamePhase::BuzzedIn {
        session.phase = GamePhase::Idle;
        session.buzzed_in = None;
    }
}

/// Apply one tick of the periodic clock timer.
///
/// While Running (and the clock feature is on) the countdown loses one step
/// and the warning beep fires once per distinct second value at four seconds
/// or less. While Idle the tick instead advances the attract-mode chase.
/// The two are mutually exclusive by phase and never share a tick.
pub fn handle_tick(session: &mut GameSession) -> Vec<Effect> {
    let mut effects = Vec::new();

    match session.phase {
        GamePhase::Running if session.rules.clock_enabled && session.clock_remaining_ms > 0 => {
            session.clock_remaining_ms = session
                .clock_remaining_ms
                .saturating_sub(session.rules.clock_step_ms);

            let second = session.whole_seconds();
            if second != session.prev_second {
                session.prev_second = second;
                if second <= 4 {
                    effects.push(Effect::PlayCue(Cue::Beep));
                }
            }

            if session.clock_remaining_ms == 0 {
                effects.push(Effect::SetAllLeds(true));
                effects.push(Effect::PlayCue(Cue::TimesUp));
                session.phase = GamePhase::TimeUp;
            }
        }
        GamePhase::Idle => {
            let seat = session.led_attract_index;
            effects.push(Effect::SetLed {
                seat,
                on: true,
                exclusive: true,
            });
            session.led_attract_index = seat.next_wrapping();
        }
        _ => {}
    }

    effects
}

/// Honor a buzz-in that was observed while Running.
///
/// The caller (the dispatcher) owns the acceptance policy: first seat
/// observed per Running period wins, everything else is dropped, and at most
/// one buzz is resolved per frame.
pub fn handle_buzz(session: &mut GameSession, seat: Seat) -> Vec<Effect> {
    session.phase = GamePhase::BuzzedIn;
    session.buzzed_in = Some(seat);

    let cue = if session.rules.unique_player_sounds {
        Cue::Player(seat)
    } else {
        Cue::Buzz
    };

    vec![
        Effect::PlayCue(cue),
        Effect::SetLed {
            seat,
            on: true,
            exclusive: true,
        },
        Effect::Celebrate(seat),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::SessionRules;

    fn session() -> GameSession {
        GameSession::new(SessionRules::default())
    }

    fn seat(index: usize) -> Seat {
        Seat::new(index).unwrap()
    }

    fn assert_buzz_invariant(session: &GameSession) {
        assert_eq!(
            session.buzzed_in.is_some(),
            session.phase == GamePhase::BuzzedIn,
            "buzzed_in must be Some exactly while BuzzedIn"
        );
    }

    #[test]
    fn space_from_idle_starts_running() {
        let mut s = session();
        let effects = handle_key(&mut s, KeyCommand::Space);
        assert_eq!(s.phase, GamePhase::Running);
        assert_eq!(s.clock_remaining_ms, 60_000);
        assert!(effects.contains(&Effect::SetAllLeds(false)));
        assert!(effects.contains(&Effect::PlayCue(Cue::Beep)));
    }

    #[test]
    fn space_from_running_returns_to_idle() {
        let mut s = session();
        handle_key(&mut s, KeyCommand::Space);
        let effects = handle_key(&mut s, KeyCommand::Space);
        assert_eq!(s.phase, GamePhase::Idle);
        // Stopping the round is silent; only the LEDs are cleared.
        assert_eq!(effects, vec![Effect::SetAllLeds(false)]);
    }

    #[test]
    fn space_from_buzzed_in_resumes_running() {
        let mut s = session();
        s.phase = GamePhase::Running;
        handle_buzz(&mut s, seat(2));

        let effects = handle_key(&mut s, KeyCommand::Space);
        assert_eq!(s.phase, GamePhase::Running);
        assert_eq!(s.buzzed_in, None);
        assert!(effects.contains(&Effect::SetAllLeds(false)));
        assert!(effects.contains(&Effect::PlayCue(Cue::Beep)));
        assert_buzz_invariant(&s);
    }

    #[test]
    fn any_key_releases_buzzed_in_to_idle() {
        let mut s = session();
        s.phase = GamePhase::Running;
        handle_buzz(&mut s, seat(1));

        let effects = handle_key(&mut s, KeyCommand::DeductPoint(seat(0)));
        assert_eq!(s.phase, GamePhase::Idle);
        assert_eq!(s.buzzed_in, None);
        assert_eq!(s.players[0].score, -1);
        assert!(effects.contains(&Effect::Persist));
        assert_buzz_invariant(&s);
    }

    #[test]
    fn timeup_space_restarts_at_max_only_from_zero() {
        let mut s = session();
        s.phase = GamePhase::TimeUp;
        s.clock_remaining_ms = 0;
        handle_key(&mut s, KeyCommand::Space);
        assert_eq!(s.phase, GamePhase::Running);
        assert_eq!(s.clock_remaining_ms, 60_000);

        // Time added while TimeUp is kept on resume.
        let mut s = session();
        s.phase = GamePhase::TimeUp;
        s.clock_remaining_ms = 0;
        handle_key(&mut s, KeyCommand::AddTime);
        assert_eq!(s.phase, GamePhase::TimeUp);
        handle_key(&mut s, KeyCommand::Space);
        assert_eq!(s.phase, GamePhase::Running);
        assert_eq!(s.clock_remaining_ms, 5_000);
    }

    #[test]
    fn clock_adjustments_floor_at_zero_without_phase_change() {
        let mut s = session();
        s.phase = GamePhase::Running;
        s.clock_remaining_ms = 2_000;
        let effects = handle_key(&mut s, KeyCommand::SubtractTime);
        assert_eq!(s.clock_remaining_ms, 0);
        assert_eq!(s.phase, GamePhase::Running);
        assert!(effects.is_empty());

        handle_key(&mut s, KeyCommand::AddTime);
        assert_eq!(s.clock_remaining_ms, 5_000);
        assert_eq!(s.phase, GamePhase::Running);
    }

    #[test]
    fn scores_have_no_floor() {
        let mut s = session();
        s.players[0].score = 5;
        for _ in 0..6 {
            handle_key(&mut s, KeyCommand::DeductPoint(seat(0)));
        }
        assert_eq!(s.players[0].score, -1);
    }

    #[test]
    fn tick_decrements_only_while_running() {
        let mut s = session();
        let effects = handle_tick(&mut s);
        assert_eq!(s.clock_remaining_ms, 60_000);
        // Idle ticks drive the chase instead.
        assert!(matches!(effects[0], Effect::SetLed { exclusive: true, .. }));

        s.phase = GamePhase::Running;
        let effects = handle_tick(&mut s);
        assert_eq!(s.clock_remaining_ms, 59_000);
        assert!(effects.is_empty(), "no chase and no beep this far from zero");
    }

    #[test]
    fn attract_chase_walks_all_seats() {
        let mut s = session();
        let mut lit = Vec::new();
        for _ in 0..5 {
            for effect in handle_tick(&mut s) {
                if let Effect::SetLed { seat, on: true, .. } = effect {
                    lit.push(seat.index());
                }
            }
        }
        assert_eq!(lit, vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn warning_beep_fires_once_per_second_value() {
        let rules = SessionRules {
            clock_step_ms: 250,
            ..SessionRules::default()
        };
        let mut s = GameSession::new(rules);
        s.phase = GamePhase::Running;
        s.clock_remaining_ms = 4_500;
        s.prev_second = 4; // 4.5s displays as 4

        let mut beeps = 0;
        for _ in 0..2 {
            // 4_500 -> 4_250 -> 4_000: stays on second 4 the whole way.
            beeps += handle_tick(&mut s)
                .iter()
                .filter(|e| **e == Effect::PlayCue(Cue::Beep))
                .count();
        }
        assert_eq!(beeps, 0, "no edge while the displayed second is unchanged");

        // Crossing into 3 beeps exactly once even with four ticks that second.
        for _ in 0..4 {
            beeps += handle_tick(&mut s)
                .iter()
                .filter(|e| **e == Effect::PlayCue(Cue::Beep))
                .count();
        }
        assert_eq!(beeps, 1);
    }

    #[test]
    fn depletion_lights_everything_and_times_up() {
        let mut s = session();
        s.phase = GamePhase::Running;
        s.clock_remaining_ms = 1_000;
        s.prev_second = 1;

        let effects = handle_tick(&mut s);
        assert_eq!(s.phase, GamePhase::TimeUp);
        assert_eq!(s.clock_remaining_ms, 0);
        assert!(effects.contains(&Effect::SetAllLeds(true)));
        assert!(effects.contains(&Effect::PlayCue(Cue::TimesUp)));
        assert_buzz_invariant(&s);
    }

    #[test]
    fn buzz_lights_one_seat_exclusively() {
        let mut s = session();
        s.phase = GamePhase::Running;
        let effects = handle_buzz(&mut s, seat(2));

        assert_eq!(s.phase, GamePhase::BuzzedIn);
        assert_eq!(s.buzzed_in, seat(2).into());
        assert_eq!(effects[0], Effect::PlayCue(Cue::Buzz));
        assert_eq!(
            effects[1],
            Effect::SetLed {
                seat: seat(2),
                on: true,
                exclusive: true
            }
        );
        assert_eq!(effects[2], Effect::Celebrate(seat(2)));
        assert_buzz_invariant(&s);
    }

    #[test]
    fn unique_player_sounds_pick_the_seat_cue() {
        let rules = SessionRules {
            unique_player_sounds: true,
            ..SessionRules::default()
        };
        let mut s = GameSession::new(rules);
        s.phase = GamePhase::Running;
        let effects = handle_buzz(&mut s, seat(3));
        assert_eq!(effects[0], Effect::PlayCue(Cue::Player(seat(3))));
    }

    #[test]
    fn splash_only_opens_from_idle() {
        let mut s = session();
        s.phase = GamePhase::Running;
        handle_key(&mut s, KeyCommand::Splash);
        assert_eq!(s.phase, GamePhase::Running);

        s.phase = GamePhase::Idle;
        handle_key(&mut s, KeyCommand::Splash);
        assert_eq!(s.phase, GamePhase::ShowingSplash);

        // Dismissed by any key, back to Idle; the key itself is swallowed.
        handle_key(&mut s, KeyCommand::AddTime);
        assert_eq!(s.phase, GamePhase::Idle);
        assert_eq!(s.clock_remaining_ms, 60_000);
    }

    #[test]
    fn quit_works_from_any_phase() {
        for phase in [
            GamePhase::Idle,
            GamePhase::Running,
            GamePhase::TimeUp,
            GamePhase::ShowingHelp,
            GamePhase::ShowingSplash,
        ] {
            let mut s = session();
            s.phase = phase;
            let effects = handle_key(&mut s, KeyCommand::Quit);
            assert_eq!(effects, vec![Effect::Quit]);
        }
    }

    #[test]
    fn invert_toggle_persists() {
        let mut s = session();
        let before = s.invert_display;
        let effects = handle_key(&mut s, KeyCommand::ToggleInvert);
        assert_eq!(s.invert_display, !before);
        assert!(effects.contains(&Effect::Persist));
    }
}
