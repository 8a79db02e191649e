//! The fixed-rate control loop.
//!
//! One frame, in this order: poll the transport for a buzz signal, drain
//! every queued keypress, resolve at most one pending buzz, apply at most
//! one clock tick if due, then hand the post-transition state to the
//! presenter. The order is load-bearing:
//!
//! * keypresses run before buzz resolution and the tick, so the MC's manual
//!   override always wins over a simultaneous buzz or timeout;
//! * buzz resolution runs before the tick, so a buzz observed while Running
//!   beats clock depletion landing in the same frame and never picks up
//!   spurious time's-up side effects.
//!
//! Everything runs on this one thread. Transports that need real interrupt
//! sources only enqueue into their own buffers; the session is touched here
//! and nowhere else.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, Platform};
use crate::input::{EventSource, Key, map_operator_key};
use crate::present::Presenter;
use crate::sound::SoundPlayer;
use crate::state::name_edit::NameEdit;
use crate::state::session::{GamePhase, GameSession, Seat};
use crate::state::state_machine::{
    self, Effect, KeyCommand, handle_buzz, handle_key, handle_tick,
};
use crate::store::StateStore;
use crate::transport::Transport;

/// The event dispatcher: owns the session and every collaborator seam, and
/// advances the game one frame at a time.
pub struct ControlLoop {
    session: GameSession,
    transport: Box<dyn Transport>,
    store: Box<dyn StateStore>,
    sounds: Box<dyn SoundPlayer>,
    presenter: Box<dyn Presenter>,
    events: Box<dyn EventSource>,
    /// Keyboard buzz simulation is disabled when real GPIO buttons exist.
    allow_sim_buzz: bool,
    /// First buzz observed this Running period, waiting for resolution.
    pending_buzz: Option<Seat>,
    /// Live name-editor model while the EditingNames modal is up.
    name_edit: Option<NameEdit>,
    frame_interval: Duration,
    tick_interval: Duration,
    next_tick: Instant,
    running: bool,
}

impl ControlLoop {
    /// Wire up a loop from the configured collaborators.
    pub fn new(
        session: GameSession,
        transport: Box<dyn Transport>,
        store: Box<dyn StateStore>,
        sounds: Box<dyn SoundPlayer>,
        presenter: Box<dyn Presenter>,
        events: Box<dyn EventSource>,
        config: &AppConfig,
    ) -> Self {
        let tick_interval = Duration::from_millis(config.clock_step_ms);
        Self {
            session,
            transport,
            store,
            sounds,
            presenter,
            events,
            allow_sim_buzz: config.platform != Platform::Gpio,
            pending_buzz: None,
            name_edit: None,
            frame_interval: Duration::from_secs_f64(1.0 / f64::from(config.frame_rate)),
            tick_interval,
            next_tick: Instant::now() + tick_interval,
            running: true,
        }
    }

    /// Read access to the session, for presentation shells and tests.
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Run frames at the configured rate until a clean-exit command.
    pub fn run(&mut self) {
        if let Err(err) = self.transport.set_all_leds(false) {
            warn!(error = %err, "could not clear leds at startup");
        }
        info!(transport = self.transport.label(), "all systems go; game running");

        while self.running {
            let frame_start = Instant::now();

            let tick_due = frame_start >= self.next_tick;
            if tick_due {
                self.next_tick += self.tick_interval;
                if self.next_tick <= frame_start {
                    // Fell behind (debugger, suspended laptop): skip the
                    // missed ticks instead of bursting through them.
                    self.next_tick = frame_start + self.tick_interval;
                }
            }

            self.frame(tick_due);

            if let Some(rest) = self.frame_interval.checked_sub(frame_start.elapsed()) {
                thread::sleep(rest);
            }
        }

        self.shutdown();
    }

    /// Advance the game by one frame. Public so tests and headless shells
    /// can drive the loop with a deterministic tick schedule.
    pub fn frame(&mut self, tick_due: bool) {
        if let Some(seat) = self.transport.poll_buzz_event() {
            self.observe_buzz(seat);
        }

        while let Some(key) = self.events.poll_key() {
            self.route_key(key);
            if !self.running {
                return;
            }
        }

        if let Some(seat) = self.pending_buzz.take() {
            // Re-checked here: a keypress this frame may have ended the
            // Running period, and the MC's call stands.
            if self.session.phase == GamePhase::Running {
                let effects = handle_buzz(&mut self.session, seat);
                self.apply(effects);
            } else {
                debug!(%seat, phase = ?self.session.phase, "pending buzz superseded");
            }
        }

        if tick_due {
            let effects = handle_tick(&mut self.session);
            self.apply(effects);
        }

        self.presenter.present(&self.session);
    }

    /// Record a buzz signal observed this frame. Accepted only while
    /// Running; first seat wins, the rest are dropped, never queued.
    fn observe_buzz(&mut self, seat: Seat) {
        if self.session.phase == GamePhase::Running && self.pending_buzz.is_none() {
            self.pending_buzz = Some(seat);
        } else {
            debug!(%seat, phase = ?self.session.phase, "dropping buzz signal");
        }
    }

    /// Route one keypress according to the current phase.
    fn route_key(&mut self, key: Key) {
        match self.session.phase {
            GamePhase::EditingNames => {
                let Some(mut editor) = self.name_edit.take() else {
                    // Phase was forced externally; recover by opening fresh.
                    self.name_edit = Some(NameEdit::begin(&self.session));
                    return;
                };
                let mut effects = Vec::new();
                if editor.handle_key(&mut self.session, &key, &mut effects) {
                    self.name_edit = Some(editor);
                }
                self.apply(effects);
            }
            GamePhase::ShowingHelp | GamePhase::ShowingSplash => {
                // Any key dismisses the modal; unmapped keys count too, and
                // SHIFT+ESC still quits.
                let command = map_operator_key(&key).unwrap_or(KeyCommand::Help);
                let effects = handle_key(&mut self.session, command);
                self.apply(effects);
            }
            _ => {
                let Some(command) = map_operator_key(&key) else {
                    state_machine::handle_unmapped_key(&mut self.session);
                    return;
                };

                if let KeyCommand::SimulatedBuzz(seat) = command {
                    if self.allow_sim_buzz && self.session.phase == GamePhase::Running {
                        self.observe_buzz(seat);
                        return;
                    }
                }
                if command == KeyCommand::Space {
                    // Manual override: a simultaneous buzz loses to SPACE.
                    self.pending_buzz = None;
                }

                let effects = handle_key(&mut self.session, command);
                self.apply(effects);

                if self.session.phase == GamePhase::EditingNames && self.name_edit.is_none() {
                    self.name_edit = Some(NameEdit::begin(&self.session));
                }
            }
        }
    }

    /// Execute transition side effects in the order emitted.
    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::PlayCue(cue) => self.sounds.play(cue),
                Effect::SetLed { seat, on, exclusive } => {
                    if exclusive {
                        for other in Seat::all() {
                            self.session.players[other.index()].led_on = false;
                        }
                    }
                    self.session.players[seat.index()].led_on = on;
                    if let Err(err) = self.transport.set_led(seat, on, exclusive) {
                        warn!(%seat, error = %err, "led command failed");
                    }
                }
                Effect::SetAllLeds(on) => {
                    for seat in Seat::all() {
                        self.session.players[seat.index()].led_on = on;
                    }
                    if let Err(err) = self.transport.set_all_leds(on) {
                        warn!(error = %err, "led bank command failed");
                    }
                }
                Effect::Persist => {
                    if let Err(err) = self.store.save(&self.session.to_persisted()) {
                        error!(error = %err, "failed to persist game state");
                    }
                }
                Effect::Celebrate(seat) => self.presenter.celebrate(seat),
                Effect::Quit => {
                    info!("clean exit requested");
                    self.running = false;
                }
            }
        }
    }

    /// Leave the hardware quiet on the way out.
    fn shutdown(&mut self) {
        if let Err(err) = self.transport.set_all_leds(false) {
            warn!(error = %err, "could not clear leds at shutdown");
        }
        if let Err(err) = self.transport.flush() {
            warn!(error = %err, "could not flush transport at shutdown");
        }
        info!("game stopped");
    }
}
