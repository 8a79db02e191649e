//! Presentation seam: the renderer is an external collaborator that receives
//! the post-transition session once per frame.

use tracing::{debug, info};

use crate::state::session::{GamePhase, GameSession, Seat};

/// Consumer of the post-transition state, invoked at the end of every frame.
pub trait Presenter {
    /// Present the current session. Called once per frame, after all input,
    /// buzz, and clock processing.
    fn present(&mut self, session: &GameSession);

    /// Celebratory visual hook fired when a seat buzzes in.
    fn celebrate(&mut self, seat: Seat);
}

/// Default presenter: logs phase changes and the countdown's second
/// boundaries instead of drawing anything.
#[derive(Debug, Default)]
pub struct LogPresenter {
    last_phase: Option<GamePhase>,
    last_second: Option<u64>,
}

impl Presenter for LogPresenter {
    fn present(&mut self, session: &GameSession) {
        if self.last_phase != Some(session.phase) {
            self.last_phase = Some(session.phase);
            let scores: Vec<i64> = session.players.iter().map(|p| p.score).collect();
            info!(phase = ?session.phase, ?scores, "phase");
        }

        let second = session.whole_seconds();
        if session.phase == GamePhase::Running && self.last_second != Some(second) {
            self.last_second = Some(second);
            debug!(second, "clock");
        }
    }

    fn celebrate(&mut self, seat: Seat) {
        info!(%seat, "buzzed in");
    }
}
