//! Buzzdeck binary entrypoint wiring transports, persistence, audio cues,
//! and the operator terminal into the control loop.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buzzdeck::config::AppConfig;
use buzzdeck::dispatch::ControlLoop;
use buzzdeck::input::TerminalEvents;
use buzzdeck::present::LogPresenter;
use buzzdeck::sound::{CuePlayer, SoundBank};
use buzzdeck::state::GameSession;
use buzzdeck::store::{JsonFileStore, StateStore};
use buzzdeck::transport;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    // The show cannot run without its core audio cues; this is the only
    // error class allowed to abort before the loop starts.
    let bank = SoundBank::load(&config.sound_dir, &config.sound_ext)
        .context("resolving required sound cues")?;

    let mut session = GameSession::new(config.session_rules());
    let mut store = JsonFileStore::new(config.state_file.clone());
    match store.restore() {
        Ok(Some(record)) => {
            info!(path = %store.path().display(), "restored saved game state");
            session.apply_persisted(record);
        }
        Ok(None) => info!("no saved game state; starting from defaults"),
        Err(err) => {
            warn!(error = %err, "saved game state unreadable; starting from defaults");
        }
    }

    let transport = transport::build(&config);
    let events = TerminalEvents::new().context("switching terminal to raw mode")?;

    info!(title = %config.title, "starting game");
    let mut game = ControlLoop::new(
        session,
        transport,
        Box::new(store),
        Box::new(CuePlayer::new(bank)),
        Box::new(LogPresenter::default()),
        Box::new(events),
        &config,
    );
    game.run();

    Ok(())
}

/// Configure tracing subscribers so logs include structured fields.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
