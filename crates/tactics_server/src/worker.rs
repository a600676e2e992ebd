//! The single task that owns the match session.
//!
//! Every request and every clock tick is applied here, one at a time, so
//! the session never needs a lock. Events drained after each step are
//! fanned out on a broadcast channel.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use tactics_core::catalog::UnitCatalog;
use tactics_core::command::{CommandOutcome, MatchCommand};
use tactics_core::events::MatchEvent;
use tactics_core::replay::{Recorder, Replay};
use tactics_core::session::{MatchSession, SessionSnapshot};

use crate::config::ServerConfig;
use crate::error::Result;

/// Requests the worker accepts.
#[derive(Debug)]
pub enum Request {
    /// Apply a command to the session.
    Apply {
        /// Command to apply.
        command: MatchCommand,
        /// Receives the session's answer.
        reply: oneshot::Sender<tactics_core::error::Result<CommandOutcome>>,
    },
    /// Read the current state.
    Snapshot {
        /// Receives the snapshot.
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// Read the command log recorded so far.
    Replay {
        /// Receives the replay.
        reply: oneshot::Sender<Replay>,
    },
}

/// Owns the recorder and processes requests and ticks.
#[derive(Debug)]
pub struct AuthorityWorker {
    recorder: Recorder,
    request_rx: mpsc::Receiver<Request>,
    event_tx: broadcast::Sender<MatchEvent>,
    tick_period: Duration,
    replay_path: Option<PathBuf>,
}

impl AuthorityWorker {
    /// Build a worker around a fresh session.
    pub fn new(
        config: &ServerConfig,
        catalog: UnitCatalog,
        request_rx: mpsc::Receiver<Request>,
        event_tx: broadcast::Sender<MatchEvent>,
    ) -> Result<Self> {
        let session = MatchSession::new(config.match_config, catalog);
        Ok(Self {
            recorder: Recorder::new(session)?,
            request_rx,
            event_tx,
            tick_period: config.tick_period(),
            replay_path: config.replay_path.clone(),
        })
    }

    /// Main loop. Runs until every handle is dropped, then returns the
    /// recorded replay (saving it first when a path is configured).
    pub async fn run(mut self) -> Result<Replay> {
        let mut interval = tokio::time::interval(self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        info!(period_ms = self.tick_period.as_millis(), "Authority running");

        loop {
            tokio::select! {
                maybe = self.request_rx.recv() => match maybe {
                    Some(request) => self.handle_request(request),
                    None => break,
                },
                _ = interval.tick() => self.advance_clock(),
            }
        }

        self.shutdown()
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Apply { command, reply } => {
                debug!(?command, "Applying request");
                let result = self.recorder.apply(command);
                if let Err(error) = &result {
                    debug!(%error, "Request failed");
                }
                self.publish_events();
                let _ = reply.send(result);
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(self.recorder.session().snapshot());
            }
            Request::Replay { reply } => {
                let _ = reply.send(self.recorder.replay());
            }
        }
    }

    fn advance_clock(&mut self) {
        if let Err(error) = self.recorder.apply(MatchCommand::Tick) {
            warn!(%error, "Tick failed");
        }
        self.publish_events();
    }

    fn publish_events(&mut self) {
        for event in self.recorder.drain_events() {
            // No subscribers is not an error.
            let _ = self.event_tx.send(event);
        }
    }

    fn shutdown(self) -> Result<Replay> {
        let replay = self.recorder.replay();
        info!(
            commands = replay.command_count(),
            final_tick = replay.duration(),
            "Authority stopped"
        );

        if let Some(path) = &self.replay_path {
            replay.save(path)?;
            info!(path = %path.display(), "Replay saved");
        }

        Ok(replay)
    }
}
