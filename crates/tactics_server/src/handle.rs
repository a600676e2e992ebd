//! Cloneable front end for the authority task.
//!
//! [`AuthorityHandle`] hides the channel plumbing: each helper sends one
//! request and awaits the worker's reply.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use tactics_core::authority::{AttackOutcome, MoveOutcome};
use tactics_core::catalog::UnitCatalog;
use tactics_core::command::{CommandOutcome, MatchCommand};
use tactics_core::draft::DraftProgress;
use tactics_core::events::MatchEvent;
use tactics_core::math::Vec3Fixed;
use tactics_core::replay::Replay;
use tactics_core::session::SessionSnapshot;
use tactics_core::turn::EndTurnOutcome;
use tactics_core::unit::{PlayerId, UnitId, UnitTypeId};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::worker::{AuthorityWorker, Request};

/// Client-facing handle to the authority.
#[derive(Debug, Clone)]
pub struct AuthorityHandle {
    request_tx: mpsc::Sender<Request>,
    event_tx: broadcast::Sender<MatchEvent>,
}

/// Start the authority task on the current runtime.
///
/// The task stops once every handle is dropped; its join handle yields the
/// recorded replay.
pub fn spawn_authority(
    config: &ServerConfig,
    catalog: UnitCatalog,
) -> Result<(AuthorityHandle, JoinHandle<Result<Replay>>)> {
    config.validate()?;

    let (request_tx, request_rx) = mpsc::channel(config.command_buffer);
    let (event_tx, _) = broadcast::channel(config.event_buffer);

    let worker = AuthorityWorker::new(config, catalog, request_rx, event_tx.clone())?;
    let join = tokio::spawn(worker.run());

    Ok((
        AuthorityHandle {
            request_tx,
            event_tx,
        },
        join,
    ))
}

impl AuthorityHandle {
    /// Send any command and return the session's outcome.
    pub async fn submit(&self, command: MatchCommand) -> Result<CommandOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.request_tx
            .send(Request::Apply {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ServerError::CommandChannelClosed)?;

        Ok(reply_rx.await.map_err(ServerError::ReplyChannelClosed)??)
    }

    /// Register a player.
    pub async fn connect(&self, player: PlayerId) -> Result<()> {
        match self.submit(MatchCommand::Connect { player }).await? {
            CommandOutcome::Connected => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Submit a player's loadout.
    pub async fn submit_loadout(
        &self,
        player: PlayerId,
        slots: Vec<UnitTypeId>,
    ) -> Result<DraftProgress> {
        match self
            .submit(MatchCommand::SubmitLoadout { player, slots })
            .await?
        {
            CommandOutcome::Draft(progress) => Ok(progress),
            other => Err(unexpected(&other)),
        }
    }

    /// Close the draft, filling missing loadouts with the default.
    pub async fn force_draft(&self) -> Result<()> {
        match self.submit(MatchCommand::ForceDraft).await? {
            CommandOutcome::DraftForced => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Ask to move `unit` toward `destination`.
    pub async fn request_move(
        &self,
        unit: UnitId,
        requester: PlayerId,
        destination: Vec3Fixed,
    ) -> Result<MoveOutcome> {
        match self
            .submit(MatchCommand::Move {
                unit,
                requester,
                destination,
            })
            .await?
        {
            CommandOutcome::Move(outcome) => Ok(outcome),
            other => Err(unexpected(&other)),
        }
    }

    /// Ask `unit` to attack `target`. `None` uses the catalog damage.
    pub async fn request_attack(
        &self,
        unit: UnitId,
        requester: PlayerId,
        target: UnitId,
        damage: Option<i32>,
    ) -> Result<AttackOutcome> {
        match self
            .submit(MatchCommand::Attack {
                unit,
                requester,
                target,
                damage,
            })
            .await?
        {
            CommandOutcome::Attack(outcome) => Ok(outcome),
            other => Err(unexpected(&other)),
        }
    }

    /// Ask to end the current turn.
    pub async fn request_end_turn(&self, requester: PlayerId) -> Result<EndTurnOutcome> {
        match self.submit(MatchCommand::EndTurn { requester }).await? {
            CommandOutcome::EndTurn(outcome) => Ok(outcome),
            other => Err(unexpected(&other)),
        }
    }

    /// Current state of the match.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(Request::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| ServerError::CommandChannelClosed)?;
        reply_rx.await.map_err(ServerError::ReplyChannelClosed)
    }

    /// Command log recorded so far.
    pub async fn replay(&self) -> Result<Replay> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(Request::Replay { reply: reply_tx })
            .await
            .map_err(|_| ServerError::CommandChannelClosed)?;
        reply_rx.await.map_err(ServerError::ReplyChannelClosed)
    }

    /// Receive every event the authority publishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.event_tx.subscribe()
    }
}

fn unexpected(outcome: &CommandOutcome) -> ServerError {
    ServerError::UnexpectedReply(format!("{outcome:?}"))
}
