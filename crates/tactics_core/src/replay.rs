//! Replay system for recording and re-executing matches.
//!
//! A replay stores the initial session state and every command applied to
//! it, in order. Because the session is deterministic, re-applying the
//! commands must reproduce the recorded final state hash.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::command::{CommandOutcome, MatchCommand};
use crate::error::{GameError, Result};
use crate::events::MatchEvent;
use crate::session::MatchSession;

/// A single command record for replay.
///
/// Consecutive clock ticks share one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCommand {
    /// Position in the record list.
    pub sequence: u64,
    /// Session tick when the command was first applied.
    pub tick: u64,
    /// The command that was applied.
    pub command: MatchCommand,
    /// How many times in a row it was applied.
    pub repeat: u64,
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 2;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Serialized initial session state.
    pub initial_state: Vec<u8>,
    /// Commands in application order.
    pub commands: Vec<ReplayCommand>,
    /// Tick when recording stopped.
    pub final_tick: u64,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// Start a replay from `initial`'s current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be serialized.
    pub fn new(initial: &MatchSession) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            initial_state: initial.serialize()?,
            commands: Vec::new(),
            final_tick: initial.current_tick(),
            final_hash: initial.state_hash(),
        })
    }

    /// Append a command applied at `tick`.
    pub fn record(&mut self, tick: u64, command: MatchCommand) {
        if command == MatchCommand::Tick {
            if let Some(last) = self.commands.last_mut() {
                if last.command == MatchCommand::Tick {
                    last.repeat += 1;
                    return;
                }
            }
        }

        let sequence = self.commands.len() as u64;
        self.commands.push(ReplayCommand {
            sequence,
            tick,
            command,
            repeat: 1,
        });
    }

    /// Store the end state of `session`.
    pub fn finalize(&mut self, session: &MatchSession) {
        self.final_tick = session.current_tick();
        self.final_hash = session.state_hash();
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails, or if the
    /// file was written by an incompatible version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }

        Ok(replay)
    }

    /// Session as it was when recording began.
    ///
    /// # Errors
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self) -> Result<MatchSession> {
        MatchSession::deserialize(&self.initial_state)
    }

    /// Re-execute every command from the initial state.
    ///
    /// Commands that failed when recorded fail again identically; their
    /// errors are logged and skipped.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be restored.
    pub fn play(&self) -> Result<MatchSession> {
        let mut session = self.restore_initial_state()?;
        for record in &self.commands {
            for _ in 0..record.repeat {
                if let Err(error) = session.apply(&record.command) {
                    debug!(sequence = record.sequence, %error, "Replayed command failed");
                }
            }
        }
        session.drain_events();
        Ok(session)
    }

    /// Re-execute and compare against the recorded final hash.
    ///
    /// # Errors
    /// Returns [`GameError::ReplayDiverged`] if the hashes differ.
    pub fn verify(&self) -> Result<MatchSession> {
        let session = self.play()?;
        let replayed = session.state_hash();
        if replayed != self.final_hash {
            return Err(GameError::ReplayDiverged {
                recorded: self.final_hash,
                replayed,
            });
        }
        Ok(session)
    }

    /// Total number of commands applied, counting repeats.
    #[must_use]
    pub fn command_count(&self) -> u64 {
        self.commands.iter().map(|record| record.repeat).sum()
    }

    /// Number of stored records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.commands.len()
    }

    /// Ticks covered by the replay.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }
}

/// A session that records every command it applies.
#[derive(Debug)]
pub struct Recorder {
    session: MatchSession,
    replay: Replay,
}

impl Recorder {
    /// Begin recording from `session`'s current state.
    ///
    /// # Errors
    /// Returns an error if the session cannot be serialized.
    pub fn new(session: MatchSession) -> Result<Self> {
        let replay = Replay::new(&session)?;
        Ok(Self { session, replay })
    }

    /// Record and apply `command`.
    ///
    /// # Errors
    /// Propagates the session's error; the command stays recorded.
    pub fn apply(&mut self, command: MatchCommand) -> Result<CommandOutcome> {
        let tick = self.session.current_tick();
        let result = self.session.apply(&command);
        self.replay.record(tick, command);
        result
    }

    /// The live session.
    #[must_use]
    pub const fn session(&self) -> &MatchSession {
        &self.session
    }

    /// Take the session's pending events.
    pub fn drain_events(&mut self) -> Vec<MatchEvent> {
        self.session.drain_events()
    }

    /// Replay recorded so far, finalized at the current state.
    #[must_use]
    pub fn replay(&self) -> Replay {
        let mut replay = self.replay.clone();
        replay.finalize(&self.session);
        replay
    }

    /// Stop recording.
    #[must_use]
    pub fn into_parts(self) -> (MatchSession, Replay) {
        let replay = self.replay();
        (self.session, replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::UnitCatalog;
    use crate::math::Vec3Fixed;
    use crate::session::MatchConfig;
    use crate::unit::{PlayerId, UnitId};

    fn recorded_match() -> Recorder {
        let session = MatchSession::new(MatchConfig::default(), UnitCatalog::standard());
        let mut recorder = Recorder::new(session).unwrap();
        for command in [
            MatchCommand::Connect { player: PlayerId(1) },
            MatchCommand::Connect { player: PlayerId(2) },
            MatchCommand::SubmitLoadout {
                player: PlayerId(1),
                slots: vec![0, 1, 2, 3, 0],
            },
            MatchCommand::ForceDraft,
            MatchCommand::Move {
                unit: UnitId(1),
                requester: PlayerId(1),
                destination: Vec3Fixed::from_ints(-4, 0, -7),
            },
            MatchCommand::Tick,
            MatchCommand::Tick,
            MatchCommand::EndTurn {
                requester: PlayerId(1),
            },
        ] {
            recorder.apply(command).unwrap();
        }
        recorder
    }

    #[test]
    fn test_replay_reproduces_final_hash() {
        let recorder = recorded_match();
        let replay = recorder.replay();

        assert_eq!(replay.command_count(), 8);
        let replayed = replay.verify().unwrap();
        assert_eq!(replayed.state_hash(), recorder.session().state_hash());
        assert_eq!(replayed.turn_number(), 2);
    }

    #[test]
    fn test_failed_commands_replay_identically() {
        let mut recorder = recorded_match();
        assert!(recorder
            .apply(MatchCommand::Connect { player: PlayerId(3) })
            .is_err());
        assert_eq!(recorder.replay().command_count(), 9);
        assert!(recorder.replay().verify().is_ok());
    }

    #[test]
    fn test_consecutive_ticks_share_a_record() {
        let mut recorder = recorded_match();
        for _ in 0..1000 {
            recorder.apply(MatchCommand::Tick).unwrap();
        }
        let replay = recorder.replay();

        assert_eq!(replay.record_count(), 8);
        assert_eq!(replay.command_count(), 1008);
        let last = replay.commands.last().unwrap();
        assert_eq!(last.command, MatchCommand::Tick);
        assert_eq!(last.repeat, 1000);

        let replayed = replay.verify().unwrap();
        assert_eq!(replayed.current_tick(), recorder.session().current_tick());
    }

    #[test]
    fn test_tampered_replay_diverges() {
        let mut replay = recorded_match().replay();
        replay.commands.pop();

        assert!(matches!(
            replay.verify(),
            Err(GameError::ReplayDiverged { .. })
        ));
    }
}
