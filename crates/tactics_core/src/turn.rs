//! Turn controller: whose turn it is, the turn number and the turn timer.
//!
//! The controller is the only writer that may raise a unit's movement budget
//! or restore its attack, and it does so only in the turn-start reset.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GameError, Rejection, Result};
use crate::events::{EventQueue, MatchEvent};
use crate::unit::{PlayerId, UnitStorage};

/// Coarse lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Match has not begun.
    AwaitingPlayers,
    /// Turns are cycling.
    InProgress,
}

/// The active turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnState {
    /// Player allowed to act.
    pub current_player: PlayerId,
    /// Starts at 1, increases by exactly one per advance.
    pub turn_number: u32,
}

/// Pending turn timeout, tagged with the turn it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnTimer {
    /// Turn this timer was armed for.
    pub turn_number: u32,
    /// Tick at which the turn is forced to end.
    pub expires_at_tick: u64,
}

/// Result of an end-turn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndTurnOutcome {
    /// The turn passed to `next`.
    Advanced {
        /// Player whose turn ended.
        ended: PlayerId,
        /// Player whose turn began.
        next: PlayerId,
        /// New turn number.
        turn: u32,
    },
    /// The request was dropped.
    Rejected(Rejection),
}

impl EndTurnOutcome {
    /// True unless the request was rejected.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

/// Two-player turn state machine with a cancel-and-replace timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnController {
    players: Vec<PlayerId>,
    state: Option<TurnState>,
    timer: Option<TurnTimer>,
    turn_duration: u64,
    allow_single_player: bool,
}

impl TurnController {
    /// Create a controller awaiting players.
    ///
    /// `turn_duration` is in ticks. With `allow_single_player` a match may be
    /// started by one player who then takes every turn.
    #[must_use]
    pub fn new(turn_duration: u64, allow_single_player: bool) -> Self {
        Self {
            players: Vec::new(),
            state: None,
            timer: None,
            turn_duration,
            allow_single_player,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> TurnPhase {
        match self.state {
            Some(_) => TurnPhase::InProgress,
            None => TurnPhase::AwaitingPlayers,
        }
    }

    /// Active turn, if the match has begun.
    #[must_use]
    pub const fn state(&self) -> Option<TurnState> {
        self.state
    }

    /// Player whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> Option<PlayerId> {
        self.state.map(|s| s.current_player)
    }

    /// Current turn number, 0 before the match begins.
    #[must_use]
    pub fn turn_number(&self) -> u32 {
        self.state.map_or(0, |s| s.turn_number)
    }

    /// The armed timer, if any.
    #[must_use]
    pub const fn timer(&self) -> Option<TurnTimer> {
        self.timer
    }

    /// Players in turn order.
    #[must_use]
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    /// Turn length in ticks.
    #[must_use]
    pub const fn turn_duration(&self) -> u64 {
        self.turn_duration
    }

    /// Start turn cycling with `players` in connection order.
    ///
    /// The first id moves first.
    ///
    /// # Errors
    ///
    /// Returns an error if the match already started, an id repeats, or the
    /// number of players does not fit the mode (two, or one when single
    /// player is allowed). The controller is unchanged on error.
    pub fn begin_match(
        &mut self,
        players: &[PlayerId],
        units: &mut UnitStorage,
        events: &mut EventQueue,
        now: u64,
    ) -> Result<()> {
        if self.state.is_some() {
            return Err(GameError::MatchAlreadyStarted);
        }

        let mut distinct: Vec<PlayerId> = Vec::with_capacity(players.len());
        for &player in players {
            if distinct.contains(&player) {
                return Err(GameError::DuplicatePlayer(player));
            }
            distinct.push(player);
        }

        let required = if self.allow_single_player { 1 } else { 2 };
        if distinct.len() < required {
            return Err(GameError::NotEnoughPlayers {
                required,
                available: distinct.len(),
            });
        }
        if distinct.len() > 2 {
            return Err(GameError::InvalidState(format!(
                "turn alternation supports two players, got {}",
                distinct.len()
            )));
        }

        let first = distinct[0];
        info!(players = ?distinct, "Match started");
        events.push(MatchEvent::MatchStarted {
            players: distinct.clone(),
        });
        self.players = distinct;
        self.start_turn(first, 1, units, events, now);
        Ok(())
    }

    /// End the turn on behalf of `requester`.
    ///
    /// Only the current player may end their turn; anything else is dropped.
    pub fn request_end_turn(
        &mut self,
        requester: PlayerId,
        units: &mut UnitStorage,
        events: &mut EventQueue,
        now: u64,
    ) -> EndTurnOutcome {
        let Some(state) = self.state else {
            return reject(requester, Rejection::MatchNotInProgress);
        };
        if requester != state.current_player {
            return reject(requester, Rejection::NotYourTurn { requester });
        }
        self.advance(units, events, now)
    }

    /// End the current turn as the authority itself.
    pub fn force_end_turn(
        &mut self,
        units: &mut UnitStorage,
        events: &mut EventQueue,
        now: u64,
    ) -> EndTurnOutcome {
        if self.state.is_none() {
            return EndTurnOutcome::Rejected(Rejection::MatchNotInProgress);
        }
        self.advance(units, events, now)
    }

    /// Handle a timer callback armed for turn `tag`.
    ///
    /// Returns `None` for a stale tag: a callback from a turn that has
    /// already ended never advances the current one.
    pub fn on_timer_expired(
        &mut self,
        tag: u32,
        units: &mut UnitStorage,
        events: &mut EventQueue,
        now: u64,
    ) -> Option<EndTurnOutcome> {
        let current = self.state?;
        if tag != current.turn_number {
            warn!(tag, turn = current.turn_number, "Ignoring stale turn timer");
            return None;
        }
        info!(player = %current.current_player, turn = tag, "Turn timed out");
        Some(self.advance(units, events, now))
    }

    /// Fire the armed timer if its deadline has been reached.
    pub fn poll_timer(
        &mut self,
        units: &mut UnitStorage,
        events: &mut EventQueue,
        now: u64,
    ) -> Option<EndTurnOutcome> {
        let timer = self.timer?;
        if now < timer.expires_at_tick {
            return None;
        }
        self.on_timer_expired(timer.turn_number, units, events, now)
    }

    /// The other of the two players; with a single player, that player.
    fn next_player(&self, current: PlayerId) -> PlayerId {
        self.players
            .iter()
            .copied()
            .find(|&p| p != current)
            .unwrap_or(current)
    }

    fn advance(
        &mut self,
        units: &mut UnitStorage,
        events: &mut EventQueue,
        now: u64,
    ) -> EndTurnOutcome {
        let Some(state) = self.state else {
            return EndTurnOutcome::Rejected(Rejection::MatchNotInProgress);
        };

        self.timer = None;
        info!(player = %state.current_player, turn = state.turn_number, "Turn ended");
        events.push(MatchEvent::TurnEnded {
            player: state.current_player,
            turn: state.turn_number,
        });

        let next = self.next_player(state.current_player);
        let turn = state.turn_number.saturating_add(1);
        self.start_turn(next, turn, units, events, now);

        EndTurnOutcome::Advanced {
            ended: state.current_player,
            next,
            turn,
        }
    }

    /// Turn-start reset, then arm a fresh timer in place of any old one.
    fn start_turn(
        &mut self,
        player: PlayerId,
        turn_number: u32,
        units: &mut UnitStorage,
        events: &mut EventQueue,
        now: u64,
    ) {
        self.state = Some(TurnState {
            current_player: player,
            turn_number,
        });

        let ids = units.live_units_of(player);
        for &id in &ids {
            if let Some(unit) = units.get_mut(id) {
                unit.reset_turn_budget();
            }
        }
        debug!(player = %player, turn = turn_number, units = ids.len(), "Turn budgets reset");

        self.timer = Some(TurnTimer {
            turn_number,
            expires_at_tick: now.saturating_add(self.turn_duration),
        });

        info!(player = %player, turn = turn_number, "Turn started");
        events.push(MatchEvent::TurnStarted {
            player,
            turn: turn_number,
        });
    }
}

fn reject(requester: PlayerId, rejection: Rejection) -> EndTurnOutcome {
    debug!(player = %requester, %rejection, "End turn rejected");
    EndTurnOutcome::Rejected(rejection)
}
