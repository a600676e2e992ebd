//! Connection roster.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GameError, Result};
use crate::unit::PlayerId;

/// Distinct players in the order they connected.
///
/// The first entry is player A: it moves first and spawns in the primary
/// zone, regardless of how the transport matched players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<PlayerId>,
    capacity: usize,
}

impl Roster {
    /// Empty roster holding at most `capacity` players.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            players: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Add `player`. Returns `false` if it was already connected.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RosterFull`] if a new player does not fit.
    pub fn connect(&mut self, player: PlayerId) -> Result<bool> {
        if self.players.contains(&player) {
            return Ok(false);
        }
        if self.is_full() {
            warn!(player = %player, capacity = self.capacity, "Connection refused, roster full");
            return Err(GameError::RosterFull {
                capacity: self.capacity,
                player,
            });
        }
        self.players.push(player);
        Ok(true)
    }

    /// Connected players in connection order.
    #[must_use]
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    /// Whether `player` is connected.
    #[must_use]
    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    /// Whether no more players fit.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity
    }

    /// Maximum number of players.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
