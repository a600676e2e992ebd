//! Error types for the authoritative simulation.
//!
//! Two families live here. [`GameError`] covers operational and validation
//! failures that are reported to the local caller. [`Rejection`] describes why
//! a remote request was dropped; rejections are logged and returned inside
//! outcome values, never raised.

use thiserror::Error;

use crate::unit::{PlayerId, UnitId};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for operational and validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Too few distinct players to begin a match.
    #[error("Not enough players: need {required}, have {available}")]
    NotEnoughPlayers {
        /// Players required by the current mode.
        required: usize,
        /// Distinct players supplied.
        available: usize,
    },

    /// The same player id was supplied twice.
    #[error("Duplicate player ID: {0}")]
    DuplicatePlayer(PlayerId),

    /// The roster already holds the maximum number of players.
    #[error("Roster full: capacity {capacity}, refused player {player}")]
    RosterFull {
        /// Maximum roster size.
        capacity: usize,
        /// Player that was refused.
        player: PlayerId,
    },

    /// A request named a player that is not connected.
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// A loadout submission contained an out-of-range catalog index.
    #[error("Invalid loadout: slot {slot} holds index {index}, catalog has {catalog_size} entries")]
    InvalidLoadout {
        /// Offending slot.
        slot: usize,
        /// Index found in the slot.
        index: u32,
        /// Number of catalog entries.
        catalog_size: usize,
    },

    /// A loadout had the wrong number of slots.
    #[error("Invalid loadout length: expected {expected}, got {actual}")]
    InvalidLoadoutLength {
        /// Required slot count.
        expected: usize,
        /// Supplied slot count.
        actual: usize,
    },

    /// The draft has not opened yet.
    #[error("Draft is not open")]
    DraftNotOpen,

    /// The match has already begun.
    #[error("Match already started")]
    MatchAlreadyStarted,

    /// A unit catalog had no entries.
    #[error("Unit catalog is empty")]
    EmptyCatalog,

    /// A unit template has stats the rules cannot use.
    #[error("Invalid unit template {index} ('{name}'): {reason}")]
    InvalidUnitTemplate {
        /// Catalog index of the template.
        index: usize,
        /// Template name.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Invalid unit reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(UnitId),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Replayed state did not match the recorded hash.
    #[error("Replay diverged: recorded hash {recorded}, replayed hash {replayed}")]
    ReplayDiverged {
        /// Hash stored in the replay.
        recorded: u64,
        /// Hash produced by re-execution.
        replayed: u64,
    },
}

/// Reason an authority request was dropped.
///
/// Rejections never change state. They exist so the authoritative process can
/// log and test why a request had no effect.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No match is in progress.
    #[error("match not in progress")]
    MatchNotInProgress,

    /// Requester does not own the unit.
    #[error("player {requester} does not own unit {unit}")]
    NotOwner {
        /// Unit addressed by the request.
        unit: UnitId,
        /// Player that sent the request.
        requester: PlayerId,
    },

    /// Requester is not the current player.
    #[error("player {requester} acted outside their turn")]
    NotYourTurn {
        /// Player that sent the request.
        requester: PlayerId,
    },

    /// Unit id does not resolve to a live unit.
    #[error("unit {0} is not a live unit")]
    UnknownUnit(UnitId),

    /// Attack target does not resolve to a live unit.
    #[error("target {0} is not a live unit")]
    InvalidTarget(UnitId),

    /// A unit tried to attack itself.
    #[error("unit {0} cannot target itself")]
    SelfTarget(UnitId),

    /// Movement budget is spent.
    #[error("unit {0} has no movement remaining")]
    NoMovementRemaining(UnitId),

    /// Requested move was shorter than the minimum distance.
    #[error("unit {0} move distance is negligible")]
    NegligibleMove(UnitId),

    /// Unit already attacked this turn.
    #[error("unit {0} has already attacked this turn")]
    AttackSpent(UnitId),

    /// Target lies outside attack radius plus epsilon.
    #[error("target {target} is out of range of unit {unit}")]
    OutOfRange {
        /// Attacking unit.
        unit: UnitId,
        /// Intended target.
        target: UnitId,
    },
}
