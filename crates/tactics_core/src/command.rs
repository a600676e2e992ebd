//! Serializable requests accepted by a match session.
//!
//! Every state change a session can undergo is expressible as a
//! [`MatchCommand`], which is what makes a command log replayable.

use serde::{Deserialize, Serialize};

use crate::authority::{AttackOutcome, MoveOutcome};
use crate::draft::DraftProgress;
use crate::math::Vec3Fixed;
use crate::turn::EndTurnOutcome;
use crate::unit::{PlayerId, UnitId, UnitTypeId};

/// One request to the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchCommand {
    /// A player joined.
    Connect {
        /// Joining player.
        player: PlayerId,
    },
    /// A player submitted a loadout.
    SubmitLoadout {
        /// Submitting player.
        player: PlayerId,
        /// Catalog indices, one per slot.
        slots: Vec<UnitTypeId>,
    },
    /// Close the draft with defaults for missing loadouts.
    ForceDraft,
    /// Move request.
    Move {
        /// Unit to move.
        unit: UnitId,
        /// Player sending the request.
        requester: PlayerId,
        /// Requested destination.
        destination: Vec3Fixed,
    },
    /// Attack request.
    Attack {
        /// Attacking unit.
        unit: UnitId,
        /// Player sending the request.
        requester: PlayerId,
        /// Unit to attack.
        target: UnitId,
        /// Damage to deal; the attacker's catalog damage when absent.
        damage: Option<i32>,
    },
    /// End-turn request.
    EndTurn {
        /// Player sending the request.
        requester: PlayerId,
    },
    /// Advance the clock by one tick.
    Tick,
}

/// What applying a [`MatchCommand`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Connection handled.
    Connected,
    /// Loadout accepted.
    Draft(DraftProgress),
    /// Draft forced closed and the match started.
    DraftForced,
    /// Move handled.
    Move(MoveOutcome),
    /// Attack handled.
    Attack(AttackOutcome),
    /// End turn handled.
    EndTurn(EndTurnOutcome),
    /// Clock advanced.
    Ticked,
}
