//! Outbound notifications for presentation layers.
//!
//! Events are informational only. They are buffered in emission order by the
//! session and handed to a [`PresentationSink`]; nothing waits for delivery
//! and a sink may see an event more than once.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::unit::{PlayerId, UnitId};

/// Something observers may want to present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// A player joined the roster.
    PlayerConnected {
        /// Joining player.
        player: PlayerId,
        /// Zero-based connection order.
        slot: usize,
    },
    /// The roster is full and loadouts may be submitted.
    DraftOpened {
        /// Slots per loadout.
        slots: usize,
        /// Number of catalog entries to choose from.
        catalog_size: usize,
    },
    /// A loadout passed validation.
    LoadoutAccepted {
        /// Submitting player.
        player: PlayerId,
    },
    /// The draft closed and spawning happened.
    DraftClosed,
    /// Units were created for a player.
    UnitsSpawned {
        /// Owner of the new units.
        owner: PlayerId,
        /// New unit ids in spawn order.
        units: Vec<UnitId>,
    },
    /// Turn cycling began.
    MatchStarted {
        /// Alternating players, first mover first.
        players: Vec<PlayerId>,
    },
    /// A player's turn began.
    TurnStarted {
        /// Player whose turn it is.
        player: PlayerId,
        /// Turn number.
        turn: u32,
    },
    /// A player's turn ended.
    TurnEnded {
        /// Player whose turn ended.
        player: PlayerId,
        /// Turn number that ended.
        turn: u32,
    },
    /// A move request was accepted.
    UnitMoved {
        /// Moving unit.
        unit: UnitId,
        /// New destination.
        target: Vec3Fixed,
        /// Budget left after the move.
        #[serde(with = "fixed_serde")]
        movement_remaining: Fixed,
    },
    /// An attack request was accepted.
    UnitAttacked {
        /// Attacking unit.
        attacker: UnitId,
        /// Attacked unit.
        target: UnitId,
    },
    /// A unit lost health.
    UnitDamaged {
        /// Damaged unit.
        unit: UnitId,
        /// Health actually removed.
        amount: u32,
        /// Health left.
        remaining: u32,
    },
    /// A unit's health reached zero.
    UnitDied {
        /// Dead unit.
        unit: UnitId,
    },
    /// A dead unit left the active set.
    UnitDespawned {
        /// Removed unit.
        unit: UnitId,
    },
}

/// One-way receiver of match events.
pub trait PresentationSink {
    /// Deliver one event.
    fn publish(&mut self, event: MatchEvent);
}

impl PresentationSink for Vec<MatchEvent> {
    fn publish(&mut self, event: MatchEvent) {
        self.push(event);
    }
}

/// Ordered buffer of events awaiting delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQueue {
    pending: Vec<MatchEvent>,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: MatchEvent) {
        self.pending.push(event);
    }

    /// Take all pending events in emission order.
    pub fn drain(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Forward all pending events to `sink`.
    pub fn drain_into<S: PresentationSink + ?Sized>(&mut self, sink: &mut S) {
        for event in self.pending.drain(..) {
            sink.publish(event);
        }
    }

    /// Pending events without consuming them.
    #[must_use]
    pub fn pending(&self) -> &[MatchEvent] {
        &self.pending
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
