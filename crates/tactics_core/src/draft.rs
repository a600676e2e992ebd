//! Loadout draft: collect one five-slot selection per player, then close.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::UnitCatalog;
use crate::error::{GameError, Result};
use crate::unit::{PlayerId, UnitTypeId};

/// Number of units each player drafts.
pub const LOADOUT_SLOTS: usize = 5;

/// A validated selection of catalog indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loadout([UnitTypeId; LOADOUT_SLOTS]);

impl Loadout {
    /// Index 0 in every slot, used for players who never submit.
    pub const DEFAULT: Self = Self([0; LOADOUT_SLOTS]);

    /// Validate `slots` against `catalog`.
    ///
    /// # Errors
    ///
    /// Fails on a wrong slot count or on any out-of-range index. Nothing is
    /// accepted from a submission that fails.
    pub fn validate(slots: &[UnitTypeId], catalog: &UnitCatalog) -> Result<Self> {
        let array: [UnitTypeId; LOADOUT_SLOTS] =
            slots.try_into().map_err(|_| GameError::InvalidLoadoutLength {
                expected: LOADOUT_SLOTS,
                actual: slots.len(),
            })?;

        if let Some((slot, &index)) = array
            .iter()
            .enumerate()
            .find(|&(_, &index)| !catalog.contains(index))
        {
            return Err(GameError::InvalidLoadout {
                slot,
                index,
                catalog_size: catalog.len(),
            });
        }
        Ok(Self(array))
    }

    /// Selected catalog indices in slot order.
    #[must_use]
    pub const fn slots(&self) -> &[UnitTypeId; LOADOUT_SLOTS] {
        &self.0
    }
}

impl Default for Loadout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Draft lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DraftPhase {
    /// Waiting for the roster to fill.
    Pending,
    /// Accepting submissions.
    Open,
    /// Spawning has happened; later submissions change nothing.
    Closed,
}

/// What a player spawns with once the draft closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    /// Owning player.
    pub player: PlayerId,
    /// Chosen or default loadout.
    pub loadout: Loadout,
    /// First player in connection order.
    pub is_primary: bool,
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftProgress {
    /// Still waiting on other players.
    Waiting {
        /// Distinct players that have submitted.
        submitted: usize,
        /// Distinct players required to close.
        required: usize,
    },
    /// This submission closed the draft.
    Closed(Vec<Assignment>),
    /// The draft had already closed; the submission was stored only.
    AlreadyClosed,
}

/// Collects loadouts and closes exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCoordinator {
    phase: DraftPhase,
    participants: Vec<PlayerId>,
    submissions: BTreeMap<PlayerId, Loadout>,
}

impl DraftCoordinator {
    /// Create a draft that is not yet open.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: DraftPhase::Pending,
            participants: Vec::new(),
            submissions: BTreeMap::new(),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> DraftPhase {
        self.phase
    }

    /// Submission for `player`, if any.
    #[must_use]
    pub fn submission(&self, player: PlayerId) -> Option<Loadout> {
        self.submissions.get(&player).copied()
    }

    /// Whether `player` has a stored submission.
    #[must_use]
    pub fn has_submitted(&self, player: PlayerId) -> bool {
        self.submissions.contains_key(&player)
    }

    /// Open the draft to `participants`, in connection order.
    ///
    /// # Errors
    ///
    /// Fails if the draft is already open or closed.
    pub fn open(&mut self, participants: &[PlayerId]) -> Result<()> {
        if self.phase != DraftPhase::Pending {
            return Err(GameError::InvalidState("draft already opened".to_string()));
        }
        self.participants = participants.to_vec();
        self.phase = DraftPhase::Open;
        info!(players = ?self.participants, "Draft opened");
        Ok(())
    }

    /// Store a loadout for `player`, replacing any earlier one.
    ///
    /// Closes the draft when every participant has a submission.
    ///
    /// # Errors
    ///
    /// Fails if the draft is not open, `player` is not a participant, or the
    /// loadout does not validate. A failed submission leaves the player's
    /// previous state untouched.
    pub fn submit(
        &mut self,
        player: PlayerId,
        slots: &[UnitTypeId],
        catalog: &UnitCatalog,
    ) -> Result<DraftProgress> {
        if self.phase == DraftPhase::Pending {
            return Err(GameError::DraftNotOpen);
        }
        if !self.participants.contains(&player) {
            return Err(GameError::UnknownPlayer(player));
        }

        let loadout = Loadout::validate(slots, catalog)?;
        self.submissions.insert(player, loadout);
        debug!(player = %player, slots = ?loadout.slots(), "Loadout stored");

        if self.phase == DraftPhase::Closed {
            return Ok(DraftProgress::AlreadyClosed);
        }

        let submitted = self
            .participants
            .iter()
            .filter(|&&p| self.submissions.contains_key(&p))
            .count();
        let required = self.participants.len();
        if submitted < required {
            return Ok(DraftProgress::Waiting {
                submitted,
                required,
            });
        }

        Ok(DraftProgress::Closed(self.close()))
    }

    /// Close now, giving the default loadout to anyone who did not submit.
    ///
    /// # Errors
    ///
    /// Fails if the draft is not open.
    pub fn force_close(&mut self) -> Result<Vec<Assignment>> {
        match self.phase {
            DraftPhase::Pending => Err(GameError::DraftNotOpen),
            DraftPhase::Closed => Err(GameError::MatchAlreadyStarted),
            DraftPhase::Open => {
                info!("Draft forced closed");
                Ok(self.close())
            }
        }
    }

    fn close(&mut self) -> Vec<Assignment> {
        self.phase = DraftPhase::Closed;
        let assignments: Vec<Assignment> = self
            .participants
            .iter()
            .enumerate()
            .map(|(slot, &player)| Assignment {
                player,
                loadout: self.submission(player).unwrap_or_default(),
                is_primary: slot == 0,
            })
            .collect();
        info!(players = assignments.len(), "Draft closed");
        assignments
    }
}

impl Default for DraftCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
