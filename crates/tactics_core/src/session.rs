//! Match session: roster, draft, spawning, turns and the unit authority
//! behind one owner.
//!
//! A session is a plain state machine. It performs no IO and never reads a
//! wall clock; time advances only through [`MatchSession::tick`], so any
//! host (an async task, a test, a replay) drives it identically.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::authority::{
    can_attack, AttackOutcome, AuthorityContext, DamageOutcome, MoveOutcome, UnitAuthority,
};
use crate::catalog::UnitCatalog;
use crate::command::{CommandOutcome, MatchCommand};
use crate::draft::{Assignment, DraftCoordinator, DraftPhase, DraftProgress, LOADOUT_SLOTS};
use crate::error::{GameError, Result};
use crate::events::{EventQueue, MatchEvent, PresentationSink};
use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::roster::Roster;
use crate::spawn::{SpawnService, UnitSpawner, ZoneSpawner};
use crate::turn::{EndTurnOutcome, TurnController, TurnPhase, TurnTimer};
use crate::unit::{Health, LifeState, PlayerId, Unit, UnitId, UnitStorage, UnitTypeId};

/// Ticks per second of the authoritative clock.
pub const TICK_RATE: u32 = 20;

/// Rules that vary per match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Ticks before an idle turn is forced to end.
    pub turn_duration_ticks: u64,
    /// Ticks between a unit's death and its removal.
    pub despawn_delay_ticks: u64,
    /// Single local authority: one player, ownership checks skipped.
    pub local_authority: bool,
}

impl MatchConfig {
    /// Players needed to fill the roster.
    #[must_use]
    pub const fn roster_capacity(&self) -> usize {
        if self.local_authority {
            1
        } else {
            2
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            turn_duration_ticks: 60 * u64::from(TICK_RATE),
            despawn_delay_ticks: 2 * u64::from(TICK_RATE),
            local_authority: false,
        }
    }
}

/// Read-only view of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitView {
    /// Unit id.
    pub id: UnitId,
    /// Owning player.
    pub owner: PlayerId,
    /// Catalog index.
    pub unit_type: UnitTypeId,
    /// Current position.
    pub position: Vec3Fixed,
    /// Pending destination.
    pub target_position: Vec3Fixed,
    /// Movement budget left this turn.
    #[serde(with = "fixed_serde")]
    pub movement_remaining: Fixed,
    /// Whether the unit may still attack this turn.
    pub can_attack: bool,
    /// Health.
    pub health: Health,
    /// Lifecycle state.
    pub life: LifeState,
}

impl From<&Unit> for UnitView {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id(),
            owner: unit.owner(),
            unit_type: unit.unit_type(),
            position: unit.position(),
            target_position: unit.target_position(),
            movement_remaining: unit.movement_remaining(),
            can_attack: unit.can_attack(),
            health: unit.health(),
            life: unit.life(),
        }
    }
}

/// Read-only view of a session, for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current tick.
    pub tick: u64,
    /// Turn controller phase.
    pub phase: TurnPhase,
    /// Draft phase.
    pub draft: DraftPhase,
    /// Players in connection order.
    pub players: Vec<PlayerId>,
    /// Player whose turn it is.
    pub current_player: Option<PlayerId>,
    /// Current turn number, 0 before the match.
    pub turn_number: u32,
    /// Armed turn timer.
    pub timer: Option<TurnTimer>,
    /// Every unit still in the active set, sorted by id.
    pub units: Vec<UnitView>,
}

/// Match start computed but not yet applied.
struct StagedMatch {
    units: UnitStorage,
    turns: TurnController,
    events: EventQueue,
}

fn default_spawner() -> Box<dyn SpawnService> {
    Box::new(ZoneSpawner::default())
}

/// The authoritative state of one match.
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchSession {
    config: MatchConfig,
    catalog: UnitCatalog,
    tick: u64,
    roster: Roster,
    draft: DraftCoordinator,
    turns: TurnController,
    units: UnitStorage,
    #[serde(skip)]
    events: EventQueue,
    #[serde(skip, default = "default_spawner")]
    spawner: Box<dyn SpawnService>,
}

impl MatchSession {
    /// New session using the default zone spawner.
    #[must_use]
    pub fn new(config: MatchConfig, catalog: UnitCatalog) -> Self {
        Self::with_spawner(config, catalog, default_spawner())
    }

    /// New session placing units with `spawner`.
    #[must_use]
    pub fn with_spawner(
        config: MatchConfig,
        catalog: UnitCatalog,
        spawner: Box<dyn SpawnService>,
    ) -> Self {
        Self {
            roster: Roster::new(config.roster_capacity()),
            draft: DraftCoordinator::new(),
            turns: TurnController::new(config.turn_duration_ticks, config.local_authority),
            units: UnitStorage::new(),
            events: EventQueue::new(),
            tick: 0,
            config,
            catalog,
            spawner,
        }
    }

    /// Add a player to the roster; opens the draft once it is full.
    ///
    /// Reconnecting an already connected player is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RosterFull`] for a newcomer when the roster is full.
    pub fn connect(&mut self, player: PlayerId) -> Result<()> {
        if !self.roster.connect(player)? {
            debug!(player = %player, "Player already connected");
            return Ok(());
        }

        let slot = self.roster.players().len() - 1;
        info!(player = %player, slot, "Player connected");
        self.events.push(MatchEvent::PlayerConnected { player, slot });

        if self.roster.is_full() {
            self.draft.open(self.roster.players())?;
            self.events.push(MatchEvent::DraftOpened {
                slots: LOADOUT_SLOTS,
                catalog_size: self.catalog.len(),
            });
        }
        Ok(())
    }

    /// Submit a loadout for `player`.
    ///
    /// The submission that completes the draft spawns every player's units
    /// and begins the match before returning.
    ///
    /// # Errors
    ///
    /// Fails if the draft is not open, the player is not connected, the
    /// loadout is invalid, or spawning fails. A failed submission changes
    /// nothing.
    pub fn submit_loadout(
        &mut self,
        player: PlayerId,
        slots: &[UnitTypeId],
    ) -> Result<DraftProgress> {
        let before = self.draft.clone();
        let progress = self.draft.submit(player, slots, &self.catalog)?;

        let staged = match &progress {
            DraftProgress::Closed(assignments) => match self.stage_match(assignments) {
                Ok(staged) => Some(staged),
                Err(error) => {
                    self.draft = before;
                    return Err(error);
                }
            },
            _ => None,
        };

        self.events.push(MatchEvent::LoadoutAccepted { player });
        if let Some(staged) = staged {
            self.commit(staged);
        }
        Ok(progress)
    }

    /// Close the draft now, defaulting every missing loadout.
    ///
    /// # Errors
    ///
    /// Fails if the draft has not opened or has already closed, or if
    /// spawning fails; a failure leaves the draft open.
    pub fn force_draft(&mut self) -> Result<()> {
        let before = self.draft.clone();
        let assignments = self.draft.force_close()?;
        match self.stage_match(&assignments) {
            Ok(staged) => {
                self.commit(staged);
                Ok(())
            }
            Err(error) => {
                self.draft = before;
                Err(error)
            }
        }
    }

    /// Spawn every assignment and begin the match on copies of the unit
    /// storage and turn controller.
    fn stage_match(&mut self, assignments: &[Assignment]) -> Result<StagedMatch> {
        let mut units = self.units.clone();
        let mut turns = self.turns.clone();
        let mut events = EventQueue::new();
        events.push(MatchEvent::DraftClosed);

        for assignment in assignments {
            let mut spawner = UnitSpawner::new(&mut units, &self.catalog);
            let ids = self.spawner.spawn_units(
                &mut spawner,
                assignment.player,
                &assignment.loadout,
                assignment.is_primary,
            )?;
            info!(player = %assignment.player, count = ids.len(), "Units spawned");
            events.push(MatchEvent::UnitsSpawned {
                owner: assignment.player,
                units: ids,
            });
        }

        turns.begin_match(self.roster.players(), &mut units, &mut events, self.tick)?;
        Ok(StagedMatch {
            units,
            turns,
            events,
        })
    }

    fn commit(&mut self, staged: StagedMatch) {
        let StagedMatch {
            units,
            turns,
            mut events,
        } = staged;
        self.units = units;
        self.turns = turns;
        for event in events.drain() {
            self.events.push(event);
        }
    }

    fn authority_context(&self) -> AuthorityContext {
        AuthorityContext {
            current_player: self.turns.current_player(),
            local_authority: self.config.local_authority,
            now: self.tick,
            despawn_delay: self.config.despawn_delay_ticks,
        }
    }

    /// Move request from `requester`. See [`UnitAuthority::request_move`].
    pub fn request_move(
        &mut self,
        unit: UnitId,
        requester: PlayerId,
        destination: Vec3Fixed,
    ) -> MoveOutcome {
        let ctx = self.authority_context();
        UnitAuthority::new(&mut self.units, &mut self.events, ctx).request_move(
            unit,
            requester,
            destination,
        )
    }

    /// Attack request from `requester`. See [`UnitAuthority::request_attack`].
    pub fn request_attack(
        &mut self,
        unit: UnitId,
        requester: PlayerId,
        target: UnitId,
        damage: i32,
    ) -> AttackOutcome {
        let ctx = self.authority_context();
        UnitAuthority::new(&mut self.units, &mut self.events, ctx)
            .request_attack(unit, requester, target, damage)
    }

    /// Damage applied by the authority itself, outside any request.
    pub fn apply_damage(&mut self, unit: UnitId, damage: i32) -> DamageOutcome {
        let ctx = self.authority_context();
        UnitAuthority::new(&mut self.units, &mut self.events, ctx).apply_damage(unit, damage)
    }

    /// Range preview; distance only. See [`can_attack`].
    #[must_use]
    pub fn can_attack(&self, attacker: UnitId, target: UnitId) -> bool {
        can_attack(&self.units, attacker, target)
    }

    /// Catalog damage of `unit`'s type.
    #[must_use]
    pub fn attack_damage_of(&self, unit: UnitId) -> Option<i32> {
        let unit = self.units.get(unit)?;
        self.catalog.get(unit.unit_type()).map(|t| t.attack_damage)
    }

    /// End-turn request from `requester`.
    pub fn request_end_turn(&mut self, requester: PlayerId) -> EndTurnOutcome {
        self.turns
            .request_end_turn(requester, &mut self.units, &mut self.events, self.tick)
    }

    /// End the current turn as the authority.
    pub fn force_end_turn(&mut self) -> EndTurnOutcome {
        self.turns
            .force_end_turn(&mut self.units, &mut self.events, self.tick)
    }

    /// Timer callback for an external scheduler; stale tags are ignored.
    pub fn on_timer_expired(&mut self, tag: u32) -> Option<EndTurnOutcome> {
        self.turns
            .on_timer_expired(tag, &mut self.units, &mut self.events, self.tick)
    }

    /// Advance the clock by one tick.
    ///
    /// Units travel toward their targets, dead units past their deadline
    /// are removed, then the turn timer is checked.
    pub fn tick(&mut self) {
        self.tick += 1;

        for id in self.units.sorted_ids() {
            if let Some(unit) = self.units.get_mut(id) {
                unit.advance();
            }
        }

        self.despawn_dead();
        self.turns
            .poll_timer(&mut self.units, &mut self.events, self.tick);
    }

    fn despawn_dead(&mut self) {
        let now = self.tick;
        let expired: Vec<UnitId> = self
            .units
            .sorted_ids()
            .into_iter()
            .filter(|&id| {
                matches!(
                    self.units.get(id).map(Unit::life),
                    Some(LifeState::Dead { despawn_at }) if despawn_at <= now
                )
            })
            .collect();

        for id in expired {
            self.units.remove(id);
            debug!(unit = %id, tick = now, "Unit despawned");
            self.events.push(MatchEvent::UnitDespawned { unit: id });
        }
    }

    /// Dispatch one command.
    ///
    /// Authority rejections come back inside the outcome; only operational
    /// errors are returned as `Err`.
    ///
    /// # Errors
    ///
    /// Propagates errors from connect, loadout submission and forced draft.
    pub fn apply(&mut self, command: &MatchCommand) -> Result<CommandOutcome> {
        let outcome = match command {
            MatchCommand::Connect { player } => {
                self.connect(*player)?;
                CommandOutcome::Connected
            }
            MatchCommand::SubmitLoadout { player, slots } => {
                CommandOutcome::Draft(self.submit_loadout(*player, slots)?)
            }
            MatchCommand::ForceDraft => {
                self.force_draft()?;
                CommandOutcome::DraftForced
            }
            MatchCommand::Move {
                unit,
                requester,
                destination,
            } => CommandOutcome::Move(self.request_move(*unit, *requester, *destination)),
            MatchCommand::Attack {
                unit,
                requester,
                target,
                damage,
            } => {
                let damage = damage
                    .or_else(|| self.attack_damage_of(*unit))
                    .unwrap_or(0);
                CommandOutcome::Attack(self.request_attack(*unit, *requester, *target, damage))
            }
            MatchCommand::EndTurn { requester } => {
                CommandOutcome::EndTurn(self.request_end_turn(*requester))
            }
            MatchCommand::Tick => {
                self.tick();
                CommandOutcome::Ticked
            }
        };
        Ok(outcome)
    }

    /// Take all pending events in emission order.
    pub fn drain_events(&mut self) -> Vec<MatchEvent> {
        self.events.drain()
    }

    /// Forward all pending events to `sink`.
    pub fn drain_into<S: PresentationSink + ?Sized>(&mut self, sink: &mut S) {
        self.events.drain_into(sink);
    }

    /// Current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Match rules.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Unit catalog.
    #[must_use]
    pub const fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Players in connection order.
    #[must_use]
    pub fn players(&self) -> &[PlayerId] {
        self.roster.players()
    }

    /// Turn controller phase.
    #[must_use]
    pub const fn phase(&self) -> TurnPhase {
        self.turns.phase()
    }

    /// Draft phase.
    #[must_use]
    pub const fn draft_phase(&self) -> DraftPhase {
        self.draft.phase()
    }

    /// Player whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> Option<PlayerId> {
        self.turns.current_player()
    }

    /// Current turn number, 0 before the match.
    #[must_use]
    pub fn turn_number(&self) -> u32 {
        self.turns.turn_number()
    }

    /// Armed turn timer.
    #[must_use]
    pub const fn turn_timer(&self) -> Option<TurnTimer> {
        self.turns.timer()
    }

    /// Unit by id, alive or awaiting despawn.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// All units in the active set.
    #[must_use]
    pub const fn units(&self) -> &UnitStorage {
        &self.units
    }

    /// Sorted ids of `player`'s live units.
    #[must_use]
    pub fn living_units_of(&self, player: PlayerId) -> Vec<UnitId> {
        self.units.live_units_of(player)
    }

    /// Read-only view for observers.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tick: self.tick,
            phase: self.turns.phase(),
            draft: self.draft.phase(),
            players: self.roster.players().to_vec(),
            current_player: self.turns.current_player(),
            turn_number: self.turns.turn_number(),
            timer: self.turns.timer(),
            units: self
                .units
                .sorted_ids()
                .into_iter()
                .filter_map(|id| self.units.get(id).map(UnitView::from))
                .collect(),
        }
    }

    /// Deterministic hash of the authoritative state.
    ///
    /// Two sessions fed the same commands produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.roster.players().hash(&mut hasher);
        self.draft.phase().hash(&mut hasher);
        self.turns.state().hash(&mut hasher);
        self.turns.timer().hash(&mut hasher);

        let ids = self.units.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(unit) = self.units.get(id) {
                id.hash(&mut hasher);
                unit.owner().hash(&mut hasher);
                unit.unit_type().hash(&mut hasher);
                unit.position().hash(&mut hasher);
                unit.target_position().hash(&mut hasher);
                unit.movement_remaining().to_bits().hash(&mut hasher);
                unit.can_attack().hash(&mut hasher);
                unit.health().hash(&mut hasher);
                unit.life().hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Serialize the session for replay or hand-over.
    ///
    /// Pending events and the spawn service are not included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize session: {e}")))
    }

    /// Restore a session; it places future units with the default spawner.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize session: {e}")))
    }
}

impl Default for MatchSession {
    fn default() -> Self {
        Self::new(MatchConfig::default(), UnitCatalog::standard())
    }
}
