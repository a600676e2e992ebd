//! Unit records and their storage.
//!
//! A [`Unit`] is the authoritative per-unit state. Its budgets are private:
//! the authority and the turn controller are the only writers, through
//! crate-visible mutators.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::UnitTemplate;
use crate::math::{fixed_serde, Fixed, Vec3Fixed};

/// Identifier of a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Identifier of a unit, unique for the lifetime of a match.
///
/// Ids are never reused, so a despawned id stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index into the shared unit catalog.
pub type UnitTypeId = u32;

/// Health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if health has reached zero.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction to prevent underflow.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current = self.current.saturating_sub(actual);
        actual
    }
}

/// Lifecycle of a unit. `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifeState {
    /// Unit can act and be targeted.
    Alive,
    /// Health reached zero; removal is scheduled.
    Dead {
        /// Tick at which the unit leaves the active set.
        despawn_at: u64,
    },
}

/// Authoritative state of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    owner: PlayerId,
    unit_type: UnitTypeId,
    position: Vec3Fixed,
    target_position: Vec3Fixed,
    #[serde(with = "fixed_serde")]
    move_speed: Fixed,
    #[serde(with = "fixed_serde")]
    movement_remaining: Fixed,
    can_attack: bool,
    health: Health,
    #[serde(with = "fixed_serde")]
    attack_radius: Fixed,
    #[serde(with = "fixed_serde")]
    travel_speed: Fixed,
    life: LifeState,
}

impl Unit {
    /// Build a fresh unit from a catalog template.
    ///
    /// The id is assigned when the unit is inserted into [`UnitStorage`].
    /// New units start with a full budget so they are usable even before the
    /// first turn reset reaches them.
    #[must_use]
    pub fn from_template(
        owner: PlayerId,
        unit_type: UnitTypeId,
        template: &UnitTemplate,
        position: Vec3Fixed,
    ) -> Self {
        Self {
            id: UnitId(0),
            owner,
            unit_type,
            position,
            target_position: position,
            move_speed: template.move_speed,
            movement_remaining: template.move_speed,
            can_attack: true,
            health: Health::new(template.max_health),
            attack_radius: template.attack_radius,
            travel_speed: template.travel_speed,
            life: LifeState::Alive,
        }
    }

    /// Unit identifier.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Controlling player. Never changes after spawn.
    #[must_use]
    pub const fn owner(&self) -> PlayerId {
        self.owner
    }

    /// Catalog index this unit was spawned from.
    #[must_use]
    pub const fn unit_type(&self) -> UnitTypeId {
        self.unit_type
    }

    /// Current world position.
    #[must_use]
    pub const fn position(&self) -> Vec3Fixed {
        self.position
    }

    /// Last commanded destination.
    #[must_use]
    pub const fn target_position(&self) -> Vec3Fixed {
        self.target_position
    }

    /// Per-turn movement allowance.
    #[must_use]
    pub const fn move_speed(&self) -> Fixed {
        self.move_speed
    }

    /// Movement budget left this turn.
    #[must_use]
    pub const fn movement_remaining(&self) -> Fixed {
        self.movement_remaining
    }

    /// Whether the unit may still attack this turn.
    #[must_use]
    pub const fn can_attack(&self) -> bool {
        self.can_attack
    }

    /// Health component.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Attack radius.
    #[must_use]
    pub const fn attack_radius(&self) -> Fixed {
        self.attack_radius
    }

    /// Distance covered per tick while travelling to the target.
    #[must_use]
    pub const fn travel_speed(&self) -> Fixed {
        self.travel_speed
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn life(&self) -> LifeState {
        self.life
    }

    /// True while the unit has not died.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        matches!(self.life, LifeState::Alive)
    }

    /// True while the unit has not reached its target.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.position != self.target_position
    }

    pub(crate) fn set_target(&mut self, target: Vec3Fixed, used: Fixed) {
        self.target_position = target;
        self.movement_remaining = (self.movement_remaining - used).max(Fixed::ZERO);
    }

    /// Snap the pending destination to the current position.
    pub(crate) fn stop(&mut self) {
        self.target_position = self.position;
    }

    pub(crate) fn spend_attack(&mut self) {
        self.can_attack = false;
    }

    /// Restore the per-turn budget. Only the turn controller calls this.
    pub(crate) fn reset_turn_budget(&mut self) {
        self.movement_remaining = self.move_speed;
        self.can_attack = true;
    }

    /// Apply clamped damage; returns `(dealt, died_now)`.
    pub(crate) fn take_damage(&mut self, amount: u32, despawn_at: u64) -> (u32, bool) {
        if !self.is_alive() {
            return (0, false);
        }
        let dealt = self.health.apply_damage(amount);
        if self.health.is_depleted() {
            self.life = LifeState::Dead { despawn_at };
            self.stop();
            return (dealt, true);
        }
        (dealt, false)
    }

    /// Move one tick toward the target; returns true if the position changed.
    pub(crate) fn advance(&mut self) -> bool {
        if !self.is_alive() || !self.is_moving() {
            return false;
        }
        self.position = self
            .position
            .move_towards(self.target_position, self.travel_speed);
        true
    }
}

/// Storage for all units in a match.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic
/// iteration via sorted keys when processing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStorage {
    units: HashMap<UnitId, Unit>,
    next_id: u64,
}

impl UnitStorage {
    /// Create empty unit storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new unit and return its id.
    pub fn insert(&mut self, mut unit: Unit) -> UnitId {
        let id = UnitId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by id.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Get a unit only if it is alive.
    #[must_use]
    pub fn get_live(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id).filter(|unit| unit.is_alive())
    }

    /// Check if a unit exists (alive or awaiting despawn).
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of units, including dead ones awaiting despawn.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get sorted unit ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Sorted ids of live units owned by `owner`.
    #[must_use]
    pub fn live_units_of(&self, owner: PlayerId) -> Vec<UnitId> {
        let mut ids: Vec<_> = self
            .units
            .values()
            .filter(|unit| unit.owner == owner && unit.is_alive())
            .map(|unit| unit.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all units (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &Unit)> {
        self.units.iter()
    }
}
