//! Unit authority: the only path that changes a unit's position, budgets or
//! health outside the turn-start reset.
//!
//! Every request is checked against ownership, turn and budget before it is
//! applied. A failed check drops the request without touching state; the
//! reason is logged and returned as a [`Rejection`] so local code can inspect
//! it, but it is never surfaced to the remote requester.

use tracing::{debug, info};

use crate::error::Rejection;
use crate::events::{EventQueue, MatchEvent};
use crate::math::{Fixed, Vec3Fixed};
use crate::unit::{PlayerId, Unit, UnitId, UnitStorage};

/// Slack added to every attack radius, absorbing interpolation jitter.
///
/// Raw bits of 0.05 in `I32F32`.
pub const ATTACK_RANGE_EPSILON: Fixed = Fixed::from_bits(214_748_365);

/// Moves shorter than this are treated as zero-length (1/1024).
pub const MIN_MOVE_DISTANCE: Fixed = Fixed::from_bits(1 << 22);

/// Result of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The unit received a new target.
    Moved {
        /// Destination actually assigned.
        target: Vec3Fixed,
        /// Budget consumed.
        used: Fixed,
        /// True when the request was clamped to the remaining budget.
        partial: bool,
    },
    /// The request was dropped.
    Rejected(Rejection),
}

impl MoveOutcome {
    /// True unless the request was rejected.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Result of an attack request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// The attack landed.
    Hit {
        /// Damage outcome on the target.
        damage: DamageOutcome,
    },
    /// The request was dropped.
    Rejected(Rejection),
}

impl AttackOutcome {
    /// True unless the request was rejected.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }
}

/// Result of applying damage to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Health dropped but stayed above zero.
    Damaged {
        /// Health removed.
        dealt: u32,
        /// Health left.
        remaining: u32,
    },
    /// Health reached zero; the unit transitioned to dead.
    Killed {
        /// Health removed.
        dealt: u32,
    },
    /// Unknown or already dead unit, or zero effective damage.
    NoEffect,
}

/// Facts about the match the authority needs to judge a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityContext {
    /// Player whose turn it is, if a match is in progress.
    pub current_player: Option<PlayerId>,
    /// Skip the requester-owns-unit check (single local authority).
    pub local_authority: bool,
    /// Current tick.
    pub now: u64,
    /// Ticks between death and removal.
    pub despawn_delay: u64,
}

/// Borrowed view that validates and applies unit requests.
#[derive(Debug)]
pub struct UnitAuthority<'a> {
    units: &'a mut UnitStorage,
    events: &'a mut EventQueue,
    ctx: AuthorityContext,
}

impl<'a> UnitAuthority<'a> {
    /// Create an authority over `units`, emitting into `events`.
    pub fn new(
        units: &'a mut UnitStorage,
        events: &'a mut EventQueue,
        ctx: AuthorityContext,
    ) -> Self {
        Self { units, events, ctx }
    }

    /// Validate that `requester` may command `unit_id` right now.
    fn authorize(&self, unit_id: UnitId, requester: PlayerId) -> Result<&Unit, Rejection> {
        let current = self
            .ctx
            .current_player
            .ok_or(Rejection::MatchNotInProgress)?;
        let unit = self
            .units
            .get_live(unit_id)
            .ok_or(Rejection::UnknownUnit(unit_id))?;
        if !self.ctx.local_authority && unit.owner() != requester {
            return Err(Rejection::NotOwner {
                unit: unit_id,
                requester,
            });
        }
        if requester != current {
            return Err(Rejection::NotYourTurn { requester });
        }
        Ok(unit)
    }

    /// Move `unit_id` toward `destination`, clamped to its remaining budget.
    ///
    /// A destination beyond the budget is not rejected: the unit travels the
    /// remaining budget along the straight line to it and the budget drops to
    /// exactly zero.
    pub fn request_move(
        &mut self,
        unit_id: UnitId,
        requester: PlayerId,
        destination: Vec3Fixed,
    ) -> MoveOutcome {
        match self.try_move(unit_id, requester, destination) {
            Ok(outcome) => outcome,
            Err(rejection) => {
                debug!(unit = %unit_id, player = %requester, %rejection, "Move rejected");
                MoveOutcome::Rejected(rejection)
            }
        }
    }

    fn try_move(
        &mut self,
        unit_id: UnitId,
        requester: PlayerId,
        destination: Vec3Fixed,
    ) -> Result<MoveOutcome, Rejection> {
        let unit = self.authorize(unit_id, requester)?;

        let remaining = unit.movement_remaining();
        if remaining <= Fixed::ZERO {
            return Err(Rejection::NoMovementRemaining(unit_id));
        }

        let origin = unit.position();
        let distance = origin.distance(destination);
        if distance < MIN_MOVE_DISTANCE {
            return Err(Rejection::NegligibleMove(unit_id));
        }

        let (target, used, partial) = if distance <= remaining {
            (destination, distance, false)
        } else {
            (origin.move_towards(destination, remaining), remaining, true)
        };

        let unit = self
            .units
            .get_mut(unit_id)
            .ok_or(Rejection::UnknownUnit(unit_id))?;
        unit.set_target(target, used);
        let movement_remaining = unit.movement_remaining();

        debug!(
            unit = %unit_id,
            used = %used,
            remaining = %movement_remaining,
            partial,
            "Move accepted"
        );
        self.events.push(MatchEvent::UnitMoved {
            unit: unit_id,
            target,
            movement_remaining,
        });

        Ok(MoveOutcome::Moved {
            target,
            used,
            partial,
        })
    }

    /// Attack `target_id` with `unit_id`, dealing `damage`.
    ///
    /// On success the attacker's attack is spent and its pending movement is
    /// cancelled; its movement budget is left as it was.
    pub fn request_attack(
        &mut self,
        unit_id: UnitId,
        requester: PlayerId,
        target_id: UnitId,
        damage: i32,
    ) -> AttackOutcome {
        match self.try_attack(unit_id, requester, target_id, damage) {
            Ok(outcome) => outcome,
            Err(rejection) => {
                debug!(unit = %unit_id, player = %requester, %rejection, "Attack rejected");
                AttackOutcome::Rejected(rejection)
            }
        }
    }

    fn try_attack(
        &mut self,
        unit_id: UnitId,
        requester: PlayerId,
        target_id: UnitId,
        damage: i32,
    ) -> Result<AttackOutcome, Rejection> {
        let attacker = self.authorize(unit_id, requester)?;

        if !attacker.can_attack() {
            return Err(Rejection::AttackSpent(unit_id));
        }
        if target_id == unit_id {
            return Err(Rejection::SelfTarget(unit_id));
        }
        let target = self
            .units
            .get_live(target_id)
            .ok_or(Rejection::InvalidTarget(target_id))?;
        if !within_attack_range(attacker, target) {
            return Err(Rejection::OutOfRange {
                unit: unit_id,
                target: target_id,
            });
        }

        self.events.push(MatchEvent::UnitAttacked {
            attacker: unit_id,
            target: target_id,
        });
        let outcome = self.apply_damage(target_id, damage);

        let attacker = self
            .units
            .get_mut(unit_id)
            .ok_or(Rejection::UnknownUnit(unit_id))?;
        attacker.spend_attack();
        attacker.stop();

        debug!(unit = %unit_id, target = %target_id, ?outcome, "Attack accepted");
        Ok(AttackOutcome::Hit { damage: outcome })
    }

    /// Subtract `max(0, damage)` from a unit's health.
    ///
    /// The unit dies the first time health reaches zero; later calls on a
    /// dead unit have no effect.
    pub fn apply_damage(&mut self, unit_id: UnitId, damage: i32) -> DamageOutcome {
        let amount = damage.max(0).unsigned_abs();
        let despawn_at = self.ctx.now.saturating_add(self.ctx.despawn_delay);

        let Some(unit) = self.units.get_mut(unit_id) else {
            return DamageOutcome::NoEffect;
        };
        if !unit.is_alive() {
            return DamageOutcome::NoEffect;
        }

        let (dealt, died) = unit.take_damage(amount, despawn_at);
        let remaining = unit.health().current;

        if dealt > 0 {
            self.events.push(MatchEvent::UnitDamaged {
                unit: unit_id,
                amount: dealt,
                remaining,
            });
        }

        if died {
            info!(unit = %unit_id, despawn_at, "Unit died");
            self.events.push(MatchEvent::UnitDied { unit: unit_id });
            DamageOutcome::Killed { dealt }
        } else if dealt > 0 {
            DamageOutcome::Damaged { dealt, remaining }
        } else {
            DamageOutcome::NoEffect
        }
    }
}

/// Range rule shared by the preview predicate and the attack request.
#[must_use]
pub fn within_attack_range(attacker: &Unit, target: &Unit) -> bool {
    let reach = attacker.attack_radius().saturating_add(ATTACK_RANGE_EPSILON);
    attacker.position().distance(target.position()) <= reach
}

/// Preview whether `attacker` could reach `target`.
///
/// Distance only: turn, ownership and attack availability are not checked.
/// Returns false if either unit is not alive.
#[must_use]
pub fn can_attack(units: &UnitStorage, attacker: UnitId, target: UnitId) -> bool {
    match (units.get_live(attacker), units.get_live(target)) {
        (Some(a), Some(t)) => within_attack_range(a, t),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::UnitCatalog;
    use crate::unit::LifeState;

    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);

    fn ctx(current: Option<PlayerId>) -> AuthorityContext {
        AuthorityContext {
            current_player: current,
            local_authority: false,
            now: 100,
            despawn_delay: 40,
        }
    }

    /// Rifleman: move 5, radius 4, 30 hp.
    fn spawn(units: &mut UnitStorage, owner: PlayerId, at: Vec3Fixed) -> UnitId {
        let catalog = UnitCatalog::standard();
        units.insert(Unit::from_template(owner, 0, catalog.get(0).unwrap(), at))
    }

    #[test]
    fn test_full_move_spends_distance() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let id = spawn(&mut units, P1, Vec3Fixed::ZERO);

        let outcome = UnitAuthority::new(&mut units, &mut events, ctx(Some(P1))).request_move(
            id,
            P1,
            Vec3Fixed::from_ints(3, 0, 0),
        );

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                target: Vec3Fixed::from_ints(3, 0, 0),
                used: Fixed::from_num(3),
                partial: false,
            }
        );
        assert_eq!(units.get(id).unwrap().movement_remaining(), Fixed::from_num(2));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_move_beyond_budget_is_clamped() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let id = spawn(&mut units, P1, Vec3Fixed::ZERO);

        let outcome = UnitAuthority::new(&mut units, &mut events, ctx(Some(P1))).request_move(
            id,
            P1,
            Vec3Fixed::from_ints(10, 0, 0),
        );

        assert!(matches!(outcome, MoveOutcome::Moved { partial: true, .. }));
        let unit = units.get(id).unwrap();
        assert_eq!(unit.target_position(), Vec3Fixed::from_ints(5, 0, 0));
        assert_eq!(unit.movement_remaining(), Fixed::ZERO);
    }

    #[test]
    fn test_move_rejections_leave_state_untouched() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let id = spawn(&mut units, P1, Vec3Fixed::ZERO);
        let before = units.clone();
        let dest = Vec3Fixed::from_ints(1, 0, 0);

        let cases = [
            (ctx(None), P1, dest, Rejection::MatchNotInProgress),
            (
                ctx(Some(P1)),
                P2,
                dest,
                Rejection::NotOwner {
                    unit: id,
                    requester: P2,
                },
            ),
            (ctx(Some(P2)), P1, dest, Rejection::NotYourTurn { requester: P1 }),
            (ctx(Some(P1)), P1, Vec3Fixed::ZERO, Rejection::NegligibleMove(id)),
        ];

        for (context, requester, destination, expected) in cases {
            let outcome = UnitAuthority::new(&mut units, &mut events, context).request_move(
                id,
                requester,
                destination,
            );
            assert_eq!(outcome, MoveOutcome::Rejected(expected));
        }

        assert_eq!(units, before);
        assert!(events.is_empty());
    }

    #[test]
    fn test_move_with_spent_budget_is_rejected() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let id = spawn(&mut units, P1, Vec3Fixed::ZERO);
        let mut authority = UnitAuthority::new(&mut units, &mut events, ctx(Some(P1)));

        assert!(authority
            .request_move(id, P1, Vec3Fixed::from_ints(20, 0, 0))
            .is_accepted());
        assert_eq!(
            authority.request_move(id, P1, Vec3Fixed::from_ints(0, 0, 3)),
            MoveOutcome::Rejected(Rejection::NoMovementRemaining(id))
        );
    }

    #[test]
    fn test_local_authority_skips_ownership() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let id = spawn(&mut units, P2, Vec3Fixed::ZERO);
        let context = AuthorityContext {
            local_authority: true,
            ..ctx(Some(P1))
        };

        let outcome = UnitAuthority::new(&mut units, &mut events, context).request_move(
            id,
            P1,
            Vec3Fixed::from_ints(1, 0, 0),
        );
        assert!(outcome.is_accepted());
    }

    #[test]
    fn test_attack_spends_attack_and_cancels_move() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let attacker = spawn(&mut units, P1, Vec3Fixed::ZERO);
        let target = spawn(&mut units, P2, Vec3Fixed::from_ints(3, 0, 0));
        let mut authority = UnitAuthority::new(&mut units, &mut events, ctx(Some(P1)));

        assert!(authority
            .request_move(attacker, P1, Vec3Fixed::from_ints(0, 0, 2))
            .is_accepted());
        let outcome = authority.request_attack(attacker, P1, target, 10);
        assert_eq!(
            outcome,
            AttackOutcome::Hit {
                damage: DamageOutcome::Damaged {
                    dealt: 10,
                    remaining: 20
                }
            }
        );

        let unit = units.get(attacker).unwrap();
        assert!(!unit.can_attack());
        assert_eq!(unit.target_position(), unit.position());
        assert_eq!(unit.movement_remaining(), Fixed::from_num(3));
        assert_eq!(units.get(target).unwrap().health().current, 20);
    }

    #[test]
    fn test_second_attack_same_turn_is_rejected() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let attacker = spawn(&mut units, P1, Vec3Fixed::ZERO);
        let target = spawn(&mut units, P2, Vec3Fixed::from_ints(1, 0, 0));
        let mut authority = UnitAuthority::new(&mut units, &mut events, ctx(Some(P1)));

        assert!(authority.request_attack(attacker, P1, target, 5).is_accepted());
        assert_eq!(
            authority.request_attack(attacker, P1, target, 5),
            AttackOutcome::Rejected(Rejection::AttackSpent(attacker))
        );
    }

    #[test]
    fn test_attack_range_boundary_uses_epsilon() {
        let mut units = UnitStorage::new();
        let attacker = spawn(&mut units, P1, Vec3Fixed::ZERO);
        let inside = spawn(
            &mut units,
            P2,
            Vec3Fixed::new(Fixed::from_num(4) + ATTACK_RANGE_EPSILON, Fixed::ZERO, Fixed::ZERO),
        );
        let outside = spawn(
            &mut units,
            P2,
            Vec3Fixed::new(
                Fixed::from_num(4) + ATTACK_RANGE_EPSILON + Fixed::DELTA,
                Fixed::ZERO,
                Fixed::ZERO,
            ),
        );

        assert!(can_attack(&units, attacker, inside));
        assert!(!can_attack(&units, attacker, outside));

        let mut events = EventQueue::new();
        let mut authority = UnitAuthority::new(&mut units, &mut events, ctx(Some(P1)));
        assert_eq!(
            authority.request_attack(attacker, P1, outside, 5),
            AttackOutcome::Rejected(Rejection::OutOfRange {
                unit: attacker,
                target: outside
            })
        );
        assert!(authority.request_attack(attacker, P1, inside, 5).is_accepted());
    }

    #[test]
    fn test_attack_on_dead_or_self_is_rejected() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let attacker = spawn(&mut units, P1, Vec3Fixed::ZERO);
        let target = spawn(&mut units, P2, Vec3Fixed::from_ints(1, 0, 0));
        let mut authority = UnitAuthority::new(&mut units, &mut events, ctx(Some(P1)));
        authority.apply_damage(target, 1_000);

        assert_eq!(
            authority.request_attack(attacker, P1, target, 5),
            AttackOutcome::Rejected(Rejection::InvalidTarget(target))
        );
        assert_eq!(
            authority.request_attack(attacker, P1, attacker, 5),
            AttackOutcome::Rejected(Rejection::SelfTarget(attacker))
        );
        assert!(units.get(attacker).unwrap().can_attack());
    }

    #[test]
    fn test_apply_damage_is_idempotent_at_death() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let id = spawn(&mut units, P1, Vec3Fixed::ZERO);
        let mut authority = UnitAuthority::new(&mut units, &mut events, ctx(Some(P1)));

        assert_eq!(authority.apply_damage(id, 30), DamageOutcome::Killed { dealt: 30 });
        assert_eq!(authority.apply_damage(id, 30), DamageOutcome::NoEffect);
        assert_eq!(authority.apply_damage(id, -5), DamageOutcome::NoEffect);

        let unit = units.get(id).unwrap();
        assert_eq!(unit.health().current, 0);
        assert_eq!(unit.life(), LifeState::Dead { despawn_at: 140 });
        let deaths = events
            .pending()
            .iter()
            .filter(|e| matches!(e, MatchEvent::UnitDied { .. }))
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn test_negative_damage_is_ignored() {
        let mut units = UnitStorage::new();
        let mut events = EventQueue::new();
        let id = spawn(&mut units, P1, Vec3Fixed::ZERO);
        let mut authority = UnitAuthority::new(&mut units, &mut events, ctx(Some(P1)));

        assert_eq!(authority.apply_damage(id, -20), DamageOutcome::NoEffect);
        assert_eq!(units.get(id).unwrap().health().current, 30);
    }
}
