//! End-to-end match scenarios driven through the public session API.

use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{
    drafting_session, duel, fixed, placed_match, started_match, vec3, PlacementSpawner, P1, P2,
};

#[test]
fn scenario_first_connected_player_starts() {
    let mut session = MatchSession::default();
    session.connect(P1).unwrap();
    session.connect(P2).unwrap();
    session.force_draft().unwrap();

    assert_eq!(session.players(), &[P1, P2]);
    assert_eq!(session.current_player(), Some(P1));
    assert_eq!(session.turn_number(), 1);
    for id in session.living_units_of(P1) {
        let unit = session.unit(id).unwrap();
        assert_eq!(unit.movement_remaining(), unit.move_speed());
        assert!(unit.can_attack());
    }
}

#[test]
fn scenario_connection_order_decides_first_mover() {
    let mut session = MatchSession::default();
    session.connect(P2).unwrap();
    session.connect(P1).unwrap();
    session.force_draft().unwrap();

    assert_eq!(session.current_player(), Some(P2));
}

#[test]
fn scenario_move_beyond_budget_is_clamped() {
    let (mut session, unit, _) = duel(vec3(0, 0, 0), vec3(0, 0, 20));

    let outcome = session.request_move(unit, P1, vec3(10, 0, 0));

    assert!(matches!(outcome, MoveOutcome::Moved { partial: true, .. }));
    let unit = session.unit(unit).unwrap();
    assert_eq!(unit.move_speed(), fixed(5));
    assert_eq!(unit.target_position(), vec3(5, 0, 0));
    assert_eq!(unit.movement_remaining(), Fixed::ZERO);
}

#[test]
fn scenario_attack_at_exact_radius_succeeds() {
    let (mut session, attacker, target) = duel(vec3(0, 0, 0), vec3(4, 0, 0));
    assert!(session.can_attack(attacker, target));

    let outcome = session.request_attack(attacker, P1, target, 10);

    assert!(outcome.is_accepted());
    assert_eq!(session.unit(target).unwrap().health().current, 20);
    assert!(!session.unit(attacker).unwrap().can_attack());
}

#[test]
fn scenario_turn_timer_expiry_passes_turn() {
    let (mut session, p1_unit, p2_unit) = duel(vec3(0, 0, 0), vec3(0, 0, 3));
    assert_eq!(
        session.config().turn_duration_ticks,
        60 * u64::from(TICK_RATE)
    );

    // P2 spends its budget on turn 2.
    assert!(session.request_end_turn(P1).is_accepted());
    assert!(session.request_move(p2_unit, P2, vec3(0, 0, 8)).is_accepted());
    assert!(session.request_attack(p2_unit, P2, p1_unit, 5).is_accepted());
    let spent = session.unit(p2_unit).unwrap();
    assert!(!spent.can_attack());

    for _ in 0..1199 {
        session.tick();
    }
    assert_eq!(session.current_player(), Some(P2));
    session.tick();
    assert_eq!(session.current_player(), Some(P1));
    assert_eq!(session.turn_number(), 3);

    for _ in 0..1200 {
        session.tick();
    }
    assert_eq!(session.current_player(), Some(P2));
    assert_eq!(session.turn_number(), 4);
    for id in session.living_units_of(P2) {
        let unit = session.unit(id).unwrap();
        assert_eq!(unit.movement_remaining(), unit.move_speed());
        assert!(unit.can_attack());
    }
}

#[test]
fn scenario_out_of_range_loadout_is_rejected_whole() {
    let mut session = drafting_session(MatchConfig::default());
    let catalog_size = session.catalog().len();
    let out_of_range = u32::try_from(catalog_size).unwrap();

    let result = session.submit_loadout(P1, &[0, 1, 2, 3, out_of_range]);

    assert_eq!(
        result,
        Err(GameError::InvalidLoadout {
            slot: 4,
            index: out_of_range,
            catalog_size
        })
    );
    assert!(session.units().is_empty());
    assert_eq!(session.draft_phase(), DraftPhase::Open);

    // P2 submitting does not close the draft: P1 is still unsubmitted.
    assert!(matches!(
        session.submit_loadout(P2, &[1; 5]),
        Ok(DraftProgress::Waiting {
            submitted: 1,
            required: 2
        })
    ));
    assert!(session.units().is_empty());
}

#[test]
fn attack_cancels_in_flight_move() {
    let (mut session, attacker, target) = duel(vec3(0, 0, 0), vec3(3, 0, 0));

    assert!(session.request_move(attacker, P1, vec3(0, 0, -4)).is_accepted());
    session.tick();
    let mid_move = session.unit(attacker).unwrap().position();
    assert!(session.unit(attacker).unwrap().is_moving());

    assert!(session.request_attack(attacker, P1, target, 10).is_accepted());
    let unit = session.unit(attacker).unwrap();
    assert_eq!(unit.target_position(), mid_move);
    assert_eq!(unit.movement_remaining(), fixed(1));

    for _ in 0..10 {
        session.tick();
    }
    assert_eq!(session.unit(attacker).unwrap().position(), mid_move);
}

#[test]
fn requests_outside_turn_change_nothing() {
    let (mut session, p1_unit, p2_unit) = duel(vec3(0, 0, 0), vec3(1, 0, 0));
    let before = session.state_hash();

    assert_eq!(
        session.request_move(p2_unit, P2, vec3(2, 0, 0)),
        MoveOutcome::Rejected(Rejection::NotYourTurn { requester: P2 })
    );
    assert_eq!(
        session.request_attack(p1_unit, P2, p2_unit, 10),
        AttackOutcome::Rejected(Rejection::NotOwner {
            unit: p1_unit,
            requester: P2
        })
    );
    assert_eq!(
        session.request_end_turn(P2),
        EndTurnOutcome::Rejected(Rejection::NotYourTurn { requester: P2 })
    );
    assert_eq!(session.state_hash(), before);
}

#[test]
fn stale_timer_callback_is_ignored() {
    let mut session = started_match();
    assert_eq!(session.turn_timer().map(|t| t.turn_number), Some(1));
    assert!(session.request_end_turn(P1).is_accepted());

    assert_eq!(session.on_timer_expired(1), None);
    assert_eq!(session.current_player(), Some(P2));
    assert_eq!(session.turn_number(), 2);

    assert!(session.on_timer_expired(2).is_some());
    assert_eq!(session.current_player(), Some(P1));
}

#[test]
fn forced_turn_restarts_timer() {
    let mut session = started_match();
    for _ in 0..500 {
        session.tick();
    }
    assert!(session.force_end_turn().is_accepted());

    assert_eq!(
        session.turn_timer(),
        Some(TurnTimer {
            turn_number: 2,
            expires_at_tick: 1700
        })
    );
}

#[test]
fn killed_unit_cannot_be_targeted_and_despawns() {
    let (mut session, attacker, target) = duel(vec3(0, 0, 0), vec3(2, 0, 0));

    let outcome = session.request_attack(attacker, P1, target, 1_000);
    assert_eq!(
        outcome,
        AttackOutcome::Hit {
            damage: DamageOutcome::Killed { dealt: 30 }
        }
    );
    assert!(!session.can_attack(attacker, target));
    assert_eq!(session.apply_damage(target, 5), DamageOutcome::NoEffect);
    assert_eq!(session.living_units_of(P2).len(), 4);

    let despawn_delay = session.config().despawn_delay_ticks;
    for _ in 0..despawn_delay {
        session.tick();
    }
    assert!(session.unit(target).is_none());

    let events = session.drain_events();
    let deaths = events
        .iter()
        .filter(|e| matches!(e, MatchEvent::UnitDied { unit } if *unit == target))
        .count();
    assert_eq!(deaths, 1);
    assert!(events.contains(&MatchEvent::UnitDespawned { unit: target }));
}

#[test]
fn events_reach_presentation_sink_in_order() {
    let (mut session, attacker, target) = duel(vec3(0, 0, 0), vec3(2, 0, 0));
    session.request_attack(attacker, P1, target, 4);
    session.request_end_turn(P1);

    let mut sink: Vec<MatchEvent> = Vec::new();
    session.drain_into(&mut sink);

    assert_eq!(
        sink,
        vec![
            MatchEvent::UnitAttacked { attacker, target },
            MatchEvent::UnitDamaged {
                unit: target,
                amount: 4,
                remaining: 26
            },
            MatchEvent::TurnEnded { player: P1, turn: 1 },
            MatchEvent::TurnStarted { player: P2, turn: 2 },
        ]
    );
}

#[test]
fn mixed_loadouts_spawn_their_catalog_types() {
    let session = placed_match(
        MatchConfig::default(),
        [0, 1, 2, 3, 0],
        [3; 5],
        PlacementSpawner::default(),
    );
    let types: Vec<_> = session
        .living_units_of(P1)
        .into_iter()
        .map(|id| session.unit(id).unwrap().unit_type())
        .collect();
    assert_eq!(types, vec![0, 1, 2, 3, 0]);

    let scout = session.living_units_of(P1)[1];
    assert_eq!(session.unit(scout).unwrap().move_speed(), fixed(8));
}

#[test]
fn extreme_destinations_are_clamped_without_overflow() {
    let mut session = started_match();
    let unit = session.living_units_of(P1)[0];
    let origin = session.unit(unit).unwrap().position();

    let far_east = Vec3Fixed::new(Fixed::MAX, Fixed::ZERO, fixed(-10));
    let outcome = session.request_move(unit, P1, far_east);
    let MoveOutcome::Moved { target, used, partial } = outcome else {
        panic!("expected a clamped move, got {outcome:?}");
    };
    assert!(partial);
    assert_eq!(used, fixed(5));
    assert_eq!(target, vec3(1, 0, -10));
    assert_eq!(session.unit(unit).unwrap().movement_remaining(), Fixed::ZERO);

    let other = session.living_units_of(P1)[1];
    let far_corner = Vec3Fixed::new(Fixed::MIN, Fixed::MIN, Fixed::MIN);
    let outcome = session.request_move(other, P1, far_corner);
    assert!(outcome.is_accepted());
    let target = session.unit(other).unwrap().target_position();
    assert!(session.unit(other).unwrap().position().distance(target) <= fixed(5) + Fixed::DELTA);

    for _ in 0..40 {
        session.tick();
    }
    assert_eq!(session.unit(unit).unwrap().position(), vec3(1, 0, -10));
    assert_ne!(session.unit(unit).unwrap().position(), origin);
}
