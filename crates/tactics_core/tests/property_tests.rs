//! Property tests for the authority's budget, range and damage rules.

use proptest::prelude::*;
use tactics_core::prelude::*;
use tactics_test_utils::determinism::strategies::{
    arb_command_sequence, arb_damage, arb_ground_position, arb_position,
};
use tactics_test_utils::fixtures::{duel, started_match, vec3, P1, P2};

/// Rounding slack for the clamped-move endpoint.
fn tolerance() -> Fixed {
    Fixed::from_num(1) / Fixed::from_num(10_000)
}

fn budgets(session: &MatchSession) -> Vec<(UnitId, Fixed)> {
    session
        .units()
        .sorted_ids()
        .into_iter()
        .filter_map(|id| session.unit(id).map(|u| (id, u.movement_remaining())))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn movement_budget_only_rises_at_turn_start(commands in arb_command_sequence(80)) {
        let mut session = started_match();

        for command in &commands {
            let turn_before = session.turn_number();
            let before = budgets(&session);
            let _ = session.apply(command);

            if session.turn_number() == turn_before {
                for (id, remaining) in before {
                    if let Some(unit) = session.unit(id) {
                        prop_assert!(
                            unit.movement_remaining() <= remaining,
                            "unit {} budget rose within turn {}", id, turn_before
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn clamped_move_travels_exactly_the_budget(
        start in arb_ground_position(),
        destination in arb_position(),
    ) {
        let (mut session, unit, _) = duel(start, vec3(0, 50, 0));
        let budget = session.unit(unit).unwrap().movement_remaining();
        let distance = start.distance(destination);
        prop_assume!(distance > budget);

        let outcome = session.request_move(unit, P1, destination);
        let moved_partially = matches!(outcome, MoveOutcome::Moved { partial: true, .. });
        prop_assert!(moved_partially);

        let unit = session.unit(unit).unwrap();
        let target = unit.target_position();
        prop_assert_eq!(unit.movement_remaining(), Fixed::ZERO);

        let travelled = start.distance(target);
        prop_assert!((travelled - budget).abs() <= tolerance(), "travelled {}", travelled);

        // The endpoint lies on the segment toward the destination.
        let rest = target.distance(destination);
        prop_assert!((travelled + rest - distance).abs() <= tolerance());
    }

    #[test]
    fn successful_attack_keeps_budget_and_cancels_move(
        offset in (0i32..4, 0i32..3),
        step in arb_ground_position(),
    ) {
        let target_at = vec3(offset.0, 0, offset.1);
        let (mut session, attacker, target) = duel(vec3(0, 0, 0), target_at);
        prop_assume!(vec3(0, 0, 0).distance(step) >= Fixed::from_num(1));

        let _ = session.request_move(attacker, P1, step);
        let budget = session.unit(attacker).unwrap().movement_remaining();

        let outcome = session.request_attack(attacker, P1, target, 3);
        prop_assert!(outcome.is_accepted());

        let unit = session.unit(attacker).unwrap();
        prop_assert!(!unit.can_attack());
        prop_assert_eq!(unit.movement_remaining(), budget);
        prop_assert_eq!(unit.target_position(), unit.position());
    }

    #[test]
    fn preview_agrees_with_authority(
        a in arb_position(),
        b in arb_position(),
    ) {
        let (mut session, attacker, target) = duel(a, b);

        let preview = session.can_attack(attacker, target);
        let accepted = session.request_attack(attacker, P1, target, 1).is_accepted();

        prop_assert_eq!(preview, accepted);
        prop_assert_eq!(
            preview,
            a.distance(b) <= session.unit(attacker).unwrap().attack_radius() + ATTACK_RANGE_EPSILON
        );
    }

    #[test]
    fn damage_is_idempotent_at_death(hits in proptest::collection::vec(arb_damage(), 1..30)) {
        let (mut session, _, victim) = duel(vec3(0, 0, 0), vec3(10, 0, 0));
        session.drain_events();

        let mut last = session.unit(victim).unwrap().health().current;
        for damage in hits {
            session.apply_damage(victim, damage);
            let now = session.unit(victim).unwrap().health().current;
            prop_assert!(now <= last);
            if last == 0 {
                prop_assert_eq!(now, 0);
            }
            last = now;
        }

        let deaths = session
            .drain_events()
            .iter()
            .filter(|e| matches!(e, MatchEvent::UnitDied { .. }))
            .count();
        prop_assert_eq!(deaths, usize::from(last == 0));
        prop_assert_eq!(session.unit(victim).unwrap().is_alive(), last > 0);
    }

    #[test]
    fn only_current_player_can_end_turn(requests in proptest::collection::vec(prop_oneof![Just(P1), Just(P2)], 1..20)) {
        let mut session = started_match();

        for requester in requests {
            let current = session.current_player();
            let turn = session.turn_number();
            let outcome = session.request_end_turn(requester);

            if Some(requester) == current {
                prop_assert!(outcome.is_accepted());
                prop_assert_eq!(session.turn_number(), turn + 1);
                prop_assert_ne!(session.current_player(), current);
            } else {
                prop_assert!(!outcome.is_accepted());
                prop_assert_eq!(session.turn_number(), turn);
            }
        }
    }
}
