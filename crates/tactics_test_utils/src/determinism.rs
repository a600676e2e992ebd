//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match session produces identical
//! results given identical command streams.
//!
//! # Testing Strategy
//!
//! The authority must be deterministic so that replays and mirrors agree.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: positions and budgets use fixed-point
//!   arithmetic via [`tactics_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are always processed in sorted id order.
//!
//! - **Wall-clock time**: the session only advances on explicit ticks.

use std::thread;

use tracing::warn;

use tactics_core::command::MatchCommand;
use tactics_core::session::MatchSession;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps applied per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic session).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Session is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one step
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Apply `commands` to a fresh session from `setup`, ignoring errors.
pub fn run_commands<F>(setup: F, commands: &[MatchCommand]) -> MatchSession
where
    F: Fn() -> MatchSession,
{
    let mut session = setup();
    for command in commands {
        let _ = session.apply(command);
    }
    session.drain_events();
    session
}

/// Apply the same command stream `runs` times and compare final hashes.
pub fn verify_session_determinism<F>(
    setup: F,
    commands: &[MatchCommand],
    runs: usize,
) -> DeterminismResult
where
    F: Fn() -> MatchSession,
{
    let hashes: Vec<u64> = (0..runs)
        .map(|_| run_commands(&setup, commands).state_hash())
        .collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        warn!(runs, commands = commands.len(), ?hashes, "Command stream diverged");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        steps: commands.len() as u64,
    }
}

/// Apply the same command stream on `threads` scoped threads.
///
/// Catches non-determinism that only shows under different hasher seeds or
/// memory layouts per thread.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn verify_parallel_determinism<F>(
    setup: F,
    commands: &[MatchCommand],
    threads: usize,
) -> DeterminismResult
where
    F: Fn() -> MatchSession + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| s.spawn(|| run_commands(&setup, commands).state_hash()))
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps: commands.len() as u64,
    }
}

/// Verify that serialization round-trip preserves session state exactly.
pub fn verify_serialization_roundtrip(session: &MatchSession) -> bool {
    let Ok(bytes) = session.serialize() else {
        return false;
    };
    let Ok(restored) = MatchSession::deserialize(&bytes) else {
        return false;
    };
    session.state_hash() == restored.state_hash()
}

/// Proptest strategies for determinism and property testing.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::command::MatchCommand;
    use tactics_core::math::{Fixed, Vec3Fixed};
    use tactics_core::unit::{PlayerId, UnitId};

    /// Coordinates within a small battlefield, at 1/16 resolution.
    pub fn arb_coordinate() -> impl Strategy<Value = Fixed> {
        (-400i32..400i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(16))
    }

    /// Position on the ground plane.
    pub fn arb_ground_position() -> impl Strategy<Value = Vec3Fixed> {
        (arb_coordinate(), arb_coordinate()).prop_map(|(x, z)| Vec3Fixed::new(x, Fixed::ZERO, z))
    }

    /// Position anywhere in the battlefield volume.
    pub fn arb_position() -> impl Strategy<Value = Vec3Fixed> {
        (arb_coordinate(), arb_coordinate(), arb_coordinate())
            .prop_map(|(x, y, z)| Vec3Fixed::new(x, y, z))
    }

    /// Damage values, including negative ones.
    pub fn arb_damage() -> impl Strategy<Value = i32> {
        -20i32..80i32
    }

    /// Loadout slots, some of which may be out of range for `catalog_size`.
    pub fn arb_loadout_slots(catalog_size: u32) -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(0..=catalog_size, 5)
    }

    /// One of the two players.
    pub fn arb_player() -> impl Strategy<Value = PlayerId> {
        prop_oneof![Just(PlayerId(1)), Just(PlayerId(2))]
    }

    /// One of the first `max` unit ids.
    pub fn arb_unit(max: u64) -> impl Strategy<Value = UnitId> {
        (1..=max).prop_map(UnitId)
    }

    /// Any in-match command for a ten-unit, two-player match.
    pub fn arb_match_command() -> impl Strategy<Value = MatchCommand> {
        prop_oneof![
            3 => (arb_unit(10), arb_player(), arb_ground_position()).prop_map(
                |(unit, requester, destination)| MatchCommand::Move {
                    unit,
                    requester,
                    destination,
                }
            ),
            3 => (arb_unit(10), arb_player(), arb_unit(10), proptest::option::of(arb_damage()))
                .prop_map(|(unit, requester, target, damage)| MatchCommand::Attack {
                    unit,
                    requester,
                    target,
                    damage,
                }),
            1 => arb_player().prop_map(|requester| MatchCommand::EndTurn { requester }),
            4 => Just(MatchCommand::Tick),
        ]
    }

    /// Generate a sequence of in-match commands.
    pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<MatchCommand>> {
        proptest::collection::vec(arb_match_command(), 0..max_len)
    }
}
