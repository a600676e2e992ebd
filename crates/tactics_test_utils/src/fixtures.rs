//! Test fixtures and helpers.
//!
//! Pre-built sessions and unit placements for consistent testing.

use fixed::types::I32F32;
use tactics_core::catalog::UnitCatalog;
use tactics_core::draft::Loadout;
use tactics_core::error::Result;
use tactics_core::math::Vec3Fixed;
use tactics_core::session::{MatchConfig, MatchSession};
use tactics_core::spawn::{SpawnService, UnitSpawner};
use tactics_core::unit::{PlayerId, UnitId};

/// First player to connect.
pub const P1: PlayerId = PlayerId(1);

/// Second player to connect.
pub const P2: PlayerId = PlayerId(2);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Vector from whole-number coordinates.
#[must_use]
pub fn vec3(x: i32, y: i32, z: i32) -> Vec3Fixed {
    Vec3Fixed::from_ints(x, y, z)
}

/// Spawner that puts slot `i` at an explicit position.
///
/// Slots without a listed position go to the origin offset by the slot index
/// along y, so they never collide with listed positions on the ground plane.
#[derive(Debug, Clone, Default)]
pub struct PlacementSpawner {
    /// Positions for the first player's slots.
    pub primary: Vec<Vec3Fixed>,
    /// Positions for the second player's slots.
    pub secondary: Vec<Vec3Fixed>,
}

impl PlacementSpawner {
    /// Spawner with the given slot positions.
    #[must_use]
    pub fn new(primary: Vec<Vec3Fixed>, secondary: Vec<Vec3Fixed>) -> Self {
        Self { primary, secondary }
    }
}

impl SpawnService for PlacementSpawner {
    fn spawn_units(
        &mut self,
        spawner: &mut UnitSpawner<'_>,
        owner: PlayerId,
        loadout: &Loadout,
        is_primary: bool,
    ) -> Result<Vec<UnitId>> {
        let positions = if is_primary {
            &self.primary
        } else {
            &self.secondary
        };
        loadout
            .slots()
            .iter()
            .enumerate()
            .map(|(i, &unit_type)| {
                let fallback = Vec3Fixed::new(
                    I32F32::ZERO,
                    I32F32::from_num(100 + i),
                    I32F32::ZERO,
                );
                let position = positions.get(i).copied().unwrap_or(fallback);
                spawner.spawn(owner, unit_type, position)
            })
            .collect()
    }
}

/// Session with P1 and P2 connected and the draft open.
#[must_use]
pub fn drafting_session(config: MatchConfig) -> MatchSession {
    let mut session = MatchSession::new(config, UnitCatalog::standard());
    session.connect(P1).expect("connect P1");
    session.connect(P2).expect("connect P2");
    session
}

/// Started two-player match with default loadouts and zone placement.
///
/// Pending events are drained.
#[must_use]
pub fn started_match() -> MatchSession {
    let mut session = drafting_session(MatchConfig::default());
    session.force_draft().expect("force draft");
    session.drain_events();
    session
}

/// Started two-player match with explicit loadouts and placements.
///
/// Pending events are drained.
#[must_use]
pub fn placed_match(
    config: MatchConfig,
    p1_loadout: [u32; 5],
    p2_loadout: [u32; 5],
    spawner: PlacementSpawner,
) -> MatchSession {
    let mut session =
        MatchSession::with_spawner(config, UnitCatalog::standard(), Box::new(spawner));
    session.connect(P1).expect("connect P1");
    session.connect(P2).expect("connect P2");
    session
        .submit_loadout(P1, &p1_loadout)
        .expect("P1 loadout");
    session
        .submit_loadout(P2, &p2_loadout)
        .expect("P2 loadout");
    session.drain_events();
    session
}

/// A rifleman duel: P1's first unit at `p1_at`, P2's first unit at `p2_at`.
///
/// Returns the session and the two unit ids.
#[must_use]
pub fn duel(p1_at: Vec3Fixed, p2_at: Vec3Fixed) -> (MatchSession, UnitId, UnitId) {
    let session = placed_match(
        MatchConfig::default(),
        [0; 5],
        [0; 5],
        PlacementSpawner::new(vec![p1_at], vec![p2_at]),
    );
    let a = session.living_units_of(P1)[0];
    let b = session.living_units_of(P2)[0];
    (session, a, b)
}
