//! Unit spawning.
//!
//! Record creation belongs to the core; where units appear is decided by a
//! pluggable [`SpawnService`].

use std::fmt;

use tracing::debug;

use crate::catalog::UnitCatalog;
use crate::draft::Loadout;
use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec3Fixed};
use crate::unit::{PlayerId, Unit, UnitId, UnitStorage, UnitTypeId};

/// Creates live unit records on behalf of a [`SpawnService`].
#[derive(Debug)]
pub struct UnitSpawner<'a> {
    units: &'a mut UnitStorage,
    catalog: &'a UnitCatalog,
}

impl<'a> UnitSpawner<'a> {
    /// Spawner writing into `units`, reading stats from `catalog`.
    pub fn new(units: &'a mut UnitStorage, catalog: &'a UnitCatalog) -> Self {
        Self { units, catalog }
    }

    /// Create one unit of catalog type `unit_type` at `position`.
    ///
    /// # Errors
    ///
    /// Fails if `unit_type` is not in the catalog.
    pub fn spawn(
        &mut self,
        owner: PlayerId,
        unit_type: UnitTypeId,
        position: Vec3Fixed,
    ) -> Result<UnitId> {
        let template = self
            .catalog
            .get(unit_type)
            .ok_or_else(|| GameError::InvalidState(format!("unknown unit type {unit_type}")))?;
        let id = self
            .units
            .insert(Unit::from_template(owner, unit_type, template, position));
        debug!(unit = %id, player = %owner, unit_type, "Unit spawned");
        Ok(id)
    }
}

/// Places a player's drafted units in the world.
pub trait SpawnService: fmt::Debug + Send {
    /// Spawn every unit in `loadout` for `owner`, returning ids in slot order.
    ///
    /// `is_primary` is true for the first player in connection order.
    ///
    /// # Errors
    ///
    /// Propagates spawner failures.
    fn spawn_units(
        &mut self,
        spawner: &mut UnitSpawner<'_>,
        owner: PlayerId,
        loadout: &Loadout,
        is_primary: bool,
    ) -> Result<Vec<UnitId>>;
}

/// Lines units up across two facing deployment zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneSpawner {
    /// Centre of the primary player's line.
    pub zone_a: Vec3Fixed,
    /// Centre of the other player's line.
    pub zone_b: Vec3Fixed,
    /// Gap between neighbouring units along x.
    pub spacing: Fixed,
}

impl Default for ZoneSpawner {
    fn default() -> Self {
        Self {
            zone_a: Vec3Fixed::from_ints(0, 0, -10),
            zone_b: Vec3Fixed::from_ints(0, 0, 10),
            spacing: Fixed::from_num(2),
        }
    }
}

impl SpawnService for ZoneSpawner {
    fn spawn_units(
        &mut self,
        spawner: &mut UnitSpawner<'_>,
        owner: PlayerId,
        loadout: &Loadout,
        is_primary: bool,
    ) -> Result<Vec<UnitId>> {
        let centre = if is_primary { self.zone_a } else { self.zone_b };
        let slots = loadout.slots();
        let half = Fixed::from_num(slots.len() - 1) / Fixed::from_num(2);

        slots
            .iter()
            .enumerate()
            .map(|(i, &unit_type)| {
                let offset = (Fixed::from_num(i) - half) * self.spacing;
                let position = Vec3Fixed::new(centre.x + offset, centre.y, centre.z);
                spawner.spawn(owner, unit_type, position)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_spawner_places_line_in_zone() {
        let catalog = UnitCatalog::standard();
        let mut units = UnitStorage::new();
        let mut spawner = UnitSpawner::new(&mut units, &catalog);
        let mut service = ZoneSpawner::default();

        let ids = service
            .spawn_units(&mut spawner, PlayerId(1), &Loadout::DEFAULT, true)
            .unwrap();

        assert_eq!(ids.len(), 5);
        let first = units.get(ids[0]).unwrap();
        let last = units.get(ids[4]).unwrap();
        assert_eq!(first.position(), Vec3Fixed::from_ints(-4, 0, -10));
        assert_eq!(last.position(), Vec3Fixed::from_ints(4, 0, -10));
        assert!(ids.iter().all(|&id| units.get(id).unwrap().owner() == PlayerId(1)));
    }

    #[test]
    fn test_secondary_player_uses_zone_b() {
        let catalog = UnitCatalog::standard();
        let mut units = UnitStorage::new();
        let mut spawner = UnitSpawner::new(&mut units, &catalog);

        let ids = ZoneSpawner::default()
            .spawn_units(&mut spawner, PlayerId(2), &Loadout::DEFAULT, false)
            .unwrap();

        assert_eq!(
            units.get(ids[2]).unwrap().position(),
            Vec3Fixed::from_ints(0, 0, 10)
        );
    }

    #[test]
    fn test_spawner_rejects_unknown_type() {
        let catalog = UnitCatalog::standard();
        let mut units = UnitStorage::new();
        let mut spawner = UnitSpawner::new(&mut units, &catalog);
        assert!(spawner.spawn(PlayerId(1), 99, Vec3Fixed::ZERO).is_err());
        assert!(units.is_empty());
    }
}
