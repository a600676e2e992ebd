//! Data-driven unit catalog.
//!
//! Loadouts refer to units by their index in this catalog, so the order of
//! entries is part of the protocol between draft clients and the authority.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed};
use crate::unit::UnitTypeId;

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitTemplate(
///     name: "rifleman",
///     max_health: 30,
///     move_speed: 21474836480,      // Fixed-point for 5.0
///     attack_radius: 17179869184,   // Fixed-point for 4.0
///     attack_damage: 10,
///     travel_speed: 1717986918,     // Fixed-point for 0.4
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTemplate {
    /// Display name.
    pub name: String,

    /// Maximum health points.
    pub max_health: u32,

    /// Movement budget granted at every turn start.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,

    /// Maximum distance at which this unit can attack.
    #[serde(with = "fixed_serde")]
    pub attack_radius: Fixed,

    /// Damage dealt per attack.
    pub attack_damage: i32,

    /// Distance covered per tick while travelling.
    #[serde(with = "fixed_serde")]
    pub travel_speed: Fixed,
}

impl UnitTemplate {
    fn defect(&self) -> Option<&'static str> {
        if self.max_health == 0 {
            Some("max_health must be positive")
        } else if self.move_speed < Fixed::ZERO {
            Some("move_speed must not be negative")
        } else if self.attack_radius < Fixed::ZERO {
            Some("attack_radius must not be negative")
        } else if self.travel_speed <= Fixed::ZERO {
            Some("travel_speed must be positive")
        } else {
            None
        }
    }
}

/// Ordered, non-empty list of unit templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCatalog {
    units: Vec<UnitTemplate>,
}

impl UnitCatalog {
    /// Create a catalog from templates.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EmptyCatalog`] if `units` is empty, and
    /// [`GameError::InvalidUnitTemplate`] for a template with zero health,
    /// a negative move speed or attack radius, or a travel speed that is
    /// not positive.
    pub fn new(units: Vec<UnitTemplate>) -> Result<Self> {
        if units.is_empty() {
            return Err(GameError::EmptyCatalog);
        }
        for (index, template) in units.iter().enumerate() {
            if let Some(reason) = template.defect() {
                return Err(GameError::InvalidUnitTemplate {
                    index,
                    name: template.name.clone(),
                    reason,
                });
            }
        }
        Ok(Self { units })
    }

    /// Built-in catalog used when no data file is supplied.
    #[must_use]
    pub fn standard() -> Self {
        let template = |name: &str, hp: u32, speed: i32, radius: i32, damage: i32, travel: f64| {
            UnitTemplate {
                name: name.to_string(),
                max_health: hp,
                move_speed: Fixed::from_num(speed),
                attack_radius: Fixed::from_num(radius),
                attack_damage: damage,
                travel_speed: Fixed::from_num(travel),
            }
        };

        Self {
            units: vec![
                template("rifleman", 30, 5, 4, 10, 0.5),
                template("scout", 20, 8, 3, 6, 0.75),
                template("heavy", 50, 3, 3, 15, 0.25),
                template("marksman", 25, 4, 7, 12, 0.5),
            ],
        }
    }

    /// Parse a catalog from a RON document (a list of [`UnitTemplate`]).
    ///
    /// `source` names the document in error messages.
    pub fn from_ron_str(text: &str, source: &str) -> Result<Self> {
        let units: Vec<UnitTemplate> =
            ron::from_str(text).map_err(|e| GameError::DataParseError {
                path: source.to_string(),
                message: e.to_string(),
            })?;
        Self::new(units)
    }

    /// Load a catalog from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&text, &path.display().to_string())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Always false; catalogs cannot be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether `index` names an entry.
    #[must_use]
    pub fn contains(&self, index: UnitTypeId) -> bool {
        (index as usize) < self.units.len()
    }

    /// Template at `index`.
    #[must_use]
    pub fn get(&self, index: UnitTypeId) -> Option<&UnitTemplate> {
        self.units.get(index as usize)
    }

    /// All templates in index order.
    #[must_use]
    pub fn templates(&self) -> &[UnitTemplate] {
        &self.units
    }
}

impl Default for UnitCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
