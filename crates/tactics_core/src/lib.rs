//! # Tactics Core
//!
//! Authoritative turn and combat state machine for Skirmish Tactics.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No transport
//! - No wall clock (time advances by explicit ticks)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - A headless authority that serializes every request through one owner
//! - Read-only mirrors fed by events and snapshots
//! - Replay and determinism testing
//!
//! ## Crate Structure
//!
//! - [`unit`] - Per-unit records and storage
//! - [`authority`] - Move, attack and damage validation
//! - [`turn`] - Turn controller and turn timer
//! - [`draft`] - Loadout collection
//! - [`session`] - Match orchestration
//! - [`replay`] - Command log recording and re-execution
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod authority;
pub mod catalog;
pub mod command;
pub mod draft;
pub mod error;
pub mod events;
pub mod math;
pub mod replay;
pub mod roster;
pub mod session;
pub mod spawn;
pub mod turn;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::authority::{
        can_attack, AttackOutcome, DamageOutcome, MoveOutcome, ATTACK_RANGE_EPSILON,
        MIN_MOVE_DISTANCE,
    };
    pub use crate::catalog::{UnitCatalog, UnitTemplate};
    pub use crate::command::{CommandOutcome, MatchCommand};
    pub use crate::draft::{DraftPhase, DraftProgress, Loadout, LOADOUT_SLOTS};
    pub use crate::error::{GameError, Rejection, Result};
    pub use crate::events::{MatchEvent, PresentationSink};
    pub use crate::math::{Fixed, Vec3Fixed};
    pub use crate::replay::{Recorder, Replay};
    pub use crate::session::{MatchConfig, MatchSession, SessionSnapshot, UnitView, TICK_RATE};
    pub use crate::spawn::{SpawnService, UnitSpawner, ZoneSpawner};
    pub use crate::turn::{EndTurnOutcome, TurnPhase, TurnTimer};
    pub use crate::unit::{Health, LifeState, PlayerId, Unit, UnitId, UnitTypeId};
}
