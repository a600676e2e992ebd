//! # Tactics Server
//!
//! Headless authority for a two-player tactics match.
//!
//! One task owns the [`MatchSession`](tactics_core::session::MatchSession);
//! clients talk to it through an [`AuthorityHandle`], and every request and
//! clock tick is applied in arrival order. Events are published on a
//! broadcast channel for mirrors and presentation layers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod handle;
pub mod script;
pub mod worker;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use handle::{spawn_authority, AuthorityHandle};
