//! Server configuration loaded from RON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tactics_core::catalog::UnitCatalog;
use tactics_core::session::{MatchConfig, TICK_RATE};

use crate::error::{Result, ServerError};

/// Server configuration.
///
/// # Example RON
///
/// ```ron
/// ServerConfig(
///     tick_rate: 20,
///     event_buffer: 256,
///     command_buffer: 64,
///     match_config: MatchConfig(
///         turn_duration_ticks: 1200,
///         despawn_delay_ticks: 40,
///         local_authority: false,
///     ),
///     catalog_path: Some("data/units.ron"),
///     replay_path: None,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Ticks per second driven into the session.
    pub tick_rate: u32,
    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
    /// Capacity of the request queue.
    pub command_buffer: usize,
    /// Per-match rules.
    pub match_config: MatchConfig,
    /// Unit catalog file; the built-in catalog when absent.
    pub catalog_path: Option<PathBuf>,
    /// Where to write the command log on shutdown.
    pub replay_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            event_buffer: 256,
            command_buffer: 64,
            match_config: MatchConfig::default(),
            catalog_path: None,
            replay_path: None,
        }
    }
}

impl ServerConfig {
    /// Parse a configuration from RON text. `source` names it in errors.
    pub fn from_ron_str(text: &str, source: &Path) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| ServerError::Parse {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text, path)
    }

    /// Reject values the authority cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(ServerError::InvalidConfig(format!(
                "tick_rate must be within 1..=1000, got {}",
                self.tick_rate
            )));
        }
        if self.event_buffer == 0 || self.command_buffer == 0 {
            return Err(ServerError::InvalidConfig(
                "channel buffers must be non-zero".to_string(),
            ));
        }
        if self.match_config.turn_duration_ticks == 0 {
            return Err(ServerError::InvalidConfig(
                "turn_duration_ticks must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Wall-clock length of one tick.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.tick_rate.max(1)))
    }

    /// The configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<UnitCatalog> {
        match &self.catalog_path {
            Some(path) => Ok(UnitCatalog::load(path)?),
            None => Ok(UnitCatalog::standard()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = ServerConfig::from_ron_str(
            "ServerConfig(tick_rate: 10, match_config: MatchConfig(local_authority: true))",
            Path::new("inline"),
        )
        .unwrap();

        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.event_buffer, 256);
        assert!(config.match_config.local_authority);
        assert_eq!(config.match_config.turn_duration_ticks, 1200);
        assert_eq!(config.tick_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_zero_tick_rate_is_rejected() {
        let result = ServerConfig::from_ron_str("ServerConfig(tick_rate: 0)", Path::new("inline"));
        assert!(matches!(result, Err(ServerError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_config_names_file() {
        let err = ServerConfig::from_ron_str("ServerConfig(", Path::new("server.ron")).unwrap_err();
        assert!(err.to_string().contains("server.ron"));
    }

    #[test]
    fn test_default_catalog_without_path() {
        let catalog = ServerConfig::default().load_catalog().unwrap();
        assert_eq!(catalog, UnitCatalog::standard());
    }
}
