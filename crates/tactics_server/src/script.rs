//! Scripted command files for headless runs.
//!
//! A script is a RON list of commands. `Tick` entries wait one tick period
//! instead of being sent, so the authority's own clock keeps running.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use tactics_core::command::MatchCommand;

use crate::error::{Result, ServerError};
use crate::handle::AuthorityHandle;

/// Parse a script from RON text.
pub fn parse_script(text: &str, source: &Path) -> Result<Vec<MatchCommand>> {
    ron::from_str(text).map_err(|e| ServerError::Parse {
        path: source.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read and parse a script file.
pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Vec<MatchCommand>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ServerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&text, path)
}

/// Play `commands` against the authority.
///
/// Game errors are logged and the script continues; a lost authority ends
/// it. Returns how many commands were accepted.
pub async fn run_script(
    handle: &AuthorityHandle,
    commands: Vec<MatchCommand>,
    tick_period: Duration,
) -> Result<usize> {
    let mut accepted = 0;

    for (index, command) in commands.into_iter().enumerate() {
        if command == MatchCommand::Tick {
            tokio::time::sleep(tick_period).await;
            continue;
        }

        match handle.submit(command).await {
            Ok(outcome) => {
                info!(index, ?outcome, "Script command applied");
                accepted += 1;
            }
            Err(ServerError::Game(error)) => {
                warn!(index, %error, "Script command failed");
            }
            Err(error) => return Err(error),
        }
    }

    Ok(accepted)
}
