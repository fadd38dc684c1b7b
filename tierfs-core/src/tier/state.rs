use crate::protocol::CommandKind;
use crate::{Result, TierError};
use serde::{Deserialize, Serialize};

/// Lifecycle of a tier. `ShutDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierState {
    Uninitialized,
    Running,
    ShutDown,
}

impl TierState {
    /// Decide whether a command may run in this state.
    pub fn permits(self, kind: CommandKind) -> Result<()> {
        match (kind, self) {
            (CommandKind::Startup, Self::Uninitialized) => Ok(()),
            (CommandKind::Startup, Self::Running) => Err(TierError::AlreadyStarted),
            (CommandKind::Startup, Self::ShutDown) => Err(TierError::AlreadyShutDown),

            (CommandKind::Shutdown, Self::Running) => Ok(()),
            (CommandKind::Shutdown, Self::ShutDown) => Err(TierError::AlreadyShutDown),
            (CommandKind::Shutdown, Self::Uninitialized) => Err(TierError::InvalidState(
                "cannot shut down a tier that was never started".to_string(),
            )),

            (_, Self::Running) => Ok(()),
            (_, Self::Uninitialized) => Err(TierError::NotStarted),
            (_, Self::ShutDown) => Err(TierError::AlreadyShutDown),
        }
    }
}
