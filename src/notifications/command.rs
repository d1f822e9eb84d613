//! Notification message decoding.

use serde::Deserialize;
use std::str::FromStr;

use crate::error::{SyncError, SyncResult};

/// Kind of configuration change announced on the change channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCommand {
    ApiUpdated,
    ApiAdded,
    ApiRemoved,
    GroupReload,
    PolicyChanged,
}

impl NotificationCommand {
    /// Wire name of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCommand::ApiUpdated => "ApiUpdated",
            NotificationCommand::ApiAdded => "ApiAdded",
            NotificationCommand::ApiRemoved => "ApiRemoved",
            NotificationCommand::GroupReload => "GroupReload",
            NotificationCommand::PolicyChanged => "PolicyChanged",
        }
    }
}

impl FromStr for NotificationCommand {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ApiUpdated" | "ConfigUpdated" => Ok(NotificationCommand::ApiUpdated),
            "ApiAdded" => Ok(NotificationCommand::ApiAdded),
            "ApiRemoved" | "ConfigRemoved" => Ok(NotificationCommand::ApiRemoved),
            "GroupReload" | "GroupReloadRequested" => Ok(NotificationCommand::GroupReload),
            "PolicyChanged" => Ok(NotificationCommand::PolicyChanged),
            other => Err(SyncError::Decode(format!("unrecognized notification command '{other}'"))),
        }
    }
}

impl std::fmt::Display for NotificationCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of one change channel message. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationEnvelope {
    #[serde(rename = "Command", alias = "command")]
    pub command: String,
}

/// Decode a raw message into a known command.
pub fn decode(payload: &[u8]) -> SyncResult<NotificationCommand> {
    let envelope: NotificationEnvelope = serde_json::from_slice(payload)
        .map_err(|e| SyncError::Decode(format!("malformed notification: {e}")))?;
    envelope.command.parse()
}
