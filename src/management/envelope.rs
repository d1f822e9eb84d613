//! Management plane response envelope.
//!
//! Every call returns `{"Status": .., "Nonce": .., "Message": ..}`. The shape
//! of `Message` depends on the call; a mismatch is a decode failure, never a
//! partial success.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::specs::entry::{json_type, ConfigEntry};

/// Status value of a successful call.
pub const STATUS_OK: &str = "OK";

/// Decoded `{Status, Nonce, Message}` envelope.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    #[serde(rename = "Status", alias = "status")]
    pub status: String,

    #[serde(rename = "Nonce", alias = "nonce", default)]
    pub nonce: String,

    #[serde(rename = "Message", alias = "message", default)]
    pub message: Value,
}

/// Node identity returned by the registration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub node_id: String,
    pub nonce: String,
}

#[derive(Deserialize)]
struct RegistrationMessage {
    #[serde(rename = "NodeID", alias = "nodeID", alias = "node_id", alias = "NodeId")]
    node_id: String,
}

impl ResponseEnvelope {
    /// Parse a response body and require `Status == "OK"`.
    pub fn parse_ok(body: &[u8]) -> SyncResult<Self> {
        let envelope: ResponseEnvelope = serde_json::from_slice(body)
            .map_err(|e| SyncError::Decode(format!("malformed response envelope: {e}")))?;

        if envelope.status != STATUS_OK {
            return Err(SyncError::Connection(format!(
                "management plane returned status '{}': {}",
                envelope.status,
                describe(&envelope.message)
            )));
        }
        Ok(envelope)
    }

    /// Interpret `Message` as a registration response.
    pub fn into_registration(self) -> SyncResult<Registration> {
        let message: RegistrationMessage = serde_json::from_value(self.message)
            .map_err(|e| SyncError::Decode(format!("registration message: {e}")))?;

        if message.node_id.is_empty() {
            return Err(SyncError::Decode("registration returned an empty node ID".into()));
        }

        Ok(Registration {
            node_id: message.node_id,
            nonce: self.nonce,
        })
    }

    /// Interpret `Message` as a list of configuration entries.
    pub fn into_entries(self) -> SyncResult<Vec<ConfigEntry>> {
        match self.message {
            Value::Array(items) => items.into_iter().map(ConfigEntry::from_value).collect(),
            other => Err(SyncError::Decode(format!(
                "configuration list must be an array, got {}",
                json_type(&other)
            ))),
        }
    }
}

fn describe(message: &Value) -> String {
    match message {
        Value::String(s) => s.clone(),
        Value::Null => "no message".to_string(),
        other => other.to_string(),
    }
}
