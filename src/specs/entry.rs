//! Configuration entries and generations.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{SyncError, SyncResult};

/// An opaque API configuration published by the management plane.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    id: String,
    definition: Value,
}

impl ConfigEntry {
    /// Build an entry from one element of a fetch response.
    ///
    /// The element must be a JSON object. Its ID is the first non-empty
    /// string among `id`, `api_id`, `api_definition.api_id` and
    /// `api_definition.id`, falling back to a hash of the content.
    pub fn from_value(definition: Value) -> SyncResult<Self> {
        if !definition.is_object() {
            return Err(SyncError::Decode(format!(
                "configuration entry must be an object, got {}",
                json_type(&definition)
            )));
        }

        let id = declared_id(&definition).unwrap_or_else(|| content_id(&definition));
        Ok(Self { id, definition })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The raw definition as received.
    pub fn definition(&self) -> &Value {
        &self.definition
    }
}

fn declared_id(definition: &Value) -> Option<String> {
    const POINTERS: [&str; 4] = ["/id", "/api_id", "/api_definition/api_id", "/api_definition/id"];

    POINTERS
        .iter()
        .filter_map(|p| definition.pointer(p).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

// serde_json's default map is ordered by key, so to_vec is canonical.
fn content_id(definition: &Value) -> String {
    let bytes = serde_json::to_vec(definition).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One complete, internally consistent set of configuration entries.
#[derive(Debug, Clone)]
pub struct ConfigGeneration {
    number: u64,
    loaded_at: Option<SystemTime>,
    entries: HashMap<String, Arc<ConfigEntry>>,
}

impl ConfigGeneration {
    /// The empty generation held before the first successful reload.
    pub fn empty() -> Self {
        Self {
            number: 0,
            loaded_at: None,
            entries: HashMap::new(),
        }
    }

    /// Build a generation from fetched entries. Later duplicates win.
    pub fn new(number: u64, entries: Vec<ConfigEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), Arc::new(entry)))
            .collect();

        Self {
            number,
            loaded_at: Some(SystemTime::now()),
            entries,
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// When this generation was built (`None` for the empty generation).
    pub fn loaded_at(&self) -> Option<SystemTime> {
        self.loaded_at
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ConfigEntry>> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<ConfigEntry>> {
        self.entries.values()
    }

    /// Entry IDs, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConfigGeneration {
    fn default() -> Self {
        Self::empty()
    }
}
