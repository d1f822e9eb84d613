//! Shared store for the current configuration generation.
//!
//! # Design Decisions
//! - Readers load an `Arc<ConfigGeneration>` without locking (arc-swap)
//! - Writers replace the whole generation with one pointer store; entries
//!   are never merged in place
//! - One instance per gateway process, passed explicitly to consumers

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::observability::metrics;
use crate::specs::entry::{ConfigEntry, ConfigGeneration};

/// Holds the authoritative [`ConfigGeneration`].
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<ConfigGeneration>,
}

impl ConfigStore {
    /// Create a store holding the empty generation.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(ConfigGeneration::empty()),
        }
    }

    /// Look up a single entry in the current generation.
    pub fn get(&self, id: &str) -> Option<Arc<ConfigEntry>> {
        self.current.load().get(id).cloned()
    }

    /// The full current generation. Stays valid after later swaps.
    pub fn snapshot(&self) -> Arc<ConfigGeneration> {
        self.current.load_full()
    }

    /// Publish a new generation, returning the one it replaced.
    pub fn swap(&self, generation: ConfigGeneration) -> Arc<ConfigGeneration> {
        let number = generation.number();
        let entries = generation.len();
        let previous = self.current.swap(Arc::new(generation));

        metrics::record_generation(number, entries);
        tracing::info!(
            generation = number,
            entries,
            previous_generation = previous.number(),
            "Configuration generation published"
        );
        previous
    }

    /// Whether a successful reload has ever been published.
    pub fn is_loaded(&self) -> bool {
        self.current.load().loaded_at().is_some()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
