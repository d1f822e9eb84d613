//! API configuration store subsystem.
//!
//! # Data Flow
//! ```text
//! fetch response Message: [ {...}, {...} ]
//!     → entry.rs (ConfigEntry per element, ID derivation)
//!     → ConfigGeneration (built off-lock by the reload worker)
//!     → store.rs (atomic swap of Arc<ConfigGeneration>)
//!     → readers on the traffic path observe the new generation
//! ```

pub mod entry;
pub mod store;

pub use entry::{ConfigEntry, ConfigGeneration};
pub use store::ConfigStore;
