//! Reload scheduling subsystem.
//!
//! # Data Flow
//! ```text
//! notification / admin / reconciliation tick
//!     → coalescer.rs trigger() (pending flag, ReloadTicket)
//!     → worker task: ConfigSource::fetch_configs()
//!     → ConfigGeneration built off-lock
//!     → ConfigStore::swap()  (or fail static on error)
//!     → completion published to ticket holders
//! ```

pub mod coalescer;

pub use coalescer::{ConfigSource, ReloadCoalescer, ReloadOutcome, ReloadTicket};
