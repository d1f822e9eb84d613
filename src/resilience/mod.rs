//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Registration at startup / notification resubscribe:
//!     → failure observed
//!     → backoff.rs (exponential delay with jitter)
//!     → retry
//! ```
//!
//! # Design Decisions
//! - The management client itself never retries
//! - Reload fetches are not retried; the next trigger is the retry

pub mod backoff;

pub use backoff::Backoff;
