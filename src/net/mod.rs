//! Network helpers.
//!
//! - tls.rs: crypto provider setup and TLS failure detection for error
//!   classification

pub mod tls;
