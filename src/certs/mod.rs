//! Certificate storage subsystem.
//!
//! # Data Flow
//! ```text
//! PEM files listed in config / operator calls
//!     → store.rs (parse chain + key, compute ID, insert)
//!     → management client resolves the configured ID per call
//!     → client identity presented during the TLS handshake
//! ```
//!
//! # Design Decisions
//! - IDs are content derived (SHA-256 of the leaf certificate)
//! - Records are immutable; replacement means remove + add
//! - Read-mostly: concurrent lookups never block each other

pub mod store;

pub use store::{CertificateError, CertificateRecord, CertificateStore};
