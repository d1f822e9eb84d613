//! Management plane integration subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:   registrar.rs → client.rs GET /register/node → NodeIdentity
//! Reload:    coalescer    → client.rs GET /system/apis   → Vec<ConfigEntry>
//! Shutdown:  registrar.rs → client.rs DELETE /system/node
//!
//! Every response → envelope.rs ({Status, Nonce, Message}) → typed result
//! ```
//!
//! # Design Decisions
//! - The client never retries; startup/shutdown logic and the reload
//!   coalescer own retry policy
//! - Node identity lives only inside the registrar

pub mod client;
pub mod envelope;
pub mod registrar;

pub use client::ManagementClient;
pub use envelope::{Registration, ResponseEnvelope};
pub use registrar::{NodeRegistrar, RegistrationState, RegistrationStatus};
