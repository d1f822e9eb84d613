//! Gateway node synchronization with a central management plane.

pub mod admin;
pub mod certs;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod management;
pub mod net;
pub mod notifications;
pub mod observability;
pub mod reload;
pub mod resilience;
pub mod specs;

pub use config::GatewayConfig;
pub use error::{ErrorKind, SyncError, SyncResult};
pub use lifecycle::{GatewaySync, Shutdown};
