//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load certificates → Register → Reload worker → Initial load
//!     → Change listener → Admin API
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop tasks → Deregister → Exit
//! ```

pub mod shutdown;
pub mod startup;

pub use shutdown::{wait_for_signal, Shutdown};
pub use startup::{GatewaySync, StartupError};
