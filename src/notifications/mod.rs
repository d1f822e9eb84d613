//! Change notification subsystem.
//!
//! # Data Flow
//! ```text
//! pub/sub channel (source.rs: in-process or WebSocket)
//!     → listener.rs receive loop
//!     → command.rs decode {"Command": ..}
//!     → handler callback
//!     → ReloadCoalescer::trigger()
//!     → Dispatched returned / completion hook fired
//! ```

pub mod command;
pub mod listener;
pub mod source;

pub use command::{NotificationCommand, NotificationEnvelope};
pub use listener::{ChangeListener, Dispatched};
pub use source::{ChannelSource, NotificationSource, Subscription, WebSocketSource};
