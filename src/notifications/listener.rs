//! Change notification listener.
//!
//! # Responsibilities
//! - Keep one subscription to the change channel alive for the process lifetime
//! - Decode each message into a [`NotificationCommand`]
//! - Notify the registered handler, then enqueue one reload trigger
//! - Report each processed message through the returned [`Dispatched`]
//!
//! # Design Decisions
//! - Malformed or unknown messages are dropped and logged, never propagated
//! - Reloads run on the coalescer's worker, never inline in the receive loop
//! - Disconnects and subscribe failures lead to a resubscribe with backoff

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::NotificationConfig;
use crate::error::SyncError;
use crate::notifications::command::{self, NotificationCommand};
use crate::notifications::source::NotificationSource;
use crate::observability::metrics;
use crate::reload::{ReloadCoalescer, ReloadOutcome, ReloadTicket};
use crate::resilience::Backoff;

/// Callback invoked with every decoded command.
pub type CommandHandler = Arc<dyn Fn(NotificationCommand) + Send + Sync>;

/// Callback invoked once per consumed message, valid or not.
pub type CompletionHook = Arc<dyn Fn(&Dispatched) + Send + Sync>;

/// Result of processing one message.
///
/// Returning this value means the message was consumed; it says nothing
/// about whether the triggered reload has finished.
#[derive(Debug, Clone)]
pub enum Dispatched {
    /// Decoded, handled, and a reload was enqueued.
    Queued {
        command: NotificationCommand,
        reload: ReloadTicket,
    },
    /// Dropped as malformed or unrecognized.
    Dropped { reason: SyncError },
}

impl Dispatched {
    pub fn command(&self) -> Option<NotificationCommand> {
        match self {
            Dispatched::Queued { command, .. } => Some(*command),
            Dispatched::Dropped { .. } => None,
        }
    }

    /// Wait for the reload this message triggered. `None` if it was dropped.
    pub async fn reloaded(self) -> Option<ReloadOutcome> {
        match self {
            Dispatched::Queued { reload, .. } => reload.wait().await,
            Dispatched::Dropped { .. } => None,
        }
    }
}

/// Subscribes to the change channel and turns messages into reload triggers.
pub struct ChangeListener {
    source: Arc<dyn NotificationSource>,
    coalescer: ReloadCoalescer,
    config: NotificationConfig,
    handler: Option<CommandHandler>,
    on_complete: Option<CompletionHook>,
}

impl ChangeListener {
    pub fn new(source: Arc<dyn NotificationSource>, coalescer: ReloadCoalescer, config: NotificationConfig) -> Self {
        Self {
            source,
            coalescer,
            config,
            handler: None,
            on_complete: None,
        }
    }

    /// Register the handler notified with each decoded command.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(NotificationCommand) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Register a hook fired after each message has been consumed.
    pub fn with_completion_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Dispatched) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    /// Process one raw message.
    pub fn dispatch(&self, payload: &[u8]) -> Dispatched {
        let dispatched = match command::decode(payload) {
            Ok(command) => {
                metrics::record_notification(command.as_str());
                tracing::debug!(command = %command, "Notification received");

                if let Some(handler) = &self.handler {
                    handler(command);
                }
                let reload = self.coalescer.trigger();

                Dispatched::Queued { command, reload }
            }
            Err(reason) => {
                metrics::record_notification_dropped();
                tracing::warn!(error = %reason, "Dropping notification");
                Dispatched::Dropped { reason }
            }
        };

        if let Some(hook) = &self.on_complete {
            hook(&dispatched);
        }
        dispatched
    }

    /// Receive loop. Resubscribes after disconnects until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let channel = self.config.channel.clone();
        let backoff = Backoff::new(self.config.reconnect_base_delay_ms, self.config.reconnect_max_delay_ms);
        let mut attempt = 0u32;

        'subscribe: loop {
            let subscribed = tokio::select! {
                result = self.source.subscribe(&channel) => result,
                _ = shutdown.recv() => break 'subscribe,
            };

            match subscribed {
                Ok(mut subscription) => {
                    tracing::info!(channel = %channel, "Subscribed to change channel");
                    attempt = 0;

                    loop {
                        tokio::select! {
                            message = subscription.next_message() => match message {
                                Some(payload) => {
                                    self.dispatch(&payload);
                                }
                                None => {
                                    tracing::warn!(channel = %channel, "Change channel disconnected, resubscribing");
                                    break;
                                }
                            },
                            _ = shutdown.recv() => break 'subscribe,
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(channel = %channel, error = %e, "Failed to subscribe to change channel");
                }
            }

            attempt = attempt.saturating_add(1);
            let delay = backoff.delay(attempt);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => break 'subscribe,
            }
        }

        tracing::info!(channel = %channel, "Change listener received shutdown signal, exiting loop");
    }
}
