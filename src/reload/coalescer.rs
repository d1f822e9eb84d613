//! Single-flight, coalescing reload scheduler.
//!
//! # Scheduling Rules
//! ```text
//! idle,      trigger → pending; worker wakes and starts a run
//! in flight, trigger → pending; one more run after the current one
//! pending,   trigger → still pending (triggers collapse, count is not kept)
//! ```
//!
//! A run consumes the pending flag *before* it fetches, so every trigger
//! consumed by a run arrived before that run's fetch started.
//!
//! # Design Decisions
//! - Only the worker task executes reloads; `in_flight` guards that invariant
//! - Failures never touch the store (fail static)
//! - Completion is published on a watch channel keyed by trigger sequence,
//!   so any number of tickets can await the run that covers them

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, Notify};
use tokio::time::{self, Interval};

use crate::config::ReloadConfig;
use crate::error::{SyncError, SyncResult};
use crate::observability::metrics;
use crate::specs::{ConfigEntry, ConfigGeneration, ConfigStore};

/// Source of the complete, authoritative configuration set.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch_configs(&self) -> SyncResult<Vec<ConfigEntry>>;
}

/// Result of one reload execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// A new generation was published.
    Applied { generation: u64, entries: usize },
    /// The fetch failed; the previous generation is still authoritative.
    Failed(SyncError),
}

impl ReloadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReloadOutcome::Applied { .. })
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    pending: bool,
    in_flight: bool,
    /// Sequence number of the most recent trigger.
    requested: u64,
}

#[derive(Debug, Clone, Default)]
struct Completion {
    /// Highest trigger sequence covered by a finished run.
    covered: u64,
    outcome: Option<ReloadOutcome>,
}

struct Inner {
    source: Arc<dyn ConfigSource>,
    store: Arc<ConfigStore>,
    config: ReloadConfig,
    state: Mutex<SchedulerState>,
    wake: Notify,
    completed: watch::Sender<Completion>,
    executions: AtomicU64,
}

/// Turns bursts of reload triggers into non-overlapping fetch-and-swap runs.
#[derive(Clone)]
pub struct ReloadCoalescer {
    inner: Arc<Inner>,
}

impl ReloadCoalescer {
    pub fn new(source: Arc<dyn ConfigSource>, store: Arc<ConfigStore>, config: ReloadConfig) -> Self {
        let (completed, _) = watch::channel(Completion::default());
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                config,
                state: Mutex::new(SchedulerState::default()),
                wake: Notify::new(),
                completed,
                executions: AtomicU64::new(0),
            }),
        }
    }

    /// Request a reload. Never blocks on the reload itself.
    pub fn trigger(&self) -> ReloadTicket {
        let sequence = {
            let mut state = self.lock_state();
            state.requested += 1;
            state.pending = true;
            state.requested
        };
        self.inner.wake.notify_one();

        tracing::trace!(sequence, "Reload triggered");
        ReloadTicket {
            sequence,
            completed: self.inner.completed.subscribe(),
        }
    }

    /// Number of reload executions started so far.
    pub fn executions(&self) -> u64 {
        self.inner.executions.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.lock_state().pending
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock_state().in_flight
    }

    /// The store this coalescer publishes into.
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.inner.store
    }

    /// Run the worker loop until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let debounce = Duration::from_millis(self.inner.config.debounce_ms);
        let mut reconcile = match self.inner.config.reconcile_interval_secs {
            0 => None,
            secs => {
                let period = Duration::from_secs(secs);
                Some(time::interval_at(time::Instant::now() + period, period))
            }
        };

        tracing::info!(
            debounce_ms = self.inner.config.debounce_ms,
            reconcile_interval_secs = self.inner.config.reconcile_interval_secs,
            "Reload worker starting"
        );

        loop {
            tokio::select! {
                _ = self.inner.wake.notified() => {}
                _ = next_tick(&mut reconcile) => {
                    tracing::debug!("Periodic reconciliation");
                    self.trigger();
                    continue;
                }
                _ = shutdown.recv() => break,
            }

            if !debounce.is_zero() && self.is_pending() {
                tokio::select! {
                    _ = time::sleep(debounce) => {}
                    _ = shutdown.recv() => break,
                }
            }

            while self.run_pending().await {}
        }

        tracing::info!("Reload worker received shutdown signal, exiting loop");
    }

    /// Execute one run if a reload is pending. Returns whether it ran.
    async fn run_pending(&self) -> bool {
        let covered = {
            let mut state = self.lock_state();
            if !state.pending || state.in_flight {
                return false;
            }
            state.pending = false;
            state.in_flight = true;
            state.requested
        };

        let outcome = self.execute().await;

        self.lock_state().in_flight = false;
        self.inner.completed.send_replace(Completion {
            covered,
            outcome: Some(outcome),
        });
        true
    }

    async fn execute(&self) -> ReloadOutcome {
        let started = Instant::now();
        self.inner.executions.fetch_add(1, Ordering::SeqCst);

        match self.inner.source.fetch_configs().await {
            Ok(entries) => {
                // The worker is the only writer, so the next number is stable.
                let number = self.inner.store.snapshot().number() + 1;
                let generation = ConfigGeneration::new(number, entries);
                let count = generation.len();

                self.inner.store.swap(generation);
                metrics::record_reload("applied", started);

                ReloadOutcome::Applied {
                    generation: number,
                    entries: count,
                }
            }
            Err(e) => {
                let current = self.inner.store.snapshot().number();
                tracing::warn!(
                    error = %e,
                    kind = %e.kind(),
                    generation = current,
                    "Reload failed, keeping current configuration"
                );
                metrics::record_reload(e.kind().as_str(), started);
                ReloadOutcome::Failed(e)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ReloadCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadCoalescer")
            .field("config", &self.inner.config)
            .field("executions", &self.executions())
            .finish()
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Handle for awaiting the reload run that covers one trigger.
#[derive(Debug, Clone)]
pub struct ReloadTicket {
    sequence: u64,
    completed: watch::Receiver<Completion>,
}

impl ReloadTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Wait until a run that started after this trigger has finished.
    ///
    /// Yields the outcome of the latest finished run, which may be a later
    /// one than the run that first covered this trigger. Returns `None` if
    /// the coalescer was dropped first.
    pub async fn wait(mut self) -> Option<ReloadOutcome> {
        let sequence = self.sequence;
        let completion = self
            .completed
            .wait_for(|c| c.covered >= sequence)
            .await
            .ok()?;
        completion.outcome.clone()
    }
}
