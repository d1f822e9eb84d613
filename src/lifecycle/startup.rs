//! Startup orchestration.
//!
//! # Responsibilities
//! - Load client certificates
//! - Claim the admin listener address
//! - Register the node (with retry) before anything that depends on it
//! - Start the reload worker and publish the initial generation
//! - Start the change listener and admin API
//! - Tear everything down in reverse order, deregistering last
//!
//! # Design Decisions
//! - Fail fast: a node that cannot register or load its first generation
//!   does not start
//! - Local resources are acquired before registering, so no local failure
//!   can leave a registered node behind
//! - Only connection and decode failures are retried at registration;
//!   auth failures will not fix themselves

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use crate::admin::{self, AdminState};
use crate::certs::{CertificateError, CertificateStore};
use crate::config::validation::ValidationError;
use crate::config::{ConfigError, GatewayConfig, NotificationConfig, RegistrationConfig};
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::lifecycle::shutdown::Shutdown;
use crate::management::{ManagementClient, NodeRegistrar};
use crate::notifications::{ChangeListener, NotificationSource, WebSocketSource};
use crate::reload::{ReloadCoalescer, ReloadOutcome};
use crate::resilience::Backoff;
use crate::specs::ConfigStore;

const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("certificate {path}: {source}")]
    Certificate {
        path: String,
        #[source]
        source: CertificateError,
    },

    #[error("registration failed: {0}")]
    Registration(SyncError),

    #[error("initial configuration load failed: {0}")]
    InitialLoad(SyncError),

    #[error("admin listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Load every configured PEM file into a new certificate store.
pub fn load_certificates(config: &GatewayConfig) -> Result<CertificateStore, StartupError> {
    let store = CertificateStore::new();
    for file in &config.certificates {
        match store.add_file(Path::new(&file.path)) {
            Ok(_) => {}
            Err(CertificateError::Duplicate(id)) => {
                tracing::warn!(path = %file.path, cert_id = %id, "Certificate already loaded");
            }
            Err(source) => {
                return Err(StartupError::Certificate {
                    path: file.path.clone(),
                    source,
                })
            }
        }
    }
    Ok(store)
}

/// Build the configured change channel transport, if enabled.
pub fn notification_source(config: &NotificationConfig) -> Result<Option<Arc<dyn NotificationSource>>, ConfigError> {
    if !config.enabled {
        return Ok(None);
    }
    let url = Url::parse(&config.url).map_err(|e| {
        ConfigError::Validation(vec![ValidationError::InvalidNotificationUrl(e.to_string())])
    })?;
    Ok(Some(Arc::new(WebSocketSource::new(url))))
}

/// Register, retrying connection and decode failures with backoff.
pub async fn register_with_retry(registrar: &NodeRegistrar, policy: &RegistrationConfig) -> SyncResult<String> {
    let backoff = Backoff::new(policy.base_delay_ms, policy.max_delay_ms);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match registrar.register().await {
            Ok(node_id) => return Ok(node_id),
            Err(e) if !matches!(e.kind(), ErrorKind::Connection | ErrorKind::Decode) => return Err(e),
            Err(e) if policy.max_attempts != 0 && attempt >= policy.max_attempts => {
                tracing::error!(attempt, error = %e, "Registration attempts exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = backoff.delay(attempt);
                tracing::warn!(attempt, delay = ?delay, error = %e, "Registration failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// A running sync subsystem.
pub struct GatewaySync {
    pub certs: CertificateStore,
    pub store: Arc<ConfigStore>,
    pub registrar: Arc<NodeRegistrar>,
    pub coalescer: ReloadCoalescer,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl GatewaySync {
    /// Register, load the first generation and start background tasks.
    pub async fn start(
        config: &GatewayConfig,
        certs: CertificateStore,
        source: Option<Arc<dyn NotificationSource>>,
    ) -> Result<Self, StartupError> {
        let client = ManagementClient::new(&config.management, certs.clone())?;
        let registrar = Arc::new(NodeRegistrar::new(client.clone()));

        let admin_listener = if config.admin.enabled {
            Some(TcpListener::bind(config.admin.bind_address.as_str()).await?)
        } else {
            None
        };

        register_with_retry(&registrar, &config.registration)
            .await
            .map_err(StartupError::Registration)?;

        let store = Arc::new(ConfigStore::new());
        let coalescer = ReloadCoalescer::new(Arc::new(client), Arc::clone(&store), config.reload.clone());
        let shutdown = Shutdown::new();

        let mut sync = Self {
            certs,
            store,
            registrar,
            coalescer: coalescer.clone(),
            shutdown: shutdown.clone(),
            tasks: Vec::new(),
        };

        sync.tasks.push(tokio::spawn(coalescer.clone().run(shutdown.subscribe())));

        let initial = coalescer.trigger().wait().await;
        match initial {
            Some(ReloadOutcome::Applied { generation, entries }) => {
                tracing::info!(generation, entries, "Initial configuration loaded");
            }
            failed => {
                let err = match failed {
                    Some(ReloadOutcome::Failed(e)) => e,
                    _ => SyncError::Connection("reload worker stopped".into()),
                };
                if let Err(e) = sync.stop().await {
                    tracing::warn!(error = %e, "Deregistration after failed startup also failed");
                }
                return Err(StartupError::InitialLoad(err));
            }
        }

        if let Some(source) = source {
            let listener = ChangeListener::new(source, coalescer.clone(), config.notifications.clone());
            sync.tasks.push(tokio::spawn(listener.run(shutdown.subscribe())));
        }

        if let Some(listener) = admin_listener {
            let state = AdminState::new(Arc::clone(&sync.registrar), coalescer, config.admin.api_key.clone());
            let admin_shutdown = shutdown.subscribe();
            sync.tasks.push(tokio::spawn(async move {
                if let Err(e) = admin::serve(listener, state, admin_shutdown).await {
                    tracing::error!(error = %e, "Admin server failed");
                }
            }));
        }

        Ok(sync)
    }

    /// Stop background tasks, then deregister.
    ///
    /// A deregistration failure is returned, not retried.
    pub async fn stop(self) -> SyncResult<()> {
        self.shutdown.trigger();
        for task in self.tasks {
            if tokio::time::timeout(TASK_STOP_TIMEOUT, task).await.is_err() {
                tracing::warn!("Background task did not stop in time");
            }
        }
        self.registrar.deregister().await
    }
}
