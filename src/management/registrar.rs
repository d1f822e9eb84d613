//! Node registration state machine.
//!
//! # State Transitions
//! ```text
//! Unregistered → Registered:   register() succeeds
//! Registered   → Unregistered: deregister() succeeds
//! ```
//!
//! Transitions hold one async mutex across the network call, so concurrent
//! register/deregister calls are serialized and never leave a half-updated
//! identity behind. Readers see a published [`RegistrationStatus`] that is
//! replaced whole after each transition and never waits on that mutex.

use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{SyncError, SyncResult};
use crate::management::client::ManagementClient;
use crate::observability::metrics;

/// Registration state of this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registered,
}

/// Point-in-time view of the registration, consistent across fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationStatus {
    pub state: RegistrationState,
    pub node_id: Option<String>,
}

impl RegistrationStatus {
    fn unregistered() -> Self {
        Self {
            state: RegistrationState::Unregistered,
            node_id: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }
}

#[derive(Debug)]
struct NodeIdentity {
    node_id: String,
    session_nonce: String,
    state: RegistrationState,
}

impl NodeIdentity {
    fn unregistered() -> Self {
        Self {
            node_id: String::new(),
            session_nonce: String::new(),
            state: RegistrationState::Unregistered,
        }
    }
}

/// Owns this node's identity with the management plane.
#[derive(Debug)]
pub struct NodeRegistrar {
    client: ManagementClient,
    identity: Mutex<NodeIdentity>,
    status: ArcSwap<RegistrationStatus>,
}

impl NodeRegistrar {
    pub fn new(client: ManagementClient) -> Self {
        Self {
            client,
            identity: Mutex::new(NodeIdentity::unregistered()),
            status: ArcSwap::from_pointee(RegistrationStatus::unregistered()),
        }
    }

    /// Register with the management plane. Returns the assigned node ID.
    pub async fn register(&self) -> SyncResult<String> {
        let mut identity = self.identity.lock().await;
        if identity.state == RegistrationState::Registered {
            return Err(SyncError::State(format!(
                "node is already registered as {}",
                identity.node_id
            )));
        }

        let registration = self.client.register().await?;

        *identity = NodeIdentity {
            node_id: registration.node_id.clone(),
            session_nonce: registration.nonce,
            state: RegistrationState::Registered,
        };
        self.status.store(Arc::new(RegistrationStatus {
            state: RegistrationState::Registered,
            node_id: Some(registration.node_id.clone()),
        }));
        metrics::record_registered(true);
        tracing::info!(node_id = %registration.node_id, "Node registered with management plane");

        Ok(registration.node_id)
    }

    /// Deregister from the management plane.
    ///
    /// The identity is only cleared once the server confirms.
    pub async fn deregister(&self) -> SyncResult<()> {
        let mut identity = self.identity.lock().await;
        if identity.state != RegistrationState::Registered {
            return Err(SyncError::State("node is not registered".into()));
        }

        self.client
            .deregister(&identity.node_id, &identity.session_nonce)
            .await?;

        tracing::info!(node_id = %identity.node_id, "Node deregistered from management plane");
        *identity = NodeIdentity::unregistered();
        self.status.store(Arc::new(RegistrationStatus::unregistered()));
        metrics::record_registered(false);

        Ok(())
    }

    /// Last published registration status. Never waits on a transition.
    pub fn status(&self) -> Arc<RegistrationStatus> {
        self.status.load_full()
    }

    pub fn state(&self) -> RegistrationState {
        self.status.load().state
    }

    /// The current node ID, if registered.
    pub fn node_id(&self) -> Option<String> {
        self.status.load().node_id.clone()
    }

    pub fn client(&self) -> &ManagementClient {
        &self.client
    }
}
