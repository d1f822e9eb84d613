//! Admin API.
//!
//! # Data Flow
//! ```text
//! Request → auth.rs (Bearer key) → handlers.rs → registrar / store / coalescer
//! ```

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::management::NodeRegistrar;
use crate::reload::ReloadCoalescer;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub registrar: Arc<NodeRegistrar>,
    pub coalescer: ReloadCoalescer,
    api_key: Arc<str>,
}

impl AdminState {
    pub fn new(registrar: Arc<NodeRegistrar>, coalescer: ReloadCoalescer, api_key: String) -> Self {
        Self {
            registrar,
            coalescer,
            api_key: api_key.into(),
        }
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/configs", get(get_configs))
        .route("/admin/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until shutdown.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(address = %addr, "Admin API listening");
    }
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
