use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub registered: bool,
    pub node_id: Option<String>,
    pub generation: u64,
    pub entries: usize,
    pub reload_executions: u64,
    pub reload_pending: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfigListing {
    pub generation: u64,
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReloadAccepted {
    pub sequence: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let generation = state.coalescer.store().snapshot();
    let registration = state.registrar.status();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        registered: registration.is_registered(),
        node_id: registration.node_id.clone(),
        generation: generation.number(),
        entries: generation.len(),
        reload_executions: state.coalescer.executions(),
        reload_pending: state.coalescer.is_pending(),
    })
}

pub async fn get_configs(State(state): State<AdminState>) -> Json<ConfigListing> {
    let generation = state.coalescer.store().snapshot();
    Json(ConfigListing {
        generation: generation.number(),
        ids: generation.ids(),
    })
}

pub async fn post_reload(State(state): State<AdminState>) -> (StatusCode, Json<ReloadAccepted>) {
    let ticket = state.coalescer.trigger();
    tracing::info!(sequence = ticket.sequence(), "Reload requested through admin API");
    (
        StatusCode::ACCEPTED,
        Json(ReloadAccepted {
            sequence: ticket.sequence(),
        }),
    )
}
