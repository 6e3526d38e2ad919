use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::routing::RuleSummary;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub ready: bool,
    pub routes: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let ready = state.readiness.is_ready();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if ready { "operational" } else { "starting" },
        ready,
        routes: state.rules.len(),
    })
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RuleSummary>> {
    Json(state.rules.summaries())
}
