use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::health::table::CheckRecord;
use crate::resilience::BreakerSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct BreakerStatus {
    pub node_id: String,
    #[serde(flatten)]
    pub snapshot: BreakerSnapshot,
}

#[derive(Serialize)]
pub struct CheckStatusEntry {
    pub check_ref: String,
    #[serde(flatten)]
    pub record: CheckRecord,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerStatus>> {
    let breakers = state
        .breakers
        .snapshot()
        .into_iter()
        .map(|(node_id, snapshot)| BreakerStatus { node_id, snapshot })
        .collect();
    Json(breakers)
}

pub async fn get_checks(State(state): State<AdminState>) -> Json<Vec<CheckStatusEntry>> {
    let checks = state
        .health
        .as_ref()
        .map(|table| {
            table
                .entries()
                .into_iter()
                .map(|(check_ref, record)| CheckStatusEntry { check_ref, record })
                .collect()
        })
        .unwrap_or_default();
    Json(checks)
}
