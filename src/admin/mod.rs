//! Authenticated admin API: breaker and health-check introspection.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::health::HealthTable;
use crate::resilience::BreakerRegistry;

#[derive(Clone)]
pub struct AdminState {
    pub breakers: Arc<BreakerRegistry>,
    pub health: Option<Arc<HealthTable>>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/breakers", get(get_breakers))
        .route("/checks", get(get_checks))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
