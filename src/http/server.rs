//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the dispatch and liveness handlers
//! - Wire up middleware (request id, tracing, body limit)
//! - Serve on a bound listener until shutdown

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::dispatch::{Dispatcher, GatewayResponse, InboundOperation};
use crate::http::request::correlation_from_headers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP front door of the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ListenerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            router: build_router(config, AppState { dispatcher }),
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &ListenerConfig, state: AppState) -> Router {
    Router::new()
        .route("/v1/{service}/{operation}", post(dispatch_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(config.max_body_size)),
        )
}

async fn healthz() -> &'static str {
    "ok"
}

async fn dispatch_handler(
    State(state): State<AppState>,
    Path((service, operation)): Path<(String, String)>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let correlation = correlation_from_headers(&headers);

    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            tracing::warn!(
                request_id = %correlation.request_id,
                service = %service,
                operation = %operation,
                error = %rejection.body_text(),
                "Rejected request body"
            );
            return GatewayResponse::rejected(rejection.status(), rejection.body_text()).into_response();
        }
    };

    let inbound = InboundOperation {
        service,
        operation,
        payload,
    };

    // Detached from the connection: a client hang-up does not cancel the call.
    let dispatcher = state.dispatcher.clone();
    let task = tokio::spawn(async move { dispatcher.handle(inbound, &correlation).await });

    match task.await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            GatewayResponse::rejected(StatusCode::INTERNAL_SERVER_ERROR, "dispatch task failed").into_response()
        }
    }
}
