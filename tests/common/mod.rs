//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;

use dispatch_gateway::backend::{BackendClient, BackendResponse, TransportError};
use dispatch_gateway::config::{BreakerConfig, GatewayConfig, NodeConfig, ServiceConfig};
use dispatch_gateway::discovery::{NodeResolver, ResolveError, ServiceNode};
use dispatch_gateway::dispatch::{Correlation, Dispatcher, ResponseClassifier};
use dispatch_gateway::health::{HealthError, HealthReconciler, HealthReporter};
use dispatch_gateway::http::HttpServer;
use dispatch_gateway::lifecycle::{Components, Shutdown};
use dispatch_gateway::resilience::BreakerRegistry;

/// Resolver over a fixed service → node map.
pub struct FixedResolver {
    nodes: HashMap<String, ServiceNode>,
}

impl FixedResolver {
    pub fn new(entries: &[(&str, ServiceNode)]) -> Self {
        Self {
            nodes: entries
                .iter()
                .map(|(service, node)| (service.to_string(), node.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl NodeResolver for FixedResolver {
    async fn resolve(&self, service: &str) -> Result<ServiceNode, ResolveError> {
        self.nodes
            .get(service)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(service.to_string()))
    }
}

/// Backend that replays queued replies, then answers with a declared 201.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<BackendResponse, TransportError>>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl ScriptedBackend {
    /// Every call takes `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn push(&self, reply: Result<BackendResponse, TransportError>) {
        self.replies.lock().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendClient for ScriptedBackend {
    async fn invoke(
        &self,
        _operation: &str,
        _address: &str,
        _payload: &Value,
        _correlation: &Correlation,
    ) -> Result<BackendResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().pop_front();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        reply.unwrap_or_else(|| Ok(BackendResponse::new(201, 0, "created")))
    }
}

/// Reporter that records every signal as `(signal, check_ref)`.
#[derive(Default)]
pub struct RecordingReporter {
    signals: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingReporter {
    pub fn signals(&self) -> Vec<(&'static str, String)> {
        self.signals.lock().clone()
    }

    pub fn count(&self, signal: &str) -> usize {
        self.signals.lock().iter().filter(|(s, _)| *s == signal).count()
    }
}

#[async_trait]
impl HealthReporter for RecordingReporter {
    async fn mark_failing(&self, check_ref: &str, _reason: &str) -> Result<(), HealthError> {
        self.signals.lock().push(("failing", check_ref.to_string()));
        Ok(())
    }

    async fn mark_passing(&self, check_ref: &str, _reason: &str) -> Result<(), HealthError> {
        self.signals.lock().push(("passing", check_ref.to_string()));
        Ok(())
    }
}

pub fn schedule_node() -> ServiceNode {
    ServiceNode::new("schedule-1", "10.0.0.1:9000", "service:schedule-1")
}

/// Dispatcher over fakes, with the `schedule` service on [`schedule_node`].
pub fn fake_dispatcher(
    backend: Arc<ScriptedBackend>,
    reporter: Arc<RecordingReporter>,
    breaker: BreakerConfig,
) -> Dispatcher {
    Dispatcher::new(
        Arc::new(FixedResolver::new(&[("schedule", schedule_node())])),
        Arc::new(BreakerRegistry::new(breaker)),
        HealthReconciler::new(reporter, Duration::from_millis(500)),
        backend,
        ResponseClassifier::default(),
    )
}

/// Mock backend node on an ephemeral port.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
}

impl MockBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_headers(&self) -> Option<HeaderMap> {
        self.headers.lock().last().cloned()
    }
}

/// Start a programmable mock backend. `reply` gets the zero-based call index
/// and returns the HTTP status and body.
pub async fn start_programmable_backend<F, Fut>(reply: F) -> MockBackend
where
    F: Fn(usize) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let calls = Arc::new(AtomicUsize::new(0));
    let headers = Arc::new(Mutex::new(Vec::new()));

    let handler = {
        let calls = calls.clone();
        let headers = headers.clone();
        move |request_headers: HeaderMap, _body: String| {
            let calls = calls.clone();
            let headers = headers.clone();
            let reply = reply.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                headers.lock().push(request_headers);
                let (status, body) = reply(n).await;
                (
                    StatusCode::from_u16(status).unwrap(),
                    [("content-type", "application/json")],
                    body,
                )
            }
        }
    };

    let app = Router::new().route("/{operation}", post(handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, calls, headers }
}

/// Start a mock backend that always returns the same declared envelope.
pub async fn start_mock_backend(envelope: Value) -> MockBackend {
    let body = envelope.to_string();
    start_programmable_backend(move |_| {
        let body = body.clone();
        async move { (200, body) }
    })
    .await
}

/// An address with nothing listening on it.
pub async fn unused_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Gateway config with one static service and one node.
pub fn gateway_config(service: &str, node_id: &str, address: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.observability.metrics_enabled = false;
    config.services.push(ServiceConfig {
        name: service.into(),
        nodes: vec![NodeConfig {
            id: node_id.into(),
            address: address.to_string(),
            health_check_ref: None,
        }],
    });
    config
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub components: Components,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Wire and serve a gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let components = Components::from_config(&config).unwrap();
    let shutdown = Shutdown::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config.listener, components.dispatcher.clone());
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });

    TestGateway {
        addr,
        shutdown,
        components,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
