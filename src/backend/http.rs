//! JSON-over-HTTP backend client.
//!
//! # Responsibilities
//! - POST the payload to `{scheme}://{address}/{operation}`
//! - Propagate `x-request-id`, a child `traceparent` and the caller identity
//! - Decode the backend's status envelope
//! - Map transport failures (timeout, connect, decode) to [`TransportError`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::backend::{BackendClient, BackendResponse, TransportError};
use crate::config::BackendConfig;
use crate::dispatch::correlation::{Correlation, TRACEPARENT, X_AUTHENTICATED_IDENTITY, X_REQUEST_ID};

/// Backend client over HTTP/1.1 with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    client: reqwest::Client,
    scheme: String,
}

impl HttpBackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("dispatch-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            scheme: config.scheme.clone(),
        })
    }

    fn url(&self, address: &str, operation: &str) -> Result<Url, TransportError> {
        let mut url = Url::parse(&format!("{}://{}/", self.scheme, address))
            .map_err(|e| TransportError::Request(format!("invalid backend address '{}': {}", address, e)))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::Request(format!("invalid backend address '{}'", address)))?
            .pop_if_empty()
            .push(operation);
        Ok(url)
    }
}

fn from_reqwest(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_decode() || error.is_body() {
        TransportError::Malformed(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn invoke(
        &self,
        operation: &str,
        address: &str,
        payload: &Value,
        correlation: &Correlation,
    ) -> Result<BackendResponse, TransportError> {
        let url = self.url(address, operation)?;

        let mut request = self
            .client
            .post(url)
            .header(X_REQUEST_ID, &correlation.request_id)
            .header(TRACEPARENT, correlation.trace_context.to_header());
        if let Some(identity) = &correlation.identity {
            request = request.header(X_AUTHENTICATED_IDENTITY, identity);
        }

        let response = request
            .json(payload)
            .send()
            .await
            .map_err(from_reqwest)?;

        let http_status = response.status();
        let bytes = response.bytes().await.map_err(from_reqwest)?;

        match serde_json::from_slice::<BackendResponse>(&bytes) {
            Ok(declared) => Ok(declared),
            Err(_) if matches!(http_status, StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT) => {
                Err(TransportError::Timeout(format!("backend answered {}", http_status)))
            }
            Err(e) => Err(TransportError::Malformed(format!(
                "undecodable reply with status {}: {}",
                http_status, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpBackendClient {
        HttpBackendClient::new(&BackendConfig {
            scheme: "http".into(),
            connect_timeout_ms: 200,
            request_timeout_ms: 500,
        })
        .unwrap()
    }

    #[test]
    fn test_url_building() {
        let url = client().url("10.0.0.1:9000", "CreateSchedule").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.1:9000/CreateSchedule");

        let url = client().url("backend.local:80", "a/b").unwrap();
        assert_eq!(url.as_str(), "http://backend.local/a%2Fb");
    }

    #[test]
    fn test_bad_address() {
        let err = client().url("not a host:xx", "op").unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let err = client()
            .invoke("op", "127.0.0.1:1", &serde_json::json!({}), &Correlation::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_) | TransportError::Request(_)), "{:?}", err);
    }
}
