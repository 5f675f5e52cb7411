//! Outbound response rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::dispatch::GatewayResponse;

impl GatewayResponse {
    /// Envelope for requests rejected before dispatch.
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            code: 0,
            message: message.into(),
            uuid: None,
            body: None,
        }
    }
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_carried_to_http() {
        let response = GatewayResponse::rejected(StatusCode::BAD_REQUEST, "bad body").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
