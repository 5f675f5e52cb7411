use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::admin::AdminState;

/// Require `Authorization: Bearer {api_key}`.
///
/// An empty configured key rejects every request.
pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) if !state.api_key.is_empty() && constant_time_eq(token, &state.api_key) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!("Rejected admin request");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Compare two tokens in time independent of where they differ.
///
/// Both sides are padded to the longer length with different fill bytes, so
/// a prefix of the key never matches.
fn constant_time_eq(presented: &str, expected: &str) -> bool {
    let len = presented.len().max(expected.len());
    let mut a = vec![0u8; len];
    let mut b = vec![0xFFu8; len];
    a[..presented.len()].copy_from_slice(presented.as_bytes());
    b[..expected.len()].copy_from_slice(expected.as_bytes());

    (presented.len().ct_eq(&expected.len()) & a.ct_eq(&b)).into()
}
