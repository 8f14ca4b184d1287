use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use super::types::ErrorResponse;
use super::AuthTokens;

/// Gates booking and cancellation endpoints. Identity itself stays an opaque
/// user id in the payload; this only checks the bearer token.
pub async fn require_user(
    State(tokens): State<AuthTokens>,
    request: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    check_bearer(&request, &tokens.api_token)?;
    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(tokens): State<AuthTokens>,
    request: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    check_bearer(&request, &tokens.admin_token)?;
    Ok(next.run(request).await)
}

fn check_bearer(request: &Request, token: &str) -> Result<(), ErrorResponse> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(t) if t == token => Ok(()),
        _ => Err(ErrorResponse::new(
            StatusCode::UNAUTHORIZED,
            "missing or invalid bearer token",
        )),
    }
}
