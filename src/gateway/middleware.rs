//! Bearer-token guards for the driver and admin route groups

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::state::AppState;
use super::types::ApiError;
use crate::auth::Claims;
use crate::core_types::DriverId;

/// Driver identity taken from a verified token; trusted as is downstream
#[derive(Debug, Clone, Copy)]
pub struct AuthedDriver(pub DriverId);

fn bearer_claims(state: &AppState, request: &Request<Body>) -> Result<Claims, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(ApiError::unauthorized)?;

    state
        .auth
        .verify_token(token)
        .map_err(|_| ApiError::unauthorized())
}

pub async fn driver_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state, &request)?;
    let driver_id = claims.driver_id().ok_or_else(ApiError::forbidden)?;
    request.extensions_mut().insert(AuthedDriver(driver_id));
    Ok(next.run(request).await)
}

pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state, &request)?;
    if !claims.is_admin() {
        return Err(ApiError::forbidden());
    }
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
