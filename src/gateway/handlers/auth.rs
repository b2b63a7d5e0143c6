//! Login endpoints

use std::sync::Arc;

use axum::extract::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiJson, ApiResult, ok};
use crate::auth::{DriverSession, OtpTicket, Session};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OtpRequest {
    #[schema(example = "+98 912 123 4567")]
    pub phone: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OtpVerifyRequest {
    pub phone: String,
    #[schema(example = "042917")]
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordLoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSessionData {
    pub session: Session,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/otp/request",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Code sent", body = OtpTicket),
        (status = 429, description = "Asked again too soon")
    ),
    tag = "Auth"
)]
pub async fn request_otp(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<OtpRequest>,
) -> ApiResult<OtpTicket> {
    ok(state.auth.request_otp(&req.phone).await?)
}

/// First successful verification creates the driver account
#[utoipa::path(
    post,
    path = "/api/v1/auth/otp/verify",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Logged in", body = DriverSession),
        (status = 401, description = "Wrong or expired code")
    ),
    tag = "Auth"
)]
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<OtpVerifyRequest>,
) -> ApiResult<DriverSession> {
    ok(state.auth.verify_otp(&req.phone, &req.code).await?)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = PasswordLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = DriverSession),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PasswordLoginRequest>,
) -> ApiResult<DriverSession> {
    ok(state.auth.login(&req.phone, &req.password).await?)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AdminSessionData),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Admin login disabled")
    ),
    tag = "Auth"
)]
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AdminLoginRequest>,
) -> ApiResult<AdminSessionData> {
    let session = state.auth.admin_login(&req.username, &req.password)?;
    ok(AdminSessionData { session })
}
