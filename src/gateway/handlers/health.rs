use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResponse, ErrorBody};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    pub version: &'static str,
    pub build: &'static str,
}

/// Liveness plus a store ping
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    if let Err(e) = state.store.ping().await {
        tracing::error!(error = %e, "Health check: store ping failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data: None,
                error: Some(ErrorBody {
                    code: "Unavailable",
                    message: "Service unavailable".to_string(),
                }),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthResponse {
            timestamp_ms: Utc::now().timestamp_millis(),
            version: env!("CARGO_PKG_VERSION"),
            build: env!("GIT_HASH"),
        })),
    )
}
