//! Response envelope and error mapping
//!
//! Every response is `{ "success": bool, ..data fields.., "error"?: {code, message} }`.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use utoipa::ToSchema;

use crate::acceptance::AcceptError;
use crate::admin::AdminError;
use crate::auth::AuthError;
use crate::booking::BookingError;
use crate::driver::DriverError;
use crate::store::StoreError;
use crate::wallet::WalletError;

const INTERNAL_MESSAGE: &str = "Something went wrong on our side, please try again";

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Conflict")]
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Error half of the envelope with its HTTP status
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut message = message.into();
        if status.is_server_error() {
            tracing::error!(code, detail = %message, "Request failed");
            message = INTERNAL_MESSAGE.to_string();
        }
        Self {
            status,
            code,
            message,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "InvalidRequest", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(401, "Unauthorized", "Please log in again")
    }

    pub fn forbidden() -> Self {
        Self::new(403, "Forbidden", "Not allowed for this account")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::failure(self.code, self.message))).into_response()
    }
}

impl From<AcceptError> for ApiError {
    fn from(e: AcceptError) -> Self {
        let mut api = Self::new(e.http_status(), e.code(), e.to_string());
        api.message = e.user_message();
        api
    }
}

macro_rules! impl_from_module_error {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for ApiError {
                fn from(e: $err) -> Self {
                    Self::new(e.http_status(), e.code(), e.to_string())
                }
            }
        )*
    };
}

impl_from_module_error!(
    AdminError,
    AuthError,
    BookingError,
    DriverError,
    StoreError,
    WalletError,
);

/// `Json` extractor whose rejection uses the envelope
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct BalanceData {
        balance: i64,
    }

    #[test]
    fn test_success_flattens_data() {
        let body = serde_json::to_value(ApiResponse::success(BalanceData { balance: 75_000 }))
            .unwrap();
        assert_eq!(body, json!({"success": true, "balance": 75_000}));
    }

    #[test]
    fn test_failure_carries_code() {
        let body = serde_json::to_value(ApiResponse::failure("Conflict", "taken")).unwrap();
        assert_eq!(
            body,
            json!({"success": false, "error": {"code": "Conflict", "message": "taken"}})
        );
    }

    #[test]
    fn test_accept_errors_map_to_taxonomy() {
        let e = ApiError::from(AcceptError::InsufficientFunds {
            required: 140_000,
            available: 10_000,
        });
        assert_eq!(e.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(e.code, "InsufficientFunds");

        assert_eq!(ApiError::from(AcceptError::Conflict).status, StatusCode::CONFLICT);
        assert_eq!(ApiError::from(AcceptError::NotFound).code, "NotFound");
        assert_eq!(ApiError::from(AcceptError::Unauthorized).status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_details_hidden() {
        let e = ApiError::from(AcceptError::Internal("pool timed out at 10.0.0.5".into()));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.code, "Internal");
        assert!(!e.message.contains("10.0.0.5"));

        let e = ApiError::from(StoreError::Database("syntax error near".into()));
        assert!(!e.message.contains("syntax"));
    }
}
