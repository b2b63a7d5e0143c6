use thiserror::Error;

use super::password::PasswordError;
use crate::driver::DriverError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Invalid or expired code")]
    InvalidCode,

    #[error("Too many wrong codes, request a new one")]
    TooManyAttempts,

    #[error("Please wait {retry_after_secs}s before requesting another code")]
    TooManyRequests { retry_after_secs: u64 },

    #[error("Invalid phone or password")]
    InvalidCredentials,

    #[error("No password set for this account, log in with a code")]
    PasswordNotSet,

    #[error("Please log in again")]
    InvalidToken,

    #[error("Not allowed for this role")]
    Forbidden,

    #[error("Admin login is disabled")]
    AdminDisabled,

    #[error("Code delivery failed: {0}")]
    Delivery(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCode | AuthError::InvalidCredentials | AuthError::InvalidToken => {
                "Unauthorized"
            }
            AuthError::TooManyAttempts | AuthError::TooManyRequests { .. } => "TooManyRequests",
            AuthError::PasswordNotSet => "InvalidRequest",
            AuthError::Forbidden | AuthError::AdminDisabled => "Forbidden",
            AuthError::Delivery(_) | AuthError::Signing(_) | AuthError::Password(_) => "Internal",
            AuthError::Driver(e) => e.code(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::InvalidCode | AuthError::InvalidCredentials | AuthError::InvalidToken => 401,
            AuthError::TooManyAttempts | AuthError::TooManyRequests { .. } => 429,
            AuthError::PasswordNotSet => 400,
            AuthError::Forbidden | AuthError::AdminDisabled => 403,
            AuthError::Delivery(_) | AuthError::Signing(_) | AuthError::Password(_) => 500,
            AuthError::Driver(e) => e.http_status(),
        }
    }
}
