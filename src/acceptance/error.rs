use thiserror::Error;

use crate::core_types::{Amount, BookingId, DriverId};
use crate::store::StoreError;

/// Acceptance failures
///
/// Business rejections are values; only store faults become `Internal`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcceptError {
    #[error("Please log in again")]
    Unauthorized,

    #[error("Balance too low ({available} < {required}), please top up your wallet")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("Booking not found")]
    NotFound,

    #[error("This ride was already accepted by someone else")]
    Conflict,

    #[error("Fee refund failed: driver {driver_id}, booking {booking_id}, amount {amount}")]
    CompensationFailed {
        driver_id: DriverId,
        booking_id: BookingId,
        amount: Amount,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AcceptError {
    pub fn code(&self) -> &'static str {
        match self {
            AcceptError::Unauthorized => "Unauthorized",
            AcceptError::InsufficientFunds { .. } => "InsufficientFunds",
            AcceptError::NotFound => "NotFound",
            AcceptError::Conflict => "Conflict",
            AcceptError::CompensationFailed { .. } | AcceptError::Internal(_) => "Internal",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            AcceptError::Unauthorized => 401,
            AcceptError::InsufficientFunds { .. } => 422,
            AcceptError::NotFound => 404,
            AcceptError::Conflict => 409,
            AcceptError::CompensationFailed { .. } | AcceptError::Internal(_) => 500,
        }
    }

    /// Text shown to the client; internal details stay in the log
    pub fn user_message(&self) -> String {
        match self {
            AcceptError::CompensationFailed { .. } | AcceptError::Internal(_) => {
                "Something went wrong, please try again later".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for AcceptError {
    fn from(e: StoreError) -> Self {
        AcceptError::Internal(e.to_string())
    }
}
