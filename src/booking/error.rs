use thiserror::Error;

use super::state::InvalidTransition;
use crate::driver::PhoneError;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Invalid booking: {0}")]
    Invalid(String),

    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),

    #[error("Booking not found")]
    NotFound,

    #[error("Only the accepting driver may do this")]
    Forbidden,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Booking was modified concurrently, please retry")]
    Conflict,

    #[error("Driver not found")]
    DriverNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Invalid(_) | BookingError::InvalidPhone(_) => "InvalidRequest",
            BookingError::NotFound | BookingError::DriverNotFound => "NotFound",
            BookingError::Forbidden => "Forbidden",
            BookingError::InvalidTransition(_) | BookingError::Conflict => "Conflict",
            BookingError::Store(e) => e.code(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            BookingError::Invalid(_) | BookingError::InvalidPhone(_) => 400,
            BookingError::NotFound | BookingError::DriverNotFound => 404,
            BookingError::Forbidden => 403,
            BookingError::InvalidTransition(_) | BookingError::Conflict => 409,
            BookingError::Store(e) => e.http_status(),
        }
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(e: validator::ValidationErrors) -> Self {
        BookingError::Invalid(e.to_string())
    }
}
