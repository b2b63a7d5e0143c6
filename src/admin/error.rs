use thiserror::Error;

use crate::booking::BookingError;
use crate::driver::DriverError;
use crate::store::StoreError;
use crate::wallet::WalletError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdminError {
    #[error("Invalid command: {0}")]
    Invalid(String),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdminError {
    pub fn code(&self) -> &'static str {
        match self {
            AdminError::Invalid(_) => "InvalidRequest",
            AdminError::Driver(e) => e.code(),
            AdminError::Booking(e) => e.code(),
            AdminError::Wallet(e) => e.code(),
            AdminError::Store(e) => e.code(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            AdminError::Invalid(_) => 400,
            AdminError::Driver(e) => e.http_status(),
            AdminError::Booking(e) => e.http_status(),
            AdminError::Wallet(e) => e.http_status(),
            AdminError::Store(e) => e.http_status(),
        }
    }
}

impl From<validator::ValidationErrors> for AdminError {
    fn from(e: validator::ValidationErrors) -> Self {
        AdminError::Invalid(e.to_string())
    }
}
