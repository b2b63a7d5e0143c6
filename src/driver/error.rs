use thiserror::Error;

use super::phone::PhoneError;
use crate::auth::password::PasswordError;
use crate::core_types::DriverId;
use crate::store::StoreError;
use crate::wallet::WalletError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),

    #[error("Driver {0} not found")]
    NotFound(DriverId),

    #[error("A driver with this phone number already exists")]
    AlreadyRegistered,

    #[error("Nothing to update")]
    NoChanges,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DriverError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicatePhone => DriverError::AlreadyRegistered,
            other => DriverError::Store(other),
        }
    }
}

impl DriverError {
    pub fn code(&self) -> &'static str {
        match self {
            DriverError::InvalidPhone(_) | DriverError::NoChanges => "InvalidRequest",
            DriverError::Password(PasswordError::TooShort) => "InvalidRequest",
            DriverError::Password(_) => "Internal",
            DriverError::NotFound(_) => "NotFound",
            DriverError::AlreadyRegistered => "Conflict",
            DriverError::Wallet(e) => e.code(),
            DriverError::Store(e) => e.code(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            DriverError::InvalidPhone(_) | DriverError::NoChanges => 400,
            DriverError::Password(PasswordError::TooShort) => 400,
            DriverError::Password(_) => 500,
            DriverError::NotFound(_) => 404,
            DriverError::AlreadyRegistered => 409,
            DriverError::Wallet(e) => e.http_status(),
            DriverError::Store(e) => e.http_status(),
        }
    }
}
