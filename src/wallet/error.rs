use thiserror::Error;

use crate::core_types::{Amount, DriverId};
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Driver {0} not found")]
    NotFound(DriverId),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WalletError {
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::InvalidAmount => "InvalidRequest",
            WalletError::NotFound(_) => "NotFound",
            WalletError::InsufficientFunds { .. } => "InsufficientFunds",
            WalletError::Store(e) => e.code(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            WalletError::InvalidAmount => 400,
            WalletError::NotFound(_) => 404,
            WalletError::InsufficientFunds { .. } => 422,
            WalletError::Store(e) => e.http_status(),
        }
    }
}
