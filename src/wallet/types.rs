//! Ledger row types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::core_types::{Amount, BookingId, DriverId, WalletTxId};

/// Reason code of a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum TxType {
    /// Welcome credit on signup
    Bonus = 1,
    /// Acceptance fee (negative amount)
    BookingFee = 2,
    /// Operator top-up
    Topup = 3,
    /// Compensation, refund or manual correction
    Adjustment = 4,
}

impl TxType {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(TxType::Bonus),
            2 => Some(TxType::BookingFee),
            3 => Some(TxType::Topup),
            4 => Some(TxType::Adjustment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Bonus => "bonus",
            TxType::BookingFee => "booking_fee",
            TxType::Topup => "topup",
            TxType::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only ledger row
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletTransaction {
    pub id: WalletTxId,
    pub driver_id: DriverId,
    /// Signed: credits positive, debits negative
    pub amount: Amount,
    pub tx_type: TxType,
    pub description: String,
    pub booking_id: Option<BookingId>,
    pub created_at: DateTime<Utc>,
}

/// Balance change plus the ledger row recording it
#[derive(Debug, Clone)]
pub struct NewWalletTransaction {
    pub driver_id: DriverId,
    pub amount: Amount,
    pub tx_type: TxType,
    pub description: String,
    pub booking_id: Option<BookingId>,
}

/// Balance and ledger sum of one live driver, read together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub driver_id: DriverId,
    pub balance: Amount,
    pub ledger_sum: Amount,
}

/// Result of a guarded balance write
#[derive(Debug, Clone)]
pub enum WalletWrite {
    Applied {
        new_balance: Amount,
        tx: WalletTransaction,
    },
    /// Balance would go negative; nothing written
    Insufficient { balance: Amount },
    /// Driver missing or soft-deleted
    DriverMissing,
}
