//! Wallet ledger: materialized balance plus an append-only reason-coded log

pub mod error;
pub mod ledger;
pub mod types;

pub use error::WalletError;
pub use ledger::WalletLedger;
pub use types::{NewWalletTransaction, TxType, WalletSnapshot, WalletTransaction, WalletWrite};
