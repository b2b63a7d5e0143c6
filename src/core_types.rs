//! Core types used throughout the system
//!
//! Fundamental aliases shared by the store, ledger and coordinator.

/// Driver ID - primary key of `drivers`, assigned by the store.
///
/// Never reused; soft-deleted drivers keep their id.
pub type DriverId = i64;

/// Booking ID - primary key of `bookings`.
pub type BookingId = i64;

/// Wallet transaction ID - primary key of `wallet_transactions`.
pub type WalletTxId = i64;

/// Money in the minor currency unit.
///
/// Balances are never negative; ledger amounts are signed
/// (positive = credit, negative = debit).
pub type Amount = i64;
