//! Persistent store
//!
//! Sole source of truth for drivers, bookings and the wallet ledger. Callers
//! receive an `Arc<dyn Store>`; no module reaches a global client.
//!
//! Every mutating primitive is a single guarded write: the caller learns
//! through the return value whether the guard held, never by re-reading.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::booking::{
    Booking, BookingFilter, BookingPatch, BookingStatus, BookingTransition, NewBooking,
};
use crate::core_types::{Amount, BookingId, DriverId};
use crate::driver::{Driver, DriverPatch, DriverStatus, NewDriver};
use crate::wallet::{NewWalletTransaction, WalletSnapshot, WalletTransaction, WalletWrite};

pub use error::StoreError;
pub use memory::{FaultPlan, MemoryStore};
pub use postgres::PgStore;

/// Description of the welcome credit recorded at driver creation
pub const WELCOME_BONUS_DESCRIPTION: &str = "welcome bonus";

/// Single-transaction acceptance request
#[derive(Debug, Clone)]
pub struct AtomicAccept {
    pub booking_id: BookingId,
    pub driver_id: DriverId,
    pub fee: Amount,
    pub description: String,
}

/// Outcome of [`Store::accept_atomically`]; only `Accepted` wrote anything
#[derive(Debug, Clone)]
pub enum AtomicAcceptOutcome {
    Accepted { booking: Booking, new_balance: Amount },
    AlreadyTaken { status: BookingStatus },
    BookingGone,
    InsufficientFunds { balance: Amount },
    DriverGone,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    // ---- drivers (soft-deleted rows are invisible) ----

    async fn get_driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError>;

    async fn find_driver_by_phone(&self, phone: &str) -> Result<Option<Driver>, StoreError>;

    /// `DuplicatePhone` if a live driver already has this phone
    async fn insert_driver(&self, new: &NewDriver) -> Result<Driver, StoreError>;

    /// Balance is not patchable; it moves only through `apply_wallet_delta`
    async fn update_driver(
        &self,
        id: DriverId,
        patch: &DriverPatch,
    ) -> Result<Option<Driver>, StoreError>;

    async fn list_drivers(&self, status: Option<DriverStatus>) -> Result<Vec<Driver>, StoreError>;

    // ---- wallet ----

    /// Change the balance by `tx.amount` only if the result stays >= 0, and
    /// append the ledger row in the same write
    async fn apply_wallet_delta(
        &self,
        tx: &NewWalletTransaction,
    ) -> Result<WalletWrite, StoreError>;

    /// Newest first
    async fn list_wallet_transactions(
        &self,
        driver_id: DriverId,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>, StoreError>;

    /// Ledger rows referencing `booking_id`, oldest first
    async fn booking_transactions(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<WalletTransaction>, StoreError>;

    async fn ledger_sum(&self, driver_id: DriverId) -> Result<Amount, StoreError>;

    /// Balance and ledger sum of every live driver from one consistent read,
    /// ordered by driver id
    async fn wallet_snapshots(&self) -> Result<Vec<WalletSnapshot>, StoreError>;

    // ---- bookings (soft-deleted rows are invisible) ----

    async fn insert_booking(&self, new: &NewBooking) -> Result<Booking, StoreError>;

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    async fn get_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Booking>, StoreError>;

    /// Newest first
    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError>;

    /// Compare-and-swap on status; `None` when the row was not in `from`
    /// (or is gone)
    async fn transition_booking_if(
        &self,
        transition: &BookingTransition,
    ) -> Result<Option<Booking>, StoreError>;

    async fn update_booking(
        &self,
        id: BookingId,
        patch: &BookingPatch,
    ) -> Result<Option<Booking>, StoreError>;

    /// Guarded booking transition, guarded debit and `booking_fee` ledger row
    /// in one ACID unit
    async fn accept_atomically(
        &self,
        request: &AtomicAccept,
    ) -> Result<AtomicAcceptOutcome, StoreError>;
}
