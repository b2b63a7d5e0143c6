//! In-process store
//!
//! One mutex guards every table, so each trait call is atomic the same way a
//! single guarded SQL statement is. Used by tests and by the `memory` storage
//! backend. [`FaultPlan`] injects races and store failures.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{AtomicAccept, AtomicAcceptOutcome, Store, StoreError, WELCOME_BONUS_DESCRIPTION};
use crate::booking::{
    Booking, BookingFilter, BookingPatch, BookingStatus, BookingTransition, DriverAssignment,
    NewBooking,
};
use crate::core_types::{Amount, BookingId, DriverId, WalletTxId};
use crate::driver::{Driver, DriverPatch, DriverStatus, NewDriver};
use crate::wallet::{NewWalletTransaction, TxType, WalletSnapshot, WalletTransaction, WalletWrite};

/// One-shot and sticky failure switches
#[derive(Debug, Default, Clone)]
pub struct FaultPlan {
    /// Before the next pending -> confirmed write, hand the booking to this
    /// driver so the caller's compare-and-swap loses
    pub steal_next_accept: Option<DriverId>,
    /// Next `transition_booking_if` fails with `Unavailable`
    pub fail_next_transition: bool,
    /// Every positive wallet delta fails with `Unavailable`
    pub fail_credits: bool,
}

#[derive(Default)]
struct Tables {
    drivers: BTreeMap<DriverId, Driver>,
    bookings: BTreeMap<BookingId, Booking>,
    ledger: Vec<WalletTransaction>,
    next_driver_id: DriverId,
    next_booking_id: BookingId,
    next_tx_id: WalletTxId,
    faults: FaultPlan,
}

impl Tables {
    fn live_driver_mut(&mut self, id: DriverId) -> Option<&mut Driver> {
        self.drivers.get_mut(&id).filter(|d| !d.is_deleted())
    }

    fn live_booking_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
        self.bookings.get_mut(&id).filter(|b| !b.is_deleted())
    }

    fn append_ledger(&mut self, tx: &NewWalletTransaction) -> WalletTransaction {
        self.next_tx_id += 1;
        let row = WalletTransaction {
            id: self.next_tx_id,
            driver_id: tx.driver_id,
            amount: tx.amount,
            tx_type: tx.tx_type,
            description: tx.description.clone(),
            booking_id: tx.booking_id,
            created_at: Utc::now(),
        };
        self.ledger.push(row.clone());
        row
    }

    fn apply_delta(&mut self, tx: &NewWalletTransaction) -> WalletWrite {
        let Some(driver) = self.live_driver_mut(tx.driver_id) else {
            return WalletWrite::DriverMissing;
        };
        let balance = driver.wallet_balance;
        let new_balance = match balance.checked_add(tx.amount) {
            Some(v) if v >= 0 => v,
            _ => return WalletWrite::Insufficient { balance },
        };
        driver.wallet_balance = new_balance;
        driver.updated_at = Utc::now();
        let row = self.append_ledger(tx);
        WalletWrite::Applied {
            new_balance,
            tx: row,
        }
    }

    fn steal_if_planned(&mut self, booking_id: BookingId) {
        let Some(rival) = self.faults.steal_next_accept.take() else {
            return;
        };
        if let Some(booking) = self.live_booking_mut(booking_id)
            && booking.status == BookingStatus::Pending
        {
            let now = Utc::now();
            booking.status = BookingStatus::Confirmed;
            booking.driver_id = Some(rival);
            booking.confirmed_at = Some(now);
            booking.updated_at = now;
        }
    }

    fn transition(&mut self, t: &BookingTransition) -> Option<Booking> {
        let booking = self.live_booking_mut(t.booking_id)?;
        if booking.status != t.from {
            return None;
        }
        let now = Utc::now();
        booking.status = t.to;
        if let DriverAssignment::Assign(driver_id) = t.driver {
            booking.driver_id = Some(driver_id);
        }
        match t.to {
            BookingStatus::Confirmed if t.from == BookingStatus::Pending => {
                booking.confirmed_at = Some(now)
            }
            BookingStatus::Completed => booking.completed_at = Some(now),
            BookingStatus::Cancelled => booking.cancelled_at = Some(now),
            _ => {}
        }
        booking.updated_at = now;
        Some(booking.clone())
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Edit the fault plan in place
    pub fn faults(&self, edit: impl FnOnce(&mut FaultPlan)) {
        if let Ok(mut tables) = self.tables.lock() {
            edit(&mut tables.faults);
        }
    }

    /// Overwrite a balance without a ledger row, to simulate drift
    pub fn corrupt_balance(&self, driver_id: DriverId, balance: Amount) {
        if let Ok(mut tables) = self.tables.lock()
            && let Some(driver) = tables.drivers.get_mut(&driver_id)
        {
            driver.wallet_balance = balance;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn get_driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.drivers.get(&id).filter(|d| !d.is_deleted()).cloned())
    }

    async fn find_driver_by_phone(&self, phone: &str) -> Result<Option<Driver>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .drivers
            .values()
            .find(|d| d.phone == phone && !d.is_deleted())
            .cloned())
    }

    async fn insert_driver(&self, new: &NewDriver) -> Result<Driver, StoreError> {
        let mut tables = self.lock()?;
        if tables
            .drivers
            .values()
            .any(|d| d.phone == new.phone && !d.is_deleted())
        {
            return Err(StoreError::DuplicatePhone);
        }

        tables.next_driver_id += 1;
        let id = tables.next_driver_id;
        let now = Utc::now();
        let driver = Driver {
            id,
            phone: new.phone.clone(),
            password_hash: None,
            full_name: new.full_name.clone(),
            car_model: new.car_model.clone(),
            plate_number: new.plate_number.clone(),
            wallet_balance: new.welcome_bonus,
            status: new.status,
            current_location: new.current_location,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.drivers.insert(id, driver.clone());

        if new.welcome_bonus > 0 {
            tables.append_ledger(&NewWalletTransaction {
                driver_id: id,
                amount: new.welcome_bonus,
                tx_type: TxType::Bonus,
                description: WELCOME_BONUS_DESCRIPTION.to_string(),
                booking_id: None,
            });
        }
        Ok(driver)
    }

    async fn update_driver(
        &self,
        id: DriverId,
        patch: &DriverPatch,
    ) -> Result<Option<Driver>, StoreError> {
        let mut tables = self.lock()?;
        let Some(driver) = tables.live_driver_mut(id) else {
            return Ok(None);
        };
        patch.apply_to(driver);
        driver.updated_at = Utc::now();
        Ok(Some(driver.clone()))
    }

    async fn list_drivers(&self, status: Option<DriverStatus>) -> Result<Vec<Driver>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .drivers
            .values()
            .rev()
            .filter(|d| !d.is_deleted() && status.is_none_or(|s| d.status == s))
            .cloned()
            .collect())
    }

    async fn apply_wallet_delta(
        &self,
        tx: &NewWalletTransaction,
    ) -> Result<WalletWrite, StoreError> {
        let mut tables = self.lock()?;
        if tx.amount > 0 && tables.faults.fail_credits {
            return Err(StoreError::Unavailable("injected credit failure".into()));
        }
        Ok(tables.apply_delta(tx))
    }

    async fn list_wallet_transactions(
        &self,
        driver_id: DriverId,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .ledger
            .iter()
            .rev()
            .filter(|tx| tx.driver_id == driver_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn booking_transactions(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<WalletTransaction>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .ledger
            .iter()
            .filter(|tx| tx.booking_id == Some(booking_id))
            .cloned()
            .collect())
    }

    async fn ledger_sum(&self, driver_id: DriverId) -> Result<Amount, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .ledger
            .iter()
            .filter(|tx| tx.driver_id == driver_id)
            .map(|tx| tx.amount)
            .sum())
    }

    async fn wallet_snapshots(&self) -> Result<Vec<WalletSnapshot>, StoreError> {
        let tables = self.lock()?;
        let mut sums: BTreeMap<DriverId, Amount> = BTreeMap::new();
        for tx in &tables.ledger {
            *sums.entry(tx.driver_id).or_default() += tx.amount;
        }
        Ok(tables
            .drivers
            .values()
            .filter(|d| !d.is_deleted())
            .map(|d| WalletSnapshot {
                driver_id: d.id,
                balance: d.wallet_balance,
                ledger_sum: sums.get(&d.id).copied().unwrap_or(0),
            })
            .collect())
    }

    async fn insert_booking(&self, new: &NewBooking) -> Result<Booking, StoreError> {
        let mut tables = self.lock()?;
        tables.next_booking_id += 1;
        let id = tables.next_booking_id;
        let now = Utc::now();
        let booking = Booking {
            id,
            reference: new.reference.clone(),
            passenger_name: new.passenger_name.clone(),
            passenger_phone: new.passenger_phone.clone(),
            pickup_address: new.pickup_address.clone(),
            dropoff_address: new.dropoff_address.clone(),
            direction: new.direction,
            service_type: new.service_type,
            seat_count: new.seat_count,
            estimated_price: new.estimated_price,
            notes: new.notes.clone(),
            status: BookingStatus::Pending,
            driver_id: None,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
            deleted_at: None,
        };
        tables.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.bookings.get(&id).filter(|b| !b.is_deleted()).cloned())
    }

    async fn get_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .bookings
            .values()
            .find(|b| b.reference == reference && !b.is_deleted())
            .cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .bookings
            .values()
            .rev()
            .filter(|b| filter.matches(b))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn transition_booking_if(
        &self,
        transition: &BookingTransition,
    ) -> Result<Option<Booking>, StoreError> {
        let mut tables = self.lock()?;
        if tables.faults.fail_next_transition {
            tables.faults.fail_next_transition = false;
            return Err(StoreError::Unavailable("injected transition failure".into()));
        }
        if transition.from == BookingStatus::Pending && transition.to == BookingStatus::Confirmed
        {
            tables.steal_if_planned(transition.booking_id);
        }
        Ok(tables.transition(transition))
    }

    async fn update_booking(
        &self,
        id: BookingId,
        patch: &BookingPatch,
    ) -> Result<Option<Booking>, StoreError> {
        let mut tables = self.lock()?;
        let Some(booking) = tables.live_booking_mut(id) else {
            return Ok(None);
        };
        patch.apply_to(booking);
        booking.updated_at = Utc::now();
        Ok(Some(booking.clone()))
    }

    async fn accept_atomically(
        &self,
        request: &AtomicAccept,
    ) -> Result<AtomicAcceptOutcome, StoreError> {
        let mut tables = self.lock()?;
        tables.steal_if_planned(request.booking_id);

        let status = match tables.bookings.get(&request.booking_id) {
            Some(b) if !b.is_deleted() => b.status,
            _ => return Ok(AtomicAcceptOutcome::BookingGone),
        };
        if status != BookingStatus::Pending {
            return Ok(AtomicAcceptOutcome::AlreadyTaken { status });
        }

        // nothing is written until both guards have passed
        let balance = match tables.drivers.get(&request.driver_id) {
            Some(d) if !d.is_deleted() => d.wallet_balance,
            _ => return Ok(AtomicAcceptOutcome::DriverGone),
        };
        if balance < request.fee {
            return Ok(AtomicAcceptOutcome::InsufficientFunds { balance });
        }

        let debit = NewWalletTransaction {
            driver_id: request.driver_id,
            amount: -request.fee,
            tx_type: TxType::BookingFee,
            description: request.description.clone(),
            booking_id: Some(request.booking_id),
        };
        let new_balance = match tables.apply_delta(&debit) {
            WalletWrite::Applied { new_balance, .. } => new_balance,
            WalletWrite::Insufficient { balance } => {
                return Ok(AtomicAcceptOutcome::InsufficientFunds { balance });
            }
            WalletWrite::DriverMissing => return Ok(AtomicAcceptOutcome::DriverGone),
        };

        let booking = tables
            .transition(&BookingTransition {
                booking_id: request.booking_id,
                from: BookingStatus::Pending,
                to: BookingStatus::Confirmed,
                driver: DriverAssignment::Assign(request.driver_id),
            })
            .ok_or_else(|| StoreError::Corrupt("booking vanished under lock".into()))?;

        Ok(AtomicAcceptOutcome::Accepted {
            booking,
            new_balance,
        })
    }
}
