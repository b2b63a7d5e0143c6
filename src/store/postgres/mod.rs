//! PostgreSQL store
//!
//! Runtime-checked queries with `$n` binds. Every status change is an atomic
//! compare-and-swap and every balance change is a guarded single UPDATE.

pub mod schema;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::{AtomicAccept, AtomicAcceptOutcome, Store, StoreError, WELCOME_BONUS_DESCRIPTION};
use crate::booking::{
    Booking, BookingFilter, BookingPatch, BookingStatus, BookingTransition, Direction,
    DriverAssignment, NewBooking, ServiceType,
};
use crate::core_types::{Amount, BookingId, DriverId};
use crate::driver::{Driver, DriverPatch, DriverStatus, NewDriver, Region};
use crate::wallet::{NewWalletTransaction, TxType, WalletSnapshot, WalletTransaction, WalletWrite};

const DRIVER_COLUMNS: &str = "id, phone, password_hash, full_name, car_model, plate_number, \
     wallet_balance, status, current_location, created_at, updated_at, deleted_at";

const BOOKING_COLUMNS: &str = "id, reference, passenger_name, passenger_phone, pickup_address, \
     dropoff_address, direction, service_type, seat_count, estimated_price, notes, status, \
     driver_id, created_at, updated_at, confirmed_at, completed_at, cancelled_at, deleted_at";

const TX_COLUMNS: &str = "id, driver_id, amount, tx_type, description, booking_id, created_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_ledger_row(
        tx: &mut Transaction<'_, Postgres>,
        row: &NewWalletTransaction,
    ) -> Result<WalletTransaction, StoreError> {
        let sql = format!(
            "INSERT INTO wallet_transactions_tb (driver_id, amount, tx_type, description, booking_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING {}",
            TX_COLUMNS
        );
        let inserted = sqlx::query(&sql)
            .bind(row.driver_id)
            .bind(row.amount)
            .bind(row.tx_type.id())
            .bind(&row.description)
            .bind(row.booking_id)
            .fetch_one(&mut **tx)
            .await?;
        tx_from_row(&inserted)
    }

    async fn live_balance(
        tx: &mut Transaction<'_, Postgres>,
        driver_id: DriverId,
    ) -> Result<Option<Amount>, StoreError> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT wallet_balance FROM drivers_tb WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(driver_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(balance)
    }
}

fn corrupt(column: &str, value: i16) -> StoreError {
    StoreError::Corrupt(format!("unknown {} id {}", column, value))
}

fn driver_from_row(row: &PgRow) -> Result<Driver, StoreError> {
    let status: i16 = row.try_get("status")?;
    let location: i16 = row.try_get("current_location")?;
    Ok(Driver {
        id: row.try_get("id")?,
        phone: row.try_get("phone")?,
        password_hash: row.try_get("password_hash")?,
        full_name: row.try_get("full_name")?,
        car_model: row.try_get("car_model")?,
        plate_number: row.try_get("plate_number")?,
        wallet_balance: row.try_get("wallet_balance")?,
        status: DriverStatus::from_id(status).ok_or_else(|| corrupt("status", status))?,
        current_location: Region::from_id(location)
            .ok_or_else(|| corrupt("current_location", location))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn booking_from_row(row: &PgRow) -> Result<Booking, StoreError> {
    let status: i16 = row.try_get("status")?;
    let direction: i16 = row.try_get("direction")?;
    let service_type: i16 = row.try_get("service_type")?;
    Ok(Booking {
        id: row.try_get("id")?,
        reference: row.try_get("reference")?,
        passenger_name: row.try_get("passenger_name")?,
        passenger_phone: row.try_get("passenger_phone")?,
        pickup_address: row.try_get("pickup_address")?,
        dropoff_address: row.try_get("dropoff_address")?,
        direction: Direction::from_id(direction).ok_or_else(|| corrupt("direction", direction))?,
        service_type: ServiceType::from_id(service_type)
            .ok_or_else(|| corrupt("service_type", service_type))?,
        seat_count: row.try_get("seat_count")?,
        estimated_price: row.try_get("estimated_price")?,
        notes: row.try_get("notes")?,
        status: BookingStatus::from_id(status).ok_or_else(|| corrupt("status", status))?,
        driver_id: row.try_get("driver_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        confirmed_at: row.try_get("confirmed_at")?,
        completed_at: row.try_get("completed_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn tx_from_row(row: &PgRow) -> Result<WalletTransaction, StoreError> {
    let tx_type: i16 = row.try_get("tx_type")?;
    Ok(WalletTransaction {
        id: row.try_get("id")?,
        driver_id: row.try_get("driver_id")?,
        amount: row.try_get("amount")?,
        tx_type: TxType::from_id(tx_type).ok_or_else(|| corrupt("tx_type", tx_type))?,
        description: row.try_get("description")?,
        booking_id: row.try_get("booking_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        let sql = format!(
            "SELECT {} FROM drivers_tb WHERE id = $1 AND deleted_at IS NULL",
            DRIVER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(driver_from_row).transpose()
    }

    async fn find_driver_by_phone(&self, phone: &str) -> Result<Option<Driver>, StoreError> {
        let sql = format!(
            "SELECT {} FROM drivers_tb WHERE phone = $1 AND deleted_at IS NULL",
            DRIVER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(driver_from_row).transpose()
    }

    async fn insert_driver(&self, new: &NewDriver) -> Result<Driver, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO drivers_tb \
                 (phone, full_name, car_model, plate_number, wallet_balance, status, current_location, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) \
             RETURNING {}",
            DRIVER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&new.phone)
            .bind(&new.full_name)
            .bind(&new.car_model)
            .bind(&new.plate_number)
            .bind(new.welcome_bonus)
            .bind(new.status.id())
            .bind(new.current_location.id())
            .fetch_one(&mut *tx)
            .await?;
        let driver = driver_from_row(&row)?;

        if new.welcome_bonus > 0 {
            Self::insert_ledger_row(
                &mut tx,
                &NewWalletTransaction {
                    driver_id: driver.id,
                    amount: new.welcome_bonus,
                    tx_type: TxType::Bonus,
                    description: WELCOME_BONUS_DESCRIPTION.to_string(),
                    booking_id: None,
                },
            )
            .await?;
        }

        tx.commit().await?;
        Ok(driver)
    }

    async fn update_driver(
        &self,
        id: DriverId,
        patch: &DriverPatch,
    ) -> Result<Option<Driver>, StoreError> {
        let sql = format!(
            "UPDATE drivers_tb SET \
                 full_name = COALESCE($2, full_name), \
                 car_model = COALESCE($3, car_model), \
                 plate_number = COALESCE($4, plate_number), \
                 status = COALESCE($5, status), \
                 current_location = COALESCE($6, current_location), \
                 password_hash = COALESCE($7, password_hash), \
                 deleted_at = COALESCE($8, deleted_at), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {}",
            DRIVER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&patch.full_name)
            .bind(&patch.car_model)
            .bind(&patch.plate_number)
            .bind(patch.status.map(|s| s.id()))
            .bind(patch.current_location.map(|r| r.id()))
            .bind(&patch.password_hash)
            .bind(patch.deleted_at)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(driver_from_row).transpose()
    }

    async fn list_drivers(&self, status: Option<DriverStatus>) -> Result<Vec<Driver>, StoreError> {
        let sql = format!(
            "SELECT {} FROM drivers_tb \
             WHERE deleted_at IS NULL AND ($1::SMALLINT IS NULL OR status = $1) \
             ORDER BY id DESC",
            DRIVER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(status.map(|s| s.id()))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(driver_from_row).collect()
    }

    async fn apply_wallet_delta(
        &self,
        row: &NewWalletTransaction,
    ) -> Result<WalletWrite, StoreError> {
        let mut tx = self.pool.begin().await?;

        let new_balance = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE drivers_tb
            SET wallet_balance = wallet_balance + $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND wallet_balance + $2 >= 0
            RETURNING wallet_balance
            "#,
        )
        .bind(row.driver_id)
        .bind(row.amount)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(new_balance) = new_balance else {
            let balance = Self::live_balance(&mut tx, row.driver_id).await?;
            tx.rollback().await?;
            return Ok(match balance {
                Some(balance) => WalletWrite::Insufficient { balance },
                None => WalletWrite::DriverMissing,
            });
        };

        let ledger_row = Self::insert_ledger_row(&mut tx, row).await?;
        tx.commit().await?;

        Ok(WalletWrite::Applied {
            new_balance,
            tx: ledger_row,
        })
    }

    async fn list_wallet_transactions(
        &self,
        driver_id: DriverId,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>, StoreError> {
        let sql = format!(
            "SELECT {} FROM wallet_transactions_tb WHERE driver_id = $1 ORDER BY id DESC LIMIT $2",
            TX_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(driver_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(tx_from_row).collect()
    }

    async fn booking_transactions(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<WalletTransaction>, StoreError> {
        let sql = format!(
            "SELECT {} FROM wallet_transactions_tb WHERE booking_id = $1 ORDER BY id ASC",
            TX_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(tx_from_row).collect()
    }

    async fn ledger_sum(&self, driver_id: DriverId) -> Result<Amount, StoreError> {
        let sum = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM wallet_transactions_tb WHERE driver_id = $1",
        )
        .bind(driver_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn wallet_snapshots(&self) -> Result<Vec<WalletSnapshot>, StoreError> {
        // one statement, one MVCC snapshot
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.wallet_balance, COALESCE(SUM(t.amount), 0)::BIGINT AS ledger_sum
            FROM drivers_tb d
            LEFT JOIN wallet_transactions_tb t ON t.driver_id = d.id
            WHERE d.deleted_at IS NULL
            GROUP BY d.id, d.wallet_balance
            ORDER BY d.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let mut snapshots = Vec::with_capacity(rows.len());
        for row in &rows {
            snapshots.push(WalletSnapshot {
                driver_id: row.try_get("id")?,
                balance: row.try_get("wallet_balance")?,
                ledger_sum: row.try_get("ledger_sum")?,
            });
        }
        Ok(snapshots)
    }

    async fn insert_booking(&self, new: &NewBooking) -> Result<Booking, StoreError> {
        let sql = format!(
            "INSERT INTO bookings_tb \
                 (reference, passenger_name, passenger_phone, pickup_address, dropoff_address, \
                  direction, service_type, seat_count, estimated_price, notes, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW()) \
             RETURNING {}",
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&new.reference)
            .bind(&new.passenger_name)
            .bind(&new.passenger_phone)
            .bind(&new.pickup_address)
            .bind(&new.dropoff_address)
            .bind(new.direction.id())
            .bind(new.service_type.id())
            .bind(new.seat_count)
            .bind(new.estimated_price)
            .bind(&new.notes)
            .bind(BookingStatus::Pending.id())
            .fetch_one(&self.pool)
            .await?;
        booking_from_row(&row)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let sql = format!(
            "SELECT {} FROM bookings_tb WHERE id = $1 AND deleted_at IS NULL",
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn get_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let sql = format!(
            "SELECT {} FROM bookings_tb WHERE reference = $1 AND deleted_at IS NULL",
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        // LIMIT NULL is LIMIT ALL
        let sql = format!(
            "SELECT {} FROM bookings_tb \
             WHERE deleted_at IS NULL \
               AND ($1::SMALLINT IS NULL OR status = $1) \
               AND ($2::SMALLINT IS NULL OR direction = $2) \
               AND ($3::BIGINT IS NULL OR driver_id = $3) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $4",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.status.map(|s| s.id()))
            .bind(filter.direction.map(|d| d.id()))
            .bind(filter.driver_id)
            .bind(filter.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn transition_booking_if(
        &self,
        t: &BookingTransition,
    ) -> Result<Option<Booking>, StoreError> {
        let assign = match t.driver {
            DriverAssignment::Keep => None,
            DriverAssignment::Assign(id) => Some(id),
        };
        let stamp_confirmed = t.from == BookingStatus::Pending && t.to == BookingStatus::Confirmed;
        let stamp_completed = t.to == BookingStatus::Completed;
        let stamp_cancelled = t.to == BookingStatus::Cancelled;

        let sql = format!(
            "UPDATE bookings_tb SET \
                 status = $3, \
                 driver_id = COALESCE($4, driver_id), \
                 confirmed_at = CASE WHEN $5 THEN NOW() ELSE confirmed_at END, \
                 completed_at = CASE WHEN $6 THEN NOW() ELSE completed_at END, \
                 cancelled_at = CASE WHEN $7 THEN NOW() ELSE cancelled_at END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status = $2 AND deleted_at IS NULL \
             RETURNING {}",
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(t.booking_id)
            .bind(t.from.id())
            .bind(t.to.id())
            .bind(assign)
            .bind(stamp_confirmed)
            .bind(stamp_completed)
            .bind(stamp_cancelled)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn update_booking(
        &self,
        id: BookingId,
        patch: &BookingPatch,
    ) -> Result<Option<Booking>, StoreError> {
        let sql = format!(
            "UPDATE bookings_tb SET \
                 passenger_name = COALESCE($2, passenger_name), \
                 passenger_phone = COALESCE($3, passenger_phone), \
                 pickup_address = COALESCE($4, pickup_address), \
                 dropoff_address = COALESCE($5, dropoff_address), \
                 estimated_price = COALESCE($6, estimated_price), \
                 notes = COALESCE($7, notes), \
                 deleted_at = COALESCE($8, deleted_at), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {}",
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&patch.passenger_name)
            .bind(&patch.passenger_phone)
            .bind(&patch.pickup_address)
            .bind(&patch.dropoff_address)
            .bind(patch.estimated_price)
            .bind(&patch.notes)
            .bind(patch.deleted_at)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn accept_atomically(
        &self,
        request: &AtomicAccept,
    ) -> Result<AtomicAcceptOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent accepts of the same booking
        let status = sqlx::query_scalar::<_, i16>(
            "SELECT status FROM bookings_tb WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(request.booking_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(status) = status else {
            tx.rollback().await?;
            return Ok(AtomicAcceptOutcome::BookingGone);
        };
        let status = BookingStatus::from_id(status).ok_or_else(|| corrupt("status", status))?;
        if status != BookingStatus::Pending {
            tx.rollback().await?;
            return Ok(AtomicAcceptOutcome::AlreadyTaken { status });
        }

        let new_balance = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE drivers_tb
            SET wallet_balance = wallet_balance - $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND wallet_balance >= $2
            RETURNING wallet_balance
            "#,
        )
        .bind(request.driver_id)
        .bind(request.fee)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(new_balance) = new_balance else {
            let balance = Self::live_balance(&mut tx, request.driver_id).await?;
            tx.rollback().await?;
            return Ok(match balance {
                Some(balance) => AtomicAcceptOutcome::InsufficientFunds { balance },
                None => AtomicAcceptOutcome::DriverGone,
            });
        };

        Self::insert_ledger_row(
            &mut tx,
            &NewWalletTransaction {
                driver_id: request.driver_id,
                amount: -request.fee,
                tx_type: TxType::BookingFee,
                description: request.description.clone(),
                booking_id: Some(request.booking_id),
            },
        )
        .await?;

        let sql = format!(
            "UPDATE bookings_tb SET status = $3, driver_id = $4, confirmed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {}",
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(request.booking_id)
            .bind(BookingStatus::Pending.id())
            .bind(BookingStatus::Confirmed.id())
            .bind(request.driver_id)
            .fetch_one(&mut *tx)
            .await?;
        let booking = booking_from_row(&row)?;

        tx.commit().await?;

        Ok(AtomicAcceptOutcome::Accepted {
            booking,
            new_balance,
        })
    }
}
