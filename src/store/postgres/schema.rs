//! Table definitions
//!
//! Enum columns are SMALLINT ids (`BookingStatus::id()` and friends).

use sqlx::PgPool;

pub const DRIVER_PHONE_INDEX: &str = "drivers_tb_phone_live_uq";

const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS drivers_tb (
        id               BIGSERIAL PRIMARY KEY,
        phone            VARCHAR(32) NOT NULL,
        password_hash    TEXT,
        full_name        TEXT,
        car_model        TEXT,
        plate_number     TEXT,
        wallet_balance   BIGINT NOT NULL DEFAULT 0 CHECK (wallet_balance >= 0),
        status           SMALLINT NOT NULL DEFAULT 0,
        current_location SMALLINT NOT NULL DEFAULT 1,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        deleted_at       TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS drivers_tb_phone_live_uq
        ON drivers_tb (phone) WHERE deleted_at IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bookings_tb (
        id               BIGSERIAL PRIMARY KEY,
        reference        VARCHAR(26) NOT NULL UNIQUE,
        passenger_name   TEXT NOT NULL,
        passenger_phone  VARCHAR(32) NOT NULL,
        pickup_address   TEXT NOT NULL,
        dropoff_address  TEXT,
        direction        SMALLINT NOT NULL,
        service_type     SMALLINT NOT NULL,
        seat_count       INTEGER NOT NULL DEFAULT 1,
        estimated_price  BIGINT NOT NULL DEFAULT 0,
        notes            TEXT,
        status           SMALLINT NOT NULL DEFAULT 0,
        driver_id        BIGINT REFERENCES drivers_tb (id),
        created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        confirmed_at     TIMESTAMPTZ,
        completed_at     TIMESTAMPTZ,
        cancelled_at     TIMESTAMPTZ,
        deleted_at       TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS bookings_tb_feed_idx
        ON bookings_tb (status, direction, created_at DESC) WHERE deleted_at IS NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS bookings_tb_driver_idx ON bookings_tb (driver_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wallet_transactions_tb (
        id          BIGSERIAL PRIMARY KEY,
        driver_id   BIGINT NOT NULL REFERENCES drivers_tb (id),
        amount      BIGINT NOT NULL,
        tx_type     SMALLINT NOT NULL,
        description TEXT NOT NULL,
        booking_id  BIGINT REFERENCES bookings_tb (id),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS wallet_transactions_tb_driver_idx
        ON wallet_transactions_tb (driver_id, id DESC)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS wallet_transactions_tb_booking_idx
        ON wallet_transactions_tb (booking_id)
    "#,
];

/// Idempotent; safe to run on every start
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for stmt in DDL {
        sqlx::query(stmt).execute(pool).await?;
    }
    tracing::info!(statements = DDL.len(), "PostgreSQL schema ready");
    Ok(())
}
