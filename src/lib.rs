//! Intercity carpool marketplace backend
//!
//! Passengers book rides between two cities; drivers see the pending bookings
//! heading away from their city and accept them against a prepaid wallet.
//!
//! # Modules
//!
//! - [`acceptance`] - Race-safe acceptance: fee debit plus booking transition
//! - [`wallet`] - Driver balances and the append-only ledger
//! - [`booking`] - Booking model, lifecycle state machine, submission
//! - [`feed`] - Pending bookings for drivers, phones masked
//! - [`driver`] - Driver accounts and phone normalization
//! - [`auth`] - OTP, password and admin login, JWT sessions
//! - [`admin`] - Closed command sets for the admin console
//! - [`notify`] - Best-effort operator notifications
//! - [`reconcile`] - Balance vs ledger drift detection
//! - [`store`] - Storage trait with in-memory and PostgreSQL backends
//! - [`gateway`] - axum HTTP API

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod db;
pub mod logging;

pub mod store;

pub mod acceptance;
pub mod admin;
pub mod auth;
pub mod booking;
pub mod driver;
pub mod feed;
pub mod notify;
pub mod reconcile;
pub mod wallet;

pub mod gateway;

pub use acceptance::{AcceptError, AcceptanceCoordinator};
pub use config::AppConfig;
pub use core_types::{Amount, BookingId, DriverId, WalletTxId};
pub use store::{MemoryStore, PgStore, Store, StoreError};
