//! Booking acceptance
//!
//! Turns "driver X wants booking Y" into at most one confirmed booking and
//! exactly one fee debit, under any number of concurrent attempts.

pub mod coordinator;
pub mod error;
pub mod fee;

#[cfg(test)]
mod integration_tests;

pub use coordinator::AcceptanceCoordinator;
pub use error::AcceptError;
pub use fee::FeeSchedule;
