//! Driver directory: accounts, phone handling, onboarding and self-service

pub mod error;
pub mod models;
pub mod phone;
pub mod service;

pub use error::DriverError;
pub use models::{Driver, DriverPatch, DriverStatus, NewDriver, Region};
pub use phone::{PhoneError, PhoneNumber, mask_phone};
pub use service::{DriverProfile, DriverService};
