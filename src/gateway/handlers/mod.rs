pub mod admin;
pub mod auth;
pub mod bookings;
pub mod driver;
pub mod feed;
pub mod health;

pub use health::{HealthResponse, health_check};
