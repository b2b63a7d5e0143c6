//! Admin console
//!
//! Driver and booking updates arrive as closed command enums, never as
//! free-form partial objects.

pub mod commands;
pub mod error;
pub mod service;

pub use commands::{BookingCommand, DriverCommand};
pub use error::AdminError;
pub use service::AdminService;
