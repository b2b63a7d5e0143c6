//! Bookings: data model, lifecycle state machine, pricing and the service
//! that drives submission and post-acceptance transitions

pub mod error;
pub mod models;
pub mod pricing;
pub mod service;
pub mod state;

pub use error::BookingError;
pub use models::{
    Booking, BookingFilter, BookingPatch, BookingTransition, Direction, DriverAssignment,
    NewBooking, ServiceType,
};
pub use pricing::PricingTable;
pub use service::{Actor, AssignedDriver, BookingService, NewBookingRequest, PassengerView};
pub use state::{BookingEvent, BookingStatus, InvalidTransition};
