//! Booking data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::state::BookingStatus;
use crate::core_types::{Amount, BookingId, DriverId};
use crate::driver::Region;

/// Travel direction on the fixed route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum Direction {
    #[serde(rename = "a_to_b")]
    AToB = 1,
    #[serde(rename = "b_to_a")]
    BToA = 2,
}

impl Direction {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Direction::AToB),
            2 => Some(Direction::BToA),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::AToB => "a_to_b",
            Direction::BToA => "b_to_a",
        }
    }

    pub fn departing_from(region: Region) -> Direction {
        match region {
            Region::A => Direction::AToB,
            Region::B => Direction::BToA,
        }
    }

    pub fn origin(&self) -> Region {
        match self {
            Direction::AToB => Region::A,
            Direction::BToA => Region::B,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ServiceType {
    SharedSeat = 1,
    FullCar = 2,
    Package = 3,
}

impl ServiceType {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(ServiceType::SharedSeat),
            2 => Some(ServiceType::FullCar),
            3 => Some(ServiceType::Package),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::SharedSeat => "shared_seat",
            ServiceType::FullCar => "full_car",
            ServiceType::Package => "package",
        }
    }

    /// Only shared rides carry a passenger count
    pub fn is_per_seat(&self) -> bool {
        matches!(self, ServiceType::SharedSeat)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Booking {
    pub id: BookingId,
    /// Public tracking code (ULID)
    pub reference: String,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub pickup_address: String,
    pub dropoff_address: Option<String>,
    pub direction: Direction,
    pub service_type: ServiceType,
    pub seat_count: i32,
    pub estimated_price: Amount,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub driver_id: Option<DriverId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending && !self.is_deleted()
    }

    pub fn is_assigned_to(&self, driver_id: DriverId) -> bool {
        self.driver_id == Some(driver_id)
    }

    /// Short human label used in ledger descriptions and notifications
    pub fn route_label(&self) -> String {
        match self.dropoff_address {
            Some(ref dropoff) => format!(
                "booking #{} ({}, {} -> {})",
                self.id, self.direction, self.pickup_address, dropoff
            ),
            None => format!(
                "booking #{} ({}, from {})",
                self.id, self.direction, self.pickup_address
            ),
        }
    }
}

/// Insert payload; status always starts at `pending`
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub reference: String,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub pickup_address: String,
    pub dropoff_address: Option<String>,
    pub direction: Direction,
    pub service_type: ServiceType,
    pub seat_count: i32,
    pub estimated_price: Amount,
    pub notes: Option<String>,
}

/// Admin field edits, outside the lifecycle state machine
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub passenger_name: Option<String>,
    pub passenger_phone: Option<String>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub estimated_price: Option<Amount>,
    pub notes: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        self.passenger_name.is_none()
            && self.passenger_phone.is_none()
            && self.pickup_address.is_none()
            && self.dropoff_address.is_none()
            && self.estimated_price.is_none()
            && self.notes.is_none()
            && self.deleted_at.is_none()
    }

    pub fn apply_to(&self, booking: &mut Booking) {
        if let Some(ref v) = self.passenger_name {
            booking.passenger_name = v.clone();
        }
        if let Some(ref v) = self.passenger_phone {
            booking.passenger_phone = v.clone();
        }
        if let Some(ref v) = self.pickup_address {
            booking.pickup_address = v.clone();
        }
        if let Some(ref v) = self.dropoff_address {
            booking.dropoff_address = Some(v.clone());
        }
        if let Some(v) = self.estimated_price {
            booking.estimated_price = v;
        }
        if let Some(ref v) = self.notes {
            booking.notes = Some(v.clone());
        }
        if let Some(v) = self.deleted_at {
            booking.deleted_at = Some(v);
        }
    }
}

/// Who holds the booking after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverAssignment {
    Keep,
    Assign(DriverId),
}

/// Compare-and-swap request: applied only while the row is in `from`
#[derive(Debug, Clone, Copy)]
pub struct BookingTransition {
    pub booking_id: BookingId,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub driver: DriverAssignment,
}

/// Listing filter, results newest first
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub direction: Option<Direction>,
    pub driver_id: Option<DriverId>,
    pub limit: Option<usize>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        !booking.is_deleted()
            && self.status.is_none_or(|s| booking.status == s)
            && self.direction.is_none_or(|d| booking.direction == d)
            && self.driver_id.is_none_or(|id| booking.driver_id == Some(id))
    }
}
