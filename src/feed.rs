//! Availability feed
//!
//! Pending bookings, newest first, with passenger phones masked. A driver in
//! region A sees rides departing from B and vice versa.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::acceptance::FeeSchedule;
use crate::booking::{Booking, BookingFilter, BookingStatus, Direction, ServiceType};
use crate::config::FeedConfig;
use crate::core_types::{Amount, BookingId};
use crate::driver::{Driver, Region, mask_phone};
use crate::store::{Store, StoreError};

/// Feed entry; never carries the full phone or the tracking reference
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailableBooking {
    pub id: BookingId,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub pickup_address: String,
    pub dropoff_address: Option<String>,
    pub direction: Direction,
    pub service_type: ServiceType,
    pub seat_count: i32,
    pub estimated_price: Amount,
    /// Debited from the driver on acceptance
    pub acceptance_fee: Amount,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AvailableBooking {
    fn from_booking(booking: Booking, fees: &FeeSchedule) -> Self {
        Self {
            id: booking.id,
            passenger_phone: mask_phone(&booking.passenger_phone),
            passenger_name: booking.passenger_name,
            pickup_address: booking.pickup_address,
            dropoff_address: booking.dropoff_address,
            direction: booking.direction,
            service_type: booking.service_type,
            seat_count: booking.seat_count,
            estimated_price: booking.estimated_price,
            acceptance_fee: fees.fee_for(booking.service_type),
            notes: booking.notes,
            created_at: booking.created_at,
        }
    }
}

pub struct AvailabilityFeed {
    store: Arc<dyn Store>,
    fees: FeeSchedule,
    config: FeedConfig,
}

impl AvailabilityFeed {
    pub fn new(store: Arc<dyn Store>, fees: FeeSchedule, config: FeedConfig) -> Self {
        Self {
            store,
            fees,
            config,
        }
    }

    fn clamp_limit(&self, limit: Option<usize>) -> usize {
        match limit {
            Some(n) if n > 0 => n.min(self.config.max_limit),
            _ => self.config.default_limit.min(self.config.max_limit),
        }
    }

    pub async fn list_available(
        &self,
        region: Option<Region>,
        limit: Option<usize>,
    ) -> Result<Vec<AvailableBooking>, StoreError> {
        let filter = BookingFilter {
            status: Some(BookingStatus::Pending),
            direction: region.map(|r| r.feed_direction()),
            driver_id: None,
            limit: Some(self.clamp_limit(limit)),
        };
        let bookings = self.store.list_bookings(&filter).await?;
        Ok(bookings
            .into_iter()
            .map(|b| AvailableBooking::from_booking(b, &self.fees))
            .collect())
    }

    /// Feed for the driver's current region unless one is given
    pub async fn for_driver(
        &self,
        driver: &Driver,
        region: Option<Region>,
        limit: Option<usize>,
    ) -> Result<Vec<AvailableBooking>, StoreError> {
        self.list_available(Some(region.unwrap_or(driver.current_location)), limit)
            .await
    }
}
