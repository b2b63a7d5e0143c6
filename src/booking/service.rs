//! Booking service
//!
//! Passenger submission and lookup, plus every lifecycle transition other
//! than acceptance (which belongs to the acceptance coordinator).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use validator::Validate;

use super::error::BookingError;
use super::models::{
    Booking, BookingFilter, BookingPatch, BookingTransition, Direction, DriverAssignment,
    NewBooking, ServiceType,
};
use super::pricing::PricingTable;
use super::state::{BookingEvent, BookingStatus};
use crate::config::{BookingConfig, PhoneConfig};
use crate::core_types::{Amount, BookingId, DriverId};
use crate::driver::PhoneNumber;
use crate::notify::{NotifyEvent, NotifyRelay};
use crate::store::Store;
use crate::wallet::{TxType, WalletLedger};

/// Who is asking for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Admin,
    Driver(DriverId),
}

/// Public booking form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewBookingRequest {
    #[validate(length(min = 1, max = 100))]
    pub passenger_name: String,
    pub passenger_phone: String,
    #[validate(length(min = 1, max = 300))]
    pub pickup_address: String,
    #[validate(length(max = 300))]
    pub dropoff_address: Option<String>,
    pub direction: Direction,
    pub service_type: ServiceType,
    /// Shared rides only; other service types always book one unit
    pub seat_count: Option<i32>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Driver details a passenger sees once the booking is confirmed
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignedDriver {
    pub first_name: Option<String>,
    pub car_model: Option<String>,
    pub plate_number: Option<String>,
}

/// Passenger status lookup by reference
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PassengerView {
    pub reference: String,
    pub status: BookingStatus,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub pickup_address: String,
    pub dropoff_address: Option<String>,
    pub direction: Direction,
    pub service_type: ServiceType,
    pub seat_count: i32,
    pub estimated_price: Amount,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub driver: Option<AssignedDriver>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct BookingService {
    store: Arc<dyn Store>,
    ledger: WalletLedger,
    pricing: PricingTable,
    phone: PhoneConfig,
    config: BookingConfig,
    notify: NotifyRelay,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn Store>,
        pricing: PricingTable,
        phone: PhoneConfig,
        config: BookingConfig,
        notify: NotifyRelay,
    ) -> Self {
        Self {
            ledger: WalletLedger::new(store.clone()),
            store,
            pricing,
            phone,
            config,
            notify,
        }
    }

    pub async fn submit(&self, req: NewBookingRequest) -> Result<Booking, BookingError> {
        req.validate()?;

        let passenger_name = req.passenger_name.trim().to_string();
        let pickup_address = req.pickup_address.trim().to_string();
        if passenger_name.is_empty() || pickup_address.is_empty() {
            return Err(BookingError::Invalid(
                "passenger name and pickup address are required".into(),
            ));
        }

        let phone = PhoneNumber::parse(&req.passenger_phone, &self.phone)?;

        let seat_count = if req.service_type.is_per_seat() {
            let seats = req.seat_count.unwrap_or(1);
            if !(1..=self.config.max_shared_seats).contains(&seats) {
                return Err(BookingError::Invalid(format!(
                    "seat_count must be between 1 and {}",
                    self.config.max_shared_seats
                )));
            }
            seats
        } else {
            1
        };

        let estimated_price = self
            .pricing
            .estimate(req.service_type, seat_count)
            .ok_or_else(|| BookingError::Invalid("price out of range".into()))?;

        let new = NewBooking {
            reference: ulid::Ulid::new().to_string(),
            passenger_name,
            passenger_phone: phone.into_string(),
            pickup_address,
            dropoff_address: non_blank(req.dropoff_address),
            direction: req.direction,
            service_type: req.service_type,
            seat_count,
            estimated_price,
            notes: non_blank(req.notes),
        };

        let booking = self.store.insert_booking(&new).await?;
        info!(
            booking_id = booking.id,
            reference = %booking.reference,
            direction = %booking.direction,
            service_type = %booking.service_type,
            "Booking submitted"
        );

        self.notify.publish(NotifyEvent::BookingCreated {
            booking_id: booking.id,
            reference: booking.reference.clone(),
            route: booking.route_label(),
            service_type: booking.service_type.to_string(),
        });
        Ok(booking)
    }

    pub async fn get_by_reference(&self, reference: &str) -> Result<PassengerView, BookingError> {
        let booking = self
            .store
            .get_booking_by_reference(reference.trim())
            .await?
            .ok_or(BookingError::NotFound)?;

        let driver = match booking.driver_id {
            Some(id) if booking.status != BookingStatus::Pending => {
                self.store.get_driver(id).await?.map(|d| AssignedDriver {
                    first_name: d
                        .full_name
                        .as_deref()
                        .and_then(|n| n.split_whitespace().next())
                        .map(str::to_string),
                    car_model: d.car_model,
                    plate_number: d.plate_number,
                })
            }
            _ => None,
        };

        Ok(PassengerView {
            reference: booking.reference,
            status: booking.status,
            passenger_name: booking.passenger_name,
            passenger_phone: booking.passenger_phone,
            pickup_address: booking.pickup_address,
            dropoff_address: booking.dropoff_address,
            direction: booking.direction,
            service_type: booking.service_type,
            seat_count: booking.seat_count,
            estimated_price: booking.estimated_price,
            created_at: booking.created_at,
            confirmed_at: booking.confirmed_at,
            driver,
        })
    }

    pub async fn get(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound)
    }

    pub async fn complete(&self, actor: Actor, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.transition(actor, booking_id, BookingEvent::Complete)
            .await
    }

    pub async fn cancel(&self, actor: Actor, booking_id: BookingId) -> Result<Booking, BookingError> {
        let (before, after) = self
            .transition_from(actor, booking_id, BookingEvent::Cancel)
            .await?;

        if self.config.refund_on_cancel
            && before == BookingStatus::Confirmed
            && let Some(driver_id) = after.driver_id
        {
            self.refund_fee(driver_id, after.id).await;
        }
        Ok(after)
    }

    /// Admin override: hand a confirmed booking to another driver, no wallet
    /// movement
    pub async fn reassign(
        &self,
        booking_id: BookingId,
        driver_id: DriverId,
    ) -> Result<Booking, BookingError> {
        if self.store.get_driver(driver_id).await?.is_none() {
            return Err(BookingError::DriverNotFound);
        }
        let booking = self.get(booking_id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::Invalid(format!(
                "only confirmed bookings can be reassigned, this one is {}",
                booking.status
            )));
        }

        let transition = BookingTransition {
            booking_id,
            from: BookingStatus::Confirmed,
            to: BookingStatus::Confirmed,
            driver: DriverAssignment::Assign(driver_id),
        };
        let updated = self
            .store
            .transition_booking_if(&transition)
            .await?
            .ok_or(BookingError::Conflict)?;

        info!(
            booking_id,
            from_driver = ?booking.driver_id,
            to_driver = driver_id,
            "Booking reassigned"
        );
        Ok(updated)
    }

    /// Admin field edits
    pub async fn edit(
        &self,
        booking_id: BookingId,
        mut patch: BookingPatch,
    ) -> Result<Booking, BookingError> {
        if patch.is_empty() {
            return Err(BookingError::Invalid("nothing to update".into()));
        }
        if let Some(ref raw) = patch.passenger_phone {
            patch.passenger_phone = Some(PhoneNumber::parse(raw, &self.phone)?.into_string());
        }
        if patch.estimated_price.is_some_and(|p| p < 0) {
            return Err(BookingError::Invalid("estimated_price must not be negative".into()));
        }
        if patch.passenger_name.as_deref().is_some_and(|v| v.trim().is_empty())
            || patch.pickup_address.as_deref().is_some_and(|v| v.trim().is_empty())
        {
            return Err(BookingError::Invalid(
                "passenger name and pickup address cannot be blank".into(),
            ));
        }

        let booking = self
            .store
            .update_booking(booking_id, &patch)
            .await?
            .ok_or(BookingError::NotFound)?;
        info!(booking_id, "Booking edited");
        Ok(booking)
    }

    pub async fn soft_delete(&self, booking_id: BookingId) -> Result<(), BookingError> {
        let patch = BookingPatch {
            deleted_at: Some(Utc::now()),
            ..Default::default()
        };
        self.store
            .update_booking(booking_id, &patch)
            .await?
            .ok_or(BookingError::NotFound)?;
        info!(booking_id, "Booking soft-deleted");
        Ok(())
    }

    /// Bookings accepted by the driver, with full passenger phones
    pub async fn driver_bookings(&self, driver_id: DriverId) -> Result<Vec<Booking>, BookingError> {
        let filter = BookingFilter {
            driver_id: Some(driver_id),
            ..Default::default()
        };
        Ok(self.store.list_bookings(&filter).await?)
    }

    pub async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.list_bookings(filter).await?)
    }

    async fn transition(
        &self,
        actor: Actor,
        booking_id: BookingId,
        event: BookingEvent,
    ) -> Result<Booking, BookingError> {
        self.transition_from(actor, booking_id, event)
            .await
            .map(|(_, after)| after)
    }

    /// Returns the status the booking left and the updated row
    async fn transition_from(
        &self,
        actor: Actor,
        booking_id: BookingId,
        event: BookingEvent,
    ) -> Result<(BookingStatus, Booking), BookingError> {
        let booking = self.get(booking_id).await?;

        if let Actor::Driver(driver_id) = actor
            && !booking.is_assigned_to(driver_id)
        {
            return Err(BookingError::Forbidden);
        }

        let from = booking.status;
        let to = from.apply(event)?;
        let transition = BookingTransition {
            booking_id,
            from,
            to,
            driver: DriverAssignment::Keep,
        };

        let updated = self
            .store
            .transition_booking_if(&transition)
            .await?
            .ok_or(BookingError::Conflict)?;

        info!(booking_id, actor = ?actor, %from, %to, "Booking transitioned");
        Ok((from, updated))
    }

    /// Credit back whatever the driver paid net for this booking
    async fn refund_fee(&self, driver_id: DriverId, booking_id: BookingId) {
        let paid: Amount = match self.store.booking_transactions(booking_id).await {
            Ok(rows) => -rows
                .iter()
                .filter(|tx| tx.driver_id == driver_id)
                .map(|tx| tx.amount)
                .sum::<Amount>(),
            Err(e) => {
                error!(driver_id, booking_id, error = %e, "Cannot read fee rows for refund");
                return;
            }
        };
        if paid <= 0 {
            return;
        }

        let description = format!("Refund on cancellation of booking #{}", booking_id);
        match self
            .ledger
            .credit(driver_id, paid, TxType::Adjustment, &description, Some(booking_id))
            .await
        {
            Ok(new_balance) => info!(driver_id, booking_id, paid, new_balance, "Cancellation refund"),
            Err(e) => {
                error!(driver_id, booking_id, amount = paid, error = %e, "Cancellation refund failed");
                self.notify.publish(NotifyEvent::ReconciliationAlert {
                    message: format!(
                        "Cancellation refund failed: driver #{} booking #{} amount {}",
                        driver_id, booking_id, paid
                    ),
                });
            }
        }
    }
}
