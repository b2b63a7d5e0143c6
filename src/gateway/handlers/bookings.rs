//! Public passenger endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Serialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiJson, ApiResult, ok};
use crate::booking::{NewBookingRequest, PassengerView};
use crate::core_types::{Amount, BookingId};

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmittedBooking {
    pub id: BookingId,
    /// Keep this to check the booking status later
    pub reference: String,
    pub estimated_price: Amount,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PassengerBookingData {
    pub booking: PassengerView,
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    request_body = NewBookingRequest,
    responses(
        (status = 200, description = "Booking created", body = SubmittedBooking),
        (status = 400, description = "Invalid booking")
    ),
    tag = "Passenger"
)]
pub async fn submit_booking(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<NewBookingRequest>,
) -> ApiResult<SubmittedBooking> {
    let booking = state.bookings.submit(req).await?;
    ok(SubmittedBooking {
        id: booking.id,
        reference: booking.reference,
        estimated_price: booking.estimated_price,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{reference}",
    params(("reference" = String, Path, description = "Tracking reference")),
    responses(
        (status = 200, description = "Booking status", body = PassengerBookingData),
        (status = 404, description = "Unknown reference")
    ),
    tag = "Passenger"
)]
pub async fn booking_status(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> ApiResult<PassengerBookingData> {
    let booking = state.bookings.get_by_reference(&reference).await?;
    ok(PassengerBookingData { booking })
}
