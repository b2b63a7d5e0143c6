//! Authenticated driver endpoints

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::super::middleware::AuthedDriver;
use super::super::state::AppState;
use super::super::types::{ApiJson, ApiResult, ok};
use super::feed::FeedData;
use crate::booking::{Actor, Booking};
use crate::core_types::{Amount, BookingId};
use crate::driver::{Driver, Region};
use crate::wallet::WalletTransaction;

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 200;

pub(crate) fn history_limit(limit: Option<usize>) -> usize {
    match limit {
        Some(n) if n > 0 => n.min(MAX_HISTORY_LIMIT),
        _ => DEFAULT_HISTORY_LIMIT,
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DriverData {
    pub driver: Driver,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingData {
    pub booking: Booking,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingsData {
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceData {
    pub balance: Amount,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionsData {
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PasswordSet {
    pub password_set: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationRequest {
    pub region: Region,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DriverFeedQuery {
    /// Defaults to the driver's current location
    pub region: Option<Region>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/v1/driver/me",
    responses((status = 200, description = "Profile", body = DriverData)),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
) -> ApiResult<DriverData> {
    let driver = state.drivers.profile(driver_id).await?;
    ok(DriverData { driver })
}

#[utoipa::path(
    put,
    path = "/api/v1/driver/location",
    request_body = LocationRequest,
    responses((status = 200, description = "Location updated", body = DriverData)),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn update_location(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
    ApiJson(req): ApiJson<LocationRequest>,
) -> ApiResult<DriverData> {
    let driver = state.drivers.update_location(driver_id, req.region).await?;
    ok(DriverData { driver })
}

#[utoipa::path(
    put,
    path = "/api/v1/driver/password",
    request_body = PasswordRequest,
    responses(
        (status = 200, description = "Password set", body = PasswordSet),
        (status = 400, description = "Password too short")
    ),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn set_password(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
    ApiJson(req): ApiJson<PasswordRequest>,
) -> ApiResult<PasswordSet> {
    state.drivers.set_password(driver_id, &req.password).await?;
    ok(PasswordSet { password_set: true })
}

#[utoipa::path(
    get,
    path = "/api/v1/driver/feed",
    params(DriverFeedQuery),
    responses((status = 200, description = "Bookings heading to the other city", body = FeedData)),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn feed(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
    Query(query): Query<DriverFeedQuery>,
) -> ApiResult<FeedData> {
    let driver = state.drivers.profile(driver_id).await?;
    let bookings = state
        .feed
        .for_driver(&driver, query.region, query.limit)
        .await?;
    ok(FeedData { bookings })
}

/// Claim a pending booking; the acceptance fee is debited from the wallet
#[utoipa::path(
    post,
    path = "/api/v1/driver/bookings/{id}/accept",
    params(("id" = i64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking confirmed", body = BookingData),
        (status = 401, description = "Please log in again"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Already accepted by someone else"),
        (status = 422, description = "Insufficient wallet balance"),
        (status = 500, description = "Internal error")
    ),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn accept_booking(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
    Path(booking_id): Path<BookingId>,
) -> ApiResult<BookingData> {
    let booking = state.acceptance.accept_booking(driver_id, booking_id).await?;
    ok(BookingData { booking })
}

#[utoipa::path(
    post,
    path = "/api/v1/driver/bookings/{id}/complete",
    params(("id" = i64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking completed", body = BookingData),
        (status = 403, description = "Not your booking"),
        (status = 409, description = "Booking is not confirmed")
    ),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
    Path(booking_id): Path<BookingId>,
) -> ApiResult<BookingData> {
    let booking = state
        .bookings
        .complete(Actor::Driver(driver_id), booking_id)
        .await?;
    ok(BookingData { booking })
}

#[utoipa::path(
    post,
    path = "/api/v1/driver/bookings/{id}/cancel",
    params(("id" = i64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking cancelled", body = BookingData),
        (status = 403, description = "Not your booking"),
        (status = 409, description = "Booking already finished")
    ),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
    Path(booking_id): Path<BookingId>,
) -> ApiResult<BookingData> {
    let booking = state
        .bookings
        .cancel(Actor::Driver(driver_id), booking_id)
        .await?;
    ok(BookingData { booking })
}

#[utoipa::path(
    get,
    path = "/api/v1/driver/bookings",
    responses((status = 200, description = "Bookings accepted by the driver", body = BookingsData)),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
) -> ApiResult<BookingsData> {
    let bookings = state.bookings.driver_bookings(driver_id).await?;
    ok(BookingsData { bookings })
}

#[utoipa::path(
    get,
    path = "/api/v1/driver/wallet",
    responses((status = 200, description = "Current balance", body = BalanceData)),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn wallet_balance(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
) -> ApiResult<BalanceData> {
    let balance = state.wallet.get_balance(driver_id).await?;
    ok(BalanceData { balance })
}

#[utoipa::path(
    get,
    path = "/api/v1/driver/wallet/transactions",
    params(HistoryQuery),
    responses((status = 200, description = "Ledger rows, newest first", body = TransactionsData)),
    security(("bearer" = [])),
    tag = "Driver"
)]
pub async fn wallet_transactions(
    State(state): State<Arc<AppState>>,
    Extension(AuthedDriver(driver_id)): Extension<AuthedDriver>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<TransactionsData> {
    let transactions = state
        .wallet
        .history(driver_id, history_limit(query.limit))
        .await?;
    ok(TransactionsData { transactions })
}
