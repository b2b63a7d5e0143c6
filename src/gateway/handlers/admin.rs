//! Admin console endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::super::state::AppState;
use super::super::types::{ApiJson, ApiResult, ok};
use super::driver::{BookingsData, DriverData, HistoryQuery, TransactionsData, history_limit};
use crate::admin::{BookingCommand, DriverCommand};
use crate::booking::{Booking, BookingStatus};
use crate::core_types::{BookingId, DriverId};
use crate::driver::{Driver, DriverProfile, DriverStatus};
use crate::reconcile::Discrepancy;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DriverListQuery {
    pub status: Option<DriverStatus>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDriverRequest {
    pub phone: String,
    #[serde(flatten)]
    pub profile: DriverProfile,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DriversData {
    pub drivers: Vec<Driver>,
}

/// `driver` is absent after `soft_delete`
#[derive(Debug, Serialize, ToSchema)]
pub struct DriverCommandData {
    pub driver: Option<Driver>,
}

/// `booking` is absent after `soft_delete`
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingCommandData {
    pub booking: Option<Booking>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciliationData {
    pub discrepancies: Vec<Discrepancy>,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/drivers",
    params(DriverListQuery),
    responses((status = 200, description = "Drivers", body = DriversData)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn list_drivers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DriverListQuery>,
) -> ApiResult<DriversData> {
    let drivers = state.admin.list_drivers(query.status).await?;
    ok(DriversData { drivers })
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/drivers",
    request_body = CreateDriverRequest,
    responses(
        (status = 200, description = "Driver created", body = DriverData),
        (status = 409, description = "Phone already registered")
    ),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn create_driver(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateDriverRequest>,
) -> ApiResult<DriverData> {
    let driver = state.admin.create_driver(&req.phone, req.profile).await?;
    ok(DriverData { driver })
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/drivers/{id}/commands",
    params(("id" = i64, Path, description = "Driver id")),
    request_body = DriverCommand,
    responses(
        (status = 200, description = "Command applied", body = DriverCommandData),
        (status = 400, description = "Invalid command"),
        (status = 404, description = "Driver not found"),
        (status = 422, description = "Adjustment would overdraw the wallet")
    ),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn driver_command(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<DriverId>,
    ApiJson(command): ApiJson<DriverCommand>,
) -> ApiResult<DriverCommandData> {
    let driver = state.admin.driver_command(driver_id, command).await?;
    ok(DriverCommandData { driver })
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/drivers/{id}/transactions",
    params(("id" = i64, Path, description = "Driver id"), HistoryQuery),
    responses((status = 200, description = "Ledger rows, newest first", body = TransactionsData)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn driver_transactions(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<DriverId>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<TransactionsData> {
    let transactions = state
        .admin
        .driver_transactions(driver_id, history_limit(query.limit))
        .await?;
    ok(TransactionsData { transactions })
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/bookings",
    params(BookingListQuery),
    responses((status = 200, description = "Bookings, newest first", body = BookingsData)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingListQuery>,
) -> ApiResult<BookingsData> {
    let bookings = state.admin.list_bookings(query.status, query.limit).await?;
    ok(BookingsData { bookings })
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/bookings/{id}/commands",
    params(("id" = i64, Path, description = "Booking id")),
    request_body = BookingCommand,
    responses(
        (status = 200, description = "Command applied", body = BookingCommandData),
        (status = 400, description = "Invalid command"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn booking_command(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<BookingId>,
    ApiJson(command): ApiJson<BookingCommand>,
) -> ApiResult<BookingCommandData> {
    let booking = state.admin.booking_command(booking_id, command).await?;
    ok(BookingCommandData { booking })
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reconciliation",
    responses((status = 200, description = "Drivers whose balance differs from their ledger", body = ReconciliationData)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn reconciliation(State(state): State<Arc<AppState>>) -> ApiResult<ReconciliationData> {
    let discrepancies = state.admin.reconcile().await?;
    ok(ReconciliationData { discrepancies })
}
