use std::sync::Arc;

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::super::state::AppState;
use super::super::types::{ApiResult, ok};
use crate::driver::Region;
use crate::feed::AvailableBooking;

#[derive(Debug, Deserialize, IntoParams)]
pub struct FeedQuery {
    /// Region the driver is in; omit for every pending booking
    pub region: Option<Region>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedData {
    pub bookings: Vec<AvailableBooking>,
}

/// Pending bookings with masked passenger phones
#[utoipa::path(
    get,
    path = "/api/v1/feed",
    params(FeedQuery),
    responses((status = 200, description = "Available bookings", body = FeedData)),
    tag = "Feed"
)]
pub async fn list_available(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<FeedData> {
    let bookings = state.feed.list_available(query.region, query.limit).await?;
    ok(FeedData { bookings })
}
