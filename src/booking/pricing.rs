use serde::{Deserialize, Serialize};

use super::models::ServiceType;
use crate::core_types::Amount;

/// Passenger-facing price list
///
/// Shared rides are priced per seat; full car and package are flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingTable {
    pub per_seat_price: Amount,
    pub full_car_price: Amount,
    pub package_price: Amount,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            per_seat_price: 500_000,
            full_car_price: 1_800_000,
            package_price: 300_000,
        }
    }
}

impl PricingTable {
    /// `None` on overflow
    pub fn estimate(&self, service_type: ServiceType, seat_count: i32) -> Option<Amount> {
        match service_type {
            ServiceType::SharedSeat => self.per_seat_price.checked_mul(i64::from(seat_count)),
            ServiceType::FullCar => Some(self.full_car_price),
            ServiceType::Package => Some(self.package_price),
        }
    }
}
