use serde::{Deserialize, Serialize};

use crate::booking::ServiceType;
use crate::core_types::Amount;

/// Acceptance fee per service type, debited from the accepting driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub shared_seat: Amount,
    pub full_car: Amount,
    pub package: Amount,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            shared_seat: 25_000,
            full_car: 140_000,
            package: 15_000,
        }
    }
}

impl FeeSchedule {
    pub fn fee_for(&self, service_type: ServiceType) -> Amount {
        match service_type {
            ServiceType::SharedSeat => self.shared_seat,
            ServiceType::FullCar => self.full_car,
            ServiceType::Package => self.package,
        }
    }
}
