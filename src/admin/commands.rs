//! Closed admin command sets
//!
//! Each variant names exactly the fields it may touch; anything else in the
//! payload is rejected at deserialization.

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::booking::BookingPatch;
use crate::core_types::{Amount, DriverId};
use crate::driver::{DriverProfile, DriverStatus};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "command", rename_all = "snake_case", deny_unknown_fields)]
pub enum DriverCommand {
    UpdateProfile {
        full_name: Option<String>,
        car_model: Option<String>,
        plate_number: Option<String>,
    },
    UpdateStatus {
        status: DriverStatus,
    },
    /// Cash received from the driver
    Topup {
        amount: Amount,
        description: Option<String>,
    },
    /// Signed correction
    Adjust {
        amount: Amount,
        description: String,
    },
    SoftDelete,
}

impl DriverCommand {
    pub fn name(&self) -> &'static str {
        match self {
            DriverCommand::UpdateProfile { .. } => "update_profile",
            DriverCommand::UpdateStatus { .. } => "update_status",
            DriverCommand::Topup { .. } => "topup",
            DriverCommand::Adjust { .. } => "adjust",
            DriverCommand::SoftDelete => "soft_delete",
        }
    }
}

/// Profile fields carried by `UpdateProfile`
pub(crate) fn profile_of(
    full_name: Option<String>,
    car_model: Option<String>,
    plate_number: Option<String>,
) -> Result<DriverProfile, validator::ValidationErrors> {
    let profile = DriverProfile {
        full_name,
        car_model,
        plate_number,
    };
    profile.validate()?;
    Ok(profile)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "command", rename_all = "snake_case", deny_unknown_fields)]
pub enum BookingCommand {
    EditDetails {
        passenger_name: Option<String>,
        passenger_phone: Option<String>,
        pickup_address: Option<String>,
        dropoff_address: Option<String>,
        estimated_price: Option<Amount>,
        notes: Option<String>,
    },
    Cancel,
    Complete,
    ReassignDriver {
        driver_id: DriverId,
    },
    SoftDelete,
}

impl BookingCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BookingCommand::EditDetails { .. } => "edit_details",
            BookingCommand::Cancel => "cancel",
            BookingCommand::Complete => "complete",
            BookingCommand::ReassignDriver { .. } => "reassign_driver",
            BookingCommand::SoftDelete => "soft_delete",
        }
    }
}

pub(crate) fn edit_patch(
    passenger_name: Option<String>,
    passenger_phone: Option<String>,
    pickup_address: Option<String>,
    dropoff_address: Option<String>,
    estimated_price: Option<Amount>,
    notes: Option<String>,
) -> BookingPatch {
    BookingPatch {
        passenger_name,
        passenger_phone,
        pickup_address,
        dropoff_address,
        estimated_price,
        notes,
        deleted_at: None,
    }
}
