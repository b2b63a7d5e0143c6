//! Driver data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::booking::Direction;
use crate::core_types::{Amount, DriverId};

/// Driver moderation status
///
/// Stored as SMALLINT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum DriverStatus {
    Pending = 0,
    Approved = 1,
    Rejected = -1,
}

impl DriverStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(DriverStatus::Pending),
            1 => Some(DriverStatus::Approved),
            -1 => Some(DriverStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Pending => "pending",
            DriverStatus::Approved => "approved",
            DriverStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the two cities on the route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum Region {
    #[default]
    A = 1,
    B = 2,
}

impl Region {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Region::A),
            2 => Some(Region::B),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::A => "a",
            Region::B => "b",
        }
    }

    pub fn opposite(&self) -> Region {
        match self {
            Region::A => Region::B,
            Region::B => Region::A,
        }
    }

    /// Bookings shown to a driver in this region: those departing from the
    /// opposite region.
    pub fn feed_direction(&self) -> Direction {
        Direction::departing_from(self.opposite())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Driver account
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Driver {
    pub id: DriverId,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub car_model: Option<String>,
    pub plate_number: Option<String>,
    pub wallet_balance: Amount,
    pub status: DriverStatus,
    pub current_location: Region,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Driver {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_approved(&self) -> bool {
        self.status == DriverStatus::Approved
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Insert payload for a driver row
///
/// A non-zero `welcome_bonus` is written as a `bonus` ledger row in the same
/// store operation as the insert.
#[derive(Debug, Clone)]
pub struct NewDriver {
    pub phone: String,
    pub welcome_bonus: Amount,
    pub full_name: Option<String>,
    pub car_model: Option<String>,
    pub plate_number: Option<String>,
    pub status: DriverStatus,
    pub current_location: Region,
}

/// Field-level update applied by the store
///
/// `None` leaves the column untouched. Built only by the driver and admin
/// services from their closed command sets.
#[derive(Debug, Clone, Default)]
pub struct DriverPatch {
    pub full_name: Option<String>,
    pub car_model: Option<String>,
    pub plate_number: Option<String>,
    pub status: Option<DriverStatus>,
    pub current_location: Option<Region>,
    pub password_hash: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DriverPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.car_model.is_none()
            && self.plate_number.is_none()
            && self.status.is_none()
            && self.current_location.is_none()
            && self.password_hash.is_none()
            && self.deleted_at.is_none()
    }

    /// Apply to an in-memory row
    pub fn apply_to(&self, driver: &mut Driver) {
        if let Some(ref v) = self.full_name {
            driver.full_name = Some(v.clone());
        }
        if let Some(ref v) = self.car_model {
            driver.car_model = Some(v.clone());
        }
        if let Some(ref v) = self.plate_number {
            driver.plate_number = Some(v.clone());
        }
        if let Some(v) = self.status {
            driver.status = v;
        }
        if let Some(v) = self.current_location {
            driver.current_location = v;
        }
        if let Some(ref v) = self.password_hash {
            driver.password_hash = Some(v.clone());
        }
        if let Some(v) = self.deleted_at {
            driver.deleted_at = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_id_roundtrip() {
        for status in [
            DriverStatus::Pending,
            DriverStatus::Approved,
            DriverStatus::Rejected,
        ] {
            assert_eq!(DriverStatus::from_id(status.id()), Some(status));
        }
        assert!(DriverStatus::from_id(7).is_none());
    }

    #[test]
    fn test_region_feed_direction_is_opposite() {
        assert_eq!(Region::A.feed_direction(), Direction::BToA);
        assert_eq!(Region::B.feed_direction(), Direction::AToB);
    }

    #[test]
    fn test_region_serde_names() {
        assert_eq!(serde_json::to_string(&Region::A).unwrap(), "\"a\"");
        let r: Region = serde_json::from_str("\"b\"").unwrap();
        assert_eq!(r, Region::B);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(DriverPatch::default().is_empty());
        let patch = DriverPatch {
            current_location: Some(Region::B),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let now = Utc::now();
        let driver = Driver {
            id: 1,
            phone: "09121234567".to_string(),
            password_hash: Some("$argon2id$secret".to_string()),
            full_name: None,
            car_model: None,
            plate_number: None,
            wallet_balance: 0,
            status: DriverStatus::Pending,
            current_location: Region::A,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let json = serde_json::to_string(&driver).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password_hash"));
    }
}
