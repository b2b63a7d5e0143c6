//! Driver onboarding and self-service

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use super::error::DriverError;
use super::models::{Driver, DriverPatch, DriverStatus, NewDriver, Region};
use super::phone::PhoneNumber;
use crate::auth::password::hash_password;
use crate::config::{DriversConfig, PhoneConfig};
use crate::core_types::DriverId;
use crate::notify::{NotifyEvent, NotifyRelay};
use crate::store::{Store, StoreError};

/// Optional profile fields set by admins
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct DriverProfile {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub car_model: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub plate_number: Option<String>,
}

impl DriverProfile {
    fn into_patch(self) -> DriverPatch {
        DriverPatch {
            full_name: self.full_name,
            car_model: self.car_model,
            plate_number: self.plate_number,
            ..Default::default()
        }
    }
}

pub struct DriverService {
    store: Arc<dyn Store>,
    config: DriversConfig,
    phone: PhoneConfig,
    notify: NotifyRelay,
}

impl DriverService {
    pub fn new(
        store: Arc<dyn Store>,
        config: DriversConfig,
        phone: PhoneConfig,
        notify: NotifyRelay,
    ) -> Self {
        Self {
            store,
            config,
            phone,
            notify,
        }
    }

    pub fn normalize_phone(&self, raw: &str) -> Result<PhoneNumber, DriverError> {
        Ok(PhoneNumber::parse(raw, &self.phone)?)
    }

    /// Find-or-create by phone; `true` when the driver was just created
    pub async fn onboard(&self, raw_phone: &str) -> Result<(Driver, bool), DriverError> {
        let phone = self.normalize_phone(raw_phone)?;

        if let Some(existing) = self.store.find_driver_by_phone(phone.as_str()).await? {
            return Ok((existing, false));
        }

        match self.insert(&phone, DriverProfile::default()).await {
            Ok(driver) => Ok((driver, true)),
            // a concurrent verification for the same phone won
            Err(DriverError::AlreadyRegistered) => {
                let driver = self
                    .store
                    .find_driver_by_phone(phone.as_str())
                    .await?
                    .ok_or_else(|| {
                        DriverError::Store(StoreError::Database(
                            "driver vanished after duplicate insert".into(),
                        ))
                    })?;
                Ok((driver, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Admin creation; fails if the phone is taken
    pub async fn create(
        &self,
        raw_phone: &str,
        profile: DriverProfile,
    ) -> Result<Driver, DriverError> {
        let phone = self.normalize_phone(raw_phone)?;
        self.insert(&phone, profile).await
    }

    async fn insert(&self, phone: &PhoneNumber, profile: DriverProfile) -> Result<Driver, DriverError> {
        let status = if self.config.auto_approve {
            DriverStatus::Approved
        } else {
            DriverStatus::Pending
        };
        let new = NewDriver {
            phone: phone.as_str().to_string(),
            welcome_bonus: self.config.welcome_bonus.max(0),
            full_name: profile.full_name,
            car_model: profile.car_model,
            plate_number: profile.plate_number,
            status,
            current_location: Region::default(),
        };

        let driver = self.store.insert_driver(&new).await?;
        info!(
            driver_id = driver.id,
            status = %driver.status,
            welcome_bonus = new.welcome_bonus,
            "Driver created"
        );
        self.notify.publish(NotifyEvent::DriverSignedUp {
            driver_id: driver.id,
            masked_phone: phone.masked(),
        });
        Ok(driver)
    }

    pub async fn profile(&self, driver_id: DriverId) -> Result<Driver, DriverError> {
        self.store
            .get_driver(driver_id)
            .await?
            .ok_or(DriverError::NotFound(driver_id))
    }

    pub async fn find_by_phone(&self, raw_phone: &str) -> Result<Option<Driver>, DriverError> {
        let phone = self.normalize_phone(raw_phone)?;
        Ok(self.store.find_driver_by_phone(phone.as_str()).await?)
    }

    pub async fn update_location(
        &self,
        driver_id: DriverId,
        region: Region,
    ) -> Result<Driver, DriverError> {
        let patch = DriverPatch {
            current_location: Some(region),
            ..Default::default()
        };
        let driver = self.patch(driver_id, &patch).await?;
        info!(driver_id, %region, "Driver location updated");
        Ok(driver)
    }

    pub async fn set_password(&self, driver_id: DriverId, password: &str) -> Result<(), DriverError> {
        let patch = DriverPatch {
            password_hash: Some(hash_password(password)?),
            ..Default::default()
        };
        self.patch(driver_id, &patch).await?;
        info!(driver_id, "Driver password set");
        Ok(())
    }

    pub async fn update_profile(
        &self,
        driver_id: DriverId,
        profile: DriverProfile,
    ) -> Result<Driver, DriverError> {
        let patch = profile.into_patch();
        if patch.is_empty() {
            return Err(DriverError::NoChanges);
        }
        self.patch(driver_id, &patch).await
    }

    pub async fn update_status(
        &self,
        driver_id: DriverId,
        status: DriverStatus,
    ) -> Result<Driver, DriverError> {
        let patch = DriverPatch {
            status: Some(status),
            ..Default::default()
        };
        let driver = self.patch(driver_id, &patch).await?;
        info!(driver_id, %status, "Driver status changed");
        Ok(driver)
    }

    pub async fn soft_delete(&self, driver_id: DriverId) -> Result<(), DriverError> {
        let patch = DriverPatch {
            deleted_at: Some(Utc::now()),
            ..Default::default()
        };
        self.patch(driver_id, &patch).await?;
        info!(driver_id, "Driver soft-deleted");
        Ok(())
    }

    pub async fn list(&self, status: Option<DriverStatus>) -> Result<Vec<Driver>, DriverError> {
        Ok(self.store.list_drivers(status).await?)
    }

    async fn patch(&self, driver_id: DriverId, patch: &DriverPatch) -> Result<Driver, DriverError> {
        self.store
            .update_driver(driver_id, patch)
            .await?
            .ok_or(DriverError::NotFound(driver_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::wallet::TxType;

    fn service(store: Arc<MemoryStore>, config: DriversConfig) -> (DriverService, NotifyRelay) {
        let relay = NotifyRelay::new(16);
        let svc = DriverService::new(store, config, PhoneConfig::default(), relay.clone());
        (svc, relay)
    }

    #[tokio::test]
    async fn test_onboard_creates_once_with_bonus() {
        let store = Arc::new(MemoryStore::new());
        let (svc, relay) = service(store.clone(), DriversConfig::default());

        let (driver, created) = svc.onboard("+989121234567").await.unwrap();
        assert!(created);
        assert_eq!(driver.phone, "09121234567");
        assert_eq!(driver.status, DriverStatus::Pending);
        assert_eq!(driver.wallet_balance, 100_000);

        let (again, created) = svc.onboard("0912 123 4567").await.unwrap();
        assert!(!created);
        assert_eq!(again.id, driver.id);

        let rows = store.list_wallet_transactions(driver.id, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tx_type, TxType::Bonus);

        let events = relay.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            NotifyEvent::DriverSignedUp { masked_phone, .. } if masked_phone == "0912*******"
        ));
    }

    #[tokio::test]
    async fn test_auto_approve() {
        let store = Arc::new(MemoryStore::new());
        let config = DriversConfig {
            auto_approve: true,
            welcome_bonus: 0,
        };
        let (svc, _) = service(store.clone(), config);
        let (driver, _) = svc.onboard("09121234567").await.unwrap();
        assert!(driver.is_approved());
        assert_eq!(driver.wallet_balance, 0);
        assert!(store.list_wallet_transactions(driver.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_create_rejects_duplicate_phone() {
        let store = Arc::new(MemoryStore::new());
        let (svc, _) = service(store, DriversConfig::default());
        svc.create("09121234567", DriverProfile::default()).await.unwrap();
        assert_eq!(
            svc.create("+98 912 123 4567", DriverProfile::default()).await.unwrap_err(),
            DriverError::AlreadyRegistered
        );
    }

    #[tokio::test]
    async fn test_self_service_updates() {
        let store = Arc::new(MemoryStore::new());
        let (svc, _) = service(store, DriversConfig::default());
        let (driver, _) = svc.onboard("09121234567").await.unwrap();

        let moved = svc.update_location(driver.id, Region::B).await.unwrap();
        assert_eq!(moved.current_location, Region::B);

        assert!(matches!(
            svc.set_password(driver.id, "short").await,
            Err(DriverError::Password(_))
        ));
        svc.set_password(driver.id, "long enough").await.unwrap();
        assert!(svc.profile(driver.id).await.unwrap().has_password());
    }

    #[tokio::test]
    async fn test_soft_deleted_driver_is_invisible() {
        let store = Arc::new(MemoryStore::new());
        let (svc, _) = service(store, DriversConfig::default());
        let (driver, _) = svc.onboard("09121234567").await.unwrap();

        svc.soft_delete(driver.id).await.unwrap();
        assert_eq!(
            svc.profile(driver.id).await.unwrap_err(),
            DriverError::NotFound(driver.id)
        );
        assert!(svc.list(None).await.unwrap().is_empty());
        assert!(svc.find_by_phone("09121234567").await.unwrap().is_none());
        assert!(matches!(
            svc.update_location(driver.id, Region::B).await,
            Err(DriverError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_profile_update_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (svc, _) = service(store, DriversConfig::default());
        let (driver, _) = svc.onboard("09121234567").await.unwrap();
        assert_eq!(
            svc.update_profile(driver.id, DriverProfile::default()).await.unwrap_err(),
            DriverError::NoChanges
        );
    }
}
