//! Admin console operations

use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::commands::{BookingCommand, DriverCommand, edit_patch, profile_of};
use super::error::AdminError;
use crate::booking::{Actor, Booking, BookingFilter, BookingService, BookingStatus};
use crate::core_types::{BookingId, DriverId};
use crate::driver::{Driver, DriverProfile, DriverService, DriverStatus};
use crate::reconcile::{Discrepancy, Reconciler};
use crate::wallet::{TxType, WalletLedger, WalletTransaction};

const DEFAULT_TOPUP_DESCRIPTION: &str = "Wallet top-up";

pub struct AdminService {
    drivers: Arc<DriverService>,
    bookings: Arc<BookingService>,
    ledger: WalletLedger,
    reconciler: Arc<Reconciler>,
}

impl AdminService {
    pub fn new(
        drivers: Arc<DriverService>,
        bookings: Arc<BookingService>,
        ledger: WalletLedger,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            drivers,
            bookings,
            ledger,
            reconciler,
        }
    }

    pub async fn list_drivers(&self, status: Option<DriverStatus>) -> Result<Vec<Driver>, AdminError> {
        Ok(self.drivers.list(status).await?)
    }

    pub async fn create_driver(
        &self,
        phone: &str,
        profile: DriverProfile,
    ) -> Result<Driver, AdminError> {
        profile.validate()?;
        let driver = self.drivers.create(phone, profile).await?;
        info!(driver_id = driver.id, "Driver created by admin");
        Ok(driver)
    }

    /// Returns the driver after the command, `None` once soft-deleted
    pub async fn driver_command(
        &self,
        driver_id: DriverId,
        command: DriverCommand,
    ) -> Result<Option<Driver>, AdminError> {
        let name = command.name();
        let driver = match command {
            DriverCommand::UpdateProfile {
                full_name,
                car_model,
                plate_number,
            } => {
                let profile = profile_of(full_name, car_model, plate_number)?;
                Some(self.drivers.update_profile(driver_id, profile).await?)
            }
            DriverCommand::UpdateStatus { status } => {
                Some(self.drivers.update_status(driver_id, status).await?)
            }
            DriverCommand::Topup {
                amount,
                description,
            } => {
                let description = description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| DEFAULT_TOPUP_DESCRIPTION.to_string());
                let new_balance = self
                    .ledger
                    .credit(driver_id, amount, TxType::Topup, &description, None)
                    .await?;
                info!(driver_id, amount, new_balance, "Wallet topped up");
                Some(self.drivers.profile(driver_id).await?)
            }
            DriverCommand::Adjust {
                amount,
                description,
            } => {
                if description.trim().is_empty() {
                    return Err(AdminError::Invalid(
                        "an adjustment needs a description".into(),
                    ));
                }
                let new_balance = self
                    .ledger
                    .adjust(driver_id, amount, description.trim())
                    .await?;
                info!(driver_id, amount, new_balance, "Wallet adjusted");
                Some(self.drivers.profile(driver_id).await?)
            }
            DriverCommand::SoftDelete => {
                self.drivers.soft_delete(driver_id).await?;
                None
            }
        };
        info!(driver_id, command = name, "Driver command applied");
        Ok(driver)
    }

    pub async fn driver_transactions(
        &self,
        driver_id: DriverId,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>, AdminError> {
        Ok(self.ledger.history(driver_id, limit).await?)
    }

    pub async fn list_bookings(
        &self,
        status: Option<BookingStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Booking>, AdminError> {
        let filter = BookingFilter {
            status,
            limit,
            ..Default::default()
        };
        Ok(self.bookings.list(&filter).await?)
    }

    /// Returns the booking after the command, `None` once soft-deleted
    pub async fn booking_command(
        &self,
        booking_id: BookingId,
        command: BookingCommand,
    ) -> Result<Option<Booking>, AdminError> {
        let name = command.name();
        let booking = match command {
            BookingCommand::EditDetails {
                passenger_name,
                passenger_phone,
                pickup_address,
                dropoff_address,
                estimated_price,
                notes,
            } => {
                let patch = edit_patch(
                    passenger_name,
                    passenger_phone,
                    pickup_address,
                    dropoff_address,
                    estimated_price,
                    notes,
                );
                Some(self.bookings.edit(booking_id, patch).await?)
            }
            BookingCommand::Cancel => Some(self.bookings.cancel(Actor::Admin, booking_id).await?),
            BookingCommand::Complete => {
                Some(self.bookings.complete(Actor::Admin, booking_id).await?)
            }
            BookingCommand::ReassignDriver { driver_id } => {
                Some(self.bookings.reassign(booking_id, driver_id).await?)
            }
            BookingCommand::SoftDelete => {
                self.bookings.soft_delete(booking_id).await?;
                None
            }
        };
        info!(booking_id, command = name, "Booking command applied");
        Ok(booking)
    }

    pub async fn reconcile(&self) -> Result<Vec<Discrepancy>, AdminError> {
        Ok(self.reconciler.scan().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{Direction, NewBookingRequest, PricingTable, ServiceType};
    use crate::config::{BookingConfig, DriversConfig, PhoneConfig};
    use crate::notify::NotifyRelay;
    use crate::store::MemoryStore;
    use crate::wallet::WalletError;

    struct Console {
        admin: AdminService,
        bookings: Arc<BookingService>,
    }

    fn console() -> Console {
        let store = Arc::new(MemoryStore::new());
        let relay = NotifyRelay::new(64);
        let drivers = Arc::new(DriverService::new(
            store.clone(),
            DriversConfig::default(),
            PhoneConfig::default(),
            relay.clone(),
        ));
        let bookings = Arc::new(BookingService::new(
            store.clone(),
            PricingTable::default(),
            PhoneConfig::default(),
            BookingConfig::default(),
            relay.clone(),
        ));
        let admin = AdminService::new(
            drivers,
            bookings.clone(),
            WalletLedger::new(store.clone()),
            Arc::new(Reconciler::new(store, relay)),
        );
        Console { admin, bookings }
    }

    fn request() -> NewBookingRequest {
        NewBookingRequest {
            passenger_name: "Mina".into(),
            passenger_phone: "09351234567".into(),
            pickup_address: "Railway Station".into(),
            dropoff_address: None,
            direction: Direction::BToA,
            service_type: ServiceType::FullCar,
            seat_count: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_topup_and_adjust_hit_the_ledger() {
        let c = console();
        let driver = c
            .admin
            .create_driver("09121234567", DriverProfile::default())
            .await
            .unwrap();

        let after = c
            .admin
            .driver_command(
                driver.id,
                DriverCommand::Topup {
                    amount: 200_000,
                    description: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.wallet_balance, 300_000);

        let after = c
            .admin
            .driver_command(
                driver.id,
                DriverCommand::Adjust {
                    amount: -50_000,
                    description: "duplicate top-up".into(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.wallet_balance, 250_000);

        let history = c.admin.driver_transactions(driver.id, 10).await.unwrap();
        let types: Vec<_> = history.iter().map(|t| t.tx_type).collect();
        assert_eq!(types, vec![TxType::Adjustment, TxType::Topup, TxType::Bonus]);
        assert_eq!(history[1].description, DEFAULT_TOPUP_DESCRIPTION);
        assert!(c.admin.reconcile().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wallet_guards_apply_to_admin() {
        let c = console();
        let driver = c
            .admin
            .create_driver("09121234567", DriverProfile::default())
            .await
            .unwrap();

        assert_eq!(
            c.admin
                .driver_command(
                    driver.id,
                    DriverCommand::Topup {
                        amount: 0,
                        description: None
                    }
                )
                .await
                .unwrap_err(),
            AdminError::Wallet(WalletError::InvalidAmount)
        );
        assert!(matches!(
            c.admin
                .driver_command(
                    driver.id,
                    DriverCommand::Adjust {
                        amount: -1_000_000,
                        description: "too much".into()
                    }
                )
                .await,
            Err(AdminError::Wallet(WalletError::InsufficientFunds { .. }))
        ));
        assert!(matches!(
            c.admin
                .driver_command(
                    driver.id,
                    DriverCommand::Adjust {
                        amount: 10,
                        description: "  ".into()
                    }
                )
                .await,
            Err(AdminError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_status_profile_and_delete() {
        let c = console();
        let driver = c
            .admin
            .create_driver("09121234567", DriverProfile::default())
            .await
            .unwrap();

        let approved = c
            .admin
            .driver_command(
                driver.id,
                DriverCommand::UpdateStatus {
                    status: DriverStatus::Approved,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(approved.is_approved());
        assert_eq!(
            c.admin.list_drivers(Some(DriverStatus::Approved)).await.unwrap().len(),
            1
        );

        let renamed = c
            .admin
            .driver_command(
                driver.id,
                DriverCommand::UpdateProfile {
                    full_name: Some("Hamid Rezaei".into()),
                    car_model: None,
                    plate_number: Some("55D123-11".into()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.full_name.as_deref(), Some("Hamid Rezaei"));
        assert_eq!(renamed.car_model, None);

        let too_long = "x".repeat(200);
        assert!(matches!(
            c.admin
                .driver_command(
                    driver.id,
                    DriverCommand::UpdateProfile {
                        full_name: Some(too_long),
                        car_model: None,
                        plate_number: None,
                    },
                )
                .await,
            Err(AdminError::Invalid(_))
        ));

        assert!(
            c.admin
                .driver_command(driver.id, DriverCommand::SoftDelete)
                .await
                .unwrap()
                .is_none()
        );
        assert!(c.admin.list_drivers(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_booking_commands() {
        let c = console();
        let booking = c.bookings.submit(request()).await.unwrap();

        let edited = c
            .admin
            .booking_command(
                booking.id,
                BookingCommand::EditDetails {
                    passenger_name: None,
                    passenger_phone: Some("+98 935 765 4321".into()),
                    pickup_address: None,
                    dropoff_address: Some("Central Hospital".into()),
                    estimated_price: None,
                    notes: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.passenger_phone, "09357654321");
        assert_eq!(edited.dropoff_address.as_deref(), Some("Central Hospital"));

        // a pending booking cannot be completed
        assert!(matches!(
            c.admin.booking_command(booking.id, BookingCommand::Complete).await,
            Err(AdminError::Booking(_))
        ));

        let cancelled = c
            .admin
            .booking_command(booking.id, BookingCommand::Cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(
            c.admin
                .list_bookings(Some(BookingStatus::Cancelled), None)
                .await
                .unwrap()
                .len(),
            1
        );

        c.admin
            .booking_command(booking.id, BookingCommand::SoftDelete)
            .await
            .unwrap();
        assert!(c.admin.list_bookings(None, None).await.unwrap().is_empty());
    }
}
