//! End-to-end acceptance flows over `MemoryStore`, run in both modes

use std::sync::Arc;

use super::{AcceptError, AcceptanceCoordinator, FeeSchedule};
use crate::booking::{
    Actor, BookingService, BookingStatus, Direction, NewBooking, PricingTable, ServiceType,
};
use crate::config::{AcceptMode, AcceptanceConfig, BookingConfig, PhoneConfig};
use crate::core_types::{Amount, BookingId, DriverId};
use crate::driver::{DriverStatus, NewDriver, Region};
use crate::notify::{NotifyEvent, NotifyRelay};
use crate::store::{MemoryStore, Store};
use crate::wallet::TxType;

const MODES: [AcceptMode; 2] = [AcceptMode::Transactional, AcceptMode::Compensating];

struct Harness {
    store: Arc<MemoryStore>,
    coordinator: Arc<AcceptanceCoordinator>,
    relay: NotifyRelay,
    next_phone: std::sync::atomic::AtomicU32,
}

impl Harness {
    fn new(mode: AcceptMode) -> Self {
        let store = Arc::new(MemoryStore::new());
        let relay = NotifyRelay::new(256);
        let config = AcceptanceConfig {
            mode,
            ..Default::default()
        };
        let coordinator = Arc::new(AcceptanceCoordinator::new(
            store.clone(),
            FeeSchedule::default(),
            config,
            relay.clone(),
        ));
        Self {
            store,
            coordinator,
            relay,
            next_phone: std::sync::atomic::AtomicU32::new(1_000_000),
        }
    }

    async fn driver_with(&self, balance: Amount, status: DriverStatus) -> DriverId {
        let n = self
            .next_phone
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.store
            .insert_driver(&NewDriver {
                phone: format!("0912{:07}", n),
                welcome_bonus: balance,
                full_name: Some("Reza Karimi".into()),
                car_model: Some("Peugeot 405".into()),
                plate_number: Some("12B345-67".into()),
                status,
                current_location: Region::A,
            })
            .await
            .unwrap()
            .id
    }

    async fn driver(&self, balance: Amount) -> DriverId {
        self.driver_with(balance, DriverStatus::Approved).await
    }

    async fn booking(&self, service_type: ServiceType) -> BookingId {
        self.store
            .insert_booking(&NewBooking {
                reference: ulid::Ulid::new().to_string(),
                passenger_name: "Sara".into(),
                passenger_phone: "09351234567".into(),
                pickup_address: "Azadi Square".into(),
                dropoff_address: None,
                direction: Direction::AToB,
                service_type,
                seat_count: 1,
                estimated_price: 500_000,
                notes: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn balance(&self, driver_id: DriverId) -> Amount {
        self.store
            .get_driver(driver_id)
            .await
            .unwrap()
            .unwrap()
            .wallet_balance
    }

    async fn status(&self, booking_id: BookingId) -> BookingStatus {
        self.store
            .get_booking(booking_id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    async fn fee_rows(&self, booking_id: BookingId) -> Vec<crate::wallet::WalletTransaction> {
        self.store
            .booking_transactions(booking_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.tx_type == TxType::BookingFee)
            .collect()
    }

    async fn assert_ledger_matches(&self, driver_id: DriverId) {
        assert_eq!(
            self.store.ledger_sum(driver_id).await.unwrap(),
            self.balance(driver_id).await,
            "ledger sum drifted from balance for driver {}",
            driver_id
        );
    }
}

#[tokio::test]
async fn test_accept_debits_fee_and_confirms() {
    for mode in MODES {
        let h = Harness::new(mode);
        let driver = h.driver(100_000).await;
        let booking = h.booking(ServiceType::SharedSeat).await;

        let accepted = h.coordinator.accept_booking(driver, booking).await.unwrap();
        assert_eq!(accepted.status, BookingStatus::Confirmed, "{:?}", mode);
        assert_eq!(accepted.driver_id, Some(driver));
        assert!(accepted.confirmed_at.is_some());
        assert_eq!(h.balance(driver).await, 75_000);

        let rows = h.fee_rows(booking).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, -25_000);
        assert_eq!(rows[0].driver_id, driver);
        assert!(rows[0].description.contains(&format!("booking #{}", booking)));
        h.assert_ledger_matches(driver).await;

        assert!(h.relay.drain().iter().any(|e| matches!(
            e,
            NotifyEvent::BookingAccepted { booking_id, fee: 25_000, .. } if *booking_id == booking
        )));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_have_one_winner() {
    const DRIVERS: usize = 8;

    for mode in MODES {
        let h = Harness::new(mode);
        let booking = h.booking(ServiceType::SharedSeat).await;
        let mut drivers = Vec::new();
        for _ in 0..DRIVERS {
            drivers.push(h.driver(100_000).await);
        }

        let handles: Vec<_> = drivers
            .iter()
            .map(|&driver| {
                let coordinator = h.coordinator.clone();
                tokio::spawn(async move { (driver, coordinator.accept_booking(driver, booking).await) })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            let (driver, result) = handle.await.unwrap();
            match result {
                Ok(_) => winners.push(driver),
                Err(AcceptError::Conflict) => {}
                Err(other) => panic!("{:?}: unexpected {:?}", mode, other),
            }
        }

        assert_eq!(winners.len(), 1, "{:?}", mode);
        let winner = winners[0];
        let stored = h.store.get_booking(booking).await.unwrap().unwrap();
        assert_eq!(stored.driver_id, Some(winner));

        for &driver in &drivers {
            let expected = if driver == winner { 75_000 } else { 100_000 };
            assert_eq!(h.balance(driver).await, expected, "{:?}", mode);
            h.assert_ledger_matches(driver).await;
        }
        assert_eq!(h.fee_rows(booking).await.len(), 1);
    }
}

#[tokio::test]
async fn test_insufficient_funds_changes_nothing() {
    for mode in MODES {
        let h = Harness::new(mode);
        let driver = h.driver(10_000).await;
        let booking = h.booking(ServiceType::FullCar).await;

        let err = h.coordinator.accept_booking(driver, booking).await.unwrap_err();
        assert_eq!(
            err,
            AcceptError::InsufficientFunds {
                required: 140_000,
                available: 10_000
            }
        );
        assert_eq!(h.balance(driver).await, 10_000);
        assert_eq!(h.status(booking).await, BookingStatus::Pending);
        assert!(h.fee_rows(booking).await.is_empty());
    }
}

#[tokio::test]
async fn test_missing_or_deleted_booking_not_found() {
    for mode in MODES {
        let h = Harness::new(mode);
        let driver = h.driver(100_000).await;

        assert_eq!(
            h.coordinator.accept_booking(driver, 9_999).await.unwrap_err(),
            AcceptError::NotFound
        );

        let booking = h.booking(ServiceType::SharedSeat).await;
        h.store
            .update_booking(
                booking,
                &crate::booking::BookingPatch {
                    deleted_at: Some(chrono::Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            h.coordinator.accept_booking(driver, booking).await.unwrap_err(),
            AcceptError::NotFound
        );
        assert_eq!(h.balance(driver).await, 100_000);
    }
}

#[tokio::test]
async fn test_admin_cancel_after_accept_keeps_fee() {
    for mode in MODES {
        let h = Harness::new(mode);
        let bookings = BookingService::new(
            h.store.clone(),
            PricingTable::default(),
            PhoneConfig::default(),
            BookingConfig::default(),
            h.relay.clone(),
        );
        let driver = h.driver(50_000).await;
        let booking = h.booking(ServiceType::SharedSeat).await;

        h.coordinator.accept_booking(driver, booking).await.unwrap();
        assert_eq!(h.balance(driver).await, 25_000);

        let cancelled = bookings.cancel(Actor::Admin, booking).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(h.balance(driver).await, 25_000);
        h.assert_ledger_matches(driver).await;
    }
}

#[tokio::test]
async fn test_cancel_refunds_when_enabled() {
    let h = Harness::new(AcceptMode::Transactional);
    let bookings = BookingService::new(
        h.store.clone(),
        PricingTable::default(),
        PhoneConfig::default(),
        BookingConfig {
            refund_on_cancel: true,
            ..Default::default()
        },
        h.relay.clone(),
    );
    let driver = h.driver(50_000).await;
    let booking = h.booking(ServiceType::SharedSeat).await;

    h.coordinator.accept_booking(driver, booking).await.unwrap();
    bookings.cancel(Actor::Driver(driver), booking).await.unwrap();
    assert_eq!(h.balance(driver).await, 50_000);
    h.assert_ledger_matches(driver).await;
}

#[tokio::test]
async fn test_second_accept_conflicts_without_second_debit() {
    for mode in MODES {
        let h = Harness::new(mode);
        let driver = h.driver(100_000).await;
        let booking = h.booking(ServiceType::SharedSeat).await;

        h.coordinator.accept_booking(driver, booking).await.unwrap();
        assert_eq!(
            h.coordinator.accept_booking(driver, booking).await.unwrap_err(),
            AcceptError::Conflict
        );
        assert_eq!(h.balance(driver).await, 75_000);
        assert_eq!(h.fee_rows(booking).await.len(), 1);
    }
}

#[tokio::test]
async fn test_lost_race_after_debit_restores_balance() {
    for mode in MODES {
        let h = Harness::new(mode);
        let rival = h.driver(100_000).await;
        let driver = h.driver(100_000).await;
        let booking = h.booking(ServiceType::SharedSeat).await;
        h.store.faults(|f| f.steal_next_accept = Some(rival));

        assert_eq!(
            h.coordinator.accept_booking(driver, booking).await.unwrap_err(),
            AcceptError::Conflict,
            "{:?}",
            mode
        );
        assert_eq!(h.balance(driver).await, 100_000);
        h.assert_ledger_matches(driver).await;

        let stored = h.store.get_booking(booking).await.unwrap().unwrap();
        assert_eq!(stored.driver_id, Some(rival));

        // a compensated attempt leaves a debit and an equal refund behind
        let rows = h.store.booking_transactions(booking).await.unwrap();
        let net: Amount = rows
            .iter()
            .filter(|t| t.driver_id == driver)
            .map(|t| t.amount)
            .sum();
        assert_eq!(net, 0);
        if mode == AcceptMode::Compensating {
            assert!(rows.iter().any(|t| t.tx_type == TxType::Adjustment && t.amount == 25_000));
        } else {
            assert!(rows.is_empty());
        }
    }
}

#[tokio::test]
async fn test_transition_failure_is_internal_and_refunded() {
    let h = Harness::new(AcceptMode::Compensating);
    let driver = h.driver(100_000).await;
    let booking = h.booking(ServiceType::Package).await;
    h.store.faults(|f| f.fail_next_transition = true);

    let err = h.coordinator.accept_booking(driver, booking).await.unwrap_err();
    assert!(matches!(err, AcceptError::Internal(_)), "{:?}", err);
    assert_eq!(h.balance(driver).await, 100_000);
    assert_eq!(h.status(booking).await, BookingStatus::Pending);
    h.assert_ledger_matches(driver).await;

    // the store recovered, a retry goes through
    h.coordinator.accept_booking(driver, booking).await.unwrap();
    assert_eq!(h.balance(driver).await, 85_000);
}

#[tokio::test]
async fn test_failed_compensation_raises_alert() {
    let h = Harness::new(AcceptMode::Compensating);
    let rival = h.driver(100_000).await;
    let driver = h.driver(100_000).await;
    let booking = h.booking(ServiceType::SharedSeat).await;
    h.store.faults(|f| {
        f.steal_next_accept = Some(rival);
        f.fail_credits = true;
    });

    let err = h.coordinator.accept_booking(driver, booking).await.unwrap_err();
    assert_eq!(
        err,
        AcceptError::CompensationFailed {
            driver_id: driver,
            booking_id: booking,
            amount: 25_000
        }
    );
    assert_eq!(err.http_status(), 500);
    assert_eq!(h.balance(driver).await, 75_000);

    let alerts: Vec<_> = h
        .relay
        .drain()
        .into_iter()
        .filter(|e| matches!(e, NotifyEvent::ReconciliationAlert { .. }))
        .collect();
    assert_eq!(alerts.len(), 1);
}

#[tokio::test]
async fn test_unapproved_or_unknown_driver_unauthorized() {
    for mode in MODES {
        let h = Harness::new(mode);
        let pending = h.driver_with(100_000, DriverStatus::Pending).await;
        let booking = h.booking(ServiceType::SharedSeat).await;

        assert_eq!(
            h.coordinator.accept_booking(pending, booking).await.unwrap_err(),
            AcceptError::Unauthorized
        );
        assert_eq!(
            h.coordinator.accept_booking(424_242, booking).await.unwrap_err(),
            AcceptError::Unauthorized
        );
        assert_eq!(h.balance(pending).await, 100_000);
        assert_eq!(h.status(booking).await, BookingStatus::Pending);
    }
}

#[tokio::test]
async fn test_balance_never_negative_across_many_accepts() {
    for mode in MODES {
        let h = Harness::new(mode);
        let driver = h.driver(60_000).await;
        let mut accepted = 0;
        for _ in 0..5 {
            let booking = h.booking(ServiceType::SharedSeat).await;
            match h.coordinator.accept_booking(driver, booking).await {
                Ok(_) => accepted += 1,
                Err(AcceptError::InsufficientFunds { .. }) => {}
                Err(other) => panic!("unexpected {:?}", other),
            }
            assert!(h.balance(driver).await >= 0);
        }
        assert_eq!(accepted, 2);
        assert_eq!(h.balance(driver).await, 10_000);
        h.assert_ledger_matches(driver).await;
    }
}
