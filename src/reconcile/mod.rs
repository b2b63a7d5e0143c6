//! Balance reconciliation
//!
//! `wallet_balance` is authoritative. The ledger is the audit trail, and any
//! driver whose balance differs from the sum of their ledger rows is reported.
//! Nothing is corrected automatically.

pub mod worker;

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::core_types::{Amount, DriverId};
use crate::notify::{NotifyEvent, NotifyRelay};
use crate::store::{Store, StoreError};

pub use worker::ReconcileWorker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Discrepancy {
    pub driver_id: DriverId,
    pub balance: Amount,
    pub ledger_sum: Amount,
    /// `balance - ledger_sum`
    pub drift: Amount,
}

pub struct Reconciler {
    store: Arc<dyn Store>,
    notify: NotifyRelay,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, notify: NotifyRelay) -> Self {
        Self { store, notify }
    }

    /// Compare every live driver's balance with their ledger and alert on drift
    pub async fn scan(&self) -> Result<Vec<Discrepancy>, StoreError> {
        let snapshots = self.store.wallet_snapshots().await?;
        let mut found = Vec::new();

        for snapshot in &snapshots {
            if snapshot.ledger_sum == snapshot.balance {
                continue;
            }
            let discrepancy = Discrepancy {
                driver_id: snapshot.driver_id,
                balance: snapshot.balance,
                ledger_sum: snapshot.ledger_sum,
                drift: snapshot.balance - snapshot.ledger_sum,
            };
            warn!(
                driver_id = discrepancy.driver_id,
                balance = discrepancy.balance,
                ledger_sum = discrepancy.ledger_sum,
                drift = discrepancy.drift,
                "Wallet balance drifted from ledger"
            );
            self.notify.publish(NotifyEvent::ReconciliationAlert {
                message: format!(
                    "Driver #{} balance {} but ledger sums to {} (drift {})",
                    discrepancy.driver_id,
                    discrepancy.balance,
                    discrepancy.ledger_sum,
                    discrepancy.drift
                ),
            });
            found.push(discrepancy);
        }

        info!(
            drivers = snapshots.len(),
            discrepancies = found.len(),
            "Reconciliation scan finished"
        );
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverStatus, NewDriver, Region};
    use crate::store::MemoryStore;
    use crate::wallet::{TxType, WalletLedger};

    async fn driver(store: &MemoryStore, phone: &str, bonus: Amount) -> DriverId {
        store
            .insert_driver(&NewDriver {
                phone: phone.into(),
                welcome_bonus: bonus,
                full_name: None,
                car_model: None,
                plate_number: None,
                status: DriverStatus::Approved,
                current_location: Region::A,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_consistent_wallets_report_nothing() {
        let store = Arc::new(MemoryStore::new());
        let id = driver(&store, "09121111111", 100_000).await;
        let ledger = WalletLedger::new(store.clone());
        ledger
            .debit(id, 25_000, TxType::BookingFee, "fee", None)
            .await
            .unwrap();
        ledger
            .credit(id, 50_000, TxType::Topup, "cash", None)
            .await
            .unwrap();

        let relay = NotifyRelay::new(8);
        let reconciler = Reconciler::new(store, relay.clone());
        assert!(reconciler.scan().await.unwrap().is_empty());
        assert_eq!(relay.pending(), 0);
    }

    #[tokio::test]
    async fn test_drift_is_reported_not_fixed() {
        let store = Arc::new(MemoryStore::new());
        let ok = driver(&store, "09121111111", 100_000).await;
        let drifted = driver(&store, "09122222222", 100_000).await;
        store.corrupt_balance(drifted, 130_000);

        let relay = NotifyRelay::new(8);
        let reconciler = Reconciler::new(store.clone(), relay.clone());
        let found = reconciler.scan().await.unwrap();

        assert_eq!(
            found,
            vec![Discrepancy {
                driver_id: drifted,
                balance: 130_000,
                ledger_sum: 100_000,
                drift: 30_000,
            }]
        );
        assert!(found.iter().all(|d| d.driver_id != ok));
        assert_eq!(relay.pending(), 1);
        assert_eq!(
            store.get_driver(drifted).await.unwrap().unwrap().wallet_balance,
            130_000
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_scan_during_wallet_writes_reports_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for i in 0..50 {
            ids.push(driver(&store, &format!("0912{:07}", i), 100_000).await);
        }

        let writer = {
            let ledger = WalletLedger::new(store.clone());
            let ids = ids.clone();
            tokio::spawn(async move {
                for round in 0..40 {
                    for &id in &ids {
                        ledger
                            .debit(id, 1, TxType::BookingFee, "fee", None)
                            .await
                            .unwrap();
                    }
                    if round % 4 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        };

        let relay = NotifyRelay::new(1024);
        let reconciler = Reconciler::new(store.clone(), relay.clone());
        let mut scans = 0;
        loop {
            assert!(reconciler.scan().await.unwrap().is_empty());
            scans += 1;
            if writer.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        assert!(scans > 0);
        assert!(reconciler.scan().await.unwrap().is_empty());
        assert_eq!(relay.pending(), 0);
        assert_eq!(
            store.get_driver(ids[0]).await.unwrap().unwrap().wallet_balance,
            100_000 - 40
        );
    }
}
