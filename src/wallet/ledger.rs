use std::sync::Arc;

use super::error::WalletError;
use super::types::{NewWalletTransaction, TxType, WalletTransaction, WalletWrite};
use crate::core_types::{Amount, BookingId, DriverId};
use crate::store::Store;

/// Balance operations
///
/// Each credit or debit is one guarded store write that also appends the
/// ledger row, so concurrent debits can never overdraw a wallet.
#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<dyn Store>,
}

impl WalletLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get_balance(&self, driver_id: DriverId) -> Result<Amount, WalletError> {
        self.store
            .get_driver(driver_id)
            .await?
            .map(|d| d.wallet_balance)
            .ok_or(WalletError::NotFound(driver_id))
    }

    /// Returns the new balance
    pub async fn credit(
        &self,
        driver_id: DriverId,
        amount: Amount,
        tx_type: TxType,
        description: &str,
        booking_id: Option<BookingId>,
    ) -> Result<Amount, WalletError> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount);
        }
        self.write(driver_id, amount, tx_type, description, booking_id)
            .await
    }

    /// Returns the new balance; the ledger row carries `-amount`
    pub async fn debit(
        &self,
        driver_id: DriverId,
        amount: Amount,
        tx_type: TxType,
        description: &str,
        booking_id: Option<BookingId>,
    ) -> Result<Amount, WalletError> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount);
        }
        self.write(driver_id, -amount, tx_type, description, booking_id)
            .await
    }

    /// Signed manual correction; negative values are guarded like debits
    pub async fn adjust(
        &self,
        driver_id: DriverId,
        delta: Amount,
        description: &str,
    ) -> Result<Amount, WalletError> {
        if delta == 0 {
            return Err(WalletError::InvalidAmount);
        }
        self.write(driver_id, delta, TxType::Adjustment, description, None)
            .await
    }

    pub async fn history(
        &self,
        driver_id: DriverId,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        if self.store.get_driver(driver_id).await?.is_none() {
            return Err(WalletError::NotFound(driver_id));
        }
        Ok(self
            .store
            .list_wallet_transactions(driver_id, limit)
            .await?)
    }

    pub async fn ledger_sum(&self, driver_id: DriverId) -> Result<Amount, WalletError> {
        Ok(self.store.ledger_sum(driver_id).await?)
    }

    async fn write(
        &self,
        driver_id: DriverId,
        delta: Amount,
        tx_type: TxType,
        description: &str,
        booking_id: Option<BookingId>,
    ) -> Result<Amount, WalletError> {
        let row = NewWalletTransaction {
            driver_id,
            amount: delta,
            tx_type,
            description: description.to_string(),
            booking_id,
        };

        match self.store.apply_wallet_delta(&row).await? {
            WalletWrite::Applied { new_balance, tx } => {
                tracing::info!(
                    driver_id,
                    delta,
                    new_balance,
                    tx_id = tx.id,
                    tx_type = %tx_type,
                    "Wallet updated"
                );
                Ok(new_balance)
            }
            WalletWrite::Insufficient { balance } => Err(WalletError::InsufficientFunds {
                required: -delta,
                available: balance,
            }),
            WalletWrite::DriverMissing => Err(WalletError::NotFound(driver_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverStatus, NewDriver, Region};
    use crate::store::MemoryStore;

    async fn setup(bonus: Amount) -> (Arc<MemoryStore>, WalletLedger, DriverId) {
        let store = Arc::new(MemoryStore::new());
        let driver = store
            .insert_driver(&NewDriver {
                phone: "09120000001".into(),
                welcome_bonus: bonus,
                full_name: None,
                car_model: None,
                plate_number: None,
                status: DriverStatus::Approved,
                current_location: Region::A,
            })
            .await
            .unwrap();
        let ledger = WalletLedger::new(store.clone());
        (store, ledger, driver.id)
    }

    #[tokio::test]
    async fn test_credit_and_debit_move_balance_and_ledger() {
        let (_store, ledger, id) = setup(100_000).await;

        assert_eq!(
            ledger.credit(id, 50_000, TxType::Topup, "cash", None).await,
            Ok(150_000)
        );
        assert_eq!(
            ledger.debit(id, 25_000, TxType::BookingFee, "booking #1", Some(1)).await,
            Ok(125_000)
        );
        assert_eq!(ledger.get_balance(id).await, Ok(125_000));
        assert_eq!(ledger.ledger_sum(id).await, Ok(125_000));

        let history = ledger.history(id, 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].amount, -25_000);
        assert_eq!(history[0].booking_id, Some(1));
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let (_store, ledger, id) = setup(0).await;
        assert_eq!(
            ledger.credit(id, 0, TxType::Topup, "", None).await,
            Err(WalletError::InvalidAmount)
        );
        assert_eq!(
            ledger.debit(id, -5, TxType::BookingFee, "", None).await,
            Err(WalletError::InvalidAmount)
        );
        assert_eq!(ledger.adjust(id, 0, "").await, Err(WalletError::InvalidAmount));
    }

    #[tokio::test]
    async fn test_overdraft_rejected_without_ledger_row() {
        let (_store, ledger, id) = setup(10_000).await;
        assert_eq!(
            ledger.debit(id, 25_000, TxType::BookingFee, "fee", None).await,
            Err(WalletError::InsufficientFunds {
                required: 25_000,
                available: 10_000
            })
        );
        assert_eq!(ledger.history(id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_driver_is_not_found() {
        let (_store, ledger, _) = setup(0).await;
        assert_eq!(ledger.get_balance(404).await, Err(WalletError::NotFound(404)));
        assert_eq!(
            ledger.credit(404, 1, TxType::Topup, "", None).await,
            Err(WalletError::NotFound(404))
        );
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_overdraw() {
        let (store, ledger, id) = setup(100_000).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.debit(id, 25_000, TxType::BookingFee, "race", None).await
            }));
        }
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 4);
        let driver = store.get_driver(id).await.unwrap().unwrap();
        assert_eq!(driver.wallet_balance, 0);
    }
}
