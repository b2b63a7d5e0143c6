//! Acceptance Coordinator
//!
//! Checks the preconditions, then makes the fee debit and the
//! pending -> confirmed transition consistent in one of two ways:
//!
//! - `Transactional`: one `Store::accept_atomically` call, nothing to undo.
//! - `Compensating`: debit, compare-and-swap the booking, refund the fee
//!   with an `adjustment` row if the swap lost or failed.

use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::error::AcceptError;
use super::fee::FeeSchedule;
use crate::booking::{Booking, BookingStatus, BookingTransition, DriverAssignment};
use crate::config::{AcceptMode, AcceptanceConfig};
use crate::core_types::{Amount, BookingId, DriverId};
use crate::notify::{NotifyEvent, NotifyRelay};
use crate::store::{AtomicAccept, AtomicAcceptOutcome, Store};
use crate::wallet::{TxType, WalletError, WalletLedger};

pub struct AcceptanceCoordinator {
    store: Arc<dyn Store>,
    ledger: WalletLedger,
    fees: FeeSchedule,
    config: AcceptanceConfig,
    notify: NotifyRelay,
}

impl AcceptanceCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        fees: FeeSchedule,
        config: AcceptanceConfig,
        notify: NotifyRelay,
    ) -> Self {
        Self {
            ledger: WalletLedger::new(store.clone()),
            store,
            fees,
            config,
            notify,
        }
    }

    pub fn mode(&self) -> AcceptMode {
        self.config.mode
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Accept `booking_id` on behalf of `driver_id`
    ///
    /// Never waits on a competing attempt: the loser gets `Conflict` at once.
    pub async fn accept_booking(
        &self,
        driver_id: DriverId,
        booking_id: BookingId,
    ) -> Result<Booking, AcceptError> {
        let attempt = Uuid::new_v4();
        let span = info_span!("accept", %attempt, driver_id, booking_id, mode = ?self.config.mode);
        self.accept_inner(driver_id, booking_id).instrument(span).await
    }

    async fn accept_inner(
        &self,
        driver_id: DriverId,
        booking_id: BookingId,
    ) -> Result<Booking, AcceptError> {
        let driver = self
            .store
            .get_driver(driver_id)
            .await?
            .ok_or(AcceptError::Unauthorized)?;

        if self.config.require_approved_driver && !driver.is_approved() {
            warn!(status = %driver.status, "Driver not approved, acceptance refused");
            return Err(AcceptError::Unauthorized);
        }

        // The fee depends on the booking, so it is read before the funds check
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(AcceptError::NotFound)?;

        let fee = self.fees.fee_for(booking.service_type);
        if driver.wallet_balance < fee {
            info!(balance = driver.wallet_balance, fee, "Insufficient funds");
            return Err(AcceptError::InsufficientFunds {
                required: fee,
                available: driver.wallet_balance,
            });
        }

        if booking.status != BookingStatus::Pending {
            info!(status = %booking.status, "Booking no longer pending");
            return Err(AcceptError::Conflict);
        }

        let description = format!("Acceptance fee for {}", booking.route_label());

        let accepted = match self.config.mode {
            AcceptMode::Transactional => {
                self.accept_transactional(driver_id, booking_id, fee, description)
                    .await?
            }
            AcceptMode::Compensating => {
                self.accept_compensating(driver_id, booking_id, fee, &description)
                    .await?
            }
        };

        info!(fee, "Booking accepted");
        self.notify.publish(NotifyEvent::BookingAccepted {
            booking_id,
            driver_id,
            fee,
        });
        Ok(accepted)
    }

    async fn accept_transactional(
        &self,
        driver_id: DriverId,
        booking_id: BookingId,
        fee: Amount,
        description: String,
    ) -> Result<Booking, AcceptError> {
        let request = AtomicAccept {
            booking_id,
            driver_id,
            fee,
            description,
        };

        match self.store.accept_atomically(&request).await? {
            AtomicAcceptOutcome::Accepted {
                booking,
                new_balance,
            } => {
                info!(new_balance, "Fee debited");
                Ok(booking)
            }
            AtomicAcceptOutcome::AlreadyTaken { status } => {
                info!(%status, "Lost acceptance race");
                Err(AcceptError::Conflict)
            }
            AtomicAcceptOutcome::BookingGone => Err(AcceptError::NotFound),
            AtomicAcceptOutcome::InsufficientFunds { balance } => {
                Err(AcceptError::InsufficientFunds {
                    required: fee,
                    available: balance,
                })
            }
            AtomicAcceptOutcome::DriverGone => Err(AcceptError::Unauthorized),
        }
    }

    async fn accept_compensating(
        &self,
        driver_id: DriverId,
        booking_id: BookingId,
        fee: Amount,
        description: &str,
    ) -> Result<Booking, AcceptError> {
        // Step a: optimistic debit
        match self
            .ledger
            .debit(driver_id, fee, TxType::BookingFee, description, Some(booking_id))
            .await
        {
            Ok(_) => {}
            Err(WalletError::InsufficientFunds {
                required,
                available,
            }) => {
                return Err(AcceptError::InsufficientFunds {
                    required,
                    available,
                });
            }
            Err(WalletError::NotFound(_)) => return Err(AcceptError::Unauthorized),
            Err(e) => return Err(AcceptError::Internal(e.to_string())),
        }

        // Step b: compare-and-swap pending -> confirmed
        let transition = BookingTransition {
            booking_id,
            from: BookingStatus::Pending,
            to: BookingStatus::Confirmed,
            driver: DriverAssignment::Assign(driver_id),
        };

        match self.store.transition_booking_if(&transition).await {
            Ok(Some(booking)) => Ok(booking),
            Ok(None) => {
                info!("Lost acceptance race after debit, refunding");
                self.compensate(driver_id, booking_id, fee).await?;
                match self.store.get_booking(booking_id).await {
                    Ok(None) => Err(AcceptError::NotFound),
                    _ => Err(AcceptError::Conflict),
                }
            }
            Err(e) => {
                error!(error = %e, "Booking transition failed after debit, refunding");
                self.compensate(driver_id, booking_id, fee).await?;
                Err(AcceptError::Internal(e.to_string()))
            }
        }
    }

    /// Step c: give the fee back
    async fn compensate(
        &self,
        driver_id: DriverId,
        booking_id: BookingId,
        amount: Amount,
    ) -> Result<(), AcceptError> {
        let description = format!("Refund of acceptance fee for booking #{}", booking_id);
        match self
            .ledger
            .credit(
                driver_id,
                amount,
                TxType::Adjustment,
                &description,
                Some(booking_id),
            )
            .await
        {
            Ok(new_balance) => {
                info!(new_balance, amount, "Acceptance fee refunded");
                Ok(())
            }
            Err(e) => {
                error!(
                    driver_id,
                    booking_id,
                    amount,
                    error = %e,
                    "Compensation failed, driver was debited without a booking"
                );
                self.notify.publish(NotifyEvent::ReconciliationAlert {
                    message: format!(
                        "Manual refund needed: driver #{} booking #{} amount {} ({})",
                        driver_id, booking_id, amount, e
                    ),
                });
                Err(AcceptError::CompensationFailed {
                    driver_id,
                    booking_id,
                    amount,
                })
            }
        }
    }
}
