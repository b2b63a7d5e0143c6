use std::sync::Arc;

use crate::acceptance::AcceptanceCoordinator;
use crate::admin::AdminService;
use crate::auth::{AuthService, OtpSender};
use crate::booking::BookingService;
use crate::config::AppConfig;
use crate::driver::DriverService;
use crate::feed::AvailabilityFeed;
use crate::notify::NotifyRelay;
use crate::reconcile::Reconciler;
use crate::store::Store;
use crate::wallet::WalletLedger;

/// Services shared by every handler
///
/// All of them hold the same injected store; nothing here caches balances or
/// booking statuses.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub drivers: Arc<DriverService>,
    pub bookings: Arc<BookingService>,
    pub acceptance: Arc<AcceptanceCoordinator>,
    pub feed: Arc<AvailabilityFeed>,
    pub wallet: WalletLedger,
    pub auth: Arc<AuthService>,
    pub admin: Arc<AdminService>,
    pub reconciler: Arc<Reconciler>,
    pub notify: NotifyRelay,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn Store>,
        notify: NotifyRelay,
        otp_sender: Arc<dyn OtpSender>,
    ) -> Self {
        let drivers = Arc::new(DriverService::new(
            store.clone(),
            config.drivers.clone(),
            config.phone.clone(),
            notify.clone(),
        ));
        let bookings = Arc::new(BookingService::new(
            store.clone(),
            config.pricing.clone(),
            config.phone.clone(),
            config.booking.clone(),
            notify.clone(),
        ));
        let acceptance = Arc::new(AcceptanceCoordinator::new(
            store.clone(),
            config.fees.clone(),
            config.acceptance.clone(),
            notify.clone(),
        ));
        let feed = Arc::new(AvailabilityFeed::new(
            store.clone(),
            config.fees.clone(),
            config.feed.clone(),
        ));
        let wallet = WalletLedger::new(store.clone());
        let auth = Arc::new(AuthService::new(
            config.auth.clone(),
            drivers.clone(),
            otp_sender,
        ));
        let reconciler = Arc::new(Reconciler::new(store.clone(), notify.clone()));
        let admin = Arc::new(AdminService::new(
            drivers.clone(),
            bookings.clone(),
            wallet.clone(),
            reconciler.clone(),
        ));

        Self {
            store,
            drivers,
            bookings,
            acceptance,
            feed,
            wallet,
            auth,
            admin,
            reconciler,
            notify,
        }
    }
}
