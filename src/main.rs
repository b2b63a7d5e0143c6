//! Intercity carpool backend
//!
//! ```text
//! passenger ──POST /bookings──▶ BookingService ─┐
//!                                               ▼
//! driver ──GET /feed──▶ AvailabilityFeed ◀── Store ◀── AcceptanceCoordinator ◀── POST /accept
//!                                               │
//!                           NotifyRelay ◀───────┴──── ReconcileWorker
//! ```
//!
//! Usage: `intercity_carpool [--env <name>] [--port <port>]`

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use intercity_carpool::auth::LogOtpSender;
use intercity_carpool::config::{
    AppConfig, DEV_JWT_SECRET, NotifyConfig, StorageBackend, StorageConfig,
};
use intercity_carpool::db::Database;
use intercity_carpool::gateway::{AppState, run_server};
use intercity_carpool::logging::init_logging;
use intercity_carpool::notify::{LogNotifier, Notifier, NotifyRelay, TelegramNotifier};
use intercity_carpool::reconcile::ReconcileWorker;
use intercity_carpool::store::{MemoryStore, PgStore, Store, postgres::schema::init_schema};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.backend {
        StorageBackend::Memory => {
            warn!("Using the in-memory store, all data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let url = config
                .postgres_url
                .as_deref()
                .context("storage.postgres_url (or DATABASE_URL) is required for the postgres backend")?;
            let db = Database::connect(url, config.max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            init_schema(db.pool())
                .await
                .context("Failed to initialize database schema")?;
            info!("PostgreSQL schema ready");
            Ok(Arc::new(PgStore::new(db.pool().clone())))
        }
    }
}

fn build_notifier(config: &NotifyConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    if !config.enabled {
        return Ok(Arc::new(LogNotifier));
    }
    match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) => {
            let notifier = TelegramNotifier::new(token, chat_id)
                .context("Failed to create Telegram notifier")?;
            info!("Operator notifications go to Telegram");
            Ok(Arc::new(notifier))
        }
        _ => {
            warn!("notify.enabled is set without a Telegram token and chat id, logging instead");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = init_logging(&app_config);

    info!(
        env = %env,
        version = env!("CARGO_PKG_VERSION"),
        build = env!("GIT_HASH"),
        acceptance_mode = ?app_config.acceptance.mode,
        "Starting intercity carpool backend"
    );
    if app_config.auth.jwt_secret == DEV_JWT_SECRET {
        warn!("Using the development JWT secret, set JWT_SECRET in production");
    }
    if app_config.auth.admin_password_hash.is_none() {
        warn!("auth.admin_password_hash is not set, admin login is disabled");
    }

    let store = open_store(&app_config.storage).await?;

    let notify = NotifyRelay::new(app_config.notify.queue_size);
    notify.spawn(build_notifier(&app_config.notify)?);

    let state = Arc::new(AppState::new(
        &app_config,
        store,
        notify,
        Arc::new(LogOtpSender),
    ));

    state.auth.spawn_otp_purge();

    if app_config.reconcile.enabled {
        let worker = ReconcileWorker::new(state.reconciler.clone(), &app_config.reconcile);
        tokio::spawn(async move {
            worker.run().await;
        });
    }

    run_server(&app_config.gateway, state).await
}
