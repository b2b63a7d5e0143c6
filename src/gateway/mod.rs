//! HTTP gateway
//!
//! Route groups: public (passenger, feed, auth), `/driver` behind a driver
//! token and `/admin` behind an admin token.

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod state;
pub mod types;

use anyhow::Context;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use handlers::{admin, auth, bookings, driver, feed};
pub use state::AppState;

pub fn build_app(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/otp/request", post(auth::request_otp))
        .route("/otp/verify", post(auth::verify_otp))
        .route("/login", post(auth::login))
        .route("/admin/login", post(auth::admin_login));

    let driver_routes = Router::new()
        .route("/me", get(driver::me))
        .route("/location", put(driver::update_location))
        .route("/password", put(driver::set_password))
        .route("/feed", get(driver::feed))
        .route("/bookings", get(driver::my_bookings))
        .route("/bookings/{id}/accept", post(driver::accept_booking))
        .route("/bookings/{id}/complete", post(driver::complete_booking))
        .route("/bookings/{id}/cancel", post(driver::cancel_booking))
        .route("/wallet", get(driver::wallet_balance))
        .route("/wallet/transactions", get(driver::wallet_transactions))
        .layer(from_fn_with_state(state.clone(), middleware::driver_auth));

    let admin_routes = Router::new()
        .route(
            "/drivers",
            get(admin::list_drivers).post(admin::create_driver),
        )
        .route("/drivers/{id}/commands", post(admin::driver_command))
        .route("/drivers/{id}/transactions", get(admin::driver_transactions))
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/{id}/commands", post(admin::booking_command))
        .route("/reconciliation", get(admin::reconciliation))
        .layer(from_fn_with_state(state.clone(), middleware::admin_auth));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .route("/api/v1/bookings", post(bookings::submit_booking))
        .route("/api/v1/bookings/{reference}", get(bookings::booking_status))
        .route("/api/v1/feed", get(feed::list_available))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/driver", driver_routes)
        .nest("/api/v1/admin", admin_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until the process is stopped
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_app(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} (port already in use?)", addr))?;

    info!(%addr, "Gateway listening");
    info!("API docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .await
        .context("Gateway server error")?;
    Ok(())
}
